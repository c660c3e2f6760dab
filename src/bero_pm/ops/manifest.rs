//! Project manifest I/O: reading the manifest a run starts from and
//! rewriting it once resolution has produced caret rewrites for
//! originally-unconstrained root dependencies.

use anyhow::{Context, Result};
use bero_pm_schemas::{ProjectManifest, MANIFEST_NAME};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn manifest_path(project_root: &Path) -> PathBuf {
    project_root.join(MANIFEST_NAME)
}

/// Reads the manifest at `path`. A missing file reads as an empty
/// manifest so a bare `bero-pm <pkg>` works in a fresh directory.
pub fn read(path: &Path) -> Result<ProjectManifest> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            serde_json::from_str(&contents).with_context(|| format!("parsing manifest at {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProjectManifest::default()),
        Err(e) => Err(e).with_context(|| format!("reading manifest at {}", path.display())),
    }
}

/// Adds `packages` (each initially unconstrained, `""`) to `dependencies`
/// or `devDependencies` depending on `dev`. Fixes the known front-end bug
/// (§9) where the non-dev branch wrote into `devDependencies`: here the
/// non-dev branch always targets `dependencies`.
pub fn add_requested(manifest: &mut ProjectManifest, packages: &[String], dev: bool) {
    let target = if dev {
        &mut manifest.dev_dependencies
    } else {
        &mut manifest.dependencies
    };
    for name in packages {
        target.entry(name.clone()).or_insert_with(String::new);
    }
}

/// Applies the resolver's root rewrites (originally-`""` ranges now
/// pinned to `^X.Y.Z`) to whichever map each name actually lives in,
/// then re-sorts both maps by key. Idempotent: a name already rewritten
/// to a concrete caret range is left untouched on a later run because
/// the resolver only emits a rewrite for ranges it resolved from `""`.
pub fn apply_rewrites(manifest: &mut ProjectManifest, rewrites: &BTreeMap<String, String>) {
    for (name, range) in rewrites {
        if manifest.dependencies.contains_key(name) {
            manifest.dependencies.insert(name.clone(), range.clone());
        } else if manifest.dev_dependencies.contains_key(name) {
            manifest.dev_dependencies.insert(name.clone(), range.clone());
        }
    }
    sort_in_place(&mut manifest.dependencies);
    sort_in_place(&mut manifest.dev_dependencies);
}

fn sort_in_place(map: &mut IndexMap<String, String>) {
    map.sort_keys();
}

/// Writes `manifest` back to `path`, pretty-printed.
pub fn write(path: &Path, manifest: &ProjectManifest) -> Result<()> {
    let serialized =
        serde_json::to_string_pretty(manifest).context("serializing project manifest")?;
    std::fs::write(path, serialized + "\n").with_context(|| format!("writing manifest at {}", path.display()))
}

/// Merges `dependencies` and, unless `production` drops them,
/// `devDependencies` into the flat `(name, range)` list the resolver
/// takes as direct dependencies.
pub fn direct_deps(manifest: &ProjectManifest, production: bool) -> Vec<(String, String)> {
    let mut direct: Vec<(String, String)> = manifest
        .dependencies
        .iter()
        .map(|(n, r)| (n.clone(), r.clone()))
        .collect();
    if !production {
        direct.extend(manifest.dev_dependencies.iter().map(|(n, r)| (n.clone(), r.clone())));
    }
    direct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = read(&manifest_path(dir.path())).unwrap();
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn add_requested_routes_by_dev_flag() {
        let mut manifest = ProjectManifest::default();
        add_requested(&mut manifest, &["left-pad".to_string()], false);
        add_requested(&mut manifest, &["mocha".to_string()], true);
        assert!(manifest.dependencies.contains_key("left-pad"));
        assert!(manifest.dev_dependencies.contains_key("mocha"));
    }

    #[test]
    fn apply_rewrites_targets_the_map_the_name_actually_lives_in() {
        let mut manifest = ProjectManifest::default();
        manifest.dev_dependencies.insert("mocha".into(), String::new());
        let mut rewrites = BTreeMap::new();
        rewrites.insert("mocha".to_string(), "^9.2.1".to_string());
        apply_rewrites(&mut manifest, &rewrites);
        assert_eq!(manifest.dev_dependencies.get("mocha"), Some(&"^9.2.1".to_string()));
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn apply_rewrites_sorts_keys() {
        let mut manifest = ProjectManifest::default();
        manifest.dependencies.insert("zeta".into(), "^1.0.0".into());
        manifest.dependencies.insert("alpha".into(), "^1.0.0".into());
        apply_rewrites(&mut manifest, &BTreeMap::new());
        let keys: Vec<&String> = manifest.dependencies.keys().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn production_drops_dev_dependencies() {
        let mut manifest = ProjectManifest::default();
        manifest.dependencies.insert("left-pad".into(), "^1.0.0".into());
        manifest.dev_dependencies.insert("mocha".into(), "^9.0.0".into());
        assert_eq!(direct_deps(&manifest, true), vec![("left-pad".to_string(), "^1.0.0".to_string())]);
        assert_eq!(direct_deps(&manifest, false).len(), 2);
    }
}
