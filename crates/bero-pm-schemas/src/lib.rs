//! Serde types for the three documents `bero-pm` reads and writes: the
//! project manifest, the lock file, and the registry's per-package
//! manifest. No parsing or resolution logic lives here; this crate only
//! defines the shapes, the same separation the registry/manifest schema
//! crates in this ecosystem draw between "what a document looks like"
//! and "what we do with it".

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The project manifest: the per-project file listing direct dependencies.
///
/// Field order is preserved on read (`IndexMap`) so that a manifest with
/// unsorted keys can still be diffed sensibly before the rewrite step
/// re-sorts it on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,
    #[serde(
        default,
        rename = "devDependencies",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub dev_dependencies: IndexMap<String, String>,
}

/// Current lock file schema version. Bumped on any breaking change to
/// the shape below.
pub const LOCKFILE_VERSION: u32 = 1;

/// Default lock file name, per the external interface contract.
pub const LOCKFILE_NAME: &str = "bero-pm.yml";

/// Default project manifest file name.
pub const MANIFEST_NAME: &str = "bero-pm.json";

/// Default on-disk modules directory name.
pub const MODULES_DIR: &str = "bero_modules";

/// The lock document as it exists on disk. Keys of `packages` and of
/// each entry's `dependencies` are sorted on write; `BTreeMap` is used
/// here specifically so that property holds regardless of how the
/// in-memory resolver built the map up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDocument {
    #[serde(rename = "lockfileVersion")]
    pub lockfile_version: u32,
    pub packages: BTreeMap<String, LockEntry>,
}

impl LockDocument {
    pub fn new(packages: BTreeMap<String, LockEntry>) -> Self {
        Self {
            lockfile_version: LOCKFILE_VERSION,
            packages,
        }
    }
}

/// A single lock entry, keyed externally by `"<name>@<range>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub version: String,
    pub url: String,
    pub shasum: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

/// A registry's manifest for a single package name: every known
/// version and its metadata. `IndexMap` preserves the registry's wire
/// enumeration order, which is significant for tie-break in
/// max-satisfying version selection (see `bero_pm_resolver::version`).
pub type RegistryManifest = IndexMap<String, RegistryVersionEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryVersionEntry {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,
    pub dist: DistInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistInfo {
    pub tarball: String,
    pub shasum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_manifest_omits_empty_dev_dependencies() {
        let mut manifest = ProjectManifest::default();
        manifest.dependencies.insert("foo".into(), "^1.0.0".into());

        let json = serde_json::to_string(&manifest).unwrap();
        assert!(!json.contains("devDependencies"));
    }

    #[test]
    fn lock_document_round_trips_through_yaml() {
        let mut packages = BTreeMap::new();
        packages.insert(
            "foo@^1.0.0".to_string(),
            LockEntry {
                version: "1.2.3".into(),
                url: "https://example.com/foo-1.2.3.tgz".into(),
                shasum: "deadbeef".into(),
                dependencies: BTreeMap::new(),
            },
        );
        let doc = LockDocument::new(packages);

        let yaml = serde_yaml::to_string(&doc).unwrap();
        let back: LockDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(doc, back);
    }
}
