//! The lock store (C3): loading the prior lock, answering synthetic
//! manifest queries against it, and serializing the newly accumulated
//! lock deterministically.

use crate::error::ResolverError;
use bero_pm_schemas::{DistInfo, LockDocument, LockEntry, RegistryManifest, RegistryVersionEntry};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::Path;

/// The prior lock, read once at the start of a run and never mutated
/// afterward. Absent on disk is not an error; it just means every
/// demand falls through to the registry.
pub struct LockStore {
    old: LockDocument,
}

impl LockStore {
    /// Loads the lock file at `path`. A missing file yields an empty
    /// lock; a malformed one is `CorruptLock`.
    pub fn read_lock(path: &Path) -> Result<Self, ResolverError> {
        let old = match std::fs::read_to_string(path) {
            Ok(contents) => serde_yaml::from_str(&contents)
                .map_err(|e| ResolverError::CorruptLock(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LockDocument::default(),
            Err(e) => return Err(ResolverError::CorruptLock(e.to_string())),
        };
        Ok(Self { old })
    }

    /// An empty lock store, as if no lock file existed on disk.
    pub fn empty() -> Self {
        Self {
            old: LockDocument::default(),
        }
    }

    /// Returns a synthetic registry manifest containing exactly the
    /// single locked version for `"<name>@<range>"`, or `None` if the
    /// old lock has no entry for that demand. This lets the resolver's
    /// hot path stay uniform: a locked request and a fresh request
    /// only differ in which backend produced the manifest.
    pub fn get_item(&self, name: &str, range: &str) -> Option<RegistryManifest> {
        let key = lock_key(name, range);
        let entry = self.old.packages.get(&key)?;

        let mut manifest = RegistryManifest::new();
        manifest.insert(
            entry.version.clone(),
            RegistryVersionEntry {
                dependencies: entry
                    .dependencies
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<IndexMap<_, _>>(),
                dist: DistInfo {
                    tarball: entry.url.clone(),
                    shasum: entry.shasum.clone(),
                },
            },
        );
        Some(manifest)
    }

    /// Serializes `new_lock` and atomically replaces the lock file at
    /// `path`. The serialized form is a pure function of `new_lock`:
    /// both the outer keys and each entry's `dependencies` map are
    /// sorted (`BTreeMap`), so two runs with the same resolution plan
    /// produce byte-identical output regardless of insertion order.
    pub fn write_lock(path: &Path, new_lock: &BTreeMap<String, LockEntry>) -> Result<(), ResolverError> {
        let document = LockDocument::new(new_lock.clone());
        let serialized =
            serde_yaml::to_string(&document).map_err(|e| ResolverError::CorruptLock(e.to_string()))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp_path = dir.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("bero-pm.yml")
        ));
        std::fs::write(&tmp_path, serialized).map_err(|e| ResolverError::CorruptLock(e.to_string()))?;
        std::fs::rename(&tmp_path, path).map_err(|e| ResolverError::CorruptLock(e.to_string()))?;
        Ok(())
    }
}

/// The literal lock key for a demand: `"<name>@<range>"`.
pub fn lock_key(name: &str, range: &str) -> String {
    format!("{name}@{range}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    #[test]
    fn missing_lock_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LockStore::read_lock(&dir.path().join("bero-pm.yml")).unwrap();
        assert!(store.get_item("foo", "^1.0.0").is_none());
    }

    #[test]
    fn corrupt_lock_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bero-pm.yml");
        std::fs::write(&path, "not: [valid, yaml: structure").unwrap();
        assert!(matches!(
            LockStore::read_lock(&path),
            Err(ResolverError::CorruptLock(_))
        ));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bero-pm.yml");

        let mut new_lock = Map::new();
        new_lock.insert(
            "foo@^1.0.0".to_string(),
            LockEntry {
                version: "1.2.3".into(),
                url: "https://example.com/foo-1.2.3.tgz".into(),
                shasum: "deadbeef".into(),
                dependencies: Map::new(),
            },
        );
        LockStore::write_lock(&path, &new_lock).unwrap();

        let store = LockStore::read_lock(&path).unwrap();
        let manifest = store.get_item("foo", "^1.0.0").unwrap();
        assert!(manifest.contains_key("1.2.3"));
    }

    #[test]
    fn write_lock_is_deterministic_regardless_of_insertion_order() {
        let dir = tempfile::tempdir().unwrap();

        let mut forward = Map::new();
        forward.insert(
            "a@".to_string(),
            LockEntry {
                version: "1.0.0".into(),
                url: "u1".into(),
                shasum: "s1".into(),
                dependencies: Map::new(),
            },
        );
        forward.insert(
            "b@".to_string(),
            LockEntry {
                version: "2.0.0".into(),
                url: "u2".into(),
                shasum: "s2".into(),
                dependencies: Map::new(),
            },
        );

        let path_a = dir.path().join("a.yml");
        let path_b = dir.path().join("b.yml");
        LockStore::write_lock(&path_a, &forward).unwrap();
        LockStore::write_lock(&path_b, &forward.clone()).unwrap();

        let bytes_a = std::fs::read(&path_a).unwrap();
        let bytes_b = std::fs::read(&path_b).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }
}
