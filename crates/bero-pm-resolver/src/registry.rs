//! The registry client contract (C2). The resolver core only ever
//! calls through this trait; the real HTTP-backed implementation lives
//! in the `bero_pm` root crate, well outside this crate's dependency
//! graph.

use crate::error::ResolverError;
use bero_pm_schemas::RegistryManifest;

pub trait RegistryClient: Send + Sync {
    /// Fetches the full manifest (every known version) for `name`.
    fn fetch_manifest(&self, name: &str) -> Result<RegistryManifest, ResolverError>;
}
