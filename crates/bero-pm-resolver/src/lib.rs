//! The resolution and lock core of bero-pm: semantic-version
//! constraint solving, cycle detection, conflict classification, and
//! the two-file lock protocol that makes subsequent runs deterministic
//! and network-free.
//!
//! Everything outside this crate — the CLI, the registry HTTP
//! transport, the tarball fetcher/extractor, manifest file I/O — is a
//! narrow-contract collaborator. This crate only depends on
//! [`RegistryClient`] as a trait; it never performs I/O of its own
//! beyond the lock file itself.

mod error;
mod lock;
mod registry;
mod resolver;
mod version;

pub use error::ResolverError;
pub use lock::{lock_key, LockStore};
pub use registry::RegistryClient;
pub use resolver::{resolve, Plan, ResolveOutput, TopLevelEntry, UnsatisfiedEntry};
pub use version::{caret, max_satisfying, parse, parse_range, satisfies};

#[cfg(any(test, feature = "testing"))]
pub use resolver::testing;
