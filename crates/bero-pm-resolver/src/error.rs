//! Error taxonomy for the resolver core, matching the failure model
//! one-to-one: every variant here is fatal to the whole resolution, and
//! none of them ever produces a partial plan.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("no version of `{name}` satisfies `{range}`")]
    NoMatchingVersion { name: String, range: String },

    #[error("could not reach the registry to resolve `{name}`")]
    RegistryUnreachable {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("lock file is corrupt: {0}")]
    CorruptLock(String),

    #[error("`{literal}` is not a valid version")]
    BadVersion { literal: String },

    #[error("`{literal}` is not a valid version range")]
    BadRange { literal: String },

    #[error("downloaded content for `{name}` does not match the recorded digest")]
    DigestMismatch { name: String },
}
