//! Version algebra (C1): parsing, satisfaction testing, and
//! max-satisfying selection over semantic versions.
//!
//! Ranges are represented with `semver::VersionReq` directly: its
//! default (bare `x.y.z`) comparator is already caret-equivalent, and
//! its `matches` already excludes pre-release versions unless the
//! requirement itself names a pre-release on the same
//! `(major, minor, patch)` triple, which is exactly the tie-break rule
//! this module is required to honor.

use crate::error::ResolverError;
use semver::{Version, VersionReq};

/// Parses a version string, failing with `BadVersion` if malformed.
pub fn parse(literal: &str) -> Result<Version, ResolverError> {
    Version::parse(literal).map_err(|_| ResolverError::BadVersion {
        literal: literal.to_string(),
    })
}

/// Parses a range string. The empty string is the unconstrained range
/// and matches every version.
pub fn parse_range(literal: &str) -> Result<VersionReq, ResolverError> {
    if literal.trim().is_empty() {
        return Ok(VersionReq::STAR);
    }
    VersionReq::parse(&normalize_comparator_set(literal)).map_err(|_| ResolverError::BadRange {
        literal: literal.to_string(),
    })
}

/// `semver::VersionReq` requires comparators in a comparator set to be
/// comma-separated (`>=1.0.0, <2.0.0`); the wire format this resolver
/// accepts allows the more common whitespace-separated form
/// (`>=1.0.0 <2.0.0`). A single comparator never contains unescaped
/// whitespace, so splitting on whitespace and rejoining with commas is
/// a safe normalization for both forms.
fn normalize_comparator_set(literal: &str) -> String {
    literal.split_whitespace().collect::<Vec<_>>().join(", ")
}

/// Tests whether `version` satisfies `range`.
pub fn satisfies(version: &Version, range: &VersionReq) -> bool {
    range.matches(version)
}

/// Returns the highest version in `versions` (given in the registry's
/// ascending enumeration order) that satisfies `range`, or `None` if
/// none does. Ties in precedence are broken by enumeration order: the
/// later entry wins.
pub fn max_satisfying<'v>(versions: impl IntoIterator<Item = &'v Version>, range: &VersionReq) -> Option<Version> {
    let mut best: Option<Version> = None;
    for candidate in versions {
        if !satisfies(candidate, range) {
            continue;
        }
        match &best {
            Some(current) if *candidate < *current => {}
            _ => best = Some(candidate.clone()),
        }
    }
    best
}

/// Computes the `^MAJOR.MINOR.PATCH` range used to record a root
/// dependency that was originally unconstrained.
pub fn caret(version: &Version) -> String {
    format!("^{}.{}.{}", version.major, version.minor, version.patch)
}
