//! `bero-pm`'s ambient layer: the CLI's collaborators. The resolution
//! and lock core lives entirely in `bero_pm_resolver`; everything here
//! is I/O — registry HTTP, tarball extraction, manifest files, logging,
//! and configuration — wired together by [`core::run`].

pub mod core;
pub mod ops;
pub mod util;

pub use core::{plan, run, run_with_registry, RunArgs};
pub use util::Config;
