//! The control flow described in §2: read the manifest, load the prior
//! lock, resolve, write the new lock, rewrite the manifest, then hand
//! the plan to the installer. This is the only place in the crate that
//! calls all of the narrow-contract collaborators in sequence.

use crate::ops::{installer, manifest, CurlRegistryClient};
use crate::util::Config;
use anyhow::{bail, Context, Result};
use bero_pm_resolver::{LockStore, RegistryClient, ResolveOutput};
use std::path::Path;

/// What the CLI front-end parsed out of argv, already reduced to the
/// shape the driver needs.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub packages: Vec<String>,
    pub dev: bool,
    pub production: bool,
}

/// Runs the full install flow against the real HTTP registry.
pub fn run(config: &Config, project_root: &Path, args: RunArgs) -> Result<()> {
    let registry = CurlRegistryClient::new(&config.registry).context("configuring registry client")?;
    run_with_registry(config, project_root, args, &registry)
}

/// The same flow with the registry collaborator injected, so the
/// manifest/resolve/lock pipeline can be exercised end to end against a
/// fake registry without a network; only the final installer stage
/// (C5) performs real I/O beyond the lock file.
pub fn run_with_registry(
    config: &Config,
    project_root: &Path,
    args: RunArgs,
    registry: &dyn RegistryClient,
) -> Result<()> {
    let output = plan(config, project_root, args, registry)?;

    let failures = installer::install_plan(
        &output.plan,
        &output.new_lock,
        project_root,
        &config.modules_dir,
        config.jobs,
    )
    .context("installing resolved packages")?;

    if !failures.is_empty() {
        for failure in &failures {
            tracing::error!(error = %failure, "install entry failed");
        }
        bail!("{} package(s) failed to install", failures.len());
    }

    tracing::info!(
        top_level = output.plan.top_level.len(),
        nested = output.plan.unsatisfied.len(),
        "install complete"
    );
    Ok(())
}

/// The manifest-read / resolve / lock-write / manifest-rewrite portion
/// of the flow, without the installer stage. Split out because it is
/// the part the core specification actually governs: everything the
/// installer does beyond this point is the external C5 contract.
pub fn plan(
    config: &Config,
    project_root: &Path,
    args: RunArgs,
    registry: &dyn RegistryClient,
) -> Result<ResolveOutput> {
    let manifest_path = manifest::manifest_path(project_root);
    let mut project_manifest = manifest::read(&manifest_path)?;
    manifest::add_requested(&mut project_manifest, &args.packages, args.dev);

    let direct = manifest::direct_deps(&project_manifest, args.production);
    tracing::info!(count = direct.len(), "resolving direct dependencies");

    let lock_path = project_root.join(&config.lockfile_name);
    let lock = LockStore::read_lock(&lock_path).context("reading lock file")?;

    let output = bero_pm_resolver::resolve(&direct, registry, &lock).context("resolving dependencies")?;

    LockStore::write_lock(&lock_path, &output.new_lock).context("writing lock file")?;
    tracing::info!(path = %lock_path.display(), "lock file written");

    manifest::apply_rewrites(&mut project_manifest, &output.root_rewrites);
    manifest::write(&manifest_path, &project_manifest)?;

    Ok(output)
}
