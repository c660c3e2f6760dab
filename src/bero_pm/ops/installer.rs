//! The installer driver (C5): fetch each tarball, verify its digest,
//! and extract it at the target path the plan computed. Distinct plan
//! entries always have distinct target paths, so installs run in
//! parallel with no path contention.

use bero_pm_resolver::{Plan, ResolverError};
use bero_pm_schemas::LockEntry;
use curl::easy::Easy;
use flate2::read::GzDecoder;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive;

struct InstallTask {
    name: String,
    url: String,
    shasum: String,
    dest: PathBuf,
}

/// Fetches and extracts every entry in `plan` under `project_root`,
/// bounded by `jobs` concurrent downloads. `new_lock` supplies the
/// `shasum` for each URL: the plan itself only ever carries `{ url,
/// version }`, per the resolution plan's data model, so the digest
/// lives in the lock entries produced alongside it.
///
/// Returns the per-entry failures (if any); a non-empty result means
/// the overall install should be reported as failed, but every entry
/// that did succeed is left in place, matching §7's "fatal for the
/// entry; plan remains valid" policy for `DigestMismatch`.
pub fn install_plan(
    plan: &Plan,
    new_lock: &BTreeMap<String, LockEntry>,
    project_root: &Path,
    modules_dir: &str,
    jobs: usize,
) -> Result<Vec<ResolverError>, ResolverError> {
    let shasums: HashMap<&str, &str> = new_lock
        .values()
        .map(|entry| (entry.url.as_str(), entry.shasum.as_str()))
        .collect();
    let tasks = build_tasks(plan, &shasums, project_root, modules_dir);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| ResolverError::RegistryUnreachable {
            name: "installer".to_string(),
            source: Box::new(e),
        })?;

    let failures: Vec<ResolverError> = pool.install(|| {
        tasks
            .par_iter()
            .filter_map(|task| install_one(task).err())
            .collect()
    });

    Ok(failures)
}

fn build_tasks(plan: &Plan, shasums: &HashMap<&str, &str>, project_root: &Path, modules_dir: &str) -> Vec<InstallTask> {
    let mut tasks = Vec::with_capacity(plan.top_level.len() + plan.unsatisfied.len());

    for (name, entry) in &plan.top_level {
        tasks.push(InstallTask {
            name: name.clone(),
            shasum: shasums.get(entry.url.as_str()).map(|s| s.to_string()).unwrap_or_default(),
            url: entry.url.clone(),
            dest: project_root.join(modules_dir).join(name),
        });
    }
    for entry in &plan.unsatisfied {
        let dest = project_root
            .join(modules_dir)
            .join(&entry.parent_path)
            .join(modules_dir)
            .join(&entry.name);
        tasks.push(InstallTask {
            name: entry.name.clone(),
            shasum: shasums.get(entry.url.as_str()).map(|s| s.to_string()).unwrap_or_default(),
            url: entry.url.clone(),
            dest,
        });
    }
    tasks
}

fn install_one(task: &InstallTask) -> Result<(), ResolverError> {
    tracing::debug!(name = %task.name, dest = %task.dest.display(), "installing");
    let archive_bytes = fetch(&task.url).map_err(|e| ResolverError::RegistryUnreachable {
        name: task.name.clone(),
        source: Box::new(e),
    })?;

    if !task.shasum.is_empty() {
        let digest = hex::encode(Sha256::digest(&archive_bytes));
        if digest != task.shasum {
            return Err(ResolverError::DigestMismatch {
                name: task.name.clone(),
            });
        }
    }

    std::fs::create_dir_all(&task.dest).map_err(|e| ResolverError::RegistryUnreachable {
        name: task.name.clone(),
        source: Box::new(e),
    })?;
    let decoder = GzDecoder::new(archive_bytes.as_slice());
    Archive::new(decoder).unpack(&task.dest).map_err(|e| ResolverError::RegistryUnreachable {
        name: task.name.clone(),
        source: Box::new(e),
    })?;

    Ok(())
}

fn fetch(url: &str) -> Result<Vec<u8>, curl::Error> {
    let mut body = Vec::new();
    let mut handle = Easy::new();
    handle.url(url)?;
    handle.fail_on_error(true)?;
    handle.timeout(Duration::from_secs(120))?;
    {
        let mut transfer = handle.transfer();
        transfer.write_function(|chunk| {
            body.extend_from_slice(chunk);
            Ok(chunk.len())
        })?;
        transfer.perform()?;
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bero_pm_resolver::{TopLevelEntry, UnsatisfiedEntry};
    use semver::Version;
    use std::path::Path;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn top_level_entry_lands_directly_under_modules_dir() {
        let mut plan = Plan::default();
        plan.top_level.insert(
            "left-pad".to_string(),
            TopLevelEntry {
                url: "https://registry.example/left-pad-1.0.0.tgz".into(),
                version: v("1.0.0"),
            },
        );
        let shasums = HashMap::new();
        let tasks = build_tasks(&plan, &shasums, Path::new("/proj"), "bero_modules");
        assert_eq!(tasks[0].dest, Path::new("/proj/bero_modules/left-pad"));
    }

    #[test]
    fn unsatisfied_entry_nests_under_parent_path() {
        let mut plan = Plan::default();
        plan.unsatisfied.push(UnsatisfiedEntry {
            name: "c".into(),
            parent_path: "a".into(),
            url: "https://registry.example/c-2.0.0.tgz".into(),
            version: v("2.0.0"),
        });
        let shasums = HashMap::new();
        let tasks = build_tasks(&plan, &shasums, Path::new("/proj"), "bero_modules");
        assert_eq!(tasks[0].dest, Path::new("/proj/bero_modules/a/bero_modules/c"));
    }

    #[test]
    fn shasum_is_looked_up_by_url_from_the_new_lock() {
        let mut plan = Plan::default();
        plan.top_level.insert(
            "left-pad".to_string(),
            TopLevelEntry {
                url: "https://registry.example/left-pad-1.0.0.tgz".into(),
                version: v("1.0.0"),
            },
        );
        let mut shasums = HashMap::new();
        shasums.insert("https://registry.example/left-pad-1.0.0.tgz", "deadbeef");
        let tasks = build_tasks(&plan, &shasums, Path::new("/proj"), "bero_modules");
        assert_eq!(tasks[0].shasum, "deadbeef");
    }
}
