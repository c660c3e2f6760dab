//! The resolver (C4): the recursive traversal that builds a
//! resolution plan, with cycle detection and the nested-placement
//! algorithm at its center.
//!
//! Sibling traversals are genuinely concurrent (via `rayon::scope`),
//! matching the source intent described in the concurrency model: the
//! shared `topLevel`/`unsatisfied`/new-lock state is guarded by a
//! single mutex, the simplest correct policy when the per-node fan-out
//! is small.

use crate::error::ResolverError;
use crate::lock::{lock_key, LockStore};
use crate::registry::RegistryClient;
use crate::version;
use bero_pm_schemas::LockEntry;
use indexmap::IndexMap;
use rayon::prelude::*;
use semver::Version;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// A package bound at the shared modules root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelEntry {
    pub url: String,
    pub version: Version,
}

/// A package that must be nested under an ancestor's private modules
/// directory to coexist with an incompatible top-level copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedEntry {
    pub name: String,
    pub parent_path: String,
    pub url: String,
    pub version: Version,
}

/// The resolution plan: where every package in the run gets installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub top_level: BTreeMap<String, TopLevelEntry>,
    pub unsatisfied: Vec<UnsatisfiedEntry>,
}

/// Everything a full resolution run produces.
#[derive(Debug, Clone, Default)]
pub struct ResolveOutput {
    pub plan: Plan,
    pub new_lock: BTreeMap<String, LockEntry>,
    /// Root dependencies that were originally unconstrained (`""`),
    /// mapped to the concrete `^X.Y.Z` range just installed. The
    /// driver uses this to rewrite the project manifest.
    pub root_rewrites: BTreeMap<String, String>,
}

/// A frame on the traversal-local ancestor stack.
#[derive(Debug, Clone)]
struct StackFrame {
    name: String,
    version: Version,
    dependencies: IndexMap<String, String>,
}

#[derive(Default)]
struct SharedState {
    top_level: HashMap<String, TopLevelEntry>,
    unsatisfied: Vec<UnsatisfiedEntry>,
    new_lock: BTreeMap<String, LockEntry>,
}

/// Resolves `direct_deps` (the project manifest's `dependencies` plus,
/// if the caller chose to include them, `devDependencies`, already
/// merged by the caller) against `registry`, consulting `lock` first
/// for every demand.
pub fn resolve(
    direct_deps: &[(String, String)],
    registry: &dyn RegistryClient,
    lock: &LockStore,
) -> Result<ResolveOutput, ResolverError> {
    let state = Mutex::new(SharedState::default());

    let results: Vec<Result<(String, String, Version), ResolverError>> = direct_deps
        .par_iter()
        .map(|(name, range)| {
            let version = collect_deps(registry, lock, &state, name, range, Vec::new())?;
            Ok((name.clone(), range.clone(), version))
        })
        .collect();

    let mut root_rewrites = BTreeMap::new();
    for result in results {
        let (name, range, version) = result?;
        if range.is_empty() {
            root_rewrites.insert(name, version::caret(&version));
        }
    }

    let state = state.into_inner().expect("mutex never poisoned: no panics cross the lock boundary");
    let mut unsatisfied = state.unsatisfied;
    dedup_unsatisfied(&mut unsatisfied);

    Ok(ResolveOutput {
        plan: Plan {
            top_level: state.top_level.into_iter().collect(),
            unsatisfied,
        },
        new_lock: state.new_lock,
        root_rewrites,
    })
}

fn collect_deps(
    registry: &dyn RegistryClient,
    lock: &LockStore,
    state: &Mutex<SharedState>,
    name: &str,
    range: &str,
    stack: Vec<StackFrame>,
) -> Result<Version, ResolverError> {
    tracing::debug!(name, range, depth = stack.len(), "resolving demand");

    // 1. Manifest acquisition.
    let manifest = match lock.get_item(name, range) {
        Some(locked) => locked,
        None => registry.fetch_manifest(name)?,
    };

    // 2. Version choice.
    let range_req = version::parse_range(range)?;
    let mut parsed_versions = Vec::with_capacity(manifest.len());
    for key in manifest.keys() {
        parsed_versions.push(version::parse(key)?);
    }
    let matched = version::max_satisfying(&parsed_versions, &range_req).ok_or_else(|| {
        ResolverError::NoMatchingVersion {
            name: name.to_string(),
            range: range.to_string(),
        }
    })?;

    let (_, entry) = manifest
        .iter()
        .find(|(key, _)| version::parse(key).map(|v| v == matched).unwrap_or(false))
        .expect("the version max_satisfying picked must come from the manifest it was picked from");
    let url = entry.dist.tarball.clone();
    let shasum = entry.dist.shasum.clone();
    let dependencies: IndexMap<String, String> = entry.dependencies.clone();

    // 3. Placement decision.
    place(state, name, &range_req, &url, &matched, &stack)?;

    // 4. Lock update. The key uses the requested range, not the chosen
    //    version, so repeat resolutions of the same demand hit the cache.
    {
        let lock_entry = LockEntry {
            version: matched.to_string(),
            url: url.clone(),
            shasum,
            dependencies: dependencies.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };
        state.lock().unwrap().new_lock.insert(lock_key(name, range), lock_entry);
    }

    // 5. Descent.
    let mut next_stack = stack;
    next_stack.push(StackFrame {
        name: name.to_string(),
        version: matched.clone(),
        dependencies: dependencies.clone(),
    });

    let children: Vec<(String, String)> = dependencies
        .into_iter()
        .filter(|(dep_name, dep_range)| !forms_cycle(&next_stack, dep_name, dep_range))
        .collect();

    if !children.is_empty() {
        let first_error: Mutex<Option<ResolverError>> = Mutex::new(None);
        rayon::scope(|scope| {
            for (dep_name, dep_range) in children {
                let next_stack = next_stack.clone();
                let first_error = &first_error;
                scope.spawn(move |_| {
                    if first_error.lock().unwrap().is_some() {
                        // A sibling already hit a fatal error; the scheduler
                        // cancels outstanding traversals rather than starting
                        // new network work.
                        return;
                    }
                    if let Err(e) = collect_deps(registry, lock, state, &dep_name, &dep_range, next_stack) {
                        let mut slot = first_error.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                    }
                });
            }
        });
        if let Some(e) = first_error.into_inner().unwrap() {
            return Err(e);
        }
    }

    Ok(matched)
}

/// Skips a would-be descent into `(dep, dep_range)` if some frame
/// already on the stack — including the frame just pushed for the
/// current package — names the same package at a version that already
/// satisfies the demand. This both terminates legitimate cycles and
/// suppresses redundant descents along a live path.
fn forms_cycle(stack: &[StackFrame], dep_name: &str, dep_range: &str) -> bool {
    let Ok(range_req) = version::parse_range(dep_range) else {
        return false;
    };
    stack
        .iter()
        .any(|frame| frame.name == dep_name && version::satisfies(&frame.version, &range_req))
}

/// The lowest stack index whose frame depends on `name` at a range
/// that `version` does not satisfy, or `None` if every frame is either
/// silent about `name` or satisfied by `version`.
fn check_stack_dependencies(name: &str, version: &Version, stack: &[StackFrame]) -> Option<usize> {
    stack.iter().position(|frame| match frame.dependencies.get(name) {
        Some(dep_range) => match crate::version::parse_range(dep_range) {
            Ok(req) => !crate::version::satisfies(version, &req),
            Err(_) => false,
        },
        None => false,
    })
}

fn place(
    state: &Mutex<SharedState>,
    name: &str,
    range_req: &semver::VersionReq,
    url: &str,
    matched: &Version,
    stack: &[StackFrame],
) -> Result<(), ResolverError> {
    let mut guard = state.lock().unwrap();
    match guard.top_level.get(name).cloned() {
        None => {
            guard.top_level.insert(
                name.to_string(),
                TopLevelEntry {
                    url: url.to_string(),
                    version: matched.clone(),
                },
            );
        }
        Some(top) if version::satisfies(&top.version, range_req) => {
            if let Some(conflict_index) = check_stack_dependencies(name, &top.version, stack) {
                // Clamped to zero: at shallow stacks the literal `i - 2`
                // offset from the source would underflow.
                let start = conflict_index.saturating_sub(2);
                let parent_path = parent_path_for(&stack[start..]);
                guard.unsatisfied.push(UnsatisfiedEntry {
                    name: name.to_string(),
                    parent_path,
                    url: url.to_string(),
                    version: matched.clone(),
                });
            }
        }
        Some(_incompatible) => {
            let parent_path = stack.last().map(|frame| frame.name.clone()).unwrap_or_default();
            guard.unsatisfied.push(UnsatisfiedEntry {
                name: name.to_string(),
                parent_path,
                url: url.to_string(),
                version: matched.clone(),
            });
        }
    }
    Ok(())
}

fn parent_path_for(frames: &[StackFrame]) -> String {
    let separator = format!("/{}/", bero_pm_schemas::MODULES_DIR);
    frames.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(&separator)
}

fn dedup_unsatisfied(entries: &mut Vec<UnsatisfiedEntry>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|e| seen.insert((e.name.clone(), e.parent_path.clone(), e.version.clone())));
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use bero_pm_schemas::{DistInfo, RegistryManifest, RegistryVersionEntry};
    use std::sync::Mutex as StdMutex;

    /// An in-memory stand-in for the registry HTTP client, for
    /// exercising the resolver without a network.
    #[derive(Default)]
    pub struct FakeRegistryClient {
        packages: HashMap<String, RegistryManifest>,
        pub fetch_log: StdMutex<Vec<String>>,
    }

    impl FakeRegistryClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers one version of a package, in the order added;
        /// callers must add versions in ascending order to match the
        /// registry enumeration contract.
        pub fn add(&mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> &mut Self {
            let entry = RegistryVersionEntry {
                dependencies: deps.iter().map(|(n, r)| (n.to_string(), r.to_string())).collect(),
                dist: DistInfo {
                    tarball: format!("https://registry.example/{name}/-/{name}-{version}.tgz"),
                    shasum: format!("sha256-{name}-{version}"),
                },
            };
            self.packages.entry(name.to_string()).or_default().insert(version.to_string(), entry);
            self
        }
    }

    impl RegistryClient for FakeRegistryClient {
        fn fetch_manifest(&self, name: &str) -> Result<RegistryManifest, ResolverError> {
            self.fetch_log.lock().unwrap().push(name.to_string());
            self.packages
                .get(name)
                .cloned()
                .ok_or_else(|| ResolverError::NoMatchingVersion {
                    name: name.to_string(),
                    range: String::new(),
                })
        }
    }

    pub fn dep(name: &str, range: &str) -> (String, String) {
        (name.to_string(), range.to_string())
    }
}
