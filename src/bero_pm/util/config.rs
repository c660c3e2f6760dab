//! Per-invocation configuration (§9's "global mutable state" note:
//! construct this once per run, never reach for statics).

use std::env;

pub const DEFAULT_REGISTRY: &str = "https://registry.bero-pm.example";
pub const DEFAULT_JOBS: usize = 8;

/// Everything the driver needs that isn't part of the resolution plan
/// itself. Built once in `main` from environment variables overridden
/// by CLI flags, then threaded explicitly through the run.
#[derive(Debug, Clone)]
pub struct Config {
    pub registry: String,
    pub modules_dir: String,
    pub lockfile_name: String,
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: env::var("BERO_PM_REGISTRY").unwrap_or_else(|_| DEFAULT_REGISTRY.to_string()),
            modules_dir: bero_pm_schemas::MODULES_DIR.to_string(),
            lockfile_name: bero_pm_schemas::LOCKFILE_NAME.to_string(),
            jobs: env::var("BERO_PM_JOBS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_JOBS),
        }
    }
}

impl Config {
    /// Applies CLI overrides on top of the environment-derived defaults.
    pub fn with_overrides(mut self, registry: Option<String>, jobs: Option<usize>) -> Self {
        if let Some(registry) = registry {
            self.registry = registry;
        }
        if let Some(jobs) = jobs {
            self.jobs = jobs;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_win_over_defaults() {
        let config = Config {
            registry: DEFAULT_REGISTRY.to_string(),
            modules_dir: "bero_modules".to_string(),
            lockfile_name: "bero-pm.yml".to_string(),
            jobs: DEFAULT_JOBS,
        }
        .with_overrides(Some("https://example.test".to_string()), Some(2));
        assert_eq!(config.registry, "https://example.test");
        assert_eq!(config.jobs, 2);
    }
}
