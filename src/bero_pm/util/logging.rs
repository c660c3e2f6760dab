//! Log subscriber setup. `BERO_PM_LOG` takes precedence over `RUST_LOG`
//! so the binary can be tuned independently of other tooling sharing
//! the same shell.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_env("BERO_PM_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
}
