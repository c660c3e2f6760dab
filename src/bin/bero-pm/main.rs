use anyhow::{Context, Result};
use bero_pm::{run, Config, RunArgs};
use clap::Parser;
use std::process::ExitCode;

/// A minimal package manager: resolve, lock, and install.
#[derive(Debug, Parser)]
#[command(name = "bero-pm", version, about)]
struct Cli {
    /// Package names to add before resolving.
    packages: Vec<String>,

    /// Record added packages in `devDependencies` instead of `dependencies`.
    #[arg(long = "save-dev", visible_alias = "dev")]
    dev: bool,

    /// Drop `devDependencies` before resolving.
    #[arg(long)]
    production: bool,

    /// Override the registry base URL (default: `BERO_PM_REGISTRY` or the built-in default).
    #[arg(long)]
    registry: Option<String>,

    /// Override the installer's concurrency limit (default: `BERO_PM_JOBS` or 8).
    #[arg(long)]
    jobs: Option<usize>,
}

fn main() -> ExitCode {
    bero_pm::util::logging::init();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(&e),
    }
}

fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::default().with_overrides(cli.registry, cli.jobs);
    let project_root = std::env::current_dir().context("determining the project root")?;

    let run_args = RunArgs {
        packages: cli.packages,
        dev: cli.dev,
        production: cli.production,
    };

    run(&config, &project_root, run_args)
}

#[allow(clippy::print_stderr)]
fn fatal(err: &anyhow::Error) -> ExitCode {
    eprintln!("bero-pm: error: {err}");
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
    ExitCode::FAILURE
}
