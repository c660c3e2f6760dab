pub mod driver;

pub use driver::{plan, run, run_with_registry, RunArgs};
