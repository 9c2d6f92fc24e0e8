//! Command-line front end
//!
//! Argument parsing and routing for the `mapreduce-engine` binary. The
//! binary itself only installs logging and hands off to [`execute_command`].

pub mod args;
pub mod router;

pub use args::{Cli, Commands};
pub use router::{execute_command, get_log_level, run_catalog_job};
