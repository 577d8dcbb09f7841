//! Command-line interface orchestration for agglo.
//!
//! The CLI offers a `run` command that reads a points file, clusters it with
//! the selected linkage and algorithm, and prints the merge history.

mod commands;
mod points;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, RunCommand, render_summary, run_cli,
};
pub use points::{PointCloud, PointsError};

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;
