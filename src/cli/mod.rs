//! Command line interface for image_release.
//!
//! Parses arguments, resolves settings and maps the release outcome to an
//! exit code, with colored feedback along the way.

mod args;
pub mod commands;
mod output;

pub use args::{Args, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
