//! Command execution.
//!
//! Turns a parsed [`Args`] into an exit code: 0 when the image was pushed, 1 for
//! any failure or a declined confirmation.

mod release;

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;

use release::execute_release;

/// Execute the release based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    // Validate arguments
    if let Err(validation_error) = args.validate() {
        // Create output for validation errors (never quiet)
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    match execute_release(&args, &config).await {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&e.to_string());

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.indent(&format!("• {}", suggestion));
                }
            }

            Ok(1)
        }
    }
}
