//! Interactive confirmation before anything leaves the machine.

use crate::cli::OutputManager;
use std::time::Duration;
use tokio::time::timeout;

/// Source of the yes/no answer gating the push
#[allow(async_fn_in_trait)]
pub trait Confirmation {
    /// Ask `question`; `true` only for an explicit affirmative answer
    async fn confirm(&self, question: &str) -> bool;
}

/// Only `y`/`Y` (surrounding whitespace ignored) counts as yes
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Reads the answer from stdin
#[derive(Debug, Clone)]
pub struct TerminalConfirmation {
    output: OutputManager,
    timeout: Option<Duration>,
}

impl TerminalConfirmation {
    /// Create a prompt; `None` waits for the user indefinitely
    pub fn new(output: OutputManager, timeout: Option<Duration>) -> Self {
        Self { output, timeout }
    }
}

impl Confirmation for TerminalConfirmation {
    async fn confirm(&self, question: &str) -> bool {
        self.output.prompt(question);

        // Blocking read on its own thread so the timeout can fire
        let read = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|n| (n, line))
        });

        let joined = match self.timeout {
            Some(limit) => match timeout(limit, read).await {
                Ok(joined) => joined,
                Err(_) => {
                    self.output.println("");
                    log::warn!("No answer within {} seconds", limit.as_secs());
                    return false;
                }
            },
            None => read.await,
        };

        match joined {
            Ok(Ok((0, _))) => {
                // End of input
                self.output.println("");
                false
            }
            Ok(Ok((_, line))) => is_affirmative(&line),
            Ok(Err(e)) => {
                log::warn!("Failed to read confirmation: {e}");
                false
            }
            Err(e) => {
                log::warn!("Confirmation reader failed: {e}");
                false
            }
        }
    }
}
