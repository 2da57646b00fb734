//! docker/podman CLI driver.

use super::listing::{LISTING_FORMAT, parse_listing};
use super::{BuildRequest, ContainerEngine, ImageSummary};
use crate::cli::OutputManager;
use crate::config::EngineSettings;
use crate::error::{ReleaseError, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Timeout for the daemon availability probe
pub const ENGINE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for image builds (30 minutes)
pub const ENGINE_BUILD_TIMEOUT: Duration = Duration::from_secs(1800);

/// Timeout for the image listing
const ENGINE_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Platform-specific daemon startup instructions
#[cfg(target_os = "macos")]
const ENGINE_START_HELP: &str = "Start Docker Desktop or run: podman machine start";

#[cfg(not(target_os = "macos"))]
const ENGINE_START_HELP: &str = "Start the daemon: sudo systemctl start docker";

/// Drives a container engine through its command line interface
#[derive(Debug, Clone)]
pub struct CliEngine {
    name: String,
    program: PathBuf,
    output: OutputManager,
}

impl CliEngine {
    /// Create a driver for the configured engine.
    ///
    /// Nothing is executed until the first operation; an explicit path overrides the
    /// PATH lookup of the engine's binary name.
    pub fn new(settings: &EngineSettings, output: OutputManager) -> Self {
        let program = settings
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(settings.kind.binary_name()));
        Self {
            name: settings.kind.binary_name().to_string(),
            program,
            output,
        }
    }

    /// Executable invoked for every operation
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, args: &[&str]) -> Command {
        log::debug!("Running: {} {}", self.program.display(), args.join(" "));
        let mut command = Command::new(&self.program);
        command.args(args);
        command.kill_on_drop(true);
        command
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.name, args.join(" "))
    }
}

impl ContainerEngine for CliEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<()> {
        let resolved = which::which(&self.program).map_err(|e| ReleaseError::Environment {
            command: self.program.display().to_string(),
            reason: format!(
                "{} command not found: {}\n\
                 \n\
                 Install it or pass --engine-path to point at the executable.",
                self.name, e
            ),
        })?;
        log::debug!("Using container engine at {}", resolved.display());

        let status_result = timeout(
            ENGINE_PROBE_TIMEOUT,
            self.command(&["info"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status(),
        )
        .await;

        match status_result {
            // Timeout occurred
            Err(_) => Err(ReleaseError::Environment {
                command: self.describe(&["info"]),
                reason: format!(
                    "Daemon check timed out after {} seconds.\n\
                     {}",
                    ENGINE_PROBE_TIMEOUT.as_secs(),
                    ENGINE_START_HELP
                ),
            }),

            Ok(Ok(status)) if status.success() => Ok(()),

            // Binary exists but daemon isn't responding
            Ok(Ok(status)) => Err(ReleaseError::Environment {
                command: self.describe(&["info"]),
                reason: format!(
                    "Daemon is not responding ({}).\n\
                     {}",
                    exit_reason(status),
                    ENGINE_START_HELP
                ),
            }),

            Ok(Err(e)) => Err(ReleaseError::Environment {
                command: self.describe(&["info"]),
                reason: e.to_string(),
            }),
        }
    }

    async fn build(&self, request: BuildRequest<'_>) -> Result<()> {
        let descriptor = request.descriptor.to_string_lossy().into_owned();
        let context = request.context.to_string_lossy().into_owned();
        let args = [
            "build",
            "-f",
            descriptor.as_str(),
            "-t",
            request.reference,
            context.as_str(),
        ];

        let build_error = |reason: String| ReleaseError::Build {
            reference: request.reference.to_string(),
            reason,
        };

        // Spawn with piped stdout for streaming
        let mut child = self
            .command(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| build_error(format!("failed to start {}: {}", self.name, e)))?;

        let streamed = async {
            // Output may not be UTF-8; drain to EOF regardless
            if let Some(stdout) = child.stdout.take() {
                let mut reader = BufReader::new(stdout);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf).await {
                        Ok(0) => break,
                        Ok(_) => {
                            let line = String::from_utf8_lossy(&buf);
                            self.output.indent(line.trim_end_matches(['\n', '\r']));
                        }
                        Err(e) => {
                            log::warn!("Stopped reading {} build output: {}", self.name, e);
                            break;
                        }
                    }
                }
            }
            child.wait().await
        };

        let result = timeout(ENGINE_BUILD_TIMEOUT, streamed).await;
        let status = match result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(build_error(e.to_string())),
            Err(_elapsed) => {
                self.output.warn("Build timed out, terminating process...");
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill {} build process: {}", self.name, e);
                }
                return Err(build_error(format!(
                    "timed out after {} minutes",
                    ENGINE_BUILD_TIMEOUT.as_secs() / 60
                )));
            }
        };

        if !status.success() {
            return Err(build_error(exit_reason(status)));
        }
        Ok(())
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>> {
        let listing_error = |reason: String| ReleaseError::Listing {
            repository: repository.to_string(),
            reason,
        };

        let output = timeout(
            ENGINE_LIST_TIMEOUT,
            self.command(&["images", repository, "--format", LISTING_FORMAT])
                .stdin(Stdio::null())
                .output(),
        )
        .await
        .map_err(|_| {
            listing_error(format!(
                "timed out after {} seconds",
                ENGINE_LIST_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| listing_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(listing_error(format!(
                "{}: {}",
                exit_reason(output.status),
                stderr.trim()
            )));
        }

        parse_listing(repository, &String::from_utf8_lossy(&output.stdout))
    }

    async fn login(&self, registry: &str, username: Option<&str>) -> Result<()> {
        let mut args = vec!["login"];
        if let Some(username) = username {
            args.extend(["-u", username]);
        }
        args.push(registry);

        // Inherit the terminal so the engine can prompt for credentials
        let status = self
            .command(&args)
            .status()
            .await
            .map_err(|e| ReleaseError::Authentication {
                registry: registry.to_string(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(ReleaseError::Authentication {
                registry: registry.to_string(),
                reason: exit_reason(status),
            });
        }
        Ok(())
    }

    async fn push(&self, reference: &str) -> Result<()> {
        let status = self
            .command(&["push", reference])
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| ReleaseError::Push {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(ReleaseError::Push {
                reference: reference.to_string(),
                reason: exit_reason(status),
            });
        }
        Ok(())
    }
}

fn exit_reason(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code: {code}"),
        None => "terminated by signal".to_string(),
    }
}
