//! Command line argument parsing and validation.
//!
//! The tool is designed to "just work" with no arguments from a directory holding a
//! Dockerfile. Every flag is an override of the layered configuration.

use crate::config::{BuildSection, ConfigLayer, EngineSection, ImageSection};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Build a container image and push it to a registry
#[derive(Parser, Debug, Default)]
#[command(
    name = "image_release",
    version,
    about = "Build a container image and push it to a registry",
    long_about = "Build the image described by the Dockerfile in the current directory, \
tag it as <registry>/<namespace>/<image>:<tag>, ask for confirmation and push it.

Usage:
  image_release
  image_release --tag 1.4.0
  image_release --engine podman --registry ghcr.io --namespace acme

Settings are read from ~/.config/image-release/config.toml, then ./image-release.toml,
then IMAGE_RELEASE_* environment variables and flags."
)]
pub struct Args {
    /// Registry host
    #[arg(long, env = "IMAGE_RELEASE_REGISTRY", value_name = "HOST")]
    pub registry: Option<String>,

    /// Account or organisation the image is published under
    #[arg(long, env = "IMAGE_RELEASE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Repository name (defaults to the current directory name)
    #[arg(long, env = "IMAGE_RELEASE_IMAGE", value_name = "NAME")]
    pub image: Option<String>,

    /// Image tag
    #[arg(short, long, env = "IMAGE_RELEASE_TAG")]
    pub tag: Option<String>,

    /// Build descriptor
    #[arg(short, long, env = "IMAGE_RELEASE_FILE", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Build context directory
    #[arg(long, env = "IMAGE_RELEASE_CONTEXT", value_name = "DIR")]
    pub context: Option<PathBuf>,

    /// Container engine: docker or podman
    #[arg(long, env = "IMAGE_RELEASE_ENGINE")]
    pub engine: Option<String>,

    /// Path to the engine executable
    #[arg(long, env = "IMAGE_RELEASE_ENGINE_PATH", value_name = "PATH")]
    pub engine_path: Option<PathBuf>,

    /// Registry username for login
    #[arg(short, long, env = "IMAGE_RELEASE_USERNAME")]
    pub username: Option<String>,

    /// Push without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Treat no answer within this many seconds as "no"
    #[arg(long, value_name = "SECONDS")]
    pub confirm_timeout: Option<u64>,

    /// Project config file (default: ./image-release.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show extra detail
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show prompts and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.confirm_timeout == Some(0) {
            return Err("--confirm-timeout must be at least 1 second".to_string());
        }
        if self.yes && self.confirm_timeout.is_some() {
            return Err("--confirm-timeout has no effect with --yes".to_string());
        }
        Ok(())
    }

    /// The configuration layer formed by flags and environment variables
    pub fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            image: ImageSection {
                registry: self.registry.clone(),
                namespace: self.namespace.clone(),
                name: self.image.clone(),
                tag: self.tag.clone(),
            },
            build: BuildSection {
                file: self.file.clone(),
                context: self.context.clone(),
            },
            engine: EngineSection {
                kind: self.engine.clone(),
                path: self.engine_path.clone(),
                username: self.username.clone(),
            },
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
    /// Skip the confirmation prompt
    assume_yes: bool,
    /// Prompt timeout
    confirm_timeout: Option<Duration>,
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Whether to push without asking
    pub fn assume_yes(&self) -> bool {
        self.assume_yes
    }

    /// How long to wait for an answer, `None` for no limit
    pub fn confirm_timeout(&self) -> Option<Duration> {
        self.confirm_timeout
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
            assume_yes: args.yes,
            confirm_timeout: args.confirm_timeout.map(Duration::from_secs),
        }
    }
}

impl RuntimeConfig {
    /// Print message
    pub fn println(&self, message: &str) {
        self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        self.output.indent(message);
    }
}
