//! # image_release
//!
//! Build a container image from the current directory and push it to a registry.
//!
//! All image work is delegated to a container engine (docker or podman). This
//! crate sequences the steps, checks preconditions, asks before pushing and
//! reports what happened.
//!
//! ## Usage
//!
//! ```bash
//! image_release                      # build ./Dockerfile, confirm, push
//! image_release --tag 1.4.0          # override the tag
//! image_release --engine podman -y   # use podman, push without asking
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;

// Re-export main types for public API
pub use cli::Args;
pub use config::{BuildSettings, EngineKind, EngineSettings, ReleaseConfig, Settings};
pub use engine::{BuildRequest, CliEngine, ContainerEngine, ImageSummary};
pub use error::{ConfigError, ReleaseError, Result};
pub use orchestrator::{
    Confirmation, ReleaseOptions, ReleaseOrchestrator, ReleaseOutcome, ReleasePhase,
    ReleaseReport, TerminalConfirmation,
};
