//! Container engine integration.
//!
//! Everything the release does to images goes through [`ContainerEngine`]. The
//! production implementation, [`CliEngine`], shells out to the docker or podman
//! CLI; tests substitute a recording fake.
//!
//! # Module Structure
//!
//! - `cli` - `tokio::process` implementation for docker/podman
//! - `listing` - Parsing of image listing output

mod cli;
mod listing;

pub use cli::{CliEngine, ENGINE_BUILD_TIMEOUT, ENGINE_PROBE_TIMEOUT};
pub use listing::{ImageSummary, LISTING_FORMAT, parse_listing};

use crate::error::Result;
use std::path::Path;

/// Inputs for one image build
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Build descriptor path
    pub descriptor: &'a Path,
    /// Build context directory
    pub context: &'a Path,
    /// Tag applied to the built image
    pub reference: &'a str,
}

/// Operations the release needs from a container engine.
///
/// Each operation maps failure to its own [`crate::ReleaseError`] variant so the
/// orchestrator never has to interpret exit codes.
#[allow(async_fn_in_trait)]
pub trait ContainerEngine {
    /// Engine name used in messages and example commands
    fn name(&self) -> &str;

    /// Check the engine is installed and its daemon answers
    async fn probe(&self) -> Result<()>;

    /// Build and tag an image
    async fn build(&self, request: BuildRequest<'_>) -> Result<()>;

    /// List local images of one repository
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>>;

    /// Log in to a registry, prompting on the terminal if needed
    async fn login(&self, registry: &str, username: Option<&str>) -> Result<()>;

    /// Push an image reference to its registry
    async fn push(&self, reference: &str) -> Result<()>;
}
