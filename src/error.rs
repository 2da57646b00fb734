//! Error types for image_release operations.
//!
//! Every fatal step of a release maps to one variant of [`ReleaseError`], so the
//! kind of failure survives all the way up to the exit status and the recovery
//! suggestions printed by the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for image_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all image_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Container engine missing or its daemon not reachable
    #[error("Container engine unavailable: {reason}")]
    Environment {
        /// Engine command that was probed
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Build descriptor missing from the working directory
    #[error("Build descriptor not found at {}", .path.display())]
    Precondition {
        /// Path where the descriptor was expected
        path: PathBuf,
    },

    /// Engine build failed
    #[error("Image build failed for '{reference}': {reason}")]
    Build {
        /// Image reference being built
        reference: String,
        /// Reason for the error
        reason: String,
    },

    /// Image listing failed (never fatal, only surfaced in logs)
    #[error("Image listing failed for '{repository}': {reason}")]
    Listing {
        /// Repository that was listed
        repository: String,
        /// Reason for the error
        reason: String,
    },

    /// Registry login failed
    #[error("Login to registry '{registry}' failed: {reason}")]
    Authentication {
        /// Registry host
        registry: String,
        /// Reason for the error
        reason: String,
    },

    /// Engine push failed
    #[error("Push of '{reference}' failed: {reason}")]
    Push {
        /// Image reference being pushed
        reference: String,
        /// Reason for the error
        reason: String,
    },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required field is empty after trimming
    #[error("Configuration field '{field}' must not be empty")]
    EmptyField {
        /// Field name
        field: &'static str,
    },

    /// Field contains characters that cannot appear in an image reference
    #[error("Configuration field '{field}' has invalid value '{value}': {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
        /// Reason for the error
        reason: String,
    },

    /// Unknown engine name
    #[error("Unknown container engine '{name}'. Expected 'docker' or 'podman'")]
    UnknownEngine {
        /// Name given
        name: String,
    },

    /// Config file could not be read
    #[error("Failed to read config file {}: {source}", .path.display())]
    ReadFailed {
        /// Path to the config file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for our schema
    #[error("Failed to parse config file {}: {source}", .path.display())]
    ParseFailed {
        /// Path to the config file
        path: PathBuf,
        /// Parsing error
        #[source]
        source: toml::de::Error,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Environment { command, .. } => vec![
                format!("Check that '{command}' is installed and on PATH"),
                "Start the engine daemon (e.g. sudo systemctl start docker)".to_string(),
                "Select another engine with --engine podman".to_string(),
            ],
            ReleaseError::Precondition { path } => vec![
                "Run this command from the directory containing your build descriptor".to_string(),
                format!(
                    "Or point at it explicitly: --file {}",
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "Dockerfile".to_string())
                ),
            ],
            ReleaseError::Build { .. } => vec![
                "Review the build output above for the failing instruction".to_string(),
                "Rebuild locally with the engine directly to iterate faster".to_string(),
            ],
            ReleaseError::Authentication { registry, .. } => vec![
                format!("Verify your credentials for {registry}"),
                "Pass a robot/service account with --username if required".to_string(),
            ],
            ReleaseError::Push { .. } => vec![
                "Check that the namespace exists and you have write access to it".to_string(),
                "The local image is intact; rerun to retry the push".to_string(),
            ],
            ReleaseError::Config(_) => vec![
                "Check --registry/--namespace/--image/--tag and image-release.toml".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Whether this error should stop the release
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ReleaseError::Listing { .. })
    }
}
