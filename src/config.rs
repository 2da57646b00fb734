//! Release configuration.
//!
//! [`ReleaseConfig`] is the immutable record naming the image to publish. It is
//! resolved once at startup from layered sources and then passed explicitly to
//! every step that needs it:
//!
//! 1. command line flags and `IMAGE_RELEASE_*` environment variables
//! 2. the project file (`./image-release.toml` or `--config`)
//! 3. the user file (`<config_dir>/image-release/config.toml`)
//! 4. built-in defaults

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default registry when none is configured
pub const DEFAULT_REGISTRY: &str = "quay.io";

/// Namespace used when none is configured and `$USER` is unset
pub const DEFAULT_NAMESPACE: &str = "library";

/// Default image tag
pub const DEFAULT_TAG: &str = "latest";

/// Default build descriptor, relative to the working directory
pub const DEFAULT_DESCRIPTOR: &str = "Dockerfile";

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = "image-release.toml";

/// Identity of the image being released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    registry_host: String,
    namespace: String,
    image_name: String,
    tag: String,
}

impl ReleaseConfig {
    /// Create a validated configuration.
    ///
    /// Surrounding whitespace is trimmed; every field must be non-empty afterwards.
    pub fn new(
        registry_host: impl Into<String>,
        namespace: impl Into<String>,
        image_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self> {
        let registry_host = required("registry_host", registry_host.into())?;
        let namespace = required("namespace", namespace.into())?;
        let image_name = required("image_name", image_name.into())?;
        let tag = required("tag", tag.into())?;

        reject_chars("registry_host", &registry_host, &['/', '@'])?;
        reject_chars("namespace", &namespace, &[':', '@'])?;
        reject_chars("image_name", &image_name, &['/', ':', '@'])?;
        reject_chars("tag", &tag, &['/', ':', '@'])?;

        Ok(Self {
            registry_host,
            namespace,
            image_name,
            tag,
        })
    }

    /// Registry host, e.g. `quay.io`
    pub fn registry_host(&self) -> &str {
        &self.registry_host
    }

    /// Account or organisation the image is published under
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Repository name
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Version label
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `registry_host/namespace/image_name`, the repository identity without tag
    pub fn repository(&self) -> String {
        format!("{}/{}/{}", self.registry_host, self.namespace, self.image_name)
    }

    /// `registry_host/namespace/image_name:tag`
    pub fn full_image_reference(&self) -> String {
        format!("{}:{}", self.repository(), self.tag)
    }
}

impl fmt::Display for ReleaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_image_reference())
    }
}

fn required(field: &'static str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyField { field }.into());
    }
    Ok(trimmed.to_string())
}

fn reject_chars(field: &'static str, value: &str, forbidden: &[char]) -> Result<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidField {
            field,
            value: value.to_string(),
            reason: "whitespace is not allowed".to_string(),
        }
        .into());
    }
    if let Some(c) = value.chars().find(|c| forbidden.contains(c)) {
        return Err(ConfigError::InvalidField {
            field,
            value: value.to_string(),
            reason: format!("character '{c}' is not allowed"),
        }
        .into());
    }
    Ok(())
}

/// Supported container engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Docker CLI
    #[default]
    Docker,
    /// Podman CLI
    Podman,
}

impl EngineKind {
    /// Executable name looked up on PATH
    pub fn binary_name(&self) -> &'static str {
        match self {
            EngineKind::Docker => "docker",
            EngineKind::Podman => "podman",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(EngineKind::Docker),
            "podman" => Ok(EngineKind::Podman),
            _ => Err(ConfigError::UnknownEngine {
                name: s.to_string(),
            }),
        }
    }
}

/// Where the build descriptor and context live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Build descriptor, relative to the working directory
    pub descriptor: PathBuf,
    /// Build context directory
    pub context: PathBuf,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            descriptor: PathBuf::from(DEFAULT_DESCRIPTOR),
            context: PathBuf::from("."),
        }
    }
}

/// Which engine to drive and how to log in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    /// Engine flavour
    pub kind: EngineKind,
    /// Explicit executable path, overriding the PATH lookup
    pub path: Option<PathBuf>,
    /// Registry username passed to `login -u`
    pub username: Option<String>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// Image identity
    pub release: ReleaseConfig,
    /// Build inputs
    pub build: BuildSettings,
    /// Engine selection
    pub engine: EngineSettings,
}

/// One layer of optional settings, as found in a config file or on the command line
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    /// `[image]` table
    #[serde(default)]
    pub image: ImageSection,
    /// `[build]` table
    #[serde(default)]
    pub build: BuildSection,
    /// `[engine]` table
    #[serde(default)]
    pub engine: EngineSection,
}

/// `[image]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImageSection {
    /// Registry host
    pub registry: Option<String>,
    /// Namespace
    pub namespace: Option<String>,
    /// Image name
    pub name: Option<String>,
    /// Tag
    pub tag: Option<String>,
}

/// `[build]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Build descriptor path
    pub file: Option<PathBuf>,
    /// Build context path
    pub context: Option<PathBuf>,
}

/// `[engine]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// `docker` or `podman`
    pub kind: Option<String>,
    /// Executable path
    pub path: Option<PathBuf>,
    /// Registry username
    pub username: Option<String>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text
    pub fn parse(path: &Path, contents: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a layer from disk, returning `None` when the file does not exist
    pub fn load_optional(path: &Path) -> std::result::Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                log::debug!("Loaded config file {}", path.display());
                Self::parse(path, &contents).map(Some)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load a layer that must exist
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(path, &contents)
    }

    /// Merge `over` on top of `self`; values set in `over` win
    pub fn overlay(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            image: ImageSection {
                registry: over.image.registry.or(self.image.registry),
                namespace: over.image.namespace.or(self.image.namespace),
                name: over.image.name.or(self.image.name),
                tag: over.image.tag.or(self.image.tag),
            },
            build: BuildSection {
                file: over.build.file.or(self.build.file),
                context: over.build.context.or(self.build.context),
            },
            engine: EngineSection {
                kind: over.engine.kind.or(self.engine.kind),
                path: over.engine.path.or(self.engine.path),
                username: over.engine.username.or(self.engine.username),
            },
        }
    }

    /// Fill remaining gaps with defaults and validate.
    ///
    /// `workdir` supplies the default image name (its final component, lowercased).
    pub fn resolve(self, workdir: &Path) -> Result<Settings> {
        let registry = self
            .image
            .registry
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        let namespace = self.image.namespace.unwrap_or_else(default_namespace);
        let image_name = self
            .image
            .name
            .unwrap_or_else(|| default_image_name(workdir));
        let tag = self.image.tag.unwrap_or_else(|| DEFAULT_TAG.to_string());

        let release = ReleaseConfig::new(registry, namespace, image_name, tag)?;

        let defaults = BuildSettings::default();
        let build = BuildSettings {
            descriptor: self.build.file.unwrap_or(defaults.descriptor),
            context: self.build.context.unwrap_or(defaults.context),
        };

        let kind = match self.engine.kind {
            Some(name) => name.parse::<EngineKind>()?,
            None => EngineKind::default(),
        };
        let engine = EngineSettings {
            kind,
            path: self.engine.path,
            username: self.engine.username.filter(|u| !u.trim().is_empty()),
        };

        Ok(Settings {
            release,
            build,
            engine,
        })
    }
}

/// Path of the per-user config file, if the platform has a config directory
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("image-release").join("config.toml"))
}

/// Load the user and project layers and stack `overrides` on top.
///
/// An explicitly requested project file must exist; the implicit ones are optional.
pub fn load_settings(
    workdir: &Path,
    explicit_project_file: Option<&Path>,
    overrides: ConfigLayer,
) -> Result<Settings> {
    let mut layer = ConfigLayer::default();

    if let Some(user_path) = user_config_path()
        && let Some(user_layer) = ConfigLayer::load_optional(&user_path)?
    {
        layer = layer.overlay(user_layer);
    }

    let project_layer = match explicit_project_file {
        Some(path) => Some(ConfigLayer::load(path)?),
        None => ConfigLayer::load_optional(&workdir.join(PROJECT_CONFIG_FILE))?,
    };
    if let Some(project_layer) = project_layer {
        layer = layer.overlay(project_layer);
    }

    layer.overlay(overrides).resolve(workdir)
}

fn default_namespace() -> String {
    std::env::var("USER")
        .ok()
        .map(|user| user.trim().to_lowercase())
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

fn default_image_name(workdir: &Path) -> String {
    workdir
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
