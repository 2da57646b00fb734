//! Release sequencing.
//!
//! [`ReleaseOrchestrator`] runs the fixed build-and-push sequence once:
//!
//! ```text
//! Start → PreconditionsChecked → Built → SizeReported → ConfirmationPending
//!       → Declined
//!       → Authenticated → Pushed → Reported
//! ```
//!
//! Every step returns a `Result`; the first fatal error moves the run to
//! [`ReleasePhase::Failed`] and is handed back unchanged. The size report is the
//! only step whose failure is tolerated.

mod prompt;

pub use prompt::{Confirmation, TerminalConfirmation, is_affirmative};

use crate::cli::OutputManager;
use crate::config::{BuildSettings, ReleaseConfig};
use crate::engine::{BuildRequest, ContainerEngine};
use crate::error::{ReleaseError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a release run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePhase {
    /// Nothing has run yet
    Start,
    /// Descriptor found and engine reachable
    PreconditionsChecked,
    /// Image built and tagged locally
    Built,
    /// Size report attempted (best-effort)
    SizeReported,
    /// Waiting for the user
    ConfirmationPending,
    /// User declined; terminal
    Declined,
    /// Logged in to the registry
    Authenticated,
    /// Image pushed
    Pushed,
    /// Success report printed; terminal
    Reported,
    /// A fatal step failed; terminal
    Failed,
}

impl ReleasePhase {
    /// Whether the run is over
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReleasePhase::Declined | ReleasePhase::Reported | ReleasePhase::Failed
        )
    }
}

impl fmt::Display for ReleasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleasePhase::Start => "start",
            ReleasePhase::PreconditionsChecked => "preconditions checked",
            ReleasePhase::Built => "built",
            ReleasePhase::SizeReported => "size reported",
            ReleasePhase::ConfirmationPending => "confirmation pending",
            ReleasePhase::Declined => "declined",
            ReleasePhase::Authenticated => "authenticated",
            ReleasePhase::Pushed => "pushed",
            ReleasePhase::Reported => "reported",
            ReleasePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a run ended when no fatal error occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Image pushed
    Published(ReleaseReport),
    /// User answered anything but yes
    Declined,
}

impl ReleaseOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseOutcome::Published(_) => 0,
            ReleaseOutcome::Declined => 1,
        }
    }
}

/// What gets shown after a successful push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Pushed reference
    pub image_reference: String,
    /// Example pull command
    pub pull_command: String,
    /// Example run command
    pub run_command: String,
}

impl ReleaseReport {
    /// Build the report for an engine and image
    pub fn new(engine_name: &str, config: &ReleaseConfig) -> Self {
        let image_reference = config.full_image_reference();
        Self {
            pull_command: format!("{engine_name} pull {image_reference}"),
            run_command: format!("{engine_name} run --rm -it {image_reference}"),
            image_reference,
        }
    }

    /// Human-readable lines, headline first
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Published {}", self.image_reference),
            "Pull it with:".to_string(),
            format!("  {}", self.pull_command),
            "Run it with:".to_string(),
            format!("  {}", self.run_command),
        ]
    }
}

/// Knobs for one run beyond the image identity
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    /// Descriptor and context, relative to the working directory
    pub build: BuildSettings,
    /// Username passed to registry login
    pub username: Option<String>,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
}

/// Runs the build-and-push sequence against a container engine
pub struct ReleaseOrchestrator<'a, E, C> {
    engine: &'a E,
    confirmation: &'a C,
    output: &'a OutputManager,
    workdir: PathBuf,
    options: ReleaseOptions,
    phase: ReleasePhase,
}

impl<'a, E, C> ReleaseOrchestrator<'a, E, C>
where
    E: ContainerEngine,
    C: Confirmation,
{
    /// Create an orchestrator rooted at `workdir`
    pub fn new(
        engine: &'a E,
        confirmation: &'a C,
        output: &'a OutputManager,
        workdir: impl Into<PathBuf>,
        options: ReleaseOptions,
    ) -> Self {
        Self {
            engine,
            confirmation,
            output,
            workdir: workdir.into(),
            options,
            phase: ReleasePhase::Start,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ReleasePhase {
        self.phase
    }

    /// Run every step once, stopping at the first fatal error
    pub async fn run(&mut self, config: &ReleaseConfig) -> Result<ReleaseOutcome> {
        match self.run_steps(config).await {
            Ok(outcome) => {
                debug_assert!(self.phase.is_terminal());
                Ok(outcome)
            }
            Err(e) => {
                log::debug!("Release failed after phase '{}': {}", self.phase, e);
                self.phase = ReleasePhase::Failed;
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self, config: &ReleaseConfig) -> Result<ReleaseOutcome> {
        self.check_prerequisites().await?;
        self.phase = ReleasePhase::PreconditionsChecked;

        self.build_image(config).await?;
        self.phase = ReleasePhase::Built;

        if let Err(e) = self.report_image_size(config).await {
            if e.is_fatal() {
                return Err(e);
            }
            log::warn!("{e}");
            self.output.warn("Could not determine image size, continuing");
        }
        self.phase = ReleasePhase::SizeReported;

        self.phase = ReleasePhase::ConfirmationPending;
        if !self.confirm_push(config).await {
            self.output.warn("Push cancelled");
            self.phase = ReleasePhase::Declined;
            return Ok(ReleaseOutcome::Declined);
        }

        self.authenticate(config.registry_host()).await?;
        self.phase = ReleasePhase::Authenticated;

        self.push_image(config).await?;
        self.phase = ReleasePhase::Pushed;

        let report = self.report_success(config);
        self.phase = ReleasePhase::Reported;
        Ok(ReleaseOutcome::Published(report))
    }

    fn descriptor_path(&self) -> PathBuf {
        self.workdir.join(&self.options.build.descriptor)
    }

    fn context_path(&self) -> PathBuf {
        self.workdir.join(&self.options.build.context)
    }

    async fn check_prerequisites(&self) -> Result<()> {
        self.output.section("Checking prerequisites");

        let descriptor = self.descriptor_path();
        if !descriptor.is_file() {
            return Err(ReleaseError::Precondition { path: descriptor });
        }
        self.output
            .success(&format!("Found {}", display_relative(&descriptor, &self.workdir)));

        self.engine.probe().await?;
        self.output
            .success(&format!("{} is available", self.engine.name()));
        Ok(())
    }

    async fn build_image(&self, config: &ReleaseConfig) -> Result<()> {
        let reference = config.full_image_reference();
        self.output.section("Building image");
        self.output.progress(&format!("Building {reference}"));

        let descriptor = self.descriptor_path();
        let context = self.context_path();
        self.engine
            .build(BuildRequest {
                descriptor: &descriptor,
                context: &context,
                reference: &reference,
            })
            .await?;

        self.output.success(&format!("Built {reference}"));
        Ok(())
    }

    async fn report_image_size(&self, config: &ReleaseConfig) -> Result<()> {
        let repository = config.repository();
        let images = self.engine.list_images(&repository).await?;
        if images.is_empty() {
            self.output
                .warn(&format!("No local images found for {repository}"));
            return Ok(());
        }

        self.output.info("Local images:");
        for image in images {
            self.output.indent(&format!(
                "{:<48} {:<14} {}",
                image.reference(),
                image.id,
                image.size
            ));
        }
        Ok(())
    }

    async fn confirm_push(&self, config: &ReleaseConfig) -> bool {
        if self.options.assume_yes {
            self.output.info("Skipping confirmation (--yes)");
            return true;
        }
        let question = format!(
            "Push {} to {}?",
            config.full_image_reference(),
            config.registry_host()
        );
        self.confirmation.confirm(&question).await
    }

    async fn authenticate(&self, registry_host: &str) -> Result<()> {
        self.output.section("Publishing");
        self.output.progress(&format!("Logging in to {registry_host}"));
        self.engine
            .login(registry_host, self.options.username.as_deref())
            .await?;
        self.output.success(&format!("Logged in to {registry_host}"));
        Ok(())
    }

    async fn push_image(&self, config: &ReleaseConfig) -> Result<()> {
        let reference = config.full_image_reference();
        self.output.progress(&format!("Pushing {reference}"));
        self.engine.push(&reference).await
    }

    fn report_success(&self, config: &ReleaseConfig) -> ReleaseReport {
        let report = ReleaseReport::new(self.engine.name(), config);
        let mut lines = report.lines().into_iter();
        if let Some(headline) = lines.next() {
            self.output.success(&headline);
        }
        for line in lines {
            self.output.indent(&line);
        }
        report
    }
}

fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
