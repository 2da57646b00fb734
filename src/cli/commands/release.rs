//! The release command: resolve settings, wire the real engine and terminal
//! prompt into the orchestrator, run it.

use crate::cli::{Args, RuntimeConfig};
use crate::config::load_settings;
use crate::engine::CliEngine;
use crate::error::Result;
use crate::orchestrator::{ReleaseOptions, ReleaseOrchestrator, TerminalConfirmation};

/// Execute the release in the current directory
pub(super) async fn execute_release(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let workdir = std::env::current_dir()?;
    let settings = load_settings(&workdir, args.config.as_deref(), args.overrides())?;

    config.output().info(&format!(
        "Releasing {}",
        settings.release.full_image_reference()
    ));
    config.verbose_println(&format!(
        "Engine: {} | Descriptor: {} | Context: {}",
        settings.engine.kind,
        settings.build.descriptor.display(),
        settings.build.context.display()
    ));

    let engine = CliEngine::new(&settings.engine, config.output().clone());
    let confirmation = TerminalConfirmation::new(config.output().clone(), config.confirm_timeout());
    let options = ReleaseOptions {
        build: settings.build.clone(),
        username: settings.engine.username.clone(),
        assume_yes: config.assume_yes(),
    };

    let mut orchestrator =
        ReleaseOrchestrator::new(&engine, &confirmation, config.output(), workdir, options);
    let outcome = orchestrator.run(&settings.release).await?;

    log::debug!("Release finished in phase '{}'", orchestrator.phase());
    Ok(outcome.exit_code())
}
