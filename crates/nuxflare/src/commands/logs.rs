use common::config::Config;
use derive_more::{Display, Error, From};
use owo_colors::OwoColorize;
use tracing::debug;

use crate::{
    commands::{Project, StageCommand},
    process::ProcessError,
    stage::MissingStageError,
    state::StateError,
    ui,
};

/// `logs` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum LogsError {
    /// No stage was selected.
    MissingStage(MissingStageError),

    /// Unable to locate the deployed app.
    State(StateError),

    /// Workers CLI failure.
    #[display(fmt = "unable to tail logs: {}", _0)]
    Tail(ProcessError),
}

/// Logs flow entrypoint.
pub(crate) async fn logs(
    StageCommand { stage }: StageCommand,
    config: &Config,
) -> Result<(), LogsError> {
    ui::intro("📋 Fetching logs from deployment...");

    let stage = stage.resolve()?;

    if stage.is_production() {
        ui::warn("Warning: You're viewing logs for the production environment.");
    }

    ui::step(format!("Getting logs for stage: {stage}"));

    let project = Project::current(config);
    let (app, wrangler_config) = project.state.wrangler_config(&stage)?;

    debug!(path = %wrangler_config.display(), "using wrangler config");

    ui::info(format!(
        "Starting logs stream for {} ({} stage)",
        app.bold(),
        stage.blue()
    ));
    ui::info(format!("You can press {} to stop watching logs", "Ctrl+C".bold()));

    project
        .package_manager
        .exec("wrangler")
        .args(["tail", "--format", "pretty", "--config"])
        .arg(wrangler_config.to_string_lossy())
        .run_interruptible()
        .await?;

    Ok(())
}
