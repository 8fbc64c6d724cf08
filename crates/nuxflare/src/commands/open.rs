use std::io;

use common::config::Config;
use derive_more::{Display, Error, From};
use owo_colors::OwoColorize;

use crate::{
    commands::{Project, StageCommand},
    stage::MissingStageError,
    state::StateError,
    ui,
};

/// `open` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum OpenError {
    /// No stage was selected.
    MissingStage(MissingStageError),

    /// Unable to read the stage state.
    #[display(fmt = "Failed to read project configuration: {}", _0)]
    ProjectConfig(StateError),

    /// Browser could not be launched.
    #[display(fmt = "unable to launch the browser: {}", _0)]
    Browser(io::Error),
}

/// Open flow entrypoint.
pub(crate) async fn open(
    StageCommand { stage }: StageCommand,
    config: &Config,
) -> Result<(), OpenError> {
    ui::intro("🌐 Opening project in browser...");

    let stage = stage.resolve()?;

    if stage.is_named_production() {
        ui::warn("Warning: You're opening the production environment.");
    }

    ui::step(format!("Getting URL for stage: {stage}"));

    let project = Project::current(config);
    let project_config = project.state.project_config(&stage)?;

    ui::info(format!("Opening {stage} ({})", project_config.url.blue()));

    ::open::that(&project_config.url)?;

    ui::success(format!(
        "Successfully opened {stage} project URL in your browser"
    ));

    Ok(())
}
