use common::config::Config;
use derive_more::{Display, Error, From};
use owo_colors::OwoColorize;

use crate::{
    commands::{Project, StageCommand},
    process::ProcessError,
    stage::MissingStageError,
    state::StateError,
    ui,
};

/// Environment variable with the remote project URL, read by the Nuxt hub module.
const PROJECT_URL_ENV: &str = "NUXT_HUB_PROJECT_URL";

/// Environment variable with the remote project secret, read by the Nuxt hub module.
const PROJECT_SECRET_ENV: &str = "NUXT_HUB_PROJECT_SECRET_KEY";

/// `dev` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DevError {
    /// No stage was selected.
    MissingStage(MissingStageError),

    /// Unable to read the stage state.
    #[display(fmt = "Failed to read project configuration: {}", _0)]
    ProjectConfig(StateError),

    /// Nuxt dev server failure.
    #[display(fmt = "Nuxt dev server failed: {}", _0)]
    DevServer(ProcessError),

    /// User declined to develop against production.
    #[display(fmt = "Development cancelled")]
    Cancelled,

    /// Confirmation prompt failed.
    #[display(fmt = "unable to read confirmation: {}", _0)]
    Prompt(dialoguer::Error),
}

/// Dev flow entrypoint.
pub(crate) async fn dev(
    StageCommand { stage }: StageCommand,
    config: &Config,
) -> Result<(), DevError> {
    ui::intro("🚀 Starting development server...");

    let stage = stage.resolve()?;

    if stage.is_named_production() {
        ui::warn("Warning: Development against production environment is not recommended.");

        if !ui::confirm("Do you want to continue?", false)? {
            ui::cancel("Development cancelled");
            return Err(DevError::Cancelled);
        }
    }

    ui::step(format!("Connecting to stage: {stage}"));

    let project = Project::current(config);
    let project_config = project.state.project_config(&stage)?;

    ui::info(format!("Connected to {stage} ({})", project_config.url.blue()));
    ui::step("Starting Nuxt development server...");

    project
        .package_manager
        .exec("nuxt")
        .args(["dev", "--remote"])
        .env(PROJECT_URL_ENV, project_config.url)
        .env(PROJECT_SECRET_ENV, project_config.secret)
        .run_interruptible()
        .await?;

    Ok(())
}
