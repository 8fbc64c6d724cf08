use common::config::Config;
use derive_more::{Display, Error, From};
use tracing::info;

use crate::{
    commands::{Project, Remove},
    process::ProcessError,
    stage::MissingStageError,
    ui,
};

/// `remove` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum RemoveError {
    /// No stage was selected.
    MissingStage(MissingStageError),

    /// Infrastructure tool failure.
    #[display(fmt = "unable to run sst: {}", _0)]
    Sst(ProcessError),

    /// User declined the removal.
    #[display(fmt = "Operation cancelled")]
    Cancelled,

    /// Confirmation prompt failed.
    #[display(fmt = "unable to read confirmation: {}", _0)]
    Prompt(dialoguer::Error),
}

/// Remove flow entrypoint.
pub(crate) async fn remove(
    Remove { stage, yes }: Remove,
    config: &Config,
) -> Result<(), RemoveError> {
    ui::intro("🗑️  Removing resources...");

    let stage = stage.resolve()?;
    let project = Project::current(config);

    let confirmed = if stage.is_production() {
        ui::warn("⚠️  WARNING: You are about to remove PRODUCTION resources!");
        yes || ui::confirm(
            "Are you absolutely sure you want to remove production resources?",
            false,
        )?
    } else {
        yes || ui::confirm(
            format!("Are you sure you want to remove resources from the \"{stage}\" stage?"),
            false,
        )?
    };

    if !confirmed {
        ui::cancel("Operation cancelled");
        return Err(RemoveError::Cancelled);
    }

    ui::step(format!("Removing resources from stage: {stage}"));

    project
        .package_manager
        .exec("sst")
        .args(["remove", "--stage", stage.name()])
        .run()
        .await?;

    info!(%stage, "removal finished");
    ui::success(format!("✅ Successfully removed resources from {stage}!"));

    Ok(())
}
