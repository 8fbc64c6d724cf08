use common::config::Config;
use derive_more::{Display, Error, From};
use owo_colors::OwoColorize;
use tracing::{debug, info};

use crate::{
    commands::{Deploy, Project},
    credentials::{self, CredentialsError, TokenStore, Verifier, TOKEN_ENV},
    process::ProcessError,
    stage::{MissingStageError, Stage},
    state::StateDir,
    ui,
};

/// Nitro preset used to build the app for Cloudflare Workers.
const NITRO_PRESET: &str = "cloudflare-module";

/// `deploy` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployError {
    /// No stage was selected.
    MissingStage(MissingStageError),

    /// Unable to obtain an API token.
    Credentials(CredentialsError),

    /// Infrastructure tool failure.
    #[display(fmt = "unable to run sst: {}", _0)]
    Sst(ProcessError),

    /// User declined the production deployment.
    #[display(fmt = "Deployment cancelled")]
    Cancelled,

    /// Confirmation prompt failed.
    #[display(fmt = "unable to read confirmation: {}", _0)]
    Prompt(dialoguer::Error),
}

/// Deploy flow entrypoint.
pub(crate) async fn deploy(
    Deploy { stage, force }: Deploy,
    config: &Config,
) -> Result<(), DeployError> {
    ui::intro("🚀 Deploying...");

    let stage = stage.resolve()?;
    let project = Project::current(config);

    let store = TokenStore::from_config(&config.paths)?;
    let verifier = Verifier::new(project.package_manager);
    let token = credentials::cloudflare_token(&store, &verifier).await?;

    if stage.is_named_production() {
        ui::warn(
            "Warning: 'production' should not be used as a development stage name. \
             Use --production flag for production deployments.",
        );

        if !force && !ui::confirm("Do you want to do a production deployment?", false)? {
            ui::cancel("Deployment cancelled");
            return Err(DeployError::Cancelled);
        }
    }

    ui::step(format!("Deploying to stage: {stage}"));

    project
        .package_manager
        .exec("sst")
        .args(["deploy", "--stage", stage.name(), "--verbose"])
        .env("NITRO_PRESET", NITRO_PRESET)
        .env(TOKEN_ENV, token)
        .run()
        .await?;

    info!(%stage, "deployment finished");
    ui::success(format!("✅ Successfully deployed to {stage}!"));

    display_project_urls(&project.state, &stage);

    Ok(())
}

/// Print URLs of all apps deployed to `stage`.
fn display_project_urls(state: &StateDir, stage: &Stage) {
    match state.deployed_urls(stage) {
        Ok(urls) => {
            if !urls.is_empty() {
                ui::info("📍 Deployed URLs:");
            }

            for (app, url) in urls {
                ui::info(format!("{}: {}", app.bold(), url.blue()));
            }
        }
        Err(error) => {
            debug!(%error, "unable to list deployed URLs");
            ui::error("Unable to read deployment URLs.");
        }
    }
}
