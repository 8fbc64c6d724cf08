//! # Nuxflare
//!
//! Deploy Nuxt apps to Cloudflare by driving SST, Wrangler and the Nuxt CLI.
//!
//! # Stages
//!
//! Every command except `init` operates on a single stage, selected either with
//! `--stage <name>` for preview deployments or with `--production`. Commands refuse
//! to run when neither flag is given.
//!
//! # Credentials
//!
//! Commands that provision resources need a Cloudflare API token. See the
//! [`credentials`] module for the lookup order and caching rules.
//!
//! # Project state
//!
//! Deployed URLs and secrets are read from the state directory populated by SST.
//! See the [`state`] module for the directory layout.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use commands::{Cli, Commands};
use common::{config::Config, logging};
use itertools::Itertools;
use tracing::debug;

/// CLI subcommands.
mod commands;

/// Cloudflare API token discovery, verification and caching.
mod credentials;

/// Package manager detection.
mod package_manager;

/// External command execution.
mod process;

/// Stage selection.
mod stage;

/// Project state directory access.
mod state;

/// Terminal output and prompts.
mod ui;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            debug!("{error:?}");

            // Command errors already embed their causes, so only the
            // context and the command error itself are shown.
            ui::error(format!("❌ {}", error.chain().take(2).join(": ")));
            ExitCode::FAILURE
        }
    }
}

/// Load configuration and dispatch the selected subcommand.
async fn run(cli: Cli) -> Result<(), anyhow::Error> {
    let config = Config::new(cli.config_file).context("Unable to load configuration")?;

    logging::init(&config);

    match cli.command {
        Commands::Init => commands::init(&config)
            .await
            .context("Error initializing nuxflare")?,
        Commands::Deploy(args) => commands::deploy(args, &config)
            .await
            .context("Deployment failed")?,
        Commands::Remove(args) => commands::remove(args, &config)
            .await
            .context("Removal failed")?,
        Commands::Dev(args) => commands::dev(args, &config)
            .await
            .context("Failed to start development server")?,
        Commands::Open(args) => commands::open(args, &config)
            .await
            .context("Failed to open project URL")?,
        Commands::Logs(args) => commands::logs(args, &config)
            .await
            .context("Failed to fetch logs")?,
        Commands::CopyEnv(args) => commands::copy_env(args, &config)
            .await
            .context("Failed to copy environment variables")?,
    }

    Ok(())
}
