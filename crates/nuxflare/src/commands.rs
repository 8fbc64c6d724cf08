/// `copy-env` subcommand.
mod copy_env;

/// `deploy` subcommand.
mod deploy;

/// `dev` subcommand.
mod dev;

/// `init` subcommand.
mod init;

/// `logs` subcommand.
mod logs;

/// `open` subcommand.
mod open;

/// `remove` subcommand.
mod remove;

pub(crate) use copy_env::copy_env;
pub(crate) use deploy::deploy;
pub(crate) use dev::dev;
pub(crate) use init::init;
pub(crate) use logs::logs;
pub(crate) use open::open;
pub(crate) use remove::remove;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use common::config::Config;

use crate::{package_manager::PackageManager, stage::StageArgs, state::StateDir};

/// CLI configuration.
#[derive(Parser)]
#[command(name = "nuxflare", about, version)]
pub(crate) struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Initialize Nuxflare in your existing Nuxt project.
    Init,

    /// Deploy your project to Cloudflare.
    Deploy(Deploy),

    /// Remove all resources for a deployment.
    Remove(Remove),

    /// Run the Nuxt dev server while connecting to remote resources.
    Dev(StageCommand),

    /// Open your project URL in the default browser.
    Open(StageCommand),

    /// View real-time logs from Cloudflare.
    Logs(StageCommand),

    /// Load environment variables from a .env file.
    #[command(alias = "load-env")]
    CopyEnv(CopyEnv),
}

/// Configuration of subcommands that only need a stage.
#[derive(Args)]
pub struct StageCommand {
    /// Stage selection.
    #[command(flatten)]
    stage: StageArgs,
}

/// `deploy` subcommand configuration.
#[derive(Args)]
pub struct Deploy {
    /// Stage selection.
    #[command(flatten)]
    stage: StageArgs,

    /// Skip the confirmation when `production` is passed as a stage name.
    #[arg(short, long)]
    force: bool,
}

/// `remove` subcommand configuration.
#[derive(Args)]
pub struct Remove {
    /// Stage selection.
    #[command(flatten)]
    stage: StageArgs,

    /// Remove resources without asking for confirmation.
    #[arg(short, long)]
    yes: bool,
}

/// `copy-env` subcommand configuration.
#[derive(Args)]
pub struct CopyEnv {
    /// Stage selection.
    #[command(flatten)]
    stage: StageArgs,

    /// Custom .env file path.
    #[arg(long, default_value = ".env")]
    file: PathBuf,

    /// Copy variables without asking for confirmation.
    #[arg(short, long)]
    yes: bool,
}

/// Project-level resources shared by subcommands.
pub(crate) struct Project {
    /// Project state directory.
    pub state: StateDir,

    /// Package manager used to run project binaries.
    pub package_manager: PackageManager,
}

impl Project {
    /// Open the project in the current working directory.
    pub(crate) fn current(config: &Config) -> Self {
        let state = StateDir::new(&config.paths.state);
        let package_manager = PackageManager::detect(Path::new("."), &state);

        Self {
            state,
            package_manager,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands};

    #[test]
    fn cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn stage_flags() {
        let cli = Cli::try_parse_from(["nuxflare", "deploy", "--stage", "dev"]).unwrap();

        let Commands::Deploy(deploy) = cli.command else {
            panic!("expected deploy subcommand");
        };

        assert_eq!(deploy.stage.stage.as_deref(), Some("dev"));
        assert!(!deploy.stage.production);
        assert!(!deploy.force);
    }

    #[test]
    fn stage_requires_value() {
        assert!(Cli::try_parse_from(["nuxflare", "logs", "--stage"]).is_err());
    }

    #[test]
    fn load_env_alias() {
        let cli = Cli::try_parse_from(["nuxflare", "load-env", "--production"]).unwrap();

        let Commands::CopyEnv(copy_env) = cli.command else {
            panic!("expected copy-env subcommand");
        };

        assert!(copy_env.stage.production);
        assert_eq!(copy_env.file.to_str(), Some(".env"));
        assert!(!copy_env.yes);
    }

    #[test]
    fn confirmation_can_be_skipped() {
        let cli = Cli::try_parse_from(["nuxflare", "remove", "--production", "-y"]).unwrap();

        let Commands::Remove(remove) = cli.command else {
            panic!("expected remove subcommand");
        };

        assert!(remove.stage.production);
        assert!(remove.yes);
    }

    #[test]
    fn custom_env_file() {
        let cli = Cli::try_parse_from([
            "nuxflare",
            "copy-env",
            "--stage",
            "dev",
            "--file",
            ".env.dev",
        ])
        .unwrap();

        let Commands::CopyEnv(copy_env) = cli.command else {
            panic!("expected copy-env subcommand");
        };

        assert_eq!(copy_env.file.to_str(), Some(".env.dev"));
    }

    #[test]
    fn stage_flags_are_optional_for_parsing() {
        assert!(Cli::try_parse_from(["nuxflare", "open"]).is_ok());
    }
}
