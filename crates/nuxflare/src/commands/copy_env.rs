use std::{collections::BTreeMap, path::Path};

use common::config::Config;
use derive_more::{Display, Error, From};
use tracing::info;

use crate::{
    commands::{CopyEnv, Project},
    process::ProcessError,
    stage::MissingStageError,
    ui,
};

/// Name of the infrastructure secret that receives the environment.
const SECRET_NAME: &str = "Env";

/// `copy-env` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum CopyEnvError {
    /// No stage was selected.
    MissingStage(MissingStageError),

    /// Unable to read or parse the environment file.
    #[display(fmt = "unable to read environment file: {}", _0)]
    EnvFile(dotenvy::Error),

    /// Unable to serialize variables.
    Json(serde_json::Error),

    /// Infrastructure tool failure.
    #[display(fmt = "unable to run sst: {}", _0)]
    Sst(ProcessError),

    /// Confirmation prompt failed.
    #[display(fmt = "unable to read confirmation: {}", _0)]
    Prompt(dialoguer::Error),
}

/// Copy environment flow entrypoint.
pub(crate) async fn copy_env(
    CopyEnv { stage, file, yes }: CopyEnv,
    config: &Config,
) -> Result<(), CopyEnvError> {
    ui::intro("📦 Copying environment variables...");

    let stage = stage.resolve()?;
    let variables = read_env_file(&file)?;

    println!("\nEnvironment variables to be copied:");
    println!("{}", serde_json::to_string_pretty(&variables)?);

    let confirmed = yes
        || ui::confirm(
            format!("Do you want to copy these variables for the stage: {stage}"),
            false,
        )?;

    if !confirmed {
        ui::cancel("Operation cancelled");
        return Ok(());
    }

    let project = Project::current(config);

    project
        .package_manager
        .exec("sst")
        .args(["secret", "set", SECRET_NAME])
        .arg(serde_json::to_string(&variables)?)
        .args(["--stage", stage.name()])
        .run()
        .await?;

    info!(%stage, count = variables.len(), "environment copied");
    ui::success(format!(
        "Environment variables successfully copied to stage {stage}!"
    ));

    Ok(())
}

/// Parse a `.env` file into an ordered map of variables.
fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, dotenvy::Error> {
    dotenvy::from_path_iter(path)?.collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_json::assert_json;

    use super::read_env_file;

    #[test]
    fn parses_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# database\nDATABASE_URL=postgres://localhost/app\nAPI_KEY=\"quoted value\"\nEMPTY=\n",
        )
        .unwrap();

        let variables = read_env_file(&path).unwrap();

        assert_json!(serde_json::to_value(&variables).unwrap(), {
            "API_KEY": "quoted value",
            "DATABASE_URL": "postgres://localhost/app",
            "EMPTY": ""
        });
    }

    #[test]
    fn missing_env_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(read_env_file(&dir.path().join(".env")).is_err());
    }

    #[test]
    fn env_file_does_not_touch_process_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "NUXFLARE_COPY_ENV_TEST_ONLY=1\n").unwrap();

        read_env_file(&path).unwrap();

        assert!(std::env::var("NUXFLARE_COPY_ENV_TEST_ONLY").is_err());
    }
}
