use std::{
    env, fs, io,
    path::Path,
    time::Duration,
};

use common::config::Config;
use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::{
    package_manager::PackageManager,
    process::ProcessError,
    state::{ProjectSettings, StateDir, StateError},
    ui,
};

/// Files that mark the working directory as a Nuxt project.
const NUXT_CONFIG_FILES: [&str; 2] = ["nuxt.config.ts", "nuxt.config.js"];

/// Infrastructure configuration generated for the project.
const SST_CONFIG_FILE: &str = "sst.config.ts";

/// Infrastructure configuration template.
const SST_CONFIG_TEMPLATE: &str = include_str!("../../templates/sst.config.ts");

/// Entries that must be present in the project's `.gitignore`.
const IGNORED_ENTRIES: [&str; 2] = [".sst", ".nuxflare"];

/// Tooling installed into the project as development dependencies.
const DEV_DEPENDENCIES: [&str; 2] = ["sst", "wrangler"];

/// `init` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum InitError {
    /// Working directory does not contain a Nuxt configuration file.
    #[display(fmt = "No nuxt.config file found. Please run this command in a Nuxt project.")]
    NotANuxtProject,

    /// User cancelled one of the setup prompts.
    #[display(fmt = "Setup cancelled")]
    Cancelled,

    /// IO-related error.
    Io(io::Error),

    /// Unable to save project settings.
    State(StateError),

    /// Unable to serialize template values.
    Json(serde_json::Error),

    /// Dependency installation failure.
    #[display(fmt = "unable to install dependencies: {}", _0)]
    Install(ProcessError),
}

/// Answers collected from the setup prompts.
#[derive(Debug)]
struct Answers {
    /// Infrastructure app name.
    project_name: String,

    /// Package manager used by the project.
    package_manager: PackageManager,

    /// Custom domain of the production stage.
    prod_domain: Option<String>,

    /// Parent domain of preview stages.
    dev_domain: Option<String>,
}

/// Init flow entrypoint.
pub(crate) async fn init(config: &Config) -> Result<(), InitError> {
    ui::intro("👋 Welcome to Nuxflare Setup!");
    ui::info("Let's get your Nuxt.js project ready for Cloudflare deployment.");

    let project_dir = env::current_dir()?;

    if !is_nuxt_project(&project_dir) {
        return Err(InitError::NotANuxtProject);
    }

    let answers = prompt(&project_dir).map_err(|error| {
        debug!(%error, "setup prompt failed");
        ui::cancel("Setup cancelled");
        InitError::Cancelled
    })?;

    debug!(?answers, "setup answers collected");

    let state = StateDir::new(project_dir.join(&config.paths.state));
    let progress = ProgressBar::new_spinner();
    progress.enable_steady_tick(Duration::from_millis(150));

    if let Err(error) = configure(&project_dir, &state, &answers, &progress).await {
        progress.abandon_with_message("Setup failed.");
        return Err(error);
    }

    progress.finish_with_message("Project configured.");

    info!(project = %answers.project_name, "project initialized");
    ui::success("✅ Successfully initialized Nuxflare!");

    ui::note(
        "Next steps",
        &[
            format!(
                "1. Run {} to do a preview deployment.",
                ui::highlight("nuxflare deploy --stage <stage>")
            ),
            format!(
                "2. Run {} to deploy to production.",
                ui::highlight("nuxflare deploy --production")
            ),
            format!(
                "3. Run {} to run a local dev server and connect to remote resources.",
                ui::highlight("nuxflare dev --stage <stage>")
            ),
            format!(
                "4. Run {} to copy environment variables from a .env file to a stage.",
                ui::highlight("nuxflare copy-env --stage <stage> --file .env")
            ),
        ],
    );

    Ok(())
}

/// Check whether `dir` contains a Nuxt configuration file.
fn is_nuxt_project(dir: &Path) -> bool {
    NUXT_CONFIG_FILES
        .iter()
        .any(|file| dir.join(file).is_file())
}

/// Ask the setup questions.
fn prompt(project_dir: &Path) -> Result<Answers, dialoguer::Error> {
    let default_name = project_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let project_name = ui::input("What is your project name?", default_name)?;

    let package_manager = PackageManager::ALL[ui::select(
        "Which package manager do you use?",
        &PackageManager::ALL,
        0,
    )?];

    let prod_domain = ui::input(
        "What is your production domain? (Leave empty to use automatic Cloudflare Workers subdomain)",
        None,
    )?;

    let dev_domain = ui::input(
        "What is your development domain for preview deployments? (Leave empty to use automatic Cloudflare Workers subdomain)",
        None,
    )?;

    Ok(Answers {
        project_name,
        package_manager,
        prod_domain: Some(prod_domain).filter(|domain| !domain.is_empty()),
        dev_domain: Some(dev_domain).filter(|domain| !domain.is_empty()),
    })
}

/// Generate project files and install the tooling.
async fn configure(
    project_dir: &Path,
    state: &StateDir,
    answers: &Answers,
    progress: &ProgressBar,
) -> Result<(), InitError> {
    progress.set_message(format!("Writing {SST_CONFIG_FILE}..."));

    fs::write(
        project_dir.join(SST_CONFIG_FILE),
        render_sst_config(SST_CONFIG_TEMPLATE, answers)?,
    )?;

    progress.set_message("Saving project settings...");

    state.write_settings(&ProjectSettings {
        package_manager: answers.package_manager,
    })?;

    progress.set_message("Updating .gitignore...");

    update_gitignore(project_dir)?;

    progress.set_message(format!(
        "Installing SST.dev and Wrangler with {}...",
        answers.package_manager
    ));

    let output = answers
        .package_manager
        .install_dev(&DEV_DEPENDENCIES)
        .run_captured()
        .await?;
    progress.suspend(|| print!("{output}"));

    progress.set_message("Initializing SST.dev...");

    let output = answers
        .package_manager
        .exec("sst")
        .arg("install")
        .run_captured()
        .await?;
    progress.suspend(|| print!("{output}"));

    Ok(())
}

/// Fill in the infrastructure configuration template.
///
/// Empty domains are rendered as `undefined`, which makes the infrastructure tool
/// fall back to the automatic Workers subdomain.
fn render_sst_config(template: &str, answers: &Answers) -> Result<String, serde_json::Error> {
    let domain = |value: &Option<String>| -> Result<String, serde_json::Error> {
        match value {
            Some(domain) => serde_json::to_string(domain),
            None => Ok(String::from("undefined")),
        }
    };

    Ok(template
        .replacen(
            "\"__PROJECT_NAME__\"",
            &serde_json::to_string(&answers.project_name)?,
            1,
        )
        .replacen("\"__PROD_DOMAIN__\"", &domain(&answers.prod_domain)?, 1)
        .replacen("\"__DEV_DOMAIN__\"", &domain(&answers.dev_domain)?, 1))
}

/// Make sure the project's `.gitignore` lists infrastructure state directories.
fn update_gitignore(project_dir: &Path) -> io::Result<()> {
    let path = project_dir.join(".gitignore");

    let existing = match fs::read_to_string(&path) {
        Ok(content) => Some(content),
        Err(error) if error.kind() == io::ErrorKind::NotFound => None,
        Err(error) => return Err(error),
    };

    if let Some(content) = gitignore_with_entries(existing.as_deref()) {
        fs::write(path, content)?;
    }

    Ok(())
}

/// Append missing [`IGNORED_ENTRIES`] to `.gitignore` contents.
///
/// Returns [`None`] if nothing has to be changed.
fn gitignore_with_entries(existing: Option<&str>) -> Option<String> {
    let existing = existing.unwrap_or_default();

    let missing: Vec<&str> = IGNORED_ENTRIES
        .iter()
        .copied()
        .filter(|entry| {
            !existing
                .lines()
                .map(|line| line.trim().trim_matches('/'))
                .any(|line| line == *entry)
        })
        .collect();

    if missing.is_empty() {
        return None;
    }

    let mut content = existing.to_owned();

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }

    for entry in missing {
        content.push_str(entry);
        content.push('\n');
    }

    Some(content)
}
