//! # Project state
//!
//! The infrastructure tool writes per-stage state into the project state directory:
//!
//! ```text
//! .nuxflare/state/
//! ├── config.json              project settings saved by `init`
//! └── <stage>/
//!     └── <app>/
//!         ├── state.json       deployed URL and hub secret
//!         └── wrangler.json    Workers CLI configuration
//! ```
//!
//! Stage state is never written by this crate.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{package_manager::PackageManager, stage::Stage};

/// Per-app state file name.
const STATE_FILE: &str = "state.json";

/// Per-app Workers CLI configuration file name.
const WRANGLER_FILE: &str = "wrangler.json";

/// Project settings file name, relative to the state directory root.
const SETTINGS_FILE: &str = "config.json";

/// Project state errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum StateError {
    /// IO-related error.
    Io(io::Error),

    /// JSON parsing error.
    Json(serde_json::Error),

    /// Stage directory exists, but contains no apps.
    #[display(fmt = "No apps found in stage")]
    NoApps,

    /// State file lacks the deployed URL or the hub secret.
    #[display(fmt = "Invalid state file")]
    InvalidStateFile,
}

/// State of a single deployed app, as written by the infrastructure tool.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StageState {
    /// Public URL of the deployed app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,

    /// Secret used to connect a local dev server to remote resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nuxt_hub_secret: Option<String>,
}

/// Connection details of a deployed stage.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ProjectConfig {
    /// Public URL of the deployed app.
    pub url: String,

    /// Hub secret key.
    pub secret: String,
}

/// Project settings saved during `init`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectSettings {
    /// Package manager chosen by the user.
    pub package_manager: PackageManager,
}

/// Project state directory.
pub(crate) struct StateDir {
    /// State directory root.
    root: PathBuf,
}

impl StateDir {
    /// Create a new state directory handle rooted at `root`.
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory containing state of all apps deployed to `stage`.
    pub(crate) fn stage_dir(&self, stage: &Stage) -> PathBuf {
        self.root.join(stage.name())
    }

    /// Names of apps deployed to `stage`, sorted lexicographically.
    pub(crate) fn apps(&self, stage: &Stage) -> Result<Vec<String>, StateError> {
        let mut apps = Vec::new();

        for entry in fs::read_dir(self.stage_dir(stage))? {
            let entry = entry?;

            if !entry.file_type()?.is_dir() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) => apps.push(name),
                Err(name) => debug!(?name, "skipping app with a non-unicode name"),
            }
        }

        apps.sort();

        Ok(apps)
    }

    /// First app deployed to `stage`.
    fn first_app(&self, stage: &Stage) -> Result<String, StateError> {
        self.apps(stage)?
            .into_iter()
            .next()
            .ok_or(StateError::NoApps)
    }

    /// Read the state of a single `app` deployed to `stage`.
    pub(crate) fn read_state(&self, stage: &Stage, app: &str) -> Result<StageState, StateError> {
        read_json(&self.stage_dir(stage).join(app).join(STATE_FILE))
    }

    /// Connection details of the first app deployed to `stage`.
    pub(crate) fn project_config(&self, stage: &Stage) -> Result<ProjectConfig, StateError> {
        let app = self.first_app(stage)?;

        let state = self.read_state(stage, &app)?;

        match (
            state.project_url.filter(|url| !url.is_empty()),
            state.nuxt_hub_secret.filter(|secret| !secret.is_empty()),
        ) {
            (Some(url), Some(secret)) => Ok(ProjectConfig { url, secret }),
            _ => Err(StateError::InvalidStateFile),
        }
    }

    /// Deployed URLs of all apps in `stage`, as `(app, url)` pairs.
    ///
    /// Apps with missing or malformed state files, or without a URL, are skipped.
    pub(crate) fn deployed_urls(&self, stage: &Stage) -> Result<Vec<(String, String)>, StateError> {
        let urls = self
            .apps(stage)?
            .into_iter()
            .filter_map(|app| match self.read_state(stage, &app) {
                Ok(state) => state
                    .project_url
                    .filter(|url| !url.is_empty())
                    .map(|url| (app, url)),
                Err(error) => {
                    debug!(%app, %error, "skipping invalid state file");
                    None
                }
            })
            .collect();

        Ok(urls)
    }

    /// Workers CLI configuration of the first app deployed to `stage`.
    ///
    /// Returns both the app name and the configuration file path.
    pub(crate) fn wrangler_config(&self, stage: &Stage) -> Result<(String, PathBuf), StateError> {
        let app = self.first_app(stage)?;
        let path = self.stage_dir(stage).join(&app).join(WRANGLER_FILE);

        Ok((app, path))
    }

    /// Project settings file location.
    pub(crate) fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Read project settings saved by `init`.
    pub(crate) fn read_settings(&self) -> Result<ProjectSettings, StateError> {
        read_json(&self.settings_path())
    }

    /// Save project settings, creating the state directory if necessary.
    pub(crate) fn write_settings(&self, settings: &ProjectSettings) -> Result<(), StateError> {
        fs::create_dir_all(&self.root)?;
        fs::write(
            self.settings_path(),
            serde_json::to_string_pretty(settings)?,
        )?;

        Ok(())
    }
}

/// Read and parse a JSON file.
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StateError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
