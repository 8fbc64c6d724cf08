//! # Cloudflare API token
//!
//! A token is discovered from the `CLOUDFLARE_API_TOKEN` environment variable or
//! from the token file cached in the user's home directory. Discovered tokens are
//! verified with the Workers CLI before use; when none is valid, the user is asked
//! to paste a new one, which may then be cached for future runs.

use std::{
    env, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use common::config::Paths;
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{package_manager::PackageManager, ui};

/// Environment variable that carries the API token, both for overrides and for wrapped tools.
pub(crate) const TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// Token location relative to the user's home directory.
const DEFAULT_TOKEN_PATH: &str = ".nuxflare/token.json";

/// Dashboard link that pre-fills the permissions required for deployments.
const CREATE_TOKEN_LINK: &str = "https://dash.cloudflare.com/profile/api-tokens?permissionGroupKeys=%5B%7B%22key%22:%22ai%22,%22type%22:%22edit%22%7D,%7B%22key%22:%22vectorize%22,%22type%22:%22edit%22%7D,%7B%22key%22:%22d1%22,%22type%22:%22edit%22%7D,%7B%22key%22:%22workers_r2%22,%22type%22:%22edit%22%7D,%7B%22key%22:%22workers_kv_storage%22,%22type%22:%22edit%22%7D,%7B%22key%22:%22workers_scripts%22,%22type%22:%22edit%22%7D,%7B%22key%22:%22memberships%22,%22type%22:%22read%22%7D,%7B%22key%22:%22user_details%22,%22type%22:%22read%22%7D,%7B%22key%22:%22workers_routes%22,%22type%22:%22edit%22%7D%5D&name=Nuxflare";

/// Credential handling errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum CredentialsError {
    /// IO-related error.
    Io(io::Error),

    /// Unable to serialize the token file.
    Json(serde_json::Error),

    /// User's home directory cannot be determined.
    #[display(fmt = "unable to find home directory")]
    HomeDirNotFound,

    /// User cancelled the token prompt.
    #[display(fmt = "Cloudflare API Token is required but was not provided")]
    NotProvided,
}

/// Token file contents.
#[derive(Serialize, Deserialize)]
struct TokenRecord {
    /// Cloudflare API token.
    token: String,
}

/// Cached token file.
pub(crate) struct TokenStore {
    /// Token file location.
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by the file at `path`.
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the configured location, or inside of the home directory.
    pub(crate) fn from_config(paths: &Paths) -> Result<Self, CredentialsError> {
        if let Some(path) = &paths.token {
            return Ok(Self::new(path));
        }

        let mut path = home::home_dir().ok_or(CredentialsError::HomeDirNotFound)?;
        path.push(DEFAULT_TOKEN_PATH);

        Ok(Self::new(path))
    }

    /// Token file location.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token.
    ///
    /// Missing and corrupted files are both reported as no token.
    pub(crate) fn load(&self) -> Option<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) => {
                debug!(path = %self.path.display(), %error, "no cached token");
                return None;
            }
        };

        match serde_json::from_str::<TokenRecord>(&content) {
            Ok(record) => Some(record.token).filter(|token| !token.is_empty()),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "ignoring corrupted token file");
                None
            }
        }
    }

    /// Cache `token`, creating parent directories when necessary.
    pub(crate) fn store(&self, token: &str) -> Result<(), CredentialsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&TokenRecord {
            token: token.to_owned(),
        })?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

        let mut file = options.open(&self.path)?;

        // Creation mode does not apply to files that already exist.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(content.as_bytes())?;

        Ok(())
    }
}

/// Token verification through `wrangler whoami`.
pub(crate) struct Verifier {
    /// Package manager used to run the Workers CLI.
    package_manager: PackageManager,
}

impl Verifier {
    /// Create a verifier that runs the Workers CLI with `package_manager`.
    pub(crate) fn new(package_manager: PackageManager) -> Self {
        Self { package_manager }
    }

    /// Check whether `token` is accepted by Cloudflare.
    ///
    /// Failures to run the Workers CLI count as an invalid token.
    pub(crate) async fn verify(&self, token: &str) -> bool {
        let whoami = self
            .package_manager
            .exec("wrangler")
            .arg("whoami")
            .env(TOKEN_ENV, token);

        match whoami.run_silent().await {
            Ok(valid) => valid,
            Err(error) => {
                debug!(%error, "unable to run token verification");
                false
            }
        }
    }
}

/// Pick an already available token, preferring the environment over the token file.
fn discover(from_env: Option<String>, store: &TokenStore) -> Option<String> {
    from_env
        .filter(|token| !token.trim().is_empty())
        .or_else(|| store.load())
}

/// Obtain a verified Cloudflare API token, prompting the user if necessary.
pub(crate) async fn cloudflare_token(
    store: &TokenStore,
    verifier: &Verifier,
) -> Result<String, CredentialsError> {
    if let Some(token) = discover(env::var(TOKEN_ENV).ok(), store) {
        if verifier.verify(&token).await {
            debug!("existing token verified");
            return Ok(token);
        }

        debug!("existing token was rejected");
    }

    ui::intro("🔑 Cloudflare API Token Required");
    ui::info("You need to create a Cloudflare API Token.");
    ui::info(format!(
        "You can create one using this link: {}",
        ui::highlight(CREATE_TOKEN_LINK)
    ));

    let token = loop {
        let input = ui::password("Enter your Cloudflare API Token:").map_err(|error| {
            debug!(%error, "token prompt failed");
            ui::cancel("Token input cancelled");
            CredentialsError::NotProvided
        })?;

        ui::info("Verifying token...");

        if verifier.verify(&input).await {
            break input;
        }

        ui::error("Invalid token. Please try again.");
    };

    ui::success("Token verified successfully!");

    match ui::confirm(
        "Would you like to store this token for future use on this device?",
        true,
    ) {
        Ok(true) => {
            store.store(&token)?;
            ui::success(format!("Token stored in {}", store.path().display()));
        }
        Ok(false) => {}
        Err(error) => {
            debug!(%error, "store confirmation failed");
            ui::warn("Token will not be stored, but will be used for the current session.");
        }
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use assert_json::assert_json;
    use common::config::Paths;

    use super::{discover, TokenStore};

    #[test]
    fn store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested/token.json"));

        assert_eq!(store.load(), None);

        store.store("abc123").unwrap();

        assert_eq!(store.load().as_deref(), Some("abc123"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_json!(written, { "token": "abc123" });
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        store.store("abc123").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn existing_token_file_is_made_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        fs::write(store.path(), "{ \"token\": \"a much longer previous token\" }").unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.store("abc123").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().as_deref(), Some("abc123"));
    }

    #[test]
    fn corrupted_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{ \"token\": ").unwrap();

        assert_eq!(TokenStore::new(&path).load(), None);

        fs::write(&path, "{ \"other\": \"value\" }").unwrap();

        assert_eq!(TokenStore::new(&path).load(), None);
    }

    #[test]
    fn environment_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.store("from-file").unwrap();

        assert_eq!(
            discover(Some(String::from("from-env")), &store).as_deref(),
            Some("from-env")
        );
        assert_eq!(discover(None, &store).as_deref(), Some("from-file"));
        assert_eq!(
            discover(Some(String::new()), &store).as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn nothing_to_discover() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        assert_eq!(discover(None, &store), None);
    }

    #[test]
    fn configured_path_is_used() {
        let paths = Paths {
            token: Some(PathBuf::from("/tmp/nuxflare-token.json")),
            ..Paths::default()
        };

        let store = TokenStore::from_config(&paths).unwrap();

        assert_eq!(store.path(), PathBuf::from("/tmp/nuxflare-token.json"));
    }
}
