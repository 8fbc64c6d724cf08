use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Default configuration file, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "Nuxflare.toml";

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "NUXFLARE_";

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
///
/// [`FromStr`]: std::str::FromStr
#[cfg(feature = "logging")]
fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
        }
    }
}

/// Filesystem locations used by the CLI.
#[derive(Deserialize)]
pub struct Paths {
    /// Directory with per-stage state written by the infrastructure tool.
    #[serde(default = "default_state_path")]
    pub state: PathBuf,

    /// Cached API token location.
    ///
    /// When unset, the token is stored inside of the user's home directory.
    #[serde(default)]
    pub token: Option<PathBuf>,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            state: default_state_path(),
            token: None,
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".nuxflare/state")
}

/// General configuration.
#[derive(Deserialize)]
pub struct Config {
    /// Logging configuration.
    #[cfg(feature = "logging")]
    #[serde(default)]
    pub logging: Logging,

    /// Filesystem locations.
    #[serde(default)]
    pub paths: Paths,
}

impl Config {
    /// Create new config using default configuration file or environment variables.
    ///
    /// See [`Env`] for more details on how to use environment variables configuration.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new(path: Option<PathBuf>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Configuration sources, in the order of increasing priority.
    fn figment(path: Option<PathBuf>) -> Figment {
        Figment::new()
            .merge(Toml::file(
                path.unwrap_or(PathBuf::from(DEFAULT_CONFIG_FILE)),
            ))
            .merge(Env::prefixed(ENV_PREFIX).split("_"))
    }
}
