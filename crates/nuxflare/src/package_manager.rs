use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{process::Invocation, state::StateDir};

/// Lockfiles used to detect the package manager, in the order of precedence.
const LOCKFILES: [(&str, PackageManager); 3] = [
    ("bun.lockb", PackageManager::Bun),
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
];

/// Supported JavaScript package managers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PackageManager {
    /// `npm`, also used when nothing else is detected.
    #[default]
    Npm,

    /// `pnpm`.
    Pnpm,

    /// `bun`.
    Bun,

    /// `yarn`.
    Yarn,
}

impl PackageManager {
    /// All package managers, in the order they are offered during project setup.
    pub(crate) const ALL: [PackageManager; 4] = [
        PackageManager::Npm,
        PackageManager::Pnpm,
        PackageManager::Bun,
        PackageManager::Yarn,
    ];

    /// Package manager binary name.
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
            PackageManager::Yarn => "yarn",
        }
    }

    /// Detect the package manager used by the project in `project_dir`.
    ///
    /// The choice saved by `init` wins; lockfiles are consulted otherwise,
    /// falling back to npm.
    pub(crate) fn detect(project_dir: &Path, state: &StateDir) -> Self {
        match state.read_settings() {
            Ok(settings) => {
                debug!(package_manager = %settings.package_manager, "using saved package manager");
                settings.package_manager
            }
            Err(error) => {
                debug!(%error, "no saved package manager, checking lockfiles");
                Self::from_lockfiles(project_dir)
            }
        }
    }

    /// Detect the package manager from lockfiles present in `project_dir`.
    pub(crate) fn from_lockfiles(project_dir: &Path) -> Self {
        LOCKFILES
            .iter()
            .find(|(lockfile, _)| project_dir.join(lockfile).exists())
            .map(|(_, package_manager)| *package_manager)
            .unwrap_or_default()
    }

    /// Invocation of a binary installed in the project's dependencies.
    pub(crate) fn exec(&self, binary: &str) -> Invocation {
        match self {
            PackageManager::Npm => Invocation::new("npx").arg(binary),
            PackageManager::Pnpm => Invocation::new("pnpm").args(["exec", binary]),
            PackageManager::Bun => Invocation::new("bunx").arg(binary),
            PackageManager::Yarn => Invocation::new("yarn").arg(binary),
        }
    }

    /// Invocation that installs `packages` as development dependencies.
    pub(crate) fn install_dev(&self, packages: &[&str]) -> Invocation {
        let subcommand = match self {
            PackageManager::Npm => "install",
            _ => "add",
        };

        Invocation::new(self.as_str())
            .args([subcommand, "-D"])
            .args(packages.iter().copied())
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::PackageManager;
    use crate::state::{ProjectSettings, StateDir};

    #[test]
    fn defaults_to_npm() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(PackageManager::from_lockfiles(dir.path()), PackageManager::Npm);
    }

    #[test]
    fn lockfile_detection() {
        for (lockfile, expected) in [
            ("bun.lockb", PackageManager::Bun),
            ("pnpm-lock.yaml", PackageManager::Pnpm),
            ("yarn.lock", PackageManager::Yarn),
        ] {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join(lockfile), "").unwrap();

            assert_eq!(PackageManager::from_lockfiles(dir.path()), expected);
        }
    }

    #[test]
    fn bun_lockfile_has_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();
        fs::write(dir.path().join("bun.lockb"), "").unwrap();

        assert_eq!(PackageManager::from_lockfiles(dir.path()), PackageManager::Bun);
    }

    #[test]
    fn saved_settings_win_over_lockfiles() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();

        let state = StateDir::new(dir.path().join(".nuxflare/state"));

        assert_eq!(PackageManager::detect(dir.path(), &state), PackageManager::Yarn);

        state
            .write_settings(&ProjectSettings {
                package_manager: PackageManager::Pnpm,
            })
            .unwrap();

        assert_eq!(PackageManager::detect(dir.path(), &state), PackageManager::Pnpm);
    }

    #[test]
    fn exec_commands() {
        assert_eq!(PackageManager::Npm.exec("sst").to_string(), "npx sst");
        assert_eq!(PackageManager::Pnpm.exec("sst").to_string(), "pnpm exec sst");
        assert_eq!(PackageManager::Bun.exec("sst").to_string(), "bunx sst");
        assert_eq!(PackageManager::Yarn.exec("sst").to_string(), "yarn sst");
    }

    #[test]
    fn install_dev_commands() {
        let packages = ["sst", "wrangler"];

        assert_eq!(
            PackageManager::Npm.install_dev(&packages).to_string(),
            "npm install -D sst wrangler"
        );
        assert_eq!(
            PackageManager::Pnpm.install_dev(&packages).to_string(),
            "pnpm add -D sst wrangler"
        );
        assert_eq!(
            PackageManager::Yarn.install_dev(&packages).to_string(),
            "yarn add -D sst wrangler"
        );
    }
}
