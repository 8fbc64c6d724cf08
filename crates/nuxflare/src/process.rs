use std::{
    fmt, io,
    process::{ExitStatus, Stdio},
};

use derive_more::{Display, Error, From};
use itertools::Itertools;
use tokio::{process::Command, signal};
use tracing::{debug, info};

/// Errors that may occur while running an external command.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ProcessError {
    /// [`which`] crate was unable to determine location of the binary file.
    #[display(fmt = "unable to locate {}: {}", program, source)]
    #[from(ignore)]
    Which {
        /// Program name that was looked up.
        program: String,

        /// Lookup error.
        source: which::Error,
    },

    /// IO-related error.
    Io(io::Error),

    /// Process exited with a non-zero status code.
    #[display(fmt = "process exited with code {}", _0)]
    Exited(#[error(not(source))] i32),

    /// Process exited with a non-zero status code while its output was captured.
    #[display(fmt = "command failed with exit code {}\n{}", code, output)]
    #[from(ignore)]
    Failed {
        /// Process status code.
        code: i32,

        /// Captured stdout and stderr.
        output: String,
    },

    /// Process was terminated by a signal.
    #[display(fmt = "process was terminated by a signal")]
    Terminated,
}

/// A single external command invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Invocation {
    /// Program name, resolved using `PATH` before spawning.
    program: String,

    /// Program arguments.
    args: Vec<String>,

    /// Additional environment variables, set on top of the inherited environment.
    envs: Vec<(String, String)>,
}

impl Invocation {
    /// Create a new invocation of `program` without any arguments.
    pub(crate) fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Append a single argument.
    pub(crate) fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub(crate) fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run the command with inherited stdio and wait for it to finish.
    pub(crate) async fn run(&self) -> Result<(), ProcessError> {
        info!(command = %self, "running command");

        let status = self
            .command()?
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;

        check_status(status)
    }

    /// Run the command with discarded stdio, returning whether it succeeded.
    pub(crate) async fn run_silent(&self) -> Result<bool, ProcessError> {
        debug!(command = %self, "running command silently");

        let status = self
            .command()?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        Ok(status.success())
    }

    /// Run the command while capturing its stdout and stderr.
    ///
    /// Captured output is returned on success and embedded into the error otherwise.
    pub(crate) async fn run_captured(&self) -> Result<String, ProcessError> {
        info!(command = %self, "running command with captured output");

        let output = self
            .command()?
            .stdin(Stdio::null())
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        match check_status(output.status) {
            Ok(()) => Ok(text),
            Err(ProcessError::Exited(code)) => Err(ProcessError::Failed { code, output: text }),
            Err(e) => Err(e),
        }
    }

    /// Run the command with inherited stdio until it exits or the user presses Ctrl+C.
    ///
    /// An interrupt kills the child process and is treated as a regular stop.
    pub(crate) async fn run_interruptible(&self) -> Result<(), ProcessError> {
        info!(command = %self, "running interruptible command");

        let mut child = self
            .command()?
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let status = tokio::select! {
            biased;

            interrupt = signal::ctrl_c() => {
                interrupt?;
                None
            }
            status = child.wait() => Some(status?),
        };

        match status {
            Some(status) => check_status(status),
            None => {
                debug!("interrupt received, stopping child process");

                if let Err(error) = child.kill().await {
                    debug!(%error, "child process already exited");
                }

                Ok(())
            }
        }
    }

    /// Build a [`Command`] with a resolved program path.
    fn command(&self) -> Result<Command, ProcessError> {
        let path = which::which(&self.program).map_err(|source| ProcessError::Which {
            program: self.program.clone(),
            source,
        })?;

        let mut command = Command::new(path);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(key, value)| (key, value)));

        Ok(command)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;

        if !self.args.is_empty() {
            write!(f, " {}", self.args.iter().join(" "))?;
        }

        Ok(())
    }
}

/// Map a process [`ExitStatus`] onto a [`Result`].
fn check_status(status: ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(ProcessError::Exited(code)),
        None => Err(ProcessError::Terminated),
    }
}

#[cfg(test)]
mod tests {
    use super::{Invocation, ProcessError};

    #[test]
    fn display_joins_arguments() {
        let invocation = Invocation::new("npx")
            .args(["sst", "deploy"])
            .arg("--verbose")
            .env("NITRO_PRESET", "cloudflare-module");

        assert_eq!(invocation.to_string(), "npx sst deploy --verbose");
        assert_eq!(Invocation::new("wrangler").to_string(), "wrangler");
    }

    #[tokio::test]
    async fn unknown_program() {
        let result = Invocation::new("nuxflare-test-missing-binary").run().await;

        assert!(matches!(result, Err(ProcessError::Which { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_is_reported() {
        let result = Invocation::new("sh").args(["-c", "exit 3"]).run().await;

        assert!(matches!(result, Err(ProcessError::Exited(3))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn environment_is_passed() {
        let success = Invocation::new("sh")
            .args(["-c", "test \"$NUXFLARE_TEST_VALUE\" = expected"])
            .env("NUXFLARE_TEST_VALUE", "expected")
            .run_silent()
            .await
            .unwrap();

        assert!(success);

        let success = Invocation::new("sh")
            .args(["-c", "test \"$NUXFLARE_TEST_VALUE\" = expected"])
            .run_silent()
            .await
            .unwrap();

        assert!(!success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captured_output() {
        let output = Invocation::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .run_captured()
            .await
            .unwrap();

        assert!(output.contains("out"));
        assert!(output.contains("err"));

        let error = Invocation::new("sh")
            .args(["-c", "echo broken; exit 2"])
            .run_captured()
            .await
            .unwrap_err();

        match error {
            ProcessError::Failed { code, output } => {
                assert_eq!(code, 2);
                assert!(output.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn interruptible_command_finishes() {
        Invocation::new("sh")
            .args(["-c", "exit 0"])
            .run_interruptible()
            .await
            .unwrap();

        let result = Invocation::new("sh")
            .args(["-c", "exit 5"])
            .run_interruptible()
            .await;

        assert!(matches!(result, Err(ProcessError::Exited(5))));
    }
}
