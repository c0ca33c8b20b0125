//! Entry points and the script dispatcher behind them.
//!
//! Every command becomes an [`EntryPoint`] holding the script path and the
//! metadata the script needs. Invoking one spawns the configured interpreter
//! with:
//! - `kill_on_drop(true)` so a timed-out or cancelled script never outlives
//!   its invocation.
//! - `env_clear()` plus [`ALLOWED_ENV_VARS`], then the `PYREVIT_*` context
//!   variables.
//! - Captured stdout/stderr forwarded to the output window.
//!
//! Failures never propagate to the host; they come back as a
//! [`ScriptOutcome`] and are written to the output window.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::config::ScriptConfig;
use crate::host::HostContext;
use crate::loader::output;
use crate::models::extension::CommandId;

/// Environment variables inherited by script processes.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "LANG",
    "RUST_LOG",
    "PYTHONHOME",
    // Windows-specific variables.
    "USERPROFILE",
    "SystemRoot",
    "TEMP",
    "TMP",
    "USERNAME",
    "APPDATA",
    "LOCALAPPDATA",
    "COMSPEC",
];

/// Identity of the invoked command.
pub const COMMAND_ID_ENV: &str = "PYREVIT_COMMAND_ID";
/// Display title of the invoked command.
pub const COMMAND_NAME_ENV: &str = "PYREVIT_COMMAND_NAME";
/// Name of the owning extension.
pub const EXTENSION_ENV: &str = "PYREVIT_EXTENSION";
/// Absolute script path.
pub const SCRIPT_ENV: &str = "PYREVIT_SCRIPT";
/// Platform-joined module search paths.
pub const SEARCH_PATHS_ENV: &str = "PYREVIT_SEARCH_PATHS";
/// Host document/application context as JSON.
pub const CONTEXT_ENV: &str = "PYREVIT_CONTEXT";

/// Interpreter settings shared by all entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRunner {
    /// Interpreter binary.
    pub interpreter: String,
    /// Arguments placed before the script path.
    pub args: Vec<String>,
    /// Upper bound on one run.
    pub timeout: Duration,
}

impl ScriptRunner {
    /// Build a runner from configuration.
    #[must_use]
    pub fn from_config(config: &ScriptConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
        }
    }
}

/// Result of one script run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ScriptOutcome {
    /// Exited with status zero.
    Completed,
    /// Exited with a non-zero status or was killed by a signal.
    Failed {
        /// Exit code, when the process exited normally.
        exit_code: Option<i32>,
        /// Trimmed standard error.
        stderr: String,
    },
    /// Exceeded the runner timeout and was killed.
    TimedOut {
        /// Timeout that elapsed, in milliseconds.
        after_ms: u64,
    },
    /// Cancelled by the caller and killed.
    Cancelled,
    /// The interpreter could not be started or its output collected.
    SpawnFailed {
        /// Underlying error.
        reason: String,
    },
}

impl ScriptOutcome {
    /// Whether the script completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Display for ScriptOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Failed {
                exit_code: Some(code),
                ..
            } => write!(f, "failed with exit code {code}"),
            Self::Failed {
                exit_code: None, ..
            } => f.write_str("terminated by signal"),
            Self::TimedOut { after_ms } => write!(f, "timed out after {after_ms} ms"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::SpawnFailed { reason } => write!(f, "could not start: {reason}"),
        }
    }
}

/// Callable entry point generated for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Command identity.
    pub command: CommandId,
    /// Command title shown in diagnostics.
    pub title: String,
    /// Owning extension name.
    pub extension: String,
    /// Script file.
    pub script: PathBuf,
    /// Module search paths handed to the script.
    pub search_paths: Vec<PathBuf>,
}

impl EntryPoint {
    /// Directory the script runs in.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        self.script.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Run the script with the host context.
    ///
    /// Never fails: every problem is reported through the returned outcome
    /// and the output window.
    pub async fn invoke(
        &self,
        runner: &ScriptRunner,
        context: &HostContext,
        cancel: &CancellationToken,
    ) -> ScriptOutcome {
        let span = info_span!(
            "invoke_command",
            command = %self.command,
            extension = %self.extension,
        );
        let outcome = self.run(runner, context, cancel).instrument(span).await;
        self.surface(&outcome);
        outcome
    }

    /// Blocking form of [`EntryPoint::invoke`] for synchronous hosts.
    ///
    /// Must not be called from inside a Tokio runtime.
    #[must_use]
    pub fn invoke_blocking(&self, runner: &ScriptRunner, context: &HostContext) -> ScriptOutcome {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let outcome = ScriptOutcome::SpawnFailed {
                    reason: format!("failed to build script runtime: {err}"),
                };
                self.surface(&outcome);
                return outcome;
            }
        };
        let cancel = CancellationToken::new();
        runtime.block_on(self.invoke(runner, context, &cancel))
    }

    async fn run(
        &self,
        runner: &ScriptRunner,
        context: &HostContext,
        cancel: &CancellationToken,
    ) -> ScriptOutcome {
        let mut cmd = Command::new(&runner.interpreter);
        cmd.args(&runner.args).arg(&self.script);

        // Strip inherited environment, then inject only the safe allowlist.
        cmd.env_clear();
        for &key in ALLOWED_ENV_VARS {
            if let Ok(val) = std::env::var(key) {
                cmd.env(key, val);
            }
        }

        cmd.env(COMMAND_ID_ENV, self.command.as_str())
            .env(COMMAND_NAME_ENV, &self.title)
            .env(EXTENSION_ENV, &self.extension)
            .env(SCRIPT_ENV, &self.script)
            .env(CONTEXT_ENV, context.to_env_value());

        if !self.search_paths.is_empty() {
            match std::env::join_paths(&self.search_paths) {
                Ok(joined) => {
                    cmd.env(SEARCH_PATHS_ENV, joined);
                }
                Err(err) => warn!(%err, "search paths cannot be joined, omitting"),
            }
        }
        if let Some(handle) = output::window_handle() {
            cmd.env(output::WINDOW_HANDLE_ENV, handle.0.to_string());
        }

        cmd.current_dir(self.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return ScriptOutcome::SpawnFailed {
                    reason: format!("failed to spawn {}: {err}", runner.interpreter),
                }
            }
        };

        info!(pid = child.id().unwrap_or(0), script = %self.script.display(), "script started");

        // Dropping the output future drops the child, which kills it.
        tokio::select! {
            result = tokio::time::timeout(runner.timeout, child.wait_with_output()) => match result {
                Ok(Ok(collected)) => {
                    output::emit(&String::from_utf8_lossy(&collected.stdout));
                    output::emit(&String::from_utf8_lossy(&collected.stderr));
                    if collected.status.success() {
                        ScriptOutcome::Completed
                    } else {
                        ScriptOutcome::Failed {
                            exit_code: collected.status.code(),
                            stderr: String::from_utf8_lossy(&collected.stderr).trim().to_owned(),
                        }
                    }
                }
                Ok(Err(err)) => ScriptOutcome::SpawnFailed {
                    reason: format!("failed to collect script output: {err}"),
                },
                Err(_elapsed) => ScriptOutcome::TimedOut {
                    after_ms: u64::try_from(runner.timeout.as_millis()).unwrap_or(u64::MAX),
                },
            },
            () = cancel.cancelled() => ScriptOutcome::Cancelled,
        }
    }

    fn surface(&self, outcome: &ScriptOutcome) {
        if outcome.is_success() {
            info!(command = %self.command, "script completed");
            return;
        }
        warn!(command = %self.command, %outcome, "script did not complete");
        output::emit(&format!(
            "[{}] {} ({})\n",
            self.title,
            outcome,
            self.script.display()
        ));
    }
}
