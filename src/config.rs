//! Loader configuration parsing, validation, and extension root resolution.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Directory under `home_dir` holding the bundled extensions.
const HOME_EXTENSIONS_DIR: &str = "extensions";

/// Script interpreter settings used by generated entry points.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScriptConfig {
    /// Interpreter binary that executes command scripts.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Arguments passed to the interpreter before the script path.
    #[serde(default)]
    pub args: Vec<String>,
    /// Upper bound on a single script run.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Glob patterns (relative to a command directory) that locate its script.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

fn default_interpreter() -> String {
    "python3".into()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_patterns() -> Vec<String> {
    vec!["*script.py".into()]
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            args: Vec::new(),
            timeout_seconds: default_timeout_seconds(),
            patterns: default_patterns(),
        }
    }
}

impl ScriptConfig {
    /// Script timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Session-level tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Loads at or above this duration are reported as slow.
    #[serde(default = "default_slow_load_threshold_ms")]
    pub slow_load_threshold_ms: u64,
}

fn default_slow_load_threshold_ms() -> u64 {
    3000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            slow_load_threshold_ms: default_slow_load_threshold_ms(),
        }
    }
}

impl SessionConfig {
    /// Slow-load threshold as a [`Duration`].
    #[must_use]
    pub fn slow_load_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_load_threshold_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_home_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Loader configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoaderConfig {
    /// Path the configuration was read from; `None` for built-in defaults.
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
    /// Loader installation directory.
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,
    /// Whether `<home_dir>/extensions` is scanned before the user roots.
    #[serde(default = "default_true")]
    pub include_home_extensions: bool,
    /// User extension roots, scanned in order.
    #[serde(default)]
    pub extension_roots: Vec<PathBuf>,
    /// Script interpreter settings.
    #[serde(default)]
    pub scripts: ScriptConfig,
    /// Session tuning.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            home_dir: default_home_dir(),
            include_home_extensions: true,
            extension_roots: Vec::new(),
            scripts: ScriptConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        let mut config = Self::from_toml_str(&raw)?;
        config.config_file = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Directory holding the bundled extensions.
    #[must_use]
    pub fn home_extensions_dir(&self) -> PathBuf {
        self.home_dir.join(HOME_EXTENSIONS_DIR)
    }

    /// Ordered list of extension roots to scan this session.
    ///
    /// The bundled extensions directory comes first when enabled, followed by
    /// the user roots in configuration order. Duplicates are dropped and
    /// roots that are not directories are skipped.
    #[must_use]
    pub fn ext_root_dirs(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(self.extension_roots.len() + 1);
        if self.include_home_extensions {
            candidates.push(self.home_extensions_dir());
        }
        candidates.extend(self.extension_roots.iter().cloned());

        let mut roots: Vec<PathBuf> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !candidate.is_dir() {
                warn!(root = %candidate.display(), "extension root is not a directory, skipping");
                continue;
            }
            let key = candidate
                .canonicalize()
                .unwrap_or_else(|_| candidate.clone());
            if roots
                .iter()
                .any(|seen| seen.canonicalize().unwrap_or_else(|_| seen.clone()) == key)
            {
                debug!(root = %candidate.display(), "duplicate extension root ignored");
                continue;
            }
            roots.push(candidate);
        }
        roots
    }

    fn validate(&self) -> Result<()> {
        if self.scripts.interpreter.trim().is_empty() {
            return Err(AppError::Config(
                "scripts.interpreter must not be empty".into(),
            ));
        }

        if self.scripts.timeout_seconds == 0 {
            return Err(AppError::Config(
                "scripts.timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.scripts.patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(AppError::Config(
                "scripts.patterns must contain at least one pattern".into(),
            ));
        }

        if let Some(bad) = self
            .scripts
            .patterns
            .iter()
            .find(|p| glob::Pattern::new(p).is_err())
        {
            return Err(AppError::Config(format!(
                "scripts.patterns entry is not a valid glob: {bad}"
            )));
        }

        if self
            .extension_roots
            .iter()
            .any(|root| root.as_os_str().is_empty())
        {
            return Err(AppError::Config(
                "extension_roots must not contain empty paths".into(),
            ));
        }

        Ok(())
    }
}
