//! Session load report and its parts.

use std::ops::AddAssign;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline stage at which an extension was dropped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Module synthesis produced no result.
    Synthesis,
    /// Another extension with the same identity was already loaded.
    Duplicate,
    /// UI reconciliation failed.
    Composition,
}

/// An extension that contributed no UI this session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ExtensionFailure {
    /// Extension name.
    pub extension: String,
    /// Stage that failed.
    pub stage: FailureStage,
    /// Human-readable reason.
    pub reason: String,
}

/// How a module install changed the registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// No module existed for the extension.
    Fresh,
    /// A module with a different fingerprint was superseded.
    Replaced,
    /// The existing module had the same fingerprint.
    Unchanged,
}

/// An extension whose module and UI were built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoadedExtension {
    /// Extension name.
    pub name: String,
    /// Synthesized module name.
    pub module: String,
    /// Number of commands wired to the UI.
    pub commands: usize,
    /// Registry outcome of the install.
    pub module_status: ModuleStatus,
}

/// Counters produced by UI reconciliation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct UiStats {
    /// Elements that did not exist before.
    pub created: usize,
    /// Managed elements whose metadata or binding changed.
    pub updated: usize,
    /// Elements already matching the descriptor.
    pub unchanged: usize,
}

impl UiStats {
    /// Total number of create and update calls issued to the host.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.created + self.updated
    }
}

impl AddAssign for UiStats {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.unchanged += rhs.unchanged;
    }
}

/// Coarse classification of load time, used only for logging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadSpeed {
    /// Below the threshold.
    Fast,
    /// At or above the threshold.
    Slow,
}

impl LoadSpeed {
    /// Classify an elapsed duration against a threshold.
    #[must_use]
    pub fn classify(elapsed: Duration, threshold: Duration) -> Self {
        if elapsed < threshold {
            Self::Fast
        } else {
            Self::Slow
        }
    }
}

/// Summary of one `load_session` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionReport {
    /// Unique identifier of this load.
    pub session_id: String,
    /// 1 for the initial load, incremented on every reload.
    pub load_number: u32,
    /// Load start timestamp.
    pub started_at: DateTime<Utc>,
    /// Whether this call installed the output redirection.
    pub redirected_output: bool,
    /// Extension roots scanned, in order.
    pub roots: Vec<PathBuf>,
    /// Extensions with working UI, in discovery order.
    pub loaded: Vec<LoadedExtension>,
    /// Extensions dropped this session, in discovery order.
    pub failures: Vec<ExtensionFailure>,
    /// Aggregated reconciliation counters.
    pub ui: UiStats,
    /// Names of lifecycle hooks that returned an error.
    pub failed_hooks: Vec<String>,
    /// Stale host elements removed by the cleanup pass.
    pub removed_elements: usize,
    /// Modules dropped from the registry because their extension vanished.
    pub pruned_modules: usize,
    /// Wall-clock load time.
    pub elapsed_ms: u64,
    /// Fast/slow classification of `elapsed_ms`.
    pub speed: LoadSpeed,
}

impl SessionReport {
    /// Start an empty report for the given load number.
    #[must_use]
    pub fn new(load_number: u32) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            load_number,
            started_at: Utc::now(),
            redirected_output: false,
            roots: Vec::new(),
            loaded: Vec::new(),
            failures: Vec::new(),
            ui: UiStats::default(),
            failed_hooks: Vec::new(),
            removed_elements: 0,
            pruned_modules: 0,
            elapsed_ms: 0,
            speed: LoadSpeed::Fast,
        }
    }

    /// Names of loaded extensions in discovery order.
    #[must_use]
    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|ext| ext.name.as_str()).collect()
    }
}
