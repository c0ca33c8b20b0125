//! Handle describing a synthesized extension module.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of synthesizing one extension.
///
/// Owned by the session manager for the duration of one load. A reload
/// produces a new value rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AssemblyInfo {
    /// Module name; embeds the extension key and content fingerprint.
    pub name: String,
    /// Registry key of the owning extension.
    pub extension_key: String,
    /// Hex SHA-256 digest over the extension's command metadata.
    pub fingerprint: String,
    /// Extension directory the module was built from.
    pub location: PathBuf,
    /// Number of entry points in the module.
    pub entry_points: usize,
    /// Synthesis timestamp.
    pub created_at: DateTime<Utc>,
}
