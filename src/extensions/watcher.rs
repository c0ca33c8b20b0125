//! Filesystem watcher that requests a session reload when extension trees change.
//!
//! [`ExtensionWatcher`] holds one recursive `notify` watch per extension
//! root. Relevant events are forwarded as the changed path over an
//! unbounded channel; the receiver decides when to reload (the CLI
//! debounces bursts of events into a single reload).

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::{AppError, Result};

/// Returns `true` for events that can change an extension tree.
///
/// Access events are ignored, as are editor swap and lock files.
#[must_use]
pub fn is_extension_change(event: &Event) -> bool {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    event.paths.iter().any(|path| !is_scratch_file(path))
}

fn is_scratch_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with('~')
        || name.ends_with(".swp")
        || name.ends_with(".tmp")
        || name.starts_with(".#")
        || name.ends_with(".pyc")
}

/// Watches extension roots for changes.
///
/// Dropping the watcher stops all underlying OS watches.
pub struct ExtensionWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl ExtensionWatcher {
    /// Start watching every root in `roots`.
    ///
    /// Roots that cannot be watched are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the `notify` watcher cannot be created.
    pub fn new(roots: &[PathBuf], tx: UnboundedSender<PathBuf>) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) if is_extension_change(&event) => {
                    if let Some(path) = event.paths.first() {
                        // Receiver gone means the session is shutting down.
                        let _ = tx.send(path.clone());
                    }
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "extension watcher error"),
            },
        )
        .map_err(|err| AppError::Config(format!("failed to create extension watcher: {err}")))?;

        let mut watched = Vec::with_capacity(roots.len());
        for root in roots {
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    info!(root = %root.display(), "watching extension root");
                    watched.push(root.clone());
                }
                Err(err) => warn!(root = %root.display(), %err, "cannot watch extension root"),
            }
        }

        Ok(Self {
            _watcher: watcher,
            roots: watched,
        })
    }

    /// Roots currently watched.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}
