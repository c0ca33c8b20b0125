//! Command metadata read from script headers and `bundle.toml` files.
//!
//! A script may declare module-level string assignments such as
//! `__title__ = 'List DWGs'`. A `bundle.toml` next to the script overrides
//! any of them.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// File name of the per-command metadata override.
pub const BUNDLE_FILE: &str = "bundle.toml";

static HEADER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    match Regex::new(concat!(
        r"(?m)^__(title|doc|author)__\s*=\s*",
        r#"(?:"""((?s:.*?))"""|'''((?s:.*?))'''|'([^'\n]*)'|"([^"\n]*)")"#,
    )) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(%err, "script header pattern failed to compile");
            None
        }
    }
});

/// Metadata declared by a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct CommandMetadata {
    /// Button label.
    pub title: Option<String>,
    /// Tooltip text.
    pub tooltip: Option<String>,
    /// Script author.
    pub author: Option<String>,
}

impl CommandMetadata {
    /// Overlay every field that `other` sets.
    pub fn merge(&mut self, other: Self) {
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.tooltip.is_some() {
            self.tooltip = other.tooltip;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
    }
}

/// Extract `__title__`, `__doc__` and `__author__` from script source.
///
/// Single-line and triple-quoted strings are recognized. The first
/// assignment of each name wins; `__doc__` becomes the tooltip.
#[must_use]
pub fn parse_script_header(source: &str) -> CommandMetadata {
    let mut meta = CommandMetadata::default();
    let Some(re) = HEADER_RE.as_ref() else {
        return meta;
    };

    for caps in re.captures_iter(source) {
        let block = caps.get(2).or_else(|| caps.get(3));
        let line = caps.get(4).or_else(|| caps.get(5));
        let value = match block {
            Some(block) => Some(join_block(block.as_str())),
            None => line.map(|m| m.as_str().to_owned()),
        };
        let slot = match caps.get(1).map(|m| m.as_str()) {
            Some("title") => &mut meta.title,
            Some("doc") => &mut meta.tooltip,
            Some("author") => &mut meta.author,
            _ => continue,
        };
        if slot.is_none() {
            *slot = value;
        }
    }
    meta
}

/// Triple-quoted text with per-line indentation and surrounding blank lines removed.
fn join_block(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a `bundle.toml` document.
///
/// # Errors
///
/// Returns `AppError::Descriptor` on malformed TOML or unknown keys.
pub fn parse_bundle(raw: &str) -> Result<CommandMetadata> {
    toml::from_str(raw).map_err(|err| AppError::Descriptor(format!("invalid {BUNDLE_FILE}: {err}")))
}

/// Read all metadata for the command in `dir` whose script is `script`.
///
/// Problems are returned alongside the metadata collected so far instead
/// of aborting, so the caller can attach them to the command.
#[must_use]
pub fn read_command_metadata(dir: &Path, script: &Path) -> (CommandMetadata, Vec<String>) {
    let mut issues = Vec::new();
    let mut meta = if script.is_file() {
        match std::fs::read_to_string(script) {
            Ok(source) => parse_script_header(&source),
            Err(err) => {
                issues.push(format!("unreadable script {}: {err}", script.display()));
                CommandMetadata::default()
            }
        }
    } else {
        CommandMetadata::default()
    };

    let bundle = dir.join(BUNDLE_FILE);
    if bundle.is_file() {
        match std::fs::read_to_string(&bundle)
            .map_err(AppError::from)
            .and_then(|raw| parse_bundle(&raw))
        {
            Ok(overrides) => meta.merge(overrides),
            Err(err) => issues.push(format!("{}: {err}", bundle.display())),
        }
    }

    if meta.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        issues.push("title must not be blank".to_owned());
    }

    (meta, issues)
}
