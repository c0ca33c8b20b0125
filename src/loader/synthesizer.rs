//! Module synthesis: one extension descriptor in, one dispatch module out.
//!
//! Synthesis validates the command metadata, derives a content fingerprint,
//! builds one [`EntryPoint`] per command and installs the resulting module
//! into the [`ModuleRegistry`] under the extension's key.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info_span, warn};

use crate::loader::dispatch::EntryPoint;
use crate::loader::registry::{ExtensionModule, ModuleRegistry};
use crate::models::assembly::AssemblyInfo;
use crate::models::extension::{Command, UIExtension};
use crate::{AppError, Result};

/// Hex digits of the fingerprint embedded in module names.
const NAME_DIGEST_LEN: usize = 16;

/// Builds dispatch modules for extensions.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    library_paths: Vec<PathBuf>,
}

impl Synthesizer {
    /// Synthesizer with no shared library paths.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizer that appends `library_paths` to every entry point's search path.
    #[must_use]
    pub fn with_library_paths(library_paths: Vec<PathBuf>) -> Self {
        Self { library_paths }
    }

    /// Synthesize and install a module, returning its handle.
    ///
    /// Returns `None` when the extension cannot be synthesized; the reason is
    /// logged and nothing is installed. This is the entry for host-side
    /// callers that only need the handle. [`SessionManager`] calls
    /// [`Synthesizer::synthesize`] instead, because it records the reason in
    /// the session report.
    ///
    /// [`SessionManager`]: crate::loader::SessionManager
    pub fn create_assembly(
        &self,
        extension: &UIExtension,
        registry: &mut ModuleRegistry,
    ) -> Option<AssemblyInfo> {
        match self.synthesize(extension, registry) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(extension = %extension.name, %err, "module synthesis failed");
                None
            }
        }
    }

    /// Synthesize and install a module.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Synthesis` if the extension has no name, a command
    /// has no name, invalid metadata, a missing script, or an identity that
    /// collides with another command.
    pub fn synthesize(
        &self,
        extension: &UIExtension,
        registry: &mut ModuleRegistry,
    ) -> Result<AssemblyInfo> {
        let _span = info_span!("synthesize", extension = %extension.name).entered();

        let module = self.build_module(extension)?;
        let key = module.info.extension_key.clone();
        let status = registry.install(module);
        debug!(key = %key, ?status, "module installed");

        registry
            .get(&key)
            .map(|module| module.info.clone())
            .ok_or_else(|| AppError::Synthesis(format!("module {key} vanished after install")))
    }

    /// Validate the extension and build its module without installing it.
    ///
    /// # Errors
    ///
    /// See [`Synthesizer::synthesize`].
    pub fn build_module(&self, extension: &UIExtension) -> Result<ExtensionModule> {
        let key = extension.key();
        if key.is_empty() {
            return Err(AppError::Synthesis(format!(
                "extension at {} has no usable name",
                extension.directory.display()
            )));
        }

        let commands = extension.commands();
        let mut seen = HashSet::with_capacity(commands.len());
        let mut entry_points = Vec::with_capacity(commands.len());

        for command in &commands {
            validate_command(command)?;
            if !seen.insert(command.id.clone()) {
                return Err(AppError::Synthesis(format!(
                    "duplicate command identity {}",
                    command.id
                )));
            }
            entry_points.push(self.entry_point(extension, command));
        }

        let fingerprint = module_fingerprint(extension, &entry_points);
        let info = AssemblyInfo {
            name: module_name(&key, &fingerprint),
            extension_key: key,
            fingerprint,
            location: extension.directory.clone(),
            entry_points: entry_points.len(),
            created_at: Utc::now(),
        };

        Ok(ExtensionModule::new(info, entry_points))
    }

    fn entry_point(&self, extension: &UIExtension, command: &Command) -> EntryPoint {
        let mut search_paths = command.search_paths.clone();
        for path in &self.library_paths {
            if !search_paths.contains(path) {
                search_paths.push(path.clone());
            }
        }

        EntryPoint {
            command: command.id.clone(),
            title: command.title.clone(),
            extension: extension.name.clone(),
            script: command.script_path.clone(),
            search_paths,
        }
    }
}

fn validate_command(command: &Command) -> Result<()> {
    if command.name.trim().is_empty() || command.id.as_str().is_empty() {
        return Err(AppError::Synthesis(format!(
            "command at {} has no name",
            command.script_path.display()
        )));
    }
    if !command.issues.is_empty() {
        return Err(AppError::Synthesis(format!(
            "command {} has invalid metadata: {}",
            command.id,
            command.issues.join("; ")
        )));
    }
    if !command.script_path.is_file() {
        return Err(AppError::Synthesis(format!(
            "script for command {} not found at {}",
            command.id,
            command.script_path.display()
        )));
    }
    Ok(())
}

/// Module name for an extension key and fingerprint.
#[must_use]
pub fn module_name(key: &str, fingerprint: &str) -> String {
    let digest = fingerprint.get(..NAME_DIGEST_LEN).unwrap_or(fingerprint);
    format!("{key}_{digest}")
}

/// SHA-256 digest over everything that affects an extension's module and UI.
///
/// Script size and modification time are included so an edited script
/// yields a new module even when its metadata is unchanged.
#[must_use]
pub fn fingerprint(extension: &UIExtension) -> String {
    let mut hasher = Sha256::new();
    hasher.update(extension.key().as_bytes());

    for tab in &extension.tabs {
        hasher.update(b"\0tab\0");
        hasher.update(tab.name.as_bytes());
        for panel in &tab.panels {
            hasher.update(b"\0panel\0");
            hasher.update(panel.name.as_bytes());
        }
    }

    for command in extension.commands() {
        hasher.update(b"\0cmd\0");
        hasher.update(command.id.as_str().as_bytes());
        hasher.update(command.title.as_bytes());
        hasher.update(format!("{:?}", command.kind).as_bytes());
        if let Some(tooltip) = &command.tooltip {
            hasher.update(tooltip.as_bytes());
        }
        if let Some(icon) = &command.icon {
            hasher.update(icon.to_string_lossy().as_bytes());
        }
        hasher.update(command.script_path.to_string_lossy().as_bytes());
        if let Ok(meta) = std::fs::metadata(&command.script_path) {
            hasher.update(meta.len().to_le_bytes());
            if let Ok(age) = meta
                .modified()
                .map(|modified| modified.duration_since(UNIX_EPOCH).unwrap_or_default())
            {
                hasher.update(age.as_nanos().to_le_bytes());
            }
        }
    }

    format!("{:x}", hasher.finalize())
}

/// Extension digest extended with the resolved entry points, so a change in
/// the session's library paths yields a new module.
fn module_fingerprint(extension: &UIExtension, entry_points: &[EntryPoint]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint(extension).as_bytes());
    for ep in entry_points {
        hasher.update(b"\0ep\0");
        hasher.update(ep.command.as_str().as_bytes());
        hasher.update(ep.title.as_bytes());
        hasher.update(ep.extension.as_bytes());
        hasher.update(ep.script.to_string_lossy().as_bytes());
        for path in &ep.search_paths {
            hasher.update(b"\0path\0");
            hasher.update(path.to_string_lossy().as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}
