//! Explicit registry of synthesized extension modules.
//!
//! Modules are keyed by stable extension identity. Installing a module for
//! a key that is already present supersedes the old one, so repeated loads
//! of the same extension never leave two modules behind.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::host::ButtonBinding;
use crate::loader::dispatch::EntryPoint;
use crate::models::assembly::AssemblyInfo;
use crate::models::extension::CommandId;
use crate::models::session::ModuleStatus;
use crate::{AppError, Result};

/// A synthesized module: its handle plus one entry point per command.
#[derive(Debug, Clone)]
pub struct ExtensionModule {
    /// Module handle.
    pub info: AssemblyInfo,
    entry_points: BTreeMap<CommandId, EntryPoint>,
}

impl ExtensionModule {
    /// Assemble a module.
    #[must_use]
    pub fn new(info: AssemblyInfo, entry_points: Vec<EntryPoint>) -> Self {
        let entry_points = entry_points
            .into_iter()
            .map(|ep| (ep.command.clone(), ep))
            .collect();
        Self { info, entry_points }
    }

    /// Entry point for a command.
    #[must_use]
    pub fn entry_point(&self, command: &CommandId) -> Option<&EntryPoint> {
        self.entry_points.get(command)
    }

    /// All entry points ordered by command identity.
    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.values()
    }

    /// Number of entry points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entry_points.len()
    }

    /// Whether the module has no entry points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry_points.is_empty()
    }
}

#[derive(Debug)]
struct Slot {
    module: Arc<ExtensionModule>,
    status: ModuleStatus,
}

/// Process-lifetime table of installed modules.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    slots: HashMap<String, Slot>,
}

impl ModuleRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a module under its extension key.
    ///
    /// A module whose fingerprint and entry points match the installed one
    /// is kept as is.
    pub fn install(&mut self, module: ExtensionModule) -> ModuleStatus {
        let key = module.info.extension_key.clone();
        let status = match self.slots.get(&key) {
            None => ModuleStatus::Fresh,
            Some(slot)
                if slot.module.info.fingerprint == module.info.fingerprint
                    && slot.module.entry_points == module.entry_points =>
            {
                ModuleStatus::Unchanged
            }
            Some(_) => ModuleStatus::Replaced,
        };

        debug!(key = %key, module = %module.info.name, ?status, "installing extension module");

        if status == ModuleStatus::Unchanged {
            if let Some(slot) = self.slots.get_mut(&key) {
                slot.status = status;
            }
        } else {
            self.slots.insert(
                key,
                Slot {
                    module: Arc::new(module),
                    status,
                },
            );
        }
        status
    }

    /// Module installed for an extension key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<ExtensionModule>> {
        self.slots.get(key).map(|slot| Arc::clone(&slot.module))
    }

    /// Outcome of the most recent install for `key`.
    #[must_use]
    pub fn status_of(&self, key: &str) -> Option<ModuleStatus> {
        self.slots.get(key).map(|slot| slot.status)
    }

    /// Resolve a button binding to its entry point.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the bound module is no longer
    /// installed (the binding is stale) or lacks the command.
    pub fn resolve(&self, binding: &ButtonBinding) -> Result<&EntryPoint> {
        let module = self
            .slots
            .values()
            .map(|slot| &slot.module)
            .find(|module| module.info.name == binding.module)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "module {} is not installed; binding for {} is stale",
                    binding.module, binding.command
                ))
            })?;
        module.entry_point(&binding.command).ok_or_else(|| {
            AppError::NotFound(format!(
                "module {} has no entry point {}",
                binding.module, binding.command
            ))
        })
    }

    /// Drop every module whose key is not in `live`; returns how many were dropped.
    pub fn retain_keys(&mut self, live: &HashSet<String>) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| live.contains(key));
        before - self.slots.len()
    }

    /// Installed extension keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of installed modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no module is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
