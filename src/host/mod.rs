//! Host application abstraction.
//!
//! The [`Host`] trait decouples the loader from the CAD application it runs
//! inside. The loader only needs three things from a host: a lookup of
//! modules the host bootstrap already loaded, a native output window, and a
//! ribbon UI tree it can reconcile through [`HostUi`].

pub mod memory;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::extension::{CommandId, CommandKind, GroupKind};
use crate::Result;

/// Registry key under which the host bootstrap publishes the base support
/// module that provides the output window types.
pub const BASE_MODULE_KEY: &str = "pyrevit.loader.base";

/// Identity of a module already loaded into the host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleIdentity {
    /// Module name.
    pub name: String,
    /// Module version string.
    pub version: String,
    /// On-disk location, when the host knows it.
    pub location: Option<PathBuf>,
}

impl Display for ModuleIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location.display())?;
        }
        Ok(())
    }
}

/// Native handle of an output window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

impl Display for WindowHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Native console window that accepts text.
pub trait OutputWindow: Send + Sync {
    /// Native handle of the window.
    fn handle(&self) -> WindowHandle;

    /// Append text to the window.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the window has been closed by the host.
    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

/// Location of an element in the host ribbon, e.g. `["pyRevit", "Analysis", "ListDWGs"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiPath(Vec<String>);

impl UiPath {
    /// Path of a top-level tab.
    #[must_use]
    pub fn tab(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Build a path from all of its segments.
    #[must_use]
    pub fn from_segments<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Path of a child element.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Segments from the tab downwards.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `self` equals `ancestor` or lies beneath it.
    #[must_use]
    pub fn is_within(&self, ancestor: &Self) -> bool {
        self.0.starts_with(&ancestor.0)
    }
}

impl Display for UiPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Kind of ribbon element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Ribbon tab.
    Tab,
    /// Panel inside a tab.
    Panel,
    /// Container of buttons.
    Group(GroupKind),
    /// Invocable button.
    Button(CommandKind),
}

/// Link from a button to the entry point it invokes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonBinding {
    /// Module holding the entry point.
    pub module: String,
    /// Entry point identity.
    pub command: CommandId,
}

/// Desired state of one ribbon element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiElementSpec {
    /// Element location.
    pub path: UiPath,
    /// Element kind.
    pub kind: ElementKind,
    /// Displayed title.
    pub title: String,
    /// Tooltip text.
    pub tooltip: Option<String>,
    /// Icon file.
    pub icon: Option<PathBuf>,
    /// Entry point binding; buttons only.
    pub binding: Option<ButtonBinding>,
}

impl UiElementSpec {
    /// Spec for a container element with no metadata besides its title.
    #[must_use]
    pub fn container(path: UiPath, kind: ElementKind) -> Self {
        let title = path.segments().last().cloned().unwrap_or_default();
        Self {
            path,
            kind,
            title,
            tooltip: None,
            icon: None,
            binding: None,
        }
    }
}

/// Live ribbon element as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiElement {
    /// Current element state.
    pub spec: UiElementSpec,
    /// Whether the loader created the element and may modify or remove it.
    pub managed: bool,
}

/// Host ribbon UI tree.
///
/// Elements created through this trait are tagged as loader-managed by the
/// host; native elements are reported with `managed == false`.
pub trait HostUi {
    /// Look up an element by path.
    fn find(&self, path: &UiPath) -> Option<UiElement>;

    /// Create a managed element. The parent must exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ui` if the host rejects the element.
    fn create(&mut self, spec: UiElementSpec) -> Result<()>;

    /// Replace the state of an existing managed element.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ui` if the element is missing or not managed.
    fn update(&mut self, spec: UiElementSpec) -> Result<()>;

    /// Remove a managed element and everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ui` if the host refuses the removal.
    fn remove(&mut self, path: &UiPath) -> Result<()>;

    /// Paths of all loader-managed elements.
    fn managed_paths(&self) -> Vec<UiPath>;
}

/// Host process services used by the session loader.
pub trait Host {
    /// Find a module loaded by the host bootstrap, by exact registry key.
    fn find_loaded_module(&self, key: &str) -> Option<ModuleIdentity>;

    /// Create a native output window.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Output` if the host cannot create the window.
    fn create_output_window(&mut self) -> Result<Arc<dyn OutputWindow>>;

    /// Read access to the ribbon UI tree.
    fn ui(&self) -> &dyn HostUi;

    /// Mutable access to the ribbon UI tree.
    fn ui_mut(&mut self) -> &mut dyn HostUi;
}

/// Document and application context handed opaquely to entry points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostContext(pub serde_json::Value);

impl HostContext {
    /// Serialized form passed to scripts.
    #[must_use]
    pub fn to_env_value(&self) -> String {
        if self.0.is_null() {
            "{}".to_owned()
        } else {
            self.0.to_string()
        }
    }
}
