//! Extension descriptor tree: extension → tab → panel → items.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::slug;

/// Stable identity of a command, derived from its position in the tree.
///
/// Identities survive reloads as long as the extension, tab, panel, group and
/// command names do not change, which lets the composer match old buttons to
/// fresh entry points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    /// Derive an identity from the names along the path to the command.
    #[must_use]
    pub fn derive<S: AsRef<str>>(parts: &[S]) -> Self {
        let joined = parts
            .iter()
            .map(|part| slug(part.as_ref()))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        Self(joined)
    }

    /// Identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CommandId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// How a command button is presented by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Plain push button.
    PushButton,
    /// Button whose script may restyle the button it is bound to.
    SmartButton,
}

impl CommandKind {
    /// Map a directory suffix (without the dot) to a command kind.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "pushbutton" => Some(Self::PushButton),
            "smartbutton" => Some(Self::SmartButton),
            _ => None,
        }
    }
}

/// Container kinds that hold further buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Drop-down list of buttons.
    PullDown,
    /// Split button remembering the last used member.
    SplitButton,
    /// Split button that always shows its first member.
    SplitPushButton,
    /// Vertical stack of two or three items.
    Stack,
}

impl GroupKind {
    /// Map a directory suffix (without the dot) to a group kind.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "pulldown" => Some(Self::PullDown),
            "splitbutton" => Some(Self::SplitButton),
            "splitpushbutton" => Some(Self::SplitPushButton),
            "stack" | "stack2" | "stack3" => Some(Self::Stack),
            _ => None,
        }
    }
}

/// A single invocable action backed by a script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Stable identity.
    pub id: CommandId,
    /// Directory name without its suffix.
    pub name: String,
    /// Button label.
    pub title: String,
    /// Tooltip text.
    pub tooltip: Option<String>,
    /// Script author.
    pub author: Option<String>,
    /// Button icon.
    pub icon: Option<PathBuf>,
    /// Script executed when the button is pressed.
    pub script_path: PathBuf,
    /// Presentation kind.
    pub kind: CommandKind,
    /// Extra module search paths handed to the script.
    pub search_paths: Vec<PathBuf>,
    /// Metadata problems found while parsing; a non-empty list makes the
    /// command unusable.
    pub issues: Vec<String>,
}

impl Command {
    /// Construct a push button command with default metadata.
    #[must_use]
    pub fn new(id: CommandId, name: impl Into<String>, script_path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            id,
            title: name.clone(),
            name,
            tooltip: None,
            author: None,
            icon: None,
            script_path: script_path.into(),
            kind: CommandKind::PushButton,
            search_paths: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Directory that holds the command script.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.script_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// A group of buttons presented as a single host control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonGroup {
    /// Directory name without its suffix.
    pub name: String,
    /// Container kind.
    pub kind: GroupKind,
    /// Group icon.
    pub icon: Option<PathBuf>,
    /// Members in display order.
    pub items: Vec<PanelItem>,
}

/// Entry of a panel: either a button or a nested group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelItem {
    /// Single command button.
    Button(Command),
    /// Container of further items.
    Group(ButtonGroup),
}

/// Ribbon panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    /// Panel title.
    pub name: String,
    /// Items in display order.
    pub items: Vec<PanelItem>,
}

/// Ribbon tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    /// Tab title.
    pub name: String,
    /// Panels in display order.
    pub panels: Vec<Panel>,
}

/// One discovered extension, built fresh for every session load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UIExtension {
    /// Extension name (directory name without `.extension`).
    pub name: String,
    /// Extension directory.
    pub directory: PathBuf,
    /// Tabs in display order.
    pub tabs: Vec<Tab>,
}

impl UIExtension {
    /// Construct an extension with no tabs.
    #[must_use]
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            tabs: Vec::new(),
        }
    }

    /// Stable registry key for this extension.
    #[must_use]
    pub fn key(&self) -> String {
        slug(&self.name)
    }

    /// All commands in display order, flattened out of nested groups.
    #[must_use]
    pub fn commands(&self) -> Vec<&Command> {
        let mut out = Vec::new();
        for tab in &self.tabs {
            for panel in &tab.panels {
                collect_commands(&panel.items, &mut out);
            }
        }
        out
    }
}

impl Display for UIExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.directory.display())
    }
}

fn collect_commands<'a>(items: &'a [PanelItem], out: &mut Vec<&'a Command>) {
    for item in items {
        match item {
            PanelItem::Button(command) => out.push(command),
            PanelItem::Group(group) => collect_commands(&group.items, out),
        }
    }
}
