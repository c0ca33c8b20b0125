//! Filesystem descriptor source.
//!
//! Extension trees are plain directories whose suffix names their role:
//!
//! ```text
//! <root>/
//!   Tools.lib/                    shared library extension
//!   pyRevitTools.extension/
//!     lib/                        extension-private modules
//!     pyRevit.tab/
//!       Analysis.panel/
//!         ListDWGs.pushbutton/
//!           script.py
//!           icon.png
//!           bundle.toml           optional metadata override
//!         Tools.pulldown/
//!           A.pushbutton/ ...
//! ```
//!
//! Every level is read in sorted name order so discovery is deterministic.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, info_span, warn};

use crate::config::ScriptConfig;
use crate::extensions::metadata::read_command_metadata;
use crate::models::extension::{
    ButtonGroup, Command, CommandId, CommandKind, GroupKind, Panel, PanelItem, Tab, UIExtension,
};
use crate::{AppError, Result};

const EXTENSION_SUFFIX: &str = "extension";
const LIBRARY_SUFFIX: &str = "lib";
const TAB_SUFFIX: &str = "tab";
const PANEL_SUFFIX: &str = "panel";
const ICON_FILE: &str = "icon.png";
const DEFAULT_SCRIPT: &str = "script.py";
const EXTENSION_LIB_DIR: &str = "lib";

/// Produces extension descriptors for an extension root.
pub trait DescriptorSource {
    /// UI extensions installed under `root`, in discovery order.
    fn installed_extensions(&self, root: &Path) -> Vec<UIExtension>;

    /// Library extension directories under `root`.
    fn library_extensions(&self, _root: &Path) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Reads extension trees from disk.
#[derive(Debug, Clone)]
pub struct FsDescriptorSource {
    patterns: Vec<Pattern>,
}

impl FsDescriptorSource {
    /// Source that locates command scripts with the given glob patterns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Descriptor` if a pattern is not a valid glob.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                Pattern::new(raw).map_err(|err| {
                    AppError::Descriptor(format!("invalid script pattern {raw}: {err}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Source configured from the `[scripts]` table.
    ///
    /// # Errors
    ///
    /// See [`FsDescriptorSource::new`].
    pub fn from_config(config: &ScriptConfig) -> Result<Self> {
        Self::new(&config.patterns)
    }

    /// Parse one `.extension` directory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Descriptor` if `dir` is not a readable extension
    /// directory.
    pub fn parse_extension(&self, dir: &Path) -> Result<UIExtension> {
        let (name, suffix) = split_name(dir)
            .ok_or_else(|| AppError::Descriptor(format!("{} has no suffix", dir.display())))?;
        if suffix != EXTENSION_SUFFIX {
            return Err(AppError::Descriptor(format!(
                "{} is not an extension directory",
                dir.display()
            )));
        }

        let _span = info_span!("parse_extension", extension = %name).entered();
        let mut extension = UIExtension::new(name, dir);
        let lib_dir = dir.join(EXTENSION_LIB_DIR);
        let ctx = Walk {
            patterns: &self.patterns,
            extension: name,
            lib_dir: lib_dir.is_dir().then_some(lib_dir),
        };

        for entry in sorted_subdirs(dir)? {
            match split_name(&entry) {
                Some((tab, TAB_SUFFIX)) => extension.tabs.push(ctx.tab(&entry, tab)),
                _ => debug!(path = %entry.display(), "ignoring non-tab directory"),
            }
        }
        Ok(extension)
    }
}

impl DescriptorSource for FsDescriptorSource {
    fn installed_extensions(&self, root: &Path) -> Vec<UIExtension> {
        let entries = match sorted_subdirs(root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(root = %root.display(), %err, "extension root unreadable");
                return Vec::new();
            }
        };

        entries
            .iter()
            .filter(|entry| matches!(split_name(entry), Some((_, EXTENSION_SUFFIX))))
            .filter_map(|entry| match self.parse_extension(entry) {
                Ok(extension) => Some(extension),
                Err(err) => {
                    warn!(path = %entry.display(), %err, "skipping unreadable extension");
                    None
                }
            })
            .collect()
    }

    fn library_extensions(&self, root: &Path) -> Vec<PathBuf> {
        match sorted_subdirs(root) {
            Ok(entries) => entries
                .into_iter()
                .filter(|entry| matches!(split_name(entry), Some((_, LIBRARY_SUFFIX))))
                .collect(),
            Err(err) => {
                warn!(root = %root.display(), %err, "extension root unreadable");
                Vec::new()
            }
        }
    }
}

/// Per-extension state threaded through the tree walk.
struct Walk<'a> {
    patterns: &'a [Pattern],
    extension: &'a str,
    lib_dir: Option<PathBuf>,
}

impl Walk<'_> {
    fn tab(&self, dir: &Path, name: &str) -> Tab {
        let mut tab = Tab {
            name: name.to_owned(),
            panels: Vec::new(),
        };
        for entry in self.children(dir) {
            match split_name(&entry) {
                Some((panel, PANEL_SUFFIX)) => {
                    let scope = [self.extension, name, panel];
                    tab.panels.push(Panel {
                        name: panel.to_owned(),
                        items: self.items(&entry, &scope),
                    });
                }
                _ => debug!(path = %entry.display(), "ignoring non-panel directory"),
            }
        }
        tab
    }

    fn items(&self, dir: &Path, scope: &[&str]) -> Vec<PanelItem> {
        let mut items = Vec::new();
        for entry in self.children(dir) {
            let Some((name, suffix)) = split_name(&entry) else {
                continue;
            };
            let mut path = scope.to_vec();
            path.push(name);

            if let Some(kind) = CommandKind::from_suffix(suffix) {
                items.push(PanelItem::Button(self.command(&entry, name, kind, &path)));
            } else if let Some(kind) = GroupKind::from_suffix(suffix) {
                items.push(PanelItem::Group(ButtonGroup {
                    name: name.to_owned(),
                    kind,
                    icon: icon(&entry),
                    items: self.items(&entry, &path),
                }));
            } else {
                debug!(path = %entry.display(), "ignoring unknown bundle type");
            }
        }
        items
    }

    fn command(&self, dir: &Path, name: &str, kind: CommandKind, path: &[&str]) -> Command {
        let script = self.find_script(dir);
        let (meta, issues) = read_command_metadata(dir, &script);

        let mut command = Command::new(CommandId::derive(path), name, script);
        command.kind = kind;
        if let Some(title) = meta.title {
            command.title = title;
        }
        command.tooltip = meta.tooltip;
        command.author = meta.author;
        command.icon = icon(dir);
        command.issues = issues;
        command.search_paths.push(dir.to_path_buf());
        if let Some(lib_dir) = &self.lib_dir {
            command.search_paths.push(lib_dir.clone());
        }
        command
    }

    fn find_script(&self, dir: &Path) -> PathBuf {
        let files = match sorted_entries(dir) {
            Ok(entries) => entries.into_iter().filter(|p| p.is_file()).collect(),
            Err(err) => {
                warn!(path = %dir.display(), %err, "command directory unreadable");
                Vec::new()
            }
        };
        files
            .into_iter()
            .find(|file| {
                file.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.patterns.iter().any(|p| p.matches(n)))
            })
            .unwrap_or_else(|| dir.join(DEFAULT_SCRIPT))
    }

    fn children(&self, dir: &Path) -> Vec<PathBuf> {
        sorted_subdirs(dir).unwrap_or_else(|err| {
            warn!(extension = self.extension, path = %dir.display(), %err, "directory unreadable");
            Vec::new()
        })
    }
}

/// Split `Name.suffix` into its parts.
fn split_name(path: &Path) -> Option<(&str, &str)> {
    let file_name = path.file_name()?.to_str()?;
    let (name, suffix) = file_name.rsplit_once('.')?;
    (!suffix.is_empty()).then_some((name, suffix))
}

fn icon(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(ICON_FILE);
    path.is_file().then_some(path)
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| std::fs::DirEntry::path(&e)))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn sorted_subdirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect())
}
