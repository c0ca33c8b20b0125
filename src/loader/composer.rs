//! Reconciles the host ribbon with the extensions of the current session.
//!
//! Composition is incremental: elements are created when missing, updated
//! when their desired state differs and left alone otherwise. Every path the
//! session touches is recorded, and [`UiComposer::cleanup_ui`] removes the
//! managed elements that no loaded extension claimed.

use std::collections::HashSet;

use tracing::{debug, info_span, warn};

use crate::host::{ButtonBinding, ElementKind, HostUi, UiElementSpec, UiPath};
use crate::models::assembly::AssemblyInfo;
use crate::models::extension::{ButtonGroup, Command, PanelItem, UIExtension};
use crate::models::session::UiStats;
use crate::{AppError, Result};

/// Incremental ribbon reconciler.
#[derive(Debug, Default)]
pub struct UiComposer {
    live: HashSet<UiPath>,
}

impl UiComposer {
    /// Composer with an empty live set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the paths claimed by the previous session.
    pub fn begin_session(&mut self) {
        self.live.clear();
    }

    /// Paths claimed so far in this session.
    #[must_use]
    pub fn live_paths(&self) -> &HashSet<UiPath> {
        &self.live
    }

    /// Bring the ribbon in line with one extension, binding its buttons to
    /// the entry points of `assembly`.
    ///
    /// Paths are only claimed when the whole extension succeeds, so a
    /// half-composed extension is swept away by the next cleanup.
    ///
    /// # Errors
    ///
    /// Returns the host's `AppError::Ui` when an element cannot be created
    /// or updated, and `AppError::Ui` when a path already claimed by another
    /// extension this session would change kind or binding.
    pub fn update_ui(
        &mut self,
        ui: &mut dyn HostUi,
        extension: &UIExtension,
        assembly: &AssemblyInfo,
    ) -> Result<UiStats> {
        let _span = info_span!("update_ui", extension = %extension.name).entered();

        let mut pass = Pass {
            ui,
            module: &assembly.name,
            claimed: &self.live,
            touched: Vec::new(),
            stats: UiStats::default(),
        };

        for tab in &extension.tabs {
            let tab_path = UiPath::tab(&tab.name);
            pass.ensure(UiElementSpec::container(tab_path.clone(), ElementKind::Tab))?;

            for panel in &tab.panels {
                let panel_path = tab_path.child(&panel.name);
                pass.ensure(UiElementSpec::container(
                    panel_path.clone(),
                    ElementKind::Panel,
                ))?;
                pass.items(&panel_path, &panel.items)?;
            }
        }

        let Pass { touched, stats, .. } = pass;
        self.live.extend(touched);
        debug!(
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "extension ui composed"
        );
        Ok(stats)
    }

    /// Remove managed elements not claimed in this session, deepest first.
    ///
    /// Removal errors are logged and skipped. Returns the number of elements
    /// removed.
    pub fn cleanup_ui(&mut self, ui: &mut dyn HostUi) -> usize {
        let mut stale: Vec<UiPath> = ui
            .managed_paths()
            .into_iter()
            .filter(|path| !self.live.contains(path))
            .collect();
        stale.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)));

        let mut removed = 0;
        for path in stale {
            // A parent removed earlier takes its children with it.
            if ui.find(&path).is_none() {
                continue;
            }
            match ui.remove(&path) {
                Ok(()) => {
                    debug!(%path, "removed stale ui element");
                    removed += 1;
                }
                Err(err) => warn!(%path, %err, "failed to remove stale ui element"),
            }
        }
        removed
    }
}

struct Pass<'u, 'm> {
    ui: &'u mut dyn HostUi,
    module: &'m str,
    claimed: &'m HashSet<UiPath>,
    touched: Vec<UiPath>,
    stats: UiStats,
}

impl Pass<'_, '_> {
    fn items(&mut self, parent: &UiPath, items: &[PanelItem]) -> Result<()> {
        for item in items {
            match item {
                PanelItem::Button(command) => self.button(parent, command)?,
                PanelItem::Group(group) => self.group(parent, group)?,
            }
        }
        Ok(())
    }

    fn group(&mut self, parent: &UiPath, group: &ButtonGroup) -> Result<()> {
        let path = parent.child(&group.name);
        let mut spec = UiElementSpec::container(path.clone(), ElementKind::Group(group.kind));
        spec.icon.clone_from(&group.icon);
        self.ensure(spec)?;
        self.items(&path, &group.items)
    }

    fn button(&mut self, parent: &UiPath, command: &Command) -> Result<()> {
        self.ensure(UiElementSpec {
            path: parent.child(&command.name),
            kind: ElementKind::Button(command.kind),
            title: command.title.clone(),
            tooltip: command.tooltip.clone(),
            icon: command.icon.clone(),
            binding: Some(ButtonBinding {
                module: self.module.to_owned(),
                command: command.id.clone(),
            }),
        })
    }

    fn ensure(&mut self, spec: UiElementSpec) -> Result<()> {
        let path = spec.path.clone();
        match self.ui.find(&path) {
            None => {
                self.ui.create(spec)?;
                self.stats.created += 1;
            }
            // Native host elements are shared, never modified.
            Some(existing) if !existing.managed => self.stats.unchanged += 1,
            Some(existing) if existing.spec == spec => self.stats.unchanged += 1,
            // Containers are shared; anything else claimed earlier belongs to another extension.
            Some(existing)
                if self.claimed.contains(&path)
                    && (existing.spec.kind != spec.kind || existing.spec.binding != spec.binding) =>
            {
                return Err(AppError::Ui(format!(
                    "{path} is already provided by module {}",
                    existing
                        .spec
                        .binding
                        .as_ref()
                        .map_or("another extension", |binding| binding.module.as_str())
                )));
            }
            Some(_) => {
                self.ui.update(spec)?;
                self.stats.updated += 1;
            }
        }
        if !self.touched.contains(&path) {
            self.touched.push(path);
        }
        Ok(())
    }
}
