//! Registrable lifecycle hooks run after every session load.

use std::fmt::{Display, Formatter};

use tracing::{debug, error};

use crate::models::session::LoadedExtension;
use crate::Result;

/// Point in the load at which a hook list runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// After the UI has been rebuilt.
    SessionLoad,
    /// After all `SessionLoad` hooks.
    Startup,
}

impl Display for HookPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionLoad => f.write_str("on-session-load"),
            Self::Startup => f.write_str("on-startup"),
        }
    }
}

/// State handed to each hook.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Identifier of the load that triggered the hook.
    pub session_id: &'a str,
    /// 1 on the first load.
    pub load_number: u32,
    /// Extensions loaded this session.
    pub loaded: &'a [LoadedExtension],
}

/// A lifecycle callback.
pub type Hook = Box<dyn FnMut(&HookContext<'_>) -> Result<()>>;

struct Registered {
    name: String,
    hook: Hook,
}

/// Ordered hook lists per [`HookPoint`].
#[derive(Default)]
pub struct LifecycleHooks {
    session_load: Vec<Registered>,
    startup: Vec<Registered>,
}

impl LifecycleHooks {
    /// Empty hook lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; hooks run in registration order.
    pub fn register(&mut self, point: HookPoint, name: impl Into<String>, hook: Hook) {
        let name = name.into();
        debug!(%point, name = %name, "hook registered");
        self.list_mut(point).push(Registered { name, hook });
    }

    /// Run every hook registered at `point`.
    ///
    /// A failing hook is logged and does not stop later hooks. Returns the
    /// names of the hooks that failed.
    pub fn run(&mut self, point: HookPoint, ctx: &HookContext<'_>) -> Vec<String> {
        let mut failed = Vec::new();
        for registered in self.list_mut(point) {
            match (registered.hook)(ctx) {
                Ok(()) => debug!(%point, hook = %registered.name, "hook completed"),
                Err(err) => {
                    error!(%point, hook = %registered.name, %err, "hook failed");
                    failed.push(registered.name.clone());
                }
            }
        }
        failed
    }

    /// Number of hooks registered at `point`.
    #[must_use]
    pub fn len(&self, point: HookPoint) -> usize {
        match point {
            HookPoint::SessionLoad => self.session_load.len(),
            HookPoint::Startup => self.startup.len(),
        }
    }

    /// Whether no hooks are registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.session_load.is_empty() && self.startup.is_empty()
    }

    fn list_mut(&mut self, point: HookPoint) -> &mut Vec<Registered> {
        match point {
            HookPoint::SessionLoad => &mut self.session_load,
            HookPoint::Startup => &mut self.startup,
        }
    }
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = |list: &[Registered]| list.iter().map(|r| r.name.clone()).collect::<Vec<_>>();
        f.debug_struct("LifecycleHooks")
            .field("session_load", &names(&self.session_load))
            .field("startup", &names(&self.startup))
            .finish()
    }
}
