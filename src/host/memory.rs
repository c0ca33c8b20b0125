//! In-memory host used by the headless CLI and by tests.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{
    ElementKind, Host, HostUi, ModuleIdentity, OutputWindow, UiElement, UiElementSpec, UiPath,
    WindowHandle, BASE_MODULE_KEY,
};
use crate::{AppError, Result};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

fn next_handle() -> WindowHandle {
    WindowHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// Output window that keeps everything written to it.
#[derive(Debug)]
pub struct RecordingWindow {
    handle: WindowHandle,
    text: Mutex<String>,
}

impl RecordingWindow {
    /// Create a window with a fresh handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handle: next_handle(),
            text: Mutex::new(String::new()),
        }
    }

    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for RecordingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputWindow for RecordingWindow {
    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn write_text(&self, text: &str) -> std::io::Result<()> {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
        Ok(())
    }
}

/// Output window backed by the terminal's standard output.
#[derive(Debug)]
pub struct ConsoleWindow {
    handle: WindowHandle,
}

impl ConsoleWindow {
    /// Create a console window with a fresh handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handle: next_handle(),
        }
    }
}

impl Default for ConsoleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputWindow for ConsoleWindow {
    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn write_text(&self, text: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}

/// Ribbon tree kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryUi {
    elements: Vec<UiElement>,
    failing_segment: Option<String>,
}

impl MemoryUi {
    /// Empty ribbon.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a host-native (unmanaged) element.
    pub fn add_native(&mut self, spec: UiElementSpec) {
        self.elements.push(UiElement {
            spec,
            managed: false,
        });
    }

    /// Make every create or update of a path containing `segment` fail.
    pub fn fail_on_segment(&mut self, segment: impl Into<String>) {
        self.failing_segment = Some(segment.into());
    }

    /// All elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[UiElement] {
        &self.elements
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the ribbon is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All button elements in insertion order.
    #[must_use]
    pub fn buttons(&self) -> Vec<&UiElement> {
        self.elements
            .iter()
            .filter(|element| matches!(element.spec.kind, ElementKind::Button(_)))
            .collect()
    }

    /// Buttons located under the given tab.
    #[must_use]
    pub fn buttons_in_tab(&self, tab: &str) -> Vec<&UiElement> {
        let root = UiPath::tab(tab);
        self.buttons()
            .into_iter()
            .filter(|element| element.spec.path.is_within(&root))
            .collect()
    }

    /// Indented text rendering of the tree.
    #[must_use]
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        for element in &self.elements {
            let depth = element.spec.path.depth().saturating_sub(1);
            let marker = if element.managed { "" } else { " [native]" };
            let _ = writeln!(
                out,
                "{:indent$}{} ({:?}){marker}",
                "",
                element.spec.title,
                element.spec.kind,
                indent = depth * 2
            );
        }
        out
    }

    fn position(&self, path: &UiPath) -> Option<usize> {
        self.elements.iter().position(|el| &el.spec.path == path)
    }

    fn check_failure(&self, path: &UiPath) -> Result<()> {
        match &self.failing_segment {
            Some(segment) if path.segments().iter().any(|s| s == segment) => Err(AppError::Ui(
                format!("host rejected element {path}"),
            )),
            _ => Ok(()),
        }
    }
}

impl HostUi for MemoryUi {
    fn find(&self, path: &UiPath) -> Option<UiElement> {
        self.position(path).map(|idx| self.elements[idx].clone())
    }

    fn create(&mut self, spec: UiElementSpec) -> Result<()> {
        self.check_failure(&spec.path)?;
        if self.position(&spec.path).is_some() {
            return Err(AppError::Ui(format!("element {} already exists", spec.path)));
        }
        let segments = spec.path.segments();
        let insert_at = if segments.len() > 1 {
            let parent = UiPath::from_segments(segments[..segments.len() - 1].iter().cloned());
            if self.position(&parent).is_none() {
                return Err(AppError::Ui(format!("parent {parent} does not exist")));
            }
            // Siblings stay together so the tree renders in ribbon order.
            self.elements
                .iter()
                .rposition(|el| el.spec.path.is_within(&parent))
                .map_or(self.elements.len(), |idx| idx + 1)
        } else {
            self.elements.len()
        };
        self.elements.insert(
            insert_at,
            UiElement {
                spec,
                managed: true,
            },
        );
        Ok(())
    }

    fn update(&mut self, spec: UiElementSpec) -> Result<()> {
        self.check_failure(&spec.path)?;
        let idx = self
            .position(&spec.path)
            .ok_or_else(|| AppError::Ui(format!("element {} does not exist", spec.path)))?;
        if !self.elements[idx].managed {
            return Err(AppError::Ui(format!(
                "element {} is not managed by the loader",
                spec.path
            )));
        }
        self.elements[idx].spec = spec;
        Ok(())
    }

    fn remove(&mut self, path: &UiPath) -> Result<()> {
        self.elements
            .retain(|el| !(el.managed && el.spec.path.is_within(path)));
        Ok(())
    }

    fn managed_paths(&self) -> Vec<UiPath> {
        self.elements
            .iter()
            .filter(|el| el.managed)
            .map(|el| el.spec.path.clone())
            .collect()
    }
}

/// Which window type [`MemoryHost`] creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowFactory {
    Recording,
    Console,
}

/// Host process simulated entirely in memory.
pub struct MemoryHost {
    modules: HashMap<String, ModuleIdentity>,
    ui: MemoryUi,
    factory: WindowFactory,
    windows: Vec<Arc<RecordingWindow>>,
    windows_created: usize,
    fail_window: bool,
}

impl MemoryHost {
    /// Host with no modules loaded; loading a session against it is fatal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            ui: MemoryUi::new(),
            factory: WindowFactory::Recording,
            windows: Vec::new(),
            windows_created: 0,
            fail_window: false,
        }
    }

    /// Host whose bootstrap already loaded the base support module.
    #[must_use]
    pub fn bootstrapped() -> Self {
        let mut host = Self::new();
        host.register_module(
            BASE_MODULE_KEY,
            ModuleIdentity {
                name: "pyRevitLoaderBase".into(),
                version: crate::version::formatted(),
                location: None,
            },
        );
        host
    }

    /// Bootstrapped host whose output windows print to the terminal.
    #[must_use]
    pub fn console() -> Self {
        let mut host = Self::bootstrapped();
        host.factory = WindowFactory::Console;
        host
    }

    /// Publish a module under `key`.
    pub fn register_module(&mut self, key: impl Into<String>, identity: ModuleIdentity) {
        self.modules.insert(key.into(), identity);
    }

    /// Make output window creation fail.
    pub fn fail_window_creation(&mut self) {
        self.fail_window = true;
    }

    /// Number of output windows created so far.
    #[must_use]
    pub fn windows_created(&self) -> usize {
        self.windows_created
    }

    /// Text written to the most recent recording window.
    #[must_use]
    pub fn window_output(&self) -> String {
        self.windows
            .last()
            .map(|window| window.contents())
            .unwrap_or_default()
    }

    /// Read-only view of the ribbon.
    #[must_use]
    pub fn ribbon(&self) -> &MemoryUi {
        &self.ui
    }

    /// Mutable view of the ribbon, for seeding native elements.
    pub fn ribbon_mut(&mut self) -> &mut MemoryUi {
        &mut self.ui
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn find_loaded_module(&self, key: &str) -> Option<ModuleIdentity> {
        self.modules.get(key).cloned()
    }

    fn create_output_window(&mut self) -> Result<Arc<dyn OutputWindow>> {
        if self.fail_window {
            return Err(AppError::Output("host refused to create output window".into()));
        }
        self.windows_created += 1;
        match self.factory {
            WindowFactory::Recording => {
                let window = Arc::new(RecordingWindow::new());
                self.windows.push(Arc::clone(&window));
                Ok(window)
            }
            WindowFactory::Console => Ok(Arc::new(ConsoleWindow::new())),
        }
    }

    fn ui(&self) -> &dyn HostUi {
        &self.ui
    }

    fn ui_mut(&mut self) -> &mut dyn HostUi {
        &mut self.ui
    }
}
