//! Process-wide output redirection into the host console window.
//!
//! The host allows one console window per process, so the installed
//! [`OutputStream`] is a deliberate singleton: [`install`] sets it,
//! [`teardown`] clears it, and every other component reads it through
//! [`active`]. A script that already owns a window advertises its handle in
//! [`WINDOW_HANDLE_ENV`], which [`window_handle`] also honors.

use std::fmt::{Debug, Formatter};
use std::io::{self, Write};
use std::sync::{Arc, PoisonError, RwLock};

use crate::host::{OutputWindow, WindowHandle};

/// Environment variable carrying the handle of a window owned by the caller.
pub const WINDOW_HANDLE_ENV: &str = "PYREVIT_WINDOW_HANDLE";

static ACTIVE: RwLock<Option<OutputStream>> = RwLock::new(None);

/// Stream adapter over a host output window.
#[derive(Clone)]
pub struct OutputStream {
    window: Arc<dyn OutputWindow>,
}

impl OutputStream {
    /// Wrap a host window.
    #[must_use]
    pub fn new(window: Arc<dyn OutputWindow>) -> Self {
        Self { window }
    }

    /// Native handle of the wrapped window.
    #[must_use]
    pub fn handle(&self) -> WindowHandle {
        self.window.handle()
    }

    /// Append text to the window.
    ///
    /// # Errors
    ///
    /// Propagates the window's I/O error.
    pub fn write_text(&self, text: &str) -> io::Result<()> {
        self.window.write_text(text)
    }
}

impl Debug for OutputStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("handle", &self.handle())
            .finish()
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.window.write_text(&String::from_utf8_lossy(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install `stream` as the process-wide output and replay buffered log records.
pub fn install(stream: OutputStream) {
    {
        let mut guard = ACTIVE.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(stream.clone());
    }

    let pending = crate::logging::drain_pending();
    if !pending.is_empty() {
        let _ = stream.write_text(&String::from_utf8_lossy(&pending));
    }
}

/// The installed output stream, if any.
#[must_use]
pub fn active() -> Option<OutputStream> {
    ACTIVE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Handle of the window output is redirected to, whether installed in this
/// process or inherited from an owning script.
#[must_use]
pub fn window_handle() -> Option<WindowHandle> {
    if let Some(stream) = active() {
        return Some(stream.handle());
    }
    std::env::var(WINDOW_HANDLE_ENV)
        .ok()
        .and_then(|raw| parse_handle(&raw))
}

/// Remove the installed stream, returning it.
pub fn teardown() -> Option<OutputStream> {
    ACTIVE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

/// Write script or diagnostic text to the active window, or to stdout when
/// no window is attached.
pub fn emit(text: &str) {
    if text.is_empty() {
        return;
    }
    match active() {
        Some(stream) => {
            if let Err(err) = stream.write_text(text) {
                tracing::warn!(%err, "failed to write to output window");
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }
}

fn parse_handle(raw: &str) -> Option<WindowHandle> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => raw.parse().ok()?,
    };
    Some(WindowHandle(value))
}
