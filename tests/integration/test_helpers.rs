//! Shared builders for session-level integration tests.
//!
//! Provides on-disk extension trees in temporary directories, loader
//! configuration pointing at them, and a log capture for asserting on
//! critical entries.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pyrevit_loader::host::memory::MemoryHost;
use pyrevit_loader::loader::{output, SessionManager};
use pyrevit_loader::LoaderConfig;
use tempfile::TempDir;
use tracing::subscriber::DefaultGuard;

/// Extension root in a temporary directory.
pub struct ExtensionRoot {
    dir: TempDir,
}

impl ExtensionRoot {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory of `<ext>.extension/<tab>.tab/<panel>.panel/<cmd>.pushbutton`.
    pub fn command_dir(&self, ext: &str, tab: &str, panel: &str, cmd: &str) -> PathBuf {
        self.path()
            .join(format!("{ext}.extension"))
            .join(format!("{tab}.tab"))
            .join(format!("{panel}.panel"))
            .join(format!("{cmd}.pushbutton"))
    }

    /// Add a push button with the given script source.
    pub fn add_command(&self, ext: &str, tab: &str, panel: &str, cmd: &str, source: &str) -> PathBuf {
        let dir = self.command_dir(ext, tab, panel, cmd);
        fs::create_dir_all(&dir).expect("command dir");
        let script = dir.join("script.py");
        fs::write(&script, source).expect("script");
        script
    }

    /// Add an extension with `count` valid push buttons in one panel.
    pub fn add_extension(&self, ext: &str, count: usize) {
        for idx in 0..count {
            self.add_command(
                ext,
                ext,
                "Main",
                &format!("Cmd{idx}"),
                &format!("__title__ = '{ext} command {idx}'\n"),
            );
        }
    }

    /// Write a `bundle.toml` for an existing command.
    pub fn add_bundle(&self, ext: &str, tab: &str, panel: &str, cmd: &str, contents: &str) {
        let dir = self.command_dir(ext, tab, panel, cmd);
        fs::write(dir.join("bundle.toml"), contents).expect("bundle");
    }

    pub fn remove_extension(&self, ext: &str) {
        fs::remove_dir_all(self.path().join(format!("{ext}.extension"))).expect("remove");
    }

    pub fn remove_command(&self, ext: &str, tab: &str, panel: &str, cmd: &str) {
        fs::remove_dir_all(self.command_dir(ext, tab, panel, cmd)).expect("remove");
    }
}

/// Configuration scanning only the given roots.
pub fn config_for(roots: &[&Path]) -> LoaderConfig {
    LoaderConfig {
        include_home_extensions: false,
        extension_roots: roots.iter().map(|root| root.to_path_buf()).collect(),
        ..LoaderConfig::default()
    }
}

/// Session manager over a bootstrapped in-memory host.
///
/// Clears any output redirection left by a previous test.
pub fn manager_for(roots: &[&Path]) -> SessionManager<MemoryHost> {
    output::teardown();
    SessionManager::new(MemoryHost::bootstrapped(), config_for(roots)).expect("manager")
}

#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines logged as critical.
    pub fn critical_lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains("severity=") && line.contains("critical"))
            .map(str::to_owned)
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Capture log output on the current thread until the guard is dropped.
pub fn capture_logs() -> (SharedBuf, DefaultGuard) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (buf, tracing::subscriber::set_default(subscriber))
}
