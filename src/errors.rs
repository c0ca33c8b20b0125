//! Error types shared across the loader.

use std::fmt::{Display, Formatter};

/// Shared loader result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Loader error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The host environment was not bootstrapped correctly (fatal on first load).
    Bootstrap(String),
    /// Extension directory tree could not be interpreted.
    Descriptor(String),
    /// Module synthesis failed for an extension.
    Synthesis(String),
    /// Host UI reconciliation failure.
    Ui(String),
    /// Output window or stream failure.
    Output(String),
    /// Script dispatch failure.
    Script(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Bootstrap(msg) => write!(f, "bootstrap: {msg}"),
            Self::Descriptor(msg) => write!(f, "descriptor: {msg}"),
            Self::Synthesis(msg) => write!(f, "synthesis: {msg}"),
            Self::Ui(msg) => write!(f, "ui: {msg}"),
            Self::Output(msg) => write!(f, "output: {msg}"),
            Self::Script(msg) => write!(f, "script: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
