#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod extensions;
pub mod host;
pub mod loader;
pub mod logging;
pub mod models;
pub mod version;

pub use config::LoaderConfig;
pub use errors::{AppError, Result};
