//! Loader and runtime version strings used by the environment report.

/// Loader version, taken from the package manifest.
pub const LOADER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust toolchain declared by the manifest.
pub const RUNTIME_VERSION: &str = env!("CARGO_PKG_RUST_VERSION");

/// Human-readable loader version, e.g. `v0.4.0`.
#[must_use]
pub fn formatted() -> String {
    format!("v{LOADER_VERSION}")
}

/// Runtime description for diagnostics.
#[must_use]
pub fn runtime() -> String {
    if RUNTIME_VERSION.is_empty() {
        format!("rust ({}-{})", std::env::consts::ARCH, std::env::consts::OS)
    } else {
        format!(
            "rust {RUNTIME_VERSION}+ ({}-{})",
            std::env::consts::ARCH,
            std::env::consts::OS
        )
    }
}
