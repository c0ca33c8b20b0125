//! Version strings reported in the environment log.

use pyrevit_loader::version;

#[test]
fn cargo_pkg_version_is_valid_semver() {
    let parts: Vec<&str> = version::LOADER_VERSION
        .split('-')
        .next()
        .unwrap_or("")
        .split('.')
        .collect();
    assert!(parts.len() >= 3, "expected MAJOR.MINOR.PATCH, got {}", version::LOADER_VERSION);
    for part in &parts {
        assert!(part.parse::<u64>().is_ok(), "non-numeric version part '{part}'");
    }
}

#[test]
fn formatted_version_has_v_prefix() {
    assert_eq!(version::formatted(), format!("v{}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn runtime_names_platform() {
    let runtime = version::runtime();
    assert!(runtime.starts_with("rust"));
    assert!(runtime.contains(std::env::consts::OS));
    assert!(runtime.contains(std::env::consts::ARCH));
}
