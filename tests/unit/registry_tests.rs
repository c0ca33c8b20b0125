use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use pyrevit_loader::host::ButtonBinding;
use pyrevit_loader::loader::dispatch::EntryPoint;
use pyrevit_loader::loader::registry::{ExtensionModule, ModuleRegistry};
use pyrevit_loader::models::assembly::AssemblyInfo;
use pyrevit_loader::models::extension::CommandId;
use pyrevit_loader::models::session::ModuleStatus;
use pyrevit_loader::AppError;

fn module(key: &str, fingerprint: &str, commands: &[&str]) -> ExtensionModule {
    let info = AssemblyInfo {
        name: format!("{key}_{fingerprint}"),
        extension_key: key.into(),
        fingerprint: fingerprint.into(),
        location: PathBuf::from(format!("/ext/{key}.extension")),
        entry_points: commands.len(),
        created_at: Utc::now(),
    };
    let entry_points = commands
        .iter()
        .map(|cmd| EntryPoint {
            command: CommandId::from(*cmd),
            title: (*cmd).to_owned(),
            extension: key.into(),
            script: PathBuf::from(format!("/ext/{cmd}/script.py")),
            search_paths: Vec::new(),
        })
        .collect();
    ExtensionModule::new(info, entry_points)
}

fn binding(module: &str, command: &str) -> ButtonBinding {
    ButtonBinding {
        module: module.into(),
        command: CommandId::from(command),
    }
}

#[test]
fn install_reports_fresh_replaced_and_unchanged() {
    let mut registry = ModuleRegistry::new();
    assert_eq!(registry.install(module("a", "f1", &["x"])), ModuleStatus::Fresh);
    assert_eq!(registry.install(module("a", "f1", &["x"])), ModuleStatus::Unchanged);
    assert_eq!(registry.install(module("a", "f2", &["x"])), ModuleStatus::Replaced);
    assert_eq!(registry.len(), 1, "one module per extension key");
    assert_eq!(registry.status_of("a"), Some(ModuleStatus::Replaced));
    assert_eq!(registry.get("a").unwrap().info.fingerprint, "f2");
}

#[test]
fn changed_entry_points_replace_module_with_same_fingerprint() {
    let mut registry = ModuleRegistry::new();
    registry.install(module("a", "f1", &["x"]));

    let mut widened = module("a", "f1", &["x"]);
    let mut entry_points: Vec<EntryPoint> = widened.entry_points().cloned().collect();
    entry_points[0].search_paths.push(PathBuf::from("/ext/Shared.lib"));
    widened = ExtensionModule::new(widened.info.clone(), entry_points);

    assert_eq!(registry.install(widened), ModuleStatus::Replaced);
    let installed = registry.get("a").unwrap();
    let ep = installed.entry_point(&CommandId::from("x")).unwrap();
    assert_eq!(ep.search_paths, vec![PathBuf::from("/ext/Shared.lib")]);
}

#[test]
fn unchanged_install_keeps_installed_module() {
    let mut registry = ModuleRegistry::new();
    registry.install(module("a", "f1", &["x"]));
    let first = registry.get("a").unwrap();
    registry.install(module("a", "f1", &["x"]));
    let second = registry.get("a").unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn resolve_finds_entry_point_of_current_module() {
    let mut registry = ModuleRegistry::new();
    registry.install(module("a", "f1", &["x", "y"]));
    let ep = registry.resolve(&binding("a_f1", "y")).expect("resolves");
    assert_eq!(ep.command.as_str(), "y");
}

#[test]
fn stale_binding_does_not_resolve_after_replacement() {
    let mut registry = ModuleRegistry::new();
    registry.install(module("a", "f1", &["x"]));
    registry.install(module("a", "f2", &["x"]));

    let err = registry.resolve(&binding("a_f1", "x")).unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("stale")));
    assert!(registry.resolve(&binding("a_f2", "x")).is_ok());
}

#[test]
fn resolve_missing_command_is_not_found() {
    let mut registry = ModuleRegistry::new();
    registry.install(module("a", "f1", &["x"]));
    assert!(matches!(
        registry.resolve(&binding("a_f1", "zzz")),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn retain_keys_prunes_and_counts() {
    let mut registry = ModuleRegistry::new();
    registry.install(module("a", "f", &[]));
    registry.install(module("b", "f", &[]));
    registry.install(module("c", "f", &[]));

    let live: HashSet<String> = ["b".to_owned()].into_iter().collect();
    assert_eq!(registry.retain_keys(&live), 2);
    assert_eq!(registry.keys(), vec!["b"]);
}

#[test]
fn module_orders_entry_points_by_identity() {
    let m = module("a", "f", &["z", "m", "b"]);
    let ids: Vec<&str> = m.entry_points().map(|ep| ep.command.as_str()).collect();
    assert_eq!(ids, vec!["b", "m", "z"]);
    assert_eq!(m.len(), 3);
    assert!(!m.is_empty());
}
