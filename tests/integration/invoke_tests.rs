//! Pressing ribbon buttons after a session load.
#![cfg(unix)]

use pyrevit_loader::host::HostContext;
use pyrevit_loader::loader::dispatch::ScriptOutcome;
use pyrevit_loader::loader::SessionManager;
use pyrevit_loader::host::memory::MemoryHost;
use pyrevit_loader::loader::output;
use pyrevit_loader::models::extension::CommandId;
use pyrevit_loader::AppError;
use serial_test::serial;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{config_for, ExtensionRoot};

fn shell_manager(root: &ExtensionRoot) -> SessionManager<MemoryHost> {
    output::teardown();
    let mut config = config_for(&[root.path()]);
    config.scripts.interpreter = "sh".into();
    config.scripts.patterns = vec!["*.sh".into()];
    SessionManager::new(MemoryHost::bootstrapped(), config).unwrap()
}

fn add_shell_command(root: &ExtensionRoot, cmd: &str, body: &str) {
    let dir = root.command_dir("Tools", "Tools", "Main", cmd);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("run.sh"), body).unwrap();
}

#[tokio::test]
#[serial]
async fn button_runs_its_script_into_the_output_window() {
    let root = ExtensionRoot::new();
    add_shell_command(&root, "Hello", "echo \"hi from $PYREVIT_COMMAND_NAME\"\n");
    let mut manager = shell_manager(&root);
    manager.load_session().unwrap();

    let id = CommandId::derive(&["Tools", "Tools", "Main", "Hello"]);
    let outcome = manager
        .invoke(&id, &HostContext::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, ScriptOutcome::Completed);
    assert!(manager.host().window_output().contains("hi from Hello"));
}

#[tokio::test]
#[serial]
async fn failing_script_is_contained() {
    let root = ExtensionRoot::new();
    add_shell_command(&root, "Crash", "exit 7\n");
    let mut manager = shell_manager(&root);
    manager.load_session().unwrap();

    let id = CommandId::derive(&["Tools", "Tools", "Main", "Crash"]);
    let outcome = manager
        .invoke(&id, &HostContext::default(), &CancellationToken::new())
        .await
        .expect("script failures are outcomes, not errors");

    assert!(matches!(outcome, ScriptOutcome::Failed { exit_code: Some(7), .. }));
    assert!(manager.host().window_output().contains("[Crash] failed with exit code 7"));
}

#[tokio::test]
#[serial]
async fn removed_command_can_no_longer_be_invoked() {
    let root = ExtensionRoot::new();
    add_shell_command(&root, "Keep", "true\n");
    add_shell_command(&root, "Gone", "true\n");
    let mut manager = shell_manager(&root);
    manager.load_session().unwrap();

    std::fs::remove_dir_all(root.command_dir("Tools", "Tools", "Main", "Gone")).unwrap();
    manager.load_session().unwrap();

    let gone = CommandId::derive(&["Tools", "Tools", "Main", "Gone"]);
    let err = manager
        .invoke(&gone, &HostContext::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let keep = CommandId::derive(&["Tools", "Tools", "Main", "Keep"]);
    assert!(manager.entry_point(&keep).is_ok());
}
