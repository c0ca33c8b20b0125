use pyrevit_loader::extensions::metadata::{
    parse_bundle, parse_script_header, read_command_metadata, CommandMetadata,
};
use pyrevit_loader::AppError;

#[test]
fn header_reads_single_and_double_quotes() {
    let source = r#"
"""Lists all linked and imported DWG instances."""
__title__ = 'List DWGs'
__doc__ = "Lists all linked and imported DWG instances"
__author__ = 'Ehsan'

import os
"#;
    let meta = parse_script_header(source);
    assert_eq!(meta.title.as_deref(), Some("List DWGs"));
    assert_eq!(
        meta.tooltip.as_deref(),
        Some("Lists all linked and imported DWG instances")
    );
    assert_eq!(meta.author.as_deref(), Some("Ehsan"));
}

#[test]
fn header_reads_triple_quoted_strings() {
    let source = r#"
__title__ = """Sync
Views"""
__doc__ = """
    Synchronizes selected views
    across open documents.
"""
__author__ = '''Ehsan'''
"#;
    let meta = parse_script_header(source);
    assert_eq!(meta.title.as_deref(), Some("Sync\nViews"));
    assert_eq!(
        meta.tooltip.as_deref(),
        Some("Synchronizes selected views\nacross open documents.")
    );
    assert_eq!(meta.author.as_deref(), Some("Ehsan"));
}

#[test]
fn first_assignment_wins_and_indented_lines_are_ignored() {
    let source = "__title__ = 'One'\n__title__ = 'Two'\ndef f():\n    __author__ = 'nested'\n";
    let meta = parse_script_header(source);
    assert_eq!(meta.title.as_deref(), Some("One"));
    assert!(meta.author.is_none());
}

#[test]
fn scripts_without_header_yield_empty_metadata() {
    assert_eq!(parse_script_header("print('hi')\n"), CommandMetadata::default());
}

#[test]
fn bundle_parses_known_keys() {
    let meta = parse_bundle("title = 'Bundle Title'\ntooltip = 'Tip'\n").expect("valid");
    assert_eq!(meta.title.as_deref(), Some("Bundle Title"));
    assert_eq!(meta.tooltip.as_deref(), Some("Tip"));
    assert!(meta.author.is_none());
}

#[test]
fn bundle_rejects_unknown_keys_and_bad_toml() {
    assert!(matches!(parse_bundle("colour = 'red'"), Err(AppError::Descriptor(_))));
    assert!(matches!(parse_bundle("title = "), Err(AppError::Descriptor(_))));
}

#[test]
fn bundle_overrides_script_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("script.py");
    std::fs::write(&script, "__title__ = 'Header'\n__author__ = 'Ann'\n").expect("script");
    std::fs::write(dir.path().join("bundle.toml"), "title = 'Bundle'\n").expect("bundle");

    let (meta, issues) = read_command_metadata(dir.path(), &script);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    assert_eq!(meta.title.as_deref(), Some("Bundle"));
    assert_eq!(meta.author.as_deref(), Some("Ann"));
}

#[test]
fn malformed_bundle_is_reported_as_issue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("script.py");
    std::fs::write(&script, "__title__ = 'Header'\n").expect("script");
    std::fs::write(dir.path().join("bundle.toml"), "title = [unclosed").expect("bundle");

    let (meta, issues) = read_command_metadata(dir.path(), &script);
    assert_eq!(meta.title.as_deref(), Some("Header"));
    assert_eq!(issues.len(), 1);
    assert!(issues[0].contains("bundle.toml"));
}

#[test]
fn blank_title_is_reported_as_issue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("script.py");
    std::fs::write(&script, "__title__ = ''\n").expect("script");

    let (_, issues) = read_command_metadata(dir.path(), &script);
    assert_eq!(issues, vec!["title must not be blank".to_owned()]);
}

#[test]
fn missing_script_yields_no_metadata_and_no_issue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (meta, issues) = read_command_metadata(dir.path(), &dir.path().join("script.py"));
    assert_eq!(meta, CommandMetadata::default());
    assert!(issues.is_empty());
}
