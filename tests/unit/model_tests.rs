//! Extension tree, identity and session report models.

use std::time::Duration;

use pyrevit_loader::models::extension::{
    ButtonGroup, Command, CommandId, CommandKind, GroupKind, Panel, PanelItem, Tab, UIExtension,
};
use pyrevit_loader::models::session::{LoadSpeed, SessionReport, UiStats};
use pyrevit_loader::models::slug;

fn command(name: &str) -> Command {
    Command::new(
        CommandId::derive(&["Ext", "Tab", "Panel", name]),
        name,
        format!("/ext/{name}.pushbutton/script.py"),
    )
}

#[test]
fn slug_keeps_lowercase_alphanumerics() {
    assert_eq!(slug("pyRevit Tools"), "pyrevittools");
    assert_eq!(slug("List_DWGs-2"), "listdwgs2");
    assert_eq!(slug("  "), "");
}

#[test]
fn slug_keeps_unicode_letters() {
    assert_eq!(slug("工具"), "工具");
    assert_eq!(slug("Überblick Tools"), "überblicktools");
    assert_ne!(slug("読む"), slug("書く"));
}

#[test]
fn symbol_only_names_slug_to_distinct_digests() {
    let star = slug("★");
    let circle = slug("●");
    assert!(star.starts_with('u') && star.len() == 9, "{star}");
    assert_ne!(star, circle);
    assert_eq!(star, slug("★"));
    assert_eq!(slug("--"), "", "ascii punctuation stays empty");
}

#[test]
fn non_ascii_command_names_derive_distinct_identities() {
    let read = CommandId::derive(&["工具", "Tab", "Panel", "読む"]);
    let write = CommandId::derive(&["工具", "Tab", "Panel", "書く"]);
    assert_ne!(read, write);
    assert_eq!(read.as_str(), "工具-tab-panel-読む");
}

#[test]
fn command_id_is_deterministic_and_skips_empty_parts() {
    let a = CommandId::derive(&["pyRevit Tools", "pyRevit", "Analysis", "ListDWGs"]);
    let b = CommandId::derive(&["pyRevitTools", "pyRevit", "Analysis", "List DWGs"]);
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "pyrevittools-pyrevit-analysis-listdwgs");
    assert_eq!(CommandId::derive(&["A", "--", "B"]).as_str(), "a-b");
}

#[test]
fn command_id_serializes_transparently() {
    let id = CommandId::from("ext-tab-panel-cmd");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"ext-tab-panel-cmd\"");
}

#[test]
fn bundle_suffixes_map_to_kinds() {
    assert_eq!(CommandKind::from_suffix("pushbutton"), Some(CommandKind::PushButton));
    assert_eq!(CommandKind::from_suffix("smartbutton"), Some(CommandKind::SmartButton));
    assert_eq!(CommandKind::from_suffix("panel"), None);
    assert_eq!(GroupKind::from_suffix("pulldown"), Some(GroupKind::PullDown));
    assert_eq!(GroupKind::from_suffix("splitpushbutton"), Some(GroupKind::SplitPushButton));
    assert_eq!(GroupKind::from_suffix("stack3"), Some(GroupKind::Stack));
    assert_eq!(GroupKind::from_suffix("pushbutton"), None);
}

#[test]
fn commands_are_flattened_in_display_order() {
    let mut ext = UIExtension::new("Ext", "/ext");
    ext.tabs.push(Tab {
        name: "Tab".into(),
        panels: vec![Panel {
            name: "Panel".into(),
            items: vec![
                PanelItem::Button(command("First")),
                PanelItem::Group(ButtonGroup {
                    name: "Tools".into(),
                    kind: GroupKind::PullDown,
                    icon: None,
                    items: vec![
                        PanelItem::Button(command("Second")),
                        PanelItem::Button(command("Third")),
                    ],
                }),
                PanelItem::Button(command("Fourth")),
            ],
        }],
    });

    let names: Vec<&str> = ext.commands().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["First", "Second", "Third", "Fourth"]);
    assert_eq!(ext.key(), "ext");
}

#[test]
fn command_directory_is_script_parent() {
    let cmd = command("ListDWGs");
    assert_eq!(cmd.directory().to_str(), Some("/ext/ListDWGs.pushbutton"));
    assert_eq!(cmd.title, "ListDWGs");
}

#[test]
fn load_speed_threshold_is_exclusive() {
    let threshold = Duration::from_millis(3000);
    assert_eq!(LoadSpeed::classify(Duration::from_millis(2999), threshold), LoadSpeed::Fast);
    assert_eq!(LoadSpeed::classify(threshold, threshold), LoadSpeed::Slow);
}

#[test]
fn ui_stats_accumulate() {
    let mut total = UiStats::default();
    total += UiStats { created: 2, updated: 1, unchanged: 4 };
    total += UiStats { created: 1, updated: 0, unchanged: 3 };
    assert_eq!(total, UiStats { created: 3, updated: 1, unchanged: 7 });
    assert_eq!(total.changes(), 4);
}

#[test]
fn session_report_serializes_with_snake_case_fields() {
    let report = SessionReport::new(1);
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["load_number"], 1);
    assert_eq!(value["speed"], "fast");
    assert!(value["session_id"].as_str().is_some_and(|id| id.len() == 36));
    assert!(report.loaded_names().is_empty());
}
