//! Command-line behavior tests
//!
//! Each test runs the binary against its own temporary data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn shelf(data: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tool-shelf").unwrap();
    cmd.env_remove("TOOL_SHELF_DATA_DIR")
        .env_remove("TOOL_SHELF_UPDATE_URL")
        .arg("--data-dir")
        .arg(data.path())
        .arg("--resource-dir")
        .arg(env!("CARGO_MANIFEST_DIR"));
    cmd
}

fn listed_names(data: &TempDir, args: &[&str]) -> Vec<String> {
    let output = shelf(data)
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_first_run_lists_defaults_folders_first() {
    let data = tempfile::tempdir().unwrap();
    shelf(&data)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Chat Assistants/"))
        .stdout(predicate::str::contains("https://www.deepl.com/translator"));

    assert!(data.path().join("ai_tools.json").exists());
    assert_eq!(
        listed_names(&data, &["list"]),
        ["Chat Assistants", "Image Generation", "DeepL", "GitHub Copilot", "Perplexity"]
    );
}

#[test]
fn test_add_edit_delete_cycle() {
    let data = tempfile::tempdir().unwrap();

    shelf(&data)
        .args(["add", "--name", "Kimi", "--url", "https://kimi.ai"])
        .args(["--parent", "Chat Assistants", "--description", "Long context"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added tool 'Kimi'"));

    assert_eq!(
        listed_names(&data, &["list", "Chat Assistants"]),
        ["ChatGPT", "Claude", "Gemini", "Kimi"]
    );

    shelf(&data)
        .args(["edit", "Chat Assistants/Kimi", "--to-folder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated folder 'Kimi'"));

    assert_eq!(
        listed_names(&data, &["list", "Chat Assistants"]),
        ["Kimi", "ChatGPT", "Claude", "Gemini"]
    );

    shelf(&data)
        .args(["delete", "Chat Assistants/Kimi"])
        .assert()
        .success();
    shelf(&data)
        .args(["show", "Chat Assistants/Kimi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No entry at"));
}

#[test]
fn test_add_requires_name() {
    let data = tempfile::tempdir().unwrap();
    shelf(&data)
        .args(["add", "--name", "   ", "--url", "https://x.example"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required field: name"));
}

#[test]
fn test_add_requires_url_or_folder() {
    let data = tempfile::tempdir().unwrap();
    shelf(&data)
        .args(["add", "--name", "Nothing"])
        .assert()
        .failure();
}

#[test]
fn test_search_is_case_insensitive() {
    let data = tempfile::tempdir().unwrap();
    assert_eq!(
        listed_names(&data, &["search", "TRANSLATION"]),
        ["DeepL"]
    );
    assert_eq!(
        listed_names(&data, &["search", "claude", "--in", "Chat Assistants"]),
        ["Claude"]
    );

    shelf(&data)
        .args(["search", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No entries match 'zzz'"));
}

#[test]
fn test_show_resolves_icons() {
    let data = tempfile::tempdir().unwrap();
    shelf(&data)
        .args(["show", "Chat Assistants/Claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude.svg"));

    shelf(&data)
        .args(["show", "DeepL"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[D]"));
}

#[test]
fn test_change_folder_icon() {
    let data = tempfile::tempdir().unwrap();
    shelf(&data)
        .args(["icon", "Image Generation", "./icon/chatgpt.svg"])
        .assert()
        .success();

    let output = shelf(&data)
        .args(["show", "Image Generation", "--format", "json"])
        .output()
        .unwrap();
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["entry"]["icon_path"], "./icon/chatgpt.svg");
    assert_eq!(shown["icon"]["vector"], true);
}

#[test]
fn test_corrupt_catalog_is_reported_not_replaced() {
    let data = tempfile::tempdir().unwrap();
    let path = data.path().join("ai_tools.json");
    std::fs::write(&path, "[{").unwrap();

    shelf(&data)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{");
}

#[test]
fn test_open_folder_is_rejected() {
    let data = tempfile::tempdir().unwrap();
    shelf(&data)
        .args(["open", "Image Generation"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is a folder"));
}

#[test]
fn test_update_check_requires_endpoint() {
    let data = tempfile::tempdir().unwrap();
    shelf(&data)
        .args(["update", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--endpoint"));
}
