//! Integration tests for the `botdesk` CLI binary.
//!
//! Argument parsing, help output, completions and local commands run
//! without a backend; the session round trip uses a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `botdesk` binary with env isolation.
///
/// Clears all `BOTDESK_*` env vars and points config and data directories
/// at `home` so tests never touch the user's real configuration.
fn botdesk_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("botdesk");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("BOTDESK_PROFILE")
        .env_remove("BOTDESK_API_URL")
        .env_remove("BOTDESK_OUTPUT")
        .env_remove("BOTDESK_INSECURE")
        .env_remove("BOTDESK_TIMEOUT")
        .env_remove("BOTDESK_DATA_DIR")
        .env_remove("BOTDESK_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = botdesk_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    botdesk_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("bots")
            .and(predicate::str::contains("auth"))
            .and(predicate::str::contains("settings")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    botdesk_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("botdesk"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    botdesk_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    botdesk_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    let home = tempfile::tempdir().unwrap();
    botdesk_cmd(home.path())
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = botdesk_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success(), "Expected failure for invalid subcommand");
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_bots_list_without_session_requires_login() {
    let home = tempfile::tempdir().unwrap();
    let output = botdesk_cmd(home.path())
        .arg("--data-dir")
        .arg(home.path().join("state"))
        .args(["bots", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code");
    let text = combined_output(&output);
    assert!(text.contains("auth login"), "Expected login hint:\n{text}");
}

#[test]
fn test_unknown_profile_lists_alternatives() {
    let home = tempfile::tempdir().unwrap();
    let output = botdesk_cmd(home.path())
        .args(["--profile", "staging", "bots", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("staging"));
}

#[test]
fn test_invalid_debounce_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    botdesk_cmd(home.path())
        .arg("--data-dir")
        .arg(home.path().join("state"))
        .args(["settings", "set", "--debounce", "soon"])
        .assert()
        .failure()
        .code(2);
}

// ── Local commands ──────────────────────────────────────────────────

#[test]
fn test_settings_persist_between_runs() {
    let home = tempfile::tempdir().unwrap();
    let state = home.path().join("state");

    botdesk_cmd(home.path())
        .arg("--data-dir")
        .arg(&state)
        .args(["settings", "set", "--items-per-page", "25", "--debounce", "500ms"])
        .assert()
        .success();

    botdesk_cmd(home.path())
        .arg("--data-dir")
        .arg(&state)
        .args(["-o", "json", "settings", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"itemsPerPage\": 25")
                .and(predicate::str::contains("500ms")),
        );

    assert!(state.join("default").join("app-config.json").exists());
}

#[test]
fn test_version_manifest_written_to_file() {
    let home = tempfile::tempdir().unwrap();
    let out = home.path().join("version.json");

    botdesk_cmd(home.path())
        .args(["version", "manifest", "--set-version", "1.4.2", "--out"])
        .arg(&out)
        .assert()
        .success();

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(manifest["version"], "1.4.2");
    assert!(manifest["buildTime"].is_string());
}

#[test]
fn test_config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    botdesk_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Backend round trip ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_login_then_list_bots() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({ "email": "ops@example.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "access-1",
            "refreshToken": "refresh-1",
            "user": {
                "id": "u1",
                "email": "ops@example.com",
                "firstName": "Ada",
                "lastName": "Ops",
                "role": "admin",
                "isVerified": true
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/bots"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "b1",
                "name": "Greeter",
                "isActive": true,
                "createdAt": "2024-06-15T10:30:00Z",
                "updatedAt": "2024-06-15T10:30:00Z"
            }],
            "total": 1,
            "page": 1,
            "pageSize": 10
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let uri = server.uri();
    let home_path = home.path().to_path_buf();

    tokio::task::spawn_blocking(move || {
        let state = home_path.join("state");

        botdesk_cmd(&home_path)
            .env("BOTDESK_PASSWORD", "hunter2")
            .args(["--api-url", &uri, "--data-dir"])
            .arg(&state)
            .args(["auth", "login", "--email", "ops@example.com"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Ada Ops"));

        assert!(state.join("default").join("auth-storage.json").exists());

        botdesk_cmd(&home_path)
            .args(["--api-url", &uri, "--data-dir"])
            .arg(&state)
            .args(["-o", "json", "bots", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Greeter"));
    })
    .await
    .unwrap();
}
