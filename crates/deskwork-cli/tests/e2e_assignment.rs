//! E2E tests for the assignment workflow: start, close, button, alert, and
//! unassign, driven through the `dw` binary in isolated temp directories.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the `dw` binary, rooted in `dir`.
fn dw_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dw"));
    cmd.current_dir(dir);
    cmd.env("DESKWORK_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env_remove("DESKWORK_USER");
    cmd.env_remove("FORMAT");
    cmd
}

fn json_of(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

/// Run `args` with `--json` and return parsed stdout, asserting success.
fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = dw_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("dw should run");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    json_of(&output)
}

/// Project with users alice, bob, and admin `root`, and ticket T1.
fn setup() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path();
    dw_cmd(root).arg("init").assert().success();
    dw_cmd(root).args(["user", "add", "alice"]).assert().success();
    dw_cmd(root).args(["user", "add", "bob"]).assert().success();
    dw_cmd(root)
        .args(["user", "add", "root", "--name", "Help Desk Admin", "--admin"])
        .assert()
        .success();
    let ticket = run_json(
        root,
        &["ticket", "create", "--id", "T1", "--subject", "Printer offline"],
    );
    assert_eq!(ticket["id"], "T1");
    assert_eq!(ticket["status"], "Not Assigned");
    dir
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn first_agent_wins_and_second_sees_assignee() {
    let dir = setup();
    let root = dir.path();

    let started = run_json(root, &["--user", "alice", "start", "T1"]);
    assert_eq!(started["allowed"], true);
    assert_eq!(started["message"], "Ticket started successfully");

    let refused = run_json(root, &["--user", "bob", "start", "T1"]);
    assert_eq!(refused["allowed"], false);
    assert_eq!(refused["reason"], "assigned_to");
    assert_eq!(refused["actor"], "alice");

    let bob_button = run_json(root, &["--user", "bob", "button", "T1"]);
    assert_eq!(bob_button["show_button"], false);
    assert_eq!(bob_button["label"], "Assigned to alice");
    assert_eq!(bob_button["is_close"], false);

    let alice_button = run_json(root, &["--user", "alice", "button", "T1"]);
    assert_eq!(alice_button["show_button"], true);
    assert_eq!(alice_button["label"], "Close Ticket");
    assert_eq!(alice_button["is_close"], true);

    let bob_alert = run_json(root, &["--user", "bob", "alert", "T1"]);
    assert_eq!(bob_alert["show_alert"], 1);
    assert_eq!(bob_alert["assignee"], "alice");

    let shown = run_json(root, &["--user", "bob", "ticket", "show", "T1"]);
    assert_eq!(shown["status"], "In Progress");
    assert_eq!(shown["assignees"], serde_json::json!(["alice"]));
    assert_eq!(shown["button"]["label"], "Assigned to alice");
}

#[test]
fn env_user_is_used_when_flag_absent() {
    let dir = setup();
    let root = dir.path();

    let output = dw_cmd(root)
        .env("DESKWORK_USER", "bob")
        .args(["start", "T1", "--json"])
        .output()
        .expect("dw should run");
    assert!(output.status.success());
    assert_eq!(json_of(&output)["allowed"], true);

    let button = run_json(root, &["--user", "bob", "button", "T1"]);
    assert_eq!(button["label"], "Close Ticket");
}

#[test]
fn holder_closes_ticket() {
    let dir = setup();
    let root = dir.path();
    run_json(root, &["--user", "alice", "start", "T1"]);

    let bob_close = run_json(root, &["--user", "bob", "close", "T1"]);
    assert_eq!(bob_close["allowed"], false);
    assert_eq!(bob_close["reason"], "assigned_to");

    let closed = run_json(root, &["--user", "alice", "close", "T1"]);
    assert_eq!(closed["allowed"], true);

    let button = run_json(root, &["--user", "alice", "button", "T1"]);
    assert_eq!(button["show_button"], false);

    let again = run_json(root, &["--user", "bob", "start", "T1"]);
    assert_eq!(again["reason"], "closed");
}

#[test]
fn unknown_user_and_ticket_fail() {
    let dir = setup();
    let root = dir.path();

    dw_cmd(root)
        .args(["--user", "mallory", "start", "T1", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("permission_denied"));

    dw_cmd(root)
        .args(["--user", "alice", "start", "T404", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("not_found"));
}

#[test]
fn start_without_user_is_an_error() {
    let dir = setup();
    dw_cmd(dir.path())
        .args(["start", "T1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_user"));
}

#[test]
fn admin_unassign_frees_ticket_for_others() {
    let dir = setup();
    let root = dir.path();
    run_json(root, &["--user", "alice", "start", "T1"]);

    dw_cmd(root)
        .args(["--user", "bob", "unassign", "T1", "alice", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));

    let report = run_json(root, &["--user", "root", "unassign", "T1", "alice"]);
    assert_eq!(report["assignees"], serde_json::json!([]));
    assert_eq!(report["cancelled"].as_array().map(Vec::len), Some(1));

    let bob = run_json(root, &["--user", "bob", "start", "T1"]);
    assert_eq!(bob["allowed"], true);

    let admin_view = run_json(root, &["--user", "root", "button", "T1"]);
    assert_eq!(admin_view["label"], "Close Ticket");
}

#[test]
fn self_unassign_is_allowed() {
    let dir = setup();
    let root = dir.path();
    run_json(root, &["--user", "alice", "start", "T1"]);

    let report = run_json(root, &["--user", "alice", "unassign", "T1", "alice"]);
    assert_eq!(report["assignees"], serde_json::json!([]));

    let alert = run_json(root, &["--user", "bob", "alert", "T1"]);
    assert_eq!(alert["show_alert"], 0);
}

#[test]
fn commands_outside_project_report_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    dw_cmd(dir.path())
        .args(["--user", "alice", "button", "T1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn init_twice_needs_force() {
    let dir = TempDir::new().expect("tempdir");
    dw_cmd(dir.path()).arg("init").assert().success();
    dw_cmd(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    dw_cmd(dir.path()).args(["init", "--force"]).assert().success();
}
