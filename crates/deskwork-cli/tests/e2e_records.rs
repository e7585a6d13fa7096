//! E2E tests for the record-keeping commands around a ticket: customers and
//! their alerts, comments, reports, location capture, and license lookup.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::net::TcpListener;
use std::path::Path;
use tempfile::TempDir;

fn dw_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dw"));
    cmd.current_dir(dir);
    cmd.env("DESKWORK_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env_remove("DESKWORK_USER");
    cmd.env_remove("DESKWORK_LICENSE_URL");
    cmd.env_remove("FORMAT");
    cmd
}

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
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Project with user alice and customer `acme` paid up to 2020-01-31.
fn setup() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path();
    dw_cmd(root).arg("init").assert().success();
    dw_cmd(root).args(["user", "add", "alice"]).assert().success();
    run_json(
        root,
        &[
            "customer",
            "save",
            "acme",
            "--customer-name",
            "Acme Traders",
            "--code",
            "C-100",
            "--product",
            "Billing",
            "--place",
            "Kochi",
            "--phone1",
            "0484 220011",
            "--amc-last-paid",
            "2020-01-31",
        ],
    );
    dir
}

#[test]
fn ticket_inherits_customer_code_and_resave_syncs() {
    let dir = setup();
    let root = dir.path();

    let ticket = run_json(
        root,
        &[
            "ticket", "create", "--id", "T1", "--subject", "Invoice crash", "--customer", "acme",
        ],
    );
    assert_eq!(ticket["customer_code"], "C-100");

    let saved = run_json(root, &["customer", "save", "acme", "--product", "Payroll"]);
    assert_eq!(saved["tickets_synced"], 1);

    let shown = run_json(root, &["customer", "show", "acme"]);
    assert_eq!(shown["customer_name"], "Acme Traders");
    assert_eq!(shown["customer_code"], "C-100");
    assert_eq!(shown["product_name"], "Payroll");

    let ticket = run_json(root, &["ticket", "show", "T1"]);
    assert_eq!(ticket["product"], "Payroll");
}

#[test]
fn search_requires_every_word() {
    let dir = setup();
    let root = dir.path();
    run_json(
        root,
        &["customer", "save", "globex", "--customer-name", "Globex", "--place", "Kochi"],
    );

    let both = run_json(root, &["customer", "search", "kochi"]);
    assert_eq!(both.as_array().map(Vec::len), Some(2));

    let one = run_json(root, &["customer", "search", "acme", "kochi"]);
    let hits = one.as_array().expect("array");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "acme");

    let none = run_json(root, &["customer", "search", "globex", "C-100"]);
    assert_eq!(none.as_array().map(Vec::len), Some(0));
}

#[test]
fn customer_alert_shows_on_ticket() {
    let dir = setup();
    let root = dir.path();
    run_json(
        root,
        &["ticket", "create", "--id", "T1", "--subject", "Slow", "--customer", "acme"],
    );

    let empty = run_json(root, &["customer", "alert", "acme"]);
    assert!(empty.is_null());

    run_json(
        root,
        &["--user", "alice", "customer", "set-alert", "acme", "Payment overdue"],
    );
    let replaced = run_json(
        root,
        &["--user", "alice", "customer", "set-alert", "acme", "Call before visiting"],
    );
    assert_eq!(replaced["remarks"], "Call before visiting");

    let ticket = run_json(root, &["ticket", "show", "T1"]);
    assert_eq!(ticket["customer_alert"]["remarks"], "Call before visiting");
}

#[test]
fn comments_feed_ticket_report() {
    let dir = setup();
    let root = dir.path();
    run_json(
        root,
        &["ticket", "create", "--id", "T1", "--subject", "Printer", "--customer", "acme"],
    );
    run_json(root, &["--user", "alice", "start", "T1"]);

    let comment = run_json(root, &["--user", "alice", "comment", "T1", "Replaced toner"]);
    assert_eq!(comment["author"], "alice");
    assert_eq!(comment["body"], "Replaced toner");

    let listed = run_json(root, &["comment", "T1"]);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let rows = run_json(root, &["report", "tickets", "--group-by-assignee"]);
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["kind"], "header");
    assert_eq!(rows[0]["assigned_to"], "alice");
    assert_eq!(rows[0]["ticket_count"], 1);
    assert_eq!(rows[1]["kind"], "ticket");
    assert_eq!(rows[1]["ticket_id"], "T1");
    assert_eq!(rows[1]["latest_comment"], "Replaced toner");

    let closed_only = run_json(root, &["report", "tickets", "--status", "Closed"]);
    assert_eq!(closed_only.as_array().map(Vec::len), Some(0));
}

#[test]
fn comment_on_missing_ticket_fails() {
    let dir = setup();
    dw_cmd(dir.path())
        .args(["--user", "alice", "comment", "T404", "hello", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn amc_report_splits_expired_and_upcoming() {
    let dir = setup();
    let root = dir.path();
    run_json(
        root,
        &[
            "customer",
            "save",
            "globex",
            "--customer-name",
            "Globex",
            "--amc-last-paid",
            "2027-03-31",
        ],
    );

    let expired = run_json(
        root,
        &["report", "amc", "--status", "AMC Expired", "--today", "2026-10-15"],
    );
    let expired = expired.as_array().expect("rows");
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0]["customer_name"], "Acme Traders");
    assert_eq!(expired[0]["amc_end_date"], "2020-01-31");

    let upcoming = run_json(
        root,
        &["report", "amc", "--status", "Upcoming Expiry", "--today", "2026-10-15"],
    );
    let upcoming = upcoming.as_array().expect("rows");
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0]["customer_name"], "Globex");

    dw_cmd(root)
        .args(["report", "amc", "--status", "Lapsed"])
        .assert()
        .failure();
}

#[test]
fn bad_dates_are_rejected() {
    let dir = setup();
    dw_cmd(dir.path())
        .args(["report", "tickets", "--from", "15/10/2026", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("from"));
}

#[test]
fn location_falls_back_to_coordinates_when_geocoder_unreachable() {
    let dir = setup();
    let root = dir.path();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    fs::write(
        root.join(".deskwork/config.toml"),
        format!("[geocoding]\nurl = \"http://127.0.0.1:{port}/reverse\"\ntimeout_secs = 1\n"),
    )
    .expect("write config");
    run_json(root, &["ticket", "create", "--id", "T1", "--subject", "Site visit"]);

    let captured = run_json(
        root,
        &["--user", "alice", "location", "T1", "--lat", "9.5", "--lng", "-76.25"],
    );
    assert_eq!(captured["success"], true);
    assert_eq!(captured["address"], "9.500000, -76.250000");

    let ticket = run_json(root, &["ticket", "show", "T1"]);
    assert_eq!(ticket["location"]["latitude"], 9.5);
}

#[test]
fn location_rejects_out_of_range_latitude() {
    let dir = setup();
    dw_cmd(dir.path())
        .args(["--user", "alice", "location", "T1", "--lat", "91", "--lng", "0"])
        .assert()
        .failure();
}

#[test]
fn license_lookup_without_service_is_an_error() {
    let dir = setup();
    dw_cmd(dir.path())
        .args(["license", "C-100", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error_code"));
}

#[test]
fn products_are_routed_to_known_teams() {
    let dir = setup();
    let root = dir.path();

    let empty = run_json(root, &["team", "list"]);
    assert_eq!(empty.as_array().map(Vec::len), Some(0));

    dw_cmd(root)
        .args(["product", "save", "Ledger", "--team", "Billing", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));

    run_json(root, &["team", "add", "Support"]);
    run_json(root, &["team", "add", "Billing"]);
    let teams = run_json(root, &["team", "list"]);
    let names: Vec<&str> = teams
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, ["Billing", "Support"]);

    run_json(
        root,
        &["product", "save", "Ledger", "--team", "Billing", "--description", "Accounting"],
    );
    let moved = run_json(root, &["product", "save", "Ledger", "--team", "Support"]);
    assert_eq!(moved["team"], "Support");
    assert_eq!(moved["description"], "Accounting");

    let shown = run_json(root, &["product", "show", "Ledger"]);
    assert_eq!(shown["team"], "Support");

    dw_cmd(root)
        .args(["product", "show", "Payroll", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn completions_generate_for_bash() {
    let dir = TempDir::new().expect("tempdir");
    dw_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dw"));
}
