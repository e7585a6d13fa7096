//! Lock contention and broken schemas: actions report `error` without
//! writing, and the read-only projections fall back to their defaults.

use std::path::Path;
use std::time::Duration;

use deskwork_core::api::{self, Reason};
use deskwork_core::lifecycle::{AssignmentAlert, ButtonState};
use deskwork_core::model::{NewTicket, TicketStatus};
use deskwork_core::store::{AssignmentFilter, RecordStore, SqliteStore};
use tempfile::TempDir;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

fn seed(path: &Path) {
    let mut store = SqliteStore::open(path, BUSY_TIMEOUT).expect("open seed store");
    for user in ["alice", "bob"] {
        store.add_user(user, None, &[]).expect("add user");
    }
    for id in ["T1", "T2"] {
        store
            .create_ticket(&NewTicket {
                id: Some(id.to_string()),
                subject: format!("Locked {id}"),
                ..NewTicket::default()
            })
            .expect("create ticket");
    }
    assert!(api::start_ticket(&mut store, "T2", "alice").allowed);
}

/// Second connection holding the write lock until dropped.
fn hold_write_lock(path: &Path) -> SqliteStore {
    let blocker = SqliteStore::open(path, BUSY_TIMEOUT).expect("open blocker");
    blocker
        .connection()
        .execute_batch("BEGIN IMMEDIATE")
        .expect("take write lock");
    blocker
}

#[test]
fn locked_store_refuses_start_and_close_without_writing() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("deskwork.db");
    seed(&path);

    let mut store = SqliteStore::open(&path, Duration::ZERO).expect("open store");
    let blocker = hold_write_lock(&path);

    let started = api::start_ticket(&mut store, "T1", "bob");
    assert!(!started.allowed, "{started:?}");
    assert_eq!(started.reason, Some(Reason::Error));
    assert!(started.is_failure());

    let closed = api::close_ticket(&mut store, "T2", "alice");
    assert!(!closed.allowed, "{closed:?}");
    assert_eq!(closed.reason, Some(Reason::Error));

    blocker
        .connection()
        .execute_batch("ROLLBACK")
        .expect("release write lock");
    drop(blocker);

    let untouched = store.ticket("T1").expect("T1");
    assert_eq!(untouched.status, TicketStatus::NotAssigned);
    assert!(untouched.assignees.is_empty());
    assert!(
        store
            .assignments(&AssignmentFilter::open_for("T1"))
            .expect("T1 assignments")
            .is_empty()
    );

    let still_open = store.ticket("T2").expect("T2");
    assert_eq!(still_open.status, TicketStatus::InProgress);
    assert_eq!(
        store
            .assignments(&AssignmentFilter::open_for("T2"))
            .expect("T2 assignments")
            .len(),
        1
    );
}

#[test]
fn projections_fall_back_when_assignments_are_unreadable() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("deskwork.db");
    seed(&path);

    let mut store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("open store");
    assert_eq!(
        api::button_state(&store, "T2", "bob"),
        ButtonState::assigned_to("alice")
    );
    assert!(api::assignment_alert(&store, "T2", "bob").is_shown());

    store
        .connection_mut()
        .execute_batch("DROP TABLE assignments")
        .expect("drop assignments");

    assert_eq!(api::button_state(&store, "T2", "bob"), ButtonState::start());
    assert_eq!(
        api::assignment_alert(&store, "T2", "bob"),
        AssignmentAlert::none()
    );
}

#[test]
fn missing_ticket_is_not_an_error_reason() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("deskwork.db");
    seed(&path);

    let mut store = SqliteStore::open(&path, Duration::ZERO).expect("open store");
    let result = api::start_ticket(&mut store, "T404", "bob");
    assert_eq!(result.reason, Some(Reason::NotFound));
}
