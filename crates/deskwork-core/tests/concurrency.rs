//! Racing `start` calls from separate connections against one on-disk
//! database.

use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use deskwork_core::api::{self, Reason};
use deskwork_core::lifecycle::{ChangeOrigin, on_assignee_list_changed};
use deskwork_core::model::NewTicket;
use deskwork_core::store::{AssignmentFilter, RecordStore, SqliteStore};
use tempfile::TempDir;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

fn seed(path: &Path, tickets: &[&str], users: &[String]) {
    let mut store = SqliteStore::open(path, BUSY_TIMEOUT).expect("open seed store");
    for user in users {
        store.add_user(user, None, &[]).expect("add user");
    }
    for id in tickets {
        store
            .create_ticket(&NewTicket {
                id: Some((*id).to_string()),
                subject: format!("Race {id}"),
                ..NewTicket::default()
            })
            .expect("create ticket");
    }
}

fn race_start(path: &Path, ticket: &str, users: &[String]) -> Vec<api::ActionResult> {
    let barrier = Arc::new(Barrier::new(users.len()));
    let handles: Vec<_> = users
        .iter()
        .cloned()
        .map(|user| {
            let barrier = Arc::clone(&barrier);
            let path = path.to_path_buf();
            let ticket = ticket.to_string();
            thread::spawn(move || {
                let mut store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("open store");
                barrier.wait();
                api::start_ticket(&mut store, &ticket, &user)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect()
}

#[test]
fn exactly_one_concurrent_start_wins() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("deskwork.db");
    let users: Vec<String> = (0..8).map(|n| format!("agent-{n}")).collect();
    seed(&path, &["T1"], &users);

    let results = race_start(&path, "T1", &users);

    let winners: Vec<_> = results.iter().filter(|result| result.allowed).collect();
    assert_eq!(winners.len(), 1, "results: {results:?}");
    for loser in results.iter().filter(|result| !result.allowed) {
        assert_eq!(loser.reason, Some(Reason::AssignedTo), "loser: {loser:?}");
    }

    let store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("reopen");
    let open = store
        .assignments(&AssignmentFilter::open_for("T1"))
        .expect("open assignments");
    assert_eq!(open.len(), 1);
    let ticket = store.ticket("T1").expect("ticket");
    assert_eq!(ticket.assignees, vec![open[0].assigned_to.clone()]);
    assert_eq!(
        results
            .iter()
            .filter(|result| result.actor.as_deref() == Some(open[0].assigned_to.as_str()))
            .count(),
        users.len() - 1
    );
}

#[test]
fn races_on_different_tickets_do_not_interfere() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("deskwork.db");
    let users: Vec<String> = (0..4).map(|n| format!("agent-{n}")).collect();
    let tickets = ["A", "B", "C", "D"];
    seed(&path, &tickets, &users);

    let barrier = Arc::new(Barrier::new(tickets.len()));
    let handles: Vec<_> = tickets
        .iter()
        .zip(users.iter().cloned())
        .map(|(ticket, user)| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            let ticket = (*ticket).to_string();
            thread::spawn(move || {
                let mut store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("open store");
                barrier.wait();
                api::start_ticket(&mut store, &ticket, &user)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().expect("thread panicked");
        assert!(result.allowed, "{result:?}");
    }
}

#[test]
fn reconcile_and_start_serialize_on_the_lock() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("deskwork.db");
    let users = vec!["alice".to_string(), "bob".to_string()];
    seed(&path, &["T1"], &users);
    {
        let mut store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("open");
        assert!(api::start_ticket(&mut store, "T1", "alice").allowed);
    }

    let barrier = Arc::new(Barrier::new(2));
    let clear = {
        let barrier = Arc::clone(&barrier);
        let path = path.clone();
        thread::spawn(move || {
            let mut store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("open");
            barrier.wait();
            on_assignee_list_changed(
                &mut store,
                "T1",
                &["alice".to_string()],
                &[],
                ChangeOrigin::External,
            )
            .expect("reconcile");
        })
    };
    let start = {
        let barrier = Arc::clone(&barrier);
        let path = path.clone();
        thread::spawn(move || {
            let mut store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("open");
            barrier.wait();
            api::start_ticket(&mut store, "T1", "bob")
        })
    };
    clear.join().expect("clear thread");
    start.join().expect("start thread");

    // Whichever order the two ran in, the cache matches the Open set.
    let store = SqliteStore::open(&path, BUSY_TIMEOUT).expect("reopen");
    let open: Vec<String> = store
        .assignments(&AssignmentFilter::open_for("T1"))
        .expect("open")
        .into_iter()
        .map(|assignment| assignment.assigned_to)
        .collect();
    assert!(open.len() <= 1);
    assert_eq!(store.ticket("T1").expect("ticket").assignees, open);
}
