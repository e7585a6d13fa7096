//! Ticket assignment state machine.
//!
//! `start` and `close` are the only transitions. Both run inside one
//! [`UnitOfWork`]: the ticket is read under the exclusive lock, the Open
//! assignments are inspected, and every write commits together. Returning
//! early drops the unit, which rolls back and releases the lock.
//!
//! A ticket is in one of these derived states:
//!
//! | state            | condition                                         |
//! |------------------|---------------------------------------------------|
//! | `Closed`         | status is `Closed`                                |
//! | `Unassigned`     | no Open assignment                                |
//! | `AssignedToSelf` | latest Open assignment belongs to the actor       |
//! | `AssignedToOther`| latest Open assignment belongs to someone else    |

pub mod projector;
pub mod reconcile;

pub use projector::{AssignmentAlert, ButtonState, assignment_alert, button_state};
pub use reconcile::{ChangeOrigin, ReconcileReport, on_assignee_list_changed, remove_assignees};

use crate::error::{ErrorCode, ValidationError};
use crate::model::{Actor, Assignment, NewAssignment, Ticket, TicketStatus, TicketUpdate, now_us};
use crate::store::{AssignmentFilter, RecordStore, StoreError, UnitOfWork};

/// Failure of a mutating lifecycle operation.
///
/// Conflicts are not errors; they come back as a [`Rejection`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl LifecycleError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(err) => err.code(),
            Self::Invalid(err) => err.code(),
        }
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Another user holds the latest Open assignment.
    AssignedTo { assignee: String },
    /// The ticket is closed.
    Closed,
    /// Close was requested but nobody has started the ticket.
    NotStarted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A new Open assignment was created for the actor.
    Started {
        ticket: Ticket,
        assignment: Assignment,
    },
    /// The actor already held the only Open assignment; status and start
    /// time were re-stamped.
    Resumed { ticket: Ticket },
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    Closed { ticket: Ticket },
    Rejected(Rejection),
}

pub(crate) fn require_ticket_id(ticket_id: &str) -> Result<&str, ValidationError> {
    let ticket_id = ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(ValidationError::new("ticket", "ticket id must not be empty"));
    }
    Ok(ticket_id)
}

/// Start working a ticket as `actor`.
///
/// The first caller to take the lock on an unassigned ticket wins; every
/// later caller sees the new Open assignment and is rejected. A user who
/// already holds the only Open assignment resumes instead of being
/// rejected.
///
/// # Errors
///
/// Returns an error for an empty or unknown ticket id, or when the store
/// fails. Nothing is written in that case.
pub fn start<S: RecordStore>(
    store: &mut S,
    ticket_id: &str,
    actor: &Actor,
) -> Result<StartOutcome, LifecycleError> {
    let ticket_id = require_ticket_id(ticket_id)?;
    let mut unit = store.begin()?;
    let ticket = unit.ticket_for_update(ticket_id)?;

    if ticket.status.is_closed() {
        tracing::debug!(ticket = ticket_id, actor = %actor.id, "start refused: ticket closed");
        return Ok(StartOutcome::Rejected(Rejection::Closed));
    }

    let open = unit.assignments(&AssignmentFilter::open_for(ticket_id))?;
    let now = now_us();
    let resumed = match open.as_slice() {
        [] => false,
        [only] if only.assigned_to == actor.id => true,
        [latest, ..] => {
            tracing::debug!(
                ticket = ticket_id,
                actor = %actor.id,
                assignee = %latest.assigned_to,
                "start refused: already assigned"
            );
            return Ok(StartOutcome::Rejected(Rejection::AssignedTo {
                assignee: latest.assigned_to.clone(),
            }));
        }
    };

    let assignment = if resumed {
        None
    } else {
        Some(unit.create_assignment(NewAssignment {
            reference: ticket_id.to_string(),
            assigned_to: actor.id.clone(),
            description: Some(ticket.subject.clone()),
            created_at_us: now,
        })?)
    };
    unit.update_ticket(
        ticket_id,
        &TicketUpdate {
            status: Some(TicketStatus::InProgress),
            start_time_us: Some(now),
            assignees: Some(vec![actor.id.clone()]),
            ..TicketUpdate::default()
        },
    )?;
    commit(unit, ticket_id)?;
    announce_status(&ticket, &TicketStatus::InProgress, &actor.id);

    let ticket = store.ticket(ticket_id)?;
    Ok(match assignment {
        Some(assignment) => StartOutcome::Started { ticket, assignment },
        None => StartOutcome::Resumed { ticket },
    })
}

/// Close a ticket as `actor`.
///
/// Allowed for the holder of the latest Open assignment and for
/// administrators. The assignment stays Open as the record of who handled
/// the ticket.
///
/// # Errors
///
/// Returns an error for an empty or unknown ticket id, or when the store
/// fails.
pub fn close<S: RecordStore>(
    store: &mut S,
    ticket_id: &str,
    actor: &Actor,
) -> Result<CloseOutcome, LifecycleError> {
    let ticket_id = require_ticket_id(ticket_id)?;
    let mut unit = store.begin()?;
    let ticket = unit.ticket_for_update(ticket_id)?;

    if ticket.status.is_closed() {
        return Ok(CloseOutcome::Rejected(Rejection::Closed));
    }

    let latest = unit
        .assignments(&AssignmentFilter::latest_open_for(ticket_id))?
        .into_iter()
        .next();
    match latest {
        None => return Ok(CloseOutcome::Rejected(Rejection::NotStarted)),
        Some(holder) if holder.assigned_to != actor.id && !actor.is_admin() => {
            return Ok(CloseOutcome::Rejected(Rejection::AssignedTo {
                assignee: holder.assigned_to,
            }));
        }
        Some(_) => {}
    }

    unit.update_ticket(
        ticket_id,
        &TicketUpdate {
            status: Some(TicketStatus::Closed),
            closed_at_us: Some(now_us()),
            ..TicketUpdate::default()
        },
    )?;
    commit(unit, ticket_id)?;
    announce_status(&ticket, &TicketStatus::Closed, &actor.id);

    Ok(CloseOutcome::Closed {
        ticket: store.ticket(ticket_id)?,
    })
}

/// Overwrite a ticket's status outside the start/close flow, the way a
/// generic ticket form would.
///
/// # Errors
///
/// Returns an error for an empty or unknown ticket id, or when the store
/// fails.
pub fn set_status<S: RecordStore>(
    store: &mut S,
    ticket_id: &str,
    status: TicketStatus,
    actor: &Actor,
) -> Result<Ticket, LifecycleError> {
    let ticket_id = require_ticket_id(ticket_id)?;
    let mut unit = store.begin()?;
    let ticket = unit.ticket_for_update(ticket_id)?;
    if ticket.status == status {
        return Ok(ticket);
    }

    unit.update_ticket(
        ticket_id,
        &TicketUpdate {
            status: Some(status.clone()),
            ..TicketUpdate::default()
        },
    )?;
    commit(unit, ticket_id)?;
    announce_status(&ticket, &status, &actor.id);
    Ok(store.ticket(ticket_id)?)
}

pub(crate) fn commit<U: UnitOfWork>(unit: U, ticket_id: &str) -> Result<(), StoreError> {
    unit.commit().inspect_err(|err| {
        tracing::error!(ticket = ticket_id, error = %err, "commit failed");
    })
}

fn announce_status(before: &Ticket, after: &TicketStatus, actor: &str) {
    if &before.status == after {
        return;
    }
    tracing::info!(
        ticket = %before.id,
        from = %before.status,
        to = %after,
        actor,
        "ticket status changed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ADMINISTRATOR_ROLE, AssignmentStatus, NewTicket};
    use crate::store::SqliteStore;

    fn store_with(ticket_id: &str, status: TicketStatus) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        store
            .create_ticket(&NewTicket {
                id: Some(ticket_id.to_string()),
                subject: "Scanner offline".to_string(),
                status,
                ..NewTicket::default()
            })
            .expect("create ticket");
        store
    }

    fn open_count(store: &SqliteStore, ticket_id: &str) -> usize {
        store
            .assignments(&AssignmentFilter::open_for(ticket_id))
            .expect("list")
            .len()
    }

    #[test]
    fn first_start_creates_assignment_and_moves_to_in_progress() {
        let mut store = store_with("T1", TicketStatus::NotAssigned);
        let outcome = start(&mut store, "T1", &Actor::new("alice")).expect("start");

        let StartOutcome::Started { ticket, assignment } = outcome else {
            panic!("expected Started, got {outcome:?}");
        };
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert!(ticket.start_time_us.is_some());
        assert_eq!(ticket.assignees, vec!["alice".to_string()]);
        assert_eq!(assignment.assigned_to, "alice");
        assert_eq!(assignment.status, AssignmentStatus::Open);
        assert_eq!(open_count(&store, "T1"), 1);
    }

    #[test]
    fn second_user_is_rejected_with_current_assignee() {
        let mut store = store_with("T1", TicketStatus::NotAssigned);
        start(&mut store, "T1", &Actor::new("alice")).expect("alice");
        let outcome = start(&mut store, "T1", &Actor::new("bob")).expect("bob");
        assert_eq!(
            outcome,
            StartOutcome::Rejected(Rejection::AssignedTo {
                assignee: "alice".to_string()
            })
        );
        assert_eq!(open_count(&store, "T1"), 1);
    }

    #[test]
    fn admins_do_not_bypass_start() {
        let mut store = store_with("T1", TicketStatus::NotAssigned);
        start(&mut store, "T1", &Actor::new("alice")).expect("alice");
        let admin = Actor::new("root").with_role(ADMINISTRATOR_ROLE);
        let outcome = start(&mut store, "T1", &admin).expect("root");
        assert!(matches!(
            outcome,
            StartOutcome::Rejected(Rejection::AssignedTo { .. })
        ));
    }

    #[test]
    fn same_user_restart_resumes_without_new_assignment() {
        let mut store = store_with("T1", TicketStatus::NotAssigned);
        start(&mut store, "T1", &Actor::new("alice")).expect("first");
        set_status(
            &mut store,
            "T1",
            TicketStatus::Custom("Paused".into()),
            &Actor::new("alice"),
        )
        .expect("pause");

        let outcome = start(&mut store, "T1", &Actor::new("alice")).expect("second");
        let StartOutcome::Resumed { ticket } = outcome else {
            panic!("expected Resumed, got {outcome:?}");
        };
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(open_count(&store, "T1"), 1);
    }

    #[test]
    fn closed_tickets_cannot_be_started() {
        let mut store = store_with("T1", TicketStatus::Closed);
        let outcome = start(&mut store, "T1", &Actor::new("alice")).expect("start");
        assert_eq!(outcome, StartOutcome::Rejected(Rejection::Closed));
        assert_eq!(open_count(&store, "T1"), 0);
    }

    #[test]
    fn unknown_ticket_is_an_error_and_writes_nothing() {
        let mut store = store_with("T1", TicketStatus::NotAssigned);
        let err = start(&mut store, "T404", &Actor::new("alice")).expect_err("missing");
        assert_eq!(err.code(), ErrorCode::TicketNotFound);

        let err = start(&mut store, "  ", &Actor::new("alice")).expect_err("blank");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn holder_closes_and_assignment_stays_open() {
        let mut store = store_with("T1", TicketStatus::NotAssigned);
        start(&mut store, "T1", &Actor::new("alice")).expect("start");
        let outcome = close(&mut store, "T1", &Actor::new("alice")).expect("close");
        let CloseOutcome::Closed { ticket } = outcome else {
            panic!("expected Closed, got {outcome:?}");
        };
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert!(ticket.closed_at_us.is_some());
        assert_eq!(open_count(&store, "T1"), 1);

        let again = close(&mut store, "T1", &Actor::new("alice")).expect("again");
        assert_eq!(again, CloseOutcome::Rejected(Rejection::Closed));
    }

    #[test]
    fn close_requires_holder_or_admin() {
        let mut store = store_with("T1", TicketStatus::NotAssigned);
        assert_eq!(
            close(&mut store, "T1", &Actor::new("alice")).expect("close"),
            CloseOutcome::Rejected(Rejection::NotStarted)
        );

        start(&mut store, "T1", &Actor::new("alice")).expect("start");
        assert_eq!(
            close(&mut store, "T1", &Actor::new("bob")).expect("bob"),
            CloseOutcome::Rejected(Rejection::AssignedTo {
                assignee: "alice".into()
            })
        );

        let admin = Actor::new("root").with_role(ADMINISTRATOR_ROLE);
        assert!(matches!(
            close(&mut store, "T1", &admin).expect("admin"),
            CloseOutcome::Closed { .. }
        ));
    }
}
