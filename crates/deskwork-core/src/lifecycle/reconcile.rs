//! Restores consistency between a ticket's assignee list and its
//! assignments after the list is edited outside `start`.

use super::{LifecycleError, commit, require_ticket_id};
use crate::error::ValidationError;
use crate::model::{Actor, AssignmentStatus, TicketUpdate};
use crate::store::{AssignmentFilter, RecordStore, StoreError, UnitOfWork};
use serde::Serialize;
use std::collections::HashSet;

/// Which component changed the assignee list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// The start transition, which keeps the list in sync itself.
    StartTicket,
    /// Any other editor, such as a manual unassign.
    External,
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Ids of assignments moved to Cancelled.
    pub cancelled: Vec<i64>,
    /// Assignee list stored on the ticket afterwards.
    pub assignees: Vec<String>,
    /// True when the change came from `start` and nothing was touched.
    pub skipped: bool,
}

/// React to a changed assignee list on `ticket_id`.
///
/// Changes from [`ChangeOrigin::StartTicket`] are ignored. Otherwise, under
/// the ticket lock and in one unit of work: an empty `new` list cancels every
/// non-cancelled assignment and clears the list; a non-empty list cancels
/// only the assignments whose user is no longer present.
///
/// # Errors
///
/// Returns an error for an unknown ticket or a store failure. Nothing is
/// committed in that case.
pub fn on_assignee_list_changed<S: RecordStore>(
    store: &mut S,
    ticket_id: &str,
    old: &[String],
    new: &[String],
    origin: ChangeOrigin,
) -> Result<ReconcileReport, LifecycleError> {
    if origin == ChangeOrigin::StartTicket {
        tracing::trace!(ticket = ticket_id, "assignee change from start; skipping");
        return Ok(ReconcileReport {
            skipped: true,
            ..ReconcileReport::default()
        });
    }

    let ticket_id = require_ticket_id(ticket_id)?;
    let removed: Vec<&str> = old
        .iter()
        .map(String::as_str)
        .filter(|user| !new.iter().any(|kept| kept == user))
        .collect();
    tracing::debug!(ticket = ticket_id, ?removed, "reconciling assignee list");

    let mut unit = store.begin()?;
    unit.ticket_for_update(ticket_id)?;
    let report = reconcile_in(&mut unit, ticket_id, new)?;
    commit(unit, ticket_id)?;
    Ok(report)
}

/// Remove `users` from a ticket's assignee list and reconcile, as one unit
/// of work.
///
/// Administrators may remove anyone; other actors may only remove
/// themselves.
///
/// # Errors
///
/// Returns `PermissionDenied` when a non-administrator removes someone else,
/// a validation error for an empty user list, and store errors unchanged.
pub fn remove_assignees<S: RecordStore>(
    store: &mut S,
    ticket_id: &str,
    users: &[String],
    actor: &Actor,
) -> Result<ReconcileReport, LifecycleError> {
    let ticket_id = require_ticket_id(ticket_id)?;
    let users: HashSet<&str> = users
        .iter()
        .map(|user| user.trim())
        .filter(|user| !user.is_empty())
        .collect();
    if users.is_empty() {
        return Err(ValidationError::new("users", "at least one user is required").into());
    }
    if !actor.is_admin() && users.iter().any(|user| *user != actor.id) {
        return Err(StoreError::PermissionDenied(format!(
            "{} may only unassign themself",
            actor.id
        ))
        .into());
    }

    let mut unit = store.begin()?;
    let ticket = unit.ticket_for_update(ticket_id)?;
    let new: Vec<String> = ticket
        .assignees
        .iter()
        .filter(|user| !users.contains(user.as_str()))
        .cloned()
        .collect();
    let report = reconcile_in(&mut unit, ticket_id, &new)?;
    commit(unit, ticket_id)?;

    tracing::info!(
        ticket = ticket_id,
        actor = %actor.id,
        cancelled = report.cancelled.len(),
        "removed assignees"
    );
    Ok(report)
}

/// Cancel every active assignment whose user is absent from `new`, then
/// store the surviving holders as the assignee list.
///
/// Users in `new` without an Open assignment are dropped from the stored
/// list, since only `start` creates assignments.
fn reconcile_in<U: UnitOfWork>(
    unit: &mut U,
    ticket_id: &str,
    new: &[String],
) -> Result<ReconcileReport, StoreError> {
    let keep: HashSet<&str> = new
        .iter()
        .map(|user| user.trim())
        .filter(|user| !user.is_empty())
        .collect();

    let mut cancelled = Vec::new();
    let mut holders = HashSet::new();
    for assignment in unit.assignments(&AssignmentFilter::active_for(ticket_id))? {
        if keep.contains(assignment.assigned_to.as_str()) {
            holders.insert(assignment.assigned_to);
        } else {
            unit.set_assignment_status(assignment.id, AssignmentStatus::Cancelled)?;
            cancelled.push(assignment.id);
        }
    }

    let assignees: Vec<String> = new
        .iter()
        .map(|user| user.trim().to_string())
        .filter(|user| holders.contains(user))
        .collect();
    unit.update_ticket(
        ticket_id,
        &TicketUpdate {
            assignees: Some(assignees.clone()),
            ..TicketUpdate::default()
        },
    )?;

    if !cancelled.is_empty() {
        tracing::info!(
            ticket = ticket_id,
            cancelled = ?cancelled,
            "cancelled assignments"
        );
    }
    Ok(ReconcileReport {
        cancelled,
        assignees,
        skipped: false,
    })
}
