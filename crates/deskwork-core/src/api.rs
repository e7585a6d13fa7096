//! Operations exposed to the UI layer.
//!
//! Each call takes the acting user id, resolves it against the store, and
//! returns a plain payload. Nothing here returns `Err`: failures are logged
//! and folded into the payload.

use crate::identity::{display_name, resolve_actor};
use crate::lifecycle::{
    self, AssignmentAlert, ButtonState, CloseOutcome, LifecycleError, Rejection, StartOutcome,
};
use crate::model::Actor;
use crate::store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};

/// Machine-readable reason an action was not performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    AssignedTo,
    Closed,
    NotStarted,
    NotFound,
    PermissionDenied,
    Error,
}

impl Reason {
    /// Reasons that are failures rather than expected business outcomes.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::NotFound | Self::PermissionDenied | Self::Error)
    }
}

/// Result of `start_ticket` and `close_ticket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    /// Display name of the user holding the ticket, for `assigned_to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub message: String,
}

impl ActionResult {
    fn allowed(message: &str) -> Self {
        Self {
            allowed: true,
            reason: None,
            actor: None,
            message: message.to_string(),
        }
    }

    fn refused(reason: Reason, message: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            actor: None,
            message,
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.reason.is_some_and(Reason::is_failure)
    }

    fn rejection<S: RecordStore>(store: &S, rejection: Rejection) -> Self {
        match rejection {
            Rejection::AssignedTo { assignee } => {
                let name = display_name(store, &assignee);
                Self {
                    actor: Some(name.clone()),
                    ..Self::refused(
                        Reason::AssignedTo,
                        format!("Ticket is already assigned to {name}"),
                    )
                }
            }
            Rejection::Closed => Self::refused(Reason::Closed, "Ticket is closed".to_string()),
            Rejection::NotStarted => Self::refused(
                Reason::NotStarted,
                "Ticket has not been started".to_string(),
            ),
        }
    }

    fn failure(action: &str, ticket_id: &str, err: &LifecycleError) -> Self {
        let (reason, message) = match err {
            LifecycleError::Store(StoreError::NotFound { .. }) => {
                (Reason::NotFound, format!("Ticket {ticket_id} not found"))
            }
            LifecycleError::Store(StoreError::PermissionDenied(detail)) => {
                (Reason::PermissionDenied, format!("Permission denied: {detail}"))
            }
            LifecycleError::Invalid(invalid) => (Reason::Error, invalid.to_string()),
            LifecycleError::Store(other) => {
                tracing::error!(ticket = ticket_id, error = %other, "{action} failed");
                (Reason::Error, format!("Could not {action} ticket: {other}"))
            }
        };
        Self::refused(reason, message)
    }
}

/// Start `ticket_id` on behalf of `user_id`.
pub fn start_ticket<S: RecordStore>(store: &mut S, ticket_id: &str, user_id: &str) -> ActionResult {
    let actor = match resolve_actor(store, user_id) {
        Ok(actor) => actor,
        Err(err) => return ActionResult::failure("start", ticket_id, &err.into()),
    };

    match lifecycle::start(store, ticket_id, &actor) {
        Ok(StartOutcome::Started { .. }) => ActionResult::allowed("Ticket started successfully"),
        Ok(StartOutcome::Resumed { .. }) => {
            ActionResult::allowed("Ticket resumed (already assigned)")
        }
        Ok(StartOutcome::Rejected(rejection)) => ActionResult::rejection(store, rejection),
        Err(err) => ActionResult::failure("start", ticket_id, &err),
    }
}

/// Close `ticket_id` on behalf of `user_id`.
pub fn close_ticket<S: RecordStore>(store: &mut S, ticket_id: &str, user_id: &str) -> ActionResult {
    let actor = match resolve_actor(store, user_id) {
        Ok(actor) => actor,
        Err(err) => return ActionResult::failure("close", ticket_id, &err.into()),
    };

    match lifecycle::close(store, ticket_id, &actor) {
        Ok(CloseOutcome::Closed { .. }) => ActionResult::allowed("Ticket closed successfully"),
        Ok(CloseOutcome::Rejected(rejection)) => ActionResult::rejection(store, rejection),
        Err(err) => ActionResult::failure("close", ticket_id, &err),
    }
}

/// Viewer identity for the read-only projections. Unknown users are treated
/// as plain users without roles.
fn viewer<S: RecordStore>(store: &S, user_id: &str) -> Actor {
    resolve_actor(store, user_id).unwrap_or_else(|err| {
        tracing::debug!(user = user_id, error = %err, "viewing as unprivileged user");
        Actor::new(user_id.trim())
    })
}

/// Button state of `ticket_id` as seen by `user_id`.
pub fn button_state<S: RecordStore>(store: &S, ticket_id: &str, user_id: &str) -> ButtonState {
    lifecycle::button_state(store, ticket_id, &viewer(store, user_id))
}

/// Assignment alert of `ticket_id` as seen by `user_id`.
pub fn assignment_alert<S: RecordStore>(
    store: &S,
    ticket_id: &str,
    user_id: &str,
) -> AssignmentAlert {
    lifecycle::assignment_alert(store, ticket_id, &viewer(store, user_id))
}
