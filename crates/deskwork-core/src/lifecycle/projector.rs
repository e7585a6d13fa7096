//! Read-only button and alert hints.
//!
//! Neither projection takes the write lock, so a read racing a `start` may
//! return a stale label; the next read corrects it. Store failures degrade
//! to the permissive defaults instead of propagating.

use crate::identity::display_name;
use crate::model::{Actor, Assignment};
use crate::store::{AssignmentFilter, RecordStore, StoreError};
use serde::{Deserialize, Serialize};

pub const START_LABEL: &str = "Start Ticket";
pub const CLOSE_LABEL: &str = "Close Ticket";

/// What the ticket's action button should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonState {
    pub show_button: bool,
    #[serde(alias = "button_text")]
    pub label: String,
    pub is_close: bool,
}

impl ButtonState {
    #[must_use]
    pub fn start() -> Self {
        Self {
            show_button: true,
            label: START_LABEL.to_string(),
            is_close: false,
        }
    }

    #[must_use]
    pub fn close() -> Self {
        Self {
            show_button: true,
            label: CLOSE_LABEL.to_string(),
            is_close: true,
        }
    }

    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            show_button: false,
            label: String::new(),
            is_close: false,
        }
    }

    #[must_use]
    pub fn assigned_to(name: &str) -> Self {
        Self {
            show_button: false,
            label: format!("Assigned to {name}"),
            is_close: false,
        }
    }
}

/// Banner warning the actor that someone else holds the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentAlert {
    /// `1` when the banner should be shown, else `0`.
    pub show_alert: u8,
    pub message: String,
    pub assignee: String,
}

impl AssignmentAlert {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            show_alert: 0,
            message: String::new(),
            assignee: String::new(),
        }
    }

    #[must_use]
    pub fn assigned_to(name: &str) -> Self {
        Self {
            show_alert: 1,
            message: format!("Ticket is assigned to {name}"),
            assignee: name.to_string(),
        }
    }

    #[must_use]
    pub const fn is_shown(&self) -> bool {
        self.show_alert != 0
    }
}

fn latest_open<S: RecordStore>(
    store: &S,
    ticket_id: &str,
) -> Result<Option<Assignment>, StoreError> {
    Ok(store
        .assignments(&AssignmentFilter::latest_open_for(ticket_id))?
        .into_iter()
        .next())
}

fn sees_as_own(holder: &Assignment, actor: &Actor) -> bool {
    holder.assigned_to == actor.id || actor.is_admin()
}

/// Button state for `actor` looking at `ticket_id`.
pub fn button_state<S: RecordStore>(store: &S, ticket_id: &str, actor: &Actor) -> ButtonState {
    match try_button_state(store, ticket_id, actor) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(
                ticket = ticket_id,
                actor = %actor.id,
                error = %err,
                "button state lookup failed; showing default"
            );
            ButtonState::start()
        }
    }
}

fn try_button_state<S: RecordStore>(
    store: &S,
    ticket_id: &str,
    actor: &Actor,
) -> Result<ButtonState, StoreError> {
    let ticket = store.ticket(ticket_id)?;
    if ticket.status.is_closed() {
        return Ok(ButtonState::hidden());
    }
    if ticket.status.is_unassigned() {
        return Ok(ButtonState::start());
    }

    Ok(match latest_open(store, ticket_id)? {
        None => ButtonState::start(),
        Some(holder) if sees_as_own(&holder, actor) => ButtonState::close(),
        Some(holder) => ButtonState::assigned_to(&display_name(store, &holder.assigned_to)),
    })
}

/// Assignment alert for `actor` looking at `ticket_id`.
pub fn assignment_alert<S: RecordStore>(
    store: &S,
    ticket_id: &str,
    actor: &Actor,
) -> AssignmentAlert {
    let holder = match latest_open(store, ticket_id) {
        Ok(holder) => holder,
        Err(err) => {
            tracing::warn!(
                ticket = ticket_id,
                actor = %actor.id,
                error = %err,
                "assignment alert lookup failed; showing none"
            );
            return AssignmentAlert::none();
        }
    };

    match holder {
        Some(holder) if !sees_as_own(&holder, actor) => {
            AssignmentAlert::assigned_to(&display_name(store, &holder.assigned_to))
        }
        _ => AssignmentAlert::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{close, start};
    use crate::model::{ADMINISTRATOR_ROLE, NewTicket, TicketStatus};
    use crate::store::SqliteStore;

    fn store_with(status: TicketStatus) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        store
            .add_user("alice", Some("Alice Liddell"), &[])
            .expect("alice");
        store
            .create_ticket(&NewTicket {
                id: Some("T1".into()),
                subject: "Laptop battery".into(),
                status,
                ..NewTicket::default()
            })
            .expect("ticket");
        store
    }

    #[test]
    fn unassigned_ticket_offers_start() {
        let store = store_with(TicketStatus::NotAssigned);
        assert_eq!(
            button_state(&store, "T1", &Actor::new("bob")),
            ButtonState::start()
        );
        let store = store_with(TicketStatus::Other);
        assert_eq!(
            button_state(&store, "T1", &Actor::new("bob")),
            ButtonState::start()
        );
    }

    #[test]
    fn in_progress_without_assignment_offers_start() {
        let store = store_with(TicketStatus::InProgress);
        assert_eq!(
            button_state(&store, "T1", &Actor::new("bob")),
            ButtonState::start()
        );
    }

    #[test]
    fn holder_sees_close_and_others_see_assignee_name() {
        let mut store = store_with(TicketStatus::NotAssigned);
        start(&mut store, "T1", &Actor::new("alice")).expect("start");

        assert_eq!(
            button_state(&store, "T1", &Actor::new("alice")),
            ButtonState::close()
        );
        let bob_view = button_state(&store, "T1", &Actor::new("bob"));
        assert!(!bob_view.show_button);
        assert_eq!(bob_view.label, "Assigned to Alice Liddell");
        assert!(!bob_view.is_close);
    }

    #[test]
    fn admins_see_close_on_someone_elses_ticket() {
        let mut store = store_with(TicketStatus::NotAssigned);
        start(&mut store, "T1", &Actor::new("alice")).expect("start");
        let admin = Actor::new("root").with_role(ADMINISTRATOR_ROLE);
        assert_eq!(button_state(&store, "T1", &admin), ButtonState::close());
        assert_eq!(assignment_alert(&store, "T1", &admin), AssignmentAlert::none());
    }

    #[test]
    fn closed_ticket_hides_button_for_everyone() {
        let mut store = store_with(TicketStatus::NotAssigned);
        start(&mut store, "T1", &Actor::new("alice")).expect("start");
        close(&mut store, "T1", &Actor::new("alice")).expect("close");

        let admin = Actor::new("root").with_role(ADMINISTRATOR_ROLE);
        for actor in [Actor::new("alice"), Actor::new("bob"), admin] {
            assert_eq!(button_state(&store, "T1", &actor), ButtonState::hidden());
        }
    }

    #[test]
    fn missing_ticket_degrades_to_start() {
        let store = store_with(TicketStatus::NotAssigned);
        assert_eq!(
            button_state(&store, "nope", &Actor::new("bob")),
            ButtonState::start()
        );
        assert_eq!(
            assignment_alert(&store, "nope", &Actor::new("bob")),
            AssignmentAlert::none()
        );
    }

    #[test]
    fn alert_shows_only_for_other_non_admin_users() {
        let mut store = store_with(TicketStatus::NotAssigned);
        assert_eq!(
            assignment_alert(&store, "T1", &Actor::new("bob")),
            AssignmentAlert::none()
        );

        start(&mut store, "T1", &Actor::new("alice")).expect("start");
        let alert = assignment_alert(&store, "T1", &Actor::new("bob"));
        assert!(alert.is_shown());
        assert_eq!(alert.message, "Ticket is assigned to Alice Liddell");
        assert_eq!(alert.assignee, "Alice Liddell");

        assert_eq!(
            assignment_alert(&store, "T1", &Actor::new("alice")),
            AssignmentAlert::none()
        );
    }

    #[test]
    fn button_text_key_is_accepted() {
        let state: ButtonState = serde_json::from_str(
            r#"{"show_button": true, "button_text": "Start Ticket", "is_close": false}"#,
        )
        .expect("deserialize");
        assert_eq!(state, ButtonState::start());
    }
}
