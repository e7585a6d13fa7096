//! Record types shared by the store, the ticket lifecycle, and reports.

pub mod actor;
pub mod assignment;
pub mod catalog;
pub mod customer;
pub mod ticket;

pub use actor::{ADMINISTRATOR_ROLE, Actor, User};
pub use assignment::{Assignment, AssignmentStatus, NewAssignment};
pub use catalog::{Product, Team};
pub use customer::{Customer, CustomerAlert};
pub use ticket::{NewTicket, Ticket, TicketComment, TicketLocation, TicketStatus, TicketUpdate};

/// Current wall clock as microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
