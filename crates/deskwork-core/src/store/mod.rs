//! Record store boundary used by the ticket lifecycle.
//!
//! Reads that need no lock go through [`RecordStore`]. Anything that mutates
//! assignments or tickets runs inside a [`UnitOfWork`]: opening one takes the
//! exclusive write lock, every write inside it lands atomically on
//! [`UnitOfWork::commit`], and dropping it uncommitted rolls everything back
//! and releases the lock.

pub mod sqlite;

pub use sqlite::{SqliteStore, TicketFilter};

use crate::error::ErrorCode;
use crate::model::{Assignment, AssignmentStatus, NewAssignment, Ticket, TicketUpdate, User};
use std::fmt;

/// Record types addressed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Ticket,
    Assignment,
    User,
    Customer,
    CustomerAlert,
    Team,
    Product,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ticket => "ticket",
            Self::Assignment => "assignment",
            Self::User => "user",
            Self::Customer => "customer",
            Self::CustomerAlert => "customer alert",
            Self::Team => "team",
            Self::Product => "product",
        })
    }
}

/// Errors returned by record store implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record with the given id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// The acting user may not perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Lock wait timed out or the database was locked by another writer.
    #[error("record store busy: {0}")]
    Busy(String),

    /// A backend-specific failure (I/O, constraint, connection).
    #[error("record store backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("corrupt {kind} record {id}: {reason}")]
    Corrupt {
        kind: RecordKind,
        id: String,
        reason: String,
    },
}

impl StoreError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound {
                kind: RecordKind::Ticket,
                ..
            } => ErrorCode::TicketNotFound,
            Self::NotFound { .. } => ErrorCode::RecordNotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Busy(_) => ErrorCode::StoreBusy,
            Self::Backend(_) => ErrorCode::StoreFailure,
            Self::Corrupt { .. } => ErrorCode::CorruptRecord,
        }
    }

    /// Lock timeouts and connection trouble; the request failed but the
    /// data is intact.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Backend(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _)
                if matches!(
                    inner.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Self::Busy(err.to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

/// Filter for assignment listings. Set fields combine with AND.
///
/// Results are always ordered newest first: creation timestamp descending,
/// then id descending. The start check, the button projection, and the alert
/// projection all rely on this one ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentFilter {
    pub reference: Option<String>,
    pub status: Option<AssignmentStatus>,
    pub exclude_status: Option<AssignmentStatus>,
    pub assigned_to: Option<String>,
    pub limit: Option<usize>,
}

impl AssignmentFilter {
    /// Open assignments on a ticket.
    pub fn open_for(ticket_id: impl Into<String>) -> Self {
        Self {
            reference: Some(ticket_id.into()),
            status: Some(AssignmentStatus::Open),
            ..Self::default()
        }
    }

    /// The most recently created Open assignment on a ticket.
    pub fn latest_open_for(ticket_id: impl Into<String>) -> Self {
        Self {
            limit: Some(1),
            ..Self::open_for(ticket_id)
        }
    }

    /// Every assignment on a ticket that has not been cancelled.
    pub fn active_for(ticket_id: impl Into<String>) -> Self {
        Self {
            reference: Some(ticket_id.into()),
            exclude_status: Some(AssignmentStatus::Cancelled),
            ..Self::default()
        }
    }
}

/// Lock-free reads plus the entry point for locked units of work.
pub trait RecordStore {
    type Unit<'a>: UnitOfWork
    where
        Self: 'a;

    /// Open a unit of work holding the exclusive write lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Busy`] when the lock cannot be acquired in time.
    fn begin(&mut self) -> Result<Self::Unit<'_>, StoreError>;

    /// Read a ticket without locking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn ticket(&self, id: &str) -> Result<Ticket, StoreError>;

    /// List assignments matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn assignments(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, StoreError>;

    /// Read a registered user with their roles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn user(&self, id: &str) -> Result<User, StoreError>;
}

/// Writes that commit together or not at all.
pub trait UnitOfWork {
    /// Read a ticket under the unit's exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn ticket_for_update(&mut self, id: &str) -> Result<Ticket, StoreError>;

    /// List assignments matching `filter`, newest first, seeing this unit's
    /// own uncommitted writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn assignments(&mut self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, StoreError>;

    /// Insert an Open assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. unknown ticket).
    fn create_assignment(&mut self, new: NewAssignment) -> Result<Assignment, StoreError>;

    /// Change the status of an assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown assignment id.
    fn set_assignment_status(&mut self, id: i64, status: AssignmentStatus)
    -> Result<(), StoreError>;

    /// Apply a partial update to a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown ticket id.
    fn update_ticket(&mut self, id: &str, update: &TicketUpdate) -> Result<(), StoreError>;

    /// Flush every pending write atomically and release the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing is persisted then.
    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
