use std::fmt;

/// Machine-readable error codes for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    TicketNotFound,
    RecordNotFound,
    PermissionDenied,
    InvalidInput,
    AlreadyAssigned,
    TicketClosed,
    StoreBusy,
    StoreFailure,
    CorruptRecord,
    RemoteTimeout,
    RemoteUnavailable,
    RemoteRejected,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::TicketNotFound => "E2001",
            Self::RecordNotFound => "E2002",
            Self::PermissionDenied => "E2003",
            Self::InvalidInput => "E2004",
            Self::AlreadyAssigned => "E2005",
            Self::TicketClosed => "E2006",
            Self::StoreBusy => "E5001",
            Self::StoreFailure => "E5002",
            Self::CorruptRecord => "E5003",
            Self::RemoteTimeout => "E6001",
            Self::RemoteUnavailable => "E6002",
            Self::RemoteRejected => "E6003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::TicketNotFound => "Ticket not found",
            Self::RecordNotFound => "Record not found",
            Self::PermissionDenied => "Permission denied",
            Self::InvalidInput => "Invalid input",
            Self::AlreadyAssigned => "Ticket already assigned",
            Self::TicketClosed => "Ticket is closed",
            Self::StoreBusy => "Record store busy",
            Self::StoreFailure => "Record store failure",
            Self::CorruptRecord => "Corrupt record",
            Self::RemoteTimeout => "Remote service timed out",
            Self::RemoteUnavailable => "Remote service unavailable",
            Self::RemoteRejected => "Remote service rejected the request",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `dw init` to create a .deskwork/ directory."),
            Self::ConfigParseError => Some("Fix syntax in .deskwork/config.toml and retry."),
            Self::TicketNotFound => Some("Check the ticket ID with `dw ticket list`."),
            Self::RecordNotFound | Self::TicketClosed => None,
            Self::PermissionDenied => {
                Some("Register the user with `dw user add` or ask an administrator.")
            }
            Self::InvalidInput => Some("Check the argument values and retry."),
            Self::AlreadyAssigned => Some("Ask the current assignee or an administrator."),
            Self::StoreBusy => Some("Retry after the other `dw` process finishes its write."),
            Self::StoreFailure => Some("Check disk space and write permissions."),
            Self::CorruptRecord => Some("Inspect .deskwork/deskwork.db for hand edits."),
            Self::RemoteTimeout => Some("Request timeout. Please try again."),
            Self::RemoteUnavailable => Some("Check network connectivity and the configured URL."),
            Self::RemoteRejected => None,
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Rejected user-supplied value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidInput
    }
}
