use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle of an assignment. Assignments are cancelled, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Open,
    Cancelled,
}

impl AssignmentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = ParseAssignmentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(Self::Open),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(ParseAssignmentStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid assignment status: '{0}'")]
pub struct ParseAssignmentStatusError(pub String);

/// Links a ticket to the user responsible for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Monotonic store-assigned id; doubles as the tie-break for equal
    /// creation timestamps.
    pub id: i64,
    /// Ticket id this assignment refers to.
    pub reference: String,
    pub assigned_to: String,
    pub status: AssignmentStatus,
    pub description: Option<String>,
    pub created_at_us: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub reference: String,
    pub assigned_to: String,
    pub description: Option<String>,
    pub created_at_us: i64,
}
