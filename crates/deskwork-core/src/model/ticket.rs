use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt, str::FromStr};

/// Ticket status.
///
/// The helpdesk defines the status vocabulary, so the set is open: the
/// statuses the assignment workflow branches on get their own variants and
/// everything else is carried verbatim in [`TicketStatus::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TicketStatus {
    #[default]
    NotAssigned,
    Other,
    InProgress,
    Closed,
    Custom(String),
}

impl TicketStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotAssigned => "Not Assigned",
            Self::Other => "Other",
            Self::InProgress => "In Progress",
            Self::Closed => "Closed",
            Self::Custom(raw) => raw,
        }
    }

    /// Statuses in which nobody is expected to be working the ticket.
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        matches!(self, Self::NotAssigned | Self::Other)
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl FromStr for TicketStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "Not Assigned" => Self::NotAssigned,
            "Other" => Self::Other,
            "In Progress" => Self::InProgress,
            "Closed" => Self::Closed,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl From<&str> for TicketStatus {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TicketStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TicketStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// A helpdesk ticket as stored in the `tickets` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: Option<String>,
    pub team: Option<String>,
    pub customer: Option<String>,
    pub customer_code: Option<String>,
    pub product: Option<String>,
    pub phone: Option<String>,
    /// Cached assignee list, kept equal to the holders of Open assignments.
    pub assignees: Vec<String>,
    pub start_time_us: Option<i64>,
    pub closed_at_us: Option<i64>,
    pub location: Option<TicketLocation>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Where an agent was when they started working a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// GeoJSON `FeatureCollection` with a single point feature.
    pub geojson: String,
    pub address: String,
}

/// Fields accepted when creating a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTicket {
    /// Explicit ticket id; generated as `TKT-#####` when absent.
    pub id: Option<String>,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: Option<String>,
    pub team: Option<String>,
    pub customer: Option<String>,
    pub phone: Option<String>,
    /// Creation timestamp override; defaults to now.
    pub created_at_us: Option<i64>,
}

/// Partial ticket update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub start_time_us: Option<i64>,
    pub closed_at_us: Option<i64>,
    pub assignees: Option<Vec<String>>,
    pub customer_code: Option<String>,
    pub product: Option<String>,
    pub location: Option<TicketLocation>,
}

/// A comment left on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketComment {
    pub id: i64,
    pub ticket_id: String,
    pub author: String,
    pub body: String,
    pub created_at_us: i64,
}
