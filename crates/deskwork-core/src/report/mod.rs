//! Tabular reports over tickets and customers.

pub mod amc;
pub mod tickets;

pub use amc::{AmcFilter, AmcRow, AmcStatus, amc_report};
pub use tickets::{TicketReportFilter, TicketReportLine, TicketReportRow, ticket_report};

use chrono::NaiveDate;

/// Microseconds at UTC midnight starting `date`.
pub(crate) fn day_start_us(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .timestamp_micros()
}
