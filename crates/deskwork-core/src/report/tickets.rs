use super::day_start_us;
use crate::comments::joined_comments;
use crate::store::SqliteStore;
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Serialize;

/// Group label for tickets nobody has been assigned to.
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketReportFilter {
    /// Inclusive, on the creation date (UTC).
    pub from_date: Option<NaiveDate>,
    /// Inclusive, on the creation date (UTC).
    pub to_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub customer: Option<String>,
    /// User id of the most recent assignment, whatever its status.
    pub assigned_to: Option<String>,
    pub team: Option<String>,
    pub group_by_assignee: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketReportLine {
    pub sl_no: usize,
    pub ticket_id: String,
    pub created_at_us: i64,
    pub subject: String,
    pub customer: Option<String>,
    pub phone: Option<String>,
    pub team: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    /// Display name behind the most recent assignment.
    pub assignee: Option<String>,
    pub latest_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketReportRow {
    Header {
        assigned_to: String,
        ticket_count: usize,
    },
    Ticket(TicketReportLine),
}

/// Build the ticket report.
///
/// Rows are ordered by assignee name, then newest first. With
/// `group_by_assignee`, each assignee's rows are preceded by a header row;
/// `sl_no` keeps counting across groups.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn ticket_report(
    store: &SqliteStore,
    filter: &TicketReportFilter,
) -> Result<Vec<TicketReportRow>> {
    let lines = query_lines(store, filter)?;
    if !filter.group_by_assignee {
        return Ok(lines.into_iter().map(TicketReportRow::Ticket).collect());
    }

    let mut groups: Vec<(String, Vec<TicketReportLine>)> = Vec::new();
    for line in lines {
        let key = line.assignee.clone().unwrap_or_else(|| UNASSIGNED.to_string());
        match groups.last_mut() {
            Some((current, members)) if *current == key => members.push(line),
            _ => groups.push((key, vec![line])),
        }
    }

    let mut rows = Vec::new();
    for (assigned_to, members) in groups {
        rows.push(TicketReportRow::Header {
            assigned_to,
            ticket_count: members.len(),
        });
        rows.extend(members.into_iter().map(TicketReportRow::Ticket));
    }
    Ok(rows)
}

const LATEST_ASSIGNEE: &str = "(SELECT COALESCE(NULLIF(TRIM(u.full_name), ''), a.assigned_to) \
     FROM assignments a LEFT JOIN users u ON u.user_id = a.assigned_to \
     WHERE a.reference = t.ticket_id \
     ORDER BY a.created_at_us DESC, a.assignment_id DESC LIMIT 1)";

const LATEST_ASSIGNEE_ID: &str = "(SELECT a.assigned_to FROM assignments a \
     WHERE a.reference = t.ticket_id \
     ORDER BY a.created_at_us DESC, a.assignment_id DESC LIMIT 1)";

fn query_lines(store: &SqliteStore, filter: &TicketReportFilter) -> Result<Vec<TicketReportLine>> {
    let mut sql = format!(
        "SELECT t.ticket_id, t.created_at_us, t.subject, t.customer, t.phone, t.team, \
         t.status, t.priority, {LATEST_ASSIGNEE} AS assignee_name \
         FROM tickets t WHERE 1 = 1"
    );
    let mut values: Vec<Value> = Vec::new();

    if let Some(from) = filter.from_date {
        sql.push_str(" AND t.created_at_us >= ?");
        values.push(Value::Integer(day_start_us(from)));
    }
    if let Some(to) = filter.to_date.and_then(|to| to.checked_add_days(Days::new(1))) {
        sql.push_str(" AND t.created_at_us < ?");
        values.push(Value::Integer(day_start_us(to)));
    }
    for (column, value) in [
        ("t.status", &filter.status),
        ("t.priority", &filter.priority),
        ("t.customer", &filter.customer),
        ("t.team", &filter.team),
    ] {
        if let Some(value) = value {
            sql.push_str(&format!(" AND {column} = ?"));
            values.push(Value::Text(value.clone()));
        }
    }
    if let Some(user) = &filter.assigned_to {
        sql.push_str(&format!(" AND {LATEST_ASSIGNEE_ID} = ?"));
        values.push(Value::Text(user.clone()));
    }
    sql.push_str(" ORDER BY assignee_name ASC, t.created_at_us DESC, t.ticket_id ASC");

    let conn = store.connection();
    let mut stmt = conn.prepare(&sql).context("Failed to prepare ticket report")?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        Ok(TicketReportLine {
            sl_no: 0,
            ticket_id: row.get(0)?,
            created_at_us: row.get(1)?,
            subject: row.get(2)?,
            customer: row.get(3)?,
            phone: row.get(4)?,
            team: row.get(5)?,
            status: row.get(6)?,
            priority: row.get(7)?,
            assignee: row.get(8)?,
            latest_comment: String::new(),
        })
    })?;

    let mut lines = Vec::new();
    for (index, row) in rows.enumerate() {
        let mut line = row.context("Failed to read ticket report row")?;
        line.sl_no = index + 1;
        line.latest_comment = joined_comments(conn, &line.ticket_id)?;
        lines.push(line);
    }
    Ok(lines)
}
