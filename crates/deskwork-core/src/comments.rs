//! Ticket comments.

use crate::model::{TicketComment, now_us};
use crate::store::{RecordKind, SqliteStore, StoreError};
use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};

/// Separator between comment bodies in the ticket report.
pub const COMMENT_SEPARATOR: &str = " || ";

/// Append a comment to a ticket.
///
/// # Errors
///
/// Fails on a blank body, an unknown ticket, or a store error.
pub fn add_comment(
    store: &mut SqliteStore,
    ticket_id: &str,
    author: &str,
    body: &str,
) -> Result<TicketComment> {
    let body = body.trim();
    if body.is_empty() {
        bail!("comment body must not be empty");
    }
    let ticket_id = ticket_id.trim();
    let conn = store.connection_mut();
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE ticket_id = ?1)",
            params![ticket_id],
            |row| row.get(0),
        )
        .context("Failed to look up ticket")?;
    if !exists {
        return Err(StoreError::not_found(RecordKind::Ticket, ticket_id).into());
    }

    let created_at_us = now_us();
    conn.execute(
        "INSERT INTO ticket_comments (ticket_id, author, body, created_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![ticket_id, author, body, created_at_us],
    )
    .context("Failed to insert comment")?;

    tracing::info!(ticket = ticket_id, author, "added comment");
    Ok(TicketComment {
        id: conn.last_insert_rowid(),
        ticket_id: ticket_id.to_string(),
        author: author.to_string(),
        body: body.to_string(),
        created_at_us,
    })
}

/// Comments on a ticket, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_comments(conn: &Connection, ticket_id: &str) -> Result<Vec<TicketComment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT comment_id, ticket_id, author, body, created_at_us
         FROM ticket_comments
         WHERE ticket_id = ?1
         ORDER BY created_at_us DESC, comment_id DESC",
    )?;
    let rows = stmt.query_map(params![ticket_id], |row| {
        Ok(TicketComment {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            author: row.get(2)?,
            body: row.get(3)?,
            created_at_us: row.get(4)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read comments")
}

/// Every comment body on a ticket, newest first, joined with
/// [`COMMENT_SEPARATOR`].
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn joined_comments(conn: &Connection, ticket_id: &str) -> Result<String> {
    Ok(list_comments(conn, ticket_id)?
        .into_iter()
        .map(|comment| comment.body)
        .collect::<Vec<_>>()
        .join(COMMENT_SEPARATOR))
}
