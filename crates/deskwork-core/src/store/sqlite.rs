//! SQLite-backed record store.
//!
//! SQLite has no row locks. [`SqliteStore::begin`] opens a
//! `BEGIN IMMEDIATE` transaction instead, which takes the database's
//! reserved write lock up front. Every unit of work is therefore totally
//! ordered against every other, which is at least as strong as the per-ticket
//! lock the lifecycle needs. Contenders wait up to the connection's busy
//! timeout, then fail with [`StoreError::Busy`].

use super::{AssignmentFilter, RecordKind, RecordStore, StoreError, UnitOfWork};
use crate::db;
use crate::model::{
    Assignment, AssignmentStatus, NewAssignment, NewTicket, Ticket, TicketLocation, TicketStatus,
    TicketUpdate, User, now_us,
};
use rusqlite::types::Value;
use rusqlite::{
    Connection, OptionalExtension, Transaction, TransactionBehavior, params, params_from_iter,
};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;

const TICKET_COLUMNS: &str = "ticket_id, subject, status, priority, team, customer, \
     customer_code, product, phone, start_time_us, closed_at_us, latitude, longitude, \
     location_geojson, location_text, created_at_us, updated_at_us";

/// Filter for ticket listings. Set fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub assignee: Option<String>,
    pub customer: Option<String>,
    pub limit: Option<usize>,
}

/// Record store over a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, busy_timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_database(path, busy_timeout)?,
        })
    }

    /// Open a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Register a user, or merge the name and roles into an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn add_user(
        &mut self,
        id: &str,
        full_name: Option<&str>,
        roles: &[String],
    ) -> Result<User, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO users (user_id, full_name, created_at_us) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                full_name = COALESCE(excluded.full_name, users.full_name)",
            params![id, full_name, now_us()],
        )?;
        for role in roles {
            tx.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
                params![id, role],
            )?;
        }
        let user = load_user(&tx, id)?;
        tx.commit()?;
        tracing::info!(user = id, "registered user");
        Ok(user)
    }

    /// Create a ticket. Customer code and product are mirrored from the
    /// customer record when one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken or the write fails.
    pub fn create_ticket(&mut self, new: &NewTicket) -> Result<Ticket, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = match &new.id {
            Some(id) => id.trim().to_string(),
            None => next_ticket_id(&tx)?,
        };
        let now = now_us();
        tx.execute(
            "INSERT INTO tickets (
                ticket_id, subject, status, priority, team, customer, phone,
                created_at_us, updated_at_us
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                new.subject,
                new.status.as_str(),
                new.priority,
                new.team,
                new.customer,
                new.phone,
                new.created_at_us.unwrap_or(now),
                now,
            ],
        )?;
        tx.execute(
            "UPDATE tickets SET
                customer_code = (SELECT customer_code FROM customers WHERE name = tickets.customer),
                product = (SELECT product_name FROM customers WHERE name = tickets.customer)
             WHERE ticket_id = ?1
               AND EXISTS (SELECT 1 FROM customers WHERE name = tickets.customer)",
            params![id],
        )?;
        let ticket = load_ticket(&tx, &id)?;
        tx.commit()?;
        tracing::info!(ticket = %ticket.id, status = %ticket.status, "created ticket");
        Ok(ticket)
    }

    /// List tickets, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let mut sql = format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE 1 = 1");
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = &filter.status {
            sql.push_str(" AND t.status = ?");
            values.push(Value::Text(status.to_string()));
        }
        if let Some(assignee) = &filter.assignee {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM ticket_assignees a \
                 WHERE a.ticket_id = t.ticket_id AND a.user_id = ?)",
            );
            values.push(Value::Text(assignee.clone()));
        }
        if let Some(customer) = &filter.customer {
            sql.push_str(" AND t.customer = ?");
            values.push(Value::Text(customer.clone()));
        }
        sql.push_str(" ORDER BY t.created_at_us DESC, t.ticket_id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), ticket_from_row)?;
        let mut tickets = Vec::new();
        for row in rows {
            let mut ticket = row?;
            ticket.assignees = load_assignees(&self.conn, &ticket.id)?;
            tickets.push(ticket);
        }
        Ok(tickets)
    }
}

impl RecordStore for SqliteStore {
    type Unit<'a> = SqliteUnit<'a>;

    fn begin(&mut self) -> Result<Self::Unit<'_>, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tracing::trace!("acquired store write lock");
        Ok(SqliteUnit { tx })
    }

    fn ticket(&self, id: &str) -> Result<Ticket, StoreError> {
        load_ticket(&self.conn, id)
    }

    fn assignments(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, StoreError> {
        query_assignments(&self.conn, filter)
    }

    fn user(&self, id: &str) -> Result<User, StoreError> {
        load_user(&self.conn, id)
    }
}

/// An open `BEGIN IMMEDIATE` transaction. Rolls back on drop.
#[derive(Debug)]
pub struct SqliteUnit<'a> {
    tx: Transaction<'a>,
}

impl UnitOfWork for SqliteUnit<'_> {
    fn ticket_for_update(&mut self, id: &str) -> Result<Ticket, StoreError> {
        load_ticket(&self.tx, id)
    }

    fn assignments(&mut self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, StoreError> {
        query_assignments(&self.tx, filter)
    }

    fn create_assignment(&mut self, new: NewAssignment) -> Result<Assignment, StoreError> {
        self.tx.execute(
            "INSERT INTO assignments (reference, assigned_to, status, description, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.reference,
                new.assigned_to,
                AssignmentStatus::Open.as_str(),
                new.description,
                new.created_at_us,
            ],
        )?;
        Ok(Assignment {
            id: self.tx.last_insert_rowid(),
            reference: new.reference,
            assigned_to: new.assigned_to,
            status: AssignmentStatus::Open,
            description: new.description,
            created_at_us: new.created_at_us,
        })
    }

    fn set_assignment_status(
        &mut self,
        id: i64,
        status: AssignmentStatus,
    ) -> Result<(), StoreError> {
        let changed = self.tx.execute(
            "UPDATE assignments SET status = ?1 WHERE assignment_id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(
                RecordKind::Assignment,
                id.to_string(),
            ));
        }
        Ok(())
    }

    fn update_ticket(&mut self, id: &str, update: &TicketUpdate) -> Result<(), StoreError> {
        apply_ticket_update(&self.tx, id, update)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        tracing::trace!("committed unit of work");
        Ok(())
    }
}

fn next_ticket_id(conn: &Connection) -> Result<String, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?;
    let mut n = count + 1;
    loop {
        let candidate = format!("TKT-{n:05}");
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE ticket_id = ?1)",
            params![candidate],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(candidate);
        }
        n += 1;
    }
}

fn ticket_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    let status: String = row.get(2)?;
    let latitude: Option<f64> = row.get(11)?;
    let longitude: Option<f64> = row.get(12)?;
    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(TicketLocation {
            latitude,
            longitude,
            geojson: row.get::<_, Option<String>>(13)?.unwrap_or_default(),
            address: row.get::<_, Option<String>>(14)?.unwrap_or_default(),
        }),
        _ => None,
    };

    Ok(Ticket {
        id: row.get(0)?,
        subject: row.get(1)?,
        status: TicketStatus::from(status.as_str()),
        priority: row.get(3)?,
        team: row.get(4)?,
        customer: row.get(5)?,
        customer_code: row.get(6)?,
        product: row.get(7)?,
        phone: row.get(8)?,
        assignees: Vec::new(),
        start_time_us: row.get(9)?,
        closed_at_us: row.get(10)?,
        location,
        created_at_us: row.get(15)?,
        updated_at_us: row.get(16)?,
    })
}

fn load_ticket(conn: &Connection, id: &str) -> Result<Ticket, StoreError> {
    let mut ticket = conn
        .query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1"),
            params![id],
            ticket_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(RecordKind::Ticket, id))?;
    ticket.assignees = load_assignees(conn, id)?;
    Ok(ticket)
}

fn load_assignees(conn: &Connection, ticket_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id FROM ticket_assignees WHERE ticket_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![ticket_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn replace_assignees(
    conn: &Connection,
    ticket_id: &str,
    assignees: &[String],
) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM ticket_assignees WHERE ticket_id = ?1",
        params![ticket_id],
    )?;
    let mut seen = HashSet::new();
    let mut position = 0_i64;
    for user in assignees {
        let user = user.trim();
        if user.is_empty() || !seen.insert(user) {
            continue;
        }
        conn.execute(
            "INSERT INTO ticket_assignees (ticket_id, user_id, position) VALUES (?1, ?2, ?3)",
            params![ticket_id, user, position],
        )?;
        position += 1;
    }
    Ok(())
}

fn apply_ticket_update(
    conn: &Connection,
    id: &str,
    update: &TicketUpdate,
) -> Result<(), StoreError> {
    let mut sets = vec!["updated_at_us = ?"];
    let mut values = vec![Value::Integer(now_us())];

    if let Some(status) = &update.status {
        sets.push("status = ?");
        values.push(Value::Text(status.to_string()));
    }
    if let Some(start) = update.start_time_us {
        sets.push("start_time_us = ?");
        values.push(Value::Integer(start));
    }
    if let Some(closed) = update.closed_at_us {
        sets.push("closed_at_us = ?");
        values.push(Value::Integer(closed));
    }
    if let Some(code) = &update.customer_code {
        sets.push("customer_code = ?");
        values.push(Value::Text(code.clone()));
    }
    if let Some(product) = &update.product {
        sets.push("product = ?");
        values.push(Value::Text(product.clone()));
    }
    if let Some(location) = &update.location {
        sets.extend([
            "latitude = ?",
            "longitude = ?",
            "location_geojson = ?",
            "location_text = ?",
        ]);
        values.extend([
            Value::Real(location.latitude),
            Value::Real(location.longitude),
            Value::Text(location.geojson.clone()),
            Value::Text(location.address.clone()),
        ]);
    }
    values.push(Value::Text(id.to_string()));

    let sql = format!("UPDATE tickets SET {} WHERE ticket_id = ?", sets.join(", "));
    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(StoreError::not_found(RecordKind::Ticket, id));
    }

    if let Some(assignees) = &update.assignees {
        replace_assignees(conn, id, assignees)?;
    }
    Ok(())
}

fn query_assignments(
    conn: &Connection,
    filter: &AssignmentFilter,
) -> Result<Vec<Assignment>, StoreError> {
    let mut sql = String::from(
        "SELECT assignment_id, reference, assigned_to, status, description, created_at_us \
         FROM assignments WHERE 1 = 1",
    );
    let mut values: Vec<Value> = Vec::new();

    if let Some(reference) = &filter.reference {
        sql.push_str(" AND reference = ?");
        values.push(Value::Text(reference.clone()));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(status) = filter.exclude_status {
        sql.push_str(" AND status <> ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(user) = &filter.assigned_to {
        sql.push_str(" AND assigned_to = ?");
        values.push(Value::Text(user.clone()));
    }
    sql.push_str(" ORDER BY created_at_us DESC, assignment_id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    let mut assignments = Vec::new();
    for row in rows {
        let (id, reference, assigned_to, status, description, created_at_us) = row?;
        let status = status
            .parse::<AssignmentStatus>()
            .map_err(|err| StoreError::Corrupt {
                kind: RecordKind::Assignment,
                id: id.to_string(),
                reason: err.to_string(),
            })?;
        assignments.push(Assignment {
            id,
            reference,
            assigned_to,
            status,
            description,
            created_at_us,
        });
    }
    Ok(assignments)
}

fn load_user(conn: &Connection, id: &str) -> Result<User, StoreError> {
    let full_name: Option<String> = conn
        .query_row(
            "SELECT full_name FROM users WHERE user_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(RecordKind::User, id))?;

    let mut stmt = conn.prepare_cached("SELECT role FROM user_roles WHERE user_id = ?1")?;
    let roles = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;

    Ok(User {
        id: id.to_string(),
        full_name,
        roles,
    })
}
