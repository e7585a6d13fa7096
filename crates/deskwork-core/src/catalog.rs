//! Support catalogue: the teams tickets are routed to and the products each
//! team looks after.

use crate::error::{ErrorCode, ValidationError};
use crate::model::{Product, Team, now_us};
use crate::store::{RecordKind, SqliteStore, StoreError};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl CatalogError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(err) => err.code(),
            Self::Invalid(err) => err.code(),
        }
    }
}

fn require_name<'a>(field: &'static str, name: &'a str) -> Result<&'a str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::new(field, format!("{field} name must not be empty")));
    }
    Ok(name)
}

/// All teams, by name. A failed query is logged and yields an empty list.
pub fn list_teams(store: &SqliteStore) -> Vec<Team> {
    match query_teams(store.connection()) {
        Ok(teams) => teams,
        Err(err) => {
            tracing::warn!(error = %err, "listing teams failed");
            Vec::new()
        }
    }
}

fn query_teams(conn: &Connection) -> Result<Vec<Team>, StoreError> {
    let mut stmt = conn.prepare("SELECT name, created_at_us FROM teams ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Team {
            name: row.get(0)?,
            created_at_us: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_team(conn: &Connection, name: &str) -> Result<Option<Team>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT name, created_at_us FROM teams WHERE name = ?1",
            params![name],
            |row| {
                Ok(Team {
                    name: row.get(0)?,
                    created_at_us: row.get(1)?,
                })
            },
        )
        .optional()?)
}

/// Register a team. Adding an existing team returns it unchanged.
///
/// # Errors
///
/// Returns a validation error for a blank name, or a store error.
pub fn add_team(store: &mut SqliteStore, name: &str) -> Result<Team, CatalogError> {
    let name = require_name("team", name)?;
    let conn = store.connection_mut();
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO teams (name, created_at_us) VALUES (?1, ?2)",
            params![name, now_us()],
        )
        .map_err(StoreError::from)?;
    if inserted > 0 {
        tracing::info!(team = name, "added team");
    }
    load_team(conn, name)?
        .ok_or_else(|| StoreError::not_found(RecordKind::Team, name).into())
}

/// One product with the team responsible for it.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown product.
pub fn product_details(store: &SqliteStore, name: &str) -> Result<Product, StoreError> {
    let name = name.trim();
    store
        .connection()
        .query_row(
            "SELECT name, description, team, modified_at_us FROM products WHERE name = ?1",
            params![name],
            |row| {
                Ok(Product {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    team: row.get(2)?,
                    modified_at_us: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(RecordKind::Product, name))
}

/// Create or replace a product. Its team, when set, must already exist.
///
/// # Errors
///
/// Returns a validation error for a blank name, `NotFound` for an unknown
/// team, or a store error.
pub fn save_product(store: &mut SqliteStore, product: &Product) -> Result<Product, CatalogError> {
    let name = require_name("product", &product.name)?;
    let team = product
        .team
        .as_deref()
        .map(str::trim)
        .filter(|team| !team.is_empty());
    let description = product
        .description
        .as_deref()
        .map(str::trim)
        .filter(|description| !description.is_empty());

    let conn = store.connection_mut();
    if let Some(team) = team {
        load_team(conn, team)?.ok_or_else(|| StoreError::not_found(RecordKind::Team, team))?;
    }
    conn.execute(
        "INSERT INTO products (name, description, team, modified_at_us) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
            description = excluded.description,
            team = excluded.team,
            modified_at_us = excluded.modified_at_us",
        params![name, description, team, now_us()],
    )
    .map_err(StoreError::from)?;

    tracing::info!(product = name, team, "saved product");
    Ok(product_details(store, name)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, team: Option<&str>) -> Product {
        Product {
            name: name.to_string(),
            description: Some("Accounting suite".to_string()),
            team: team.map(str::to_string),
            ..Product::default()
        }
    }

    #[test]
    fn teams_list_by_name_and_add_is_idempotent() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        assert!(list_teams(&store).is_empty());

        add_team(&mut store, "Support L2").expect("add");
        let first = add_team(&mut store, " Billing ").expect("add");
        let again = add_team(&mut store, "Billing").expect("re-add");
        assert_eq!(first, again);

        let names: Vec<String> = list_teams(&store).into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["Billing", "Support L2"]);
    }

    #[test]
    fn blank_team_is_invalid() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let err = add_team(&mut store, "  ").expect_err("invalid");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn product_carries_its_team() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        add_team(&mut store, "Billing").expect("team");

        let saved = save_product(&mut store, &product("Ledger", Some("Billing"))).expect("save");
        assert_eq!(saved.team.as_deref(), Some("Billing"));

        let shown = product_details(&store, " Ledger ").expect("details");
        assert_eq!(shown.description.as_deref(), Some("Accounting suite"));
        assert_eq!(shown.team.as_deref(), Some("Billing"));
    }

    #[test]
    fn resave_replaces_team_and_description() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        add_team(&mut store, "Billing").expect("team");
        save_product(&mut store, &product("Ledger", Some("Billing"))).expect("save");

        let moved = save_product(
            &mut store,
            &Product {
                name: "Ledger".to_string(),
                ..Product::default()
            },
        )
        .expect("resave");
        assert_eq!(moved.team, None);
        assert_eq!(moved.description, None);
    }

    #[test]
    fn unknown_team_is_not_found() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let err =
            save_product(&mut store, &product("Ledger", Some("Nobody"))).expect_err("no team");
        assert!(matches!(
            err,
            CatalogError::Store(StoreError::NotFound {
                kind: RecordKind::Team,
                ..
            })
        ));
        assert!(matches!(
            product_details(&store, "Ledger"),
            Err(StoreError::NotFound { .. })
        ));
    }
}
