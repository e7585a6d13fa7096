//! Customer master data: search, details, and saves that mirror the
//! customer's code and product onto its tickets.

pub mod alert;

pub use alert::{customer_alert, upsert_customer_alert};

use crate::error::{ErrorCode, ValidationError};
use crate::model::{Customer, now_us};
use crate::store::{RecordKind, SqliteStore, StoreError};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};

/// Upper bound on search results.
pub const SEARCH_LIMIT: usize = 20;

const CUSTOMER_COLUMNS: &str = "name, customer_name, customer_code, sl_no, product_name, \
     address1, address2, place, district, state, country, contact_person, phone1, phone2, \
     gst_no, email, license_count, amc_last_paid, modified_at_us";

const SEARCH_HAYSTACK: &str = "(IFNULL(customer_code, '') || ' ' || customer_name || ' ' || \
     IFNULL(address1, '') || ' ' || IFNULL(address2, '') || ' ' || IFNULL(place, '') || ' ' || \
     IFNULL(phone1, '') || ' ' || IFNULL(phone2, ''))";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl CustomerError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(err) => err.code(),
            Self::Invalid(err) => err.code(),
        }
    }
}

pub(crate) fn require_customer_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::new(
            "customer",
            "customer name must not be empty",
        ));
    }
    Ok(name)
}

/// Find customers whose code, name, addresses, place, or phone numbers
/// contain every whitespace-separated word of `term`, ignoring ASCII case.
///
/// Returns at most [`SEARCH_LIMIT`] customers, most recently modified
/// first. A blank term or a failed query yields an empty list.
#[must_use]
pub fn search_customers(store: &SqliteStore, term: &str) -> Vec<Customer> {
    let words: Vec<&str> = term.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    match query_search(store.connection(), &words) {
        Ok(customers) => customers,
        Err(err) => {
            tracing::warn!(term, error = %err, "customer search failed");
            Vec::new()
        }
    }
}

fn query_search(conn: &Connection, words: &[&str]) -> Result<Vec<Customer>, StoreError> {
    let mut sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE 1 = 1");
    let mut values = Vec::with_capacity(words.len());
    for word in words {
        sql.push_str(&format!(" AND {SEARCH_HAYSTACK} LIKE ? ESCAPE '\\'"));
        values.push(Value::Text(format!("%{}%", escape_like(word))));
    }
    sql.push_str(&format!(
        " ORDER BY modified_at_us DESC, name ASC LIMIT {SEARCH_LIMIT}"
    ));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), raw_customer_from_row)?;
    let mut customers = Vec::new();
    for row in rows {
        customers.push(row?.into_customer()?);
    }
    Ok(customers)
}

fn escape_like(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for ch in word.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Full record of one customer.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown name.
pub fn customer_details(store: &SqliteStore, name: &str) -> Result<Customer, StoreError> {
    load_customer(store.connection(), name.trim())?
        .ok_or_else(|| StoreError::not_found(RecordKind::Customer, name.trim()))
}

pub(crate) fn load_customer(
    conn: &Connection,
    name: &str,
) -> Result<Option<Customer>, StoreError> {
    conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name = ?1"),
        params![name],
        raw_customer_from_row,
    )
    .optional()?
    .map(RawCustomer::into_customer)
    .transpose()
}

/// Create or replace a customer, then mirror its code and product onto
/// every ticket raised by it. Returns the number of tickets updated.
///
/// # Errors
///
/// Returns a validation error for a blank name, or a store error; nothing
/// is written in either case.
pub fn save_customer(store: &mut SqliteStore, customer: &Customer) -> Result<usize, CustomerError> {
    let name = require_customer_name(&customer.name)?;
    let display = if customer.customer_name.trim().is_empty() {
        name
    } else {
        customer.customer_name.trim()
    };
    Ok(write_customer(store, name, display, customer)?)
}

fn write_customer(
    store: &mut SqliteStore,
    name: &str,
    display: &str,
    customer: &Customer,
) -> Result<usize, StoreError> {
    let now = now_us();
    let tx = store
        .connection_mut()
        .transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        &format!(
            "INSERT OR REPLACE INTO customers ({CUSTOMER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            name,
            display,
            customer.customer_code,
            customer.sl_no,
            customer.product_name,
            customer.address1,
            customer.address2,
            customer.place,
            customer.district,
            customer.state,
            customer.country,
            customer.contact_person,
            customer.phone1,
            customer.phone2,
            customer.gst_no,
            customer.email,
            customer.license_count,
            customer.amc_last_paid.map(|date| date.format("%Y-%m-%d").to_string()),
            now,
        ],
    )?;
    let synced = tx.execute(
        "UPDATE tickets SET customer_code = ?1, product = ?2, updated_at_us = ?3
         WHERE customer = ?4",
        params![
            customer.customer_code.as_deref().unwrap_or_default(),
            customer.product_name.as_deref().unwrap_or_default(),
            now,
            name,
        ],
    )?;
    tx.commit()?;

    tracing::info!(customer = name, synced, "saved customer");
    Ok(synced)
}

struct RawCustomer {
    customer: Customer,
    amc_last_paid: Option<String>,
}

impl RawCustomer {
    fn into_customer(self) -> Result<Customer, StoreError> {
        let mut customer = self.customer;
        if let Some(raw) = self.amc_last_paid.filter(|raw| !raw.trim().is_empty()) {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
                StoreError::Corrupt {
                    kind: RecordKind::Customer,
                    id: customer.name.clone(),
                    reason: format!("amc_last_paid '{raw}': {err}"),
                }
            })?;
            customer.amc_last_paid = Some(date);
        }
        Ok(customer)
    }
}

fn raw_customer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCustomer> {
    Ok(RawCustomer {
        customer: Customer {
            name: row.get(0)?,
            customer_name: row.get(1)?,
            customer_code: row.get(2)?,
            sl_no: row.get(3)?,
            product_name: row.get(4)?,
            address1: row.get(5)?,
            address2: row.get(6)?,
            place: row.get(7)?,
            district: row.get(8)?,
            state: row.get(9)?,
            country: row.get(10)?,
            contact_person: row.get(11)?,
            phone1: row.get(12)?,
            phone2: row.get(13)?,
            gst_no: row.get(14)?,
            email: row.get(15)?,
            license_count: row.get(16)?,
            amc_last_paid: None,
            modified_at_us: row.get(18)?,
        },
        amc_last_paid: row.get(17)?,
    })
}
