use super::{CustomerError, require_customer_name};
use crate::model::{CustomerAlert, now_us};
use crate::store::{SqliteStore, StoreError};
use rusqlite::{OptionalExtension, params};

/// The alert recorded for `customer`, if any.
///
/// # Errors
///
/// Returns a validation error for a blank name, or a store error.
pub fn customer_alert(
    store: &SqliteStore,
    customer: &str,
) -> Result<Option<CustomerAlert>, CustomerError> {
    let customer = require_customer_name(customer)?;
    let alert = store
        .connection()
        .query_row(
            "SELECT customer, remarks, updated_at_us FROM customer_alerts WHERE customer = ?1",
            params![customer],
            |row| {
                Ok(CustomerAlert {
                    customer: row.get(0)?,
                    remarks: row.get(1)?,
                    updated_at_us: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)?;
    Ok(alert)
}

/// Create or replace the alert for `customer`.
///
/// # Errors
///
/// Returns a validation error for a blank name, or a store error.
pub fn upsert_customer_alert(
    store: &mut SqliteStore,
    customer: &str,
    remarks: &str,
) -> Result<CustomerAlert, CustomerError> {
    let customer = require_customer_name(customer)?;
    let alert = CustomerAlert {
        customer: customer.to_string(),
        remarks: remarks.trim().to_string(),
        updated_at_us: now_us(),
    };
    store
        .connection_mut()
        .execute(
            "INSERT INTO customer_alerts (customer, remarks, updated_at_us) VALUES (?1, ?2, ?3)
             ON CONFLICT(customer) DO UPDATE SET
                remarks = excluded.remarks,
                updated_at_us = excluded.updated_at_us",
            params![alert.customer, alert.remarks, alert.updated_at_us],
        )
        .map_err(StoreError::from)?;

    tracing::info!(customer, "updated customer alert");
    Ok(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn alert_is_created_then_replaced() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        assert_eq!(customer_alert(&store, "acme").expect("read"), None);

        upsert_customer_alert(&mut store, "acme", "Pending dues").expect("create");
        upsert_customer_alert(&mut store, "acme", "  Call before visiting ").expect("replace");

        let alert = customer_alert(&store, "acme").expect("read").expect("present");
        assert_eq!(alert.remarks, "Call before visiting");
    }

    #[test]
    fn blank_customer_is_invalid() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let err = upsert_customer_alert(&mut store, " ", "x").expect_err("invalid");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(customer_alert(&store, "").is_err());
    }
}
