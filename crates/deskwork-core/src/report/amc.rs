use crate::store::SqliteStore;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Serialize;
use std::str::FromStr;

/// Which maintenance contracts to include, relative to today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmcStatus {
    #[default]
    All,
    /// Paid-up date before today.
    Expired,
    /// Paid-up date today or later.
    UpcomingExpiry,
}

impl FromStr for AmcStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "All" => Ok(Self::All),
            "AMC Expired" => Ok(Self::Expired),
            "Upcoming Expiry" => Ok(Self::UpcomingExpiry),
            other => bail!(
                "unknown AMC status '{other}' (expected All, AMC Expired, or Upcoming Expiry)"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmcFilter {
    pub customer: Option<String>,
    pub status: AmcStatus,
    /// English month name. Unknown names are ignored.
    pub expiry_month: Option<String>,
    /// Four-digit year. Unparsable values are ignored.
    pub expiry_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmcRow {
    pub customer_code: Option<String>,
    pub customer_name: String,
    pub amc_end_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub product: Option<String>,
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|month| *month == name.trim())
        .and_then(|index| u32::try_from(index + 1).ok())
}

/// Customers with their AMC end dates, earliest first.
///
/// Month and year filters only narrow the `UpcomingExpiry` view.
///
/// # Errors
///
/// Returns an error if the query fails or a stored date is malformed.
pub fn amc_report(
    store: &SqliteStore,
    filter: &AmcFilter,
    today: NaiveDate,
) -> Result<Vec<AmcRow>> {
    let mut sql = String::from(
        "SELECT customer_code, customer_name, amc_last_paid, address1, phone1, product_name \
         FROM customers WHERE 1 = 1",
    );
    let mut values: Vec<Value> = Vec::new();
    let today = today.format("%Y-%m-%d").to_string();

    if let Some(customer) = &filter.customer {
        sql.push_str(" AND customer_name = ?");
        values.push(Value::Text(customer.clone()));
    }

    if filter.status != AmcStatus::All {
        sql.push_str(" AND amc_last_paid IS NOT NULL AND amc_last_paid <> ''");
    }
    match filter.status {
        AmcStatus::All => {}
        AmcStatus::Expired => {
            sql.push_str(" AND amc_last_paid < ?");
            values.push(Value::Text(today));
        }
        AmcStatus::UpcomingExpiry => {
            sql.push_str(" AND amc_last_paid >= ?");
            values.push(Value::Text(today));

            if let Some(month) = filter.expiry_month.as_deref().and_then(month_number) {
                sql.push_str(" AND CAST(strftime('%m', amc_last_paid) AS INTEGER) = ?");
                values.push(Value::Integer(i64::from(month)));
            }
            if let Some(year) = filter
                .expiry_year
                .as_deref()
                .and_then(|raw| raw.trim().parse::<i64>().ok())
            {
                sql.push_str(" AND CAST(strftime('%Y', amc_last_paid) AS INTEGER) = ?");
                values.push(Value::Integer(year));
            }
        }
    }
    sql.push_str(" ORDER BY amc_last_paid ASC, customer_name ASC");

    let conn = store.connection();
    let mut stmt = conn.prepare(&sql).context("Failed to prepare AMC report")?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        Ok((
            row.get::<_, Option<String>>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut report = Vec::new();
    for row in rows {
        let (customer_code, customer_name, amc, address, phone, product) = row?;
        let amc_end_date = match amc.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .with_context(|| format!("Invalid AMC date '{raw}' for {customer_name}"))?,
            ),
            None => None,
        };
        report.push(AmcRow {
            customer_code,
            customer_name,
            amc_end_date,
            address,
            phone,
            product,
        });
    }
    Ok(report)
}
