use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A helpdesk customer (the organisation raising tickets).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub name: String,
    pub customer_name: String,
    pub customer_code: Option<String>,
    pub sl_no: Option<String>,
    pub product_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub place: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub contact_person: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub gst_no: Option<String>,
    pub email: Option<String>,
    pub license_count: Option<i64>,
    /// Date the annual maintenance contract was last paid up to.
    pub amc_last_paid: Option<NaiveDate>,
    pub modified_at_us: i64,
}

/// Free-text warning shown to agents whenever they open one of the
/// customer's tickets. At most one per customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAlert {
    pub customer: String,
    pub remarks: String,
    pub updated_at_us: i64,
}
