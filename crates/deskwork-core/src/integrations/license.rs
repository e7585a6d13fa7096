//! Customer license lookup against the vendor's license service.

use super::{IntegrationError, map_request_error};
use crate::config::LicenseConfig;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

const SERVICE: &str = "license server";

/// License and subscription details for one customer code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseDetails {
    pub customer_code: String,
    pub customer_name: String,
    pub owner_name: String,
    pub address1: String,
    pub address2: String,
    pub contact_person: String,
    pub phone1: String,
    pub phone2: String,
    pub email: String,
    pub nature_of_business: String,
    pub license_type: String,
    pub subscription_exp_date: String,
    pub subscription_remarks: String,
    pub amc_start_date: String,
    pub amc_end_date: String,
}

#[derive(Debug)]
pub struct LicenseClient {
    agent: ureq::Agent,
    url: Option<String>,
    api_key: Option<String>,
}

impl LicenseClient {
    #[must_use]
    pub fn new(config: &LicenseConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Look up the license for `customer_code`.
    ///
    /// # Errors
    ///
    /// Each failure mode has its own variant: missing configuration,
    /// timeout, connection failure, non-200 status, an `Error` reported by
    /// the service, an empty `Result`, or an unreadable body.
    pub fn lookup(&self, customer_code: &str) -> Result<LicenseDetails, IntegrationError> {
        let customer_code = customer_code.trim();
        if customer_code.is_empty() {
            return Err(ValidationError::new("customer_code", "Customer code is required").into());
        }
        let url = self
            .url
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("license service URL"))?;

        tracing::info!(customer_code, "fetching license details");
        let mut request = self
            .agent
            .post(url)
            .set("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.set("X-API-Key", key);
        }

        let response = request
            .send_json(serde_json::json!({ "customer_code": customer_code }))
            .map_err(|err| {
                let err = map_request_error(SERVICE, err);
                tracing::error!(customer_code, error = %err, "license lookup failed");
                err
            })?;
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|err| IntegrationError::Decode {
                service: SERVICE,
                detail: err.to_string(),
            })?;
        tracing::debug!(status, "license service responded");
        parse_response(status, &body, customer_code)
    }
}

/// Interpret a license service response.
///
/// # Errors
///
/// See [`LicenseClient::lookup`].
pub fn parse_response(
    status: u16,
    body: &str,
    customer_code: &str,
) -> Result<LicenseDetails, IntegrationError> {
    if status != 200 {
        return Err(IntegrationError::Status(status));
    }
    let payload: Value = serde_json::from_str(body).map_err(|err| IntegrationError::Decode {
        service: SERVICE,
        detail: err.to_string(),
    })?;

    if let Some(error) = payload.get("Error").filter(|error| is_truthy(error)) {
        return Err(IntegrationError::Remote(text(error)));
    }
    let result = match payload.get("Result") {
        Some(Value::Object(result)) if !result.is_empty() => result,
        _ => return Err(IntegrationError::NoData(customer_code.to_string())),
    };

    let field = |key: &str| result.get(key).map(text).unwrap_or_default().trim().to_string();
    let code = field("CustomerCode");
    Ok(LicenseDetails {
        customer_code: if code.is_empty() {
            customer_code.to_string()
        } else {
            code
        },
        customer_name: field("CustomerName"),
        owner_name: field("OwnerName"),
        address1: field("Address1"),
        // The service spells this key without the second "d".
        address2: field("Adress2"),
        contact_person: field("ContactPerson"),
        phone1: field("Phone1"),
        phone2: field("Phone2"),
        email: field("EmailID"),
        nature_of_business: field("NatureOfBusiness"),
        license_type: field("LicenseType"),
        subscription_exp_date: field("SubscriptionExpDate"),
        subscription_remarks: field("SubscriptionRemarks"),
        amc_start_date: field("AMCStartDate"),
        amc_end_date: field("AMCEndDate"),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !Map::is_empty(map),
        Value::Number(_) => true,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
