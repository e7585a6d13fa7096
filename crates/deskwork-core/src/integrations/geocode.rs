//! Reverse geocoding against a Nominatim-compatible endpoint.

use super::{IntegrationError, map_request_error};
use crate::config::GeocodingConfig;
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "geocoding service";

/// Turns coordinates into a human-readable address.
pub trait ReverseGeocoder {
    /// # Errors
    ///
    /// Returns an error when the service cannot be reached or answers with
    /// nothing usable.
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, IntegrationError>;
}

/// HTTP client for the Nominatim `/reverse` API.
#[derive(Debug)]
pub struct NominatimClient {
    agent: ureq::Agent,
    url: String,
}

impl NominatimClient {
    #[must_use]
    pub fn new(config: &GeocodingConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            url: config.url.clone(),
        }
    }
}

impl ReverseGeocoder for NominatimClient {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, IntegrationError> {
        let response = self
            .agent
            .get(&self.url)
            .query("lat", &latitude.to_string())
            .query("lon", &longitude.to_string())
            .query("format", "json")
            .query("addressdetails", "1")
            .query("zoom", "18")
            .call()
            .map_err(|err| map_request_error(SERVICE, err))?;
        let body: Value = response
            .into_json()
            .map_err(|err| IntegrationError::Decode {
                service: SERVICE,
                detail: err.to_string(),
            })?;
        address_from_response(&body).ok_or_else(|| IntegrationError::Decode {
            service: SERVICE,
            detail: "no address in response".to_string(),
        })
    }
}

fn component<'a>(address: &'a Value, key: &str) -> Option<&'a str> {
    address
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Pick the address out of a reverse-geocoding response: the full
/// `display_name` when present, else up to four address components.
#[must_use]
pub fn address_from_response(body: &Value) -> Option<String> {
    if let Some(name) = body
        .get("display_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        return Some(name.to_string());
    }

    let address = body.get("address")?;
    let parts: Vec<&str> = [
        component(address, "road"),
        component(address, "house_number"),
        component(address, "city_district").or_else(|| component(address, "city")),
        component(address, "state_district"),
        component(address, "state"),
        component(address, "postcode"),
    ]
    .into_iter()
    .flatten()
    .take(4)
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Coordinates formatted as the address of last resort.
#[must_use]
pub fn coordinates_text(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.6}, {longitude:.6}")
}

/// Best-effort address: the geocoder's answer, or the coordinates.
pub fn readable_address(geocoder: &dyn ReverseGeocoder, latitude: f64, longitude: f64) -> String {
    geocoder.reverse(latitude, longitude).unwrap_or_else(|err| {
        tracing::warn!(latitude, longitude, error = %err, "reverse geocoding failed");
        coordinates_text(latitude, longitude)
    })
}
