//! Capture of the agent's position when they start work on a ticket.

use crate::integrations::geocode::{ReverseGeocoder, readable_address};
use crate::lifecycle::require_ticket_id;
use crate::model::{TicketLocation, TicketUpdate, now_us};
use crate::store::{RecordStore, StoreError, UnitOfWork};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload returned to the UI. `message` is set on success, `error` on
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl CaptureResult {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            address: None,
            latitude: None,
            longitude: None,
        }
    }
}

/// GeoJSON `FeatureCollection` holding one point at the agent's position.
#[must_use]
pub fn location_geojson(latitude: f64, longitude: f64, agent: &str, at_us: i64) -> String {
    let timestamp = DateTime::<Utc>::from_timestamp_micros(at_us)
        .map(|at| at.to_rfc3339())
        .unwrap_or_default();
    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [longitude, latitude] },
            "properties": {
                "title": "Agent Start Location",
                "agent": agent,
                "timestamp": timestamp,
            }
        }]
    })
    .to_string()
}

fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Store `agent`'s position and its address on the ticket. Never fails;
/// problems are reported in the payload.
pub fn capture<S: RecordStore>(
    store: &mut S,
    geocoder: &dyn ReverseGeocoder,
    ticket_id: &str,
    latitude: f64,
    longitude: f64,
    agent: &str,
) -> CaptureResult {
    let ticket_id = match require_ticket_id(ticket_id) {
        Ok(id) => id,
        Err(_) => return CaptureResult::failed("Ticket name required"),
    };
    if !valid_coordinates(latitude, longitude) {
        return CaptureResult::failed("Latitude and longitude required");
    }

    let address = readable_address(geocoder, latitude, longitude);
    let location = TicketLocation {
        latitude,
        longitude,
        geojson: location_geojson(latitude, longitude, agent, now_us()),
        address: address.clone(),
    };

    match save_location(store, ticket_id, location) {
        Ok(()) => {
            tracing::info!(ticket = ticket_id, agent, "captured agent location");
            CaptureResult {
                success: true,
                message: Some("Location saved".to_string()),
                error: None,
                address: Some(address),
                latitude: Some(latitude),
                longitude: Some(longitude),
            }
        }
        Err(err) => {
            tracing::error!(ticket = ticket_id, error = %err, "location capture failed");
            CaptureResult::failed(err.to_string())
        }
    }
}

fn save_location<S: RecordStore>(
    store: &mut S,
    ticket_id: &str,
    location: TicketLocation,
) -> Result<(), StoreError> {
    let mut unit = store.begin()?;
    unit.ticket_for_update(ticket_id)?;
    unit.update_ticket(
        ticket_id,
        &TicketUpdate {
            location: Some(location),
            ..TicketUpdate::default()
        },
    )?;
    unit.commit()
}
