//! Collaborators the engine calls out to: the device location provider, the
//! reverse geocoder and the notification sink.
//!
//! The engine only depends on the traits. `NominatimGeocoder` and
//! `LogNotifier` are the implementations the binary wires in.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::models::Coordinate;

/// Placeholder shown when no address can be resolved.
pub const UNKNOWN_ADDRESS: &str = "Adresse inconnue";

/// Source of the device position.
#[async_trait]
pub trait LocationProvider: Send + Sync + 'static {
    /// Fails with `PermissionDenied` or `LocationUnavailable`.
    async fn current_location(&self) -> Result<Coordinate, QueueError>;
}

/// Maps a coordinate to a human-readable place name.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + 'static {
    async fn reverse_geocode(&self, at: &Coordinate) -> Result<String, QueueError>;
}

/// Destination of user-facing notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn notify(&self, title: &str, message: &str) -> Result<(), QueueError>;
}

/// Reverse geocodes `at`, substituting [`UNKNOWN_ADDRESS`] for any failure.
pub async fn resolve_address(geocoder: &dyn ReverseGeocoder, at: &Coordinate) -> String {
    match geocoder.reverse_geocode(at).await {
        Ok(address) if !address.trim().is_empty() => address,
        Ok(_) => {
            log::debug!("Empty address for ({}), using placeholder", at);
            UNKNOWN_ADDRESS.to_string()
        }
        Err(e) => {
            log::warn!("Reverse geocoding of ({}) failed: {}", at, e);
            UNKNOWN_ADDRESS.to_string()
        }
    }
}

/// Address fields tried in order, most specific first.
const PLACE_FIELDS: [&str; 5] = ["neighbourhood", "suburb", "village", "town", "city"];

/// Extracts the place name from a Nominatim reverse response.
pub fn place_name(response: &Value) -> Option<String> {
    let from_address = response.get("address").and_then(|address| {
        PLACE_FIELDS
            .iter()
            .filter_map(|field| address.get(*field).and_then(Value::as_str))
            .find(|name| !name.trim().is_empty())
    });

    from_address
        .or_else(|| response.get("display_name").and_then(Value::as_str))
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
}

/// Reverse geocoder backed by a Nominatim-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &QueueConfig) -> Result<Self, QueueError> {
        let client = reqwest::Client::builder()
            .timeout(config.geocoder_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QueueError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.geocoder_url.clone(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, at: &Coordinate) -> Result<String, QueueError> {
        log::debug!("Reverse geocoding ({}) via {}", at, self.base_url);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("zoom", "16".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| QueueError::GeocodeFailure(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| QueueError::GeocodeFailure(format!("malformed response: {}", e)))?;

        place_name(&body).ok_or_else(|| QueueError::GeocodeFailure("no place name in response".to_string()))
    }
}

/// Notification sink that writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), QueueError> {
        log::info!("Notification: {} - {}", title, message);
        Ok(())
    }
}
