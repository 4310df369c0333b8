//! Configuration management for the queue service.
//!
//! This module provides configuration handling via environment variables with sensible defaults.
//! All configuration parameters can be customized through environment variables with the ONEA_ prefix.
//!
//! # Environment Variables
//! - ONEA_LOCATION_TIMEOUT_MS: Bound on a device location fix (default: 20000)
//! - ONEA_GEOCODER_URL: Reverse geocoding endpoint (default: Nominatim)
//! - ONEA_GEOCODER_TIMEOUT_MS: HTTP timeout for reverse geocoding (default: 10000)
//! - ONEA_INITIAL_TICKET_COUNTER: Id of the first ticket handed out (default: 1)
//! - ONEA_DISTRIBUTION_ENABLED: Whether reservations are accepted at start (default: true)
//! - ONEA_EVENT_BUFFER: Queue events buffered per subscriber (default: 100)

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Prefix for all queue service environment variables.
const ENV_PREFIX: &str = "ONEA_";

/// Default reverse geocoding endpoint.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Configuration parameters for the queue service.
///
/// Variables that are not set keep their default value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How long a client session waits for a location fix before giving up.
    /// Must be positive. Specified in milliseconds.
    pub location_timeout_ms: u64,

    /// Reverse geocoding endpoint queried with `lat`/`lon` parameters.
    pub geocoder_url: String,

    /// HTTP timeout for reverse geocoding requests.
    /// Must be positive. Specified in milliseconds.
    pub geocoder_timeout_ms: u64,

    /// Id given to the first reserved ticket. Must be at least 1.
    pub initial_ticket_counter: u64,

    /// Whether ticket distribution is open when the service starts.
    pub distribution_enabled: bool,

    /// Number of queue events buffered for each subscriber.
    pub event_buffer: usize,
}

impl QueueConfig {
    /// Attempts to load configuration from environment variables.
    ///
    /// # Returns
    /// - Ok(config) if every present variable parses and the result validates
    /// - Err(message) otherwise
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists for local development
        dotenv::dotenv().ok();

        let env_vars: std::collections::HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .map(|(k, v)| (k.trim_start_matches(ENV_PREFIX).to_string(), v))
            .collect();

        Self::from_vars(env_vars)
    }

    /// Parses configuration from already-stripped `(KEY, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        match envy::from_iter::<_, Self>(vars) {
            Ok(config) => {
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(format!("Failed to parse environment variables: {}", e)),
        }
    }

    /// Loads configuration from environment variables, falling back to defaults
    /// if environment variables are invalid.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            log::warn!("{}; using default configuration", e);
            Self::default()
        })
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_millis(self.geocoder_timeout_ms)
    }

    /// Validates all configuration parameters.
    ///
    /// # Returns
    /// - Ok(()) if all validation passes
    /// - Err(message) with description of the first validation failure
    pub fn validate(&self) -> Result<(), String> {
        if self.location_timeout_ms == 0 {
            return Err("location_timeout_ms must be positive".to_string());
        }
        if self.geocoder_url.trim().is_empty() {
            return Err("geocoder_url must not be empty".to_string());
        }
        if self.geocoder_timeout_ms == 0 {
            return Err("geocoder_timeout_ms must be positive".to_string());
        }
        if self.initial_ticket_counter == 0 {
            return Err("initial_ticket_counter must be at least 1".to_string());
        }
        if self.initial_ticket_counter == u64::MAX {
            return Err("initial_ticket_counter must be below u64::MAX".to_string());
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            location_timeout_ms: 20_000,  // 20s location fix
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            geocoder_timeout_ms: 10_000,  // 10s HTTP timeout
            initial_ticket_counter: 1,
            distribution_enabled: true,
            event_buffer: 100,
        }
    }
}
