//! Configuration settings for the pricing services and booking client.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::RpcError;
use crate::pricing::{DEFAULT_FLIGHT_RATE, DEFAULT_HOTEL_RATE};
use crate::protocol::DEFAULT_MAX_MESSAGE_SIZE;

/// Main configuration structure.
///
/// Every section has defaults, so an empty file (or no file) yields the
/// reference deployment: flight on 127.0.0.1:8001, hotel on 127.0.0.1:8002.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawSettings")]
pub struct Settings {
    pub flight: ServiceConfig,
    pub hotel: ServiceConfig,
    pub client: ClientConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

/// Settings as written in the file, before per-service defaults are applied.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    flight: ServiceSection,
    #[serde(default)]
    hotel: ServiceSection,
    #[serde(default)]
    client: ClientConfig,
    #[serde(default)]
    limits: LimitsConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// A `[flight]` or `[hotel]` table; missing keys take that service's defaults.
#[derive(Debug, Default, Deserialize)]
struct ServiceSection {
    bind: Option<String>,
    rate: Option<f64>,
    max_exchanges: Option<u64>,
}

impl ServiceSection {
    fn resolve(self, defaults: ServiceConfig) -> ServiceConfig {
        ServiceConfig {
            bind: self.bind.unwrap_or(defaults.bind),
            rate: self.rate.unwrap_or(defaults.rate),
            max_exchanges: self.max_exchanges.or(defaults.max_exchanges),
        }
    }
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Self {
            flight: raw.flight.resolve(default_flight_service()),
            hotel: raw.hotel.resolve(default_hotel_service()),
            client: raw.client,
            limits: raw.limits,
            logging: raw.logging,
        }
    }
}

/// Configuration for one pricing service listener.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind (e.g., "127.0.0.1:8001").
    pub bind: String,
    /// Price per unit (distance unit or night).
    pub rate: f64,
    /// Stop after this many exchanges. Unset means serve until shutdown.
    pub max_exchanges: Option<u64>,
}

/// Booking client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Flight service address.
    #[serde(default = "default_flight_addr")]
    pub flight_addr: String,
    /// Hotel service address.
    #[serde(default = "default_hotel_addr")]
    pub hotel_addr: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Read/write timeout in milliseconds, applied to every blocking receive.
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,
    /// Maximum exchanges in flight per listener.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_exchanges: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_flight_addr() -> String {
    "127.0.0.1:8001".to_string()
}

fn default_hotel_addr() -> String {
    "127.0.0.1:8002".to_string()
}

fn default_flight_service() -> ServiceConfig {
    ServiceConfig {
        bind: default_flight_addr(),
        rate: DEFAULT_FLIGHT_RATE,
        max_exchanges: None,
    }
}

fn default_hotel_service() -> ServiceConfig {
    ServiceConfig {
        bind: default_hotel_addr(),
        rate: DEFAULT_HOTEL_RATE,
        max_exchanges: None,
    }
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_io_timeout() -> u64 {
    30_000
}

fn default_max_concurrent() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            flight_addr: default_flight_addr(),
            hotel_addr: default_hotel_addr(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            connect_timeout_ms: default_connect_timeout(),
            io_timeout_ms: default_io_timeout(),
            max_concurrent_exchanges: default_max_concurrent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            flight: default_flight_service(),
            hotel: default_hotel_service(),
            client: ClientConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LimitsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RpcError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RpcError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            RpcError::Config { message } => RpcError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, RpcError> {
        let settings: Settings = toml::from_str(content).map_err(|e| RpcError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), RpcError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(RpcError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(RpcError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        for (name, service) in [("flight", &self.flight), ("hotel", &self.hotel)] {
            if !service.rate.is_finite() {
                return Err(RpcError::Config {
                    message: format!("Invalid {} rate '{}'", name, service.rate),
                });
            }
            if service.max_exchanges == Some(0) {
                return Err(RpcError::Config {
                    message: format!("{}.max_exchanges must be at least 1", name),
                });
            }
        }

        if self.limits.max_message_size == 0
            || self.limits.connect_timeout_ms == 0
            || self.limits.io_timeout_ms == 0
            || self.limits.max_concurrent_exchanges == 0
        {
            return Err(RpcError::Config {
                message: "Limits must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}
