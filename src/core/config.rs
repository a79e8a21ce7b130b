//! Process configuration read from the environment (optionally seeded by `.env`).

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8085;
pub const DEFAULT_BUCKET: &str = "battery-modbus";
pub const DEFAULT_MEASUREMENT: &str = "battery_modbus_metrics";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for environment variable {var}")]
    Invalid { var: &'static str, value: String },
}

/// Connection settings for the InfluxDB v2 query API.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub influx: InfluxConfig,
    pub port: u16,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty strings count as unset, same as an absent variable.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let url = required("INFLUXDB_HOST")?;
        let token = required("INFLUXDB_TOKEN")?;
        let org = required("INFLUXDB_ORG")?;

        let bucket = get("INFLUXDB_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let measurement =
            get("INFLUXDB_MEASUREMENT").unwrap_or_else(|| DEFAULT_MEASUREMENT.to_string());

        let timeout_secs = match get("INFLUXDB_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "INFLUXDB_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            influx: InfluxConfig {
                url,
                token,
                org,
                bucket,
                measurement,
                timeout: Duration::from_secs(timeout_secs),
            },
            port,
        })
    }
}
