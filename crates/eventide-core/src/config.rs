use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{DEFAULT_REPEAT_LIMIT_WEEKS, DEFAULT_TIME_ZONE};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// IANA name of the zone recurrence rules are evaluated in.
    pub time_zone: String,
    /// Horizon for rules without a repeat end, in weeks.
    pub repeat_limit_weeks: u32,
    /// How far ahead the maintenance job extends occurrences, in weeks.
    pub maintenance_horizon_weeks: u32,
    /// Number of events the maintenance job works on at once.
    pub maintenance_concurrency: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            repeat_limit_weeks: DEFAULT_REPEAT_LIMIT_WEEKS,
            maintenance_horizon_weeks: DEFAULT_REPEAT_LIMIT_WEEKS,
            maintenance_concurrency: 4,
        }
    }
}

impl EventsConfig {
    /// ## Summary
    /// Resolves the configured time zone name.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` if the name is not in the tz database.
    pub fn time_zone(&self) -> CoreResult<chrono_tz::Tz> {
        self.time_zone.parse::<chrono_tz::Tz>().map_err(|err| {
            CoreError::ConfigError(format!("unknown time zone {:?}: {err}", self.time_zone))
        })
    }

    /// ## Summary
    /// Returns the repeat limit as a time delta.
    #[must_use]
    pub fn repeat_limit(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::weeks(i64::from(self.repeat_limit_weeks))
    }

    /// ## Summary
    /// Returns the maintenance horizon as a time delta.
    #[must_use]
    pub fn maintenance_horizon(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::weeks(i64::from(self.maintenance_horizon_weeks))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `config.toml` into a `Settings`.
    ///
    /// Environment variables use the `EVENTIDE_` prefix and `__` between
    /// sections, e.g. `EVENTIDE_EVENTS__TIME_ZONE=Australia/Sydney`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("database.max_connections", 4)?
            .set_default("database.run_migrations", false)?
            .set_default("events.time_zone", DEFAULT_TIME_ZONE)?
            .set_default("events.repeat_limit_weeks", DEFAULT_REPEAT_LIMIT_WEEKS)?
            .set_default("events.maintenance_horizon_weeks", DEFAULT_REPEAT_LIMIT_WEEKS)?
            .set_default("events.maintenance_concurrency", 4)?
            .set_default("logging.level", "info")?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env overrides file
            .add_source(
                config::Environment::with_prefix("EVENTIDE")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
