// Application configuration
// Loaded from the process environment (after dotenv has read an optional .env file)

use std::str::FromStr;
use std::time::Duration;

/// Configuration errors raised at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime configuration for the discount API
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// HMAC secret used to verify bearer tokens issued by the identity service
    pub jwt_secret: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// How often abandoned reservations are reclaimed (default 5 minutes)
    pub reservation_sweep_interval: Duration,
    /// How often lapsed offers are flipped to expired (default 1 hour)
    pub offer_sweep_interval: Duration,
    /// How long the policy settings are cached before re-reading the database
    pub policy_cache_ttl: Duration,
}

impl AppConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Split out from `from_env` so defaults and parsing can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            jwt_secret,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            reservation_sweep_interval: interval_or(&lookup, "RESERVATION_SWEEP_INTERVAL_SECS", 300)?,
            offer_sweep_interval: interval_or(&lookup, "OFFER_SWEEP_INTERVAL_SECS", 3600)?,
            policy_cache_ttl: Duration::from_secs(parse_or(&lookup, "POLICY_CACHE_TTL_SECS", 60)?),
        })
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Sweep period in whole seconds; zero is rejected since a timer cannot tick at it
fn interval_or<F>(lookup: &F, key: &'static str, default_secs: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(lookup, key, default_secs)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
