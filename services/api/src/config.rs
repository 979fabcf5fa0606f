//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{FixedOffset, Offset, Utc};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

pub const MIN_JWT_SECRET_LEN: usize = 16;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub day_boundary_offset: FixedOffset,
    pub spin_rewards: Vec<u64>,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub chat_timeout: Duration,
    pub chat_cache_size: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Auth Settings ---
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                format!("must be at least {} bytes", MIN_JWT_SECRET_LEN),
            ));
        }
        let token_ttl_hours: i64 = parse_var("TOKEN_TTL_HOURS", 168)?;
        let token_ttl = parse_token_ttl(token_ttl_hours)
            .map_err(|e| ConfigError::InvalidValue("TOKEN_TTL_HOURS".to_string(), e))?;

        // --- Load Economy Settings ---
        let day_boundary_offset = match std::env::var("DAY_BOUNDARY_OFFSET") {
            Ok(raw) => parse_offset(&raw)
                .map_err(|e| ConfigError::InvalidValue("DAY_BOUNDARY_OFFSET".to_string(), e))?,
            Err(_) => Utc.fix(),
        };
        let spin_rewards = match std::env::var("SPIN_REWARDS") {
            Ok(raw) => parse_rewards(&raw)
                .map_err(|e| ConfigError::InvalidValue("SPIN_REWARDS".to_string(), e))?,
            Err(_) => edugen_core::economy::spin::DEFAULT_SPIN_REWARDS.to_vec(),
        };

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        // --- Load Chat Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let chat_timeout = Duration::from_secs(parse_var("CHAT_TIMEOUT_SECS", 20)?);
        let chat_cache_size = parse_var("CHAT_CACHE_SIZE", 100)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            token_ttl,
            day_boundary_offset,
            spin_rewards,
            cors_origin,
            openai_api_key,
            chat_model,
            chat_timeout,
            chat_cache_size,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Parses `+HH:MM` / `-HH:MM` into a fixed offset.
pub fn parse_offset(raw: &str) -> Result<FixedOffset, String> {
    let raw = raw.trim();
    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => return Err(format!("'{}' must start with + or -", raw)),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| format!("'{}' is not in +HH:MM form", raw))?;
    let hours: i32 = hours.parse().map_err(|_| format!("bad hours in '{}'", raw))?;
    let minutes: i32 = minutes.parse().map_err(|_| format!("bad minutes in '{}'", raw))?;
    if !(0..60).contains(&minutes) {
        return Err(format!("bad minutes in '{}'", raw));
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("'{}' is out of range", raw))
}

/// Parses a comma-separated list of positive XP amounts.
pub fn parse_rewards(raw: &str) -> Result<Vec<u64>, String> {
    let rewards = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| format!("'{}' is not a positive integer", s))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if rewards.is_empty() {
        return Err("at least one reward is required".to_string());
    }
    Ok(rewards)
}

fn parse_token_ttl(hours: i64) -> Result<chrono::Duration, String> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return Err(format!(
            "must be between 1 and {} hours, got {}",
            MAX_TOKEN_TTL_HOURS, hours
        ));
    }
    Ok(chrono::Duration::hours(hours))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_parse_both_signs() {
        assert_eq!(parse_offset("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_offset("-08:00").unwrap().local_minus_utc(), -28_800);
        assert_eq!(parse_offset("+00:00").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn malformed_offsets_fail() {
        assert!(parse_offset("05:30").is_err());
        assert!(parse_offset("+5").is_err());
        assert!(parse_offset("+05:75").is_err());
        assert!(parse_offset("+30:00").is_err());
    }

    #[test]
    fn token_ttl_is_bounded() {
        assert_eq!(parse_token_ttl(168).unwrap(), chrono::Duration::hours(168));
        assert_eq!(
            parse_token_ttl(MAX_TOKEN_TTL_HOURS).unwrap(),
            chrono::Duration::hours(MAX_TOKEN_TTL_HOURS)
        );
        assert!(parse_token_ttl(0).is_err());
        assert!(parse_token_ttl(-5).is_err());
        assert!(parse_token_ttl(MAX_TOKEN_TTL_HOURS + 1).is_err());
        assert!(parse_token_ttl(2_300_000_000).is_err());
    }

    #[test]
    fn rewards_parse_and_validate() {
        assert_eq!(parse_rewards("50, 100,500").unwrap(), vec![50, 100, 500]);
        assert!(parse_rewards("").is_err());
        assert!(parse_rewards("50,zero").is_err());
        assert!(parse_rewards("0").is_err());
    }
}
