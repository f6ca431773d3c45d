//! Configuration loading from the process environment.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::schema::{keys, ServerConfig, DEFAULT_HOST};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Merge a definitions file into the process environment.
///
/// With an explicit `path` the file must exist. Without one, `.env` in the
/// working directory (or a parent) is loaded if present. Variables already
/// set in the environment win over the file.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map(|()| Some(path.to_path_buf()))
            .map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            }),
        None => match dotenvy::dotenv() {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.not_found() => Ok(None),
            Err(source) => Err(ConfigError::EnvFile {
                path: PathBuf::from(".env"),
                source,
            }),
        },
    }
}

/// Resolve configuration from the process environment.
pub fn from_env() -> Result<ServerConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Resolve configuration through an arbitrary key lookup.
///
/// Each key is tried as given, then upper-cased. Unset or empty values
/// fall back to the default.
pub fn from_lookup<F>(lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .or_else(|| lookup(&key.to_ascii_uppercase()))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let defaults = ServerConfig::default();
    let mut errors = Vec::new();

    let host = get(keys::HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match get(keys::PORT) {
        Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
            errors.push(ValidationError::InvalidPort {
                key: keys::PORT,
                value: raw,
            });
            defaults.port
        }),
        None => defaults.port,
    };

    let mut duration = |key: &'static str, default: Duration| match get(key) {
        Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
            errors.push(ValidationError::InvalidDuration { key, value: raw });
            default
        }),
        None => default,
    };

    let read_timeout = duration(keys::READ_TIMEOUT, defaults.read_timeout);
    let write_timeout = duration(keys::WRITE_TIMEOUT, defaults.write_timeout);
    let idle_timeout = duration(keys::IDLE_TIMEOUT, defaults.idle_timeout);
    let shutdown_deadline = duration(keys::SHUTDOWN_DEADLINE, defaults.shutdown_deadline);

    let config = ServerConfig {
        host,
        port,
        read_timeout,
        write_timeout,
        idle_timeout,
        shutdown_deadline,
    };

    if let Err(mut invalid) = validate_config(&config) {
        errors.append(&mut invalid);
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Invalid(errors))
    }
}

/// Parse a duration such as `15s`, `250ms`, `1m30s` or `1.5h`.
///
/// A bare integer is taken as seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number = &rest[..number_len];
        rest = &rest[number_len..];

        let unit_len = rest.find(is_number).unwrap_or(rest.len());
        let unit_nanos: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return None,
        };
        rest = &rest[unit_len..];

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut nanos = whole.checked_mul(unit_nanos)?;
        if !fraction.is_empty() {
            let digits = u32::try_from(fraction.len()).ok()?;
            let scale = 10u128.checked_pow(digits)?;
            let fraction: u128 = fraction.parse().ok()?;
            nanos = nanos.checked_add(fraction.checked_mul(unit_nanos)? / scale)?;
        }

        let part = Duration::from_nanos(u64::try_from(nanos).ok()?);
        total = total.checked_add(part)?;
    }

    Some(total)
}
