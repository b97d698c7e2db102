//! Command-line value parsing.
//!
//! Durations use Go syntax (`1s`, `500ms`, `1m30s`) and listen addresses
//! may omit the host (`:9150`), so existing deployments keep their flags.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::collector::{ServerAddress, Target};

/// Error type for invalid flag values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidDuration(String),
    InvalidListenAddress(String),
    InvalidTelemetryPath(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDuration(s) => write!(f, "invalid duration '{}'", s),
            ConfigError::InvalidListenAddress(s) => {
                write!(f, "invalid listen address '{}', expected [host]:port", s)
            }
            ConfigError::InvalidTelemetryPath(s) => write!(
                f,
                "invalid telemetry path '{}', expected an absolute path without \
                 ':' or '*' segments and without HTML special characters",
                s
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parses a Go-style duration: a sequence of decimal numbers with units
/// `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0` is accepted.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    let input = s.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err(invalid());
    }

    let mut nanos = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if num_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        nanos += value * nanos_per_unit;
    }

    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Normalizes a listen address. An empty host means all interfaces.
pub fn parse_listen_address(s: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidListenAddress(s.to_string());
    let (host, port) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
    port.parse::<u16>().map_err(|_| invalid())?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok(format!("{}:{}", host, port))
}

/// Validates the HTTP path metrics are served on.
///
/// Route captures (`:name`, `*rest`, `{name}`) are rejected since the router
/// would treat them as patterns, as are characters that need escaping in the
/// landing page.
pub fn parse_telemetry_path(s: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidTelemetryPath(s.to_string());
    if !s.starts_with('/') {
        return Err(invalid());
    }
    if s.contains(['<', '>', '"', '\'', '&', '{', '}']) {
        return Err(invalid());
    }
    if s.split('/').any(|segment| segment.starts_with([':', '*'])) {
        return Err(invalid());
    }
    Ok(s.to_string())
}

/// Resolves the scrape target. A unix socket takes precedence over the TCP
/// address.
pub fn resolve_target(address: &str, unix_socket: Option<PathBuf>, timeout: Duration) -> Target {
    let address = match unix_socket {
        Some(path) => ServerAddress::Unix(path),
        None => ServerAddress::Tcp(address.to_string()),
    };
    Target::new(address, timeout)
}
