//! Abstraction over the stats transport to enable testing and mocking.
//!
//! The `StatsSource` trait allows the engine to work with a live memcached
//! connection as well as with in-memory fixtures.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use super::model::{RawServerStats, RawSettings};

/// Where a memcached server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAddress {
    /// `host:port`, resolved on every connect.
    Tcp(String),
    /// Path to a unix domain socket.
    Unix(PathBuf),
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerAddress::Tcp(addr) => f.write_str(addr),
            ServerAddress::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Resolved server address and the per-call timeout.
///
/// The timeout is handed to the source as is; the engine never retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: ServerAddress,
    pub timeout: Duration,
}

impl Target {
    pub fn new(address: ServerAddress, timeout: Duration) -> Self {
        Self { address, timeout }
    }
}

/// Error type for a failed stats or settings fetch.
#[derive(Debug)]
pub enum StatsError {
    /// The server could not be reached.
    Connect { address: String, source: io::Error },
    /// Reading or writing an established connection failed.
    Io(io::Error),
    /// The server answered something that is not a stats response.
    Protocol(String),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::Connect { address, source } => {
                write!(f, "failed to connect to {}: {}", address, source)
            }
            StatsError::Io(e) => write!(f, "i/o error: {}", e),
            StatsError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatsError::Connect { source, .. } => Some(source),
            StatsError::Io(e) => Some(e),
            StatsError::Protocol(_) => None,
        }
    }
}

impl From<io::Error> for StatsError {
    fn from(e: io::Error) -> Self {
        StatsError::Io(e)
    }
}

/// Provider of raw memcached stats.
///
/// Implementations must be safe to call from concurrent scrapes: the engine
/// shares one source between overlapping collection cycles without locking.
pub trait StatsSource: Send + Sync {
    /// Fetches `stats`, `stats items` and `stats slabs` for every server behind
    /// `target`.
    fn fetch_stats(&self, target: &Target) -> Result<Vec<RawServerStats>, StatsError>;

    /// Fetches `stats settings` for every server behind `target`.
    fn fetch_settings(&self, target: &Target) -> Result<Vec<RawSettings>, StatsError>;
}

impl<S: StatsSource + ?Sized> StatsSource for std::sync::Arc<S> {
    fn fetch_stats(&self, target: &Target) -> Result<Vec<RawServerStats>, StatsError> {
        (**self).fetch_stats(target)
    }

    fn fetch_settings(&self, target: &Target) -> Result<Vec<RawSettings>, StatsError> {
        (**self).fetch_settings(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_server_address_display() {
        assert_eq!(
            ServerAddress::Tcp("localhost:11211".to_string()).to_string(),
            "localhost:11211"
        );
        assert_eq!(
            ServerAddress::Unix(PathBuf::from("/run/memcached.sock")).to_string(),
            "unix:/run/memcached.sock"
        );
    }

    #[test]
    fn test_stats_error_display_and_source() {
        let err = StatsError::Connect {
            address: "10.0.0.1:11211".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "failed to connect to 10.0.0.1:11211: refused");
        assert!(err.source().is_some());

        let err = StatsError::Protocol("unexpected line \"ERROR\"".to_string());
        assert!(err.to_string().starts_with("protocol error"));
        assert!(err.source().is_none());
    }
}
