//! memcached-exporter - Prometheus exporter for memcached.
//!
//! Provides:
//! - `catalog` - the fixed set of exported metrics (names, kinds, labels, help)
//! - `collector` - translation of raw memcached stats into observations
//! - `client` - blocking memcached stats client (TCP, unix socket)
//! - `exporter` - `prometheus::core::Collector` adapter over the engine
//! - `config` - command-line value parsing
//! - `web` - HTTP endpoint serving the registry
//!
//! On Linux:
//! - `process` - resource usage of the memcached process via its PID file

pub mod catalog;
pub mod client;
pub mod collector;
pub mod config;
pub mod exporter;
pub mod web;

#[cfg(target_os = "linux")]
pub mod process;

/// Crate version reported by `--version` and the startup log.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
