//! `MockSource` serves canned stat records; `RecordingDiagnostics` keeps
//! every reported problem for later assertions.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::collector::model::{RawServerStats, RawSettings};
use crate::collector::parser::{Diagnostics, FieldError};
use crate::collector::traits::{StatsError, StatsSource, Target};

/// Stats source backed by in-memory records.
///
/// `None` for stats or settings makes the corresponding fetch fail. Clones
/// share their call counters.
#[derive(Debug, Clone)]
pub struct MockSource {
    stats: Option<Vec<RawServerStats>>,
    settings: Option<Vec<RawSettings>>,
    stats_calls: Arc<AtomicUsize>,
    settings_calls: Arc<AtomicUsize>,
}

impl Default for MockSource {
    /// A reachable server that reports nothing.
    fn default() -> Self {
        Self {
            stats: Some(Vec::new()),
            settings: Some(Vec::new()),
            stats_calls: Arc::new(AtomicUsize::new(0)),
            settings_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A server that refuses connections.
    pub fn unreachable() -> Self {
        Self {
            stats: None,
            settings: None,
            ..Self::default()
        }
    }

    /// Adds a stats record.
    pub fn with_server(mut self, stats: RawServerStats) -> Self {
        self.stats.get_or_insert_with(Vec::new).push(stats);
        self
    }

    /// Adds a settings record.
    pub fn with_settings(mut self, settings: RawSettings) -> Self {
        self.settings.get_or_insert_with(Vec::new).push(settings);
        self
    }

    /// Makes `stats settings` fail while `stats` keeps working.
    pub fn without_settings(mut self) -> Self {
        self.settings = None;
        self
    }

    /// Overrides a global stat of the first server.
    pub fn set_global(&mut self, key: &str, value: &str) {
        if let Some(first) = self.stats.as_mut().and_then(|s| s.first_mut()) {
            first.global.insert(key.to_string(), value.to_string());
        }
    }

    /// Drops a global stat of the first server.
    pub fn remove_global(&mut self, key: &str) {
        if let Some(first) = self.stats.as_mut().and_then(|s| s.first_mut()) {
            first.global.remove(key);
        }
    }

    /// Overrides a setting of the first server.
    pub fn set_setting(&mut self, key: &str, value: &str) {
        if let Some(first) = self.settings.as_mut().and_then(|s| s.first_mut()) {
            first.settings.insert(key.to_string(), value.to_string());
        }
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::Relaxed)
    }

    pub fn settings_calls(&self) -> usize {
        self.settings_calls.load(Ordering::Relaxed)
    }
}

impl StatsSource for MockSource {
    fn fetch_stats(&self, target: &Target) -> Result<Vec<RawServerStats>, StatsError> {
        self.stats_calls.fetch_add(1, Ordering::Relaxed);
        self.stats.clone().ok_or_else(|| StatsError::Connect {
            address: target.address.to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        })
    }

    fn fetch_settings(&self, _target: &Target) -> Result<Vec<RawSettings>, StatsError> {
        self.settings_calls.fetch_add(1, Ordering::Relaxed);
        self.settings
            .clone()
            .ok_or_else(|| StatsError::Protocol("unexpected reply \"ERROR\"".to_string()))
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Field { server: String, field: String, error: String },
    Stats { server: String, error: String },
    Settings { server: String, error: String },
}

/// Diagnostics sink that records instead of logging.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<Entry>>,
}

impl RecordingDiagnostics {
    fn push(&self, entry: Entry) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    fn snapshot(&self) -> Vec<Entry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every recorded problem, rendered as one line each.
    pub fn entries(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .map(|e| match e {
                Entry::Field {
                    server,
                    field,
                    error,
                } => format!("{server}: {field}: {error}"),
                Entry::Stats { server, error } => format!("{server}: stats: {error}"),
                Entry::Settings { server, error } => format!("{server}: settings: {error}"),
            })
            .collect()
    }

    /// Names of the fields that failed to parse, in report order.
    pub fn fields(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Field { field, .. } => Some(field),
                _ => None,
            })
            .collect()
    }

    pub fn stats_failures(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| matches!(e, Entry::Stats { .. }))
            .count()
    }

    pub fn settings_failures(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| matches!(e, Entry::Settings { .. }))
            .count()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn field_error(&self, server: &str, field: &str, error: &FieldError) {
        self.push(Entry::Field {
            server: server.to_string(),
            field: field.to_string(),
            error: error.to_string(),
        });
    }

    fn stats_unavailable(&self, server: &str, error: &StatsError) {
        self.push(Entry::Stats {
            server: server.to_string(),
            error: error.to_string(),
        });
    }

    fn settings_unavailable(&self, server: &str, error: &StatsError) {
        self.push(Entry::Settings {
            server: server.to_string(),
            error: error.to_string(),
        });
    }
}
