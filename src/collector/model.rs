//! Raw stat records as returned by a [`StatsSource`](super::StatsSource).
//!
//! These are rebuilt every collection cycle and dropped once translated.

use std::collections::{BTreeMap, HashMap};

/// Slab class identifier as reported by memcached (`1..=63` in practice).
pub type SlabId = u32;

/// Flat `name -> value` mapping exactly as the server printed it.
pub type StatMap = HashMap<String, String>;

/// Stats of one memcached server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawServerStats {
    /// Address the stats were read from, used in diagnostics.
    pub server: String,
    /// Output of `stats` (plus un-prefixed `stats slabs` totals).
    pub global: StatMap,
    /// Output of `stats items`, keyed by slab class.
    pub items: BTreeMap<SlabId, StatMap>,
    /// Output of `stats slabs`, keyed by slab class.
    pub slabs: BTreeMap<SlabId, StatMap>,
}

impl RawServerStats {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }
}

/// Output of `stats settings` for one server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSettings {
    pub server: String,
    pub settings: StatMap,
}

impl RawSettings {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            settings: StatMap::new(),
        }
    }
}
