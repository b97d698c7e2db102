//! Translation of raw memcached stats into catalog observations.
//!
//! One call to [`Collector::collect_into`] is one self-contained collection
//! cycle: fetch, translate, emit. Nothing is kept between cycles, so a single
//! `Collector` can serve overlapping scrapes.

use std::sync::Arc;

use tracing::{debug, error};

use super::derive::{Scope, derive_set_count};
use super::model::{RawServerStats, RawSettings, SlabId, StatMap};
use super::observation::{Observation, ObservationSink};
use super::parser::{Diagnostics, FieldReader, TracingDiagnostics};
use super::traits::{StatsSource, Target};
use crate::catalog::MetricId;

/// Commands with `<cmd>_hits` / `<cmd>_misses` counters.
const COMMANDS: [&str; 6] = ["get", "delete", "incr", "decr", "cas", "touch"];

/// Server-wide stats copied 1:1, in emission order.
const GLOBAL_STATS: &[(&str, MetricId)] = &[
    ("bytes", MetricId::CurrentBytes),
    ("limit_maxbytes", MetricId::LimitBytes),
    ("curr_items", MetricId::Items),
    ("total_items", MetricId::ItemsTotal),
    ("bytes_read", MetricId::BytesRead),
    ("bytes_written", MetricId::BytesWritten),
    ("curr_connections", MetricId::CurrentConnections),
    ("total_connections", MetricId::ConnectionsTotal),
    ("conn_yields", MetricId::ConnectionsYielded),
    ("listen_disabled_num", MetricId::ListenerDisabled),
    ("evictions", MetricId::Evictions),
    ("reclaimed", MetricId::Reclaimed),
    ("lru_crawler_starts", MetricId::LruCrawlerStarts),
    ("crawler_items_checked", MetricId::LruCrawlerItemsChecked),
    ("crawler_reclaimed", MetricId::LruCrawlerReclaimed),
    ("moves_to_cold", MetricId::LruCrawlerMovesToCold),
    ("moves_to_warm", MetricId::LruCrawlerMovesToWarm),
    ("moves_within_lru", MetricId::LruCrawlerMovesWithinLru),
    ("total_malloced", MetricId::Malloced),
];

/// Per-slab item stats that only newer servers print. Skipped when absent.
const OPTIONAL_ITEM_STATS: &[(&str, MetricId)] = &[
    ("crawler_reclaimed", MetricId::SlabItemsCrawlerReclaimed),
    ("evicted", MetricId::SlabItemsEvicted),
    ("evicted_nonzero", MetricId::SlabItemsEvictedNonzero),
    ("evicted_time", MetricId::SlabItemsEvictedTime),
    ("evicted_unfetched", MetricId::SlabItemsEvictedUnfetched),
    ("expired_unfetched", MetricId::SlabItemsExpiredUnfetched),
    ("outofmemory", MetricId::SlabItemsOutOfMemory),
    ("reclaimed", MetricId::SlabItemsReclaimed),
    ("tailrepairs", MetricId::SlabItemsTailRepairs),
    ("moves_to_cold", MetricId::SlabItemsMovesToCold),
    ("moves_to_warm", MetricId::SlabItemsMovesToWarm),
    ("moves_within_lru", MetricId::SlabItemsMovesWithinLru),
];

/// Per-slab allocator gauges, in emission order.
const SLAB_STATS: &[(&str, MetricId)] = &[
    ("chunk_size", MetricId::SlabChunkSize),
    ("chunks_per_page", MetricId::SlabChunksPerPage),
    ("total_pages", MetricId::SlabCurrentPages),
    ("total_chunks", MetricId::SlabCurrentChunks),
    ("used_chunks", MetricId::SlabChunksUsed),
    ("free_chunks", MetricId::SlabChunksFree),
    ("free_chunks_end", MetricId::SlabChunksFreeEnd),
    ("mem_requested", MetricId::SlabMemRequested),
];

/// How a setting is encoded.
#[derive(Clone, Copy)]
enum SettingKind {
    Numeric,
    Flag,
}

const SETTINGS: &[(&str, SettingKind, MetricId)] = &[
    ("maxconns", SettingKind::Numeric, MetricId::MaxConnections),
    ("lru_crawler", SettingKind::Flag, MetricId::LruCrawlerEnabled),
    ("lru_crawler_sleep", SettingKind::Numeric, MetricId::LruCrawlerSleep),
    ("lru_crawler_tocrawl", SettingKind::Numeric, MetricId::LruCrawlerMaxItems),
    ("lru_maintainer_thread", SettingKind::Flag, MetricId::LruMaintainerThread),
    ("hot_lru_pct", SettingKind::Numeric, MetricId::LruHotPercent),
    ("warm_lru_pct", SettingKind::Numeric, MetricId::LruWarmPercent),
    ("hot_max_factor", SettingKind::Numeric, MetricId::LruHotMaxAgeFactor),
    ("warm_max_factor", SettingKind::Numeric, MetricId::LruWarmMaxAgeFactor),
];

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Stats were fetched; `up` is 1.
    Reachable,
    /// Stats could not be fetched; only `up` = 0 was emitted.
    Unreachable,
}

/// Collects one memcached target into catalog observations.
pub struct Collector<S: StatsSource> {
    source: S,
    target: Target,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<S: StatsSource> Collector<S> {
    /// Creates a collector reporting problems through `tracing`.
    pub fn new(source: S, target: Target) -> Self {
        Self {
            source,
            target,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replaces the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Runs one cycle and returns everything it emitted.
    pub fn collect(&self) -> Vec<Observation> {
        let mut observations = Vec::new();
        self.collect_into(&mut observations);
        observations
    }

    /// Runs one cycle, pushing observations to `sink` in a fixed order:
    /// `up`, global stats, per-slab item stats, per-slab allocator stats,
    /// settings.
    pub fn collect_into(&self, sink: &mut dyn ObservationSink) -> ServerState {
        let server = self.target.address.to_string();
        let mut out = Emitter::new(sink);

        let stats = match self.source.fetch_stats(&self.target) {
            Ok(stats) => stats,
            Err(e) => {
                self.diagnostics.stats_unavailable(&server, &e);
                out.emit(MetricId::Up, 0.0, &[]);
                return ServerState::Unreachable;
            }
        };
        out.emit(MetricId::Up, 1.0, &[]);

        for record in &stats {
            self.emit_server(&mut out, record);
        }

        match self.source.fetch_settings(&self.target) {
            Ok(settings) => {
                for record in &settings {
                    self.emit_settings(&mut out, record);
                }
            }
            Err(e) => self.diagnostics.settings_unavailable(&server, &e),
        }

        debug!(
            server = %server,
            servers = stats.len(),
            observations = out.emitted,
            "collected memcached stats"
        );
        ServerState::Reachable
    }

    fn reader<'a>(&'a self, fields: &'a StatMap, server: &'a str) -> FieldReader<'a> {
        FieldReader::new(fields, server, self.diagnostics.as_ref())
    }

    fn emit_server(&self, out: &mut Emitter<'_>, record: &RawServerStats) {
        let s = self.reader(&record.global, &record.server);

        out.emit(MetricId::Uptime, s.numeric("uptime"), &[]);
        out.emit(MetricId::Version, 1.0, &[s.raw("version")]);

        for cmd in COMMANDS {
            out.emit(
                MetricId::Commands,
                s.numeric(&format!("{cmd}_hits")),
                &[cmd, "hit"],
            );
            out.emit(
                MetricId::Commands,
                s.numeric(&format!("{cmd}_misses")),
                &[cmd, "miss"],
            );
        }
        out.emit(MetricId::Commands, s.numeric("cas_badval"), &["cas", "badval"]);
        out.emit(MetricId::Commands, s.numeric("cmd_flush"), &["flush", "hit"]);
        out.emit(
            MetricId::Commands,
            derive_set_count(&s, Scope::Global),
            &["set", "hit"],
        );

        for &(key, metric) in GLOBAL_STATS {
            out.emit(metric, s.numeric(key), &[]);
        }

        for (&slab, fields) in &record.items {
            self.emit_item_slab(out, slab, &self.reader(fields, &record.server));
        }
        for (&slab, fields) in &record.slabs {
            self.emit_allocator_slab(out, slab, &self.reader(fields, &record.server));
        }
    }

    fn emit_item_slab(&self, out: &mut Emitter<'_>, slab: SlabId, u: &FieldReader<'_>) {
        let label = slab.to_string();
        let slab = label.as_str();
        out.emit(MetricId::SlabItemsNumber, u.numeric("number"), &[slab]);
        out.emit(MetricId::SlabItemsAge, u.numeric("age"), &[slab]);

        for &(key, metric) in OPTIONAL_ITEM_STATS {
            if u.contains(key) {
                out.emit(metric, u.numeric(key), &[slab]);
            }
        }
    }

    fn emit_allocator_slab(&self, out: &mut Emitter<'_>, slab: SlabId, v: &FieldReader<'_>) {
        let label = slab.to_string();
        let slab = label.as_str();

        // memcached keeps no per-slab miss counters
        for cmd in COMMANDS {
            out.emit(
                MetricId::SlabCommands,
                v.numeric(&format!("{cmd}_hits")),
                &[slab, cmd, "hit"],
            );
        }
        out.emit(
            MetricId::SlabCommands,
            v.numeric("cas_badval"),
            &[slab, "cas", "badval"],
        );
        out.emit(
            MetricId::SlabCommands,
            derive_set_count(v, Scope::Slab),
            &[slab, "set", "hit"],
        );

        for &(key, metric) in SLAB_STATS {
            out.emit(metric, v.numeric(key), &[slab]);
        }
    }

    fn emit_settings(&self, out: &mut Emitter<'_>, record: &RawSettings) {
        let s = self.reader(&record.settings, &record.server);
        for &(key, kind, metric) in SETTINGS {
            let value = match kind {
                SettingKind::Numeric => s.numeric(key),
                SettingKind::Flag => s.bool_flag(key),
            };
            out.emit(metric, value, &[]);
        }
    }
}

/// Builds observations and forwards them to the sink.
struct Emitter<'s> {
    sink: &'s mut dyn ObservationSink,
    emitted: usize,
}

impl<'s> Emitter<'s> {
    fn new(sink: &'s mut dyn ObservationSink) -> Self {
        Self { sink, emitted: 0 }
    }

    fn emit(&mut self, metric: MetricId, value: f64, labels: &[&str]) {
        let labels = labels.iter().map(|l| l.to_string()).collect();
        match Observation::new(metric, value, labels) {
            Ok(observation) => {
                self.sink.observe(observation);
                self.emitted += 1;
            }
            Err(e) => error!(error = %e, "dropping malformed observation"),
        }
    }
}
