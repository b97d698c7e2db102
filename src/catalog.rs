//! Static metric catalog.
//!
//! Every metric the exporter can produce is declared exactly once in
//! [`CATALOG`], indexed by [`MetricId`]. The table is the only process-wide
//! state and is never mutated; collection cycles refer to it by id.
//!
//! Names are reproduced verbatim from the established memcached exporter so
//! dashboards and alerts keep working: namespace `memcached`, subsystems
//! `lru_crawler` and `slab`.

pub const NAMESPACE: &str = "memcached";
pub const SUBSYSTEM_LRU_CRAWLER: &str = "lru_crawler";
pub const SUBSYSTEM_SLAB: &str = "slab";

/// Value kind of a metric, mapped 1:1 onto Prometheus metric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Untyped,
}

/// Identifier of a catalog entry. The discriminant is the index into [`CATALOG`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricId {
    Up,
    Uptime,
    Version,
    BytesRead,
    BytesWritten,
    CurrentConnections,
    MaxConnections,
    ConnectionsTotal,
    ConnectionsYielded,
    ListenerDisabled,
    CurrentBytes,
    LimitBytes,
    Commands,
    Items,
    ItemsTotal,
    Evictions,
    Reclaimed,
    LruCrawlerEnabled,
    LruCrawlerSleep,
    LruCrawlerMaxItems,
    LruMaintainerThread,
    LruHotPercent,
    LruWarmPercent,
    LruHotMaxAgeFactor,
    LruWarmMaxAgeFactor,
    LruCrawlerStarts,
    LruCrawlerReclaimed,
    LruCrawlerItemsChecked,
    LruCrawlerMovesToCold,
    LruCrawlerMovesToWarm,
    LruCrawlerMovesWithinLru,
    Malloced,
    SlabItemsNumber,
    SlabItemsAge,
    SlabItemsCrawlerReclaimed,
    SlabItemsEvicted,
    SlabItemsEvictedNonzero,
    SlabItemsEvictedTime,
    SlabItemsEvictedUnfetched,
    SlabItemsExpiredUnfetched,
    SlabItemsOutOfMemory,
    SlabItemsReclaimed,
    SlabItemsTailRepairs,
    SlabItemsMovesToCold,
    SlabItemsMovesToWarm,
    SlabItemsMovesWithinLru,
    SlabChunkSize,
    SlabChunksPerPage,
    SlabCurrentPages,
    SlabCurrentChunks,
    SlabChunksUsed,
    SlabChunksFree,
    SlabChunksFreeEnd,
    SlabMemRequested,
    SlabCommands,
}

impl MetricId {
    /// Catalog entry describing this metric.
    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }

    pub fn kind(self) -> MetricKind {
        self.entry().kind
    }

    pub fn labels(self) -> &'static [&'static str] {
        self.entry().labels
    }
}

/// One declared metric: identity, kind, label schema and help text.
#[derive(Debug)]
pub struct CatalogEntry {
    pub id: MetricId,
    pub kind: MetricKind,
    pub namespace: &'static str,
    pub subsystem: &'static str,
    pub name: &'static str,
    pub labels: &'static [&'static str],
    pub help: &'static str,
}

impl CatalogEntry {
    /// Fully-qualified metric name: `namespace_subsystem_name`, skipping
    /// empty components.
    pub fn fq_name(&self) -> String {
        [self.namespace, self.subsystem, self.name]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("_")
    }
}

const NO_LABELS: &[&str] = &[];
const SLAB_LABELS: &[&str] = &["slab"];

const fn top(
    id: MetricId,
    kind: MetricKind,
    name: &'static str,
    labels: &'static [&'static str],
    help: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        id,
        kind,
        namespace: NAMESPACE,
        subsystem: "",
        name,
        labels,
        help,
    }
}

const fn crawler(
    id: MetricId,
    kind: MetricKind,
    name: &'static str,
    help: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        id,
        kind,
        namespace: NAMESPACE,
        subsystem: SUBSYSTEM_LRU_CRAWLER,
        name,
        labels: NO_LABELS,
        help,
    }
}

const fn slab(
    id: MetricId,
    kind: MetricKind,
    name: &'static str,
    help: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        id,
        kind,
        namespace: NAMESPACE,
        subsystem: SUBSYSTEM_SLAB,
        name,
        labels: SLAB_LABELS,
        help,
    }
}

use MetricId as M;
use MetricKind::{Counter, Gauge, Untyped};

/// All metrics, in [`MetricId`] order.
pub static CATALOG: [CatalogEntry; 55] = [
    top(M::Up, Gauge, "up", NO_LABELS, "Could the memcached server be reached."),
    top(
        M::Uptime,
        Counter,
        "uptime_seconds",
        NO_LABELS,
        "Number of seconds since the server started.",
    ),
    top(
        M::Version,
        Gauge,
        "version",
        &["version"],
        "The version of this memcached server.",
    ),
    top(
        M::BytesRead,
        Counter,
        "read_bytes_total",
        NO_LABELS,
        "Total number of bytes read by this server from network.",
    ),
    top(
        M::BytesWritten,
        Counter,
        "written_bytes_total",
        NO_LABELS,
        "Total number of bytes sent by this server to network.",
    ),
    top(
        M::CurrentConnections,
        Gauge,
        "current_connections",
        NO_LABELS,
        "Current number of open connections.",
    ),
    top(
        M::MaxConnections,
        Gauge,
        "max_connections",
        NO_LABELS,
        "Maximum number of clients allowed.",
    ),
    top(
        M::ConnectionsTotal,
        Counter,
        "connections_total",
        NO_LABELS,
        "Total number of connections opened since the server started running.",
    ),
    top(
        M::ConnectionsYielded,
        Counter,
        "connections_yielded_total",
        NO_LABELS,
        "Total number of connections yielded running due to hitting the memcached's -R limit.",
    ),
    top(
        M::ListenerDisabled,
        Counter,
        "connections_listener_disabled_total",
        NO_LABELS,
        "Number of times that memcached has hit its connections limit and disabled its listener.",
    ),
    top(
        M::CurrentBytes,
        Gauge,
        "current_bytes",
        NO_LABELS,
        "Current number of bytes used to store items.",
    ),
    top(
        M::LimitBytes,
        Gauge,
        "limit_bytes",
        NO_LABELS,
        "Number of bytes this server is allowed to use for storage.",
    ),
    top(
        M::Commands,
        Counter,
        "commands_total",
        &["command", "status"],
        "Total number of all requests broken down by command (get, set, etc.) and status.",
    ),
    top(
        M::Items,
        Gauge,
        "current_items",
        NO_LABELS,
        "Current number of items stored by this instance.",
    ),
    top(
        M::ItemsTotal,
        Counter,
        "items_total",
        NO_LABELS,
        "Total number of items stored during the life of this instance.",
    ),
    top(
        M::Evictions,
        Counter,
        "items_evicted_total",
        NO_LABELS,
        "Total number of valid items removed from cache to free memory for new items.",
    ),
    top(
        M::Reclaimed,
        Counter,
        "items_reclaimed_total",
        NO_LABELS,
        "Total number of times an entry was stored using memory from an expired entry.",
    ),
    crawler(
        M::LruCrawlerEnabled,
        Gauge,
        "enabled",
        "Whether the LRU crawler is enabled.",
    ),
    crawler(
        M::LruCrawlerSleep,
        Gauge,
        "sleep",
        "Microseconds to sleep between LRU crawls.",
    ),
    crawler(
        M::LruCrawlerMaxItems,
        Gauge,
        "to_crawl",
        "Max items to crawl per slab per run.",
    ),
    crawler(
        M::LruMaintainerThread,
        Gauge,
        "maintainer_thread",
        "Split LRU mode and background threads.",
    ),
    crawler(
        M::LruHotPercent,
        Gauge,
        "hot_percent",
        "Percent of slab memory reserved for HOT LRU.",
    ),
    crawler(
        M::LruWarmPercent,
        Gauge,
        "warm_percent",
        "Percent of slab memory reserved for WARM LRU.",
    ),
    crawler(
        M::LruHotMaxAgeFactor,
        Gauge,
        "hot_max_factor",
        "Set idle age of HOT LRU to COLD age * this",
    ),
    crawler(
        M::LruWarmMaxAgeFactor,
        Gauge,
        "warm_max_factor",
        "Set idle age of WARM LRU to COLD age * this",
    ),
    // Published under the literal namespace "namespace" since the first
    // release; renaming it would break existing queries.
    CatalogEntry {
        id: M::LruCrawlerStarts,
        kind: Untyped,
        namespace: "namespace",
        subsystem: SUBSYSTEM_LRU_CRAWLER,
        name: "starts",
        labels: NO_LABELS,
        help: "Times an LRU crawler was started.",
    },
    crawler(
        M::LruCrawlerReclaimed,
        Counter,
        "reclaimed_total",
        "Total items freed by LRU Crawler.",
    ),
    crawler(
        M::LruCrawlerItemsChecked,
        Counter,
        "items_checked_total",
        "Total items examined by LRU Crawler.",
    ),
    crawler(
        M::LruCrawlerMovesToCold,
        Counter,
        "moves_to_cold_total",
        "Total number of items moved from HOT/WARM to COLD LRU's.",
    ),
    crawler(
        M::LruCrawlerMovesToWarm,
        Counter,
        "moves_to_warm_total",
        "Total number of items moved from COLD to WARM LRU.",
    ),
    crawler(
        M::LruCrawlerMovesWithinLru,
        Counter,
        "moves_within_lru_total",
        "Total number of items reshuffled within HOT or WARM LRU's.",
    ),
    top(
        M::Malloced,
        Gauge,
        "malloced_bytes",
        NO_LABELS,
        "Number of bytes of memory allocated to slab pages.",
    ),
    slab(
        M::SlabItemsNumber,
        Gauge,
        "current_items",
        "Number of items currently stored in this slab class.",
    ),
    slab(
        M::SlabItemsAge,
        Gauge,
        "items_age_seconds",
        "Number of seconds the oldest item has been in the slab class.",
    ),
    slab(
        M::SlabItemsCrawlerReclaimed,
        Counter,
        "items_crawler_reclaimed_total",
        "Number of items freed by the LRU Crawler.",
    ),
    slab(
        M::SlabItemsEvicted,
        Counter,
        "items_evicted_total",
        "Total number of times an item had to be evicted from the LRU before it expired.",
    ),
    slab(
        M::SlabItemsEvictedNonzero,
        Counter,
        "items_evicted_nonzero_total",
        "Total number of times an item which had an explicit expire time set had to be evicted from the LRU before it expired.",
    ),
    slab(
        M::SlabItemsEvictedTime,
        Counter,
        "items_evicted_time_seconds",
        "Seconds since the last access for the most recent item evicted from this class.",
    ),
    slab(
        M::SlabItemsEvictedUnfetched,
        Counter,
        "items_evicted_unfetched_total",
        "Total nmber of items evicted and never fetched.",
    ),
    slab(
        M::SlabItemsExpiredUnfetched,
        Counter,
        "items_expired_unfetched_total",
        "Total number of valid items evicted from the LRU which were never touched after being set.",
    ),
    slab(
        M::SlabItemsOutOfMemory,
        Counter,
        "items_outofmemory_total",
        "Total number of items for this slab class that have triggered an out of memory error.",
    ),
    slab(
        M::SlabItemsReclaimed,
        Counter,
        "items_reclaimed_total",
        "Total number of items reclaimed.",
    ),
    slab(
        M::SlabItemsTailRepairs,
        Counter,
        "items_tailrepairs_total",
        "Total number of times the entries for a particular ID need repairing.",
    ),
    slab(
        M::SlabItemsMovesToCold,
        Counter,
        "items_moves_to_cold",
        "Number of items moved from HOT or WARM into COLD.",
    ),
    slab(
        M::SlabItemsMovesToWarm,
        Counter,
        "items_moves_to_warm",
        "Number of items moves from COLD into WARM.",
    ),
    slab(
        M::SlabItemsMovesWithinLru,
        Counter,
        "items_moves_within_lru",
        "Number of times active items were bumped within HOT or WARM.",
    ),
    slab(
        M::SlabChunkSize,
        Gauge,
        "chunk_size_bytes",
        "Number of bytes allocated to each chunk within this slab class.",
    ),
    slab(
        M::SlabChunksPerPage,
        Gauge,
        "chunks_per_page",
        "Number of chunks within a single page for this slab class.",
    ),
    slab(
        M::SlabCurrentPages,
        Gauge,
        "current_pages",
        "Number of pages allocated to this slab class.",
    ),
    slab(
        M::SlabCurrentChunks,
        Gauge,
        "current_chunks",
        "Number of chunks allocated to this slab class.",
    ),
    slab(
        M::SlabChunksUsed,
        Gauge,
        "chunks_used",
        "Number of chunks allocated to an item.",
    ),
    slab(
        M::SlabChunksFree,
        Gauge,
        "chunks_free",
        "Number of chunks not yet allocated items.",
    ),
    slab(
        M::SlabChunksFreeEnd,
        Gauge,
        "chunks_free_end",
        "Number of free chunks at the end of the last allocated page.",
    ),
    slab(
        M::SlabMemRequested,
        Gauge,
        "mem_requested_bytes",
        "Number of bytes of memory actual items take up within a slab.",
    ),
    CatalogEntry {
        id: M::SlabCommands,
        kind: Counter,
        namespace: NAMESPACE,
        subsystem: SUBSYSTEM_SLAB,
        name: "commands_total",
        labels: &["slab", "command", "status"],
        help: "Total number of all requests broken down by command (get, set, etc.) and status per slab.",
    },
];

/// Description pass: every declared metric, in catalog order.
pub fn describe() -> &'static [CatalogEntry] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_indexed_by_id() {
        for (idx, entry) in CATALOG.iter().enumerate() {
            assert_eq!(entry.id as usize, idx, "{:?} out of place", entry.id);
        }
        assert_eq!(MetricId::SlabCommands as usize, CATALOG.len() - 1);
    }

    #[test]
    fn test_fq_names_unique() {
        let names: HashSet<String> = CATALOG.iter().map(|e| e.fq_name()).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_fq_name_layout() {
        assert_eq!(MetricId::Up.entry().fq_name(), "memcached_up");
        assert_eq!(
            MetricId::LruCrawlerSleep.entry().fq_name(),
            "memcached_lru_crawler_sleep"
        );
        assert_eq!(
            MetricId::SlabChunkSize.entry().fq_name(),
            "memcached_slab_chunk_size_bytes"
        );
        assert_eq!(
            MetricId::LruCrawlerStarts.entry().fq_name(),
            "namespace_lru_crawler_starts"
        );
    }

    #[test]
    fn test_label_schemas() {
        assert!(MetricId::Up.labels().is_empty());
        assert_eq!(MetricId::Version.labels(), &["version"]);
        assert_eq!(MetricId::Commands.labels(), &["command", "status"]);
        assert_eq!(MetricId::SlabCommands.labels(), &["slab", "command", "status"]);
        for entry in CATALOG.iter().filter(|e| e.subsystem == SUBSYSTEM_SLAB) {
            assert_eq!(entry.labels.first(), Some(&"slab"), "{}", entry.fq_name());
        }
    }

    #[test]
    fn test_kinds() {
        assert_eq!(MetricId::Up.kind(), MetricKind::Gauge);
        assert_eq!(MetricId::Uptime.kind(), MetricKind::Counter);
        assert_eq!(MetricId::LruCrawlerStarts.kind(), MetricKind::Untyped);
        assert_eq!(MetricId::SlabItemsEvictedTime.kind(), MetricKind::Counter);
    }
}
