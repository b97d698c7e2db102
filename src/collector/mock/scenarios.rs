//! Pre-built stats fixtures.
//!
//! Values are modelled on a memcached 1.6 instance with two populated slab
//! classes (1 and 5). Slab 1 reports the full set of optional item counters,
//! slab 5 only `evicted`, like an older server would.

use crate::collector::model::{RawServerStats, RawSettings, StatMap};

use super::source::MockSource;

fn stat_map(pairs: &[(&str, &str)]) -> StatMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl MockSource {
    /// One healthy server with stats, items, slabs and settings.
    pub fn typical_server() -> Self {
        Self::new()
            .with_server(typical_stats("mock:11211"))
            .with_settings(typical_settings("mock:11211"))
    }
}

/// `stats` / `stats items` / `stats slabs` of a healthy server.
pub fn typical_stats(server: &str) -> RawServerStats {
    let mut stats = RawServerStats::new(server);

    stats.global = stat_map(&[
        ("pid", "4242"),
        ("uptime", "86400"),
        ("version", "1.6.21"),
        ("curr_connections", "10"),
        ("total_connections", "500"),
        ("conn_yields", "0"),
        ("listen_disabled_num", "0"),
        ("cmd_get", "1000"),
        ("cmd_set", "100"),
        ("cmd_flush", "1"),
        ("cmd_touch", "7"),
        ("get_hits", "900"),
        ("get_misses", "100"),
        ("delete_hits", "4"),
        ("delete_misses", "1"),
        ("incr_hits", "6"),
        ("incr_misses", "0"),
        ("decr_hits", "2"),
        ("decr_misses", "0"),
        ("cas_hits", "3"),
        ("cas_misses", "5"),
        ("cas_badval", "2"),
        ("touch_hits", "6"),
        ("touch_misses", "1"),
        ("bytes_read", "123456"),
        ("bytes_written", "654321"),
        ("limit_maxbytes", "67108864"),
        ("bytes", "2048"),
        ("curr_items", "12"),
        ("total_items", "150"),
        ("evictions", "3"),
        ("reclaimed", "0"),
        ("lru_crawler_starts", "12"),
        ("crawler_items_checked", "340"),
        ("crawler_reclaimed", "8"),
        ("moves_to_cold", "20"),
        ("moves_to_warm", "4"),
        ("moves_within_lru", "2"),
        ("active_slabs", "2"),
        ("total_malloced", "2097152"),
    ]);

    stats.items.insert(
        1,
        stat_map(&[
            ("number", "10"),
            ("number_hot", "0"),
            ("number_warm", "0"),
            ("number_cold", "10"),
            ("age", "300"),
            ("evicted", "3"),
            ("evicted_nonzero", "0"),
            ("evicted_time", "0"),
            ("outofmemory", "0"),
            ("tailrepairs", "0"),
            ("reclaimed", "0"),
            ("expired_unfetched", "0"),
            ("evicted_unfetched", "0"),
            ("crawler_reclaimed", "0"),
            ("moves_to_cold", "1"),
            ("moves_to_warm", "0"),
            ("moves_within_lru", "0"),
        ]),
    );
    stats.items.insert(
        5,
        stat_map(&[("number", "2"), ("age", "120"), ("evicted", "0")]),
    );

    stats.slabs.insert(
        1,
        stat_map(&[
            ("chunk_size", "96"),
            ("chunks_per_page", "10922"),
            ("total_pages", "1"),
            ("total_chunks", "10922"),
            ("used_chunks", "10"),
            ("free_chunks", "10912"),
            ("free_chunks_end", "0"),
            ("mem_requested", "800"),
            ("get_hits", "400"),
            ("cmd_set", "50"),
            ("delete_hits", "1"),
            ("incr_hits", "0"),
            ("decr_hits", "0"),
            ("cas_hits", "2"),
            ("cas_badval", "1"),
            ("touch_hits", "3"),
        ]),
    );
    stats.slabs.insert(
        5,
        stat_map(&[
            ("chunk_size", "240"),
            ("chunks_per_page", "4369"),
            ("total_pages", "1"),
            ("total_chunks", "4369"),
            ("used_chunks", "2"),
            ("free_chunks", "4367"),
            ("free_chunks_end", "0"),
            ("mem_requested", "4096"),
            ("get_hits", "20"),
            ("cmd_set", "5"),
            ("delete_hits", "0"),
            ("incr_hits", "0"),
            ("decr_hits", "0"),
            ("cas_hits", "0"),
            ("cas_badval", "0"),
            ("touch_hits", "0"),
        ]),
    );

    stats
}

/// `stats settings` of a healthy server.
pub fn typical_settings(server: &str) -> RawSettings {
    let mut settings = RawSettings::new(server);
    settings.settings = stat_map(&[
        ("maxbytes", "67108864"),
        ("maxconns", "1024"),
        ("tcpport", "11211"),
        ("evictions", "on"),
        ("lru_crawler", "yes"),
        ("lru_crawler_sleep", "100"),
        ("lru_crawler_tocrawl", "0"),
        ("lru_maintainer_thread", "no"),
        ("hot_lru_pct", "20"),
        ("warm_lru_pct", "40"),
        ("hot_max_factor", "0.20"),
        ("warm_max_factor", "2.00"),
    ]);
    settings
}
