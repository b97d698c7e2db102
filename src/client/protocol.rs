//! Parsing of memcached ASCII protocol stats replies.
//!
//! A reply is a sequence of `STAT <name> <value>` lines closed by `END`.
//! Anything else (`ERROR`, `CLIENT_ERROR ...`, `SERVER_ERROR ...`, garbage or
//! EOF) fails the whole reply.

use std::io::BufRead;

use crate::collector::model::{RawServerStats, SlabId, StatMap};
use crate::collector::traits::StatsError;

/// Stats commands issued by the client.
pub const CMD_STATS: &str = "stats";
pub const CMD_STATS_ITEMS: &str = "stats items";
pub const CMD_STATS_SLABS: &str = "stats slabs";
pub const CMD_STATS_SETTINGS: &str = "stats settings";

/// Reads one stats reply up to and including `END`.
///
/// Pairs are returned in wire order.
pub fn read_stats<R: BufRead>(reader: &mut R) -> Result<Vec<(String, String)>, StatsError> {
    let mut pairs = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(StatsError::Protocol(
                "connection closed before END".to_string(),
            ));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);

        if trimmed == "END" {
            return Ok(pairs);
        }
        match parse_stat_line(trimmed) {
            Some((name, value)) => pairs.push((name.to_string(), value.to_string())),
            None => return Err(reply_error(trimmed)),
        }
    }
}

/// Splits `STAT <name> <value>`. The value is the rest of the line and may
/// contain spaces or be empty.
pub fn parse_stat_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("STAT ")?;
    let (name, value) = rest.split_once(' ').unwrap_or((rest, ""));
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

fn reply_error(line: &str) -> StatsError {
    if line == "ERROR" {
        StatsError::Protocol("server does not understand the command".to_string())
    } else if let Some(msg) = line.strip_prefix("CLIENT_ERROR ") {
        StatsError::Protocol(format!("client error: {}", msg))
    } else if let Some(msg) = line.strip_prefix("SERVER_ERROR ") {
        StatsError::Protocol(format!("server error: {}", msg))
    } else {
        StatsError::Protocol(format!("unexpected line {:?}", line))
    }
}

/// Splits a `stats items` key, `items:<slab>:<field>`.
pub fn split_item_key(key: &str) -> Option<(SlabId, &str)> {
    split_slab_key(key.strip_prefix("items:")?)
}

/// Splits a `stats slabs` key, `<slab>:<field>`.
pub fn split_slab_key(key: &str) -> Option<(SlabId, &str)> {
    let (slab, field) = key.split_once(':')?;
    if field.is_empty() {
        return None;
    }
    Some((slab.parse().ok()?, field))
}

/// Stores a `stats` reply as the global map.
pub fn apply_global(stats: &mut RawServerStats, pairs: Vec<(String, String)>) {
    stats.global.extend(pairs);
}

/// Files a `stats items` reply under its slab ids. Keys that do not name a
/// slab are dropped.
pub fn apply_items(stats: &mut RawServerStats, pairs: Vec<(String, String)>) {
    for (key, value) in pairs {
        if let Some((slab, field)) = split_item_key(&key) {
            insert(&mut stats.items, slab, field, value);
        }
    }
}

/// Files a `stats slabs` reply under its slab ids.
///
/// Server-wide lines of the reply (`active_slabs`, `total_malloced`) go to
/// the global map unless `stats` already reported them.
pub fn apply_slabs(stats: &mut RawServerStats, pairs: Vec<(String, String)>) {
    for (key, value) in pairs {
        if let Some((slab, field)) = split_slab_key(&key) {
            insert(&mut stats.slabs, slab, field, value);
        } else if !key.contains(':') {
            stats.global.entry(key).or_insert(value);
        }
    }
}

fn insert(
    target: &mut std::collections::BTreeMap<SlabId, StatMap>,
    slab: SlabId,
    field: &str,
    value: String,
) {
    target
        .entry(slab)
        .or_default()
        .insert(field.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(input: &str) -> Result<Vec<(String, String)>, StatsError> {
        read_stats(&mut Cursor::new(input.as_bytes()))
    }

    #[test]
    fn test_read_stats() {
        let pairs = read("STAT pid 4242\r\nSTAT uptime 86400\r\nSTAT version 1.6.21\r\nEND\r\n")
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("pid".to_string(), "4242".to_string()),
                ("uptime".to_string(), "86400".to_string()),
                ("version".to_string(), "1.6.21".to_string()),
            ]
        );
    }

    #[test]
    fn test_value_keeps_spaces() {
        let pairs = read("STAT libevent 2.1.12-stable extra\r\nSTAT empty\r\nEND\r\n").unwrap();
        assert_eq!(pairs[0].1, "2.1.12-stable extra");
        assert_eq!(pairs[1], ("empty".to_string(), String::new()));
    }

    #[test]
    fn test_stops_at_end() {
        let mut cursor = Cursor::new(b"STAT a 1\r\nEND\r\nSTAT b 2\r\nEND\r\n".as_slice());
        assert_eq!(read_stats(&mut cursor).unwrap().len(), 1);
        assert_eq!(read_stats(&mut cursor).unwrap()[0].0, "b");
    }

    #[test]
    fn test_error_replies() {
        let err = read("ERROR\r\n").unwrap_err();
        assert!(matches!(err, StatsError::Protocol(_)));

        let err = read("STAT a 1\r\nCLIENT_ERROR bad command line format\r\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "protocol error: client error: bad command line format"
        );

        let err = read("SERVER_ERROR out of memory\r\n").unwrap_err();
        assert!(err.to_string().contains("out of memory"));

        let err = read("VALUE foo 0 3\r\n").unwrap_err();
        assert!(err.to_string().contains("unexpected line"));
    }

    #[test]
    fn test_eof_before_end() {
        let err = read("STAT a 1\r\n").unwrap_err();
        assert!(err.to_string().contains("before END"));
        assert!(read("").is_err());
    }

    #[test]
    fn test_split_keys() {
        assert_eq!(split_item_key("items:1:number"), Some((1, "number")));
        assert_eq!(split_item_key("items:12:evicted_time"), Some((12, "evicted_time")));
        assert_eq!(split_item_key("items:x:number"), None);
        assert_eq!(split_item_key("items:1:"), None);
        assert_eq!(split_item_key("1:number"), None);

        assert_eq!(split_slab_key("5:chunk_size"), Some((5, "chunk_size")));
        assert_eq!(split_slab_key("total_malloced"), None);
        assert_eq!(split_slab_key("-1:chunk_size"), None);
    }

    #[test]
    fn test_apply_items_and_slabs() {
        let mut stats = RawServerStats::new("s1");
        apply_global(
            &mut stats,
            vec![("total_malloced".to_string(), "100".to_string())],
        );
        apply_items(
            &mut stats,
            vec![
                ("items:1:number".to_string(), "10".to_string()),
                ("items:1:age".to_string(), "30".to_string()),
                ("items:bogus:age".to_string(), "1".to_string()),
                ("items:5:number".to_string(), "2".to_string()),
            ],
        );
        apply_slabs(
            &mut stats,
            vec![
                ("1:chunk_size".to_string(), "96".to_string()),
                ("active_slabs".to_string(), "1".to_string()),
                ("total_malloced".to_string(), "200".to_string()),
            ],
        );

        assert_eq!(stats.items.keys().copied().collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(stats.items[&1]["age"], "30");
        assert_eq!(stats.items[&1].len(), 2);
        assert_eq!(stats.slabs[&1]["chunk_size"], "96");
        assert_eq!(stats.global["active_slabs"], "1");
        // `stats` wins over `stats slabs`
        assert_eq!(stats.global["total_malloced"], "100");
    }
}
