//! Values computed from several raw fields.

use super::parser::{FieldReader, parse_float};

/// Where a derived value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Server-wide `stats`.
    Global,
    /// One slab class of `stats slabs`.
    Slab,
}

impl Scope {
    /// CAS counters that memcached also folds into `cmd_set` for this scope.
    ///
    /// The per-slab variant does not subtract `cas_misses`.
    pub fn cas_fields(self) -> &'static [&'static str] {
        match self {
            Scope::Global => &["cas_misses", "cas_hits", "cas_badval"],
            Scope::Slab => &["cas_hits", "cas_badval"],
        }
    }
}

/// Number of plain `set` commands: `cmd_set` minus the CAS operations it
/// also counts.
///
/// NaN when `cmd_set` or any CAS field is missing or malformed. A bad
/// `cmd_set` short-circuits before the CAS fields are looked at.
pub fn derive_set_count(reader: &FieldReader<'_>, scope: Scope) -> f64 {
    let set = match parse_float(reader.get_raw("cmd_set")) {
        Ok(v) => v,
        Err(e) => {
            reader.report("cmd_set", &e);
            return f64::NAN;
        }
    };

    match reader.sum(scope.cas_fields()) {
        Ok(cas) => set - cas,
        Err((key, e)) => {
            reader.report(key, &e);
            f64::NAN
        }
    }
}
