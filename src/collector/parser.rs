//! Scalar parsing of raw stat values.
//!
//! memcached prints every stat as text. The functions here turn one field
//! into an `f64`, using NaN as the "could not be determined" sentinel so a
//! single bad field never aborts a scrape. Failures are reported through an
//! injected [`Diagnostics`] sink instead of being returned.

use std::fmt;

use tracing::{error, warn};

use super::model::StatMap;
use super::traits::StatsError;

/// Why a single field could not be turned into a number.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The key is not present in the stat map.
    Missing,
    /// The value is not a decimal numeral.
    InvalidNumber(String),
    /// The value is neither `yes` nor `no`.
    InvalidFlag(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Missing => f.write_str("field not present"),
            FieldError::InvalidNumber(raw) => write!(f, "invalid number {:?}", raw),
            FieldError::InvalidFlag(raw) => write!(f, "invalid flag {:?}, expected yes or no", raw),
        }
    }
}

impl std::error::Error for FieldError {}

/// Parses a raw value as `f64`.
pub fn parse_float(raw: Option<&str>) -> Result<f64, FieldError> {
    let raw = raw.ok_or(FieldError::Missing)?;
    raw.parse::<f64>()
        .map_err(|_| FieldError::InvalidNumber(raw.to_string()))
}

/// Parses a `yes`/`no` setting as `1.0`/`0.0`.
pub fn parse_flag(raw: Option<&str>) -> Result<f64, FieldError> {
    match raw {
        Some("yes") => Ok(1.0),
        Some("no") => Ok(0.0),
        Some(other) => Err(FieldError::InvalidFlag(other.to_string())),
        None => Err(FieldError::Missing),
    }
}

/// Sink for problems that degrade a scrape without failing it.
///
/// Shared between concurrent collection cycles, hence `Send + Sync`.
pub trait Diagnostics: Send + Sync {
    /// A field could not be parsed; the corresponding observation is NaN.
    fn field_error(&self, server: &str, field: &str, error: &FieldError);

    /// `stats` could not be fetched; the server is reported as down.
    fn stats_unavailable(&self, server: &str, error: &StatsError);

    /// `stats settings` could not be fetched; settings metrics are skipped.
    fn settings_unavailable(&self, server: &str, error: &StatsError);
}

/// Production diagnostics: forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn field_error(&self, server: &str, field: &str, error: &FieldError) {
        error!(server, field, error = %error, "failed to parse stat");
    }

    fn stats_unavailable(&self, server: &str, error: &StatsError) {
        error!(server, error = %error, "failed to collect stats from memcached");
    }

    fn settings_unavailable(&self, server: &str, error: &StatsError) {
        warn!(server, error = %error, "could not query stats settings");
    }
}

/// Fail-soft view over one stat map of one server.
pub struct FieldReader<'a> {
    fields: &'a StatMap,
    server: &'a str,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a StatMap, server: &'a str, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            fields,
            server,
            diagnostics,
        }
    }

    /// Whether the server printed `key` at all.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Raw value of `key`, empty when absent.
    pub fn raw(&self, key: &str) -> &'a str {
        self.fields.get(key).map(String::as_str).unwrap_or_default()
    }

    /// Parses `key` as a number, or reports and returns NaN.
    pub fn numeric(&self, key: &str) -> f64 {
        self.or_nan(key, parse_float(self.get_raw(key)))
    }

    /// Parses `key` as a `yes`/`no` flag, or reports and returns NaN.
    pub fn bool_flag(&self, key: &str) -> f64 {
        self.or_nan(key, parse_flag(self.get_raw(key)))
    }

    /// Sums `keys`, stopping at the first field that does not parse.
    ///
    /// Returns the offending key alongside the error.
    pub fn sum<'k>(&self, keys: &[&'k str]) -> Result<f64, (&'k str, FieldError)> {
        keys.iter().try_fold(0.0, |acc, key| {
            parse_float(self.get_raw(key))
                .map(|v| acc + v)
                .map_err(|e| (*key, e))
        })
    }

    pub(crate) fn report(&self, key: &str, error: &FieldError) {
        self.diagnostics.field_error(self.server, key, error);
    }

    pub(crate) fn get_raw(&self, key: &str) -> Option<&'a str> {
        self.fields.get(key).map(String::as_str)
    }

    fn or_nan(&self, key: &str, parsed: Result<f64, FieldError>) -> f64 {
        parsed.unwrap_or_else(|e| {
            self.report(key, &e);
            f64::NAN
        })
    }
}

/// Parses `key` from `fields`; NaN plus a diagnostic on failure.
pub fn parse_numeric(fields: &StatMap, key: &str, server: &str, diagnostics: &dyn Diagnostics) -> f64 {
    FieldReader::new(fields, server, diagnostics).numeric(key)
}

/// Parses a `yes`/`no` field from `fields`; NaN plus a diagnostic otherwise.
pub fn parse_bool_flag(
    fields: &StatMap,
    key: &str,
    server: &str,
    diagnostics: &dyn Diagnostics,
) -> f64 {
    FieldReader::new(fields, server, diagnostics).bool_flag(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::RecordingDiagnostics;

    fn map(pairs: &[(&str, &str)]) -> StatMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float(Some("42")), Ok(42.0));
        assert_eq!(parse_float(Some("0.25")), Ok(0.25));
        assert_eq!(parse_float(Some("1e3")), Ok(1000.0));
        assert_eq!(parse_float(Some("-7")), Ok(-7.0));
        assert_eq!(parse_float(None), Err(FieldError::Missing));
        assert_eq!(
            parse_float(Some("abc")),
            Err(FieldError::InvalidNumber("abc".to_string()))
        );
        assert!(parse_float(Some("")).is_err());
        assert!(parse_float(Some(" 1")).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(Some("yes")), Ok(1.0));
        assert_eq!(parse_flag(Some("no")), Ok(0.0));
        assert_eq!(parse_flag(None), Err(FieldError::Missing));
        assert_eq!(
            parse_flag(Some("true")),
            Err(FieldError::InvalidFlag("true".to_string()))
        );
        assert!(parse_flag(Some("YES")).is_err());
        assert!(parse_flag(Some("1")).is_err());
    }

    #[test]
    fn test_parse_numeric_never_fails() {
        let diag = RecordingDiagnostics::default();
        let fields = map(&[("uptime", "3600"), ("version", "1.6.21"), ("empty", "")]);

        assert_eq!(parse_numeric(&fields, "uptime", "s1", &diag), 3600.0);
        assert!(parse_numeric(&fields, "version", "s1", &diag).is_nan());
        assert!(parse_numeric(&fields, "empty", "s1", &diag).is_nan());
        assert!(parse_numeric(&fields, "absent", "s1", &diag).is_nan());

        let fields_reported = diag.fields();
        assert_eq!(fields_reported, vec!["version", "empty", "absent"]);
        assert!(diag.entries().iter().all(|e| e.contains("s1")));
    }

    #[test]
    fn test_parse_bool_flag() {
        let diag = RecordingDiagnostics::default();
        let fields = map(&[
            ("lru_crawler", "yes"),
            ("lru_maintainer_thread", "no"),
            ("odd", "maybe"),
        ]);

        assert_eq!(parse_bool_flag(&fields, "lru_crawler", "s1", &diag), 1.0);
        assert_eq!(
            parse_bool_flag(&fields, "lru_maintainer_thread", "s1", &diag),
            0.0
        );
        assert!(parse_bool_flag(&fields, "odd", "s1", &diag).is_nan());
        assert!(parse_bool_flag(&fields, "absent", "s1", &diag).is_nan());
        assert_eq!(diag.fields(), vec!["odd", "absent"]);
    }

    #[test]
    fn test_sum_stops_at_first_bad_field() {
        let diag = RecordingDiagnostics::default();
        let fields = map(&[("a", "1"), ("b", "x"), ("c", "3")]);
        let reader = FieldReader::new(&fields, "s1", &diag);

        assert_eq!(reader.sum(&["a", "c"]), Ok(4.0));
        assert_eq!(reader.sum(&[]), Ok(0.0));
        let (key, err) = reader.sum(&["a", "b", "c"]).unwrap_err();
        assert_eq!(key, "b");
        assert_eq!(err, FieldError::InvalidNumber("x".to_string()));
        // sum itself does not report
        assert!(diag.entries().is_empty());
    }

    #[test]
    fn test_reader_raw_and_contains() {
        let diag = RecordingDiagnostics::default();
        let fields = map(&[("version", "1.6.21")]);
        let reader = FieldReader::new(&fields, "s1", &diag);

        assert!(reader.contains("version"));
        assert!(!reader.contains("uptime"));
        assert_eq!(reader.raw("version"), "1.6.21");
        assert_eq!(reader.raw("uptime"), "");
    }
}
