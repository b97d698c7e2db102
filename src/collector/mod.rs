//! Memcached stats translation engine.
//!
//! Turns the text key/value output of memcached's `stats`, `stats items`,
//! `stats slabs` and `stats settings` commands into typed observations of
//! the metrics declared in [`crate::catalog`].
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Collector                          │
//! │   up ─► global stats ─► item slabs ─► slabs ─► settings   │
//! │                 │                        │                │
//! │          ┌──────▼──────┐          ┌──────▼──────┐         │
//! │          │ FieldReader │          │ Diagnostics │         │
//! │          └─────────────┘          └─────────────┘         │
//! │                        ┌──────────────┐                   │
//! │                        │ StatsSource  │ (trait)           │
//! │                        └──────┬───────┘                   │
//! └───────────────────────────────┼───────────────────────────┘
//!                  ┌──────────────┴──────────────┐
//!           ┌──────▼──────────┐           ┌──────▼──────┐
//!           │ MemcachedClient │           │ MockSource  │
//!           │ (TCP / unix)    │           │ (Testing)   │
//!           └─────────────────┘           └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use memcached_exporter::catalog::MetricId;
//! use memcached_exporter::collector::{Collector, MockSource, ServerAddress, Target};
//!
//! let target = Target::new(
//!     ServerAddress::Tcp("localhost:11211".to_string()),
//!     Duration::from_secs(1),
//! );
//! let collector = Collector::new(MockSource::typical_server(), target);
//! let observations = collector.collect();
//! assert_eq!(observations[0].metric(), MetricId::Up);
//! assert_eq!(observations[0].value(), 1.0);
//! ```

#[allow(clippy::module_inception)]
mod collector;
mod derive;
pub mod mock;
pub mod model;
mod observation;
pub mod parser;
pub mod traits;

pub use collector::{Collector, ServerState};
pub use derive::{Scope, derive_set_count};
pub use mock::{MockSource, RecordingDiagnostics};
pub use model::{RawServerStats, RawSettings, SlabId, StatMap};
pub use observation::{Observation, ObservationError, ObservationSink};
pub use parser::{
    Diagnostics, FieldError, FieldReader, TracingDiagnostics, parse_bool_flag, parse_numeric,
};
pub use traits::{ServerAddress, StatsError, StatsSource, Target};
