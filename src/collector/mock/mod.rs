//! In-memory stats source and diagnostics for testing collectors without a
//! running memcached.

mod scenarios;
mod source;

pub use source::{MockSource, RecordingDiagnostics};
