//! Resource usage of the memcached process itself.
//!
//! The process is located through its PID file, which is re-read on every
//! scrape so that a restarted memcached is picked up without restarting the
//! exporter. Metric names are those of the `prometheus` crate's process
//! collector under the `memcached` namespace (`memcached_process_*`).

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use prometheus::core::{Collector, Desc};
use prometheus::process_collector::ProcessCollector;
use prometheus::proto::MetricFamily;
use tracing::error;

use crate::catalog::NAMESPACE;

/// Error type for PID file handling.
#[derive(Debug)]
pub enum PidFileError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, content: String },
}

impl fmt::Display for PidFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PidFileError::Read { path, source } => {
                write!(f, "can't read pid file {:?}: {}", path, source)
            }
            PidFileError::Parse { path, content } => {
                write!(f, "can't parse pid file {:?}: invalid pid {:?}", path, content)
            }
        }
    }
}

impl std::error::Error for PidFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PidFileError::Read { source, .. } => Some(source),
            PidFileError::Parse { .. } => None,
        }
    }
}

/// Reads a PID file. Surrounding whitespace is ignored.
pub fn read_pid_file(path: &Path) -> Result<i32, PidFileError> {
    let content = fs::read_to_string(path).map_err(|source| PidFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = content.trim();
    match trimmed.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(PidFileError::Parse {
            path: path.to_path_buf(),
            content: trimmed.to_string(),
        }),
    }
}

/// Process collector following a PID file.
pub struct PidFileCollector {
    path: PathBuf,
    // Only used for its descriptors, which do not depend on the pid.
    template: ProcessCollector,
}

impl PidFileCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template: ProcessCollector::new(std::process::id() as i32, NAMESPACE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Collector for PidFileCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.template.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match read_pid_file(&self.path) {
            Ok(pid) => ProcessCollector::new(pid, NAMESPACE).collect(),
            Err(e) => {
                error!(error = %e, "skipping memcached process metrics");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pid_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_pid_file() {
        let file = pid_file("1234\n");
        assert_eq!(read_pid_file(file.path()).unwrap(), 1234);

        let file = pid_file("  42  ");
        assert_eq!(read_pid_file(file.path()).unwrap(), 42);
    }

    #[test]
    fn test_read_pid_file_rejects_garbage() {
        for content in ["", "memcached", "12 34", "-5", "0"] {
            let file = pid_file(content);
            let err = read_pid_file(file.path()).unwrap_err();
            assert!(matches!(err, PidFileError::Parse { .. }), "{content:?}: {err}");
        }
    }

    #[test]
    fn test_read_pid_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memcached.pid");
        let err = read_pid_file(&path).unwrap_err();
        assert!(matches!(err, PidFileError::Read { .. }));
        assert!(err.to_string().starts_with("can't read pid file"));
    }

    #[test]
    fn test_collects_process_named_in_pid_file() {
        let file = pid_file(&format!("{}\n", std::process::id()));
        let registry = Registry::new();
        registry
            .register(Box::new(PidFileCollector::new(file.path())))
            .unwrap();

        let families = registry.gather();
        assert!(
            families
                .iter()
                .any(|f| f.get_name() == "memcached_process_resident_memory_bytes"),
            "{:?}",
            families.iter().map(|f| f.get_name()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unreadable_pid_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let collector = PidFileCollector::new(dir.path().join("missing.pid"));
        assert!(!collector.desc().is_empty());
        assert!(collector.collect().is_empty());
    }
}
