/// Scanner configuration.
///
/// Passed explicitly into the scanner rather than read from process-wide
/// globals, so tests can run scans side by side with different ignore sets
/// and worker counts.
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound for the default worker count.
pub const MAX_DEFAULT_THREADS: usize = 32;

/// Default workers per logical CPU. Directory listing is I/O-bound, so
/// oversubscribing the CPUs keeps the disk queue full.
pub const THREADS_PER_CPU: usize = 4;

/// Default zstd level for persisted children lists.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Name of the directory holding one store file per scanned root.
pub const DATA_DIR_NAME: &str = "DiskMapData";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Explicit worker count. `None` uses [`default_worker_count`].
    pub threads: Option<usize>,

    /// Directories that are never entered (pseudo filesystems and the like).
    /// Compared against normalised paths.
    pub ignore_paths: Vec<PathBuf>,

    /// Where store files are written.
    pub data_dir: PathBuf,

    /// zstd level used when compressing children lists.
    pub compression_level: i32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: None,
            ignore_paths: default_ignore_paths(),
            data_dir: default_data_dir(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl ScanConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_ignore_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.ignore_paths = paths;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Number of worker threads a scan will start. Never zero.
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(default_worker_count).max(1)
    }
}

/// `min(32, logical_cpus * 4)`.
pub fn default_worker_count() -> usize {
    (num_cpus::get() * THREADS_PER_CPU).min(MAX_DEFAULT_THREADS)
}

/// Pseudo filesystems and volatile trees that a disk usage scan should skip.
pub fn default_ignore_paths() -> Vec<PathBuf> {
    if cfg!(windows) {
        Vec::new()
    } else {
        ["/proc", "/sys", "/dev", "/run", "/tmp"]
            .iter()
            .map(PathBuf::from)
            .collect()
    }
}

/// `DiskMapData` next to the running executable, or in the current
/// directory if the executable location is unknown.
pub fn default_data_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn worker_count_respects_override_and_floor() {
        assert_eq!(ScanConfig::default().with_threads(3).worker_count(), 3);
        assert_eq!(ScanConfig::default().with_threads(0).worker_count(), 1);
    }

    #[test]
    fn default_worker_count_is_capped() {
        let n = default_worker_count();
        assert!(n >= 1);
        assert!(n <= MAX_DEFAULT_THREADS);
    }

    #[test]
    fn json_fields_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "threads": 2, "ignore_paths": ["/mnt/backup"] }}"#).unwrap();

        let config = ScanConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.ignore_paths, vec![PathBuf::from("/mnt/backup")]);
        assert_eq!(config.compression_level, DEFAULT_COMPRESSION_LEVEL);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ threads: ").unwrap();

        let err = ScanConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ScanConfig::from_json_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
