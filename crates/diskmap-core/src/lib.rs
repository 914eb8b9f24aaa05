/// DiskMap Core: scanning, aggregation, and persistent storage.
///
/// This crate contains all business logic with zero UI dependencies.
/// A presentation layer (treemap GUI, CLI, TUI) consumes scan results
/// through [`store::ScanStore`] without ever rescanning.
///
/// # Modules
///
/// - [`model`]: Per-directory scan records, aggregation and collapsing.
/// - [`scanner`]: Concurrent worker-pool traversal with progress reporting.
/// - [`store`]: Offset-indexed blob store and the typed scan-result layer on top.
/// - [`platform`]: Path normalisation, volume usage and mount detection.
/// - [`config`]: Explicit scanner configuration.
/// - [`error`]: Error types shared across the crate.
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod scanner;
pub mod store;

pub use config::ScanConfig;
pub use error::{ConfigError, ScanError, StoreError};
