/// Scanner module: walks a tree, reduces it, and persists the result.
///
/// The pipeline for one root is:
/// 1. **Scan**: a worker pool lists every directory once ([`pool`]).
/// 2. **Aggregate**: directory sizes are summed bottom-up.
/// 3. **Collapse**: empty directories are pruned and single-child chains
///    are skipped over.
/// 4. **Write**: the result is projected and written to the root's store.
///
/// [`start_scan`] runs the whole pipeline on a background thread and hands
/// back a [`ScanHandle`] for progress and cancellation. A cancelled scan
/// never touches the store.
pub mod pool;
pub mod progress;
pub mod queue;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::model::{CollapseStats, RecordSet};
use crate::platform::{mounts, normalize, path_key, used_space};
use crate::store::{catalog, project, ScanStore};
use chrono::Local;
use crossbeam_channel::Receiver;
use pool::ScanContext;
use progress::{EventSink, ProgressCounter, ProgressSnapshot, ScanPhase, ScanProgress};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of progress messages that may queue up in the channel.
///
/// When the channel is full, intermediate messages are dropped and the
/// terminal message evicts the oldest ones; the scan never waits on it.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// A scanned, aggregated and collapsed tree.
#[derive(Debug)]
pub struct TreeScan {
    pub records: RecordSet,
    pub dirs_scanned: u64,
    pub error_count: u64,
    pub collapse: CollapseStats,
}

/// Outcome of a completed, persisted scan.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub store_path: PathBuf,
    pub used_size: u64,
    pub dirs_scanned: u64,
    pub nodes_written: usize,
    pub error_count: u64,
    pub bytes_written: u64,
    pub duration: Duration,
}

/// Scan, aggregate and collapse the tree below `root`.
///
/// Returns `Ok(None)` if `cancel` was raised during the walk. Nothing is
/// persisted.
pub fn scan_tree(
    root: &Path,
    config: &ScanConfig,
    cancel: &AtomicBool,
    progress: &ProgressCounter,
    events: &EventSink,
) -> Result<Option<TreeScan>, ScanError> {
    let root = normalize(root);
    let meta = fs::metadata(&root).map_err(|source| ScanError::RootUnavailable {
        path: root.clone(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::RootUnavailable {
            path: root,
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let ctx = ScanContext::new(config, cancel, progress, events);
    info!(
        "Scanning {} with {} workers",
        root.display(),
        ctx.workers()
    );
    events.report(ScanProgress::Phase(ScanPhase::Scanning));

    let walk_start = Instant::now();
    let Some(mut records) = pool::run_pool(root, mounts::device_id(&meta), &ctx)? else {
        info!("Scan cancelled after {} directories", ctx.dirs_scanned());
        return Ok(None);
    };
    debug!(
        "Walked {} directories in {:.2?} ({} errors)",
        ctx.dirs_scanned(),
        walk_start.elapsed(),
        ctx.error_count()
    );

    events.report(ScanProgress::Phase(ScanPhase::Aggregating));
    records.aggregate_sizes();

    events.report(ScanProgress::Phase(ScanPhase::Collapsing));
    let collapse = records.collapse();

    Ok(Some(TreeScan {
        records,
        dirs_scanned: ctx.dirs_scanned(),
        error_count: ctx.error_count(),
        collapse,
    }))
}

/// Run the full pipeline for `root` and write its store under
/// `config.data_dir`.
///
/// Returns `Ok(None)` when cancelled; the existing store is left as is.
/// A failed write is an error; the previous store stays intact.
pub fn run_scan(
    root: &Path,
    config: &ScanConfig,
    cancel: &AtomicBool,
    progress: &ProgressCounter,
    events: &EventSink,
) -> Result<Option<ScanSummary>, ScanError> {
    let start = Instant::now();
    let root = normalize(root);

    let total_estimate = used_space(&root).unwrap_or_else(|e| {
        warn!("No size estimate for {}: {e}", root.display());
        0
    });
    progress.set_total_estimate(total_estimate);
    events.report(ScanProgress::Started {
        root: path_key(&root),
        total_estimate,
    });

    let scan = match scan_tree(&root, config, cancel, progress, events)? {
        Some(scan) if !cancel.load(Ordering::Relaxed) => scan,
        _ => {
            events.finish(ScanProgress::Cancelled);
            return Ok(None);
        }
    };

    events.report(ScanProgress::Phase(ScanPhase::Writing));
    let used_size = scan.records.used_size(&root).unwrap_or(0);
    let projection = project(&scan.records, Local::now(), config.compression_level)?;
    let nodes_written = projection.node_count();

    let store_path = catalog::store_path(&config.data_dir, &root);
    let mut store = ScanStore::new(&store_path);
    let bytes_written = store.write(projection)?;
    store.close();

    let summary = ScanSummary {
        root,
        store_path,
        used_size,
        dirs_scanned: scan.dirs_scanned,
        nodes_written,
        error_count: scan.error_count,
        bytes_written,
        duration: start.elapsed(),
    };
    info!(
        "Scan of {} complete: {} dirs, {} nodes kept ({} pruned, {} collapsed), {} errors, {:.2?}",
        summary.root.display(),
        summary.dirs_scanned,
        summary.nodes_written,
        scan.collapse.pruned,
        scan.collapse.collapsed,
        summary.error_count,
        summary.duration
    );
    events.finish(ScanProgress::Complete {
        duration: summary.duration,
        dirs_scanned: summary.dirs_scanned,
        error_count: summary.error_count,
        used_size: summary.used_size,
        store_path: summary.store_path.clone(),
    });
    Ok(Some(summary))
}

/// Handle to a running or completed scan. Allows cancellation and
/// receiving progress updates.
pub struct ScanHandle {
    /// Receiver for progress events from the scan thread.
    pub progress_rx: Receiver<ScanProgress>,
    progress: Arc<ProgressCounter>,
    cancel_flag: Arc<AtomicBool>,
    thread: thread::JoinHandle<Result<Option<ScanSummary>, ScanError>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Bytes seen so far against the volume estimate.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the scan thread exits and return its outcome.
    ///
    /// Undrained progress events are discarded.
    pub fn wait(self) -> Result<Option<ScanSummary>, ScanError> {
        let Self {
            progress_rx,
            thread,
            ..
        } = self;
        drop(progress_rx);
        thread.join().map_err(|_| ScanError::WorkerPanicked)?
    }
}

/// Start a scan of `root` on a background thread.
pub fn start_scan(root: PathBuf, config: ScanConfig) -> io::Result<ScanHandle> {
    let (events, progress_rx) = EventSink::bounded(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(ProgressCounter::new());

    let cancel = Arc::clone(&cancel_flag);
    let counter = Arc::clone(&progress);
    let thread = thread::Builder::new()
        .name("diskmap-scanner".into())
        .spawn(move || {
            info!("Starting scan of {}", root.display());
            let outcome = run_scan(&root, &config, &cancel, &counter, &events);
            if let Err(e) = &outcome {
                warn!("Scan of {} failed: {e}", root.display());
                events.finish(ScanProgress::Failed {
                    message: e.to_string(),
                });
            }
            outcome
        })?;

    Ok(ScanHandle {
        progress_rx,
        progress,
        cancel_flag,
        thread,
    })
}
