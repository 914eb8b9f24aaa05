//! DiskMap: concurrent disk usage scanner.
//!
//! Thin binary entry point. All logic lives in the `diskmap-core` crate.
//!
//! Usage: `diskmap [ROOT...]`. Without arguments every start directory of
//! the machine is scanned (`/`, or each drive on Windows).
//!
//! Environment:
//! - `DISKMAP_CONFIG`: path to a JSON config file.
//! - `DISKMAP_THREADS`: worker count override.

use anyhow::{bail, Context};
use diskmap_core::model::size::{format_bytes, format_progress};
use diskmap_core::platform::{normalize, path_key, start_directories};
use diskmap_core::scanner::progress::ScanProgress;
use diskmap_core::scanner::{start_scan, ScanSummary};
use diskmap_core::store::{load_catalog, ScanStore};
use diskmap_core::ScanConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How often the progress line is refreshed.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("DiskMap starting");

    let config = load_config()?;
    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let roots = if args.is_empty() {
        start_directories()
    } else {
        args
    };
    if roots.is_empty() {
        bail!("no directories to scan");
    }

    let catalog = load_catalog(&config.data_dir)
        .with_context(|| format!("cannot open data directory {}", config.data_dir.display()))?;
    for root in &roots {
        if let Some(store_path) = catalog.get(&path_key(&normalize(root))) {
            report_previous(store_path);
        }
    }

    let mut failures = 0usize;
    for root in roots {
        match scan_one(&root, config.clone()) {
            Ok(Some(summary)) => print_summary(&summary),
            Ok(None) => println!("{}: cancelled", root.display()),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {e:#}", root.display());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} scan(s) failed");
    }
    Ok(())
}

fn load_config() -> anyhow::Result<ScanConfig> {
    let mut config = match std::env::var_os("DISKMAP_CONFIG") {
        Some(path) => ScanConfig::from_json_file(Path::new(&path))?,
        None => ScanConfig::default(),
    };
    if let Some(threads) = std::env::var_os("DISKMAP_THREADS") {
        let threads = threads
            .to_string_lossy()
            .parse::<usize>()
            .context("DISKMAP_THREADS must be a positive integer")?;
        config = config.with_threads(threads);
    }
    Ok(config)
}

fn report_previous(store_path: &Path) {
    let mut store = ScanStore::new(store_path);
    if store.open().is_err() {
        return;
    }
    if let (Ok(Some(root)), Ok(Some(at))) = (store.root(), store.scanned_at()) {
        let size = store.used_size(&root).ok().flatten().unwrap_or(0);
        println!("{root}: {} at last scan ({at})", format_bytes(size));
    }
    store.close();
}

fn scan_one(root: &Path, config: ScanConfig) -> anyhow::Result<Option<ScanSummary>> {
    let handle = start_scan(root.to_path_buf(), config).context("cannot start scan thread")?;

    let mut errors = 0u64;
    loop {
        match handle.progress_rx.recv_timeout(PROGRESS_INTERVAL) {
            Ok(ScanProgress::Error { .. }) => errors += 1,
            Ok(ScanProgress::Complete { .. })
            | Ok(ScanProgress::Cancelled)
            | Ok(ScanProgress::Failed { .. }) => break,
            Ok(_) => {}
            Err(_) if handle.is_finished() => break,
            Err(_) => {
                let snap = handle.progress();
                eprint!(
                    "\r{}: {}",
                    root.display(),
                    format_progress(snap.bytes_processed, snap.bytes_total_estimate)
                );
            }
        }
    }
    eprintln!();
    if errors > 0 {
        tracing::info!("{errors} entries under {} could not be read", root.display());
    }

    handle
        .wait()
        .with_context(|| format!("scan of {} failed", root.display()))
}

fn print_summary(summary: &ScanSummary) {
    println!(
        "{}: {} in {} directories ({} errors, {:.1?}) -> {}",
        summary.root.display(),
        format_bytes(summary.used_size),
        summary.dirs_scanned,
        summary.error_count,
        summary.duration,
        summary.store_path.display()
    );
}
