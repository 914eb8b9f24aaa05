/// Worker pool that walks a directory tree.
///
/// Each worker pops a directory, lists it once, pushes every accepted
/// subdirectory back onto the shared [`ScanQueue`], and commits one
/// [`ScanRecord`] under the record-set lock. The pool returns once the
/// queue's pending counter reaches zero and every worker has joined.
///
/// Symbolic links (and Windows reparse points) are never followed, ignored
/// paths are never entered, and directories on another device than their
/// parent are skipped. Any error on a single entry or directory is logged,
/// counted, and reported; the scan continues.
use super::progress::{EventSink, ProgressCounter, ScanProgress};
use super::queue::{DirTask, ScanQueue, Task, TaskDone};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::model::{RecordSet, ScanRecord};
use crate::platform::{mounts, normalize, path_key};
use compact_str::CompactString;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use tracing::{debug, warn};

/// Initial capacity hint for the record set.
const ESTIMATED_DIRS: usize = 4_096;

/// State shared by every worker of one scan.
pub struct ScanContext<'a> {
    ignore: HashSet<PathBuf>,
    workers: usize,
    cancel: &'a AtomicBool,
    progress: &'a ProgressCounter,
    events: &'a EventSink,
    dirs_scanned: AtomicU64,
    error_count: AtomicU64,
}

impl<'a> ScanContext<'a> {
    pub fn new(
        config: &ScanConfig,
        cancel: &'a AtomicBool,
        progress: &'a ProgressCounter,
        events: &'a EventSink,
    ) -> Self {
        Self {
            ignore: config.ignore_paths.iter().map(|p| normalize(p)).collect(),
            workers: config.worker_count(),
            cancel,
            progress,
            events,
            dirs_scanned: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn dirs_scanned(&self) -> u64 {
        self.dirs_scanned.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.contains(path)
    }

    fn entry_error(&self, path: &Path, err: &io::Error) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        warn!("Cannot read {}: {err}", path.display());
        self.events.report(ScanProgress::Error {
            path: path_key(path),
            message: err.to_string(),
        });
    }
}

/// Walk the tree below `root` with `ctx.workers()` threads.
///
/// Returns `Ok(None)` when the scan was cancelled. `root` must already be
/// normalised and known to be a directory.
pub fn run_pool(
    root: PathBuf,
    root_device: Option<u64>,
    ctx: &ScanContext<'_>,
) -> Result<Option<RecordSet>, ScanError> {
    let queue = ScanQueue::new();
    let records = Mutex::new(RecordSet::with_capacity(root.clone(), ESTIMATED_DIRS));

    thread::scope(|scope| -> Result<(), ScanError> {
        let mut handles = Vec::with_capacity(ctx.workers);
        for id in 0..ctx.workers {
            let spawned = thread::Builder::new()
                .name(format!("diskmap-worker-{id}"))
                .spawn_scoped(scope, || worker_loop(&queue, &records, ctx));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    queue.stop_workers(handles.len());
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(ScanError::Spawn(e));
                }
            }
        }
        debug!("Started {} scan workers", handles.len());

        queue.push(DirTask {
            path: root,
            depth: 0,
            device: root_device,
        });
        queue.wait_idle();
        queue.stop_workers(handles.len());

        let mut panicked = 0usize;
        for handle in handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            warn!("{panicked} scan worker(s) panicked");
            return Err(ScanError::WorkerPanicked);
        }
        Ok(())
    })?;

    if ctx.is_cancelled() {
        return Ok(None);
    }
    Ok(Some(records.into_inner()))
}

fn worker_loop(queue: &ScanQueue, records: &Mutex<RecordSet>, ctx: &ScanContext<'_>) {
    while let Some(task) = queue.pop() {
        let task = match task {
            Task::Visit(task) => task,
            Task::Stop => break,
        };
        // Children are pushed before this guard drops, so the pending
        // counter cannot touch zero while work is still being discovered.
        let _done = TaskDone(queue);

        if ctx.is_cancelled() {
            continue;
        }

        let (record, children) = visit_directory(&task, ctx);
        for child in children {
            queue.push(child);
        }

        ctx.progress.add_processed(record.files_size);
        ctx.dirs_scanned.fetch_add(1, Ordering::Relaxed);
        records.lock().insert(record);
    }
}

/// List one directory. An unreadable directory yields an empty record.
fn visit_directory(task: &DirTask, ctx: &ScanContext<'_>) -> (ScanRecord, Vec<DirTask>) {
    let mut record = ScanRecord::empty(task.path.clone(), task.depth);
    let mut children = Vec::new();

    let entries = match fs::read_dir(&task.path) {
        Ok(entries) => entries,
        Err(e) => {
            ctx.entry_error(&task.path, &e);
            return (record, children);
        }
    };

    for entry in entries {
        if ctx.is_cancelled() {
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                ctx.entry_error(&task.path, &e);
                continue;
            }
        };
        let path = entry.path();
        // Does not traverse symlinks.
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                ctx.entry_error(&path, &e);
                continue;
            }
        };

        if mounts::is_link_like(&meta) {
            continue;
        }

        if meta.is_dir() {
            // Parent is normalised and a file name never contains a
            // separator, so `path` is normalised too.
            if ctx.is_ignored(&path) {
                debug!("Skipping ignored path {}", path.display());
                continue;
            }
            if mounts::crosses_mount(task.device, &meta) {
                debug!("Not crossing into mount {}", path.display());
                continue;
            }
            record.add_subfolder(path.clone());
            children.push(DirTask {
                path,
                depth: task.depth + 1,
                device: mounts::device_id(&meta),
            });
        } else if meta.is_file() {
            let name = CompactString::new(entry.file_name().to_string_lossy());
            record.add_file(name, meta.len());
        }
    }

    (record, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, len: usize) {
        let mut f = File::create(path).unwrap();
        f.write_all(&vec![b'x'; len]).unwrap();
    }

    fn scan(root: &Path, config: &ScanConfig) -> (Option<RecordSet>, u64) {
        let cancel = AtomicBool::new(false);
        let progress = ProgressCounter::new();
        let events = EventSink::none();
        let ctx = ScanContext::new(config, &cancel, &progress, &events);
        let root = normalize(root);
        let set = run_pool(root, None, &ctx).unwrap();
        (set, ctx.dirs_scanned())
    }

    #[test]
    fn every_directory_gets_one_record() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b/c")).unwrap();
        fs::create_dir_all(tmp.path().join("d")).unwrap();
        write_file(&tmp.path().join("a/b/c/f.bin"), 64);
        write_file(&tmp.path().join("top.bin"), 8);

        let config = ScanConfig::default().with_threads(3).with_ignore_paths(vec![]);
        let (set, dirs) = scan(tmp.path(), &config);
        let set = set.unwrap();

        assert_eq!(set.len(), 5);
        assert_eq!(dirs, 5);
        assert!(set.is_consistent());

        let root = set.root_record().unwrap();
        assert_eq!(root.depth, 0);
        assert_eq!(root.files_size, 8);
        assert_eq!(root.subfolders.len(), 2);

        let c = set.get(&normalize(&tmp.path().join("a/b/c"))).unwrap();
        assert_eq!(c.depth, 3);
        assert_eq!(c.files, vec![(CompactString::new("f.bin"), 64)]);
    }

    #[test]
    fn ignored_directories_are_not_entered() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("keep")).unwrap();
        fs::create_dir_all(tmp.path().join("skip/deep")).unwrap();
        write_file(&tmp.path().join("skip/deep/big.bin"), 1024);

        let config = ScanConfig::default()
            .with_threads(2)
            .with_ignore_paths(vec![tmp.path().join("skip")]);
        let set = scan(tmp.path(), &config).0.unwrap();

        assert_eq!(set.len(), 2);
        assert!(!set.contains(&normalize(&tmp.path().join("skip"))));
        assert_eq!(set.root_record().unwrap().subfolders.len(), 1);
    }

    #[test]
    fn progress_counts_file_bytes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        write_file(&tmp.path().join("one.bin"), 100);
        write_file(&tmp.path().join("sub/two.bin"), 50);

        let config = ScanConfig::default().with_threads(2).with_ignore_paths(vec![]);
        let cancel = AtomicBool::new(false);
        let progress = ProgressCounter::new();
        let events = EventSink::none();
        let ctx = ScanContext::new(&config, &cancel, &progress, &events);
        run_pool(normalize(tmp.path()), None, &ctx).unwrap();

        assert_eq!(progress.snapshot().bytes_processed, 150);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn pre_cancelled_scan_returns_none() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let config = ScanConfig::default().with_threads(2);
        let cancel = AtomicBool::new(true);
        let progress = ProgressCounter::new();
        let events = EventSink::none();
        let ctx = ScanContext::new(&config, &cancel, &progress, &events);

        assert!(run_pool(normalize(tmp.path()), None, &ctx).unwrap().is_none());
        assert_eq!(ctx.dirs_scanned(), 0);
    }

    #[test]
    fn unreadable_root_is_an_empty_record() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("vanished");

        let config = ScanConfig::default().with_threads(1);
        let cancel = AtomicBool::new(false);
        let progress = ProgressCounter::new();
        let events = EventSink::none();
        let ctx = ScanContext::new(&config, &cancel, &progress, &events);
        let set = run_pool(gone.clone(), None, &ctx).unwrap().unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.root_record().unwrap().used_size, 0);
        assert_eq!(ctx.error_count(), 1);
    }
}
