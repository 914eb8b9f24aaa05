/// Work queue for directory traversal.
///
/// An unbounded multi-producer/multi-consumer FIFO of directories plus a
/// pending-task counter. Workers both consume and produce work, so "the
/// queue is empty" does not mean "the scan is done": a worker holding the
/// last directory may be about to push its children. Completion is
/// therefore a barrier on the counter, which is incremented *before* a
/// task is sent and decremented only after the task (including pushing
/// its children) is finished.
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::path::PathBuf;

/// A directory to visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTask {
    /// Normalised absolute path.
    pub path: PathBuf,
    /// Hops from the scan root (root = 0).
    pub depth: u32,
    /// Device of this directory, used to detect mount crossings below it.
    pub device: Option<u64>,
}

/// Message a worker receives.
#[derive(Debug)]
pub enum Task {
    Visit(DirTask),
    /// Exit the worker loop. One is published per worker at shutdown.
    Stop,
}

pub struct ScanQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Default for ScanQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            pending: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    /// Enqueue a directory. Counted as pending before it becomes visible
    /// to any worker.
    pub fn push(&self, task: DirTask) {
        *self.pending.lock() += 1;
        // The queue owns a receiver, so the channel cannot be disconnected.
        if self.sender.send(Task::Visit(task)).is_err() {
            self.task_done();
        }
    }

    /// Block until a task arrives.
    pub fn pop(&self) -> Option<Task> {
        self.receiver.recv().ok()
    }

    /// Acknowledge a finished `Visit` task.
    pub fn task_done(&self) {
        let mut pending = self.pending.lock();
        debug_assert!(*pending > 0, "task_done without a pending task");
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until every pushed task has been acknowledged.
    pub fn wait_idle(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.idle.wait(&mut pending);
        }
    }

    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// Publish one stop sentinel per worker.
    pub fn stop_workers(&self, workers: usize) {
        for _ in 0..workers {
            let _ = self.sender.send(Task::Stop);
        }
    }
}

/// Acknowledges its task when dropped, including during a panic unwind,
/// so a crashing worker cannot leave the barrier waiting forever.
pub(crate) struct TaskDone<'a>(pub(crate) &'a ScanQueue);

impl Drop for TaskDone<'_> {
    fn drop(&mut self) {
        self.0.task_done();
    }
}
