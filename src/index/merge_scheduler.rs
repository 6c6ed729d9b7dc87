use crate::core::error::Result;
use crate::index::merge_policy::OneMerge;
use crossbeam::channel::{bounded, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Scheduler selection carried in `IndexWriterConfig` (spec.md §4.3
/// MergeScheduler, grounded on the teacher's `ParallelWriter` thread/channel
/// pattern in `writer::parallel_writer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSchedulerKind {
    /// Runs merges synchronously on the calling thread; used by
    /// `IndexWriterConfig::small_and_deterministic`.
    Serial,
    /// Never runs merges; the caller must invoke `maybe_merge` explicitly.
    None,
    /// Runs merges on a bounded background thread pool.
    Concurrent { max_thread_count: usize, max_merge_count: usize },
}

/// What an `IndexWriter` hands a scheduler for each planned `OneMerge`: the
/// merge description plus the closure that actually performs it (reads the
/// input segments, writes the combined segment, returns the new
/// `SegmentInfo` via the oneshot inside the closure's captured state).
pub type MergeTask = Box<dyn FnOnce() -> Result<()> + Send>;

pub trait MergeScheduler: Send + Sync {
    fn submit(&self, merge: OneMerge, task: MergeTask);
    /// Blocks until every merge submitted so far has finished (spec.md §4.1
    /// close()/commit() "wait for in-flight merges" semantics).
    fn sync(&self);
}

pub struct SerialMergeScheduler;

impl MergeScheduler for SerialMergeScheduler {
    fn submit(&self, merge: OneMerge, task: MergeTask) {
        debug!(segments = merge.segments.len(), "running merge synchronously");
        if let Err(e) = task() {
            warn!(error = %e, "merge failed");
        }
    }

    fn sync(&self) {}
}

pub struct NoMergeScheduler;

impl MergeScheduler for NoMergeScheduler {
    fn submit(&self, merge: OneMerge, _task: MergeTask) {
        debug!(segments = merge.segments.len(), "merge scheduling disabled, dropping merge");
    }

    fn sync(&self) {}
}

struct Job {
    task: MergeTask,
}

/// Bounded worker pool draining a channel of merge jobs, mirroring the
/// teacher's `ParallelWriter` background-thread-plus-channel shape.
pub struct ConcurrentMergeScheduler {
    sender: Sender<Job>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    inflight: Arc<std::sync::atomic::AtomicUsize>,
}

impl ConcurrentMergeScheduler {
    pub fn new(max_thread_count: usize, max_merge_count: usize) -> Self {
        let (sender, receiver) = bounded::<Job>(max_merge_count.max(1));
        let inflight = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(max_thread_count.max(1));

        for worker_id in 0..max_thread_count.max(1) {
            let receiver = receiver.clone();
            let inflight = inflight.clone();
            workers.push(std::thread::spawn(move || {
                while let Ok(job) = receiver.recv() {
                    if let Err(e) = (job.task)() {
                        warn!(worker_id, error = %e, "merge failed");
                    }
                    inflight.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                }
            }));
        }

        ConcurrentMergeScheduler {
            sender,
            workers: Mutex::new(workers),
            inflight,
        }
    }
}

impl MergeScheduler for ConcurrentMergeScheduler {
    fn submit(&self, merge: OneMerge, task: MergeTask) {
        debug!(segments = merge.segments.len(), "submitting merge to worker pool");
        self.inflight.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.sender.send(Job { task }).is_err() {
            warn!("merge scheduler channel closed, running merge inline");
            self.inflight.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn sync(&self) {
        while self.inflight.load(std::sync::atomic::Ordering::SeqCst) > 0 {
            std::thread::yield_now();
        }
    }
}

impl Drop for ConcurrentMergeScheduler {
    fn drop(&mut self) {
        self.sync();
    }
}

pub fn build_scheduler(kind: MergeSchedulerKind) -> Arc<dyn MergeScheduler> {
    match kind {
        MergeSchedulerKind::Serial => Arc::new(SerialMergeScheduler),
        MergeSchedulerKind::None => Arc::new(NoMergeScheduler),
        MergeSchedulerKind::Concurrent { max_thread_count, max_merge_count } => {
            Arc::new(ConcurrentMergeScheduler::new(max_thread_count, max_merge_count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn serial_scheduler_runs_inline() {
        let scheduler = SerialMergeScheduler;
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        scheduler.submit(
            OneMerge { segments: vec![] },
            Box::new(move || {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_scheduler_runs_all_submitted_merges() {
        let scheduler = ConcurrentMergeScheduler::new(2, 8);
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let ran_clone = ran.clone();
            scheduler.submit(
                OneMerge { segments: vec![] },
                Box::new(move || {
                    ran_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }
        scheduler.sync();
        assert_eq!(ran.load(Ordering::SeqCst), 5);
    }
}
