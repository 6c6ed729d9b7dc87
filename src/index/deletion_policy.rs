use crate::codec::IndexCommit;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Decides which `IndexCommit`s survive past the next commit (spec.md §4.4
/// DeletionPolicy). Called once after every successful commit/startup with
/// the full list of known commits, oldest first.
pub trait DeletionPolicy: Send + Sync {
    fn on_commit(&self, commits: &[IndexCommit]) -> HashSet<u64>;
    fn on_init(&self, commits: &[IndexCommit]) -> HashSet<u64> {
        self.on_commit(commits)
    }
}

/// Default policy: only the most recent commit is kept, matching the
/// teacher's single-generation cleanup assumption (spec.md §4.4 default).
pub struct KeepOnlyLastCommitDeletionPolicy;

impl DeletionPolicy for KeepOnlyLastCommitDeletionPolicy {
    fn on_commit(&self, commits: &[IndexCommit]) -> HashSet<u64> {
        commits.last().map(|c| c.generation).into_iter().collect()
    }
}

/// Keeps every commit, useful when external backup/replication needs to
/// read older generations. Deletion only ever happens once the caller
/// explicitly releases a generation.
pub struct KeepAllDeletionPolicy;

impl DeletionPolicy for KeepAllDeletionPolicy {
    fn on_commit(&self, commits: &[IndexCommit]) -> HashSet<u64> {
        commits.iter().map(|c| c.generation).collect()
    }
}

/// Wraps another policy and additionally pins the commit current at the
/// time of each named `snapshot()` call, releasing it only on `release()`
/// (spec.md §4.4 SnapshotDeletionPolicy, used to hold a commit open for
/// backup under a caller-chosen id such as `"backup-1"`).
pub struct SnapshotDeletionPolicy<P: DeletionPolicy> {
    inner: P,
    snapshots: Mutex<HashMap<String, u64>>,
}

impl<P: DeletionPolicy> SnapshotDeletionPolicy<P> {
    pub fn new(inner: P) -> Self {
        SnapshotDeletionPolicy {
            inner,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Re-attaches to a `snapshotId -> generation` mapping persisted before
    /// a restart, so snapshots taken in a previous process still pin their
    /// generation (spec.md §4.4, §8 scenario 5).
    pub fn restore(inner: P, persisted: HashMap<String, u64>) -> Self {
        SnapshotDeletionPolicy {
            inner,
            snapshots: Mutex::new(persisted),
        }
    }

    /// Pins the most recent commit in `commits` under `snapshot_id`, so it
    /// survives future `on_commit` calls until `release` is called.
    /// Returns the pinned generation, or `None` if there is no commit yet.
    pub fn snapshot(&self, snapshot_id: impl Into<String>, commits: &[IndexCommit]) -> Option<u64> {
        let generation = commits.last()?.generation;
        self.snapshots.lock().unwrap().insert(snapshot_id.into(), generation);
        Some(generation)
    }

    pub fn release(&self, snapshot_id: &str) {
        self.snapshots.lock().unwrap().remove(snapshot_id);
    }

    /// Current `snapshotId -> generation` mapping, for the caller to persist
    /// across restarts (e.g. alongside `segments_N` itself).
    pub fn snapshotted_generations(&self) -> HashMap<String, u64> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl<P: DeletionPolicy> DeletionPolicy for SnapshotDeletionPolicy<P> {
    fn on_commit(&self, commits: &[IndexCommit]) -> HashSet<u64> {
        let mut keep = self.inner.on_commit(commits);
        keep.extend(self.snapshots.lock().unwrap().values().copied());
        keep
    }

    /// Like `on_commit`, but first drops any snapshot id pinning a
    /// generation that no longer exists on disk — e.g. the writer crashed
    /// between taking the snapshot and a backup job copying it out.
    fn on_init(&self, commits: &[IndexCommit]) -> HashSet<u64> {
        let known: HashSet<u64> = commits.iter().map(|c| c.generation).collect();
        self.snapshots.lock().unwrap().retain(|_, generation| known.contains(generation));
        self.on_commit(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(generation: u64) -> IndexCommit {
        IndexCommit {
            generation,
            segments_file_name: crate::codec::SegmentInfos::file_name(generation),
            files: vec![],
            user_data: Default::default(),
        }
    }

    #[test]
    fn keep_only_last_keeps_newest_generation() {
        let policy = KeepOnlyLastCommitDeletionPolicy;
        let commits = vec![commit(1), commit(2), commit(3)];
        let keep = policy.on_commit(&commits);
        assert_eq!(keep, HashSet::from([3]));
    }

    #[test]
    fn snapshot_pins_the_commit_current_when_taken() {
        let policy = SnapshotDeletionPolicy::new(KeepOnlyLastCommitDeletionPolicy);
        let early_commits = vec![commit(1), commit(2)];
        let pinned = policy.snapshot("backup-1", &early_commits).unwrap();
        assert_eq!(pinned, 2);

        let commits = vec![commit(1), commit(2), commit(3)];
        let keep = policy.on_commit(&commits);
        assert!(keep.contains(&2));
        assert!(keep.contains(&3));
        assert!(!keep.contains(&1));

        policy.release("backup-1");
        let keep = policy.on_commit(&commits);
        assert_eq!(keep, HashSet::from([3]));
    }

    #[test]
    fn on_init_drops_snapshots_whose_generation_is_gone() {
        let policy = SnapshotDeletionPolicy::new(KeepOnlyLastCommitDeletionPolicy);
        policy.snapshot("backup-1", &[commit(1), commit(2)]);

        // Restart: generation 1 is gone, but 2 (what backup-1 pinned) is
        // still on disk.
        let keep = policy.on_init(&[commit(2)]);
        assert_eq!(keep, HashSet::from([2]));
        assert!(policy.snapshotted_generations().contains_key("backup-1"));

        // Restart again: generation 2 is gone too now.
        let keep = policy.on_init(&[]);
        assert!(keep.is_empty());
        assert!(!policy.snapshotted_generations().contains_key("backup-1"));
    }
}
