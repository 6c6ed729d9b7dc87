use crate::index::merge_policy::MergePolicyKind;
use crate::index::merge_scheduler::MergeSchedulerKind;
use std::path::PathBuf;

/// Immutable configuration for an `IndexWriter`, built once at construction
/// (spec.md §9 "configuration via setters" redesign note). Dynamic
/// re-tuning is not supported; callers that need different knobs build a
/// new writer.
#[derive(Debug, Clone)]
pub struct IndexWriterConfig {
    /// RAM buffer threshold (MB) that triggers an implicit flush.
    pub ram_buffer_size_mb: f64,
    /// Buffered document count threshold that triggers an implicit flush.
    pub max_buffered_docs: usize,
    pub merge_policy: MergePolicyKind,
    pub merge_scheduler: MergeSchedulerKind,
    /// Segments above this byte size are never selected for merging.
    pub max_merge_size_bytes: u64,
    pub max_merge_docs: usize,
    /// Merge factor (segments-per-level grouping threshold).
    pub merge_factor: usize,
    /// A new segment becomes a compound file when its size is at most this
    /// fraction of the total index size; `1.0` always compounds.
    pub no_cfs_ratio: f64,
    pub use_compound_file: bool,
    /// Whether `close()` without an explicit argument waits for
    /// in-flight merges.
    pub commit_on_close: bool,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            ram_buffer_size_mb: 16.0,
            max_buffered_docs: 1000,
            merge_policy: MergePolicyKind::LogByteSize,
            merge_scheduler: MergeSchedulerKind::Concurrent { max_thread_count: 4, max_merge_count: 8 },
            max_merge_size_bytes: 2u64.pow(31),
            max_merge_docs: usize::MAX,
            merge_factor: 10,
            no_cfs_ratio: 0.1,
            use_compound_file: true,
            commit_on_close: true,
        }
    }
}

impl IndexWriterConfig {
    pub fn with_merge_policy(mut self, policy: MergePolicyKind) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_merge_scheduler(mut self, scheduler: MergeSchedulerKind) -> Self {
        self.merge_scheduler = scheduler;
        self
    }

    /// Preset used by tests and small ad hoc indices: flush aggressively,
    /// merge serially, keep everything easy to reason about step by step.
    pub fn small_and_deterministic() -> Self {
        IndexWriterConfig {
            ram_buffer_size_mb: 1.0,
            max_buffered_docs: 10,
            merge_scheduler: MergeSchedulerKind::Serial,
            merge_factor: 3,
            ..Default::default()
        }
    }
}

/// Top-level on-disk layout / engine configuration, analogous to the
/// teacher's `core::config::Config`.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: PathBuf,
    pub query_cache_size: usize,
    pub writer: IndexWriterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            query_cache_size: 256,
            writer: IndexWriterConfig::default(),
        }
    }
}
