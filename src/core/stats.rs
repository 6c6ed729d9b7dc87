use serde::{Deserialize, Serialize};

/// Snapshot of engine-level counters, analogous to the teacher's
/// `core::stats::DatabaseStats` but scoped to what `IndexEngine` actually
/// tracks (no WAL/buffer-pool/query-cache layers survived the rewrite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub uptime_secs: u64,
    pub segment_count: usize,
    pub total_docs: u32,
    pub max_doc: u32,
    pub queries_served: u64,
    pub writes_served: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_are_plain_data() {
        let stats = EngineStats {
            uptime_secs: 5,
            segment_count: 2,
            total_docs: 10,
            max_doc: 12,
            queries_served: 3,
            writes_served: 10,
        };
        assert_eq!(stats.total_docs, 10);
    }
}
