use crate::codec::SegmentInfo;

/// Which byte-size measure a `MergePolicy` levels segments by (spec.md
/// §4.3 MergePolicy, grounded on the teacher's `LogStructuredMergePolicy`
/// size-ratio tiering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicyKind {
    /// Level by `size_in_bytes`.
    LogByteSize,
    /// Level by `doc_count`, ignoring stored-field/term-vector bulk.
    LogDoc,
}

/// One planned merge: the segments to combine, replaced in place by a
/// single new segment once the merge completes.
#[derive(Debug, Clone)]
pub struct OneMerge {
    pub segments: Vec<SegmentInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct MergeSpecification {
    pub merges: Vec<OneMerge>,
}

/// Log-tiered merge selection: segments are bucketed into levels by
/// `log(merge_factor, size)`, and any level with `>= merge_factor`
/// segments is merged right-to-left into one (spec.md §4.3, Lucene's
/// classic `LogMergePolicy`).
#[derive(Debug, Clone)]
pub struct MergePolicy {
    pub kind: MergePolicyKind,
    pub merge_factor: usize,
    pub min_merge_size: u64,
    pub max_merge_size: u64,
    pub max_merge_docs: usize,
}

impl MergePolicy {
    pub fn new(kind: MergePolicyKind, merge_factor: usize, max_merge_size: u64, max_merge_docs: usize) -> Self {
        MergePolicy {
            kind,
            merge_factor: merge_factor.max(2),
            min_merge_size: 1024,
            max_merge_size,
            max_merge_docs,
        }
    }

    fn size_of(&self, segment: &SegmentInfo) -> u64 {
        match self.kind {
            MergePolicyKind::LogByteSize => segment.size_in_bytes.max(1),
            MergePolicyKind::LogDoc => segment.doc_count.max(1) as u64,
        }
    }

    fn level_of(&self, segment: &SegmentInfo) -> i64 {
        let size = self.size_of(segment).max(self.min_merge_size) as f64;
        (size.ln() / (self.merge_factor as f64).ln()).floor() as i64
    }

    fn is_mergeable(&self, segment: &SegmentInfo) -> bool {
        self.size_of(segment) <= self.max_merge_size && segment.doc_count as usize <= self.max_merge_docs
    }

    /// Finds merges to run for a normal flush/add-document trigger: scans
    /// right-to-left, grouping contiguous (index order) mergeable segments
    /// sharing a level, and merges a run once it reaches `merge_factor`
    /// segments (spec.md §4.3 "scan segments right-to-left").
    pub fn find_merges(&self, segments: &[SegmentInfo]) -> MergeSpecification {
        let mut spec = MergeSpecification::default();
        let mut end = segments.len();
        while end > 0 {
            if !self.is_mergeable(&segments[end - 1]) {
                end -= 1;
                continue;
            }
            let level = self.level_of(&segments[end - 1]);
            let mut start = end - 1;
            while start > 0 && self.is_mergeable(&segments[start - 1]) && self.level_of(&segments[start - 1]) == level {
                start -= 1;
            }
            let run = &segments[start..end];
            if run.len() >= self.merge_factor {
                spec.merges.push(OneMerge { segments: run.to_vec() });
            }
            end = start;
        }
        spec
    }

    /// Finds the merges needed to collapse an index down to at most
    /// `max_segment_count` segments (spec.md §4.3 `forceMerge`/optimize).
    /// `maxNumSegments == 1` merges everything into one segment; otherwise
    /// full `merge_factor`-sized groups are enrolled first, and if that
    /// still leaves more survivors than `max_segment_count`, the cheapest
    /// (smallest summed size) contiguous window of the leftover tail is
    /// merged as one more partial merge.
    pub fn find_merges_for_optimize(&self, segments: &[SegmentInfo], max_segment_count: usize) -> MergeSpecification {
        let target = max_segment_count.max(1);
        let mut spec = MergeSpecification::default();
        if segments.len() <= target {
            return spec;
        }

        let mergeable: Vec<SegmentInfo> = segments.iter().filter(|s| self.is_mergeable(s)).cloned().collect();
        if mergeable.len() < 2 {
            return spec;
        }

        if target == 1 {
            spec.merges.push(OneMerge { segments: mergeable });
            return spec;
        }

        let mut chunks: Vec<Vec<SegmentInfo>> = Vec::new();
        let mut idx = 0usize;
        while mergeable.len() - idx >= self.merge_factor {
            chunks.push(mergeable[idx..idx + self.merge_factor].to_vec());
            idx += self.merge_factor;
        }
        let rest: Vec<SegmentInfo> = mergeable[idx..].to_vec();

        let survivors_without_partial = chunks.len() + rest.len();
        if survivors_without_partial > target && rest.len() >= 2 {
            let excess = survivors_without_partial - target;
            let window_len = (excess + 1).min(rest.len());
            let mut best_start = 0usize;
            let mut best_sum = u64::MAX;
            for start in 0..=(rest.len() - window_len) {
                let sum: u64 = rest[start..start + window_len].iter().map(|s| self.size_of(s)).sum();
                if sum < best_sum {
                    best_sum = sum;
                    best_start = start;
                }
            }
            chunks.push(rest[best_start..best_start + window_len].to_vec());
        } else {
            for seg in rest {
                chunks.push(vec![seg]);
            }
        }

        for chunk in chunks {
            if chunk.len() >= 2 {
                spec.merges.push(OneMerge { segments: chunk });
            }
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(name: &str, size: u64) -> SegmentInfo {
        SegmentInfo {
            name: name.to_string(),
            doc_count: 100,
            del_count: 0,
            del_gen: 0,
            size_in_bytes: size,
            is_compound_file: false,
        }
    }

    #[test]
    fn groups_same_level_run_once_it_reaches_merge_factor() {
        let policy = MergePolicy::new(MergePolicyKind::LogByteSize, 3, u64::MAX, usize::MAX);
        let segments = vec![seg("_0", 1000), seg("_1", 1000), seg("_2", 1000)];
        let spec = policy.find_merges(&segments);
        assert_eq!(spec.merges.len(), 1);
        assert_eq!(spec.merges[0].segments.len(), 3);
    }

    #[test]
    fn below_merge_factor_triggers_nothing() {
        let policy = MergePolicy::new(MergePolicyKind::LogByteSize, 10, u64::MAX, usize::MAX);
        let segments = vec![seg("_0", 1000), seg("_1", 1000)];
        assert!(policy.find_merges(&segments).merges.is_empty());
    }

    #[test]
    fn oversized_segments_are_never_selected() {
        let policy = MergePolicy::new(MergePolicyKind::LogByteSize, 2, 500, usize::MAX);
        let segments = vec![seg("_0", 1000), seg("_1", 1000), seg("_2", 1000)];
        assert!(policy.find_merges(&segments).merges.is_empty());
    }

    #[test]
    fn optimize_merges_everything_mergeable() {
        let policy = MergePolicy::new(MergePolicyKind::LogByteSize, 10, u64::MAX, usize::MAX);
        let segments = vec![seg("_0", 500), seg("_1", 2000), seg("_2", 50)];
        let spec = policy.find_merges_for_optimize(&segments, 1);
        assert_eq!(spec.merges.len(), 1);
        assert_eq!(spec.merges[0].segments.len(), 3);
    }

    #[test]
    fn find_merges_groups_the_rightmost_run_when_levels_differ() {
        // "_0" sits at a much higher level than the uniform run "_1".."_3";
        // a left-to-right scan would never group the right-hand run since it
        // would stop expanding the moment it met "_0" from the left.
        let policy = MergePolicy::new(MergePolicyKind::LogByteSize, 3, u64::MAX, usize::MAX);
        let segments = vec![seg("_0", 1_000_000), seg("_1", 1000), seg("_2", 1000), seg("_3", 1000)];
        let spec = policy.find_merges(&segments);
        assert_eq!(spec.merges.len(), 1);
        assert_eq!(spec.merges[0].segments.len(), 3);
        assert!(spec.merges[0].segments.iter().all(|s| s.name != "_0"));
    }

    #[test]
    fn optimize_with_target_above_one_merges_the_cheapest_tail_window() {
        let policy = MergePolicy::new(MergePolicyKind::LogByteSize, 5, u64::MAX, usize::MAX);
        // merge_factor=5 enrolls "_0".."_4" as one full chunk, leaving
        // "_5".."_8" as a 4-segment tail. Collapsing to 3 segments total
        // needs one more (3-wide) merge from that tail; two 3-wide windows
        // are possible and the cheaper one (by summed size) must win.
        let mut segments = vec![seg("_0", 100), seg("_1", 100), seg("_2", 100), seg("_3", 100), seg("_4", 100)];
        segments.push(seg("_5", 500));
        segments.push(seg("_6", 10));
        segments.push(seg("_7", 500));
        segments.push(seg("_8", 10));

        let spec = policy.find_merges_for_optimize(&segments, 3);
        assert_eq!(spec.merges.len(), 2);
        let tail_merge = spec.merges.iter().find(|m| m.segments.len() == 3).unwrap();
        let tail_names: Vec<&str> = tail_merge.segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(tail_names, vec!["_6", "_7", "_8"]);
    }
}
