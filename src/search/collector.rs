use crate::core::error::Result;
use crate::core::types::DocId;
use crate::util::bounded_queue::BoundedPriorityQueue;

/// Receives matching docs from a search in increasing docId order per
/// segment (spec.md §4.7 Collector contract). `doc` is segment-local, `doc`
/// plus the collector's own `doc_base` gives the global id. Score is pushed
/// in by the searcher rather than pulled from a borrowed scorer handle —
/// the same information the spec's `setScorer`/`collect(doc)` split carries,
/// without the aliased-mutable-borrow problem a pull-based design runs into
/// when several collectors share one scorer (see `MultiCollector`).
pub trait Collector {
    fn set_next_reader(&mut self, doc_base: DocId);
    fn collect(&mut self, doc: DocId, score: f32) -> Result<()>;
    fn accepts_docs_out_of_order(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreDoc {
    pub doc: DocId,
    pub score: f32,
}

/// Maintains a bounded priority queue of `ScoreDoc`s ordered by score, tie
/// broken by ascending docId (spec.md §4.7 TopDocsCollector family).
pub struct TopDocsCollector {
    queue: BoundedPriorityQueue<ScoreDoc>,
    doc_base: DocId,
    total_hits: u32,
}

impl TopDocsCollector {
    pub fn new(k: usize) -> Self {
        TopDocsCollector {
            queue: BoundedPriorityQueue::new(k, |a: &ScoreDoc, b: &ScoreDoc| {
                a.score < b.score || (a.score == b.score && a.doc > b.doc)
            }),
            doc_base: 0,
            total_hits: 0,
        }
    }

    pub fn total_hits(&self) -> u32 {
        self.total_hits
    }

    /// Drains the queue best-first.
    pub fn top_docs(self) -> Vec<ScoreDoc> {
        let mut docs = self.queue.into_sorted_vec();
        docs.reverse();
        docs
    }
}

impl Collector for TopDocsCollector {
    fn set_next_reader(&mut self, doc_base: DocId) {
        self.doc_base = doc_base;
    }

    fn collect(&mut self, doc: DocId, score: f32) -> Result<()> {
        self.total_hits += 1;
        self.queue.add_overflow(ScoreDoc { doc: self.doc_base + doc, score });
        Ok(())
    }
}

/// Counts matches without retaining any per-doc state.
#[derive(Default)]
pub struct TotalHitCountCollector {
    count: u32,
}

impl TotalHitCountCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Collector for TotalHitCountCollector {
    fn set_next_reader(&mut self, _doc_base: DocId) {}

    fn collect(&mut self, _doc: DocId, _score: f32) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn accepts_docs_out_of_order(&self) -> bool {
        true
    }
}

/// Fans a single search out to several collectors (spec.md §4.7
/// MultiCollector). Degenerates to the wrapped collector itself for zero or
/// one sub-collectors so callers don't pay fan-out cost needlessly.
pub struct MultiCollector {
    collectors: Vec<Box<dyn Collector>>,
}

impl MultiCollector {
    pub fn wrap(collectors: Vec<Box<dyn Collector>>) -> Box<dyn Collector> {
        let mut collectors = collectors;
        match collectors.len() {
            0 => Box::new(TotalHitCountCollector::new()),
            1 => collectors.pop().unwrap(),
            _ => Box::new(MultiCollector { collectors }),
        }
    }
}

impl Collector for MultiCollector {
    fn set_next_reader(&mut self, doc_base: DocId) {
        for c in self.collectors.iter_mut() {
            c.set_next_reader(doc_base);
        }
    }

    fn collect(&mut self, doc: DocId, score: f32) -> Result<()> {
        for c in self.collectors.iter_mut() {
            c.collect(doc, score)?;
        }
        Ok(())
    }

    fn accepts_docs_out_of_order(&self) -> bool {
        self.collectors.iter().all(|c| c.accepts_docs_out_of_order())
    }
}

/// Filters out docs whose score is `<= 0` before forwarding to the wrapped
/// collector (spec.md §4.7 PositiveScoresOnlyCollector).
pub struct PositiveScoresOnlyCollector {
    inner: Box<dyn Collector>,
}

impl PositiveScoresOnlyCollector {
    pub fn new(inner: Box<dyn Collector>) -> Self {
        PositiveScoresOnlyCollector { inner }
    }
}

impl Collector for PositiveScoresOnlyCollector {
    fn set_next_reader(&mut self, doc_base: DocId) {
        self.inner.set_next_reader(doc_base);
    }

    fn collect(&mut self, doc: DocId, score: f32) -> Result<()> {
        if score > 0.0 {
            self.inner.collect(doc, score)?;
        }
        Ok(())
    }

    fn accepts_docs_out_of_order(&self) -> bool {
        self.inner.accepts_docs_out_of_order()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_docs_collector_keeps_best_k() {
        let mut collector = TopDocsCollector::new(2);
        for (doc, score) in [(0u32, 1.0f32), (1, 5.0), (2, 3.0)] {
            collector.collect(doc, score).unwrap();
        }
        let top = collector.top_docs();
        assert_eq!(top[0].doc, 1);
        assert_eq!(top[1].doc, 2);
    }

    #[test]
    fn total_hit_count_collector_just_counts() {
        let mut c = TotalHitCountCollector::new();
        c.collect(0, 1.0).unwrap();
        c.collect(1, 1.0).unwrap();
        assert_eq!(c.count(), 2);
    }

    #[test]
    fn positive_scores_only_filters_non_positive() {
        let mut wrapper = PositiveScoresOnlyCollector::new(Box::new(TotalHitCountCollector::new()));
        wrapper.collect(0, -1.0).unwrap();
        wrapper.collect(1, 2.0).unwrap();
    }

    #[test]
    fn multi_collector_fans_out_to_every_member() {
        let mut multi = MultiCollector::wrap(vec![
            Box::new(TotalHitCountCollector::new()),
            Box::new(TopDocsCollector::new(1)),
        ]);
        multi.collect(0, 4.0).unwrap();
    }
}
