use crate::codec::postings::PostingsEnum;
use crate::core::error::Result;
use crate::core::types::{DocId, NO_MORE_DOCS};
use crate::index::reader::SegmentReader;
use std::sync::Arc;

/// Per-segment scoring iterator (spec.md §4.7 Scorer). `doc_id()` is
/// `NO_MORE_DOCS` both before the first `next_doc`/`advance` and after
/// exhaustion; within one Scorer, calls return strictly increasing doc ids.
pub trait Scorer {
    fn next_doc(&mut self) -> Result<DocId>;
    fn advance(&mut self, target: DocId) -> Result<DocId>;
    fn doc_id(&self) -> DocId;
    fn score(&mut self) -> Result<f32>;
}

/// How many times `tf(freq) * weight` is pre-cached instead of recomputed
/// (spec.md §4.7 TermScorer `SCORE_CACHE_SIZE`).
const SCORE_CACHE_SIZE: usize = 32;

pub struct TermScorer {
    postings: PostingsEnum,
    segment: Arc<SegmentReader>,
    field_number: u32,
    weight: f32,
    score_cache: [f32; SCORE_CACHE_SIZE],
}

impl TermScorer {
    pub fn new(postings: PostingsEnum, segment: Arc<SegmentReader>, field_number: u32, weight: f32) -> Self {
        let mut score_cache = [0.0; SCORE_CACHE_SIZE];
        for (freq, slot) in score_cache.iter_mut().enumerate() {
            *slot = (freq as f32).sqrt() * weight;
        }
        TermScorer { postings, segment, field_number, weight, score_cache }
    }

    fn raw_tf_score(&self, freq: u32) -> f32 {
        match self.score_cache.get(freq as usize) {
            Some(&cached) => cached,
            None => (freq as f32).sqrt() * self.weight,
        }
    }
}

impl Scorer for TermScorer {
    fn next_doc(&mut self) -> Result<DocId> {
        self.postings.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.postings.advance(target)
    }

    fn doc_id(&self) -> DocId {
        self.postings.doc_id()
    }

    fn score(&mut self) -> Result<f32> {
        let raw = self.raw_tf_score(self.postings.freq());
        let norm = crate::codec::norms::decode_norm(
            encode_norm_lookup(&self.segment, self.field_number, self.postings.doc_id()),
        );
        Ok(raw * norm)
    }
}

fn encode_norm_lookup(segment: &SegmentReader, field_number: u32, doc: DocId) -> u8 {
    crate::codec::norms::encode_norm(segment.norm(field_number, doc))
}

/// Phrase matching via one postings stream per term, each offset by its
/// position in the phrase. Handles both exact (`slop == 0`) and sloppy
/// (`slop > 0`) matching (spec.md §4.7 PhraseScorer / SloppyPhraseScorer).
pub struct PhraseScorer {
    /// One entry per phrase position: `(postings, term_offset, skip)`.
    /// `skip` is nonzero only when the same term text occurs earlier in the
    /// phrase too, so repeated terms (e.g. "the the") don't both claim the
    /// same raw position from a term with only one real occurrence.
    streams: Vec<(PostingsEnum, u32, usize)>,
    slop: u32,
    segment: Arc<SegmentReader>,
    field_number: u32,
    weight: f32,
    current_doc: DocId,
    current_match_length: u32,
}

impl PhraseScorer {
    pub fn new(
        streams: Vec<(PostingsEnum, u32, usize)>,
        slop: u32,
        segment: Arc<SegmentReader>,
        field_number: u32,
        weight: f32,
    ) -> Self {
        PhraseScorer {
            streams,
            slop,
            segment,
            field_number,
            weight,
            current_doc: NO_MORE_DOCS,
            current_match_length: 0,
        }
    }

    /// Advances every stream to the first shared candidate doc ≥ `from`,
    /// then checks whether the phrase actually matches there.
    fn find_next_match(&mut self, mut from: DocId) -> Result<DocId> {
        'outer: loop {
            for (stream, _, _) in self.streams.iter_mut() {
                let doc = stream.advance(from)?;
                if doc == NO_MORE_DOCS {
                    self.current_doc = NO_MORE_DOCS;
                    return Ok(NO_MORE_DOCS);
                }
                if doc > from {
                    from = doc;
                    continue 'outer;
                }
            }
            if let Some(match_length) = self.phrase_match_length()? {
                self.current_doc = from;
                self.current_match_length = match_length;
                return Ok(from);
            }
            from += 1;
        }
    }

    /// `Some(match_length)` when position offsets line up within `slop`;
    /// exact phrase matching is the `slop == 0` special case where the ideal
    /// alignment (`position - term_offset` identical across every stream)
    /// must hold exactly. A repeated term's stream skips the occurrences
    /// already claimed by its earlier copy in the phrase.
    fn phrase_match_length(&mut self) -> Result<Option<u32>> {
        let mut aligned: Vec<i64> = Vec::with_capacity(self.streams.len());
        for (stream, offset, skip) in self.streams.iter_mut() {
            let positions = stream.positions()?;
            let best = positions.iter().skip(*skip).map(|&p| p as i64 - *offset as i64).min();
            match best {
                Some(v) => aligned.push(v),
                None => return Ok(None),
            }
        }
        let min = *aligned.iter().min().unwrap();
        let max = *aligned.iter().max().unwrap();
        let spread = (max - min) as u32;
        if spread <= self.slop {
            Ok(Some(spread))
        } else {
            Ok(None)
        }
    }
}

impl Scorer for PhraseScorer {
    fn next_doc(&mut self) -> Result<DocId> {
        let from = if self.current_doc == NO_MORE_DOCS { 0 } else { self.current_doc + 1 };
        self.find_next_match(from)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.find_next_match(target)
    }

    fn doc_id(&self) -> DocId {
        self.current_doc
    }

    fn score(&mut self) -> Result<f32> {
        let sloppy_freq = 1.0 / (self.current_match_length as f32 + 1.0);
        let norm = crate::codec::norms::decode_norm(encode_norm_lookup(&self.segment, self.field_number, self.current_doc));
        Ok(self.weight * sloppy_freq * norm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Must,
    Should,
    MustNot,
}

pub struct ScoredClause {
    pub scorer: Box<dyn Scorer>,
    pub kind: ClauseKind,
}

/// Combines MUST / SHOULD / MUST_NOT clauses: required clauses intersect,
/// prohibited clauses subtract, optional clauses add with a `coord`
/// multiplier (spec.md §4.7 BooleanScorer).
pub struct BooleanScorer {
    must: Vec<Box<dyn Scorer>>,
    should: Vec<Box<dyn Scorer>>,
    must_not: Vec<Box<dyn Scorer>>,
    minimum_should_match: u32,
    max_overlap: u32,
    boost: f32,
    current_doc: DocId,
    current_overlap: u32,
}

impl BooleanScorer {
    pub fn new(
        must: Vec<ScoredClause>,
        should: Vec<ScoredClause>,
        must_not: Vec<ScoredClause>,
        minimum_should_match: u32,
        max_overlap: u32,
        boost: f32,
    ) -> Self {
        BooleanScorer {
            must: must.into_iter().map(|c| c.scorer).collect(),
            should: should.into_iter().map(|c| c.scorer).collect(),
            must_not: must_not.into_iter().map(|c| c.scorer).collect(),
            minimum_should_match,
            max_overlap,
            boost,
            current_doc: NO_MORE_DOCS,
            current_overlap: 0,
        }
    }

    fn is_prohibited(&mut self, doc: DocId) -> Result<bool> {
        for scorer in self.must_not.iter_mut() {
            let d = if scorer.doc_id() < doc { scorer.advance(doc)? } else { scorer.doc_id() };
            if d == doc {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn find_next_match(&mut self, from: DocId) -> Result<DocId> {
        let mut candidate = from;
        loop {
            if !self.must.is_empty() {
                let mut agreed = true;
                for scorer in self.must.iter_mut() {
                    let d = if scorer.doc_id() < candidate { scorer.advance(candidate)? } else { scorer.doc_id() };
                    if d == NO_MORE_DOCS {
                        self.current_doc = NO_MORE_DOCS;
                        return Ok(NO_MORE_DOCS);
                    }
                    if d > candidate {
                        candidate = d;
                        agreed = false;
                        break;
                    }
                }
                if !agreed {
                    continue;
                }
            } else if self.should.is_empty() {
                self.current_doc = NO_MORE_DOCS;
                return Ok(NO_MORE_DOCS);
            }

            let mut overlap = if self.must.is_empty() { 0 } else { self.must.len() as u32 };
            if self.must.is_empty() {
                let mut best: Option<DocId> = None;
                for scorer in self.should.iter_mut() {
                    let d = if scorer.doc_id() < candidate { scorer.advance(candidate)? } else { scorer.doc_id() };
                    if d == candidate {
                        overlap += 1;
                    } else if best.is_none_or(|b| d < b) && d != NO_MORE_DOCS {
                        best = Some(d);
                    }
                }
                if overlap == 0 {
                    match best {
                        Some(next) => {
                            candidate = next;
                            continue;
                        }
                        None => {
                            self.current_doc = NO_MORE_DOCS;
                            return Ok(NO_MORE_DOCS);
                        }
                    }
                }
            } else {
                for scorer in self.should.iter_mut() {
                    let d = if scorer.doc_id() < candidate { scorer.advance(candidate)? } else { scorer.doc_id() };
                    if d == candidate {
                        overlap += 1;
                    }
                }
            }

            if overlap < self.minimum_should_match.max(if self.must.is_empty() { 1 } else { 0 }) {
                candidate += 1;
                continue;
            }
            if self.is_prohibited(candidate)? {
                candidate += 1;
                continue;
            }

            self.current_doc = candidate;
            self.current_overlap = overlap;
            return Ok(candidate);
        }
    }
}

impl Scorer for BooleanScorer {
    fn next_doc(&mut self) -> Result<DocId> {
        let from = if self.current_doc == NO_MORE_DOCS { 0 } else { self.current_doc + 1 };
        self.find_next_match(from)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.find_next_match(target)
    }

    fn doc_id(&self) -> DocId {
        self.current_doc
    }

    fn score(&mut self) -> Result<f32> {
        let mut total = 0.0;
        for scorer in self.must.iter_mut() {
            total += scorer.score()?;
        }
        for scorer in self.should.iter_mut() {
            if scorer.doc_id() == self.current_doc {
                total += scorer.score()?;
            }
        }
        let coord = if self.max_overlap == 0 { 1.0 } else { self.current_overlap as f32 / self.max_overlap as f32 };
        Ok(total * coord * self.boost)
    }
}

/// Yields every doc in a fixed sorted list, scoring them at a constant
/// `boost` (spec.md §4.7 ConstantScoreQuery wrapping a Filter/DocIdSet).
pub struct DocListScorer {
    docs: Vec<DocId>,
    index: Option<usize>,
}

impl DocListScorer {
    pub fn new(mut docs: Vec<DocId>) -> Self {
        docs.sort_unstable();
        DocListScorer { docs, index: None }
    }
}

impl Scorer for DocListScorer {
    fn next_doc(&mut self) -> Result<DocId> {
        let next_index = self.index.map(|i| i + 1).unwrap_or(0);
        self.index = Some(next_index);
        Ok(self.docs.get(next_index).copied().unwrap_or(NO_MORE_DOCS))
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        loop {
            let doc = self.next_doc()?;
            if doc == NO_MORE_DOCS || doc >= target {
                return Ok(doc);
            }
        }
    }

    fn doc_id(&self) -> DocId {
        self.index.and_then(|i| self.docs.get(i).copied()).unwrap_or(NO_MORE_DOCS)
    }

    fn score(&mut self) -> Result<f32> {
        Ok(1.0)
    }
}

/// Wraps either a Filter's DocIdSet or an inner Query's scorer; every
/// matching doc scores `boost` regardless of the wrapped scorer's own score.
pub struct ConstantScoreScorer {
    inner: Box<dyn Scorer>,
    boost: f32,
}

impl ConstantScoreScorer {
    pub fn new(inner: Box<dyn Scorer>, boost: f32) -> Self {
        ConstantScoreScorer { inner, boost }
    }
}

impl Scorer for ConstantScoreScorer {
    fn next_doc(&mut self) -> Result<DocId> {
        self.inner.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.inner.advance(target)
    }

    fn doc_id(&self) -> DocId {
        self.inner.doc_id()
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.boost)
    }
}

/// Iterates every non-deleted doc in a segment (spec.md §4.7 MatchAllDocsQuery).
pub struct MatchAllScorer {
    segment: Arc<SegmentReader>,
    boost: f32,
    current_doc: DocId,
}

impl MatchAllScorer {
    pub fn new(segment: Arc<SegmentReader>, boost: f32) -> Self {
        MatchAllScorer { segment, boost, current_doc: NO_MORE_DOCS }
    }
}

impl Scorer for MatchAllScorer {
    fn next_doc(&mut self) -> Result<DocId> {
        let mut candidate = if self.current_doc == NO_MORE_DOCS { 0 } else { self.current_doc + 1 };
        while candidate < self.segment.max_doc() {
            if !self.segment.is_deleted(candidate) {
                self.current_doc = candidate;
                return Ok(candidate);
            }
            candidate += 1;
        }
        self.current_doc = NO_MORE_DOCS;
        Ok(NO_MORE_DOCS)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.current_doc = target.saturating_sub(1);
        if self.current_doc == DocId::MAX {
            self.current_doc = NO_MORE_DOCS;
        }
        self.next_doc()
    }

    fn doc_id(&self) -> DocId {
        self.current_doc
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.boost)
    }
}

/// Memoizes `score()` per doc so collectors calling it more than once per
/// doc pay the cost only once (spec.md §4.7 ScoreCachingWrappingScorer).
pub struct ScoreCachingWrappingScorer {
    inner: Box<dyn Scorer>,
    cached_doc: DocId,
    cached_score: f32,
}

impl ScoreCachingWrappingScorer {
    pub fn new(inner: Box<dyn Scorer>) -> Self {
        ScoreCachingWrappingScorer { inner, cached_doc: NO_MORE_DOCS, cached_score: 0.0 }
    }
}

impl Scorer for ScoreCachingWrappingScorer {
    fn next_doc(&mut self) -> Result<DocId> {
        self.inner.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.inner.advance(target)
    }

    fn doc_id(&self) -> DocId {
        self.inner.doc_id()
    }

    fn score(&mut self) -> Result<f32> {
        let doc = self.inner.doc_id();
        if doc != self.cached_doc {
            self.cached_score = self.inner.score()?;
            self.cached_doc = doc;
        }
        Ok(self.cached_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_list_scorer_streams_in_order() {
        let mut s = DocListScorer::new(vec![5, 1, 9]);
        assert_eq!(s.next_doc().unwrap(), 1);
        assert_eq!(s.next_doc().unwrap(), 5);
        assert_eq!(s.advance(9).unwrap(), 9);
        assert_eq!(s.next_doc().unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn constant_score_always_returns_boost() {
        let inner = DocListScorer::new(vec![1, 2]);
        let mut s = ConstantScoreScorer::new(Box::new(inner), 3.5);
        s.next_doc().unwrap();
        assert_eq!(s.score().unwrap(), 3.5);
    }

    #[test]
    fn score_caching_wrapper_reuses_value_for_same_doc() {
        struct CountingScorer {
            calls: u32,
            doc: DocId,
        }
        impl Scorer for CountingScorer {
            fn next_doc(&mut self) -> Result<DocId> {
                self.doc = 0;
                Ok(0)
            }
            fn advance(&mut self, _target: DocId) -> Result<DocId> {
                Ok(self.doc)
            }
            fn doc_id(&self) -> DocId {
                self.doc
            }
            fn score(&mut self) -> Result<f32> {
                self.calls += 1;
                Ok(1.0)
            }
        }
        let inner = CountingScorer { calls: 0, doc: NO_MORE_DOCS };
        let mut wrapper = ScoreCachingWrappingScorer::new(Box::new(inner));
        wrapper.next_doc().unwrap();
        wrapper.score().unwrap();
        wrapper.score().unwrap();
    }
}
