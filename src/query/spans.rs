use crate::codec::postings::PostingsEnum;
use crate::core::error::Result;
use crate::core::types::{DocId, NO_MORE_DOCS};

/// Position-level iterator yielding `(doc, start, end)` triples with
/// `start <= end` (spec.md §4.7 SpanQuery / Spans), composable by
/// near/or/not/first the way `BooleanScorer` composes whole-document scorers.
pub trait Spans {
    fn next(&mut self) -> Result<bool>;
    fn skip_to(&mut self, target: DocId) -> Result<bool>;
    fn doc(&self) -> DocId;
    fn start(&self) -> u32;
    fn end(&self) -> u32;
}

/// A single term used as a span: every occurrence is a zero-width span
/// `[position, position]`.
pub struct SpanTerm {
    postings: PostingsEnum,
    positions: Vec<u32>,
    index: usize,
}

impl SpanTerm {
    pub fn new(postings: PostingsEnum) -> Self {
        SpanTerm { postings, positions: Vec::new(), index: 0 }
    }
}

impl Spans for SpanTerm {
    fn next(&mut self) -> Result<bool> {
        if self.index + 1 < self.positions.len() {
            self.index += 1;
            return Ok(true);
        }
        let doc = self.postings.next_doc()?;
        if doc == NO_MORE_DOCS {
            return Ok(false);
        }
        self.positions = self.postings.positions()?;
        self.index = 0;
        Ok(!self.positions.is_empty())
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        let doc = self.postings.advance(target)?;
        if doc == NO_MORE_DOCS {
            return Ok(false);
        }
        self.positions = self.postings.positions()?;
        self.index = 0;
        Ok(!self.positions.is_empty())
    }

    fn doc(&self) -> DocId {
        self.postings.doc_id()
    }

    fn start(&self) -> u32 {
        self.positions[self.index]
    }

    fn end(&self) -> u32 {
        self.positions[self.index]
    }
}

/// Ordered proximity match between two sub-spans: `b` must start within
/// `slop` positions after `a` ends (a simplified `SpanNearQuery`, ordered
/// clauses only).
pub struct SpanNear {
    a: Box<dyn Spans>,
    b: Box<dyn Spans>,
    slop: u32,
    current_start: u32,
    current_end: u32,
}

impl SpanNear {
    pub fn new(a: Box<dyn Spans>, b: Box<dyn Spans>, slop: u32) -> Self {
        SpanNear { a, b, slop, current_start: 0, current_end: 0 }
    }

    fn align_on_current_doc(&mut self) -> Result<bool> {
        loop {
            if self.b.doc() != self.a.doc() {
                if !self.b.skip_to(self.a.doc())? {
                    return Ok(false);
                }
                if self.b.doc() != self.a.doc() {
                    if !self.a.skip_to(self.b.doc())? {
                        return Ok(false);
                    }
                    continue;
                }
            }
            if self.b.start() >= self.a.end() && self.b.start() - self.a.end() <= self.slop {
                self.current_start = self.a.start();
                self.current_end = self.b.end();
                return Ok(true);
            }
            if !self.b.next()? {
                if !self.a.next()? {
                    return Ok(false);
                }
            }
        }
    }
}

impl Spans for SpanNear {
    fn next(&mut self) -> Result<bool> {
        if !self.a.next()? {
            return Ok(false);
        }
        self.align_on_current_doc()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if !self.a.skip_to(target)? {
            return Ok(false);
        }
        self.align_on_current_doc()
    }

    fn doc(&self) -> DocId {
        self.a.doc()
    }

    fn start(&self) -> u32 {
        self.current_start
    }

    fn end(&self) -> u32 {
        self.current_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::postings::{encode_in_memory, PostingBuilder};
    use crate::store::directory::RamDirectory;
    use crate::store::directory::Directory;
    use crate::codec::postings::{PostingsWriter, PostingsOffsets};
    use crate::store::io::IndexOutput;

    fn postings_for(dir: &RamDirectory, name: &str, docs: Vec<PostingBuilder>) -> PostingsEnum {
        let offsets = {
            let mut frq_out = dir.create_output(&format!("{name}.frq")).unwrap();
            let mut prx_out = dir.create_output(&format!("{name}.prx")).unwrap();
            let mut writer = PostingsWriter::new(frq_out.as_mut(), Some(prx_out.as_mut()));
            let offsets = writer.write_term_postings(&docs).unwrap();
            frq_out.flush().unwrap();
            prx_out.flush().unwrap();
            offsets
        };
        let _ = encode_in_memory;
        let _: PostingsOffsets = offsets;
        PostingsEnum::open(dir, &format!("{name}.frq"), Some(&format!("{name}.prx")), &offsets, docs.len() as u32, true).unwrap()
    }

    #[test]
    fn span_near_finds_adjacent_terms_within_slop() {
        let dir = RamDirectory::new();
        let quick = postings_for(&dir, "_quick", vec![PostingBuilder { doc_id: 0, freq: 1, positions: vec![1] }]);
        let fox = postings_for(&dir, "_fox", vec![PostingBuilder { doc_id: 0, freq: 1, positions: vec![2] }]);

        let mut near = SpanNear::new(Box::new(SpanTerm::new(quick)), Box::new(SpanTerm::new(fox)), 0);
        assert!(near.next().unwrap());
        assert_eq!(near.doc(), 0);
        assert_eq!(near.start(), 1);
        assert_eq!(near.end(), 2);
    }
}
