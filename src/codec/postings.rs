use crate::core::error::Result;
use crate::core::types::{DocId, NO_MORE_DOCS};
use crate::store::directory::Directory;
use crate::store::io::{ByteArrayIndexOutput, IndexInput, IndexOutput};

/// One term's postings for a single document, accumulated in RAM while a
/// segment is being built (spec.md §3 Posting).
#[derive(Debug, Clone, Default)]
pub struct PostingBuilder {
    pub doc_id: DocId,
    pub freq: u32,
    pub positions: Vec<u32>,
}

/// Appends delta-encoded `(docId, freq)` pairs to `.frq` and, for fields
/// indexed with positions, delta-encoded position lists to `.prx`. Returns
/// the byte offsets a `TermInfo` needs to locate this term's postings
/// later.
pub struct PostingsWriter<'a> {
    frq_out: &'a mut dyn IndexOutput,
    prx_out: Option<&'a mut dyn IndexOutput>,
    last_doc: i64,
}

pub struct PostingsOffsets {
    pub frq_offset: u64,
    pub prx_offset: u64,
}

impl<'a> PostingsWriter<'a> {
    pub fn new(frq_out: &'a mut dyn IndexOutput, prx_out: Option<&'a mut dyn IndexOutput>) -> Self {
        PostingsWriter {
            frq_out,
            prx_out,
            last_doc: -1,
        }
    }

    /// Writes one term's full posting list (already sorted by ascending
    /// `doc_id`, strictly increasing per spec.md §3).
    pub fn write_term_postings(&mut self, postings: &[PostingBuilder]) -> Result<PostingsOffsets> {
        let frq_offset = self.frq_out.position();
        let prx_offset = self.prx_out.as_ref().map(|o| o.position()).unwrap_or(0);

        self.last_doc = -1;
        for posting in postings {
            let delta = posting.doc_id as i64 - self.last_doc;
            debug_assert!(delta > 0, "postings must be strictly increasing by doc_id");
            self.last_doc = posting.doc_id as i64;

            self.frq_out.write_vint(delta as u32)?;
            self.frq_out.write_vint(posting.freq)?;

            if let Some(prx_out) = self.prx_out.as_mut() {
                let mut last_pos = 0i64;
                for &pos in &posting.positions {
                    let pos_delta = pos as i64 - last_pos;
                    prx_out.write_vint(pos_delta as u32)?;
                    last_pos = pos as i64;
                }
            }
        }

        Ok(PostingsOffsets { frq_offset, prx_offset })
    }
}

/// Streaming per-term postings iterator (spec.md §4.7 TermScorer wraps a
/// TermDocs iterator). `doc_id()` is `NO_MORE_DOCS` before the first
/// `next_doc`/`advance` and after exhaustion.
pub struct PostingsEnum {
    frq: Box<dyn IndexInput>,
    prx: Option<Box<dyn IndexInput>>,
    remaining: u32,
    doc_freq: u32,
    current_doc: DocId,
    current_freq: u32,
    last_doc: i64,
    has_positions: bool,
}

impl PostingsEnum {
    pub fn open(
        directory: &dyn Directory,
        frq_file: &str,
        prx_file: Option<&str>,
        offsets: &PostingsOffsets,
        doc_freq: u32,
        has_positions: bool,
    ) -> Result<Self> {
        let mut frq = directory.open_input(frq_file)?;
        frq.seek(offsets.frq_offset)?;
        let prx = if has_positions {
            let mut p = directory.open_input(prx_file.expect("positions require a .prx file"))?;
            p.seek(offsets.prx_offset)?;
            Some(p)
        } else {
            None
        };

        Ok(PostingsEnum {
            frq,
            prx,
            remaining: doc_freq,
            doc_freq,
            current_doc: NO_MORE_DOCS,
            current_freq: 0,
            last_doc: -1,
            has_positions,
        })
    }

    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    pub fn doc_id(&self) -> DocId {
        self.current_doc
    }

    pub fn freq(&self) -> u32 {
        self.current_freq
    }

    fn skip_positions_of_current(&mut self) -> Result<()> {
        if let Some(prx) = self.prx.as_mut() {
            for _ in 0..self.current_freq {
                prx.read_vint()?;
            }
        }
        Ok(())
    }

    /// Positions of the current document, decoded from the `.prx` delta
    /// stream. Consumes the position bytes for this doc; callers must read
    /// positions before advancing past the doc if they need them.
    pub fn positions(&mut self) -> Result<Vec<u32>> {
        if !self.has_positions {
            return Ok(Vec::new());
        }
        let prx = self.prx.as_mut().expect("has_positions implies a .prx input");
        let mut out = Vec::with_capacity(self.current_freq as usize);
        let mut pos = 0i64;
        for _ in 0..self.current_freq {
            pos += prx.read_vint()? as i64;
            out.push(pos as u32);
        }
        Ok(out)
    }

    pub fn next_doc(&mut self) -> Result<DocId> {
        if self.remaining == 0 {
            self.current_doc = NO_MORE_DOCS;
            return Ok(NO_MORE_DOCS);
        }
        // If the caller never consumed this doc's positions, skip past them
        // so the .prx cursor stays aligned with .frq.
        if self.current_doc != NO_MORE_DOCS && self.has_positions {
            self.skip_positions_of_current()?;
        }

        let delta = self.frq.read_vint()? as i64;
        self.last_doc += delta;
        self.current_doc = self.last_doc as DocId;
        self.current_freq = self.frq.read_vint()?;
        self.remaining -= 1;
        Ok(self.current_doc)
    }

    pub fn advance(&mut self, target: DocId) -> Result<DocId> {
        loop {
            let doc = self.next_doc()?;
            if doc == NO_MORE_DOCS || doc >= target {
                return Ok(doc);
            }
        }
    }
}

/// Convenience used by in-RAM code paths (e.g. query result explanation)
/// that want the whole list at once instead of streaming.
pub fn decode_all(
    directory: &dyn Directory,
    frq_file: &str,
    prx_file: Option<&str>,
    offsets: &PostingsOffsets,
    doc_freq: u32,
    has_positions: bool,
) -> Result<Vec<PostingBuilder>> {
    let mut iter = PostingsEnum::open(directory, frq_file, prx_file, offsets, doc_freq, has_positions)?;
    let mut out = Vec::with_capacity(doc_freq as usize);
    loop {
        let doc = iter.next_doc()?;
        if doc == NO_MORE_DOCS {
            break;
        }
        let positions = iter.positions()?;
        out.push(PostingBuilder {
            doc_id: doc,
            freq: iter.freq(),
            positions,
        });
    }
    Ok(out)
}

/// A `.frq`/`.prx` pair reachable purely in memory, used by unit tests that
/// don't want a `Directory` round trip.
pub fn encode_in_memory(postings: &[PostingBuilder], with_positions: bool) -> (Vec<u8>, Vec<u8>) {
    let mut frq = ByteArrayIndexOutput::new();
    let mut prx = ByteArrayIndexOutput::new();
    {
        let mut writer = if with_positions {
            PostingsWriter::new(&mut frq, Some(&mut prx))
        } else {
            PostingsWriter::new(&mut frq, None)
        };
        writer.write_term_postings(postings).unwrap();
    }
    (frq.into_bytes(), prx.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    #[test]
    fn streams_docs_in_increasing_order() {
        let dir = RamDirectory::new();
        let postings = vec![
            PostingBuilder { doc_id: 0, freq: 2, positions: vec![1, 5] },
            PostingBuilder { doc_id: 3, freq: 1, positions: vec![0] },
            PostingBuilder { doc_id: 10, freq: 3, positions: vec![0, 1, 2] },
        ];

        let offsets = {
            let mut frq_out = dir.create_output("_0.frq").unwrap();
            let mut prx_out = dir.create_output("_0.prx").unwrap();
            let mut writer = PostingsWriter::new(frq_out.as_mut(), Some(prx_out.as_mut()));
            let offsets = writer.write_term_postings(&postings).unwrap();
            frq_out.flush().unwrap();
            prx_out.flush().unwrap();
            offsets
        };

        let mut iter =
            PostingsEnum::open(&dir, "_0.frq", Some("_0.prx"), &offsets, 3, true).unwrap();
        assert_eq!(iter.doc_id(), NO_MORE_DOCS);

        assert_eq!(iter.next_doc().unwrap(), 0);
        assert_eq!(iter.positions().unwrap(), vec![1, 5]);
        assert_eq!(iter.next_doc().unwrap(), 3);
        assert_eq!(iter.positions().unwrap(), vec![0]);
        assert_eq!(iter.next_doc().unwrap(), 10);
        assert_eq!(iter.freq(), 3);
        assert_eq!(iter.next_doc().unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn advance_seeks_to_first_doc_geq_target() {
        let dir = RamDirectory::new();
        let postings: Vec<_> = [0u32, 5, 9, 20]
            .iter()
            .map(|&d| PostingBuilder { doc_id: d, freq: 1, positions: vec![] })
            .collect();

        let offsets = {
            let mut frq_out = dir.create_output("_1.frq").unwrap();
            let mut writer = PostingsWriter::new(frq_out.as_mut(), None);
            let offsets = writer.write_term_postings(&postings).unwrap();
            frq_out.flush().unwrap();
            offsets
        };

        let mut iter = PostingsEnum::open(&dir, "_1.frq", None, &offsets, 4, false).unwrap();
        assert_eq!(iter.advance(7).unwrap(), 9);
        assert_eq!(iter.advance(9).unwrap(), 9);
        assert_eq!(iter.advance(21).unwrap(), NO_MORE_DOCS);
    }
}
