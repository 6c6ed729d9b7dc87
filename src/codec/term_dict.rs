use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Term;
use crate::store::directory::Directory;
use crate::store::io::{IndexInput, IndexOutput};

/// Everything needed to locate one term's postings and decode its norm
/// contribution (spec.md §3 TermInfo).
#[derive(Debug, Clone, Copy)]
pub struct TermInfo {
    pub doc_freq: u32,
    pub frq_offset: u64,
    pub prx_offset: u64,
    pub has_positions: bool,
}

/// Every `index_interval`-th term gets an entry in `.tii` so a lookup can
/// binary-search the sampled index, then linear-scan `.tis` from there
/// (spec.md §4.6 term dictionary skip structure).
const DEFAULT_INDEX_INTERVAL: u32 = 32;

struct IndexedTerm {
    term: Term,
    tis_offset: u64,
}

/// Writes `.tis` (every term, in sorted order, with its `TermInfo`) and
/// `.tii` (a sampled skip index into `.tis`). Terms must be fed in strictly
/// increasing `(field, text)` order.
pub struct TermDictionaryWriter<'a> {
    tis_out: &'a mut dyn IndexOutput,
    index_interval: u32,
    count: u32,
    indexed: Vec<IndexedTerm>,
}

impl<'a> TermDictionaryWriter<'a> {
    pub fn new(tis_out: &'a mut dyn IndexOutput) -> Self {
        TermDictionaryWriter {
            tis_out,
            index_interval: DEFAULT_INDEX_INTERVAL,
            count: 0,
            indexed: Vec::new(),
        }
    }

    pub fn add_term(&mut self, term: &Term, info: &TermInfo) -> Result<()> {
        let tis_offset = self.tis_out.position();
        if self.count % self.index_interval == 0 {
            self.indexed.push(IndexedTerm {
                term: term.clone(),
                tis_offset,
            });
        }

        self.tis_out.write_string(&term.field)?;
        self.tis_out.write_string(&term.text)?;
        self.tis_out.write_vint(info.doc_freq)?;
        self.tis_out.write_vlong(info.frq_offset)?;
        self.tis_out.write_vlong(info.prx_offset)?;
        self.tis_out.write_byte(if info.has_positions { 1 } else { 0 })?;

        self.count += 1;
        Ok(())
    }

    /// Writes the `.tii` sampled index. Call after all terms have been
    /// added via `add_term`.
    pub fn finish(&self, tii_out: &mut dyn IndexOutput) -> Result<()> {
        tii_out.write_vint(self.index_interval)?;
        tii_out.write_vint(self.count)?;
        tii_out.write_vint(self.indexed.len() as u32)?;
        for entry in &self.indexed {
            tii_out.write_string(&entry.term.field)?;
            tii_out.write_string(&entry.term.text)?;
            tii_out.write_vlong(entry.tis_offset)?;
        }
        Ok(())
    }
}

/// Read side: loads the sampled `.tii` index into memory (small — one entry
/// per `index_interval` terms), then binary-searches it and linear-scans
/// `.tis` from the bracketing offset to find an exact term.
pub struct TermDictionaryReader {
    tis_file: String,
    index_interval: u32,
    term_count: u32,
    indexed: Vec<IndexedTerm>,
}

impl TermDictionaryReader {
    pub fn open(directory: &dyn Directory, tis_file: &str, tii_file: &str) -> Result<Self> {
        let mut tii = directory.open_input(tii_file)?;
        let index_interval = tii.read_vint()?;
        let term_count = tii.read_vint()?;
        let indexed_count = tii.read_vint()? as usize;
        let mut indexed = Vec::with_capacity(indexed_count);
        for _ in 0..indexed_count {
            let field = tii.read_string()?;
            let text = tii.read_string()?;
            let tis_offset = tii.read_vlong()?;
            indexed.push(IndexedTerm {
                term: Term::new(field, text),
                tis_offset,
            });
        }

        Ok(TermDictionaryReader {
            tis_file: tis_file.to_string(),
            index_interval,
            term_count,
            indexed,
        })
    }

    pub fn term_count(&self) -> u32 {
        self.term_count
    }

    /// Exact lookup. `None` if the term is not present in this segment.
    pub fn get(&self, directory: &dyn Directory, term: &Term) -> Result<Option<TermInfo>> {
        let start = match self.indexed.partition_point(|e| &e.term <= term) {
            0 => 0,
            n => n - 1,
        };
        let Some(bracket) = self.indexed.get(start) else {
            return Ok(None);
        };

        let mut tis = directory.open_input(&self.tis_file)?;
        tis.seek(bracket.tis_offset)?;

        // Scan forward at most index_interval terms from the bracketing
        // sample; sorted order means overshoot implies absence.
        for _ in 0..self.index_interval {
            if tis.position() >= tis.length() {
                break;
            }
            let field = tis.read_string()?;
            let text = tis.read_string()?;
            let doc_freq = tis.read_vint()?;
            let frq_offset = tis.read_vlong()?;
            let prx_offset = tis.read_vlong()?;
            let has_positions = tis.read_byte()? != 0;
            let candidate = Term::new(field, text);

            if &candidate == term {
                return Ok(Some(TermInfo {
                    doc_freq,
                    frq_offset,
                    prx_offset,
                    has_positions,
                }));
            }
            if &candidate > term {
                return Ok(None);
            }
        }
        Ok(None)
    }

    /// Every term in the dictionary, in sorted order — used by term
    /// enumeration (spec.md §4.6 `TermEnum`) and by merges that need to walk
    /// all segments' vocabularies in lockstep.
    pub fn iter_all(&self, directory: &dyn Directory) -> Result<Vec<(Term, TermInfo)>> {
        let mut tis = directory.open_input(&self.tis_file)?;
        tis.seek(0)?;
        let mut out = Vec::with_capacity(self.term_count as usize);
        for _ in 0..self.term_count {
            let field = tis.read_string()?;
            let text = tis.read_string()?;
            let doc_freq = tis.read_vint()?;
            let frq_offset = tis.read_vlong()?;
            let prx_offset = tis.read_vlong()?;
            let has_positions = tis.read_byte()? != 0;
            out.push((
                Term::new(field, text),
                TermInfo {
                    doc_freq,
                    frq_offset,
                    prx_offset,
                    has_positions,
                },
            ));
        }
        Ok(out)
    }
}

/// Builds a `.tis`/`.tii` pair from an already-sorted `(Term, TermInfo)`
/// list, used by the segment flush path once postings have been written
/// and their offsets are known.
pub fn write_term_dictionary(
    directory: &dyn Directory,
    segment_name: &str,
    terms: &[(Term, TermInfo)],
) -> Result<()> {
    for w in terms.windows(2) {
        if w[0].0 >= w[1].0 {
            return Err(Error::new(
                ErrorKind::IllegalArgument,
                "terms must be sorted and unique".into(),
            ));
        }
    }

    let tis_name = format!("{}.tis", segment_name);
    let tii_name = format!("{}.tii", segment_name);
    let mut tis_out = directory.create_output(&tis_name)?;
    let indexed_entries = {
        let mut writer = TermDictionaryWriter::new(tis_out.as_mut());
        for (term, info) in terms {
            writer.add_term(term, info)?;
        }
        let mut tii_out = directory.create_output(&tii_name)?;
        writer.finish(tii_out.as_mut())?;
        tii_out.flush()?;
        writer.indexed.len()
    };
    tis_out.flush()?;
    let _ = indexed_entries;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    fn sample_terms(n: u32) -> Vec<(Term, TermInfo)> {
        (0..n)
            .map(|i| {
                (
                    Term::new("body", format!("term{:05}", i)),
                    TermInfo {
                        doc_freq: i + 1,
                        frq_offset: (i * 10) as u64,
                        prx_offset: (i * 20) as u64,
                        has_positions: true,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn exact_lookup_across_index_interval_boundary() {
        let dir = RamDirectory::new();
        let terms = sample_terms(100);
        write_term_dictionary(&dir, "_0", &terms).unwrap();

        let reader = TermDictionaryReader::open(&dir, "_0.tis", "_0.tii").unwrap();
        assert_eq!(reader.term_count(), 100);

        let found = reader
            .get(&dir, &Term::new("body", "term00050"))
            .unwrap()
            .expect("term present");
        assert_eq!(found.doc_freq, 51);
        assert_eq!(found.frq_offset, 500);
    }

    #[test]
    fn missing_term_returns_none() {
        let dir = RamDirectory::new();
        let terms = sample_terms(10);
        write_term_dictionary(&dir, "_0", &terms).unwrap();

        let reader = TermDictionaryReader::open(&dir, "_0.tis", "_0.tii").unwrap();
        assert!(reader.get(&dir, &Term::new("body", "zzzzz")).unwrap().is_none());
        assert!(reader.get(&dir, &Term::new("other", "term00001")).unwrap().is_none());
    }

    #[test]
    fn iter_all_returns_every_term_sorted() {
        let dir = RamDirectory::new();
        let terms = sample_terms(5);
        write_term_dictionary(&dir, "_0", &terms).unwrap();

        let reader = TermDictionaryReader::open(&dir, "_0.tis", "_0.tii").unwrap();
        let all = reader.iter_all(&dir).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].0.text, "term00000");
        assert_eq!(all[4].0.text, "term00004");
    }
}
