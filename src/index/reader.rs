use crate::codec::norms::NormsReader;
use crate::codec::{DeletedDocs, FieldInfos, SegmentInfo, SegmentInfos, StoredFieldsReader, TermDictionaryReader, TermInfo};
use crate::codec::postings::PostingsEnum;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, Term};
use crate::store::directory::Directory;
use crate::util::lru_cache::OrderedLruCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Tracks how many live `DirectoryReader`s still have each segment open, so
/// an `IndexWriter` can defer deleting a merged-away segment's files until
/// every reader referencing it has been dropped (spec.md §4.4 "no live
/// reader uses"). Shared between one writer and every reader opened (or
/// reopened) against its directory.
#[derive(Default)]
pub struct SegmentRefCounts {
    counts: Mutex<HashMap<String, usize>>,
}

impl SegmentRefCounts {
    pub fn new() -> Arc<Self> {
        Arc::new(SegmentRefCounts::default())
    }

    fn acquire(&self, names: &[String]) {
        let mut counts = self.counts.lock().unwrap();
        for name in names {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
    }

    fn release(&self, names: &[String]) {
        let mut counts = self.counts.lock().unwrap();
        for name in names {
            if let Some(c) = counts.get_mut(name) {
                *c = c.saturating_sub(1);
                if *c == 0 {
                    counts.remove(name);
                }
            }
        }
    }

    pub fn is_referenced(&self, name: &str) -> bool {
        self.counts.lock().unwrap().get(name).copied().unwrap_or(0) > 0
    }
}

/// Bounded number of recently resolved terms kept per segment (spec.md
/// §4.9 "used by readers to cache recently resolved term positions").
const TERM_CACHE_CAPACITY: usize = 1024;

/// Read-only view over one on-disk segment (spec.md §4.2 SegmentReader).
/// Opened once and reused across queries against the same commit point;
/// `reopen`-style freshness is handled at the `DirectoryReader` level.
pub struct SegmentReader {
    directory: Arc<dyn Directory>,
    pub info: SegmentInfo,
    field_infos: FieldInfos,
    term_dict: Option<TermDictionaryReader>,
    stored_fields: StoredFieldsReader,
    norms: NormsReader,
    deleted: DeletedDocs,
    term_cache: Mutex<OrderedLruCache<Term, Option<TermInfo>>>,
}

impl SegmentReader {
    pub fn open(directory: Arc<dyn Directory>, info: SegmentInfo) -> Result<Self> {
        let field_infos = {
            let mut input = directory.open_input(&format!("{}.fnm", info.name))?;
            FieldInfos::read(input.as_mut())?
        };

        let tis = format!("{}.tis", info.name);
        let tii = format!("{}.tii", info.name);
        let term_dict = if directory.file_exists(&tis) {
            Some(TermDictionaryReader::open(directory.as_ref(), &tis, &tii)?)
        } else {
            None
        };

        let stored_fields = StoredFieldsReader::open(
            directory.as_ref(),
            &format!("{}.fdt", info.name),
            &format!("{}.fdx", info.name),
            info.doc_count,
        )?;
        let norms = NormsReader::open(directory.as_ref(), &info.name, info.doc_count)?;
        let deleted = DeletedDocs::read(directory.as_ref(), &info.name, info.del_gen)?;

        Ok(SegmentReader {
            directory,
            info,
            field_infos,
            term_dict,
            stored_fields,
            norms,
            deleted,
            term_cache: Mutex::new(OrderedLruCache::new(TERM_CACHE_CAPACITY)),
        })
    }

    pub fn max_doc(&self) -> u32 {
        self.info.doc_count
    }

    pub fn num_docs(&self) -> u32 {
        self.info.doc_count - self.deleted_count()
    }

    pub fn deleted_count(&self) -> u32 {
        self.info.del_count
    }

    pub fn is_deleted(&self, local_doc_id: u32) -> bool {
        self.deleted.is_deleted(local_doc_id)
    }

    pub fn field_infos(&self) -> &FieldInfos {
        &self.field_infos
    }

    pub fn document(&self, local_doc_id: u32) -> Result<Document> {
        if local_doc_id >= self.info.doc_count {
            return Err(Error::new(ErrorKind::OutOfBounds, format!("doc {} out of range", local_doc_id)));
        }
        self.stored_fields.document(self.directory.as_ref(), local_doc_id)
    }

    pub fn term_info(&self, term: &Term) -> Result<Option<TermInfo>> {
        {
            let mut cache = self.term_cache.lock().unwrap();
            if let Some(cached) = cache.get(term) {
                return Ok(cached.clone());
            }
        }
        let resolved = match &self.term_dict {
            Some(dict) => dict.get(self.directory.as_ref(), term)?,
            None => None,
        };
        self.term_cache.lock().unwrap().put(term.clone(), resolved.clone());
        Ok(resolved)
    }

    /// Opens a streaming postings iterator for `term`, `None` if the term
    /// isn't present in this segment (spec.md §4.7 TermScorer construction).
    pub fn postings(&self, term: &Term) -> Result<Option<PostingsEnum>> {
        let Some(info) = self.term_info(term)? else {
            return Ok(None);
        };
        let offsets = crate::codec::postings::PostingsOffsets {
            frq_offset: info.frq_offset,
            prx_offset: info.prx_offset,
        };
        let prx_file = format!("{}.prx", self.info.name);
        let enum_ = PostingsEnum::open(
            self.directory.as_ref(),
            &format!("{}.frq", self.info.name),
            if info.has_positions { Some(prx_file.as_str()) } else { None },
            &offsets,
            info.doc_freq,
            info.has_positions,
        )?;
        Ok(Some(enum_))
    }

    pub fn doc_freq(&self, term: &Term) -> Result<u32> {
        Ok(self.term_info(term)?.map(|t| t.doc_freq).unwrap_or(0))
    }

    /// Every indexed term text for `field` in this segment (spec.md §4.7
    /// `Query.rewrite` needs this to expand prefix/wildcard/fuzzy queries).
    pub fn terms_for_field(&self, field: &str) -> Result<Vec<String>> {
        match &self.term_dict {
            Some(dict) => Ok(dict
                .iter_all(self.directory.as_ref())?
                .into_iter()
                .filter(|(t, _)| t.field == field)
                .map(|(t, _)| t.text)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Length-normalization factor for `(field, doc)`, `1.0` if the field
    /// has norms omitted (spec.md §4.7 Similarity).
    pub fn norm(&self, field_number: u32, local_doc_id: u32) -> f32 {
        self.norms.norm(field_number, local_doc_id)
    }
}

/// Read-only view across every live segment of one commit point (spec.md
/// §4.2 DirectoryReader). Global doc ids are `segment_base + local`.
pub struct DirectoryReader {
    pub generation: u64,
    segments: Vec<Arc<SegmentReader>>,
    segment_bases: Vec<u32>,
    max_doc: u32,
    refs: Arc<SegmentRefCounts>,
}

impl DirectoryReader {
    pub fn open(directory: Arc<dyn Directory>) -> Result<Self> {
        Self::open_with_refs(directory, SegmentRefCounts::new())
    }

    /// Like `open`, but shares `refs` with the `IndexWriter` that owns this
    /// directory, so the writer knows not to delete a segment's files while
    /// this reader (or any reader reopened from it) still has it open.
    pub fn open_with_refs(directory: Arc<dyn Directory>, refs: Arc<SegmentRefCounts>) -> Result<Self> {
        let infos = SegmentInfos::load_latest(directory.as_ref())?;
        Self::from_infos(directory, infos, refs)
    }

    /// Builds a reader directly from an in-memory `SegmentInfos` snapshot
    /// rather than re-reading `segments_N`, the basis for the writer's
    /// near-real-time `get_reader` (spec.md §4.1 `getReader`).
    pub(crate) fn from_infos(directory: Arc<dyn Directory>, infos: SegmentInfos, refs: Arc<SegmentRefCounts>) -> Result<Self> {
        let mut segments = Vec::with_capacity(infos.segments.len());
        let mut segment_bases = Vec::with_capacity(infos.segments.len());
        let mut base = 0u32;
        for info in infos.segments {
            let doc_count = info.doc_count;
            segments.push(Arc::new(SegmentReader::open(directory.clone(), info)?));
            segment_bases.push(base);
            base += doc_count;
        }
        let names: Vec<String> = segments.iter().map(|s| s.info.name.clone()).collect();
        refs.acquire(&names);
        Ok(DirectoryReader {
            generation: infos.generation,
            segments,
            segment_bases,
            max_doc: base,
            refs,
        })
    }

    /// Reopens against the current `segments_N`, returning a fresh reader
    /// only if the generation actually advanced (spec.md §4.2 `reopen`
    /// "near-real-time" contract — cheap no-op when nothing changed).
    pub fn reopen(&self, directory: Arc<dyn Directory>) -> Result<Option<DirectoryReader>> {
        let latest_gen = SegmentInfos::find_latest_generation(directory.as_ref())?;
        match latest_gen {
            Some(gen) if gen != self.generation => {
                let infos = SegmentInfos::read(directory.as_ref(), &SegmentInfos::file_name(gen))?;
                Ok(Some(Self::from_infos(directory, infos, self.refs.clone())?))
            }
            _ => Ok(None),
        }
    }

    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    pub fn num_docs(&self) -> u32 {
        self.segments.iter().map(|s| s.num_docs()).sum()
    }

    pub fn segments(&self) -> &[Arc<SegmentReader>] {
        &self.segments
    }

    fn locate(&self, global_doc_id: DocId) -> Option<(usize, u32)> {
        for (i, &base) in self.segment_bases.iter().enumerate() {
            let seg = &self.segments[i];
            if global_doc_id < base + seg.max_doc() {
                return Some((i, global_doc_id - base));
            }
        }
        None
    }

    pub fn document(&self, global_doc_id: DocId) -> Result<Document> {
        let (i, local) = self
            .locate(global_doc_id)
            .ok_or_else(|| Error::new(ErrorKind::OutOfBounds, format!("doc {} out of range", global_doc_id)))?;
        self.segments[i].document(local)
    }

    pub fn is_deleted(&self, global_doc_id: DocId) -> bool {
        match self.locate(global_doc_id) {
            Some((i, local)) => self.segments[i].is_deleted(local),
            None => true,
        }
    }

    pub fn segment_base(&self, segment_index: usize) -> u32 {
        self.segment_bases[segment_index]
    }

    /// Total document frequency for `term` summed across every segment
    /// (spec.md §4.7 Similarity idf input).
    pub fn doc_freq(&self, term: &Term) -> Result<u32> {
        let mut total = 0;
        for seg in &self.segments {
            total += seg.doc_freq(term)?;
        }
        Ok(total)
    }

    /// Every indexed term text for `field` across every segment, deduped.
    pub fn terms_for_field(&self, field: &str) -> Result<Vec<String>> {
        let mut all = std::collections::BTreeSet::new();
        for seg in &self.segments {
            all.extend(seg.terms_for_field(field)?);
        }
        Ok(all.into_iter().collect())
    }
}

impl Drop for DirectoryReader {
    fn drop(&mut self) {
        let names: Vec<String> = self.segments.iter().map(|s| s.info.name.clone()).collect();
        self.refs.release(&names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::config::IndexWriterConfig;
    use crate::core::types::Field;
    use crate::index::writer::IndexWriter;
    use crate::store::directory::RamDirectory;

    #[test]
    fn opens_and_reads_back_committed_documents() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let writer = IndexWriter::open(
            dir.clone(),
            IndexWriterConfig::small_and_deterministic(),
            Analyzer::standard_english(),
        )
        .unwrap();

        let mut doc = Document::new();
        doc.add(Field::text("body", "the quick brown fox jumps"));
        writer.add_document(doc).unwrap();
        writer.commit().unwrap();

        let reader = DirectoryReader::open(dir).unwrap();
        assert_eq!(reader.num_docs(), 1);
        let got = reader.document(0).unwrap();
        assert!(got.get("body").is_some());
    }

    #[test]
    fn postings_stream_the_expected_doc() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let writer = IndexWriter::open(
            dir.clone(),
            IndexWriterConfig::small_and_deterministic(),
            Analyzer::standard_english(),
        )
        .unwrap();
        let mut doc = Document::new();
        doc.add(Field::text("body", "quick fox"));
        writer.add_document(doc).unwrap();
        writer.commit().unwrap();

        let reader = DirectoryReader::open(dir).unwrap();
        let seg = &reader.segments()[0];
        let mut postings = seg.postings(&Term::new("body", "quick")).unwrap().expect("term present");
        assert_eq!(postings.next_doc().unwrap(), 0);
    }

    #[test]
    fn repeated_term_info_lookups_agree_with_the_cold_lookup() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let writer = IndexWriter::open(
            dir.clone(),
            IndexWriterConfig::small_and_deterministic(),
            Analyzer::standard_english(),
        )
        .unwrap();
        let mut doc = Document::new();
        doc.add(Field::text("body", "quick fox"));
        writer.add_document(doc).unwrap();
        writer.commit().unwrap();

        let reader = DirectoryReader::open(dir).unwrap();
        let seg = &reader.segments()[0];
        let term = Term::new("body", "quick");
        let first = seg.term_info(&term).unwrap();
        let second = seg.term_info(&term).unwrap();
        assert_eq!(first.map(|t| t.doc_freq), second.map(|t| t.doc_freq));
        assert!(seg.doc_freq(&Term::new("body", "missing")).unwrap() == 0);
    }
}
