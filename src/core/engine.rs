use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::analysis::analyzer::Analyzer;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::stats::EngineStats;
use crate::core::types::{DocId, Document, Term};
use crate::index::reader::DirectoryReader;
use crate::index::writer::IndexWriter;
use crate::query::ast::Query;
use crate::search::collector::{Collector, ScoreDoc, TopDocsCollector};
use crate::search::searcher::IndexSearcher;
use crate::store::directory::Directory;

/// Top-level facade tying writer and reader together, analogous to the
/// teacher's `core::database::Database`. One `IndexEngine` per open index:
/// single writer, many concurrent readers via reopened snapshots.
pub struct IndexEngine {
    directory: Arc<dyn Directory>,
    writer: Arc<IndexWriter>,
    reader: RwLock<Arc<DirectoryReader>>,
    start_time: Instant,
    query_count: AtomicU64,
    write_count: AtomicU64,
}

impl IndexEngine {
    /// Opens (or creates) an index at `directory`, using `analyzer` for all
    /// indexed text fields.
    pub fn open(directory: Arc<dyn Directory>, config: Config, analyzer: Analyzer) -> Result<Self> {
        let writer = Arc::new(IndexWriter::open(directory.clone(), config.writer, analyzer)?);
        let reader = Arc::new(DirectoryReader::open_with_refs(directory.clone(), writer.segment_refs())?);
        Ok(IndexEngine {
            directory,
            writer,
            reader: RwLock::new(reader),
            start_time: Instant::now(),
            query_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        })
    }

    pub fn add_document(&self, doc: Document) -> Result<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.writer.add_document(doc)
    }

    pub fn delete_documents(&self, field: &str, value: &str) -> Result<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.writer.delete_documents(Term::new(field, value))
    }

    /// Atomically replaces every document matching `(field, value)` with
    /// `doc` (spec.md §4.1 `updateDocument`).
    pub fn update_document(&self, field: &str, value: &str, doc: Document) -> Result<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.writer.update_document(Term::new(field, value), doc)
    }

    /// Merges away every segment with at least one deletion, without
    /// collapsing the whole index to a single segment (spec.md §4.1
    /// `expungeDeletes`).
    pub fn expunge_deletes(&self) -> Result<()> {
        self.writer.expunge_deletes()
    }

    /// Near-real-time refresh: flushes buffered documents and points this
    /// engine's reader at them without requiring `commit()` (spec.md §4.1
    /// `getReader`, §4.2).
    pub fn get_reader(&self) -> Result<()> {
        let nrt = self.writer.get_reader()?;
        *self.reader.write() = Arc::new(nrt);
        Ok(())
    }

    pub fn commit(&self) -> Result<u64> {
        let generation = self.writer.commit()?;
        self.refresh()?;
        Ok(generation)
    }

    pub fn flush(&self) -> Result<()> {
        self.writer.flush()
    }

    pub fn force_merge(&self, max_segment_count: usize) -> Result<()> {
        self.writer.force_merge(max_segment_count)
    }

    /// Points this engine's reader at the latest commit, picking up any
    /// segments written by `commit()` since the last refresh. Mirrors
    /// `DirectoryReader::openIfChanged` (spec.md §4.6).
    pub fn refresh(&self) -> Result<()> {
        let current = self.reader.read().clone();
        if let Some(reopened) = current.reopen(self.directory.clone())? {
            *self.reader.write() = Arc::new(reopened);
        }
        Ok(())
    }

    /// Snapshot searcher over the most recently refreshed reader. Does not
    /// block concurrent writes or later refreshes; the returned searcher
    /// keeps seeing the segments it was built with.
    pub fn searcher(&self) -> IndexSearcher {
        IndexSearcher::new(self.reader.read().clone())
    }

    pub fn search(&self, query: &Query, collector: &mut dyn Collector) -> Result<()> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.searcher().search(query, collector)
    }

    pub fn search_top_k(&self, query: &Query, k: usize) -> Result<(u32, Vec<ScoreDoc>)> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        let mut collector = TopDocsCollector::new(k);
        self.searcher().search(query, &mut collector)?;
        Ok((collector.total_hits(), collector.top_docs()))
    }

    pub fn document(&self, doc_id: DocId) -> Result<Document> {
        self.reader.read().document(doc_id)
    }

    pub fn stats(&self) -> EngineStats {
        let reader = self.reader.read();
        EngineStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            segment_count: reader.segments().len(),
            total_docs: reader.num_docs(),
            max_doc: reader.max_doc(),
            queries_served: self.query_count.load(Ordering::Relaxed),
            writes_served: self.write_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Field;
    use crate::query::ast::TermQuery;
    use crate::store::directory::RamDirectory;

    fn open_engine() -> IndexEngine {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        IndexEngine::open(dir, Config::default(), Analyzer::standard_english()).unwrap()
    }

    #[test]
    fn added_documents_are_searchable_after_commit() {
        let engine = open_engine();
        let mut doc = Document::new();
        doc.add(Field::text("body", "quick brown fox"));
        engine.add_document(doc).unwrap();
        engine.commit().unwrap();

        let (total, hits) = engine.search_top_k(&Query::Term(TermQuery::new("body", "fox")), 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].doc, 0);
    }

    #[test]
    fn update_document_atomically_replaces_a_matching_doc() {
        let engine = open_engine();
        let mut doc = Document::new();
        doc.add(Field::keyword("id", "1"));
        doc.add(Field::text("body", "original content"));
        engine.add_document(doc).unwrap();
        engine.commit().unwrap();

        let mut replacement = Document::new();
        replacement.add(Field::keyword("id", "1"));
        replacement.add(Field::text("body", "updated content"));
        engine.update_document("id", "1", replacement).unwrap();
        engine.commit().unwrap();

        let (total, _) = engine.search_top_k(&Query::Term(TermQuery::new("body", "original")), 10).unwrap();
        assert_eq!(total, 0);
        let (total, _) = engine.search_top_k(&Query::Term(TermQuery::new("body", "updated")), 10).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn get_reader_sees_uncommitted_documents() {
        let engine = open_engine();
        let mut doc = Document::new();
        doc.add(Field::text("body", "not yet committed"));
        engine.add_document(doc).unwrap();

        let (total, _) = engine.search_top_k(&Query::Term(TermQuery::new("body", "committed")), 10).unwrap();
        assert_eq!(total, 0, "plain searcher must not see uncommitted docs");

        engine.get_reader().unwrap();
        let (total, _) = engine.search_top_k(&Query::Term(TermQuery::new("body", "committed")), 10).unwrap();
        assert_eq!(total, 1, "near-real-time reader must see the flushed-but-uncommitted doc");
    }

    #[test]
    fn a_reader_held_across_force_merge_keeps_working() {
        let engine = open_engine();
        let mut doc1 = Document::new();
        doc1.add(Field::text("body", "alpha document"));
        engine.add_document(doc1).unwrap();
        engine.commit().unwrap();
        let mut doc2 = Document::new();
        doc2.add(Field::text("body", "beta document"));
        engine.add_document(doc2).unwrap();
        engine.commit().unwrap();

        let held = engine.searcher();
        engine.force_merge(1).unwrap();

        // The segments the held searcher opened must still be readable: the
        // writer must not have deleted them out from under it.
        let doc = held.reader().document(0).unwrap();
        assert!(doc.get("body").is_some());
    }

    #[test]
    fn stats_reflect_writes_and_queries() {
        let engine = open_engine();
        let mut doc = Document::new();
        doc.add(Field::text("body", "hello world"));
        engine.add_document(doc).unwrap();
        engine.commit().unwrap();
        engine.search_top_k(&Query::Term(TermQuery::new("body", "hello")), 10).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.total_docs, 1);
        assert_eq!(stats.writes_served, 1);
        assert_eq!(stats.queries_served, 1);
    }
}
