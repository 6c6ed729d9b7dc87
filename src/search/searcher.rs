use crate::core::error::Result;
use crate::index::reader::DirectoryReader;
use crate::query::ast::Query;
use crate::query::scorer::Scorer;
use crate::query::similarity::{DefaultSimilarity, Similarity};
use crate::query::weight::{create_weight, Weight};
use crate::search::collector::{Collector, ScoreDoc, TopDocsCollector};
use std::sync::Arc;

/// Ties rewrite -> createWeight -> per-segment scorer -> Collector together
/// (spec.md §4.7). Holds one `DirectoryReader` snapshot; `reopen` the
/// underlying reader and build a new `IndexSearcher` to see later commits.
pub struct IndexSearcher {
    reader: Arc<DirectoryReader>,
    similarity: Box<dyn Similarity>,
}

impl IndexSearcher {
    pub fn new(reader: Arc<DirectoryReader>) -> Self {
        IndexSearcher { reader, similarity: Box::new(DefaultSimilarity) }
    }

    pub fn with_similarity(reader: Arc<DirectoryReader>, similarity: Box<dyn Similarity>) -> Self {
        IndexSearcher { reader, similarity }
    }

    pub fn reader(&self) -> &DirectoryReader {
        &self.reader
    }

    /// Calls `query.rewrite` until a fixed point is reached (spec.md §4.7
    /// "the searcher calls rewrite until the returned query equals the
    /// input").
    pub fn rewrite(&self, query: &Query) -> Result<Query> {
        let mut current = query.clone();
        loop {
            let reader = &self.reader;
            let next = current.rewrite(&|field| reader.terms_for_field(field).unwrap_or_default());
            if next == current {
                return Ok(next);
            }
            current = next;
        }
    }

    /// Runs `query` against every live segment, feeding matches to
    /// `collector` in per-segment docId order.
    pub fn search(&self, query: &Query, collector: &mut dyn Collector) -> Result<()> {
        let rewritten = self.rewrite(query)?;
        let weight = create_weight(&rewritten, &self.reader, self.similarity.as_ref())?;
        self.search_weight(&weight, collector)
    }

    pub fn search_weight(&self, weight: &Weight, collector: &mut dyn Collector) -> Result<()> {
        for (index, segment) in self.reader.segments().iter().enumerate() {
            let doc_base = self.reader.segment_base(index);
            collector.set_next_reader(doc_base);
            let Some(mut scorer) = weight.scorer(segment, self.similarity.as_ref())? else { continue };
            drive_scorer(scorer.as_mut(), collector)?;
        }
        Ok(())
    }

    /// Convenience wrapper returning the top `k` scoring docs.
    pub fn search_top_k(&self, query: &Query, k: usize) -> Result<(u32, Vec<ScoreDoc>)> {
        let mut collector = TopDocsCollector::new(k);
        self.search(query, &mut collector)?;
        let total = collector.total_hits();
        Ok((total, collector.top_docs()))
    }
}

fn drive_scorer(scorer: &mut dyn Scorer, collector: &mut dyn Collector) -> Result<()> {
    loop {
        let doc = scorer.next_doc()?;
        if doc == crate::core::types::NO_MORE_DOCS {
            return Ok(());
        }
        let score = scorer.score()?;
        collector.collect(doc, score)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::config::IndexWriterConfig;
    use crate::core::types::{Document, Field};
    use crate::index::writer::IndexWriter;
    use crate::query::ast::{BoolQuery, MatchAllQuery, TermQuery};
    use crate::store::directory::{Directory, RamDirectory};

    fn build_index(docs: &[&str]) -> Arc<DirectoryReader> {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let writer = IndexWriter::open(dir.clone(), IndexWriterConfig::small_and_deterministic(), Analyzer::standard_english()).unwrap();
        for text in docs {
            let mut doc = Document::new();
            doc.add(Field::text("body", *text));
            writer.add_document(doc).unwrap();
        }
        writer.commit().unwrap();
        Arc::new(DirectoryReader::open(dir).unwrap())
    }

    #[test]
    fn term_query_finds_matching_doc() {
        let reader = build_index(&["the quick brown fox", "lazy dog sleeps"]);
        let searcher = IndexSearcher::new(reader);
        let query = Query::Term(TermQuery::new("body", "fox"));
        let (total, top) = searcher.search_top_k(&query, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(top[0].doc, 0);
    }

    #[test]
    fn bool_must_requires_every_clause() {
        let reader = build_index(&["quick fox", "quick dog", "slow fox"]);
        let searcher = IndexSearcher::new(reader);
        let query = Query::Bool(
            BoolQuery::new()
                .with_must(Query::Term(TermQuery::new("body", "quick")))
                .with_must(Query::Term(TermQuery::new("body", "fox"))),
        );
        let (total, top) = searcher.search_top_k(&query, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(top[0].doc, 0);
    }

    #[test]
    fn match_all_returns_every_live_doc() {
        let reader = build_index(&["a", "b", "c"]);
        let searcher = IndexSearcher::new(reader);
        let (total, _) = searcher.search_top_k(&Query::MatchAll(MatchAllQuery { boost: 1.0 }), 10).unwrap();
        assert_eq!(total, 3);
    }
}
