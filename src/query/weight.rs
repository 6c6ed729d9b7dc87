use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Term;
use crate::index::reader::{DirectoryReader, SegmentReader};
use crate::query::ast::{BoolQuery, PhraseQuery, Query, RangeBound, RangeQuery, TermQuery};
use crate::query::scorer::{
    BooleanScorer, ClauseKind, ConstantScoreScorer, MatchAllScorer, PhraseScorer, Scorer, ScoredClause, TermScorer,
};
use crate::query::similarity::Similarity;
use std::sync::Arc;

/// Reader-independent, per-query statistics computed once against a whole
/// `DirectoryReader` (spec.md §4.7 `Query.createWeight`).
pub enum Weight {
    Term(TermWeight),
    Phrase(PhraseWeight),
    Bool(BoolWeight),
    ConstantScore(Box<Weight>, f32),
    MatchAll(f32),
    /// A range query used purely as a non-scoring filter; callers combine it
    /// with `ConstantScore` when they want it to contribute a score.
    Range(RangeQuery),
}

pub struct TermWeight {
    pub term: Term,
    pub idf: f32,
    pub boost: f32,
    pub query_norm: f32,
}

pub struct PhraseWeight {
    pub field: String,
    pub terms: Vec<String>,
    pub slop: u32,
    pub idf_sum: f32,
    pub boost: f32,
    pub query_norm: f32,
}

pub struct BoolWeight {
    pub must: Vec<Weight>,
    pub should: Vec<Weight>,
    pub must_not: Vec<Weight>,
    pub minimum_should_match: u32,
    pub max_overlap: u32,
    pub boost: f32,
}

pub fn sum_of_squared_weights(weight: &Weight) -> f32 {
    match weight {
        Weight::Term(t) => (t.idf * t.boost).powi(2),
        Weight::Phrase(p) => (p.idf_sum * p.boost).powi(2),
        Weight::Bool(b) => {
            b.must.iter().chain(&b.should).map(sum_of_squared_weights).sum::<f32>() * b.boost.powi(2)
        }
        Weight::ConstantScore(_, boost) => boost.powi(2),
        Weight::MatchAll(boost) => boost.powi(2),
        Weight::Range(q) => q.boost.powi(2),
    }
}

fn apply_query_norm(weight: &mut Weight, query_norm: f32) {
    match weight {
        Weight::Term(t) => t.query_norm = query_norm,
        Weight::Phrase(p) => p.query_norm = query_norm,
        Weight::Bool(b) => {
            for w in b.must.iter_mut().chain(b.should.iter_mut()).chain(b.must_not.iter_mut()) {
                apply_query_norm(w, query_norm);
            }
        }
        Weight::ConstantScore(inner, _) => apply_query_norm(inner, query_norm),
        Weight::MatchAll(_) | Weight::Range(_) => {}
    }
}

/// Builds a `Weight` tree from an already-rewritten `Query`, then normalizes
/// every leaf by `queryNorm = 1 / sqrt(sumOfSquaredWeights)` (spec.md §4.7).
pub fn create_weight(query: &Query, reader: &DirectoryReader, similarity: &dyn Similarity) -> Result<Weight> {
    let mut weight = build_weight(query, reader, similarity)?;
    let sum_sq = sum_of_squared_weights(&weight);
    let query_norm = similarity.query_norm(sum_sq);
    apply_query_norm(&mut weight, query_norm);
    Ok(weight)
}

fn build_weight(query: &Query, reader: &DirectoryReader, similarity: &dyn Similarity) -> Result<Weight> {
    match query {
        Query::Term(TermQuery { field, value, boost }) => {
            let term = Term::new(field.clone(), value.clone());
            let doc_freq = reader.doc_freq(&term)?;
            let idf = similarity.idf(doc_freq, reader.max_doc().max(1));
            Ok(Weight::Term(TermWeight { term, idf, boost: *boost, query_norm: 1.0 }))
        }
        Query::Phrase(PhraseQuery { field, terms, slop, boost }) => {
            let mut idf_sum = 0.0;
            for text in terms {
                let term = Term::new(field.clone(), text.clone());
                let doc_freq = reader.doc_freq(&term)?;
                idf_sum += similarity.idf(doc_freq, reader.max_doc().max(1));
            }
            Ok(Weight::Phrase(PhraseWeight {
                field: field.clone(),
                terms: terms.clone(),
                slop: *slop,
                idf_sum,
                boost: *boost,
                query_norm: 1.0,
            }))
        }
        Query::Bool(b) => {
            let must = b.must.iter().map(|q| build_weight(q, reader, similarity)).collect::<Result<Vec<_>>>()?;
            let should = b.should.iter().map(|q| build_weight(q, reader, similarity)).collect::<Result<Vec<_>>>()?;
            let must_not = b.must_not.iter().map(|q| build_weight(q, reader, similarity)).collect::<Result<Vec<_>>>()?;
            Ok(Weight::Bool(BoolWeight {
                max_overlap: b.max_overlap(),
                minimum_should_match: b.minimum_should_match.unwrap_or(0),
                must,
                should,
                must_not,
                boost: b.boost,
            }))
        }
        Query::ConstantScore(inner) => {
            let boost = inner.boost();
            Ok(Weight::ConstantScore(Box::new(build_weight(inner, reader, similarity)?), boost))
        }
        Query::MatchAll(q) => Ok(Weight::MatchAll(q.boost)),
        Query::Range(q) => Ok(Weight::Range(q.clone())),
        Query::Prefix(_) | Query::Wildcard(_) | Query::Fuzzy(_) => Err(Error::new(
            ErrorKind::IllegalArgument,
            "multi-term query must be rewritten before createWeight".into(),
        )),
    }
}

impl Weight {
    /// Produces a per-segment `Scorer` (spec.md §4.7 `Weight.scorer`).
    pub fn scorer(&self, segment: &Arc<SegmentReader>, similarity: &dyn Similarity) -> Result<Option<Box<dyn Scorer>>> {
        match self {
            Weight::Term(t) => {
                let Some(postings) = segment.postings(&t.term)? else { return Ok(None) };
                let field_number = segment
                    .field_infos()
                    .by_name(&t.term.field)
                    .map(|fi| fi.number)
                    .unwrap_or(0);
                let weight_value = t.idf * t.boost * t.query_norm;
                Ok(Some(Box::new(TermScorer::new(postings, segment.clone(), field_number, weight_value))))
            }
            Weight::Phrase(p) => {
                let field_number = segment.field_infos().by_name(&p.field).map(|fi| fi.number).unwrap_or(0);
                let mut per_term = Vec::with_capacity(p.terms.len());
                let mut seen: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
                for (offset, text) in p.terms.iter().enumerate() {
                    let term = Term::new(p.field.clone(), text.clone());
                    let skip = seen.entry(text.as_str()).or_insert(0);
                    let this_skip = *skip;
                    *skip += 1;
                    match segment.postings(&term)? {
                        Some(postings) => per_term.push((postings, offset as u32, this_skip)),
                        None => return Ok(None),
                    }
                }
                let weight_value = p.idf_sum * p.boost * p.query_norm;
                Ok(Some(Box::new(PhraseScorer::new(
                    per_term,
                    p.slop,
                    segment.clone(),
                    field_number,
                    weight_value,
                ))))
            }
            Weight::Bool(b) => {
                let must = collect_scorers(&b.must, segment, similarity)?;
                if must.is_none_and_nonempty(&b.must) {
                    return Ok(None);
                }
                let should = collect_scorers(&b.should, segment, similarity)?;
                let must_not = collect_scorers(&b.must_not, segment, similarity)?;

                let must_clauses = must.into_scored(ClauseKind::Must);
                let should_clauses = should.into_scored(ClauseKind::Should);
                let must_not_clauses = must_not.into_scored(ClauseKind::MustNot);

                if must_clauses.is_empty() && should_clauses.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Box::new(BooleanScorer::new(
                    must_clauses,
                    should_clauses,
                    must_not_clauses,
                    b.minimum_should_match,
                    b.max_overlap,
                    b.boost,
                ))))
            }
            Weight::ConstantScore(inner, boost) => {
                let Some(inner_scorer) = inner.scorer(segment, similarity)? else { return Ok(None) };
                Ok(Some(Box::new(ConstantScoreScorer::new(inner_scorer, *boost))))
            }
            Weight::MatchAll(boost) => Ok(Some(Box::new(MatchAllScorer::new(segment.clone(), *boost)))),
            Weight::Range(q) => range_scorer(q, segment),
        }
    }
}

/// Small helper to thread `Option`-per-clause collection through `?`
/// without repeating the "all required clauses must exist" check inline.
struct ScorerSet(Vec<Option<Box<dyn Scorer>>>);

impl ScorerSet {
    fn is_none_and_nonempty(&self, clauses: &[Weight]) -> bool {
        !clauses.is_empty() && self.0.iter().all(|s| s.is_none())
    }

    fn into_scored(self, kind: ClauseKind) -> Vec<ScoredClause> {
        self.0
            .into_iter()
            .flatten()
            .map(|scorer| ScoredClause { scorer, kind })
            .collect()
    }
}

fn collect_scorers(clauses: &[Weight], segment: &Arc<SegmentReader>, similarity: &dyn Similarity) -> Result<ScorerSet> {
    let mut out = Vec::with_capacity(clauses.len());
    for clause in clauses {
        out.push(clause.scorer(segment, similarity)?);
    }
    Ok(ScorerSet(out))
}

fn range_scorer(query: &RangeQuery, segment: &Arc<SegmentReader>) -> Result<Option<Box<dyn Scorer>>> {
    let field_number = match segment.field_infos().by_name(&query.field) {
        Some(fi) => fi.number,
        None => return Ok(None),
    };
    let _ = field_number;
    let matches: Vec<u32> = (0..segment.max_doc())
        .filter(|&doc| !segment.is_deleted(doc))
        .filter(|&doc| {
            segment
                .document(doc)
                .ok()
                .and_then(|d| d.get(&query.field).cloned())
                .map(|f| bound_matches(query, &f.stored_value))
                .unwrap_or(false)
        })
        .collect();
    Ok(Some(Box::new(ConstantScoreScorer::new(
        Box::new(crate::query::scorer::DocListScorer::new(matches)),
        query.boost,
    ))))
}

fn bound_matches(query: &RangeQuery, value: &Option<crate::core::types::StoredValue>) -> bool {
    use crate::core::types::StoredValue;
    let text = match value {
        Some(StoredValue::Text(s)) => s.clone(),
        _ => return false,
    };

    let as_float = |b: &RangeBound| -> f64 {
        match b {
            RangeBound::Int(i) => *i as f64,
            RangeBound::Float(f) => *f,
            RangeBound::Text(_) => f64::NAN,
        }
    };

    if let (Ok(v), true) = (text.parse::<f64>(), query_is_numeric(query)) {
        let _ = v;
        let v = text.parse::<f64>().unwrap();
        if let Some(b) = &query.gt { if v <= as_float(b) { return false; } }
        if let Some(b) = &query.gte { if v < as_float(b) { return false; } }
        if let Some(b) = &query.lt { if v >= as_float(b) { return false; } }
        if let Some(b) = &query.lte { if v > as_float(b) { return false; } }
        true
    } else {
        if let Some(RangeBound::Text(b)) = &query.gt { if text.as_str() <= b.as_str() { return false; } }
        if let Some(RangeBound::Text(b)) = &query.gte { if text.as_str() < b.as_str() { return false; } }
        if let Some(RangeBound::Text(b)) = &query.lt { if text.as_str() >= b.as_str() { return false; } }
        if let Some(RangeBound::Text(b)) = &query.lte { if text.as_str() > b.as_str() { return false; } }
        true
    }
}

fn query_is_numeric(query: &RangeQuery) -> bool {
    [&query.gt, &query.gte, &query.lt, &query.lte]
        .into_iter()
        .flatten()
        .any(|b| !matches!(b, RangeBound::Text(_)))
}
