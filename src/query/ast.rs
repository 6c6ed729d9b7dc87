use serde::{Deserialize, Serialize};

/// Main query enum representing all query types (spec.md §4.7 Query).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),
    Phrase(PhraseQuery),
    Bool(BoolQuery),
    Range(RangeQuery),
    Prefix(PrefixQuery),
    Wildcard(WildcardQuery),
    Fuzzy(FuzzyQuery),
    ConstantScore(Box<Query>),
    MatchAll(MatchAllQuery),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
    pub boost: f32,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        TermQuery { field: field.into(), value: value.into(), boost: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub terms: Vec<String>,
    pub slop: u32,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub filter: Vec<Query>,
    pub minimum_should_match: Option<u32>,
    pub boost: f32,
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            filter: Vec::new(),
            minimum_should_match: None,
            boost: 1.0,
        }
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn with_must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    pub fn with_filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    pub fn max_overlap(&self) -> u32 {
        (self.must.len() + self.should.len()) as u32
    }
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Sortable bound for a range query; numeric and textual fields both reduce
/// to an ordering in their own key space (spec.md §4.7 FieldCacheRangeFilter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RangeBound {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    pub gt: Option<RangeBound>,
    pub gte: Option<RangeBound>,
    pub lt: Option<RangeBound>,
    pub lte: Option<RangeBound>,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyQuery {
    pub field: String,
    pub term: String,
    pub max_edits: u8,
    pub prefix_length: u8,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MatchAllQuery {
    pub boost: f32,
}

impl Query {
    pub fn boost(&self) -> f32 {
        match self {
            Query::Term(q) => q.boost,
            Query::Phrase(q) => q.boost,
            Query::Bool(q) => q.boost,
            Query::Range(q) => q.boost,
            Query::Prefix(q) => q.boost,
            Query::Wildcard(q) => q.boost,
            Query::Fuzzy(q) => q.boost,
            Query::ConstantScore(_) => 1.0,
            Query::MatchAll(q) => q.boost,
        }
    }

    /// Expands a query into an equivalent, simpler form a `Weight` can be
    /// built from directly (spec.md §4.7 `Query.rewrite`). Multi-term forms
    /// (`Prefix`/`Wildcard`/`Fuzzy`) expand against `term_lookup`, a
    /// callback returning every indexed term text for a field; the searcher
    /// calls `rewrite` until a fixed point is reached.
    pub fn rewrite(&self, term_lookup: &dyn Fn(&str) -> Vec<String>) -> Query {
        match self {
            Query::Prefix(q) => {
                let matches: Vec<Query> = term_lookup(&q.field)
                    .into_iter()
                    .filter(|t| t.starts_with(&q.prefix))
                    .map(|t| Query::Term(TermQuery { field: q.field.clone(), value: t, boost: 1.0 }))
                    .collect();
                Query::Bool(BoolQuery { should: matches, boost: q.boost, ..BoolQuery::new() })
            }
            Query::Wildcard(q) => {
                let matches: Vec<Query> = term_lookup(&q.field)
                    .into_iter()
                    .filter(|t| wildcard_matches(&q.pattern, t))
                    .map(|t| Query::Term(TermQuery { field: q.field.clone(), value: t, boost: 1.0 }))
                    .collect();
                Query::Bool(BoolQuery { should: matches, boost: q.boost, ..BoolQuery::new() })
            }
            Query::Fuzzy(q) => {
                let matches: Vec<Query> = term_lookup(&q.field)
                    .into_iter()
                    .filter(|t| levenshtein_within(&q.term, t, q.max_edits as u32))
                    .map(|t| Query::Term(TermQuery { field: q.field.clone(), value: t, boost: 1.0 }))
                    .collect();
                Query::Bool(BoolQuery { should: matches, boost: q.boost, ..BoolQuery::new() })
            }
            Query::Bool(q) => Query::Bool(BoolQuery {
                must: q.must.iter().map(|c| c.rewrite(term_lookup)).collect(),
                should: q.should.iter().map(|c| c.rewrite(term_lookup)).collect(),
                must_not: q.must_not.iter().map(|c| c.rewrite(term_lookup)).collect(),
                filter: q.filter.iter().map(|c| c.rewrite(term_lookup)).collect(),
                minimum_should_match: q.minimum_should_match,
                boost: q.boost,
            }),
            Query::ConstantScore(inner) => Query::ConstantScore(Box::new(inner.rewrite(term_lookup))),
            other => other.clone(),
        }
    }
}

fn wildcard_matches(pattern: &str, text: &str) -> bool {
    fn go(p: &[char], t: &[char]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some('*') => go(&p[1..], t) || (!t.is_empty() && go(p, &t[1..])),
            Some('?') => !t.is_empty() && go(&p[1..], &t[1..]),
            Some(c) => t.first() == Some(c) && go(&p[1..], &t[1..]),
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    go(&p, &t)
}

fn levenshtein_within(a: &str, b: &str, max_edits: u32) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<u32> = (0..=b.len() as u32).collect();
    for i in 1..=a.len() {
        let mut row = vec![i as u32];
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            row.push((prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost));
        }
        prev = row;
    }
    prev[b.len()] <= max_edits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rewrites_to_bool_should_of_terms() {
        let q = Query::Prefix(PrefixQuery { field: "body".into(), prefix: "fo".into(), boost: 1.0 });
        let rewritten = q.rewrite(&|_| vec!["fox".into(), "bar".into(), "foo".into()]);
        match rewritten {
            Query::Bool(b) => assert_eq!(b.should.len(), 2),
            _ => panic!("expected Bool"),
        }
    }

    #[test]
    fn wildcard_star_and_question_mark() {
        assert!(wildcard_matches("fo?", "fox"));
        assert!(wildcard_matches("f*x", "ferrox"));
        assert!(!wildcard_matches("f*x", "ferroy"));
    }

    #[test]
    fn fuzzy_rewrites_within_edit_distance() {
        let q = Query::Fuzzy(FuzzyQuery { field: "body".into(), term: "fox".into(), max_edits: 1, prefix_length: 0, boost: 1.0 });
        let rewritten = q.rewrite(&|_| vec!["fax".into(), "foxes".into(), "cat".into()]);
        match rewritten {
            Query::Bool(b) => assert_eq!(b.should.len(), 1),
            _ => panic!("expected Bool"),
        }
    }
}
