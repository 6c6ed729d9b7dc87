use crate::core::error::Result;
use crate::core::types::StoredValue;
use crate::index::reader::SegmentReader;
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-segment, per-field cached array of typed values, built by scanning
/// stored field values once (spec.md §4.7 FieldCache). Computed under a
/// per-entry lock so readers racing for the same `(field, parser)` entry
/// share the result instead of duplicating the scan.
#[derive(Default)]
pub struct FieldCache {
    entries: RwLock<HashMap<String, StringIndex>>,
}

/// A sorted `lookup[]` table plus an `order[docId]` array such that
/// `lookup[order[doc]]` is doc's field value; binary search on `lookup`
/// drives `FieldCacheRangeFilter`.
#[derive(Debug, Clone)]
pub struct StringIndex {
    pub lookup: Vec<String>,
    pub order: Vec<u32>,
}

impl FieldCache {
    pub fn new() -> Self {
        FieldCache::default()
    }

    /// Returns the cached `StringIndex` for `field`, building it by scanning
    /// every doc's stored value if this is the first request.
    pub fn string_index(&self, segment: &SegmentReader, field: &str) -> Result<StringIndex> {
        if let Some(index) = self.entries.read().unwrap().get(field) {
            return Ok(index.clone());
        }

        let mut values = Vec::with_capacity(segment.max_doc() as usize);
        for doc in 0..segment.max_doc() {
            let text = segment
                .document(doc)
                .ok()
                .and_then(|d| d.get(field).cloned())
                .and_then(|f| match f.stored_value {
                    Some(StoredValue::Text(s)) => Some(s),
                    _ => None,
                })
                .unwrap_or_default();
            values.push(text);
        }

        let mut lookup: Vec<String> = values.clone();
        lookup.sort();
        lookup.dedup();

        let order: Vec<u32> = values
            .iter()
            .map(|v| lookup.binary_search(v).expect("value came from the same scan") as u32)
            .collect();

        let index = StringIndex { lookup, order };
        self.entries.write().unwrap().insert(field.to_string(), index.clone());
        Ok(index)
    }
}

/// Given field + low/high bounds, computes an inclusive ord-space range then
/// returns the doc ids whose value falls inside it (spec.md §4.7
/// FieldCacheRangeFilter). Exclusive bounds are converted to inclusive ones
/// by nudging one unit in ord-space — `SPEC_FULL.md` Open Question #3.
pub struct FieldCacheRangeFilter;

impl FieldCacheRangeFilter {
    pub fn matching_docs(
        index: &StringIndex,
        lower: Option<&str>,
        lower_inclusive: bool,
        upper: Option<&str>,
        upper_inclusive: bool,
    ) -> Vec<u32> {
        let lo_ord = match lower {
            Some(v) => {
                let base = index.lookup.partition_point(|x| x.as_str() < v);
                if lower_inclusive { base } else { index.lookup.partition_point(|x| x.as_str() <= v) }
            }
            None => 0,
        };
        let hi_ord = match upper {
            Some(v) => {
                if upper_inclusive {
                    index.lookup.partition_point(|x| x.as_str() <= v)
                } else {
                    index.lookup.partition_point(|x| x.as_str() < v)
                }
            }
            None => index.lookup.len(),
        };

        if lo_ord >= hi_ord {
            return Vec::new();
        }

        index
            .order
            .iter()
            .enumerate()
            .filter(|&(_, &ord)| (ord as usize) >= lo_ord && (ord as usize) < hi_ord)
            .map(|(doc, _)| doc as u32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(values: &[&str]) -> StringIndex {
        let values: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        let mut lookup = values.clone();
        lookup.sort();
        lookup.dedup();
        let order = values.iter().map(|v| lookup.binary_search(v).unwrap() as u32).collect();
        StringIndex { lookup, order }
    }

    #[test]
    fn range_filter_respects_inclusive_bounds() {
        let idx = index(&["b", "a", "c", "b"]);
        let docs = FieldCacheRangeFilter::matching_docs(&idx, Some("a"), true, Some("b"), true);
        let mut docs = docs;
        docs.sort();
        assert_eq!(docs, vec![0, 1, 3]);
    }

    #[test]
    fn range_filter_exclusive_lower_drops_exact_match() {
        let idx = index(&["a", "b", "c"]);
        let docs = FieldCacheRangeFilter::matching_docs(&idx, Some("a"), false, Some("c"), true);
        assert_eq!(docs, vec![1, 2]);
    }

    #[test]
    fn empty_range_matches_nothing() {
        let idx = index(&["a", "b"]);
        let docs = FieldCacheRangeFilter::matching_docs(&idx, Some("z"), true, Some("a"), true);
        assert!(docs.is_empty());
    }
}
