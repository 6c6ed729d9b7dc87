pub mod collector;
pub mod field_cache;
pub mod searcher;

pub use collector::{Collector, MultiCollector, PositiveScoresOnlyCollector, ScoreDoc, TopDocsCollector, TotalHitCountCollector};
pub use field_cache::{FieldCache, FieldCacheRangeFilter, StringIndex};
pub use searcher::IndexSearcher;
