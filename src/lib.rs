pub mod core;
pub mod util;
pub mod store;
pub mod codec;
pub mod analysis;
pub mod index;
pub mod search;
pub mod query;

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                            FERROINDEX STRUCT ARCHITECTURE                                   │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CORE LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                           struct IndexEngine                                        │    │
│  │  ┌──────────────────────────────────────────────────────────────────────────────┐ │    │
│  │  │ config: IndexWriterConfig         // writer/merge tuning                     │ │    │
│  │  │ directory: Arc<dyn Directory>     // storage backend                        │ │    │
│  │  │ writer: Arc<Mutex<IndexWriter>>   // single writer                          │ │    │
│  │  │ reader: RwLock<Arc<DirectoryReader>>  // latest committed snapshot          │ │    │
│  │  └──────────────────────────────────────────────────────────────────────────────┘ │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── STORE/CODEC LAYER ─────────────────────────────────────┐
│                                                                                              │
│  Directory (A) ──> BufferedIndexInput/Output ──> SegmentWriter/SegmentReader (E, F)         │
│  TermDictionaryReader/Writer ──maps──> Term -> TermInfo ──points_at──> PostingsEnum         │
│  StoredFieldsReader/Writer, NormsReader/Writer, DeletedDocs (BitVector, B)                  │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── INDEX LAYER ────────────────────────────────────────────┐
│                                                                                              │
│  IndexWriter (G) ──flushes──> SegmentInfo ──merged_by──> MergePolicy + MergeScheduler (H)   │
│  DeletionPolicy / SnapshotDeletionPolicy (I) govern which commit generations stay live       │
│  SegmentReader/DirectoryReader (F) expose committed segments to the search layer            │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── QUERY/SEARCH LAYER ────────────────────────────────────┐
│                                                                                              │
│  Query (AST) ──rewrite──> Query ──createWeight──> Weight ──scorer──> Scorer (K)            │
│  Similarity (J) supplies tf/idf/queryNorm/coord/lengthNorm used by Weight and TermScorer     │
│  FieldCache + FieldCacheRangeFilter (J) back range queries with ordinal-space scans          │
│  Collector family (J): TopDocsCollector (BoundedPriorityQueue, C), TotalHitCountCollector,   │
│  MultiCollector, PositiveScoresOnlyCollector                                                 │
│  IndexSearcher ties rewrite -> createWeight -> per-segment Scorer -> Collector together      │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── ANALYSIS LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  Analyzer (tokenizer + filter chain) ──produces──> Token stream ──indexed_as──> postings     │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
