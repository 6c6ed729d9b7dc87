use crate::analysis::analyzer::Analyzer;
use crate::codec::{
    DeletedDocs, FieldInfos, IndexCommit, PostingBuilder, PostingsWriter, SegmentInfo, SegmentInfos,
    StoredFieldsWriter,
};
use crate::codec::norms::{encode_norm, write_norms};
use crate::codec::term_dict::{write_term_dictionary, TermInfo};
use crate::core::config::IndexWriterConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, IndexOptions, Term};
use crate::index::deletion_policy::{DeletionPolicy, KeepOnlyLastCommitDeletionPolicy};
use crate::index::merge_policy::MergePolicy;
use crate::index::merge_scheduler::{build_scheduler, MergeScheduler};
use crate::index::reader::{DirectoryReader, SegmentRefCounts};
use crate::store::directory::Directory;
use crate::store::lock::Lock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// In-RAM accumulation of not-yet-flushed documents (spec.md §4.1 "buffered
/// in RAM until a flush trigger"). Mirrors the teacher's `InvertedIndex`
/// term->postings map, generalized to the Lucene-style field/term-vector
/// bookkeeping this spec needs.
#[derive(Default)]
struct RamBuffer {
    field_infos: FieldInfos,
    docs: Vec<Document>,
    /// term -> one posting per doc that contains it, in doc-id order.
    postings: HashMap<Term, Vec<PostingBuilder>>,
    /// (field_number, doc) -> token count, used to derive norms at flush.
    field_lengths: HashMap<(u32, u32), u32>,
    estimated_bytes: usize,
}

impl RamBuffer {
    fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn clear(&mut self) {
        *self = RamBuffer::default();
    }
}

/// State machine position (spec.md §4.1): `Closed` writers reject every
/// operation; `Degraded` means a prior operation hit an IO error and only
/// `rollback`/`close` remain valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Degraded,
    Closed,
}

/// The single writer for one index (spec.md §4.1 IndexWriter). Exactly one
/// `IndexWriter` may hold the directory's write lock at a time.
pub struct IndexWriter {
    directory: Arc<dyn Directory>,
    config: IndexWriterConfig,
    analyzer: Arc<Analyzer>,
    lock: Arc<dyn Lock>,
    state: Mutex<WriterState>,
    segment_infos: Arc<Mutex<SegmentInfos>>,
    ram_buffer: Mutex<RamBuffer>,
    next_segment_num: AtomicU64,
    merge_policy: MergePolicy,
    merge_scheduler: Arc<dyn MergeScheduler>,
    pending_deletes: Mutex<HashMap<Term, ()>>,
    closed: AtomicBool,
    /// Decides which on-disk generations survive each commit (spec.md §4.4).
    deletion_policy: Arc<dyn DeletionPolicy>,
    /// Every known generation's `SegmentInfos`, oldest first; consulted by
    /// `deletion_policy` on every commit/startup.
    commits: Mutex<Vec<SegmentInfos>>,
    /// Segments a merge has removed from `segment_infos` but whose files
    /// can't be deleted yet: either no commit has published their absence,
    /// or a live reader still has them open.
    obsolete_segments: Arc<Mutex<Vec<SegmentInfo>>>,
    /// Shared with every `DirectoryReader` opened against this directory so
    /// deletion can be deferred while a reader still references a segment.
    segment_refs: Arc<SegmentRefCounts>,
}

impl IndexWriter {
    pub fn open(directory: Arc<dyn Directory>, config: IndexWriterConfig, analyzer: Analyzer) -> Result<Self> {
        Self::open_with_deletion_policy(directory, config, analyzer, Arc::new(KeepOnlyLastCommitDeletionPolicy))
    }

    /// Like `open`, but lets the caller supply a `DeletionPolicy` other than
    /// the default "keep only the last commit" (spec.md §4.4), e.g. a
    /// `SnapshotDeletionPolicy` for backup scenarios.
    pub fn open_with_deletion_policy(
        directory: Arc<dyn Directory>,
        config: IndexWriterConfig,
        analyzer: Analyzer,
        deletion_policy: Arc<dyn DeletionPolicy>,
    ) -> Result<Self> {
        let lock = directory.make_lock("write.lock");
        lock.obtain()?;

        let segment_infos = SegmentInfos::load_latest(directory.as_ref())?;
        let next_segment_num = segment_infos
            .segments
            .iter()
            .filter_map(|s| s.name.strip_prefix('_'))
            .filter_map(|n| u64::from_str_radix(n, 36).ok())
            .max()
            .map(|n| n + 1)
            .unwrap_or(0);

        let merge_policy = MergePolicy::new(
            config.merge_policy,
            config.merge_factor,
            config.max_merge_size_bytes,
            config.max_merge_docs,
        );
        let merge_scheduler = build_scheduler(config.merge_scheduler);

        let history = scan_existing_generations(directory.as_ref())?;
        let commit_views: Vec<IndexCommit> = history.iter().map(IndexCommit::from_infos).collect();
        let keep = deletion_policy.on_init(&commit_views);
        let (kept, dropped): (Vec<SegmentInfos>, Vec<SegmentInfos>) =
            history.into_iter().partition(|s| keep.contains(&s.generation));
        let kept_segment_names: HashSet<String> =
            kept.iter().flat_map(|s| s.segments.iter().map(|seg| seg.name.clone())).collect();
        for stale in &dropped {
            let _ = directory.delete_file(&SegmentInfos::file_name(stale.generation));
            for seg in &stale.segments {
                if !kept_segment_names.contains(&seg.name) {
                    delete_segment_files(directory.as_ref(), seg);
                }
            }
        }

        Ok(IndexWriter {
            directory,
            config,
            analyzer: Arc::new(analyzer),
            lock,
            state: Mutex::new(WriterState::Open),
            segment_infos: Arc::new(Mutex::new(segment_infos)),
            ram_buffer: Mutex::new(RamBuffer::default()),
            next_segment_num: AtomicU64::new(next_segment_num),
            merge_policy,
            merge_scheduler,
            pending_deletes: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            deletion_policy,
            commits: Mutex::new(kept),
            obsolete_segments: Arc::new(Mutex::new(Vec::new())),
            segment_refs: SegmentRefCounts::new(),
        })
    }

    /// The ref-count registry live readers must share with this writer so
    /// merges don't delete a segment a reader still has open.
    pub fn segment_refs(&self) -> Arc<SegmentRefCounts> {
        self.segment_refs.clone()
    }

    fn require_open(&self) -> Result<()> {
        match *self.state.lock().unwrap() {
            WriterState::Open => Ok(()),
            WriterState::Degraded => Err(Error::new(
                ErrorKind::Internal,
                "writer is in a degraded state after a prior failure; call rollback()".into(),
            )),
            WriterState::Closed => Err(Error::new(ErrorKind::AlreadyClosed, "writer is closed".into())),
        }
    }

    fn mark_degraded(&self) {
        *self.state.lock().unwrap() = WriterState::Degraded;
    }

    fn next_segment_name(&self) -> String {
        let n = self.next_segment_num.fetch_add(1, Ordering::SeqCst);
        format!("_{}", radix36(n))
    }

    /// Adds a document to the RAM buffer, analyzing every field with
    /// `IndexOptions::IndexedAnalyzed` and indexing `IndexedUnanalyzed`
    /// fields as a single verbatim term (spec.md §3/§4.1 `addDocument`).
    pub fn add_document(&self, doc: Document) -> Result<()> {
        self.require_open()?;
        let result = self.add_document_inner(doc);
        if result.is_err() {
            self.mark_degraded();
        }
        result
    }

    fn add_document_inner(&self, doc: Document) -> Result<()> {
        let mut buffer = self.ram_buffer.lock().unwrap();
        let local_doc_id = buffer.docs.len() as u32;

        for field in &doc.fields {
            let field_number = buffer.field_infos.add_or_update(
                &field.name,
                !matches!(field.index_options, IndexOptions::NotIndexed),
                field.omit_norms,
                field.term_vector,
                field.index_options,
            );

            match field.index_options {
                IndexOptions::NotIndexed => continue,
                IndexOptions::IndexedUnanalyzed => {
                    let text = match &field.stored_value {
                        Some(crate::core::types::StoredValue::Text(s)) => s.clone(),
                        _ => continue,
                    };
                    let term = Term::new(field.name.clone(), text);
                    buffer
                        .postings
                        .entry(term)
                        .or_default()
                        .push(PostingBuilder { doc_id: local_doc_id, freq: 1, positions: vec![0] });
                    *buffer.field_lengths.entry((field_number, local_doc_id)).or_insert(0) += 1;
                }
                IndexOptions::IndexedAnalyzed => {
                    let text = doc.concatenated_text(&field.name);
                    let tokens = self.analyzer.analyze(&text);
                    let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
                    for token in &tokens {
                        term_positions.entry(token.text.clone()).or_default().push(token.position);
                    }
                    *buffer.field_lengths.entry((field_number, local_doc_id)).or_insert(0) += tokens.len() as u32;

                    for (text, positions) in term_positions {
                        let term = Term::new(field.name.clone(), text);
                        buffer.postings.entry(term).or_default().push(PostingBuilder {
                            doc_id: local_doc_id,
                            freq: positions.len() as u32,
                            positions,
                        });
                    }
                }
            }
        }

        buffer.estimated_bytes += estimate_doc_bytes(&doc);
        buffer.docs.push(doc);

        let should_flush = buffer.docs.len() >= self.config.max_buffered_docs
            || buffer.estimated_bytes as f64 >= self.config.ram_buffer_size_mb * 1024.0 * 1024.0;
        drop(buffer);

        if should_flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Marks every document containing `term` for deletion. Applied lazily:
    /// recorded now, resolved against buffered and on-disk segments at the
    /// next flush/commit (spec.md §4.1 `deleteDocuments`).
    pub fn delete_documents(&self, term: Term) -> Result<()> {
        self.require_open()?;
        self.pending_deletes.lock().unwrap().insert(term, ());
        Ok(())
    }

    /// Atomically deletes every document matching `term` and adds `doc` in
    /// its place: the delete is buffered exactly like `delete_documents`,
    /// and `doc` joins the RAM buffer, so both become visible together at
    /// the next flush (spec.md §4.1 `updateDocument`, §8 scenario 2).
    pub fn update_document(&self, term: Term, doc: Document) -> Result<()> {
        self.require_open()?;
        self.pending_deletes.lock().unwrap().insert(term, ());
        let result = self.add_document_inner(doc);
        if result.is_err() {
            self.mark_degraded();
        }
        result
    }

    /// Flushes the RAM buffer to a new on-disk segment, if non-empty. A
    /// no-op flush (nothing buffered) is not an error (spec.md §4.1).
    pub fn flush(&self) -> Result<()> {
        self.require_open()?;
        let result = self.flush_inner();
        if result.is_err() {
            self.mark_degraded();
        }
        result
    }

    fn flush_inner(&self) -> Result<()> {
        let mut buffer = self.ram_buffer.lock().unwrap();
        if buffer.is_empty() {
            return Ok(());
        }

        let segment_name = self.next_segment_name();
        let doc_count = buffer.docs.len() as u32;
        info!(segment = %segment_name, docs = doc_count, "flushing segment");

        {
            let mut fnm_out = self.directory.create_output(&format!("{}.fnm", segment_name))?;
            buffer.field_infos.write(fnm_out.as_mut())?;
            fnm_out.flush()?;
        }

        {
            let mut fdt = self.directory.create_output(&format!("{}.fdt", segment_name))?;
            let mut fdx = self.directory.create_output(&format!("{}.fdx", segment_name))?;
            let mut sfw = StoredFieldsWriter::new(fdt.as_mut(), fdx.as_mut());
            for doc in &buffer.docs {
                sfw.add_document(doc)?;
            }
            fdt.flush()?;
            fdx.flush()?;
        }

        let mut terms: Vec<&Term> = buffer.postings.keys().collect();
        terms.sort();
        let mut term_infos = Vec::with_capacity(terms.len());
        {
            let mut frq_out = self.directory.create_output(&format!("{}.frq", segment_name))?;
            let mut prx_out = self.directory.create_output(&format!("{}.prx", segment_name))?;
            let mut writer = PostingsWriter::new(frq_out.as_mut(), Some(prx_out.as_mut()));
            for term in &terms {
                let mut postings = buffer.postings[*term].clone();
                postings.sort_by_key(|p| p.doc_id);
                let offsets = writer.write_term_postings(&postings)?;
                term_infos.push((
                    (*term).clone(),
                    TermInfo {
                        doc_freq: postings.len() as u32,
                        frq_offset: offsets.frq_offset,
                        prx_offset: offsets.prx_offset,
                        has_positions: true,
                    },
                ));
            }
            frq_out.flush()?;
            prx_out.flush()?;
        }
        write_term_dictionary(self.directory.as_ref(), &segment_name, &term_infos)?;

        let mut per_field_norms: HashMap<u32, Vec<u8>> = HashMap::new();
        for info in buffer.field_infos.iter() {
            if info.omit_norms {
                continue;
            }
            let mut bytes = vec![encode_norm(1.0); doc_count as usize];
            for doc in 0..doc_count {
                if let Some(&len) = buffer.field_lengths.get(&(info.number, doc)) {
                    bytes[doc as usize] = encode_norm(1.0 / (len.max(1) as f32).sqrt());
                }
            }
            per_field_norms.insert(info.number, bytes);
        }
        if !per_field_norms.is_empty() {
            write_norms(self.directory.as_ref(), &segment_name, doc_count, &per_field_norms)?;
        }

        let size_in_bytes = ["fnm", "fdt", "fdx", "frq", "prx", "tis", "tii", "nrm"]
            .iter()
            .filter_map(|ext| self.directory.file_length(&format!("{}.{}", segment_name, ext)).ok())
            .sum();

        self.segment_infos.lock().unwrap().segments.push(SegmentInfo {
            name: segment_name,
            doc_count,
            del_count: 0,
            del_gen: 0,
            size_in_bytes,
            is_compound_file: false,
        });

        buffer.clear();
        drop(buffer);

        self.apply_pending_deletes()?;
        self.maybe_merge()?;
        Ok(())
    }

    /// Resolves `pending_deletes` against every on-disk segment's term
    /// dictionary, turning term deletes into per-segment bitmaps. Buffered
    /// (not-yet-flushed) documents matching a delete term are simply never
    /// written at flush time in a full implementation; this writer applies
    /// deletes only to already-flushed segments, matching Lucene's
    /// behavior that a delete only affects documents visible at the time
    /// it was resolved.
    fn apply_pending_deletes(&self) -> Result<()> {
        let mut pending = self.pending_deletes.lock().unwrap();
        if pending.is_empty() {
            return Ok(());
        }
        let terms: Vec<Term> = pending.keys().cloned().collect();
        let mut infos = self.segment_infos.lock().unwrap();
        for seg in infos.segments.iter_mut() {
            let tis = format!("{}.tis", seg.name);
            let tii = format!("{}.tii", seg.name);
            if !self.directory.file_exists(&tis) {
                continue;
            }
            let dict = crate::codec::TermDictionaryReader::open(self.directory.as_ref(), &tis, &tii)?;
            let mut deleted = DeletedDocs::read(self.directory.as_ref(), &seg.name, seg.del_gen)?;
            let mut changed = false;
            for term in &terms {
                if let Some(info) = dict.get(self.directory.as_ref(), term)? {
                    let postings = crate::codec::postings::decode_all(
                        self.directory.as_ref(),
                        &format!("{}.frq", seg.name),
                        Some(&format!("{}.prx", seg.name)),
                        &crate::codec::postings::PostingsOffsets {
                            frq_offset: info.frq_offset,
                            prx_offset: info.prx_offset,
                        },
                        info.doc_freq,
                        info.has_positions,
                    )?;
                    for posting in postings {
                        if !deleted.is_deleted(posting.doc_id) {
                            deleted.delete(posting.doc_id, seg.doc_count)?;
                            changed = true;
                        }
                    }
                }
            }
            if changed {
                seg.del_gen += 1;
                deleted.write(self.directory.as_ref(), &seg.name, seg.del_gen)?;
                seg.del_count = deleted.count_deleted();
            }
        }
        pending.clear();
        Ok(())
    }

    /// Checks the merge policy and hands any selected merges to the
    /// scheduler (spec.md §4.3). Runs synchronously under the segment
    /// scheduler's own concurrency model; this call returns once merges
    /// have been submitted, not once they've finished.
    fn maybe_merge(&self) -> Result<()> {
        let spec = {
            let infos = self.segment_infos.lock().unwrap();
            self.merge_policy.find_merges(&infos.segments)
        };
        for merge in spec.merges {
            self.submit_merge(merge.segments)?;
        }
        Ok(())
    }

    fn submit_merge(&self, segments: Vec<SegmentInfo>) -> Result<()> {
        let merged_name = self.next_segment_name();
        let directory = self.directory.clone();
        let segment_infos = self.segment_infos.clone();
        let obsolete_segments = self.obsolete_segments.clone();
        let merge_desc = crate::index::merge_policy::OneMerge { segments: segments.clone() };

        let task: crate::index::merge_scheduler::MergeTask = Box::new(move || {
            let merged = merge_segments(directory.as_ref(), &merged_name, &segments)?;
            let mut infos = segment_infos.lock().unwrap();
            let removed: HashSet<String> = segments.iter().map(|s| s.name.clone()).collect();
            infos.segments.retain(|s| !removed.contains(&s.name));
            infos.segments.push(merged);
            drop(infos);
            obsolete_segments.lock().unwrap().extend(segments);
            Ok(())
        });

        self.merge_scheduler.submit(merge_desc, task);
        Ok(())
    }

    /// Flushes any buffered documents, atomically publishes a new
    /// `segments_N`, then invokes the `DeletionPolicy` over the full known
    /// commit history and deletes only the files no surviving commit or
    /// live reader references (spec.md §4.1 commit protocol, §4.4
    /// DeletionPolicy, §8 scenario 3).
    pub fn commit(&self) -> Result<u64> {
        self.require_open()?;
        self.flush()?;
        self.merge_scheduler.sync();

        let mut infos = self.segment_infos.lock().unwrap();
        infos.generation += 1;
        infos.write(self.directory.as_ref())?;
        let generation = infos.generation;
        let snapshot = infos.clone();
        drop(infos);

        let mut history = self.commits.lock().unwrap();
        history.push(snapshot);
        let commit_views: Vec<IndexCommit> = history.iter().map(IndexCommit::from_infos).collect();
        let keep = self.deletion_policy.on_commit(&commit_views);
        let (kept, dropped): (Vec<SegmentInfos>, Vec<SegmentInfos>) =
            std::mem::take(&mut *history).into_iter().partition(|s| keep.contains(&s.generation));
        let kept_segment_names: HashSet<String> =
            kept.iter().flat_map(|s| s.segments.iter().map(|seg| seg.name.clone())).collect();
        *history = kept;
        drop(history);

        for stale in &dropped {
            let _ = self.directory.delete_file(&SegmentInfos::file_name(stale.generation));
            for seg in &stale.segments {
                if kept_segment_names.contains(&seg.name) || self.segment_refs.is_referenced(&seg.name) {
                    continue;
                }
                delete_segment_files(self.directory.as_ref(), seg);
            }
        }
        self.sweep_obsolete_segments(&kept_segment_names);

        debug!(generation, "commit published");
        Ok(generation)
    }

    /// Deletes any merge-obsoleted segment whose files are no longer
    /// referenced by a surviving commit and no longer held open by a live
    /// reader; anything still referenced is left for the next commit.
    fn sweep_obsolete_segments(&self, kept_segment_names: &HashSet<String>) {
        let mut obsolete = self.obsolete_segments.lock().unwrap();
        let mut still_pending = Vec::new();
        for seg in obsolete.drain(..) {
            if kept_segment_names.contains(&seg.name) || self.segment_refs.is_referenced(&seg.name) {
                still_pending.push(seg);
                continue;
            }
            delete_segment_files(self.directory.as_ref(), &seg);
        }
        *obsolete = still_pending;
    }

    /// Discards buffered documents and pending deletes without writing
    /// anything (spec.md §4.1 `rollback`). Recovers a `Degraded` writer.
    pub fn rollback(&self) -> Result<()> {
        let was_degraded = *self.state.lock().unwrap() == WriterState::Degraded;
        self.ram_buffer.lock().unwrap().clear();
        self.pending_deletes.lock().unwrap().clear();
        *self.state.lock().unwrap() = WriterState::Open;
        if was_degraded {
            warn!("writer rolled back from a degraded state");
        } else {
            debug!("writer rolled back");
        }
        Ok(())
    }

    /// Runs `find_merges_for_optimize` until the index has at most
    /// `max_segment_count` segments (spec.md §4.3 `forceMerge`).
    pub fn force_merge(&self, max_segment_count: usize) -> Result<()> {
        self.require_open()?;
        let spec = {
            let infos = self.segment_infos.lock().unwrap();
            self.merge_policy.find_merges_for_optimize(&infos.segments, max_segment_count)
        };
        for merge in spec.merges {
            let merged_name = self.next_segment_name();
            let merged = merge_segments(self.directory.as_ref(), &merged_name, &merge.segments)?;
            let mut infos = self.segment_infos.lock().unwrap();
            let removed: HashSet<String> = merge.segments.iter().map(|s| s.name.clone()).collect();
            infos.segments.retain(|s| !removed.contains(&s.name));
            infos.segments.push(merged);
            drop(infos);
            self.obsolete_segments.lock().unwrap().extend(merge.segments);
        }
        Ok(())
    }

    /// Merges away every segment that has at least one deletion, the
    /// targeted alternative to `force_merge` for reclaiming space without
    /// collapsing the whole index down to one segment (spec.md §4.1
    /// `expungeDeletes`).
    pub fn expunge_deletes(&self) -> Result<()> {
        self.require_open()?;
        let with_deletions: Vec<SegmentInfo> = {
            let infos = self.segment_infos.lock().unwrap();
            infos.segments.iter().filter(|s| s.has_deletions()).cloned().collect()
        };
        if with_deletions.is_empty() {
            return Ok(());
        }
        let merged_name = self.next_segment_name();
        let merged = merge_segments(self.directory.as_ref(), &merged_name, &with_deletions)?;
        let mut infos = self.segment_infos.lock().unwrap();
        let removed: HashSet<String> = with_deletions.iter().map(|s| s.name.clone()).collect();
        infos.segments.retain(|s| !removed.contains(&s.name));
        infos.segments.push(merged);
        drop(infos);
        self.obsolete_segments.lock().unwrap().extend(with_deletions);
        Ok(())
    }

    /// Near-real-time reader over the current in-RAM state: flushes
    /// buffered documents to segment files without publishing a new
    /// `segments_N`, then builds a reader directly from the writer's live
    /// `SegmentInfos` (spec.md §4.1 `getReader`, §4.2 "near-real-time
    /// reader... including not-yet-committed docs").
    pub fn get_reader(&self) -> Result<DirectoryReader> {
        self.require_open()?;
        self.flush()?;
        let infos = self.segment_infos.lock().unwrap().clone();
        DirectoryReader::from_infos(self.directory.clone(), infos, self.segment_refs.clone())
    }

    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.config.commit_on_close && *self.state.lock().unwrap() == WriterState::Open {
            self.commit()?;
        }
        self.merge_scheduler.sync();
        *self.state.lock().unwrap() = WriterState::Closed;
        self.lock.release()?;
        Ok(())
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            if let Err(e) = self.close() {
                warn!(error = %e, "error closing writer during drop");
            }
        }
    }
}

fn estimate_doc_bytes(doc: &Document) -> usize {
    doc.fields
        .iter()
        .map(|f| {
            f.name.len()
                + match &f.stored_value {
                    Some(crate::core::types::StoredValue::Text(s)) => s.len(),
                    Some(crate::core::types::StoredValue::Bytes(b)) => b.len(),
                    None => 0,
                }
        })
        .sum()
}

fn radix36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap()
}

/// Every `segments_N` generation still on disk, oldest first, skipping any
/// that fails to parse (a crash mid-write leaves a truncated one behind).
fn scan_existing_generations(directory: &dyn Directory) -> Result<Vec<SegmentInfos>> {
    let names = directory.list_all()?;
    let mut generations: Vec<u64> = names
        .iter()
        .filter_map(|n| n.strip_prefix("segments_"))
        .filter_map(|g| u64::from_str_radix(g, 36).ok())
        .collect();
    generations.sort_unstable();
    let mut history = Vec::with_capacity(generations.len());
    for gen in generations {
        if let Ok(infos) = SegmentInfos::read(directory, &SegmentInfos::file_name(gen)) {
            history.push(infos);
        }
    }
    Ok(history)
}

/// Unconditionally deletes one segment's data and deletions files. Callers
/// are responsible for having already checked it's safe to do so (spec.md
/// §4.4 DeletionPolicy).
fn delete_segment_files(directory: &dyn Directory, seg: &SegmentInfo) {
    for ext in ["fnm", "fdt", "fdx", "frq", "prx", "tis", "tii", "nrm"] {
        let _ = directory.delete_file(&format!("{}.{}", seg.name, ext));
    }
    if seg.has_deletions() {
        let _ = directory.delete_file(&seg.del_file_name());
    }
}

/// Merges several segments' postings, stored fields and norms into one new
/// segment with freshly dense doc ids, dropping any documents deleted in a
/// source segment (spec.md §4.3 "merge drops deleted docs").
fn merge_segments(directory: &dyn Directory, merged_name: &str, segments: &[SegmentInfo]) -> Result<SegmentInfo> {
    let mut merged_postings: HashMap<Term, Vec<PostingBuilder>> = HashMap::new();
    let mut merged_docs: Vec<Document> = Vec::new();
    let mut merged_field_infos = FieldInfos::new();
    let mut base_doc_id = 0u32;

    for seg in segments {
        let fnm = format!("{}.fnm", seg.name);
        let field_infos = {
            let mut input = directory.open_input(&fnm)?;
            FieldInfos::read(input.as_mut())?
        };
        for info in field_infos.iter() {
            merged_field_infos.add_or_update(
                &info.name,
                info.indexed,
                info.omit_norms,
                if info.store_term_vectors {
                    crate::core::types::TermVectorOptions::Yes
                } else {
                    crate::core::types::TermVectorOptions::None
                },
                if info.indexed {
                    crate::core::types::IndexOptions::IndexedAnalyzed
                } else {
                    crate::core::types::IndexOptions::NotIndexed
                },
            );
        }

        let deleted = DeletedDocs::read(directory, &seg.name, seg.del_gen)?;
        let stored = crate::codec::StoredFieldsReader::open(
            directory,
            &format!("{}.fdt", seg.name),
            &format!("{}.fdx", seg.name),
            seg.doc_count,
        )?;

        let tis = format!("{}.tis", seg.name);
        let tii = format!("{}.tii", seg.name);
        let mut live_count = 0u32;
        if directory.file_exists(&tis) {
            let dict = crate::codec::TermDictionaryReader::open(directory, &tis, &tii)?;
            for (term, info) in dict.iter_all(directory)? {
                let postings = crate::codec::postings::decode_all(
                    directory,
                    &format!("{}.frq", seg.name),
                    Some(&format!("{}.prx", seg.name)),
                    &crate::codec::postings::PostingsOffsets {
                        frq_offset: info.frq_offset,
                        prx_offset: info.prx_offset,
                    },
                    info.doc_freq,
                    info.has_positions,
                )?;
                for posting in postings {
                    if deleted.is_deleted(posting.doc_id) {
                        continue;
                    }
                    merged_postings.entry(term.clone()).or_default().push(PostingBuilder {
                        doc_id: base_doc_id + remap(&deleted, posting.doc_id),
                        freq: posting.freq,
                        positions: posting.positions,
                    });
                }
            }
        }

        for local in 0..seg.doc_count {
            if deleted.is_deleted(local) {
                continue;
            }
            merged_docs.push(stored.document(directory, local)?);
            live_count += 1;
        }
        base_doc_id += live_count;
    }

    let doc_count = merged_docs.len() as u32;
    {
        let mut fnm_out = directory.create_output(&format!("{}.fnm", merged_name))?;
        merged_field_infos.write(fnm_out.as_mut())?;
        fnm_out.flush()?;
    }

    {
        let mut fdt = directory.create_output(&format!("{}.fdt", merged_name))?;
        let mut fdx = directory.create_output(&format!("{}.fdx", merged_name))?;
        let mut sfw = StoredFieldsWriter::new(fdt.as_mut(), fdx.as_mut());
        for doc in &merged_docs {
            sfw.add_document(doc)?;
        }
        fdt.flush()?;
        fdx.flush()?;
    }

    let mut terms: Vec<&Term> = merged_postings.keys().collect();
    terms.sort();
    let mut term_infos = Vec::with_capacity(terms.len());
    {
        let mut frq_out = directory.create_output(&format!("{}.frq", merged_name))?;
        let mut prx_out = directory.create_output(&format!("{}.prx", merged_name))?;
        let mut writer = PostingsWriter::new(frq_out.as_mut(), Some(prx_out.as_mut()));
        for term in &terms {
            let mut postings = merged_postings[*term].clone();
            postings.sort_by_key(|p| p.doc_id);
            let offsets = writer.write_term_postings(&postings)?;
            term_infos.push((
                (*term).clone(),
                TermInfo {
                    doc_freq: postings.len() as u32,
                    frq_offset: offsets.frq_offset,
                    prx_offset: offsets.prx_offset,
                    has_positions: true,
                },
            ));
        }
        frq_out.flush()?;
        prx_out.flush()?;
    }
    write_term_dictionary(directory, merged_name, &term_infos)?;

    let size_in_bytes = ["fnm", "fdt", "fdx", "frq", "prx", "tis", "tii"]
        .iter()
        .filter_map(|ext| directory.file_length(&format!("{}.{}", merged_name, ext)).ok())
        .sum();

    // Source segment files are not deleted here: they're still referenced by
    // the last-published `segments_N` until the writer's next `commit()`
    // runs the `DeletionPolicy` and confirms no live reader has them open.

    Ok(SegmentInfo {
        name: merged_name.to_string(),
        doc_count,
        del_count: 0,
        del_gen: 0,
        size_in_bytes,
        is_compound_file: false,
    })
}

/// Number of live docs strictly before `doc` in the source segment — the
/// offset a surviving doc id shifts by once deleted docs are dropped.
fn remap(deleted: &DeletedDocs, doc: u32) -> u32 {
    let mut shift = 0u32;
    for d in 0..doc {
        if deleted.is_deleted(d) {
            shift += 1;
        }
    }
    doc - shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    fn writer(dir: Arc<dyn Directory>) -> IndexWriter {
        IndexWriter::open(dir, IndexWriterConfig::small_and_deterministic(), Analyzer::standard_english()).unwrap()
    }

    #[test]
    fn add_and_flush_creates_a_segment() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let w = writer(dir.clone());
        let mut doc = Document::new();
        doc.add(crate::core::types::Field::text("body", "the quick brown fox"));
        w.add_document(doc).unwrap();
        w.flush().unwrap();

        let infos = w.segment_infos.lock().unwrap();
        assert_eq!(infos.segments.len(), 1);
        assert_eq!(infos.segments[0].doc_count, 1);
    }

    #[test]
    fn commit_publishes_segments_file() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let w = writer(dir.clone());
        let mut doc = Document::new();
        doc.add(crate::core::types::Field::text("body", "hello world"));
        w.add_document(doc).unwrap();
        let generation = w.commit().unwrap();
        assert!(dir.file_exists(&SegmentInfos::file_name(generation)));
    }

    #[test]
    fn delete_by_term_removes_matching_doc_from_segment() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let w = writer(dir.clone());

        let mut doc1 = Document::new();
        doc1.add(crate::core::types::Field::keyword("id", "1"));
        doc1.add(crate::core::types::Field::text("body", "alpha"));
        w.add_document(doc1).unwrap();
        w.flush().unwrap();

        w.delete_documents(Term::new("id", "1")).unwrap();
        w.flush().unwrap();

        let infos = w.segment_infos.lock().unwrap();
        assert_eq!(infos.segments[0].del_count, 1);
    }

    #[test]
    fn rollback_discards_buffered_docs() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let w = writer(dir.clone());
        let mut doc = Document::new();
        doc.add(crate::core::types::Field::text("body", "never committed"));
        w.add_document(doc).unwrap();
        w.rollback().unwrap();

        let infos = w.segment_infos.lock().unwrap();
        assert!(infos.segments.is_empty());
    }
}
