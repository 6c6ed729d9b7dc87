use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferroindex::analysis::analyzer::Analyzer;
use ferroindex::core::config::IndexWriterConfig;
use ferroindex::core::types::{Document, Field, Term};
use ferroindex::index::reader::DirectoryReader;
use ferroindex::index::writer::IndexWriter;
use ferroindex::store::directory::{Directory, FsDirectory};
use std::sync::Arc;

fn build_segment(doc_count: usize) -> (tempfile::TempDir, Arc<dyn Directory>) {
    let temp_dir = tempfile::tempdir().unwrap();
    let dir: Arc<dyn Directory> = Arc::new(FsDirectory::open(temp_dir.path()).unwrap());
    let writer = IndexWriter::open(dir.clone(), IndexWriterConfig::default(), Analyzer::standard_english()).unwrap();

    for i in 0..doc_count {
        let mut doc = Document::new();
        doc.add(Field::text("title", format!("Document {} about rust programming search engine", i)));
        doc.add(Field::text("content", format!("This is document number {} with various terms like database index query", i)));
        writer.add_document(doc).unwrap();
    }
    writer.commit().unwrap();
    (temp_dir, dir)
}

fn bench_segment_open(c: &mut Criterion) {
    let (_small_guard, small_dir) = build_segment(100);
    let (_medium_guard, medium_dir) = build_segment(1000);

    let mut group = c.benchmark_group("segment_open");

    group.bench_with_input(BenchmarkId::new("open", "small_100_docs"), &small_dir, |b, dir| {
        b.iter(|| {
            let reader = DirectoryReader::open(black_box(dir.clone())).unwrap();
            black_box(reader);
        });
    });

    group.bench_with_input(BenchmarkId::new("open", "medium_1000_docs"), &medium_dir, |b, dir| {
        b.iter(|| {
            let reader = DirectoryReader::open(black_box(dir.clone())).unwrap();
            black_box(reader);
        });
    });

    group.finish();
}

fn bench_term_lookup(c: &mut Criterion) {
    let (_guard, dir) = build_segment(1000);
    let reader = DirectoryReader::open(dir).unwrap();
    let term = Term::new("content", "database");

    let mut group = c.benchmark_group("term_lookup");

    group.bench_function("doc_freq", |b| {
        b.iter(|| {
            let freq = reader.doc_freq(black_box(&term)).unwrap();
            black_box(freq);
        });
    });

    group.bench_function("postings_first_segment", |b| {
        let segment = &reader.segments()[0];
        b.iter(|| {
            let postings = segment.postings(black_box(&term)).unwrap();
            black_box(postings);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_segment_open, bench_term_lookup);
criterion_main!(benches);
