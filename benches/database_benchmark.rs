use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferroindex::analysis::analyzer::Analyzer;
use ferroindex::core::config::Config;
use ferroindex::core::engine::IndexEngine;
use ferroindex::core::types::{Document, Field};
use ferroindex::query::ast::{BoolQuery, PhraseQuery, Query, TermQuery};
use ferroindex::store::directory::{Directory, RamDirectory};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn create_test_document(id: u64, content_size: usize) -> Document {
    let mut rng = rand::thread_rng();
    let content: String = (0..content_size)
        .map(|_| {
            let words = ["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog"];
            words[rng.gen_range(0..words.len())]
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut doc = Document::new();
    doc.add(Field::text("title", format!("Document {}", id)));
    doc.add(Field::text("content", content));
    doc.add(Field::text("category", format!("category_{}", id % 10)));
    doc
}

fn open_engine() -> IndexEngine {
    let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
    IndexEngine::open(dir, Config::default(), Analyzer::standard_english()).unwrap()
}

fn bench_single_insert(c: &mut Criterion) {
    let engine = open_engine();

    c.bench_function("single_document_insert", |b| {
        let mut id = 0;
        b.iter(|| {
            let doc = create_test_document(id, 100);
            engine.add_document(doc).unwrap();
            id += 1;
        });
    });
}

fn bench_batch_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_insert");

    for batch_size in [10, 50, 100, 500, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), batch_size, |b, &batch_size| {
            let engine = open_engine();
            let mut id_counter = 0u64;

            b.iter(|| {
                for _ in 0..batch_size {
                    let doc = create_test_document(id_counter, 100);
                    engine.add_document(doc).unwrap();
                    id_counter += 1;
                }
                engine.flush().unwrap();
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let engine = open_engine();
    for i in 0..1000 {
        let doc = create_test_document(i, 100);
        engine.add_document(doc).unwrap();
    }
    engine.commit().unwrap();

    let mut group = c.benchmark_group("search");

    group.bench_function("simple_term_search", |b| {
        let query = Query::Term(TermQuery::new("content", "fox"));
        b.iter(|| engine.search_top_k(black_box(&query), 10).unwrap());
    });

    group.bench_function("boolean_and_search", |b| {
        let query = Query::Bool(
            BoolQuery::new()
                .with_must(Query::Term(TermQuery::new("content", "quick")))
                .with_must(Query::Term(TermQuery::new("content", "brown"))),
        );
        b.iter(|| engine.search_top_k(black_box(&query), 10).unwrap());
    });

    group.bench_function("boolean_or_search", |b| {
        let query = Query::Bool(
            BoolQuery::new()
                .with_should(Query::Term(TermQuery::new("content", "fox")))
                .with_should(Query::Term(TermQuery::new("content", "dog"))),
        );
        b.iter(|| engine.search_top_k(black_box(&query), 10).unwrap());
    });

    group.bench_function("category_search", |b| {
        let query = Query::Term(TermQuery::new("category", "category_5"));
        b.iter(|| engine.search_top_k(black_box(&query), 10).unwrap());
    });

    group.bench_function("phrase_query_exact", |b| {
        let query = Query::Phrase(PhraseQuery {
            field: "content".into(),
            terms: vec!["quick".into(), "brown".into(), "fox".into()],
            slop: 0,
            boost: 1.0,
        });
        b.iter(|| engine.search_top_k(black_box(&query), 10).unwrap());
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("index_throughput", |b| {
        b.iter_custom(|iters| {
            let engine = open_engine();
            let mut id = 0;

            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..100 {
                    let doc = create_test_document(id, 100);
                    engine.add_document(doc).unwrap();
                    id += 1;
                }
                if id % 1000 == 0 {
                    engine.flush().unwrap();
                }
            }
            engine.flush().unwrap();
            start.elapsed()
        });
    });

    group.bench_function("query_throughput", |b| {
        let engine = open_engine();
        for i in 0..5000 {
            let doc = create_test_document(i, 50);
            engine.add_document(doc).unwrap();
        }
        engine.commit().unwrap();

        let queries = vec![
            Query::Term(TermQuery::new("content", "fox")),
            Query::Bool(
                BoolQuery::new()
                    .with_must(Query::Term(TermQuery::new("content", "quick")))
                    .with_must(Query::Term(TermQuery::new("content", "brown"))),
            ),
            Query::Term(TermQuery::new("category", "category_5")),
        ];
        let mut query_idx = 0;

        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..100 {
                    let _ = engine.search_top_k(&queries[query_idx % queries.len()], 10).unwrap();
                    query_idx += 1;
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_insert, bench_batch_insert, bench_search, bench_throughput);
criterion_main!(benches);
