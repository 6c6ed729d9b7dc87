/// Complete ferroindex API demo: open an index, add documents, commit, run
/// term/boolean/phrase queries, delete a document, force-merge, print stats.
use ferroindex::analysis::analyzer::Analyzer;
use ferroindex::core::config::Config;
use ferroindex::core::engine::IndexEngine;
use ferroindex::core::types::{Document, Field};
use ferroindex::query::ast::{BoolQuery, Query, TermQuery};
use ferroindex::store::directory::{Directory, RamDirectory};
use std::sync::Arc;

fn create_document(title: &str, content: &str) -> Document {
    let mut doc = Document::new();
    doc.add(Field::text("title", title));
    doc.add(Field::text("content", content));
    doc
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    println!("\n=== ferroindex API demo ===\n");

    println!("Opening index...");
    let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
    let engine = IndexEngine::open(dir, Config::default(), Analyzer::standard_english())?;
    println!("Done!\n");

    println!("Step 1: INSERT - adding documents...");
    engine.add_document(create_document("Rust Programming", "Learn Rust language"))?;
    engine.add_document(create_document("Database Systems", "SQL and NoSQL databases"))?;
    engine.add_document(create_document("Web Development", "Building web apps"))?;
    engine.commit()?;
    println!("  Inserted 3 documents\n");

    println!("Step 2: SEARCH - querying documents...");
    let (total, _) = engine.search_top_k(&Query::Term(TermQuery::new("content", "rust")), 10)?;
    println!("  'content:rust': {} results", total);

    let (total, _) = engine.search_top_k(&Query::Term(TermQuery::new("title", "database")), 10)?;
    println!("  'title:database': {} results", total);

    let bool_query = Query::Bool(
        BoolQuery::new()
            .with_must(Query::Term(TermQuery::new("content", "rust")))
            .with_must(Query::Term(TermQuery::new("content", "language"))),
    );
    let (total, _) = engine.search_top_k(&bool_query, 10)?;
    println!("  'content:rust AND content:language': {} results\n", total);

    println!("Step 3: DELETE - removing a document...");
    engine.delete_documents("title", "web")?;
    engine.commit()?;
    println!("  Deleted document matching title:web\n");

    println!("Step 4: MERGE - force-merging down to one segment...");
    engine.force_merge(1)?;
    println!("  Merged\n");

    println!("Step 5: STATS - engine metrics:");
    let stats = engine.stats();
    println!("  Total documents:  {}", stats.total_docs);
    println!("  Segments:         {}", stats.segment_count);
    println!("  Queries served:   {}", stats.queries_served);
    println!("  Writes served:    {}", stats.writes_served);

    println!("\n=== Demo complete ===\n");
    Ok(())
}
