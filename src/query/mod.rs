pub mod ast;
pub mod scorer;
pub mod similarity;
pub mod spans;
pub mod weight;

pub use ast::Query;
pub use scorer::Scorer;
pub use similarity::{DefaultSimilarity, Similarity};
pub use weight::{create_weight, Weight};
