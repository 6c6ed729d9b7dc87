pub mod bitvector;
pub mod bounded_queue;
pub mod lru_cache;

pub use bitvector::BitVector;
pub use bounded_queue::BoundedPriorityQueue;
pub use lru_cache::OrderedLruCache;
