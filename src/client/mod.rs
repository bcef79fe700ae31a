pub mod board;
pub mod cache;
pub mod controller;
pub mod source;

pub use cache::{CacheStore, DepartureCache, FileStore, MemoryStore, build_cache_key};
pub use controller::{Phase, RefreshController, Snapshot};
pub use source::{DeparturesSource, FetchError, HttpDeparturesSource};
