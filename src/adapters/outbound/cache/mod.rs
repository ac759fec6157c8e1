mod memory_cache;
mod sqlite_cache;

pub use memory_cache::InMemoryCacheStore;
pub use sqlite_cache::SqliteCacheStore;
