// Cache management module
// Author: kelexine (https://github.com/kelexine)

pub mod fuzzy;
pub mod manager;
pub mod models;
pub mod normalize;
pub mod store;

pub use fuzzy::{FuzzyMatch, FuzzyMatcher};
pub use manager::{CacheManager, LookupOutcome, Resolved};
pub use models::{CacheConfig, CacheKey, CacheStats, StoreStats};
pub use normalize::normalize;
pub use store::{CacheStore, MemoryStore};
