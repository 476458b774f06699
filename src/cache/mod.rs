//! Cache module - in-memory replay of assembled features

pub mod feature_cache;

pub use feature_cache::{CacheStats, FeatureCache};
