//! Feature Cache - materialized pass of a feature class
//!
//! Filled once during the first full pass, then replayed from memory by
//! rewinding its cursor. The feature list is shared (`Arc<[Feature]>`) so it
//! can be handed out read-only to other threads.

use crate::catalog::Feature;
use std::sync::Arc;

/// Replay statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Features served from memory
    pub hits: u64,
    /// Rewinds to the first feature
    pub replays: u64,
    /// Cached features
    pub size: usize,
}

/// Ordered feature list plus a replay cursor
#[derive(Debug)]
pub struct FeatureCache {
    features: Arc<[Feature]>,
    cursor: usize,
    stats: CacheStats,
}

impl FeatureCache {
    /// Cache of a completed pass; the cursor starts past the end
    pub fn completed(features: Vec<Feature>) -> Self {
        let features: Arc<[Feature]> = features.into();
        let stats = CacheStats {
            size: features.len(),
            ..CacheStats::default()
        };
        Self {
            cursor: features.len(),
            features,
            stats,
        }
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.stats.replays += 1;
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.features.len()
    }

    pub fn next_feature(&mut self) -> Option<Feature> {
        let feature = self.features.get(self.cursor)?.clone();
        self.cursor += 1;
        self.stats.hits += 1;
        Some(feature)
    }

    pub fn features(&self) -> Arc<[Feature]> {
        Arc::clone(&self.features)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
