//! Identifier synthesis for primary rows without an `id` column

use crate::config::IdStrategy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// 128 random bits, hex encoded. Not reproducible between runs.
#[derive(Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> String {
        format!("{:032x}", rand::random::<u128>())
    }
}

/// `fid-1`, `fid-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    issued: AtomicU64,
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        format!("fid-{}", n)
    }
}

pub fn id_generator(strategy: IdStrategy) -> Arc<dyn IdGenerator> {
    match strategy {
        IdStrategy::Random => Arc::new(RandomIdGenerator),
        IdStrategy::Sequential => Arc::new(SequentialIdGenerator::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let ids = id_generator(IdStrategy::Sequential);
        assert_eq!(ids.next_id(), "fid-1");
        assert_eq!(ids.next_id(), "fid-2");
    }

    #[test]
    fn test_random_ids_are_distinct() {
        let ids = RandomIdGenerator;
        let a = ids.next_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, ids.next_id());
    }
}
