//! Reader configuration
//!
//! Controls feature caching, the table cache and how feature identifiers are
//! synthesized for rows without an `id` column.

use crate::error::{Result, VpfError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How identifiers are generated for primary rows that carry no `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IdStrategy {
    /// Random 128-bit hex tokens; unique but not reproducible between runs
    #[default]
    Random,

    /// `fid-1`, `fid-2`, ... per feature class; reproducible
    Sequential,
}

impl IdStrategy {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Random => "random tokens",
            Self::Sequential => "sequential per feature class",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VpfConfig {
    /// Initial caching flag of every feature class.
    ///
    /// Cached classes materialize features on the first pass and replay them
    /// from memory afterwards.
    pub feature_cache: bool,

    /// Maximum number of loaded tables kept by the table context
    pub table_cache_capacity: usize,

    /// Memory-map table files instead of reading them into buffers
    pub memory_map: bool,

    pub id_strategy: IdStrategy,
}

impl Default for VpfConfig {
    fn default() -> Self {
        Self {
            feature_cache: true,
            table_cache_capacity: 64,
            memory_map: true,
            id_strategy: IdStrategy::default(),
        }
    }
}

impl VpfConfig {
    /// Reproducible ids and buffered reads
    pub fn for_testing() -> Self {
        Self {
            memory_map: false,
            id_strategy: IdStrategy::Sequential,
            ..Default::default()
        }
    }

    /// No feature cache; every pass re-reads the tables
    pub fn streaming() -> Self {
        Self {
            feature_cache: false,
            ..Default::default()
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_cache_capacity == 0 {
            return Err(VpfError::Config("table_cache_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VpfConfig::default();
        assert!(config.feature_cache);
        assert!(config.memory_map);
        assert_eq!(config.id_strategy, IdStrategy::Random);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let testing = VpfConfig::for_testing();
        assert_eq!(testing.id_strategy, IdStrategy::Sequential);
        assert!(!testing.memory_map);

        assert!(!VpfConfig::streaming().feature_cache);
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpfdb.json");
        std::fs::write(&path, r#"{ "feature_cache": false, "id_strategy": "Sequential" }"#).unwrap();

        let config = VpfConfig::from_json_file(&path).unwrap();
        assert!(!config.feature_cache);
        assert_eq!(config.id_strategy, IdStrategy::Sequential);
        assert_eq!(config.table_cache_capacity, 64);
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "table_cache_capacity": 0 }"#).unwrap();
        assert!(matches!(VpfConfig::from_json_file(&path), Err(VpfError::Config(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(VpfConfig::from_json_file(&path), Err(VpfError::Config(_))));
    }
}
