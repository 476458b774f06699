//! Feature types: FACC-coded subsets of a feature class

use super::feature::Feature;
use super::feature_class::FeatureClass;
use crate::error::Result;
use crate::types::Value;
use std::sync::Arc;

/// Attribute holding a feature's FACC code
pub const FACC_ATTRIBUTE: &str = "f_code";

#[derive(Debug, Clone)]
pub struct FeatureType {
    facc_code: Option<String>,
    type_name: String,
    description: Option<String>,
    class: Arc<FeatureClass>,
}

impl FeatureType {
    pub fn new(facc_code: &str, description: Option<&str>, class: Arc<FeatureClass>) -> Self {
        let facc_code = facc_code.trim().to_string();
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let type_name = description
            .map(type_name_from)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| facc_code.clone());
        Self {
            facc_code: Some(facc_code),
            type_name,
            description: description.map(str::to_string),
            class,
        }
    }

    /// Unfiltered type standing for a whole feature class
    pub fn default_for(class: Arc<FeatureClass>) -> Self {
        Self {
            facc_code: None,
            type_name: class.name().to_string(),
            description: None,
            class,
        }
    }

    pub fn facc_code(&self) -> Option<&str> {
        self.facc_code.as_deref()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn feature_class(&self) -> &Arc<FeatureClass> {
        &self.class
    }

    /// Features of the owning class carrying this type's FACC code
    pub fn read_all(&self) -> Result<Vec<Feature>> {
        let features = self.class.read_all_rows()?;
        Ok(features
            .iter()
            .filter(|feature| self.accepts(feature))
            .cloned()
            .collect())
    }

    fn accepts(&self, feature: &Feature) -> bool {
        let Some(code) = &self.facc_code else {
            return true;
        };
        feature
            .get(FACC_ATTRIBUTE)
            .and_then(Value::as_str)
            .map_or(false, |value| value.trim().eq_ignore_ascii_case(code))
    }
}

/// `"Road/Track (paved)"` -> `"road_track__paved_"`
fn type_name_from(description: &str) -> String {
    description
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
