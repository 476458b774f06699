//! Coverages: feature classes and feature types of one coverage directory

use crate::catalog::{ClassContext, FeatureClass, FeatureType, JoinDefinition, FACC_ATTRIBUTE};
use crate::error::{Result, VpfError};
use crate::types::{Row, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Feature class schema table
pub const FCS_TABLE: &str = "fcs";
/// Character value description table, the source of feature types
pub const CHAR_VDT_TABLE: &str = "char.vdt";

#[derive(Debug)]
pub struct Coverage {
    name: String,
    description: String,
    topology_level: i32,
    directory: PathBuf,
    library: String,
    feature_classes: Vec<Arc<FeatureClass>>,
    feature_types: Vec<FeatureType>,
}

impl Coverage {
    /// Open a coverage directory listed in a library's coverage attribute table
    pub fn open(
        library: &str,
        directory: &Path,
        name: &str,
        description: &str,
        topology_level: i32,
        context: &ClassContext,
    ) -> Result<Self> {
        let rows = context.tables.read_all(directory, FCS_TABLE).map_err(|e| {
            VpfError::SchemaBuild(format!(
                "coverage {}: feature class schema table cannot be read: {}",
                name, e
            ))
        })?;

        let mut feature_classes = Vec::new();
        for (class_name, joins) in group_joins(&rows) {
            let class = FeatureClass::new(&class_name, directory, &joins, context)?;
            feature_classes.push(Arc::new(class));
        }

        let feature_types = match read_feature_types(directory, &feature_classes, context) {
            Ok(types) => types,
            Err(e) => {
                debug!(coverage = %name, error = %e, "No feature type table, using the default type");
                feature_classes
                    .first()
                    .map(|class| vec![FeatureType::default_for(Arc::clone(class))])
                    .unwrap_or_default()
            }
        };

        debug!(
            coverage = %name,
            classes = feature_classes.len(),
            types = feature_types.len(),
            "Opened coverage"
        );

        Ok(Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            topology_level,
            directory: directory.to_path_buf(),
            library: library.to_string(),
            feature_classes,
            feature_types,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// 0 (no topology) to 3 (full topology)
    pub fn topology_level(&self) -> i32 {
        self.topology_level
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Name of the owning library
    pub fn library_name(&self) -> &str {
        &self.library
    }

    pub fn feature_classes(&self) -> &[Arc<FeatureClass>] {
        &self.feature_classes
    }

    pub fn feature_class(&self, name: &str) -> Option<&Arc<FeatureClass>> {
        self.feature_classes
            .iter()
            .find(|class| class.name().eq_ignore_ascii_case(name))
    }

    pub fn feature_types(&self) -> &[FeatureType] {
        &self.feature_types
    }

    pub fn close(&self) {
        for class in &self.feature_classes {
            class.close();
        }
    }
}

fn text<'r>(row: &'r Row, column: &str) -> Option<&'r str> {
    row.get(column).and_then(Value::as_str).map(str::trim)
}

/// Join declarations per feature class, classes in first-seen order
fn group_joins(rows: &[Row]) -> Vec<(String, Vec<JoinDefinition>)> {
    let mut groups: Vec<(String, Vec<JoinDefinition>)> = Vec::new();
    for row in rows {
        let (Some(class), Some(join)) = (text(row, "feature_class"), JoinDefinition::from_row(row)) else {
            warn!(row = ?row.id(), "Skipping incomplete feature class schema row");
            continue;
        };
        match groups.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(class)) {
            Some((_, joins)) => joins.push(join),
            None => groups.push((class.to_string(), vec![join])),
        }
    }
    groups
}

/// Feature types from `char.vdt` rows describing `f_code`
fn read_feature_types(
    directory: &Path,
    classes: &[Arc<FeatureClass>],
    context: &ClassContext,
) -> Result<Vec<FeatureType>> {
    let rows = context
        .tables
        .read_all(directory, CHAR_VDT_TABLE)
        .map_err(|_| VpfError::MissingOptionalTable(directory.join(CHAR_VDT_TABLE)))?;

    let mut types: Vec<FeatureType> = Vec::new();
    for row in &rows {
        let is_facc = text(row, "attribute").map_or(false, |a| a.eq_ignore_ascii_case(FACC_ATTRIBUTE));
        if !is_facc {
            continue;
        }
        let (Some(table), Some(code)) = (text(row, "table"), text(row, "value")) else {
            continue;
        };
        let prefix = table.split('.').next().unwrap_or(table);
        let Some(class) = classes.iter().find(|c| c.name().eq_ignore_ascii_case(prefix)) else {
            continue;
        };
        let duplicate = types.iter().any(|t| {
            Arc::ptr_eq(t.feature_class(), class) && t.facc_code() == Some(code)
        });
        if !duplicate {
            types.push(FeatureType::new(code, text(row, "description"), Arc::clone(class)));
        }
    }
    Ok(types)
}
