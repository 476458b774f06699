//! Libraries: coverages, coordinate reference system and tile map

use super::coverage::Coverage;
use super::tiles::TileMap;
use crate::catalog::{ClassContext, FeatureId, FeatureType};
use crate::error::{Result, VpfError};
use crate::storage::{resolve_path, TableContext};
use crate::types::{BoundingBox, Value};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub const CAT_TABLE: &str = "cat";
pub const LHT_TABLE: &str = "lht";
pub const GRT_TABLE: &str = "grt";
/// Coverage holding the tile reference features
pub const TILEREF_COVERAGE: &str = "tileref";

/// Coordinate reference systems a library can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Crs {
    /// Geographic coordinates on the WGS 84 datum
    Wgs84,
}

impl Crs {
    pub fn name(&self) -> &'static str {
        match self {
            Crs::Wgs84 => "WGS 84",
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
        }
    }
}

#[derive(Debug)]
pub struct Library {
    name: String,
    directory: PathBuf,
    bounds: Option<BoundingBox>,
    description: Option<String>,
    coverages: Vec<Coverage>,
    tile_map: Option<Arc<TileMap>>,
    crs: OnceLock<Option<Crs>>,
    tables: Arc<TableContext>,
}

impl Library {
    /// Open `database_dir/name`. A missing directory is `DirectoryMissing`.
    pub fn open(
        database_dir: &Path,
        name: &str,
        bounds: Option<BoundingBox>,
        context: &ClassContext,
    ) -> Result<Self> {
        let name = name.trim();
        let directory = resolve_path(database_dir, name)
            .filter(|path| path.is_dir())
            .ok_or_else(|| VpfError::DirectoryMissing(database_dir.join(name)))?;

        let description = match context.tables.read_all(&directory, LHT_TABLE) {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("description"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            Err(e) => {
                debug!(library = %name, error = %e, "No library header table");
                None
            }
        };

        let rows = context.tables.read_all(&directory, CAT_TABLE).map_err(|e| {
            VpfError::SchemaBuild(format!(
                "library {}: coverage attribute table cannot be read: {}",
                name, e
            ))
        })?;

        let mut coverages = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(coverage_name) = row.get("coverage_name").and_then(Value::as_str).map(str::trim) else {
                continue;
            };
            let Some(coverage_dir) = resolve_path(&directory, coverage_name).filter(|p| p.is_dir()) else {
                warn!(library = %name, coverage = %coverage_name, "Coverage directory missing, skipping");
                continue;
            };
            let description = row.get("description").and_then(Value::as_str).unwrap_or_default();
            let level = topology_level(row.get("level"));
            coverages.push(Coverage::open(
                name,
                &coverage_dir,
                coverage_name,
                description,
                level,
                context,
            )?);
        }

        let tile_map = build_tile_map(name, &coverages).map(Arc::new);
        if let Some(tiles) = &tile_map {
            for class in coverages.iter().flat_map(|c| c.feature_classes()) {
                class.set_tile_map(Arc::clone(tiles));
            }
        }

        debug!(
            library = %name,
            coverages = coverages.len(),
            tiles = tile_map.as_ref().map_or(0, |t| t.len()),
            "Opened library"
        );

        Ok(Self {
            name: name.to_string(),
            directory,
            bounds,
            description,
            coverages,
            tile_map,
            crs: OnceLock::new(),
            tables: Arc::clone(&context.tables),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn coverages(&self) -> &[Coverage] {
        &self.coverages
    }

    pub fn coverage(&self, name: &str) -> Option<&Coverage> {
        self.coverages
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn feature_types(&self) -> impl Iterator<Item = &FeatureType> {
        self.coverages.iter().flat_map(|c| c.feature_types())
    }

    pub fn tile_map(&self) -> Option<&Arc<TileMap>> {
        self.tile_map.as_ref()
    }

    /// Resolved on first call. Failures are logged once and leave the CRS unresolved.
    pub fn crs(&self) -> Option<Crs> {
        *self.crs.get_or_init(|| match self.resolve_crs() {
            Ok(crs) => crs,
            Err(e) => {
                warn!(library = %self.name, error = %e, "CRS left unresolved");
                None
            }
        })
    }

    fn resolve_crs(&self) -> Result<Option<Crs>> {
        let rows = self
            .tables
            .read_all(&self.directory, GRT_TABLE)
            .map_err(|e| VpfError::CrsResolution(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| VpfError::CrsResolution("geographic reference table is empty".into()))?;

        let field = |name: &str| row.get(name).and_then(Value::as_str).map(str::trim);
        match (field("data_type"), field("geo_datum_code")) {
            (Some(data_type), Some(datum))
                if data_type.eq_ignore_ascii_case("GEO") && datum.eq_ignore_ascii_case("WGE") =>
            {
                Ok(Some(Crs::Wgs84))
            }
            _ => Ok(None),
        }
    }

    pub fn close(&self) {
        for coverage in &self.coverages {
            coverage.close();
        }
    }
}

/// Topology level 0-3; anything else reads as 0
fn topology_level(value: Option<&Value>) -> i32 {
    let raw = value.and_then(Value::as_i64);
    match raw.and_then(|v| i32::try_from(v).ok()) {
        Some(level @ 0..=3) => level,
        Some(_) | None => {
            if let Some(v) = raw {
                warn!(level = v, "Topology level out of range, using 0");
            }
            0
        }
    }
}

/// Tile id -> tile directory from the TILEREF coverage's feature class
fn build_tile_map(library: &str, coverages: &[Coverage]) -> Option<TileMap> {
    let coverage = coverages
        .iter()
        .find(|c| c.name().eq_ignore_ascii_case(TILEREF_COVERAGE))?;
    let class = coverage.feature_classes().first()?;

    let features = match class.read_all_rows() {
        Ok(features) => features,
        Err(e) => {
            warn!(library = %library, error = %e, "Tile reference coverage unreadable, no tile map");
            return None;
        }
    };

    let mut tiles = TileMap::new();
    for feature in features.iter() {
        let FeatureId::Row(id) = feature.id() else {
            continue;
        };
        if let Some(path) = feature.get("tile_name").and_then(Value::as_str) {
            tiles.insert(*id, path);
        }
    }
    Some(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VpfConfig;
    use crate::storage::testutil::TableWriter;
    use crate::types::ColumnType;

    fn context() -> ClassContext {
        let config = VpfConfig::for_testing();
        ClassContext::new(Arc::new(TableContext::new(&config)), &config)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    fn write_cat(library: &Path, coverages: &[(&str, i64)]) {
        let mut cat = TableWriter::new("Coverage Attribute Table")
            .column("id", ColumnType::LongInteger, "1")
            .column("coverage_name", ColumnType::Text, "8")
            .column("description", ColumnType::Text, "*")
            .column("level", ColumnType::ShortInteger, "1");
        for (i, (name, level)) in coverages.iter().enumerate() {
            cat = cat.row(vec![Value::Integer(i as i64 + 1), text(name), text(name), Value::Integer(*level)]);
        }
        cat.write(library, CAT_TABLE).unwrap();
    }

    fn grt() -> TableWriter {
        TableWriter::new("Geographic Reference Table")
            .column("id", ColumnType::LongInteger, "1")
            .column("data_type", ColumnType::Text, "3")
            .column("geo_datum_code", ColumnType::Text, "3")
    }

    fn write_fcs(coverage: &Path, row: [&str; 5]) {
        let mut values = vec![Value::Integer(1)];
        values.extend(row.map(text));
        TableWriter::new("Feature Class Schema")
            .column("id", ColumnType::LongInteger, "1")
            .column("feature_class", ColumnType::Text, "8")
            .column("table1", ColumnType::Text, "12")
            .column("table1_key", ColumnType::Text, "15")
            .column("table2", ColumnType::Text, "12")
            .column("table2_key", ColumnType::Text, "15")
            .row(values)
            .write(coverage, "fcs")
            .unwrap();
    }

    #[test]
    fn test_missing_grt_is_resolved_once() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("lib");
        write_cat(&dir, &[]);

        let library = Library::open(root.path(), "lib", None, &context()).unwrap();
        assert_eq!(library.crs(), None);

        // A table appearing later is not picked up
        grt().row(vec![Value::Integer(1), text("GEO"), text("WGE")]).write(&dir, GRT_TABLE).unwrap();
        assert_eq!(library.crs(), None);
        assert_eq!(library.crs(), None);
    }

    #[test]
    fn test_resolved_crs_is_cached() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("lib");
        write_cat(&dir, &[]);
        grt().row(vec![Value::Integer(1), text("GEO"), text("WGE")]).write(&dir, GRT_TABLE).unwrap();

        let library = Library::open(root.path(), "lib", None, &context()).unwrap();
        assert_eq!(library.crs(), Some(Crs::Wgs84));

        std::fs::remove_file(dir.join(GRT_TABLE)).unwrap();
        library.tables.clear();
        assert_eq!(library.crs(), Some(Crs::Wgs84));
    }

    #[test]
    fn test_empty_grt_leaves_crs_unresolved() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("lib");
        write_cat(&dir, &[]);
        grt().write(&dir, GRT_TABLE).unwrap();

        let library = Library::open(root.path(), "lib", None, &context()).unwrap();
        assert!(matches!(library.resolve_crs(), Err(VpfError::CrsResolution(_))));
        assert_eq!(library.crs(), None);
        assert_eq!(library.crs(), None);
    }

    #[test]
    fn test_tile_map_without_f_code_types() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("lib");
        write_cat(&dir, &[("tileref", 1)]);

        let tileref = dir.join("tileref");
        write_fcs(&tileref, ["TILEREF", "tileref.aft", "fac_id", "fac", "id"]);
        TableWriter::new("Tile Reference")
            .column("id", ColumnType::LongInteger, "1")
            .column("tile_name", ColumnType::Text, "*")
            .column("fac_id", ColumnType::LongInteger, "1")
            .row(vec![Value::Integer(1), text("E\\A"), Value::Null])
            .row(vec![Value::Integer(2), text("E\\B"), Value::Null])
            .write(&tileref, "tileref.aft")
            .unwrap();
        TableWriter::new("Character Value Descriptions")
            .column("id", ColumnType::LongInteger, "1")
            .column("table", ColumnType::Text, "12")
            .column("attribute", ColumnType::Text, "16")
            .column("value", ColumnType::Text, "5")
            .column("description", ColumnType::Text, "20")
            .row(vec![Value::Integer(1), text("tileref.aft"), text("tile_type"), text("1"), text("Land")])
            .write(&tileref, "char.vdt")
            .unwrap();

        let library = Library::open(root.path(), "lib", None, &context()).unwrap();
        assert!(library.coverages()[0].feature_types().is_empty());

        let tiles = library.tile_map().unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles.get(1).unwrap(), Path::new("E").join("A"));
    }

    #[test]
    fn test_topology_level_range() {
        assert_eq!(topology_level(Some(&Value::Integer(3))), 3);
        assert_eq!(topology_level(Some(&Value::Integer(7))), 0);
        assert_eq!(topology_level(Some(&Value::Integer(i64::from(i32::MAX) + 1))), 0);
        assert_eq!(topology_level(Some(&Value::Null)), 0);
        assert_eq!(topology_level(None), 0);
    }
}
