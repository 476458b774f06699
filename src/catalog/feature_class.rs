//! Feature classes: schema discovery and row assembly
//!
//! A feature class is declared by the rows of a coverage's feature class
//! schema table. Each row names two tables and the columns joining them.
//! The first table named becomes the primary table; every other table is
//! either an ordinary data table or a geometry (primitive) table.
//!
//! ## Assembly
//! One feature per primary row. For each relation, in registration order,
//! the joined table is searched from its first row for the first row whose
//! key equals the foreign row's key value. A missing or null key leaves
//! that table's columns null. Geometry tables are not searched: their
//! factory builds the geometry from the foreign row.
//!
//! ## Caching
//! ```text
//! Unstarted --reset/read--> Caching --primary exhausted--> Cached
//!           \--(cache off)--> Live
//! ```
//! `Cached` replays from memory; all table cursors are closed on entry.

use super::column_set::ColumnSet;
use super::feature::{Feature, FeatureId};
use super::id::{id_generator, IdGenerator};
use super::relation::{JoinDefinition, TableRelation};
use super::schema::FeatureSchema;
use crate::cache::{CacheStats, FeatureCache};
use crate::config::VpfConfig;
use crate::database::TileMap;
use crate::error::{Result, VpfError};
use crate::geometry::{GeometryFactories, GeometryKind, GeometrySource};
use crate::storage::{resolve_path, TableContext, TableCursor, TableHeader};
use crate::types::{Geometry, Row, Value};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};

/// Services shared by every feature class opened from one database
#[derive(Clone)]
pub struct ClassContext {
    pub tables: Arc<TableContext>,
    pub factories: GeometryFactories,
    pub ids: Arc<dyn IdGenerator>,
    /// Initial caching flag of new feature classes
    pub caching: bool,
}

impl ClassContext {
    pub fn new(tables: Arc<TableContext>, config: &VpfConfig) -> Self {
        Self {
            tables,
            factories: GeometryFactories::default(),
            ids: id_generator(config.id_strategy),
            caching: config.feature_cache,
        }
    }

    pub fn with_factories(mut self, factories: GeometryFactories) -> Self {
        self.factories = factories;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

/// Cursors of one pass, indexed like the column sets (`None` for geometry tables)
struct Cursors {
    tables: Vec<Option<Box<dyn TableCursor>>>,
}

impl Cursors {
    fn primary(&mut self) -> Result<&mut Box<dyn TableCursor>> {
        self.tables
            .first_mut()
            .and_then(Option::as_mut)
            .ok_or_else(|| VpfError::InvalidData("feature class has no primary table".into()))
    }

    fn has_next(&self) -> bool {
        self.tables
            .first()
            .and_then(Option::as_ref)
            .map_or(false, |cursor| cursor.has_next())
    }

    fn reset(&mut self) -> Result<()> {
        self.primary()?.reset()
    }

    fn close(&mut self) {
        for cursor in self.tables.iter_mut().flatten() {
            cursor.close();
        }
    }
}

enum State {
    Unstarted,
    /// Cache disabled: features are assembled and handed out, not kept
    Live(Cursors),
    /// First pass, every assembled feature is also kept
    Caching {
        cursors: Cursors,
        features: Vec<Feature>,
    },
    Cached(FeatureCache),
    Closed,
}

struct Engine {
    caching: bool,
    state: State,
}

/// Incremental construction of column sets and relations
struct SchemaBuilder<'a> {
    class_name: &'a str,
    directory: &'a Path,
    tables: &'a TableContext,
    column_sets: Vec<ColumnSet>,
    relations: Vec<TableRelation>,
    text_type: bool,
}

impl SchemaBuilder<'_> {
    fn open_header(&self, table: &str) -> Result<(PathBuf, Arc<TableHeader>)> {
        let path = resolve_path(self.directory, table)
            .ok_or_else(|| VpfError::TableNotFound(self.directory.join(table)))?;
        let data = self.tables.table_data(&path)?;
        Ok((path, Arc::clone(data.header())))
    }

    /// Column set index for `table`, creating the set on first mention
    fn track(&mut self, table: &str) -> Result<usize> {
        if let Some(index) = self.column_sets.iter().position(|s| s.matches(table)) {
            return Ok(index);
        }

        let primary = self.column_sets.is_empty();
        let kind = GeometryKind::from_table_name(table);
        let set = match kind {
            Some(kind) if !primary => ColumnSet::geometry(table, Some(kind)),
            _ => match self.open_header(table) {
                Ok((path, header)) => ColumnSet::data(table, &path, &header),
                Err(e) if primary => {
                    return Err(VpfError::SchemaBuild(format!(
                        "feature class {}: primary table {} cannot be read: {}",
                        self.class_name, table, e
                    )));
                }
                Err(e) => {
                    // Unreadable tables are indistinguishable from primitives here
                    warn!(
                        class = %self.class_name,
                        table = %table,
                        error = %e,
                        "Table cannot be opened, treating it as a geometry table"
                    );
                    ColumnSet::geometry(table, kind)
                }
            },
        };

        if set.geometry_kind == Some(GeometryKind::Text) {
            self.text_type = true;
        }
        self.column_sets.push(set);
        Ok(self.column_sets.len() - 1)
    }

    fn add(&mut self, join: &JoinDefinition) -> Result<()> {
        let foreign_set = self.track(&join.table1)?;
        let joined_set = self.track(&join.table2)?;

        let relation = TableRelation {
            joined_table: join.table2.clone(),
            joined_key: join.table2_key.clone(),
            joined_set,
            foreign_table: join.table1.clone(),
            foreign_key: join.table1_key.clone(),
            foreign_set,
        };

        if self.relations.iter().any(|r| r.is_equivalent(&relation)) {
            return Ok(());
        }
        if joined_set == 0 || joined_set == foreign_set {
            // The primary row is read, never joined
            debug!(class = %self.class_name, table = %join.table2, "Ignoring join into the primary table");
            return Ok(());
        }
        self.relations.push(relation);
        Ok(())
    }
}

/// A group of features sharing one physical schema
pub struct FeatureClass {
    name: String,
    directory: PathBuf,
    column_sets: Vec<ColumnSet>,
    relations: Vec<TableRelation>,
    schema: Arc<FeatureSchema>,
    text_type: bool,
    tables: Arc<TableContext>,
    factories: GeometryFactories,
    ids: Arc<dyn IdGenerator>,
    tile_map: OnceLock<Arc<TileMap>>,
    engine: Mutex<Engine>,
}

impl FeatureClass {
    /// Build the class from its join declarations, in schema table order
    pub fn new(
        name: &str,
        directory: &Path,
        joins: &[JoinDefinition],
        context: &ClassContext,
    ) -> Result<Self> {
        let mut builder = SchemaBuilder {
            class_name: name,
            directory,
            tables: &context.tables,
            column_sets: Vec::new(),
            relations: Vec::new(),
            text_type: false,
        };
        for join in joins {
            builder.add(join)?;
        }
        if builder.column_sets.is_empty() {
            return Err(VpfError::SchemaBuild(format!(
                "feature class {} declares no tables",
                name
            )));
        }

        let schema = Arc::new(FeatureSchema::build(&builder.column_sets));
        debug!(
            class = %name,
            tables = builder.column_sets.len(),
            relations = builder.relations.len(),
            columns = schema.len(),
            "Built feature class schema"
        );

        Ok(Self {
            name: name.to_string(),
            directory: directory.to_path_buf(),
            column_sets: builder.column_sets,
            relations: builder.relations,
            schema,
            text_type: builder.text_type,
            tables: Arc::clone(&context.tables),
            factories: context.factories.clone(),
            ids: Arc::clone(&context.ids),
            tile_map: OnceLock::new(),
            engine: Mutex::new(Engine {
                caching: context.caching,
                state: State::Unstarted,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn column_sets(&self) -> &[ColumnSet] {
        &self.column_sets
    }

    pub fn relations(&self) -> &[TableRelation] {
        &self.relations
    }

    /// Primary table name
    pub fn primary_table(&self) -> &str {
        self.column_sets
            .first()
            .map_or("", |set| set.table_name.as_str())
    }

    /// Kind of the geometry contributing the schema's geometry column
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        let index = self.schema.geometry_index()?;
        let column = self.schema.column(index)?;
        self.column_sets.get(column.set)?.geometry_kind
    }

    /// Annotation class (joins the text primitive table)
    pub fn is_text_type(&self) -> bool {
        self.text_type
    }

    /// Attach the library's tile map; only the first call has an effect
    pub fn set_tile_map(&self, tiles: Arc<TileMap>) {
        let _ = self.tile_map.set(tiles);
    }

    pub fn tile_map(&self) -> Option<&Arc<TileMap>> {
        self.tile_map.get()
    }

    /// Enable or disable caching. Disabling drops an existing cache.
    pub fn set_caching(&self, enabled: bool) {
        let mut engine = self.engine.lock();
        engine.caching = enabled;
        if enabled {
            return;
        }
        engine.state = match std::mem::replace(&mut engine.state, State::Unstarted) {
            State::Cached(_) => State::Unstarted,
            State::Caching { cursors, .. } => State::Live(cursors),
            other => other,
        };
    }

    pub fn is_caching(&self) -> bool {
        self.engine.lock().caching
    }

    pub fn is_cached(&self) -> bool {
        matches!(self.engine.lock().state, State::Cached(_))
    }

    /// Replay statistics, once cached
    pub fn cache_stats(&self) -> Option<CacheStats> {
        match &self.engine.lock().state {
            State::Cached(cache) => Some(cache.stats().clone()),
            _ => None,
        }
    }

    /// Materialized features, shareable across threads
    pub fn cached_features(&self) -> Option<Arc<[Feature]>> {
        match &self.engine.lock().state {
            State::Cached(cache) => Some(cache.features()),
            _ => None,
        }
    }

    /// Rewind: replays the cache when present, otherwise restarts the primary table
    pub fn reset(&self) -> Result<()> {
        self.begin_pass(&mut self.engine.lock())
    }

    pub fn has_next(&self) -> Result<bool> {
        self.has_next_locked(&mut self.engine.lock())
    }

    pub fn read_next(&self) -> Result<Option<Feature>> {
        self.next_locked(&mut self.engine.lock())
    }

    /// Read a complete pass. With caching on the class ends up `Cached`
    /// and its table cursors are closed.
    pub fn read_all_rows(&self) -> Result<Arc<[Feature]>> {
        let mut engine = self.engine.lock();
        if let State::Cached(cache) = &engine.state {
            return Ok(cache.features());
        }

        self.begin_pass(&mut engine)?;
        let live = matches!(engine.state, State::Live(_));
        let mut features = Vec::new();
        while let Some(feature) = self.next_locked(&mut engine)? {
            if live {
                features.push(feature);
            }
        }

        match &engine.state {
            State::Cached(cache) => Ok(cache.features()),
            _ => Ok(features.into()),
        }
    }

    /// Iterate one full pass from the start.
    ///
    /// The reader holds the class lock until dropped; calling other methods
    /// of this class from the same thread meanwhile deadlocks.
    pub fn features(&self) -> Result<FeatureReader<'_>> {
        let mut engine = self.engine.lock();
        self.begin_pass(&mut engine)?;
        Ok(FeatureReader {
            class: self,
            engine,
            failed: false,
        })
    }

    /// Release table cursors. Cached features stay readable; otherwise
    /// further reads fail with `TableClosed`.
    pub fn close(&self) {
        let mut engine = self.engine.lock();
        engine.state = match std::mem::replace(&mut engine.state, State::Unstarted) {
            State::Cached(cache) => State::Cached(cache),
            State::Live(mut cursors) | State::Caching { cursors: mut cursors, .. } => {
                cursors.close();
                State::Closed
            }
            State::Unstarted | State::Closed => State::Closed,
        };
    }

    fn open_cursors(&self) -> Result<Cursors> {
        let mut tables = Vec::with_capacity(self.column_sets.len());
        for (index, set) in self.column_sets.iter().enumerate() {
            let Some(path) = &set.path else {
                tables.push(None);
                continue;
            };
            match self.tables.open(path) {
                Ok(cursor) => tables.push(Some(cursor)),
                Err(e) if index == 0 => return Err(e),
                Err(e) => {
                    warn!(
                        class = %self.name,
                        table = %set.table_name,
                        error = %e,
                        "Joined table unavailable, its columns will be null"
                    );
                    tables.push(None);
                }
            }
        }
        Ok(Cursors { tables })
    }

    fn begin_pass(&self, engine: &mut Engine) -> Result<()> {
        let mut cursors = match std::mem::replace(&mut engine.state, State::Unstarted) {
            State::Cached(mut cache) => {
                cache.rewind();
                engine.state = State::Cached(cache);
                return Ok(());
            }
            State::Closed => {
                engine.state = State::Closed;
                return Err(VpfError::TableClosed(self.name.clone()));
            }
            State::Unstarted => self.open_cursors()?,
            State::Live(mut cursors) | State::Caching { cursors: mut cursors, .. } => {
                cursors.reset()?;
                cursors
            }
        };

        engine.state = if engine.caching {
            if !cursors.has_next() {
                // Empty primary table: nothing to materialize
                cursors.close();
                State::Cached(FeatureCache::completed(Vec::new()))
            } else {
                State::Caching {
                    cursors,
                    features: Vec::new(),
                }
            }
        } else {
            State::Live(cursors)
        };
        Ok(())
    }

    fn has_next_locked(&self, engine: &mut Engine) -> Result<bool> {
        if matches!(engine.state, State::Unstarted) {
            self.begin_pass(engine)?;
        }
        Ok(match &engine.state {
            State::Cached(cache) => cache.has_next(),
            State::Live(cursors) | State::Caching { cursors, .. } => cursors.has_next(),
            State::Unstarted | State::Closed => false,
        })
    }

    fn next_locked(&self, engine: &mut Engine) -> Result<Option<Feature>> {
        if matches!(engine.state, State::Unstarted) {
            self.begin_pass(engine)?;
        }

        let (next, exhausted) = match &mut engine.state {
            State::Cached(cache) => return Ok(cache.next_feature()),
            State::Live(cursors) => return self.join_rows(cursors),
            State::Closed => return Err(VpfError::TableClosed(self.name.clone())),
            State::Unstarted => return Ok(None),
            State::Caching { cursors, features } => {
                let next = self.join_rows(cursors)?;
                if let Some(feature) = &next {
                    features.push(feature.clone());
                }
                let exhausted = next.is_none() || !cursors.has_next();
                (next, exhausted)
            }
        };

        if exhausted {
            self.finish_caching(engine);
        }
        Ok(next)
    }

    fn finish_caching(&self, engine: &mut Engine) {
        engine.state = match std::mem::replace(&mut engine.state, State::Unstarted) {
            State::Caching {
                mut cursors,
                features,
            } => {
                cursors.close();
                debug!(class = %self.name, features = features.len(), "Feature class cached");
                State::Cached(FeatureCache::completed(features))
            }
            other => other,
        };
    }

    /// Assemble the feature for the next primary row
    fn join_rows(&self, cursors: &mut Cursors) -> Result<Option<Feature>> {
        let Some(primary) = cursors.primary()?.read_next()? else {
            return Ok(None);
        };
        let id = match primary.id() {
            Some(id) => FeatureId::Row(id),
            None => FeatureId::Synthetic(self.ids.next_id()),
        };

        let mut rows: Vec<Option<Row>> = vec![None; self.column_sets.len()];
        let mut geometries: Vec<Option<Geometry>> = vec![None; self.column_sets.len()];
        rows[0] = Some(primary);

        for relation in &self.relations {
            let joined = &self.column_sets[relation.joined_set];
            let Some(foreign_row) = rows[relation.foreign_set].as_ref() else {
                continue;
            };

            if joined.is_geometry_table() {
                geometries[relation.joined_set] = self.build_geometry(joined, relation, foreign_row);
                continue;
            }

            let key = foreign_row.get_or_null(&relation.foreign_key).clone();
            if key.is_null() {
                continue;
            }
            let Some(cursor) = cursors.tables[relation.joined_set].as_mut() else {
                continue;
            };
            match cursor.row_by_id(&relation.joined_key, &key) {
                Ok(Some(row)) => rows[relation.joined_set] = Some(row),
                Ok(None) => {
                    trace!(table = %relation.joined_table, key = %key, "No joined row");
                }
                Err(e) => {
                    let failure = VpfError::JoinLookup {
                        table: relation.joined_table.clone(),
                        reason: e.to_string(),
                    };
                    warn!(class = %self.name, error = %failure, "Join lookup failed");
                }
            }
        }

        Ok(Some(self.combine(id, &rows, &mut geometries)))
    }

    fn build_geometry(
        &self,
        set: &ColumnSet,
        relation: &TableRelation,
        foreign_row: &Row,
    ) -> Option<Geometry> {
        let kind = set.geometry_kind?;
        let factory = self.factories.get(kind)?;
        let source = GeometrySource {
            class_name: &self.name,
            key_column: &relation.foreign_key,
            directory: &self.directory,
            tables: &self.tables,
            tile_map: self.tile_map.get().map(Arc::as_ref),
        };
        match factory.build(&source, foreign_row) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!(class = %self.name, kind = %kind, error = %e, "Geometry construction failed");
                None
            }
        }
    }

    /// Concatenate the joined rows in schema order
    fn combine(&self, id: FeatureId, rows: &[Option<Row>], geometries: &mut [Option<Geometry>]) -> Feature {
        let values = self
            .schema
            .columns()
            .iter()
            .map(|column| match column.source {
                Some(position) => rows[column.set]
                    .as_ref()
                    .and_then(|row| row.value(position))
                    .cloned()
                    .unwrap_or(Value::Null),
                None => Value::Null,
            })
            .collect();

        let mut feature = Feature::new(id, Arc::clone(&self.schema), values);
        let geometry = self
            .schema
            .geometry_index()
            .and_then(|index| self.schema.column(index))
            .and_then(|column| geometries[column.set].take());
        if let Some(geometry) = geometry {
            feature.set_geometry(geometry);
        }
        feature
    }
}

impl std::fmt::Debug for FeatureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureClass")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("column_sets", &self.column_sets)
            .field("relations", &self.relations)
            .finish()
    }
}

/// One full pass over a feature class, holding its lock
pub struct FeatureReader<'a> {
    class: &'a FeatureClass,
    engine: MutexGuard<'a, Engine>,
    failed: bool,
}

impl Iterator for FeatureReader<'_> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.class.next_locked(&mut self.engine) {
            Ok(feature) => feature.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testutil::TableWriter;
    use crate::types::{ColumnType, Point};

    fn context(caching: bool) -> ClassContext {
        let config = VpfConfig {
            feature_cache: caching,
            ..VpfConfig::for_testing()
        };
        ClassContext::new(Arc::new(TableContext::new(&config)), &config)
    }

    fn coords(points: &[(f64, f64)]) -> Value {
        Value::Coordinates(points.iter().map(|(x, y)| Point::new(*x, *y)).collect())
    }

    /// `rdt(id, name, k)` joined to edge primitives on `k = id`
    fn write_roads(dir: &Path, rows: Vec<(i64, &str, Value)>) {
        let mut rdt = TableWriter::new("Roads")
            .column("id", ColumnType::LongInteger, "1")
            .column("name", ColumnType::Text, "*")
            .column("k", ColumnType::LongInteger, "1");
        for (id, name, k) in rows {
            rdt = rdt.row(vec![Value::Integer(id), Value::Text(name.into()), k]);
        }
        rdt.write(dir, "rdt").unwrap();

        TableWriter::new("Edges")
            .column("id", ColumnType::LongInteger, "1")
            .column("coordinates", ColumnType::Coordinate2DReal, "*")
            .row(vec![Value::Integer(10), coords(&[(0.0, 0.0), (1.0, 1.0)])])
            .row(vec![Value::Integer(11), coords(&[(5.0, 5.0), (6.0, 5.0)])])
            .write(dir, "edg")
            .unwrap();
    }

    fn road_class(dir: &Path, context: &ClassContext) -> FeatureClass {
        let joins = [JoinDefinition::new("rdt", "k", "edg", "id")];
        FeatureClass::new("road", dir, &joins, context).unwrap()
    }

    /// Primary `lake.aft` plus attribute table `lake.fit` (with duplicate keys)
    fn write_lakes(dir: &Path) {
        TableWriter::new("Lakes")
            .column("id", ColumnType::LongInteger, "1")
            .column("f_code", ColumnType::Text, "5")
            .column("fit_id", ColumnType::LongInteger, "1")
            .row(vec![Value::Integer(1), Value::Text("BH000".into()), Value::Integer(7)])
            .row(vec![Value::Integer(2), Value::Text("BH080".into()), Value::Null])
            .row(vec![Value::Integer(3), Value::Text("BH000".into()), Value::Integer(99)])
            .write(dir, "lake.aft")
            .unwrap();

        TableWriter::new("Lake names")
            .column("id", ColumnType::LongInteger, "1")
            .column("nam", ColumnType::Text, "*")
            .row(vec![Value::Integer(7), Value::Text("first".into())])
            .row(vec![Value::Integer(7), Value::Text("second".into())])
            .write(dir, "lake.fit")
            .unwrap();
    }

    fn lake_class(dir: &Path, context: &ClassContext) -> FeatureClass {
        let joins = [
            JoinDefinition::new("lake.aft", "fit_id", "lake.fit", "id"),
            JoinDefinition::new("lake.fit", "id", "lake.aft", "fit_id"),
        ];
        FeatureClass::new("lake", dir, &joins, context).unwrap()
    }

    fn snapshot(class: &FeatureClass) -> Vec<(FeatureId, Vec<Value>)> {
        class
            .features()
            .unwrap()
            .map(|f| f.unwrap())
            .map(|f| (f.id().clone(), f.values().to_vec()))
            .collect()
    }

    #[test]
    fn test_scenario_geometry_from_edge() {
        let dir = tempfile::tempdir().unwrap();
        write_roads(dir.path(), vec![(1, "A", Value::Integer(10))]);
        let class = road_class(dir.path(), &context(true));

        assert_eq!(class.geometry_kind(), Some(GeometryKind::Line));
        let features = class.read_all_rows().unwrap();
        assert_eq!(features.len(), 1);
        let feature = &features[0];
        assert_eq!(feature.id(), &FeatureId::Row(1));
        assert_eq!(feature.get("name"), Some(&Value::Text("A".into())));
        match feature.geometry() {
            Some(Geometry::LineString(points)) => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[1], Point::new(1.0, 1.0));
            }
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_scenario_null_key_has_no_geometry() {
        let dir = tempfile::tempdir().unwrap();
        write_roads(dir.path(), vec![(1, "A", Value::Null)]);
        let class = road_class(dir.path(), &context(true));

        let feature = class.read_next().unwrap().unwrap();
        assert_eq!(feature.get("name"), Some(&Value::Text("A".into())));
        assert!(feature.geometry().is_none());
        assert!(class.read_next().unwrap().is_none());
    }

    #[test]
    fn test_schema_column_count() {
        let dir = tempfile::tempdir().unwrap();
        write_roads(dir.path(), vec![(1, "A", Value::Integer(10))]);
        write_lakes(dir.path());

        // rdt: 3 columns, plus one geometry column
        let roads = road_class(dir.path(), &context(true));
        assert_eq!(roads.schema().len(), 3 + 1);

        // lake.aft: 3, lake.fit: 2 - id, no geometry
        let lakes = lake_class(dir.path(), &context(true));
        assert_eq!(lakes.schema().len(), 3 + (2 - 1));
        assert_eq!(lakes.relations().len(), 1);
        assert_eq!(lakes.primary_table(), "lake.aft");
    }

    #[test]
    fn test_first_physical_match_and_null_propagation() {
        let dir = tempfile::tempdir().unwrap();
        write_lakes(dir.path());
        let class = lake_class(dir.path(), &context(true));

        for _ in 0..3 {
            let features = snapshot(&class);
            let names: Vec<Value> = features.iter().map(|(_, values)| values[3].clone()).collect();
            // key 7 matches twice, null key and unmatched key 99 give null
            assert_eq!(
                names,
                vec![Value::Text("first".into()), Value::Null, Value::Null]
            );
        }
    }

    #[test]
    fn test_cache_and_live_passes_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_lakes(dir.path());
        write_roads(
            dir.path(),
            vec![(1, "A", Value::Integer(10)), (2, "B", Value::Null), (3, "C", Value::Integer(11))],
        );

        for make in [road_class, lake_class] {
            let cached = make(dir.path(), &context(true));
            let live = make(dir.path(), &context(false));
            let expected = snapshot(&cached);
            assert!(cached.is_cached());
            assert_eq!(expected, snapshot(&live));
            assert!(!live.is_cached());
            assert!(live.cached_features().is_none());
        }
    }

    #[test]
    fn test_replay_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_lakes(dir.path());
        let class = lake_class(dir.path(), &context(true));

        let first = snapshot(&class);
        assert_eq!(first.len(), 3);
        for _ in 0..3 {
            class.reset().unwrap();
            let mut replay = Vec::new();
            while class.has_next().unwrap() {
                let f = class.read_next().unwrap().unwrap();
                replay.push((f.id().clone(), f.values().to_vec()));
            }
            assert_eq!(replay, first);
        }
        assert_eq!(class.cache_stats().unwrap().size, 3);
    }

    #[test]
    fn test_cached_features_survive_close() {
        let dir = tempfile::tempdir().unwrap();
        write_lakes(dir.path());
        let class = lake_class(dir.path(), &context(true));

        let all = class.read_all_rows().unwrap();
        class.close();
        let shared = class.cached_features().unwrap();
        assert_eq!(shared.len(), all.len());
        let ids = std::thread::spawn(move || shared.iter().map(|f| f.id().clone()).collect::<Vec<_>>())
            .join()
            .unwrap();
        assert_eq!(ids, vec![FeatureId::Row(1), FeatureId::Row(2), FeatureId::Row(3)]);
    }

    #[test]
    fn test_closed_live_class_rejects_reads() {
        let dir = tempfile::tempdir().unwrap();
        write_lakes(dir.path());
        let class = lake_class(dir.path(), &context(false));

        assert!(class.read_next().unwrap().is_some());
        class.close();
        assert!(matches!(class.read_next(), Err(VpfError::TableClosed(_))));
        assert!(matches!(class.reset(), Err(VpfError::TableClosed(_))));
        assert!(!class.has_next().unwrap());
    }

    #[test]
    fn test_disabling_cache_drops_it() {
        let dir = tempfile::tempdir().unwrap();
        write_lakes(dir.path());
        let class = lake_class(dir.path(), &context(true));

        class.read_all_rows().unwrap();
        assert!(class.is_cached());
        class.set_caching(false);
        assert!(!class.is_cached());
        assert_eq!(class.read_all_rows().unwrap().len(), 3);
        assert!(!class.is_cached());
    }

    #[test]
    fn test_missing_primary_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let joins = [JoinDefinition::new("nope.aft", "id", "edg", "id")];
        let err = FeatureClass::new("nope", dir.path(), &joins, &context(true)).unwrap_err();
        assert!(matches!(err, VpfError::SchemaBuild(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_unreadable_table_is_treated_as_geometry() {
        // Known ambiguity: a missing attribute table cannot be told apart
        // from a primitive table, so it becomes a geometry placeholder.
        let dir = tempfile::tempdir().unwrap();
        write_lakes(dir.path());
        let joins = [JoinDefinition::new("lake.aft", "fit_id", "missing.fit", "id")];
        let class = FeatureClass::new("lake", dir.path(), &joins, &context(true)).unwrap();

        let set = &class.column_sets()[1];
        assert!(set.is_geometry_table());
        assert_eq!(set.geometry_kind, None);
        assert_eq!(class.schema().len(), 3 + 1);
        assert_eq!(class.geometry_kind(), None);

        let features = class.read_all_rows().unwrap();
        assert_eq!(features.len(), 3);
        assert!(features.iter().all(|f| f.geometry().is_none()));
    }

    #[test]
    fn test_text_class_and_synthetic_ids() {
        let dir = tempfile::tempdir().unwrap();
        TableWriter::new("Labels")
            .column("txt_id", ColumnType::LongInteger, "1")
            .row(vec![Value::Integer(1)])
            .row(vec![Value::Integer(2)])
            .write(dir.path(), "label.tft")
            .unwrap();
        TableWriter::new("Text")
            .column("id", ColumnType::LongInteger, "1")
            .column("string", ColumnType::Text, "*")
            .column("shape_line", ColumnType::Coordinate2DFloat, "*")
            .row(vec![Value::Integer(1), Value::Text("Main St".into()), coords(&[(0.0, 0.0), (4.0, 0.0)])])
            .write(dir.path(), "txt")
            .unwrap();

        let joins = [JoinDefinition::new("label.tft", "txt_id", "txt", "id")];
        let class = FeatureClass::new("label", dir.path(), &joins, &context(true)).unwrap();
        assert!(class.is_text_type());

        let features = class.read_all_rows().unwrap();
        assert_eq!(features[0].id(), &FeatureId::Synthetic("fid-1".into()));
        assert_eq!(features[1].id(), &FeatureId::Synthetic("fid-2".into()));
        match features[0].geometry() {
            Some(Geometry::Text { text, line }) => {
                assert_eq!(text, "Main St");
                assert_eq!(line.len(), 2);
            }
            other => panic!("expected text, got {:?}", other),
        }
        // txt id 2 does not exist
        assert!(features[1].geometry().is_none());
    }

    #[test]
    fn test_tiled_primitives() {
        let dir = tempfile::tempdir().unwrap();
        TableWriter::new("Roads")
            .column("id", ColumnType::LongInteger, "1")
            .column("tile_id", ColumnType::ShortInteger, "1")
            .column("edg_id", ColumnType::LongInteger, "1")
            .row(vec![Value::Integer(1), Value::Integer(2), Value::Integer(1)])
            .write(dir.path(), "roadl.lft")
            .unwrap();
        TableWriter::new("Edges")
            .column("id", ColumnType::LongInteger, "1")
            .column("coordinates", ColumnType::Coordinate2DReal, "*")
            .row(vec![Value::Integer(1), coords(&[(3.0, 3.0), (4.0, 4.0)])])
            .write(&dir.path().join("N").join("B"), "edg")
            .unwrap();

        let joins = [JoinDefinition::new("roadl.lft", "edg_id", "edg", "id")];
        let class = FeatureClass::new("roadl", dir.path(), &joins, &context(true)).unwrap();
        let mut tiles = TileMap::new();
        tiles.insert(2, "N\\B");
        class.set_tile_map(Arc::new(tiles));

        let feature = class.read_next().unwrap().unwrap();
        assert!(matches!(feature.geometry(), Some(Geometry::LineString(points)) if points[0] == Point::new(3.0, 3.0)));
    }
}
