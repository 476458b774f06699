//! vpfdb - Vector Product Format reader
//!
//! Reads VPF databases: a directory hierarchy of database, library,
//! coverage and feature class, where every feature is spread across several
//! flat-file tables and reassembled at read time by schema-declared joins.
//!
//! ## Features
//! - Table file codec (both byte orders, variable-length columns, triplet ids)
//! - Feature class join engine with in-memory caching and replay
//! - Line, area (winged-edge), node and text geometry construction
//! - Tiled libraries and WGS 84 CRS resolution
//!
//! ## Architecture
//! - Storage layer: table header parsing, row decoding, cursors, shared table context
//! - Catalog layer: column sets, relations, merged schemas, feature classes and types
//! - Database layer: database, library and coverage discovery
//! - Geometry layer: one factory per primitive kind
//!
//! ## Example
//! ```no_run
//! use vpfdb::VpfDatabase;
//!
//! let db = VpfDatabase::open("/data/vmaplv0/v0eur")?;
//! for feature_type in db.feature_types() {
//!     let features = feature_type.read_all()?;
//!     println!("{}: {} features", feature_type.type_name(), features.len());
//! }
//! # Ok::<(), vpfdb::VpfError>(())
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod database;
pub mod geometry;
pub mod logging;
pub mod storage;
pub mod types;

mod error;

pub use config::{IdStrategy, VpfConfig};
pub use error::{Result, VpfError};

// Main public API
pub use catalog::{Feature, FeatureClass, FeatureId, FeatureReader, FeatureSchema, FeatureType};
pub use database::{Coverage, Crs, DatabaseStats, Library, TileMap, VpfDatabase};
pub use geometry::{GeometryFactories, GeometryFactory, GeometryKind};
pub use types::{BoundingBox, Geometry, Point, Value};
