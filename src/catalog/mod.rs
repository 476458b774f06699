//! Catalog - feature classes, their schemas and feature types
//!
//! # Module Structure
//! - `column_set`: one joined table of a feature class
//! - `relation`: join declarations and deduplicated relations
//! - `schema`: merged, index-addressable feature schema
//! - `feature`: assembled features and their identifiers
//! - `id`: identifier synthesis for rows without `id`
//! - `feature_class`: schema discovery and the join engine
//! - `feature_type`: FACC-coded views of a feature class

pub mod column_set;
pub mod feature;
pub mod feature_class;
pub mod feature_type;
pub mod id;
pub mod relation;
pub mod schema;

pub use column_set::{ColumnSet, GEOMETRY_COLUMN};
pub use feature::{Feature, FeatureId};
pub use feature_class::{ClassContext, FeatureClass, FeatureReader};
pub use feature_type::{FeatureType, FACC_ATTRIBUTE};
pub use id::{id_generator, IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use relation::{JoinDefinition, TableRelation};
pub use schema::{FeatureSchema, SchemaColumn};
