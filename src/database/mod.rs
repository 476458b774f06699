//! Database Module - the directory hierarchy
//!
//! # Module Structure
//! - `core`: VpfDatabase struct, open and aggregate lookups
//! - `library`: libraries, CRS resolution and tile map construction
//! - `coverage`: coverages, feature class discovery and feature types
//! - `tiles`: tile id -> tile directory map

pub mod core;
pub mod coverage;
pub mod library;
pub mod tiles;

// Re-export main types
pub use core::{DatabaseStats, VpfDatabase};
pub use coverage::Coverage;
pub use library::{Crs, Library};
pub use tiles::{normalize_tile_path, TileMap};
