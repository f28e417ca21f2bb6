//! # Stowage 3D
//!
//! Octree-backed placement engine for rectangular cargo.
//!
//! This crate stores items in a bounded 3D storage, keeping them
//! non-overlapping, supported and within their load and temperature limits.
//!
//! ## Features
//!
//! - Octree spatial index with split-on-overflow and merge-on-removal
//! - Explicit placement and parallel automatic placement
//! - Move, rotate and cascading removal with rollback
//! - Pluggable validation rules
//! - Capacity probe over all six orientations

pub mod cursor;
pub mod packer;
pub mod spatial_index;
pub mod stability;
pub mod storage;
pub mod validation;

// Re-exports
pub use cursor::{NodeCursor, Nodes};
pub use packer::AutoPlacer;
pub use spatial_index::{Node, NodeId, Record, SpatialIndex};
pub use storage::{Storage, MAX_EXTENT};
pub use stowage_core::{
    Capabilities, Error, Item, ItemKind, Orientation, Point, Result, StorageConfig, Volume,
};
pub use validation::{named_rule, NamedRule, Rule, RuleChain, SupportRule, TemperatureRule};
