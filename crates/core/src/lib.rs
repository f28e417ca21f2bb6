//! # Stowage Core
//!
//! Shared types for the stowage placement engine.
//!
//! ## Core Components
//!
//! - **Geometry**: [`Point`] lattice coordinates and [`Volume`] axis-aligned boxes
//! - **Items**: [`Item`] with [`Capabilities`], [`ItemKind`] and [`Orientation`]
//! - **Configuration**: [`StorageConfig`]
//! - **Errors**: [`Error`] and the [`Result`] alias
//!
//! ## Coordinates
//!
//! All coordinates are integers and intervals are closed: a box anchored at
//! `x` with length `l` occupies `[x, x + l]`. Boxes sharing a face collide, so
//! an item resting on another starts one unit above its top.
//!
//! ```rust
//! use stowage_core::{Item, Orientation, Point, Volume};
//!
//! let item = Item::new("Cargo A", 7, 4, 3, 1.1).reoriented(Orientation::Hwl);
//! assert_eq!((item.length(), item.width(), item.height()), (3, 4, 7));
//!
//! let v = Volume::from_anchor(Point::new(0, 0, 0), 3, 4, 7);
//! assert_eq!(v.top(), 7);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod config;
pub mod error;
pub mod geometry;
pub mod item;

// Re-exports
pub use config::StorageConfig;
pub use error::{Error, Result};
pub use geometry::{corner, Point, Volume};
pub use item::{Capabilities, Item, ItemKind, Orientation, UNPLACED_ID};
