//! Lattice geometry: points and axis-aligned volumes.
//!
//! Coordinates live on an integer lattice. A volume anchored at `x` with
//! length `l` covers the closed interval `[x, x + l]`, so two volumes sharing
//! a boundary plane intersect. Items resting on each other are therefore one
//! unit apart vertically.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A lattice point, ordered lexicographically by `(x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// X coordinate (length axis).
    pub x: i64,
    /// Y coordinate (width axis).
    pub y: i64,
    /// Z coordinate (height axis).
    pub z: i64,
}

impl Point {
    /// Creates a new point.
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Returns true if no coordinate is negative.
    pub fn is_non_negative(&self) -> bool {
        self.x >= 0 && self.y >= 0 && self.z >= 0
    }

    /// Parses an `"x_y_z"` id back into a point.
    pub fn parse_id(id: &str) -> Option<Self> {
        let mut parts = id.split('_');
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { x, y, z })
    }
}

/// Renders the point as an item id.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.x, self.y, self.z)
    }
}

impl FromStr for Point {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_id(s).ok_or_else(|| Error::InvalidCoordinate(format!("malformed id '{}'", s)))
    }
}

/// Corner indices into [`Volume::corners`].
pub mod corner {
    /// Near-left bottom (the anchor).
    pub const LL_DOWN: usize = 0;
    /// Near-left top.
    pub const LL_UP: usize = 1;
    /// Near-right bottom.
    pub const LR_DOWN: usize = 2;
    /// Near-right top.
    pub const LR_UP: usize = 3;
    /// Far-right bottom.
    pub const RR_DOWN: usize = 4;
    /// Far-right top.
    pub const RR_UP: usize = 5;
    /// Far-left bottom.
    pub const RL_DOWN: usize = 6;
    /// Far-left top.
    pub const RL_UP: usize = 7;
}

/// An axis-aligned box described by its eight corners.
///
/// Min and max are derived from all eight corners at construction and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Volume {
    corners: [Point; 8],
    min: Point,
    max: Point,
}

impl Volume {
    /// Builds a volume from eight corners.
    pub fn from_corners(corners: [Point; 8]) -> Self {
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            min.z = min.z.min(c.z);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
            max.z = max.z.max(c.z);
        }
        Self { corners, min, max }
    }

    /// Builds the volume of an item with the given dimensions anchored at `anchor`.
    pub fn from_anchor(anchor: Point, length: i64, width: i64, height: i64) -> Self {
        let Point { x, y, z } = anchor;
        Self::from_corners([
            Point::new(x, y, z),
            Point::new(x, y, z + height),
            Point::new(x + length, y, z),
            Point::new(x + length, y, z + height),
            Point::new(x + length, y + width, z),
            Point::new(x + length, y + width, z + height),
            Point::new(x, y + width, z),
            Point::new(x, y + width, z + height),
        ])
    }

    /// Builds a volume spanning `min..=max`.
    pub fn from_bounds(min: Point, max: Point) -> Self {
        Self::from_anchor(min, max.x - min.x, max.y - min.y, max.z - min.z)
    }

    /// Returns all eight corners.
    pub fn corners(&self) -> &[Point; 8] {
        &self.corners
    }

    /// Returns the minimum corner.
    pub fn min(&self) -> Point {
        self.min
    }

    /// Returns the maximum corner.
    pub fn max(&self) -> Point {
        self.max
    }

    /// Returns the anchor (near-left bottom corner).
    pub fn anchor(&self) -> Point {
        self.corners[corner::LL_DOWN]
    }

    /// Z of the lower face.
    pub fn bottom(&self) -> i64 {
        self.min.z
    }

    /// Z of the upper face.
    pub fn top(&self) -> i64 {
        self.max.z
    }

    /// Extent along X.
    pub fn length(&self) -> i64 {
        self.max.x - self.min.x
    }

    /// Extent along Y.
    pub fn width(&self) -> i64 {
        self.max.y - self.min.y
    }

    /// Extent along Z.
    pub fn height(&self) -> i64 {
        self.max.z - self.min.z
    }

    /// Checks if this volume contains a point (closed bounds).
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Checks if every corner of `other` lies inside this volume.
    pub fn contains(&self, other: &Volume) -> bool {
        other.corners.iter().all(|c| self.contains_point(c))
    }

    /// Checks if two volumes overlap (closed intervals on all three axes).
    pub fn intersects(&self, other: &Volume) -> bool {
        self.footprint_overlaps(other) && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Checks if the X/Y projections of two volumes overlap.
    pub fn footprint_overlaps(&self, other: &Volume) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Checks if the X/Y projection contains the given column.
    pub fn footprint_contains(&self, x: i64, y: i64) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }

    /// Returns the eight lattice octants of this volume.
    ///
    /// Each axis `[min, max]` splits into `[min, mid]` and `[mid + 1, max]`, so
    /// octants are pairwise disjoint and cover the volume exactly. Octant `i`
    /// takes the upper half on X when bit 0 is set, on Y for bit 1 and on Z for
    /// bit 2. Every axis must span at least two lattice points.
    pub fn octants(&self) -> [Volume; 8] {
        let mid = Point::new(
            (self.min.x + self.max.x).div_euclid(2),
            (self.min.y + self.max.y).div_euclid(2),
            (self.min.z + self.max.z).div_euclid(2),
        );
        std::array::from_fn(|i| {
            let (lo_x, hi_x) = if i & 1 == 0 {
                (self.min.x, mid.x)
            } else {
                (mid.x + 1, self.max.x)
            };
            let (lo_y, hi_y) = if i & 2 == 0 {
                (self.min.y, mid.y)
            } else {
                (mid.y + 1, self.max.y)
            };
            let (lo_z, hi_z) = if i & 4 == 0 {
                (self.min.z, mid.z)
            } else {
                (mid.z + 1, self.max.z)
            };
            Volume::from_bounds(Point::new(lo_x, lo_y, lo_z), Point::new(hi_x, hi_y, hi_z))
        })
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}) to ({}, {}, {})",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
