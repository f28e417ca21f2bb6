//! Cargo items and their capabilities.

use crate::geometry::Point;
use crate::{Error, Result};
use nalgebra::Vector3;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Id reported by an item that has not been placed yet.
pub const UNPLACED_ID: &str = "_";

/// Axis permutation applied when re-orienting an item.
///
/// Each variant names the original axes that become the new
/// (length, width, height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    /// Original orientation.
    #[default]
    Lwh,
    /// Rotated 90° around Z.
    Wlh,
    /// Rotated 90° around X.
    Lhw,
    /// Height becomes length.
    Hlw,
    /// Length becomes height.
    Whl,
    /// Rotated 90° around Y.
    Hwl,
}

impl Orientation {
    /// All six orientations, in index order.
    pub const ALL: [Orientation; 6] = [
        Orientation::Lwh,
        Orientation::Wlh,
        Orientation::Lhw,
        Orientation::Hlw,
        Orientation::Whl,
        Orientation::Hwl,
    ];

    /// Returns the source axis for each new axis as (length, width, height).
    pub fn axes(self) -> (usize, usize, usize) {
        match self {
            Orientation::Lwh => (0, 1, 2),
            Orientation::Wlh => (1, 0, 2),
            Orientation::Lhw => (0, 2, 1),
            Orientation::Hlw => (2, 0, 1),
            Orientation::Whl => (1, 2, 0),
            Orientation::Hwl => (2, 1, 0),
        }
    }

    /// Returns the numeric index (0..=5).
    pub fn index(self) -> u8 {
        match self {
            Orientation::Lwh => 0,
            Orientation::Wlh => 1,
            Orientation::Lhw => 2,
            Orientation::Hlw => 3,
            Orientation::Whl => 4,
            Orientation::Hwl => 5,
        }
    }
}

impl TryFrom<u8> for Orientation {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidOrientation(value))
    }
}

/// Optional physical capabilities of an item.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capabilities {
    /// Maximum mass the item can carry on top (fragile).
    pub max_pressure: Option<f64>,
    /// Maximum ambient temperature (refrigerated).
    pub max_temperature: Option<f64>,
}

/// Item kind, derived from its capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ItemKind {
    /// No special handling.
    Default,
    /// Carries a load limit.
    Fragile,
    /// Carries a temperature limit.
    Refrigerated,
    /// Both limits.
    FragileRefrigerated,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemKind::Default => "Default",
            ItemKind::Fragile => "Fragile",
            ItemKind::Refrigerated => "Refrigerated",
            ItemKind::FragileRefrigerated => "Fragile and Refrigerated",
        };
        f.write_str(label)
    }
}

/// A rectangular cargo item.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Item {
    /// Anchor of the committed placement, if any.
    anchor: Option<Point>,

    /// Owner label.
    client: String,

    /// Dimensions (length, width, height).
    dimensions: Vector3<i64>,

    /// Declared value.
    cost: f64,

    /// Mass.
    mass: f64,

    capabilities: Capabilities,
}

impl Item {
    /// Creates a new item with the given client label, dimensions and mass.
    pub fn new(client: impl Into<String>, length: i64, width: i64, height: i64, mass: f64) -> Self {
        Self {
            anchor: None,
            client: client.into(),
            dimensions: Vector3::new(length, width, height),
            cost: 0.0,
            mass,
            capabilities: Capabilities::default(),
        }
    }

    /// Sets the declared value.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Marks the item fragile with the given load limit.
    pub fn with_max_pressure(mut self, max_pressure: f64) -> Self {
        self.capabilities.max_pressure = Some(max_pressure);
        self
    }

    /// Marks the item refrigerated with the given temperature limit.
    pub fn with_max_temperature(mut self, max_temperature: f64) -> Self {
        self.capabilities.max_temperature = Some(max_temperature);
        self
    }

    /// Returns the coordinate-encoded id, or [`UNPLACED_ID`].
    pub fn id(&self) -> String {
        match self.anchor {
            Some(anchor) => anchor.to_string(),
            None => UNPLACED_ID.to_string(),
        }
    }

    /// Returns the anchor of the committed placement.
    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    /// Stamps the id from the placement anchor.
    pub fn set_id(&mut self, anchor: Point) {
        self.anchor = Some(anchor);
    }

    /// Clears the id.
    pub fn clear_id(&mut self) {
        self.anchor = None;
    }

    /// Returns the client label.
    pub fn client(&self) -> &str {
        &self.client
    }

    /// Returns the dimensions (length, width, height).
    pub fn dimensions(&self) -> &Vector3<i64> {
        &self.dimensions
    }

    /// Returns the length.
    pub fn length(&self) -> i64 {
        self.dimensions.x
    }

    /// Returns the width.
    pub fn width(&self) -> i64 {
        self.dimensions.y
    }

    /// Returns the height.
    pub fn height(&self) -> i64 {
        self.dimensions.z
    }

    /// Returns the mass.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Returns the declared value.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Returns the capability set.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Load limit, present only for fragile items.
    pub fn max_pressure(&self) -> Option<f64> {
        self.capabilities.max_pressure
    }

    /// Temperature limit, present only for refrigerated items.
    pub fn max_temperature(&self) -> Option<f64> {
        self.capabilities.max_temperature
    }

    /// Returns true if the item carries a load limit.
    pub fn is_fragile(&self) -> bool {
        self.capabilities.max_pressure.is_some()
    }

    /// Returns true if the item carries a temperature limit.
    pub fn is_refrigerated(&self) -> bool {
        self.capabilities.max_temperature.is_some()
    }

    /// Returns the kind derived from the capabilities.
    pub fn kind(&self) -> ItemKind {
        match (self.is_fragile(), self.is_refrigerated()) {
            (false, false) => ItemKind::Default,
            (true, false) => ItemKind::Fragile,
            (false, true) => ItemKind::Refrigerated,
            (true, true) => ItemKind::FragileRefrigerated,
        }
    }

    /// Returns a copy with dimensions permuted by `orientation`.
    pub fn reoriented(&self, orientation: Orientation) -> Self {
        let (l, w, h) = orientation.axes();
        let mut item = self.clone();
        item.dimensions = Vector3::new(
            self.dimensions[l],
            self.dimensions[w],
            self.dimensions[h],
        );
        item
    }

    /// Validates the item and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.x <= 0 || self.dimensions.y <= 0 || self.dimensions.z <= 0 {
            return Err(Error::InvalidItem(format!(
                "all dimensions must be positive, got {}x{}x{}",
                self.dimensions.x, self.dimensions.y, self.dimensions.z
            )));
        }

        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(Error::InvalidItem(format!(
                "mass must be a non-negative number, got {}",
                self.mass
            )));
        }

        if let Some(limit) = self.capabilities.max_pressure {
            if !limit.is_finite() || limit < 0.0 {
                return Err(Error::InvalidItem(format!(
                    "max pressure must be a non-negative number, got {}",
                    limit
                )));
            }
        }

        if let Some(limit) = self.capabilities.max_temperature {
            if !limit.is_finite() {
                return Err(Error::InvalidItem(format!(
                    "max temperature must be finite, got {}",
                    limit
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Container ID: {}", self.id())?;
        writeln!(f, "Client: {}", self.client)?;
        writeln!(
            f,
            "Dimensions: {}x{}x{}",
            self.length(),
            self.width(),
            self.height()
        )?;
        writeln!(f, "Cost: ${}", self.cost)?;
        write!(f, "Mass: {} kg", self.mass)?;
        if let Some(p) = self.capabilities.max_pressure {
            write!(f, "\nMax Pressure: {}", p)?;
        }
        if let Some(t) = self.capabilities.max_temperature {
            write!(f, "\nMax Temperature: {}", t)?;
        }
        Ok(())
    }
}
