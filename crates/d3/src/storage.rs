//! The placement engine.
//!
//! [`Storage`] owns a [`SpatialIndex`] over its volume and a [`RuleChain`]
//! checked before every commit. Placements are identified by the
//! `"x_y_z"` id of their anchor corner.
//!
//! # Example
//!
//! ```rust
//! use stowage_d3::{Item, Storage};
//!
//! let mut storage = Storage::new(1, 100, 100, 100, 20.0).unwrap();
//! let id = storage
//!     .add_item_at(Item::new("Cargo B", 2, 5, 2, 2.5).with_max_pressure(11.3), 0, 0, 0)
//!     .unwrap();
//! assert_eq!(id, "0_0_0");
//!
//! // Resting on top starts one unit above the lower item.
//! storage.add_item_at(Item::new("Cargo A", 1, 4, 1, 1.1), 0, 0, 3).unwrap();
//! assert_eq!(storage.len(), 2);
//! ```

use crate::packer::{self, AutoPlacer};
use crate::spatial_index::{NodeId, Record, SpatialIndex};
use crate::stability;
use crate::validation::{Rule, RuleChain};
use std::collections::HashSet;
use std::sync::Arc;
use stowage_core::{Error, Item, Orientation, Point, Result, StorageConfig, Volume};

/// Largest extent along any axis. Octant midpoints sum two bounds, so
/// anything above half of `i64::MAX` could overflow.
pub const MAX_EXTENT: i64 = i64::MAX / 2;

/// A bounded storage volume holding placed items.
#[derive(Debug, Clone)]
pub struct Storage {
    number: u32,
    length: i64,
    width: i64,
    height: i64,
    temperature: f64,
    config: StorageConfig,
    index: SpatialIndex,
    rules: RuleChain,
}

impl Storage {
    /// Creates an empty storage with the default configuration.
    pub fn new(number: u32, length: i64, width: i64, height: i64, temperature: f64) -> Result<Self> {
        Self::with_config(number, length, width, height, temperature, StorageConfig::default())
    }

    /// Creates an empty storage with the given configuration.
    pub fn with_config(
        number: u32,
        length: i64,
        width: i64,
        height: i64,
        temperature: f64,
        config: StorageConfig,
    ) -> Result<Self> {
        if length <= 0 || width <= 0 || height <= 0 {
            return Err(Error::InvalidStorage(format!(
                "all dimensions must be positive, got {}x{}x{}",
                length, width, height
            )));
        }
        if length > MAX_EXTENT || width > MAX_EXTENT || height > MAX_EXTENT {
            return Err(Error::InvalidStorage(format!(
                "dimensions must not exceed {}, got {}x{}x{}",
                MAX_EXTENT, length, width, height
            )));
        }
        if !temperature.is_finite() {
            return Err(Error::InvalidStorage(format!(
                "temperature must be finite, got {}",
                temperature
            )));
        }

        let bounds = Volume::from_bounds(Point::new(0, 0, 0), Point::new(length, width, height));
        Ok(Self {
            number,
            length,
            width,
            height,
            temperature,
            index: SpatialIndex::new(bounds, config.leaf_capacity, config.min_node_size),
            config,
            rules: RuleChain::with_builtin(),
        })
    }

    /// Storage number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Extent along X.
    pub fn length(&self) -> i64 {
        self.length
    }

    /// Extent along Y.
    pub fn width(&self) -> i64 {
        self.width
    }

    /// Extent along Z.
    pub fn height(&self) -> i64 {
        self.height
    }

    /// Ambient temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Configuration in use.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Read-only access to the spatial index.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Number of placed items.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Appends a placement rule to the chain.
    pub fn add_rule<R: Rule + 'static>(&mut self, rule: R) {
        self.rules.push(Arc::new(rule));
    }

    /// Removes the rule at `index`.
    pub fn remove_rule(&mut self, index: usize) -> Result<()> {
        let rule = self.rules.remove(index)?;
        log::debug!("removed rule '{}' from storage {}", rule.name(), self.number);
        Ok(())
    }

    /// Names of the registered rules, in order.
    pub fn rules(&self) -> Vec<&str> {
        self.rules.names()
    }

    /// The full-height column above the footprint of `volume`.
    pub fn column(&self, volume: &Volume) -> Volume {
        let (min, max) = (volume.min(), volume.max());
        Volume::from_bounds(
            Point::new(min.x, min.y, 0),
            Point::new(max.x, max.y, self.height),
        )
    }

    /// Checks whether `item` could be placed at `anchor` without committing.
    ///
    /// Returns the node the placement would be stored in.
    pub fn probe(&self, item: &Item, anchor: Point) -> Result<(NodeId, Volume)> {
        let in_range = anchor.is_non_negative()
            && anchor.x <= self.length
            && anchor.y <= self.width
            && anchor.z <= self.height
            && anchor.x.checked_add(item.length()).is_some()
            && anchor.y.checked_add(item.width()).is_some()
            && anchor.z.checked_add(item.height()).is_some();
        if !in_range {
            return Err(Error::InvalidCoordinate(format!(
                "({}, {}, {})",
                anchor.x, anchor.y, anchor.z
            )));
        }

        let volume = Volume::from_anchor(anchor, item.length(), item.width(), item.height());
        let node = self
            .index
            .search_insert(&volume)
            .ok_or_else(|| Error::NoValidPlacement(anchor.to_string()))?;
        self.rules.check(self, item, &volume)?;
        Ok((node, volume))
    }

    /// Places `item` with its anchor at `(x, y, z)` and returns its new id.
    pub fn add_item_at(&mut self, mut item: Item, x: i64, y: i64, z: i64) -> Result<String> {
        item.validate()?;
        let anchor = Point::new(x, y, z);
        let (node, volume) = self.probe(&item, anchor)?;

        item.set_id(anchor);
        let id = item.id();
        self.index.insert(node, volume, item)?;
        log::debug!("placed {} in storage {}", id, self.number);
        Ok(id)
    }

    /// Places `item` at the first free valid anchor found by the band scan.
    ///
    /// Returns `Ok(None)` when no anchor is available.
    pub fn add_item(&mut self, item: Item) -> Result<Option<String>> {
        item.validate()?;
        let anchor = AutoPlacer::new(self).find_anchor(&item)?;
        match anchor {
            Some(anchor) => self.add_item_at(item, anchor.x, anchor.y, anchor.z).map(Some),
            None => Ok(None),
        }
    }

    /// Returns a copy of the placement with the given id.
    pub fn find(&self, id: &str) -> Result<(Volume, Item)> {
        self.index
            .find(id)
            .map(|(volume, item)| (*volume, item.clone()))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Returns true if an item with this id is placed.
    pub fn contains(&self, id: &str) -> bool {
        self.index.find(id).is_some()
    }

    /// Ids of all placed items, in index traversal order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.len());
        let mut cursor = self.index.cursor();
        while let Some(node) = cursor.current() {
            ids.extend(node.records().iter().map(|(_, item)| item.id()));
            cursor.move_next();
        }
        ids
    }

    /// Copies of all placements, in index traversal order.
    pub fn items(&self) -> Vec<Record> {
        self.index.search_depth()
    }

    /// Returns true if nothing rests directly on the placement with this id.
    pub fn is_topmost(&self, id: &str) -> Result<bool> {
        let (volume, _) = self.find(id)?;
        Ok(self.topmost(&volume))
    }

    fn topmost(&self, volume: &Volume) -> bool {
        stability::is_topmost(volume, self.index.query(&self.column(volume)))
    }

    /// Moves a topmost item so that its anchor lands at `(x, y, z)`.
    ///
    /// On failure the item stays where it was.
    pub fn move_item(&mut self, id: &str, x: i64, y: i64, z: i64) -> Result<String> {
        let target = Point::new(x, y, z);
        if !target.is_non_negative() {
            return Err(Error::InvalidCoordinate(format!("({}, {}, {})", x, y, z)));
        }
        let (volume, _) = self.find(id)?;
        if !self.topmost(&volume) {
            return Err(Error::NotTopmost(id.to_string()));
        }

        let (volume, item) = self.take(id)?;
        match self.add_item_at(item.clone(), x, y, z) {
            Ok(new_id) => {
                log::debug!("moved {} to {}", id, new_id);
                Ok(new_id)
            }
            Err(err) => {
                log::warn!("move of {} to {} rolled back: {}", id, target, err);
                self.restore(volume, item)?;
                Err(err)
            }
        }
    }

    /// Re-orients a topmost, non-fragile item in place.
    ///
    /// On failure the original orientation is restored.
    pub fn rotate_item(&mut self, id: &str, orientation: Orientation) -> Result<String> {
        let (volume, item) = self.find(id)?;
        if item.is_fragile() {
            return Err(Error::FragileNotRotatable(id.to_string()));
        }
        if !self.topmost(&volume) {
            return Err(Error::NotTopmost(id.to_string()));
        }

        let (volume, item) = self.take(id)?;
        let anchor = volume.anchor();
        match self.add_item_at(item.reoriented(orientation), anchor.x, anchor.y, anchor.z) {
            Ok(new_id) => {
                log::debug!("rotated {} with orientation {}", new_id, orientation.index());
                Ok(new_id)
            }
            Err(err) => {
                log::warn!("rotation of {} rolled back: {}", id, err);
                self.restore(volume, item)?;
                Err(err)
            }
        }
    }

    /// Removes an item.
    ///
    /// Everything stacked above it is lifted off and re-placed bottom-up
    /// through auto-placement. Returns the new ids of the re-placed items.
    /// If any of them finds no slot, the storage is rolled back and
    /// [`Error::CascadeFailure`] is returned.
    pub fn remove_item(&mut self, id: &str) -> Result<Vec<String>> {
        let (volume, _) = self.find(id)?;
        let stacked = self.stacked_above(&volume);

        let target = self.take(id)?;
        if stacked.is_empty() {
            log::debug!("removed {} from storage {}", id, self.number);
            return Ok(Vec::new());
        }

        let mut displaced = Vec::with_capacity(stacked.len());
        for lifted in &stacked {
            displaced.push(self.take(&lifted.to_string())?);
        }
        displaced.sort_by_key(|(v, _)| (v.bottom(), v.anchor()));

        let mut placed = Vec::with_capacity(displaced.len());
        for (_, item) in &displaced {
            match self.add_item(item.clone()) {
                Ok(Some(new_id)) => placed.push(new_id),
                Ok(None) => {
                    log::warn!(
                        "cascade for {} rolled back: no slot for {}",
                        id,
                        item.id()
                    );
                    self.undo_cascade(&placed, &target, &displaced)?;
                    return Err(Error::CascadeFailure(id.to_string()));
                }
                Err(err) => {
                    log::warn!("cascade for {} rolled back: {}", id, err);
                    self.undo_cascade(&placed, &target, &displaced)?;
                    return Err(err);
                }
            }
        }

        log::debug!(
            "removed {} from storage {}, re-placed {} items",
            id,
            self.number,
            placed.len()
        );
        Ok(placed)
    }

    fn undo_cascade(&mut self, placed: &[String], target: &Record, displaced: &[Record]) -> Result<()> {
        for new_id in placed {
            self.take(new_id)?;
        }
        for (volume, item) in std::iter::once(target).chain(displaced) {
            self.restore(*volume, item.clone())?;
        }
        Ok(())
    }

    /// Anchors of every record resting on `volume`, directly or indirectly.
    fn stacked_above(&self, volume: &Volume) -> Vec<Point> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut frontier = vec![*volume];

        while let Some(current) = frontier.pop() {
            let column = self.column(&current);
            for (v, _) in stability::above(&current, self.index.query(&column)) {
                if seen.insert(v.anchor()) {
                    found.push(v.anchor());
                    frontier.push(*v);
                }
            }
        }
        found
    }

    fn take(&mut self, id: &str) -> Result<Record> {
        self.index
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Puts back a record that was just taken out.
    fn restore(&mut self, volume: Volume, item: Item) -> Result<()> {
        let node = self.index.search_insert(&volume).ok_or_else(|| {
            Error::Internal(format!("cannot restore {} at {}", item.id(), volume))
        })?;
        self.index.insert(node, volume, item)
    }

    /// Grows the storage to `length x width x height`, keeping every item
    /// at its coordinates.
    pub fn resize(&mut self, length: i64, width: i64, height: i64) -> Result<()> {
        if length < self.length || width < self.width || height < self.height {
            return Err(Error::ShrinkNotAllowed {
                from: format!("{}x{}x{}", self.length, self.width, self.height),
                to: format!("{}x{}x{}", length, width, height),
            });
        }

        let mut grown = Self::with_config(
            self.number,
            length,
            width,
            height,
            self.temperature,
            self.config.clone(),
        )?;
        grown.rules = self.rules.clone();

        let mut records = self.index.search_depth();
        records.sort_by_key(|(v, _)| (v.bottom(), v.anchor()));
        for (volume, item) in records {
            let anchor = volume.anchor();
            grown.add_item_at(item, anchor.x, anchor.y, anchor.z)?;
        }

        log::info!(
            "storage {} resized from {}x{}x{} to {}x{}x{}",
            self.number,
            self.length,
            self.width,
            self.height,
            length,
            width,
            height
        );
        *self = grown;
        Ok(())
    }

    /// Counts how many copies of `item` would fit in the current storage,
    /// using the best orientation. The storage is not modified.
    pub fn capacity_for(&self, item: &Item) -> Result<usize> {
        item.validate()?;
        let count = packer::capacity_for(self, item)?;
        log::info!(
            "storage {} holds {} more of {}x{}x{}",
            self.number,
            count,
            item.length(),
            item.width(),
            item.height()
        );
        Ok(count)
    }

    /// One line per item: `"<id> <length> x <width> x <height> <kind>"`.
    pub fn info(&self) -> String {
        if self.is_empty() {
            return "No containers on storage.".to_string();
        }
        self.index
            .records()
            .map(|(_, item)| {
                format!(
                    "{} {} x {} x {} {}",
                    item.id(),
                    item.length(),
                    item.width(),
                    item.height(),
                    item.kind()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Dimensions and temperature on one line.
    pub fn describe(&self) -> String {
        format!(
            "Length: {}, Width: {}, Height: {}, Temperature: {:.6}",
            self.length, self.width, self.height, self.temperature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> Storage {
        Storage::new(1, 100, 100, 100, 20.0).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_dimensions() {
        assert!(matches!(
            Storage::new(1, 0, 10, 10, 20.0),
            Err(Error::InvalidStorage(_))
        ));
        assert!(Storage::new(1, 10, 10, -1, 20.0).is_err());
        assert!(Storage::new(1, 10, 10, 10, f64::NAN).is_err());
        assert!(matches!(
            Storage::new(1, i64::MAX, 10, 10, 20.0),
            Err(Error::InvalidStorage(_))
        ));
        assert!(Storage::new(1, MAX_EXTENT, 10, 10, 20.0).is_ok());
    }

    #[test]
    fn test_huge_coordinates_are_invalid() {
        let mut storage = storage();
        let item = Item::new("A", 2, 2, 2, 1.0);

        for (x, y, z) in [(i64::MAX, 0, 0), (0, i64::MAX, 0), (0, 0, i64::MAX), (101, 0, 0)] {
            assert!(matches!(
                storage.add_item_at(item.clone(), x, y, z),
                Err(Error::InvalidCoordinate(_))
            ));
        }

        // Anchor in range, but the far corner overflows.
        let long = Item::new("Long", i64::MAX, 1, 1, 1.0);
        assert!(matches!(
            storage.add_item_at(long, 1, 0, 0),
            Err(Error::InvalidCoordinate(_))
        ));

        storage.add_item_at(item, 0, 0, 0).unwrap();
        assert!(matches!(
            storage.move_item("0_0_0", i64::MAX, 0, 0),
            Err(Error::InvalidCoordinate(_))
        ));
        assert!(storage.contains("0_0_0"));
    }

    #[test]
    fn test_add_item_at_stamps_id() {
        let mut storage = storage();
        let id = storage
            .add_item_at(Item::new("A", 2, 5, 2, 2.5), 80, 80, 0)
            .unwrap();
        assert_eq!(id, "80_80_0");

        let (volume, item) = storage.find(&id).unwrap();
        assert_eq!(volume.anchor(), Point::new(80, 80, 0));
        assert_eq!(item.id(), "80_80_0");
        assert!(storage.contains("80_80_0"));
        assert!(!storage.contains("0_0_0"));
    }

    #[test]
    fn test_add_item_at_errors() {
        let mut storage = storage();
        let item = Item::new("A", 2, 2, 2, 1.0);

        assert!(matches!(
            storage.add_item_at(item.clone(), -1, 0, 0),
            Err(Error::InvalidCoordinate(_))
        ));
        assert!(matches!(
            storage.add_item_at(Item::new("A", 0, 2, 2, 1.0), 0, 0, 0),
            Err(Error::InvalidItem(_))
        ));
        assert!(matches!(
            storage.add_item_at(item.clone(), 99, 0, 0),
            Err(Error::NoValidPlacement(_))
        ));

        storage.add_item_at(item.clone(), 0, 0, 0).unwrap();
        assert_eq!(
            storage.add_item_at(item, 2, 0, 0),
            Err(Error::NoValidPlacement("2_0_0".into()))
        );
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_rules_listing_and_removal() {
        let mut storage = storage();
        assert_eq!(storage.rules(), vec!["temperature", "support"]);

        storage.remove_rule(1).unwrap();
        // Floating placements are allowed without the support rule.
        storage
            .add_item_at(Item::new("A", 1, 1, 1, 1.0), 0, 0, 50)
            .unwrap();
        assert!(storage.remove_rule(5).is_err());
    }

    #[test]
    fn test_info_and_describe() {
        let mut storage = storage();
        assert_eq!(storage.info(), "No containers on storage.");
        assert_eq!(
            storage.describe(),
            "Length: 100, Width: 100, Height: 100, Temperature: 20.000000"
        );

        storage
            .add_item_at(Item::new("A", 2, 5, 2, 2.5).with_max_pressure(11.3), 0, 0, 0)
            .unwrap();
        assert_eq!(storage.info(), "0_0_0 2 x 5 x 2 Fragile");
    }

    #[test]
    fn test_ids_follow_traversal() {
        let mut storage = storage();
        for i in 0..6 {
            storage
                .add_item_at(Item::new("A", 5, 5, 5, 1.0), i * 15, 0, 0)
                .unwrap();
        }
        let ids = storage.ids();
        assert_eq!(ids.len(), 6);
        let listed: Vec<String> = storage.items().iter().map(|(_, i)| i.id()).collect();
        assert_eq!(ids, listed);
    }

    #[test]
    fn test_stacked_above_is_transitive() {
        let mut storage = storage();
        storage.remove_rule(1).unwrap();
        storage
            .add_item_at(Item::new("A", 4, 4, 2, 1.0), 0, 0, 0)
            .unwrap();
        storage
            .add_item_at(Item::new("B", 10, 4, 2, 1.0), 0, 0, 3)
            .unwrap();
        // Sits on the overhang of B, outside the footprint of A.
        storage
            .add_item_at(Item::new("C", 4, 4, 2, 1.0), 6, 0, 6)
            .unwrap();

        let (volume, _) = storage.find("0_0_0").unwrap();
        let mut above = storage.stacked_above(&volume);
        above.sort();
        assert_eq!(above, vec![Point::new(0, 0, 3), Point::new(6, 0, 6)]);
    }
}
