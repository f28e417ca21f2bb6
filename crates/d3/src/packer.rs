//! Parallel search for free anchors.
//!
//! The Y range of feasible anchors is cut into bands of
//! [`StorageConfig::band_width`](stowage_core::StorageConfig) rows and every
//! band is scanned by its own scoped thread in `y → x → z` order. Workers
//! only read the storage. The first worker to find a valid point claims it
//! through a shared flag; the others stop as soon as they see the flag set.
//! Which band wins a race is not specified. A worker that panics fails the
//! whole search with [`Error::Internal`].

use crate::storage::Storage;
use std::any::Any;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ScopedJoinHandle;
use stowage_core::{Error, Item, Orientation, Point, Result};

/// Scans a storage for the first free, valid anchor of an item.
#[derive(Debug, Clone, Copy)]
pub struct AutoPlacer<'a> {
    storage: &'a Storage,
    band_width: i64,
}

impl<'a> AutoPlacer<'a> {
    /// Creates a placer using the storage's configured band width.
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            band_width: storage.config().band_width.max(1),
        }
    }

    /// Y bands scanned for `item`, empty if the item cannot fit at all.
    pub fn bands(&self, item: &Item) -> Vec<RangeInclusive<i64>> {
        let y_max = self.storage.width() - item.width();
        if y_max < 0 {
            return Vec::new();
        }
        (0..=y_max)
            .step_by(self.band_width as usize)
            .map(|start| start..=(start + self.band_width - 1).min(y_max))
            .collect()
    }

    /// Finds an anchor where `item` would pass placement, without committing.
    pub fn find_anchor(&self, item: &Item) -> Result<Option<Point>> {
        let bands = self.bands(item);
        if bands.is_empty() {
            return Ok(None);
        }

        let claimed = AtomicBool::new(false);
        let results: Vec<Option<Point>> = std::thread::scope(|s| {
            let handles: Vec<_> = bands
                .into_iter()
                .map(|band| {
                    let claimed = &claimed;
                    s.spawn(move || self.scan_band(item, band, claimed))
                })
                .collect();
            // The scope panics on any panicked worker left unjoined.
            let joined: Vec<_> = handles.into_iter().map(join).collect();
            joined.into_iter().collect::<Result<_>>()
        })?;

        Ok(results.into_iter().flatten().next())
    }

    fn scan_band(
        &self,
        item: &Item,
        band: RangeInclusive<i64>,
        claimed: &AtomicBool,
    ) -> Option<Point> {
        let x_max = self.storage.length() - item.length();
        let z_max = self.storage.height() - item.height();

        for y in band {
            for x in 0..=x_max {
                for z in 0..=z_max {
                    if claimed.load(Ordering::Acquire) {
                        return None;
                    }
                    let anchor = Point::new(x, y, z);
                    if self.storage.probe(item, anchor).is_err() {
                        continue;
                    }
                    return claimed
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .ok()
                        .map(|_| anchor);
                }
            }
        }
        None
    }
}

/// Counts how many copies of `item` fit, trying every orientation.
///
/// Each orientation runs on its own scoped thread against a private clone
/// of the storage. Returns the best count.
pub fn capacity_for(storage: &Storage, item: &Item) -> Result<usize> {
    std::thread::scope(|s| {
        let handles: Vec<_> = Orientation::ALL
            .into_iter()
            .map(|orientation| {
                let oriented = item.reoriented(orientation);
                s.spawn(move || fill(storage.clone(), &oriented))
            })
            .collect();
        let joined: Vec<_> = handles.into_iter().map(join).collect();
        let mut best = 0;
        for count in joined {
            best = best.max(count??);
        }
        Ok(best)
    })
}

fn fill(mut storage: Storage, item: &Item) -> Result<usize> {
    let mut count = 0;
    while storage.add_item(item.clone())?.is_some() {
        count += 1;
    }
    Ok(count)
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> Result<T> {
    handle.join().map_err(|payload| {
        Error::Internal(format!(
            "placement worker panicked: {}",
            panic_message(&*payload)
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
