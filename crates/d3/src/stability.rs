//! Stacking analysis for placed volumes.
//!
//! Items rest on each other across a one-unit gap on the lattice: a volume
//! whose bottom is at `z` is carried by records whose top is at `z - 1`.
//!
//! # Support model
//!
//! A volume above the floor is supported when the centre of its footprint
//! lies over a directly-touching record, or when both midpoints of its
//! left and right edges (`(min_x, mid_y)` and `(max_x, mid_y)`) do, possibly
//! on different records.

use crate::spatial_index::Record;
use stowage_core::Volume;

/// Z of the floor.
pub const FLOOR_Z: i64 = 0;

/// Records under `volume` whose footprint overlaps it, nearest first.
pub fn beneath<'a, I>(volume: &Volume, records: I) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut below: Vec<&Record> = records
        .into_iter()
        .filter(|(v, _)| v.footprint_overlaps(volume) && v.top() < volume.bottom())
        .collect();
    below.sort_by(|a, b| b.0.top().cmp(&a.0.top()));
    below
}

/// Records over `volume` whose footprint overlaps it, nearest first.
pub fn above<'a, I>(volume: &Volume, records: I) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut over: Vec<&Record> = records
        .into_iter()
        .filter(|(v, _)| v.footprint_overlaps(volume) && v.bottom() > volume.top())
        .collect();
    over.sort_by_key(|(v, _)| v.bottom());
    over
}

/// Returns true if nothing rests directly on `volume`.
pub fn is_topmost<'a, I>(volume: &Volume, records: I) -> bool
where
    I: IntoIterator<Item = &'a Record>,
{
    !records
        .into_iter()
        .any(|(v, _)| v.footprint_overlaps(volume) && v.bottom() == volume.top() + 1)
}

/// Checks whether `volume` stands on the floor or on the records beneath it.
///
/// `beneath` must be sorted nearest first, as returned by [`beneath`]. The
/// walk stops at the first record that does not touch the volume.
pub fn check_support(volume: &Volume, beneath: &[&Record]) -> bool {
    if volume.bottom() == FLOOR_Z {
        return true;
    }

    let min = volume.min();
    let max = volume.max();
    let mid_x = min.x + (max.x - min.x) / 2;
    let mid_y = min.y + (max.y - min.y) / 2;

    let mut left = false;
    let mut right = false;
    for (support, _) in beneath
        .iter()
        .take_while(|(v, _)| v.top() == volume.bottom() - 1)
    {
        if support.footprint_contains(mid_x, mid_y) {
            return true;
        }
        left |= support.footprint_contains(min.x, mid_y);
        right |= support.footprint_contains(max.x, mid_y);
    }
    left && right
}

/// Total mass resting on `volume`.
pub fn resting_load<'a, I>(volume: &Volume, records: I) -> f64
where
    I: IntoIterator<Item = &'a Record>,
{
    above(volume, records)
        .iter()
        .map(|(_, item)| item.mass())
        .sum()
}
