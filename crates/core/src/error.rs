//! Error types for Stowage.

use thiserror::Error;

/// Result type alias for Stowage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during placement operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Negative or out-of-range coordinate.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Invalid item provided.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Invalid storage dimensions.
    #[error("Invalid storage: {0}")]
    InvalidStorage(String),

    /// Orientation index outside of 0..=5.
    #[error("Invalid orientation index: {0}")]
    InvalidOrientation(u8),

    /// No collision-free anchor exists for the requested volume.
    #[error("No valid placement at {0}")]
    NoValidPlacement(String),

    /// The item would float: nothing beneath carries it.
    #[error("Support missing under {0}")]
    SupportMissing(String),

    /// A fragile item beneath would carry more than its rated pressure.
    #[error("Item {id} would carry {load:.3}, limit is {limit:.3}")]
    OverPressure {
        /// Id of the overloaded fragile item.
        id: String,
        /// Load it would carry after the placement.
        load: f64,
        /// Rated maximum pressure.
        limit: f64,
    },

    /// Ambient temperature exceeds the item's rated maximum.
    #[error("Ambient temperature {ambient:.3} exceeds item limit {limit:.3}")]
    OverTemperature {
        /// Ambient storage temperature.
        ambient: f64,
        /// Rated maximum temperature.
        limit: f64,
    },

    /// Something rests on top of the item.
    #[error("Item {0} is not topmost")]
    NotTopmost(String),

    /// Fragile items keep their orientation.
    #[error("Fragile item {0} cannot be rotated")]
    FragileNotRotatable(String),

    /// Unknown item id.
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Resize requested a smaller volume.
    #[error("Cannot shrink storage from {from} to {to}")]
    ShrinkNotAllowed {
        /// Current dimensions as `LxWxH`.
        from: String,
        /// Requested dimensions as `LxWxH`.
        to: String,
    },

    /// Displaced items could not be re-placed after a removal.
    #[error("No space found to re-place items displaced by removing {0}")]
    CascadeFailure(String),

    /// A caller-registered rule rejected the placement.
    #[error("Rule violation: {0}")]
    RuleViolation(String),

    /// Rule index passed to removal is out of range.
    #[error("Rule index {index} out of range (len {len})")]
    RuleIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of registered rules.
        len: usize,
    },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for failures raised by the validation chain.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SupportMissing(_)
                | Self::OverPressure { .. }
                | Self::OverTemperature { .. }
                | Self::RuleViolation(_)
        )
    }
}
