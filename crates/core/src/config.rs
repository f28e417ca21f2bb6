//! Storage configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning knobs for a storage engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StorageConfig {
    /// Number of records a leaf holds before it splits.
    pub leaf_capacity: usize,

    /// Smallest extent any axis of a child node may have.
    pub min_node_size: i64,

    /// Width of the Y band scanned by each auto-placement worker.
    pub band_width: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 4,
            min_node_size: 1,
            band_width: 20,
        }
    }
}

impl StorageConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the leaf capacity (at least 1).
    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = capacity.max(1);
        self
    }

    /// Sets the minimum node extent (at least 1).
    pub fn with_min_node_size(mut self, size: i64) -> Self {
        self.min_node_size = size.max(1);
        self
    }

    /// Sets the auto-placement band width (at least 1).
    pub fn with_band_width(mut self, width: i64) -> Self {
        self.band_width = width.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::new();
        assert_eq!(config.leaf_capacity, 4);
        assert_eq!(config.min_node_size, 1);
        assert_eq!(config.band_width, 20);
    }

    #[test]
    fn test_builder_clamps() {
        let config = StorageConfig::new()
            .with_leaf_capacity(0)
            .with_min_node_size(-3)
            .with_band_width(0);
        assert_eq!(config.leaf_capacity, 1);
        assert_eq!(config.min_node_size, 1);
        assert_eq!(config.band_width, 1);
    }
}
