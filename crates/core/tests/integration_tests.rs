//! Integration tests for stowage-core.

use stowage_core::{Error, Item, ItemKind, Orientation, Point, StorageConfig, Volume};

mod geometry_tests {
    use super::*;

    #[test]
    fn test_item_volume_matches_dimensions() {
        let item = Item::new("A", 7, 4, 3, 1.0);
        let v = Volume::from_anchor(Point::new(2, 3, 4), item.length(), item.width(), item.height());

        assert_eq!(v.min(), Point::new(2, 3, 4));
        assert_eq!(v.max(), Point::new(9, 7, 7));
        assert_eq!((v.length(), v.width(), v.height()), (7, 4, 3));
    }

    #[test]
    fn test_resting_volumes_do_not_intersect() {
        let lower = Volume::from_anchor(Point::new(0, 0, 0), 2, 5, 2);
        let upper = Volume::from_anchor(Point::new(0, 0, lower.top() + 1), 1, 4, 1);
        let sunk = Volume::from_anchor(Point::new(0, 0, lower.top()), 1, 4, 1);

        assert!(!lower.intersects(&upper));
        assert!(lower.intersects(&sunk));
        assert!(lower.footprint_overlaps(&upper));
    }

    #[test]
    fn test_octants_nest_recursively() {
        let root = Volume::from_bounds(Point::new(0, 0, 0), Point::new(100, 100, 100));
        for octant in root.octants() {
            assert!(root.contains(&octant));
            for inner in octant.octants() {
                assert!(octant.contains(&inner));
            }
        }
    }

    #[test]
    fn test_ids_sort_like_points() {
        let mut points = vec![
            Point::new(10, 0, 0),
            Point::new(0, 10, 0),
            Point::new(0, 0, 10),
        ];
        points.sort();
        let ids: Vec<String> = points.iter().map(Point::to_string).collect();
        assert_eq!(ids, vec!["0_0_10", "0_10_0", "10_0_0"]);
    }
}

mod item_tests {
    use super::*;

    #[test]
    fn test_double_rotation_returns_to_start() {
        let item = Item::new("A", 7, 4, 3, 1.0);
        let once = item.reoriented(Orientation::Wlh);
        let twice = once.reoriented(Orientation::Wlh);
        assert_eq!(twice.dimensions(), item.dimensions());
    }

    #[test]
    fn test_every_orientation_keeps_volume() {
        let item = Item::new("A", 2, 3, 5, 1.0);
        for o in Orientation::ALL {
            let r = item.reoriented(o);
            assert_eq!(r.length() * r.width() * r.height(), 30);
        }
    }

    #[test]
    fn test_invalid_orientation_index() {
        let err = Orientation::try_from(9).unwrap_err();
        assert_eq!(err, Error::InvalidOrientation(9));
        assert_eq!(err.to_string(), "Invalid orientation index: 9");
    }

    #[test]
    fn test_capabilities_drive_kind() {
        let item = Item::new("Cargo B", 2, 5, 2, 2.5)
            .with_cost(23.5)
            .with_max_pressure(11.3)
            .with_max_temperature(13.1);
        assert!(item.is_fragile());
        assert!(item.is_refrigerated());
        assert_eq!(item.kind(), ItemKind::FragileRefrigerated);
        assert_eq!(item.capabilities().max_pressure, Some(11.3));
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_builder_chain() {
        let config = StorageConfig::new()
            .with_leaf_capacity(8)
            .with_min_node_size(2)
            .with_band_width(5);
        assert_eq!(config.leaf_capacity, 8);
        assert_eq!(config.min_node_size, 2);
        assert_eq!(config.band_width, 5);
        assert_ne!(config, StorageConfig::default());
    }
}
