//! Octree spatial index over lattice volumes.
//!
//! Every record is a `(Volume, Item)` pair stored at the deepest node whose
//! box fully contains it. Children split each axis `[min, max]` of their
//! parent into `[min, mid]` and `[mid + 1, max]`, so siblings never share a
//! lattice point and a record can only collide with records stored on its
//! own root-to-node path or below it.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. A leaf splits
//! once it holds more than `leaf_capacity` records; after a removal any
//! internal node whose subtree holds at most `leaf_capacity` records folds
//! its descendants back into itself.

use crate::cursor::{NodeCursor, Nodes};
use std::fmt::Write as _;
use stowage_core::{Error, Item, Point, Result, Volume};

/// Handle to a node in the index arena.
///
/// Ids are only meaningful for the index that produced them and are
/// invalidated by the next mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena slot.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A stored placement.
pub type Record = (Volume, Item);

/// A node of the octree.
#[derive(Debug, Clone)]
pub struct Node {
    bounds: Volume,
    records: Vec<Record>,
    children: Option<[NodeId; 8]>,
    parent: Option<NodeId>,
    depth: usize,
}

impl Node {
    fn new(bounds: Volume, parent: Option<NodeId>, depth: usize) -> Self {
        Self {
            bounds,
            records: Vec::new(),
            children: None,
            parent,
            depth,
        }
    }

    /// Box covered by this node.
    pub fn bounds(&self) -> &Volume {
        &self.bounds
    }

    /// Records stored directly in this node.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The eight children, if the node has been split.
    pub fn children(&self) -> Option<&[NodeId; 8]> {
        self.children.as_ref()
    }

    /// Parent link, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Outcome of the anchor search below one node.
enum Search {
    Found(NodeId),
    Outside,
    Collision,
}

/// Octree of placed volumes.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
    leaf_capacity: usize,
    min_node_size: i64,
    len: usize,
}

impl SpatialIndex {
    /// Creates an empty index covering `bounds`.
    ///
    /// `min_node_size` is the smallest number of lattice points a child may
    /// span on any axis; splits that would go below it are refused.
    pub fn new(bounds: Volume, leaf_capacity: usize, min_node_size: i64) -> Self {
        Self {
            nodes: vec![Node::new(bounds, None, 0)],
            free: Vec::new(),
            root: NodeId(0),
            leaf_capacity: leaf_capacity.max(1),
            min_node_size: min_node_size.max(1),
            len: 0,
        }
    }

    /// Box covered by the whole index.
    pub fn bounds(&self) -> &Volume {
        &self.nodes[self.root.0].bounds
    }

    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this index.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Leaf capacity before a split.
    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// Minimum lattice span of a child node.
    pub fn min_node_size(&self) -> i64 {
        self.min_node_size
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Depth of the deepest live node (the root alone is depth 0).
    pub fn depth(&self) -> usize {
        self.nodes().map(Node::depth).max().unwrap_or(0)
    }

    /// Finds the node a candidate volume should be stored in.
    ///
    /// Returns the deepest node that fully contains `volume` when the volume
    /// overlaps no stored record, `None` otherwise.
    pub fn search_insert(&self, volume: &Volume) -> Option<NodeId> {
        let mut collisions = Vec::new();
        match self.search_node(self.root, volume, &mut collisions) {
            Search::Found(id) => Some(id),
            Search::Outside | Search::Collision => None,
        }
    }

    fn search_node<'a>(
        &'a self,
        id: NodeId,
        volume: &Volume,
        collisions: &mut Vec<&'a Volume>,
    ) -> Search {
        let node = &self.nodes[id.0];
        if !node.bounds.contains(volume) {
            return Search::Outside;
        }

        collisions.extend(node.records.iter().map(|(v, _)| v));

        if let Some(children) = node.children {
            for child in children {
                match self.search_node(child, volume, collisions) {
                    Search::Outside => {}
                    decided => return decided,
                }
            }
            // Spans several children: everything below can collide.
            for child in children {
                self.collect_volumes(child, collisions);
            }
        }

        if collisions.iter().any(|v| v.intersects(volume)) {
            Search::Collision
        } else {
            Search::Found(id)
        }
    }

    fn collect_volumes<'a>(&'a self, id: NodeId, out: &mut Vec<&'a Volume>) {
        let node = &self.nodes[id.0];
        out.extend(node.records.iter().map(|(v, _)| v));
        if let Some(children) = node.children {
            for child in children {
                self.collect_volumes(child, out);
            }
        }
    }

    /// Stores a record in `node`, splitting it if it overflows.
    ///
    /// The caller obtains `node` from [`search_insert`](Self::search_insert);
    /// overlap is not re-checked here.
    pub fn insert(&mut self, node: NodeId, volume: Volume, item: Item) -> Result<()> {
        let target = self
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| Error::Internal(format!("unknown node {}", node.0)))?;
        if !target.bounds.contains(&volume) {
            return Err(Error::Internal(format!(
                "volume {} lies outside node {}",
                volume, target.bounds
            )));
        }

        target.records.push((volume, item));
        self.len += 1;

        let overflowing = target.is_leaf() && target.records.len() > self.leaf_capacity;
        if overflowing {
            self.split(node);
        }
        Ok(())
    }

    fn split(&mut self, id: NodeId) {
        let (bounds, depth) = {
            let node = &self.nodes[id.0];
            (node.bounds, node.depth)
        };

        if bounds.length() < 1 || bounds.width() < 1 || bounds.height() < 1 {
            log::debug!("split of node {} refused: node is flat", bounds);
            return;
        }
        let octants = bounds.octants();
        let too_small = octants.iter().any(|o| {
            o.length() + 1 < self.min_node_size
                || o.width() + 1 < self.min_node_size
                || o.height() + 1 < self.min_node_size
        });
        if too_small {
            log::debug!("split of node {} refused: octants below minimum size", bounds);
            return;
        }

        let children: [NodeId; 8] =
            std::array::from_fn(|i| self.alloc(Node::new(octants[i], Some(id), depth + 1)));

        let records = std::mem::take(&mut self.nodes[id.0].records);
        let mut kept = Vec::new();
        for (volume, item) in records {
            match children
                .iter()
                .find(|c| self.nodes[c.0].bounds.contains(&volume))
            {
                Some(child) => self.nodes[child.0].records.push((volume, item)),
                None => kept.push((volume, item)),
            }
        }

        let node = &mut self.nodes[id.0];
        node.records = kept;
        node.children = Some(children);
        log::debug!(
            "split node {} at depth {}, {} records stay at parent",
            bounds,
            depth,
            node.records.len()
        );

        for child in children {
            if self.nodes[child.0].records.len() > self.leaf_capacity {
                self.split(child);
            }
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Returns the record whose anchor matches the `"x_y_z"` id.
    pub fn find(&self, id: &str) -> Option<(&Volume, &Item)> {
        let point = Point::parse_id(id)?;
        let node = self.locate_point(self.root, &point)?;
        self.nodes[node.0]
            .records
            .iter()
            .find(|(v, _)| v.anchor() == point)
            .map(|(v, item)| (v, item))
    }

    /// Returns the node holding the record with the given id.
    pub fn locate(&self, id: &str) -> Option<NodeId> {
        let point = Point::parse_id(id)?;
        self.locate_point(self.root, &point)
    }

    fn locate_point(&self, id: NodeId, point: &Point) -> Option<NodeId> {
        let node = &self.nodes[id.0];
        if !node.bounds.contains_point(point) {
            return None;
        }
        if node.records.iter().any(|(v, _)| v.anchor() == *point) {
            return Some(id);
        }
        node.children?
            .into_iter()
            .find_map(|child| self.locate_point(child, point))
    }

    /// Removes the record with the given id and rebalances the tree.
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        let point = Point::parse_id(id)?;
        let node = self.locate_point(self.root, &point)?;
        let records = &mut self.nodes[node.0].records;
        let pos = records.iter().position(|(v, _)| v.anchor() == point)?;
        let record = records.remove(pos);
        self.len -= 1;

        self.rebalance(node);
        Some(record)
    }

    /// Walks from `from` to the root, merging every internal node whose
    /// subtree fits in one leaf.
    fn rebalance(&mut self, from: NodeId) {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(children) = self.nodes[id.0].children {
                let below: usize = children.iter().map(|&c| self.subtree_len(c)).sum();
                if self.nodes[id.0].records.len() + below <= self.leaf_capacity {
                    self.merge(id, children);
                }
            }
            current = self.nodes[id.0].parent;
        }
    }

    fn merge(&mut self, id: NodeId, children: [NodeId; 8]) {
        let mut folded = Vec::new();
        for child in children {
            self.release(child, &mut folded);
        }
        log::debug!(
            "merged {} records into node {}",
            folded.len(),
            self.nodes[id.0].bounds
        );
        let node = &mut self.nodes[id.0];
        node.records.append(&mut folded);
        node.children = None;
    }

    /// Frees a subtree, moving its records into `out` in pre-order.
    fn release(&mut self, id: NodeId, out: &mut Vec<Record>) {
        let node = &mut self.nodes[id.0];
        out.append(&mut node.records);
        let children = node.children.take();
        node.parent = None;
        self.free.push(id);
        if let Some(children) = children {
            for child in children {
                self.release(child, out);
            }
        }
    }

    fn subtree_len(&self, id: NodeId) -> usize {
        let node = &self.nodes[id.0];
        let below: usize = node
            .children
            .map(|cs| cs.iter().map(|&c| self.subtree_len(c)).sum())
            .unwrap_or(0);
        node.records.len() + below
    }

    /// Finds all records whose volumes intersect `region`.
    pub fn query(&self, region: &Volume) -> Vec<&Record> {
        let mut out = Vec::new();
        self.query_node(self.root, region, &mut out);
        out
    }

    fn query_node<'a>(&'a self, id: NodeId, region: &Volume, out: &mut Vec<&'a Record>) {
        let node = &self.nodes[id.0];
        if !node.bounds.intersects(region) {
            return;
        }
        out.extend(node.records.iter().filter(|(v, _)| v.intersects(region)));
        if let Some(children) = node.children {
            for child in children {
                self.query_node(child, region, out);
            }
        }
    }

    /// Clones every record, in pre-order.
    pub fn search_depth(&self) -> Vec<Record> {
        self.records().cloned().collect()
    }

    /// Iterates over every record, in pre-order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.nodes().flat_map(|n| n.records.iter())
    }

    /// Bidirectional cursor positioned at the root.
    pub fn cursor(&self) -> NodeCursor<'_> {
        NodeCursor::new(self)
    }

    /// Iterates over live nodes in pre-order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes::new(self.cursor())
    }

    /// Renders the tree, one line per node, indented by depth.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for node in self.nodes() {
            let _ = writeln!(
                out,
                "{}Node at depth {}: {} [{} records]",
                "-".repeat(node.depth),
                node.depth,
                node.bounds,
                node.records.len()
            );
        }
        out
    }

    /// Verifies structural invariants.
    ///
    /// Checks that every record lies in its node, that no two records
    /// overlap, that every internal node has eight live children linked back
    /// to it, and that the record count is consistent.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = 0;
        for (pos, node) in self.nodes().enumerate() {
            if pos == 0 && node.parent.is_some() {
                return Err(Error::Internal("root has a parent".into()));
            }
            for (volume, _) in &node.records {
                if !node.bounds.contains(volume) {
                    return Err(Error::Internal(format!(
                        "record {} outside node {}",
                        volume, node.bounds
                    )));
                }
            }
            seen += node.records.len();

            if let Some(children) = node.children {
                for child in children {
                    let c = self
                        .nodes
                        .get(child.0)
                        .ok_or_else(|| Error::Internal(format!("dangling child {}", child.0)))?;
                    if self.free.contains(&child) {
                        return Err(Error::Internal(format!("freed child {}", child.0)));
                    }
                    if !node.bounds.contains(&c.bounds) || c.depth != node.depth + 1 {
                        return Err(Error::Internal(format!(
                            "child {} does not nest in {}",
                            c.bounds, node.bounds
                        )));
                    }
                    let back = c.parent.map(|p| &self.nodes[p.0].bounds);
                    if back != Some(&node.bounds) {
                        return Err(Error::Internal(format!(
                            "child {} has a broken parent link",
                            c.bounds
                        )));
                    }
                }
            }
        }

        if seen != self.len {
            return Err(Error::Internal(format!(
                "counted {} records, expected {}",
                seen, self.len
            )));
        }

        let all: Vec<&Volume> = self.records().map(|(v, _)| v).collect();
        for (i, a) in all.iter().enumerate() {
            if let Some(b) = all[i + 1..].iter().find(|b| a.intersects(b)) {
                return Err(Error::Internal(format!("{} overlaps {}", a, b)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(l: i64, w: i64, h: i64) -> SpatialIndex {
        let bounds = Volume::from_bounds(Point::new(0, 0, 0), Point::new(l, w, h));
        SpatialIndex::new(bounds, 4, 1)
    }

    fn place(index: &mut SpatialIndex, x: i64, y: i64, z: i64, dims: (i64, i64, i64)) -> bool {
        let anchor = Point::new(x, y, z);
        let volume = Volume::from_anchor(anchor, dims.0, dims.1, dims.2);
        match index.search_insert(&volume) {
            Some(node) => {
                let mut item = Item::new("test", dims.0, dims.1, dims.2, 1.0);
                item.set_id(anchor);
                index.insert(node, volume, item).unwrap();
                true
            }
            None => false,
        }
    }

    #[test]
    fn test_empty_index() {
        let index = index(100, 100, 100);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert_eq!(index.node_count(), 1);
        assert_eq!(index.depth(), 0);
        assert!(index.search_depth().is_empty());
        assert!(index.find("0_0_0").is_none());
    }

    #[test]
    fn test_search_rejects_outside_and_overlap() {
        let mut index = index(10, 10, 10);
        assert!(place(&mut index, 0, 0, 0, (2, 2, 2)));

        // Shares the x = 2 plane with the first record.
        assert!(!place(&mut index, 2, 0, 0, (2, 2, 2)));
        assert!(place(&mut index, 3, 0, 0, (2, 2, 2)));
        // Sticks out of the bounds.
        assert!(!place(&mut index, 9, 0, 0, (2, 2, 2)));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_split_on_overflow() {
        let mut index = index(100, 100, 100);
        for i in 0..5 {
            assert!(place(&mut index, i * 20, 0, 0, (5, 5, 5)));
        }

        assert_eq!(index.node_count(), 9);
        assert_eq!(index.depth(), 1);
        let root = index.node(index.root());
        assert!(!root.is_leaf());
        assert!(root.records().is_empty());
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_spanning_records_stay_at_parent() {
        let mut index = index(100, 100, 100);
        // Crosses the x midplane at 50.
        assert!(place(&mut index, 45, 0, 0, (10, 10, 10)));
        for i in 0..4 {
            assert!(place(&mut index, i * 10, 20, 0, (5, 5, 5)));
        }

        let root = index.node(index.root());
        assert_eq!(root.records().len(), 1);
        assert_eq!(root.records()[0].0.anchor(), Point::new(45, 0, 0));
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_overlap_detected_across_nodes() {
        let mut index = index(100, 100, 100);
        for i in 0..5 {
            assert!(place(&mut index, i * 20, 0, 0, (5, 5, 5)));
        }
        // Spans octants and touches a record stored in a child.
        assert!(!place(&mut index, 40, 0, 0, (20, 2, 2)));
        // Deep candidate next to a child record.
        assert!(!place(&mut index, 3, 3, 3, (1, 1, 1)));
        assert!(place(&mut index, 6, 0, 0, (1, 1, 1)));
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_split_refused_below_min_size() {
        // z spans 0..=1: octants along z would be one lattice point thick.
        let bounds = Volume::from_bounds(Point::new(0, 0, 0), Point::new(10, 5, 1));
        let mut index = SpatialIndex::new(bounds, 4, 2);
        for x in 0..5 {
            assert!(place(&mut index, x * 2, 0, 0, (1, 1, 1)));
        }
        assert_eq!(index.node_count(), 1);
        assert_eq!(index.node(index.root()).records().len(), 5);
    }

    #[test]
    fn test_query_region() {
        let mut index = index(100, 100, 100);
        for i in 0..6 {
            assert!(place(&mut index, i * 15, 0, 0, (5, 5, 5)));
        }

        let column = Volume::from_bounds(Point::new(14, 0, 0), Point::new(31, 2, 100));
        let mut hits: Vec<i64> = index.query(&column).iter().map(|(v, _)| v.min().x).collect();
        hits.sort();
        assert_eq!(hits, vec![15, 30]);

        let empty = Volume::from_bounds(Point::new(0, 50, 0), Point::new(100, 100, 100));
        assert!(index.query(&empty).is_empty());
    }

    #[test]
    fn test_find_and_locate() {
        let mut index = index(100, 100, 100);
        for i in 0..6 {
            assert!(place(&mut index, i * 10, 5, 0, (5, 5, 5)));
        }

        let (volume, item) = index.find("30_5_0").unwrap();
        assert_eq!(volume.anchor(), Point::new(30, 5, 0));
        assert_eq!(item.id(), "30_5_0");

        let node = index.locate("30_5_0").unwrap();
        assert!(index.node(node).bounds().contains(volume));

        assert!(index.find("31_5_0").is_none());
        assert!(index.find("garbage").is_none());
        assert!(index.locate("500_0_0").is_none());
    }

    #[test]
    fn test_remove_merges_and_collapses() {
        let mut index = index(100, 100, 100);
        for i in 0..5 {
            assert!(place(&mut index, i * 20, 0, 0, (5, 5, 5)));
        }
        assert_eq!(index.node_count(), 9);

        let (volume, item) = index.remove("40_0_0").unwrap();
        assert_eq!(volume.anchor(), Point::new(40, 0, 0));
        assert_eq!(item.id(), "40_0_0");

        assert_eq!(index.len(), 4);
        assert_eq!(index.node_count(), 1);
        assert_eq!(index.node(index.root()).records().len(), 4);
        index.check_invariants().unwrap();

        assert!(index.remove("40_0_0").is_none());
        assert!(index.remove("nope").is_none());
    }

    #[test]
    fn test_merge_folds_records_under_capacity() {
        let mut index = index(100, 100, 100);
        for i in 0..6 {
            assert!(place(&mut index, i * 15, 0, 0, (5, 5, 5)));
        }
        assert_eq!(index.node_count(), 9);

        // Five records left: still more than one leaf holds.
        index.remove("75_0_0").unwrap();
        assert_eq!(index.node_count(), 9);
        assert!(index.node(index.root()).records().is_empty());

        // Four records left in non-empty children: they fold into the root.
        index.remove("60_0_0").unwrap();
        assert_eq!(index.node_count(), 1);
        let mut anchors: Vec<i64> = index
            .node(index.root())
            .records()
            .iter()
            .map(|(v, _)| v.min().x)
            .collect();
        anchors.sort();
        assert_eq!(anchors, vec![0, 15, 30, 45]);
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_arena_reuses_freed_nodes() {
        let mut index = index(100, 100, 100);
        for i in 0..5 {
            assert!(place(&mut index, i * 20, 0, 0, (5, 5, 5)));
        }
        index.remove("0_0_0").unwrap();
        assert!(place(&mut index, 0, 0, 0, (5, 5, 5)));

        assert_eq!(index.node_count(), 9);
        assert_eq!(index.nodes.len(), 9);
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_search_depth_enumerates_all() {
        let mut index = index(100, 100, 100);
        let mut expected = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                assert!(place(&mut index, x * 20, y * 20, 0, (10, 10, 10)));
                expected.push(Point::new(x * 20, y * 20, 0));
            }
        }

        let mut anchors: Vec<Point> = index
            .search_depth()
            .iter()
            .map(|(v, _)| v.anchor())
            .collect();
        anchors.sort();
        assert_eq!(anchors, expected);
        assert!(index.depth() >= 1);
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_describe_indents_by_depth() {
        let mut index = index(100, 100, 100);
        for i in 0..5 {
            assert!(place(&mut index, i * 20, 0, 0, (5, 5, 5)));
        }

        let text = index.describe();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("Node at depth 0: (0, 0, 0) to (100, 100, 100)"));
        assert!(lines[1].starts_with("-Node at depth 1: (0, 0, 0) to (50, 50, 50)"));
    }
}
