//! Pre-order traversal over the nodes of a [`SpatialIndex`].
//!
//! [`NodeCursor`] walks both ways. Past either end it rests on a "ghost"
//! position where [`current`](NodeCursor::current) is `None`; moving forward
//! from the ghost returns to the root, moving backward reaches the last node.

use crate::spatial_index::{Node, NodeId, SpatialIndex};

/// Bidirectional pre-order cursor over index nodes.
#[derive(Debug, Clone)]
pub struct NodeCursor<'a> {
    index: &'a SpatialIndex,
    current: Option<NodeId>,
}

impl<'a> NodeCursor<'a> {
    /// Creates a cursor positioned at the root.
    pub fn new(index: &'a SpatialIndex) -> Self {
        Self {
            index,
            current: Some(index.root()),
        }
    }

    /// Node under the cursor, `None` on the ghost position.
    pub fn current(&self) -> Option<&'a Node> {
        self.current.map(|id| self.index.node(id))
    }

    /// Id of the node under the cursor.
    pub fn current_id(&self) -> Option<NodeId> {
        self.current
    }

    /// Advances to the next node in pre-order.
    pub fn move_next(&mut self) {
        self.current = match self.current {
            None => Some(self.index.root()),
            Some(id) => self.successor(id),
        };
    }

    /// Steps back to the previous node in pre-order.
    pub fn move_prev(&mut self) {
        self.current = match self.current {
            None => Some(self.last_descendant(self.index.root())),
            Some(id) => self.predecessor(id),
        };
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(children) = self.index.node(id).children() {
            return Some(children[0]);
        }
        let mut node = id;
        while let Some(parent) = self.index.node(node).parent() {
            let slot = self.slot(parent, node)?;
            if slot < 7 {
                return self.index.node(parent).children().map(|cs| cs[slot + 1]);
            }
            node = parent;
        }
        None
    }

    fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.index.node(id).parent()?;
        match self.slot(parent, id)? {
            0 => Some(parent),
            slot => {
                let sibling = self.index.node(parent).children()?[slot - 1];
                Some(self.last_descendant(sibling))
            }
        }
    }

    fn last_descendant(&self, mut id: NodeId) -> NodeId {
        while let Some(children) = self.index.node(id).children() {
            id = children[7];
        }
        id
    }

    fn slot(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.index
            .node(parent)
            .children()?
            .iter()
            .position(|&c| c == child)
    }
}

/// Forward pre-order iterator over index nodes.
#[derive(Debug, Clone)]
pub struct Nodes<'a> {
    cursor: NodeCursor<'a>,
}

impl<'a> Nodes<'a> {
    pub(crate) fn new(cursor: NodeCursor<'a>) -> Self {
        Self { cursor }
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor.current()?;
        self.cursor.move_next();
        Some(node)
    }
}
