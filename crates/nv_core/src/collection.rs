//! Ordered node collections keyed by sample number.

use std::collections::HashMap;

use nv_math::{Bounds, Vec3};

use crate::node::{NodeRecord, StructureKind};

/// Node records of one tracing (or one compartment of it).
///
/// Records keep the order they were inserted in; the sample number index
/// enforces uniqueness. Inserting a record whose sample number is already
/// present replaces the earlier record in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeCollection {
    nodes: Vec<NodeRecord>,
    index: HashMap<i32, usize>,
}

impl NodeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a record. Returns the record it replaced, if any.
    pub fn insert(&mut self, node: NodeRecord) -> Option<NodeRecord> {
        match self.index.get(&node.sample_number) {
            Some(&slot) => Some(std::mem::replace(&mut self.nodes[slot], node)),
            None => {
                self.index.insert(node.sample_number, self.nodes.len());
                self.nodes.push(node);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeRecord> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn get(&self, sample_number: i32) -> Option<&NodeRecord> {
        self.index.get(&sample_number).map(|&slot| &self.nodes[slot])
    }

    pub fn contains(&self, sample_number: i32) -> bool {
        self.index.contains_key(&sample_number)
    }

    /// Parent record of `sample_number`, if both exist.
    pub fn parent_of(&self, sample_number: i32) -> Option<&NodeRecord> {
        let node = self.get(sample_number)?;
        if node.is_root() {
            return None;
        }
        self.get(node.parent_number)
    }

    /// Records with the root sentinel as parent.
    pub fn roots(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().filter(|n| n.is_root())
    }

    /// Records that name a parent missing from this collection.
    pub fn orphans(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes
            .iter()
            .filter(|n| !n.is_root() && !self.index.contains_key(&n.parent_number))
    }

    /// Positions in insertion order.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.nodes.iter().map(|n| n.position)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_positions(self.positions())
    }

    /// Mean position of all records. Origin when empty.
    pub fn centroid(&self) -> Vec3 {
        if self.nodes.is_empty() {
            return Vec3::ZERO;
        }
        self.positions().sum::<Vec3>() / self.nodes.len() as f32
    }

    /// Position of the first soma sample, else of the first root.
    pub fn soma_position(&self) -> Option<Vec3> {
        self.nodes
            .iter()
            .find(|n| n.kind() == StructureKind::Soma)
            .or_else(|| self.roots().next())
            .map(|n| n.position)
    }
}

impl FromIterator<NodeRecord> for NodeCollection {
    fn from_iter<I: IntoIterator<Item = NodeRecord>>(iter: I) -> Self {
        let mut collection = NodeCollection::new();
        collection.extend(iter);
        collection
    }
}

impl Extend<NodeRecord> for NodeCollection {
    fn extend<I: IntoIterator<Item = NodeRecord>>(&mut self, iter: I) {
        for node in iter {
            if let Some(previous) = self.insert(node) {
                log::debug!(
                    "Duplicate sample number {}, replacing earlier record",
                    previous.sample_number
                );
            }
        }
    }
}

impl<'a> IntoIterator for &'a NodeCollection {
    type Item = &'a NodeRecord;
    type IntoIter = std::slice::Iter<'a, NodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ROOT_PARENT;

    fn node(sample: i32, parent: i32, structure: i32, position: Vec3) -> NodeRecord {
        NodeRecord::new(sample, parent, structure, position, 1.0)
    }

    #[test]
    fn test_insertion_order_and_lookup() {
        let collection: NodeCollection = vec![
            node(10, ROOT_PARENT, 1, Vec3::ZERO),
            node(3, 10, 2, Vec3::X),
            node(7, 3, 2, Vec3::Y),
        ]
        .into_iter()
        .collect();

        let order: Vec<i32> = collection.iter().map(|n| n.sample_number).collect();
        assert_eq!(order, vec![10, 3, 7]);
        assert_eq!(collection.get(3).map(|n| n.position), Some(Vec3::X));
        assert_eq!(collection.parent_of(7).map(|n| n.sample_number), Some(3));
        assert!(collection.parent_of(10).is_none());
    }

    #[test]
    fn test_duplicate_sample_replaces_in_place() {
        let collection: NodeCollection = vec![
            node(1, ROOT_PARENT, 1, Vec3::ZERO),
            node(2, 1, 2, Vec3::X),
            node(1, ROOT_PARENT, 1, Vec3::Z),
        ]
        .into_iter()
        .collect();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.as_slice()[0].position, Vec3::Z);
        assert_eq!(collection.as_slice()[1].sample_number, 2);
    }

    #[test]
    fn test_roots_and_orphans() {
        let collection: NodeCollection = vec![
            node(1, ROOT_PARENT, 1, Vec3::ZERO),
            node(2, 1, 3, Vec3::X),
            node(3, 99, 3, Vec3::Y),
            // Cycle: never validated, must not hang anything
            node(4, 5, 3, Vec3::Z),
            node(5, 4, 3, Vec3::Z),
        ]
        .into_iter()
        .collect();

        let roots: Vec<i32> = collection.roots().map(|n| n.sample_number).collect();
        let orphans: Vec<i32> = collection.orphans().map(|n| n.sample_number).collect();
        assert_eq!(roots, vec![1]);
        assert_eq!(orphans, vec![3]);
        assert!(collection.parent_of(3).is_none());
    }

    #[test]
    fn test_bounds_centroid_and_soma() {
        let collection: NodeCollection = vec![
            node(1, ROOT_PARENT, 2, Vec3::new(0.0, 0.0, 0.0)),
            node(2, 1, 1, Vec3::new(2.0, 4.0, 6.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(collection.centroid(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(collection.bounds().max, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(collection.soma_position(), Some(Vec3::new(2.0, 4.0, 6.0)));

        let empty = NodeCollection::new();
        assert_eq!(empty.centroid(), Vec3::ZERO);
        assert!(empty.soma_position().is_none());
        assert!(empty.bounds().is_empty());
    }
}
