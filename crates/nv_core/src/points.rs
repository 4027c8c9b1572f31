//! Point-cloud geometry built from traced nodes.

use nv_math::{Bounds, Vec3};

use crate::collection::NodeCollection;

/// One point per traced node, in collection order.
///
/// Only coordinates are used, so missing or cyclic parent links have no
/// effect here.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    pub positions: Vec<Vec3>,
    pub bounds: Bounds,
}

impl PointCloud {
    pub fn new(positions: Vec<Vec3>) -> Self {
        let bounds = Bounds::from_positions(positions.iter().copied());
        Self { positions, bounds }
    }

    pub fn from_nodes(nodes: &NodeCollection) -> Self {
        Self::new(nodes.positions().collect())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
