//! Traced sample points.
//!
//! A [`NodeRecord`] is one sample of a neuron reconstruction. Parent links
//! form an implicit forest keyed by sample number; nothing here checks that
//! the links resolve or that they are acyclic.

use nv_math::Vec3;

/// Parent number used by roots.
pub const ROOT_PARENT: i32 = -1;

/// One sample point of a traced neuron.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeRecord {
    /// Unique key within one tracing (not necessarily contiguous)
    pub sample_number: i32,

    /// Sample number of the parent, or a negative value for roots
    pub parent_number: i32,

    /// Structure type code (soma, axon, dendrite, ...), format dependent
    pub structure: i32,

    /// Position in source units
    pub position: Vec3,

    /// Local process radius
    pub radius: f32,
}

impl NodeRecord {
    pub fn new(
        sample_number: i32,
        parent_number: i32,
        structure: i32,
        position: Vec3,
        radius: f32,
    ) -> Self {
        Self {
            sample_number,
            parent_number,
            structure,
            position,
            radius,
        }
    }

    /// Roots carry a negative parent number (usually -1).
    pub fn is_root(&self) -> bool {
        self.parent_number < 0
    }

    /// Decoded structure type code.
    pub fn kind(&self) -> StructureKind {
        StructureKind::from_code(self.structure)
    }
}

/// Standard SWC structure type codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Undefined,
    Soma,
    Axon,
    BasalDendrite,
    ApicalDendrite,
    Custom(i32),
}

impl StructureKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => StructureKind::Undefined,
            1 => StructureKind::Soma,
            2 => StructureKind::Axon,
            3 => StructureKind::BasalDendrite,
            4 => StructureKind::ApicalDendrite,
            other => StructureKind::Custom(other),
        }
    }
}
