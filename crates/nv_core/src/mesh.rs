//! Triangle meshes for anatomical compartments.

use nv_math::{Bounds, Vec3};

/// Fallback normal for vertices whose adjacent faces are degenerate
const DEGENERATE_NORMAL: Vec3 = Vec3::Y;

/// Indexed triangle list with per-vertex normals.
///
/// Compartment surfaces come from OBJ exports, which wind faces
/// counter-clockwise.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    /// One per position once `ensure_normals` has run
    pub normals: Option<Vec<Vec3>>,
    /// Triangle list, three indices per face
    pub indices: Vec<u32>,
    pub bounds: Bounds,
}

impl Mesh {
    /// Build a mesh. Normals are taken as given; see [`Mesh::ensure_normals`].
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Bounds::from_positions(positions.iter().copied());
        Self {
            positions,
            normals,
            indices,
            bounds,
        }
    }

    /// Area-weighted smooth normals. Faces referencing missing vertices are
    /// skipped.
    pub fn compute_normals(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.positions.len()];

        for face in self.indices.chunks_exact(3) {
            let corners = [face[0] as usize, face[1] as usize, face[2] as usize];
            let Some([a, b, c]) = self.corner_positions(corners) else {
                continue;
            };
            let weighted = (b - a).cross(c - a);
            for corner in corners {
                accumulated[corner] += weighted;
            }
        }

        self.normals = Some(
            accumulated
                .into_iter()
                .map(|n| n.try_normalize().unwrap_or(DEGENERATE_NORMAL))
                .collect(),
        );
    }

    fn corner_positions(&self, corners: [usize; 3]) -> Option<[Vec3; 3]> {
        Some([
            *self.positions.get(corners[0])?,
            *self.positions.get(corners[1])?,
            *self.positions.get(corners[2])?,
        ])
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Compute normals unless a full set is already present.
    pub fn ensure_normals(&mut self) {
        let complete = self
            .normals
            .as_ref()
            .is_some_and(|normals| normals.len() == self.positions.len());
        if !complete {
            if self.normals.is_some() {
                log::debug!("Discarding partial normals for a {}-vertex mesh", self.positions.len());
            }
            self.compute_normals();
        }
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.center()
    }

    /// Bounding-box diagonal
    pub fn size(&self) -> f32 {
        self.bounds.size()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle(normals: Option<Vec<Vec3>>) -> Mesh {
        Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], normals)
    }

    #[test]
    fn test_new_keeps_normals_absent() {
        let mesh = unit_triangle(None);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.has_normals());
    }

    #[test]
    fn test_ccw_face_points_toward_viewer() {
        let mut mesh = unit_triangle(None);
        mesh.compute_normals();

        for normal in mesh.normals.as_ref().unwrap() {
            assert!((*normal - Vec3::Z).length() < 1e-4);
        }
    }

    #[test]
    fn test_partial_normals_recomputed() {
        let mut mesh = unit_triangle(Some(vec![Vec3::X]));
        mesh.ensure_normals();
        assert_eq!(mesh.normals.as_ref().unwrap().len(), 3);

        let mut complete = unit_triangle(Some(vec![Vec3::X; 3]));
        complete.ensure_normals();
        assert_eq!(complete.normals.unwrap()[0], Vec3::X);
    }

    #[test]
    fn test_region_bounds() {
        let mesh = Mesh::new(
            vec![Vec3::new(-2.0, 0.0, 4.0), Vec3::new(6.0, 8.0, -4.0), Vec3::ONE],
            vec![0, 1, 2],
            None,
        );

        assert_eq!(mesh.bounds.min, Vec3::new(-2.0, 0.0, -4.0));
        assert_eq!(mesh.bounds.max, Vec3::new(6.0, 8.0, 4.0));
        assert_eq!(mesh.center(), Vec3::new(2.0, 4.0, 0.0));
    }

    #[test]
    fn test_dangling_face_skipped() {
        let mut mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 9], None);
        mesh.compute_normals();
        assert_eq!(mesh.normals.as_ref().unwrap()[0], DEGENERATE_NORMAL);
    }
}
