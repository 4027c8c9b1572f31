//! Renderer-agnostic scene contents.
//!
//! A [`Scene`] holds two entity groups (traced neurons and anatomical
//! compartments), the fixed lights, and the scene-center offset applied to
//! entities when they are added. Entity names are unique per group: adding
//! under an existing name replaces the earlier entity.

use std::sync::Arc;

use nv_math::{Bounds, Color, Vec3};

use crate::mesh::Mesh;
use crate::points::PointCloud;

/// Renderable geometry owned by an entity.
#[derive(Clone, Debug)]
pub enum Geometry {
    Points(PointCloud),
    Mesh(Mesh),
}

impl Geometry {
    /// Bounds in the geometry's own (uncentered) frame
    pub fn bounds(&self) -> Bounds {
        match self {
            Geometry::Points(points) => points.bounds,
            Geometry::Mesh(mesh) => mesh.bounds,
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Points(points) => points.len(),
            Geometry::Mesh(mesh) => mesh.vertex_count(),
        }
    }
}

/// Unique id of an entity instance. A replaced entity gets a new id, so
/// backends can key GPU resources on it.
pub type EntityId = u64;

/// A named renderable object.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub color: Color,
    pub geometry: Arc<Geometry>,
    /// Translation applied to the geometry (negated scene center at load time)
    pub position: Vec3,
}

impl Entity {
    /// Bounds after applying the entity translation
    pub fn world_bounds(&self) -> Bounds {
        self.geometry.bounds().translated(self.position)
    }
}

/// Entities keyed by name, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct EntityGroup {
    entities: Vec<Entity>,
}

impl EntityGroup {
    /// Insert an entity, replacing (in place) any entity with the same name.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        match self.entities.iter().position(|e| e.name == entity.name) {
            Some(slot) => Some(std::mem::replace(&mut self.entities[slot], entity)),
            None => {
                self.entities.push(entity);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Entity> {
        let slot = self.entities.iter().position(|e| e.name == name)?;
        Some(self.entities.remove(slot))
    }

    /// Detach every entity. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entities.len();
        self.entities.clear();
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }

    pub fn world_bounds(&self) -> Bounds {
        self.entities
            .iter()
            .map(Entity::world_bounds)
            .fold(Bounds::empty(), |acc, b| acc.union(&b))
    }
}

/// A directional light; `position` points from the light toward the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
}

impl DirectionalLight {
    /// Unit direction the light travels in.
    pub fn direction(&self) -> Vec3 {
        (-self.position).try_normalize().unwrap_or(Vec3::NEG_Z)
    }
}

/// Scene contents shared by the scene manager and the render backends.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub neurons: EntityGroup,
    pub compartments: EntityGroup,
    pub lights: Vec<DirectionalLight>,
    center: Vec3,
    next_id: EntityId,
    revision: u64,
}

impl Scene {
    /// Create an empty scene without lights, centered on the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install two white directional lights on opposite sides of the Z axis.
    pub fn install_lights(&mut self, distance: f32, intensity: f32) {
        self.lights = vec![
            DirectionalLight {
                position: Vec3::new(0.0, 0.0, distance),
                color: Color::WHITE,
                intensity,
            },
            DirectionalLight {
                position: Vec3::new(0.0, 0.0, -distance),
                color: Color::WHITE,
                intensity,
            },
        ];
        self.touch();
    }

    /// Current scene-center point
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Change the center used for entities added from now on. Entities
    /// already in the scene keep their translation.
    pub fn set_center(&mut self, center: Vec3) {
        self.center = center;
    }

    /// Counter bumped on every content change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Add (or replace) a neuron entity. Returns the new entity id.
    pub fn add_neuron(&mut self, name: &str, color: Color, geometry: Geometry) -> EntityId {
        let entity = self.make_entity(name, color, geometry);
        let id = entity.id;
        if self.neurons.insert(entity).is_some() {
            log::debug!("Replaced neuron entity '{}'", name);
        }
        self.touch();
        id
    }

    /// Add (or replace) a compartment entity. Returns the new entity id.
    pub fn add_compartment(&mut self, name: &str, color: Color, geometry: Geometry) -> EntityId {
        let entity = self.make_entity(name, color, geometry);
        let id = entity.id;
        if self.compartments.insert(entity).is_some() {
            log::debug!("Replaced compartment entity '{}'", name);
        }
        self.touch();
        id
    }

    pub fn remove_neuron(&mut self, name: &str) -> Option<Entity> {
        let removed = self.neurons.remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn remove_compartment(&mut self, name: &str) -> Option<Entity> {
        let removed = self.compartments.remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Remove every neuron entity. Compartments are untouched.
    pub fn clear_neurons(&mut self) -> usize {
        let removed = self.neurons.clear();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    pub fn clear_compartments(&mut self) -> usize {
        let removed = self.compartments.clear();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Every entity, compartments first so neurons draw on top.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.compartments.iter().chain(self.neurons.iter())
    }

    pub fn entity_count(&self) -> usize {
        self.neurons.len() + self.compartments.len()
    }

    /// Total point count across neuron entities
    pub fn neuron_point_count(&self) -> usize {
        self.neurons.iter().map(|e| e.geometry.vertex_count()).sum()
    }

    /// World-space bounds of everything in the scene
    pub fn world_bounds(&self) -> Bounds {
        self.neurons.world_bounds().union(&self.compartments.world_bounds())
    }

    fn make_entity(&mut self, name: &str, color: Color, geometry: Geometry) -> Entity {
        self.next_id += 1;
        Entity {
            id: self.next_id,
            name: name.to_string(),
            color,
            geometry: Arc::new(geometry),
            position: -self.center,
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(points: &[Vec3]) -> Geometry {
        Geometry::Points(PointCloud::new(points.to_vec()))
    }

    fn triangle() -> Geometry {
        Geometry::Mesh(Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None))
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let mut scene = Scene::new();
        let first = scene.add_neuron("AA0001", Color::BLUE, cloud(&[Vec3::ZERO]));
        let second = scene.add_neuron("AA0001", Color::GREEN, cloud(&[Vec3::X, Vec3::Y]));

        assert_ne!(first, second);
        assert_eq!(scene.neurons.len(), 1);
        let entity = scene.neurons.get("AA0001").unwrap();
        assert_eq!(entity.id, second);
        assert_eq!(entity.color, Color::GREEN);
        assert_eq!(entity.geometry.vertex_count(), 2);
    }

    #[test]
    fn test_center_applies_at_load_only() {
        let mut scene = Scene::new();
        scene.add_neuron("a", Color::BLUE, cloud(&[Vec3::ZERO]));

        scene.set_center(Vec3::new(10.0, 20.0, 30.0));
        scene.add_neuron("b", Color::BLUE, cloud(&[Vec3::ZERO]));

        assert_eq!(scene.neurons.get("a").unwrap().position, Vec3::ZERO);
        assert_eq!(
            scene.neurons.get("b").unwrap().position,
            Vec3::new(-10.0, -20.0, -30.0)
        );
    }

    #[test]
    fn test_clear_neurons_keeps_compartments() {
        let mut scene = Scene::new();
        scene.add_neuron("a", Color::BLUE, cloud(&[Vec3::ZERO]));
        scene.add_neuron("b", Color::GREEN, cloud(&[Vec3::ONE]));
        scene.add_compartment("root", Color::GREY, triangle());

        assert_eq!(scene.clear_neurons(), 2);
        assert!(scene.neurons.is_empty());
        assert_eq!(scene.compartments.len(), 1);

        let revision = scene.revision();
        assert_eq!(scene.clear_neurons(), 0);
        assert_eq!(scene.revision(), revision);
    }

    #[test]
    fn test_targeted_removal() {
        let mut scene = Scene::new();
        scene.add_neuron("a", Color::BLUE, cloud(&[Vec3::ZERO]));
        scene.add_compartment("root", Color::GREY, triangle());

        assert!(scene.remove_neuron("missing").is_none());
        assert!(scene.remove_neuron("a").is_some());
        assert!(scene.remove_compartment("root").is_some());
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_lights_opposite_z() {
        let mut scene = Scene::new();
        scene.install_lights(100.0, 1.0);

        assert_eq!(scene.lights.len(), 2);
        assert_eq!(scene.lights[0].position.z, 100.0);
        assert_eq!(scene.lights[1].position.z, -100.0);
        assert_eq!(scene.lights[0].direction(), Vec3::NEG_Z);
        assert_eq!(scene.lights[1].direction(), Vec3::Z);
    }

    #[test]
    fn test_world_bounds_and_draw_order() {
        let mut scene = Scene::new();
        scene.set_center(Vec3::splat(1.0));
        scene.add_neuron("a", Color::BLUE, cloud(&[Vec3::ZERO, Vec3::splat(2.0)]));
        scene.add_compartment("root", Color::GREY, triangle());

        let bounds = scene.world_bounds();
        assert_eq!(bounds.min, Vec3::splat(-1.0));
        assert_eq!(bounds.max, Vec3::splat(1.0));

        let order: Vec<&str> = scene.entities().map(|e| e.name.as_str()).collect();
        assert_eq!(order, vec!["root", "a"]);
        assert_eq!(scene.neuron_point_count(), 2);
    }
}
