//! Scene manager: owns the scene, the camera, the controller and the backend.
//!
//! The manager can be created and filled before a window exists. Until
//! [`SceneManager::initialize`] attaches a backend, `resize` and `render`
//! are no-ops.

use nv_core::{EntityId, Geometry, Mesh, NodeCollection, PointCloud, Scene};
use nv_math::{Camera, Color, Vec3};

use crate::backend::{FrameView, RenderBackend, RenderError};
use crate::config::ViewerConfig;
use crate::controls::{CameraController, ControlInput};
use crate::scheduler::FrameTarget;

/// Backend and controller attached by `initialize`.
struct Viewport {
    backend: Box<dyn RenderBackend>,
    controls: Box<dyn CameraController>,
    width: u32,
    height: u32,
}

pub struct SceneManager {
    config: ViewerConfig,
    scene: Scene,
    camera: Camera,
    viewport: Option<Viewport>,
}

impl SceneManager {
    /// Create a headless manager. Entities can be loaded right away.
    pub fn new(config: ViewerConfig) -> Self {
        let mut scene = Scene::new();
        scene.set_center(config.scene.center);
        let camera = Self::make_camera(&config, 1.0);

        Self {
            config,
            scene,
            camera,
            viewport: None,
        }
    }

    fn make_camera(config: &ViewerConfig, aspect: f32) -> Camera {
        let lens = &config.camera;
        let mut camera = Camera::with_lens(
            Vec3::new(0.0, 0.0, lens.distance),
            Vec3::ZERO,
            aspect,
            lens.fov_degrees,
            lens.near,
            lens.far,
        );
        camera.set_flip_y(lens.flip_y);
        camera
    }

    /// Attach a backend and controller, set up the camera for a
    /// `width` x `height` viewport and install the lights.
    ///
    /// Calling it again replaces the backend and resets the camera.
    pub fn initialize(
        &mut self,
        mut backend: Box<dyn RenderBackend>,
        controls: Box<dyn CameraController>,
        width: u32,
        height: u32,
    ) {
        if self.viewport.is_some() {
            log::warn!("Scene manager initialized twice; replacing backend");
        }

        self.camera = Self::make_camera(&self.config, Camera::aspect_for(width, height));
        self.scene
            .install_lights(self.config.scene.light_distance, self.config.scene.light_intensity);
        backend.resize(width, height);

        self.viewport = Some(Viewport {
            backend,
            controls,
            width,
            height,
        });
        log::info!("Scene manager initialized at {}x{}", width, height);
    }

    pub fn is_initialized(&self) -> bool {
        self.viewport.is_some()
    }

    /// Resize the viewport and redraw. Zero-sized viewports keep the
    /// previous aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let Some(viewport) = self.viewport.as_mut() else {
            log::debug!("Resize to {}x{} before initialize ignored", width, height);
            return Ok(());
        };

        viewport.width = width;
        viewport.height = height;
        if width > 0 && height > 0 {
            self.camera.set_aspect(Camera::aspect_for(width, height));
        }
        viewport.backend.resize(width, height);
        self.render()
    }

    /// Current viewport size, if initialized
    pub fn size(&self) -> Option<(u32, u32)> {
        self.viewport.as_ref().map(|v| (v.width, v.height))
    }

    /// Feed user input to the controller. If the camera changed the scene is
    /// redrawn immediately. Returns whether the camera changed.
    pub fn handle_input(&mut self, input: ControlInput) -> Result<bool, RenderError> {
        let Some(viewport) = self.viewport.as_mut() else {
            return Ok(false);
        };

        let changed = viewport.controls.handle_input(&mut self.camera, input);
        if changed {
            self.render()?;
        }
        Ok(changed)
    }

    /// Let damped camera motion advance by one step.
    pub fn update_controls(&mut self) -> bool {
        match self.viewport.as_mut() {
            Some(viewport) => viewport.controls.update(&mut self.camera),
            None => false,
        }
    }

    /// Draw the current scene. A no-op before `initialize`.
    ///
    /// Lost or outdated surfaces are reconfigured at the current size and the
    /// frame is skipped; only unrecoverable errors are returned.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let Some(viewport) = self.viewport.as_mut() else {
            return Ok(());
        };

        let frame = FrameView {
            camera: &self.camera,
            scene: &self.scene,
            background: self.config.scene.background,
            point_size: self.config.scene.point_size,
        };

        match viewport.backend.draw(&frame) {
            Ok(()) => Ok(()),
            Err(err) if err.is_recoverable() => {
                log::debug!("Skipping frame: {}", err);
                viewport.backend.resize(viewport.width, viewport.height);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Add a neuron entity built from `nodes`, replacing any neuron with the
    /// same name. The entity is translated by the negated scene center.
    pub fn load_neuron(&mut self, name: &str, color: Color, nodes: &NodeCollection) -> EntityId {
        let cloud = PointCloud::from_nodes(nodes);
        log::debug!("Loading neuron '{}' ({} points)", name, cloud.len());
        self.scene.add_neuron(name, color, Geometry::Points(cloud))
    }

    /// Remove every neuron entity. Compartments stay. Returns how many were
    /// removed.
    pub fn remove_all_neurons(&mut self) -> usize {
        let removed = self.scene.clear_neurons();
        if removed > 0 {
            log::debug!("Removed {} neuron entities", removed);
        }
        removed
    }

    pub fn remove_neuron(&mut self, name: &str) -> bool {
        self.scene.remove_neuron(name).is_some()
    }

    /// Add a compartment mesh, replacing any compartment with the same name.
    pub fn load_compartment(&mut self, name: &str, color: Color, mesh: Mesh) -> EntityId {
        log::debug!(
            "Loading compartment '{}' ({} triangles)",
            name,
            mesh.triangle_count()
        );
        self.scene.add_compartment(name, color, Geometry::Mesh(mesh))
    }

    pub fn remove_compartment(&mut self, name: &str) -> bool {
        self.scene.remove_compartment(name).is_some()
    }

    pub fn remove_all_compartments(&mut self) -> usize {
        self.scene.clear_compartments()
    }

    /// Set the scene center used for entities loaded from now on.
    pub fn set_center(&mut self, center: Vec3) {
        self.scene.set_center(center);
    }

    /// Center on a tracing: its soma (or first root), otherwise its centroid.
    pub fn center_on(&mut self, nodes: &NodeCollection) {
        if nodes.is_empty() {
            return;
        }
        let center = nodes.soma_position().unwrap_or_else(|| nodes.centroid());
        log::debug!("Scene center set to {:?}", center);
        self.scene.set_center(center);
    }

    /// Point the camera at everything in the scene, keeping its viewing
    /// direction. Returns `false` if the scene is empty.
    pub fn frame_all(&mut self) -> bool {
        let bounds = self.scene.world_bounds();
        if bounds.is_empty() {
            return false;
        }

        let direction = (self.camera.position - self.camera.target)
            .try_normalize()
            .unwrap_or(Vec3::Z);
        let half_fov = (self.camera.fov_y * 0.5).max(0.01);
        let radius = (bounds.size() * 0.5).max(self.camera.near);
        let distance = radius / half_fov.sin();

        self.camera.target = bounds.center();
        self.camera.position = self.camera.target + direction * distance;
        true
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

impl FrameTarget for SceneManager {
    fn update_controls(&mut self) -> bool {
        SceneManager::update_controls(self)
    }

    fn render(&mut self) -> Result<(), RenderError> {
        SceneManager::render(self)
    }
}
