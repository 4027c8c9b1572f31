//! Render backend seam.
//!
//! The scene manager owns scene state and hands a read-only [`FrameView`] to
//! a backend for each draw. The wgpu backend lives in [`crate::gpu`]; tests
//! substitute a recording backend.

use nv_core::Scene;
use nv_math::{Camera, Color};
use thiserror::Error;

/// Errors a backend can report from a draw.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Surface lost")]
    SurfaceLost,

    #[error("Surface outdated")]
    SurfaceOutdated,

    #[error("Timed out acquiring the next frame")]
    Timeout,

    #[error("Out of GPU memory")]
    OutOfMemory,
}

impl RenderError {
    /// Lost and outdated surfaces recover by reconfiguring at the current size.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RenderError::OutOfMemory)
    }
}

/// Everything a backend needs to draw one frame.
pub struct FrameView<'a> {
    pub camera: &'a Camera,
    pub scene: &'a Scene,
    pub background: Color,
    /// Point sprite size in pixels
    pub point_size: f32,
}

/// A drawable surface.
pub trait RenderBackend {
    /// Reconfigure for a new viewport size in pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Draw one frame.
    fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// What a [`RecordingBackend`] saw.
    #[derive(Debug, Default, Clone)]
    pub struct Recording {
        pub draws: usize,
        pub resizes: Vec<(u32, u32)>,
        /// Neuron entity names visible in the most recent draw
        pub last_neurons: Vec<String>,
        pub last_aspect: f32,
        pub last_up_sign: f32,
        /// Errors to return from upcoming draws, in order
        pub fail_next: Vec<RenderError>,
    }

    /// Backend that records draws instead of rendering.
    #[derive(Clone, Default)]
    pub struct RecordingBackend {
        pub recording: Arc<Mutex<Recording>>,
    }

    impl RecordingBackend {
        pub fn snapshot(&self) -> Recording {
            self.recording.lock().unwrap().clone()
        }
    }

    impl RenderBackend for RecordingBackend {
        fn resize(&mut self, width: u32, height: u32) {
            self.recording.lock().unwrap().resizes.push((width, height));
        }

        fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError> {
            let mut recording = self.recording.lock().unwrap();
            if !recording.fail_next.is_empty() {
                return Err(recording.fail_next.remove(0));
            }
            recording.draws += 1;
            recording.last_neurons = frame.scene.neurons.names().map(str::to_owned).collect();
            recording.last_aspect = frame.camera.aspect;
            recording.last_up_sign = frame.camera.up_sign();
            Ok(())
        }
    }
}
