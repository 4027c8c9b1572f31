// Re-export glam for convenience
pub use glam::*;

// Neuroview math types
mod bounds;
mod camera;
mod color;
pub use bounds::Bounds;
pub use camera::Camera;
pub use color::Color;
