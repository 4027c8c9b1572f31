//! Neuroview viewport - scene management, scheduling and rendering.
//!
//! - [`SceneManager`] owns the scene, camera and controller and hands frames
//!   to a [`RenderBackend`]
//! - [`RenderScheduler`] throttles the per-refresh render loop
//! - [`IngestPipeline`] loads tracing files into the manager
//! - [`WgpuBackend`] draws into a winit window

pub mod backend;
pub mod config;
pub mod controls;
pub mod gpu;
pub mod ingest;
pub mod manager;
pub mod scheduler;

pub use backend::{FrameView, RenderBackend, RenderError};
pub use config::{
    CameraConfig, ControlsConfig, IngestConfig, SceneConfig, SchedulerConfig, ViewerConfig,
};
pub use controls::{CameraController, ControlInput, OrbitControls};
pub use gpu::WgpuBackend;
pub use ingest::{part_entity_name, FileRef, IngestError, IngestOutcome, IngestPipeline, IngestSummary};
pub use manager::SceneManager;
pub use scheduler::{CancelToken, FrameTarget, RenderScheduler, TickOutcome};
