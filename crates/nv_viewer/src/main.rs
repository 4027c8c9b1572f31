use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nv_core::{display_name, load_compartment_obj};
use nv_math::Vec3;
use nv_viewport::{
    ControlInput, FileRef, IngestOutcome, IngestPipeline, OrbitControls, RenderError,
    RenderScheduler, SceneManager, ViewerConfig, WgpuBackend,
};
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Wheel pixels per zoom line on touchpads
const PIXELS_PER_LINE: f32 = 50.0;

#[derive(Parser, Debug)]
#[command(
    name = "nv_viewer",
    version,
    about = "Interactive 3D viewer for neuron reconstructions",
    after_help = "Drop a .swc or .json tracing on the window to load it. \
                  Drag to orbit, right-drag to pan, scroll to zoom, \
                  F to frame everything, Delete to clear neurons."
)]
struct Args {
    /// Tracing file to load at startup (.swc or .json)
    file: Option<PathBuf>,

    /// Compartment mesh (.obj) to show alongside the neurons; repeatable
    #[arg(long = "compartment", value_name = "OBJ")]
    compartments: Vec<PathBuf>,

    /// JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep +Y as the camera up vector
    #[arg(long)]
    no_flip: bool,

    /// Scene-center point subtracted from everything loaded
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    center: Option<Vec<f32>>,
}

/// Application state
struct App {
    window: Option<Arc<Window>>,
    manager: SceneManager,
    scheduler: RenderScheduler,
    pipeline: IngestPipeline,
    runtime: Runtime,

    // Input state
    left_mouse_pressed: bool,
    pan_mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
}

impl App {
    fn new(config: ViewerConfig, runtime: Runtime) -> Self {
        Self {
            window: None,
            scheduler: RenderScheduler::new(&config.scheduler),
            pipeline: IngestPipeline::new(config.ingest.clone()),
            manager: SceneManager::new(config),
            runtime,
            left_mouse_pressed: false,
            pan_mouse_pressed: false,
            last_mouse_pos: None,
        }
    }

    /// Ingest a file (or clear with `None`) and redraw.
    fn ingest(&mut self, file: Option<FileRef>) {
        let result = self
            .runtime
            .block_on(self.pipeline.ingest(&mut self.manager, file));

        match result {
            Ok(IngestOutcome::Loaded(summary)) => {
                log::info!(
                    "Showing {} ({} nodes{})",
                    summary.name,
                    summary.node_count,
                    summary
                        .label
                        .as_deref()
                        .map(|label| format!(", neuron {}", label))
                        .unwrap_or_default()
                );
                if let Some(window) = &self.window {
                    window.set_title(&format!("Neuroview - {}", summary.name));
                }
            }
            Ok(IngestOutcome::Cleared) => {
                if let Some(window) = &self.window {
                    window.set_title("Neuroview");
                }
            }
            Ok(IngestOutcome::Unchanged) => log::debug!("File already loaded"),
            Err(err) => log::error!("{}", err),
        }
    }

    fn load_compartments(&mut self, paths: &[PathBuf]) {
        let color = self.manager.config().scene.compartment_color;
        for path in paths {
            match load_compartment_obj(path) {
                Ok(mesh) => {
                    self.manager.load_compartment(&display_name(path), color, mesh);
                }
                Err(err) => log::error!("Failed to load compartment {}: {}", path.display(), err),
            }
        }
    }

    /// Stop on errors the manager could not recover from.
    fn check_render(&mut self, result: Result<(), RenderError>, event_loop: &ActiveEventLoop) {
        if let Err(err) = result {
            log::error!("Render error: {}", err);
            self.scheduler.cancel();
            event_loop.exit();
        }
    }

    fn redraw_now(&mut self, event_loop: &ActiveEventLoop) {
        let result = self.manager.render();
        self.check_render(result, event_loop);
    }

    fn handle_input(&mut self, input: ControlInput, event_loop: &ActiveEventLoop) {
        let result = self.manager.handle_input(input).map(|_| ());
        self.check_render(result, event_loop);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Neuroview")
            .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        let backend = match pollster::block_on(WgpuBackend::new(window.clone())) {
            Ok(backend) => backend,
            Err(err) => {
                log::error!("Failed to initialize renderer: {:#}", err);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        let controls = OrbitControls::from_config(&self.manager.config().controls);
        self.manager
            .initialize(Box::new(backend), Box::new(controls), size.width, size.height);

        if let Some(name) = self.pipeline.current().map(FileRef::name) {
            window.set_title(&format!("Neuroview - {}", name));
        }
        window.request_redraw();
        self.window = Some(window);

        log::info!("Window and renderer initialized");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.scheduler.cancel();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                let result = self.manager.resize(physical_size.width, physical_size.height);
                self.check_render(result, event_loop);
            }
            WindowEvent::DroppedFile(path) => {
                log::info!("Dropped {}", path.display());
                self.ingest(Some(FileRef::Path(path)));
                self.redraw_now(event_loop);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.left_mouse_pressed = pressed,
                    MouseButton::Right | MouseButton::Middle => self.pan_mouse_pressed = pressed,
                    _ => {}
                }
                if !self.left_mouse_pressed && !self.pan_mouse_pressed {
                    self.last_mouse_pos = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if !self.left_mouse_pressed && !self.pan_mouse_pressed {
                    return;
                }
                if let Some((last_x, last_y)) = self.last_mouse_pos {
                    let dx = (position.x - last_x) as f32;
                    let dy = (position.y - last_y) as f32;
                    let input = if self.left_mouse_pressed {
                        ControlInput::Rotate { dx, dy }
                    } else {
                        ControlInput::Pan { dx, dy }
                    };
                    self.handle_input(input, event_loop);
                }
                self.last_mouse_pos = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.handle_input(ControlInput::Zoom { delta: lines }, event_loop);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(keycode),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match keycode {
                KeyCode::KeyF => {
                    if self.manager.frame_all() {
                        self.redraw_now(event_loop);
                    }
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    self.ingest(None);
                    self.redraw_now(event_loop);
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => match self.scheduler.tick_now(&mut self.manager) {
                Ok(outcome) => {
                    if outcome.should_continue() {
                        if let Some(window) = &self.window {
                            window.request_redraw();
                        }
                    }
                }
                Err(err) => self.check_render(Err(err), event_loop),
            },
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let mut config = ViewerConfig::load_or_default(args.config.as_deref())?;
    if args.no_flip {
        config.camera.flip_y = false;
    }
    if let Some(&[x, y, z]) = args.center.as_deref() {
        config.scene.center = Vec3::new(x, y, z);
    }

    log::info!("Starting Neuroview");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let mut app = App::new(config, runtime);
    app.load_compartments(&args.compartments);
    if let Some(path) = args.file {
        app.ingest(Some(FileRef::Path(path)));
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    log::info!("Running event loop");
    event_loop.run_app(&mut app)?;

    Ok(())
}
