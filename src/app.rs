//! Frame driver
//!
//! Owns the window, the GPU state and the [`AppContext`], adapts winit events
//! into [`InputEvent`]s and runs one composition and presentation per redraw.

use cgmath::Vector3;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, DeviceId, ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::config::{AppSettings, RenderConfig};
use crate::error::InitError;
use crate::gfx::{
    rendering::{frame_recorder::MAX_TESSELLATION_SEGMENTS, ShaderDesc},
    resources::{face_paths, CubemapFaces, ModelData},
    Camera, RenderEngine, SceneComposer, SceneHandles,
};
use crate::input::{CursorMode, InputEvent, InputRouter, Key, RouterAction};
use crate::ui::{settings_panel, UiManager};

/// Where the camera starts, at roughly eye height behind the models.
pub const START_POSITION: Vector3<f32> = Vector3::new(0.0, 1.6, 5.0);

/// Wheel pixels treated as one line of scrolling.
const PIXELS_PER_LINE: f64 = 20.0;

/// Measures the time between consecutive frames.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick, zero on the first one.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last = Some(now);
        dt
    }
}

/// Mutable application state shared by input handling and composition.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub camera: Camera,
    pub config: RenderConfig,
    pub router: InputRouter,
    pub clock: FrameClock,
    pub viewport: (u32, u32),
    /// Virtual cursor built from raw mouse motion, so looking around keeps
    /// working while the real pointer is locked.
    pointer: (f64, f64),
}

impl AppContext {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self {
            camera: Camera::new(START_POSITION),
            config: RenderConfig::default(),
            router: InputRouter::new(),
            clock: FrameClock::new(),
            viewport,
            pointer: (0.0, 0.0),
        }
    }

    /// Routes an event and keeps the viewport in sync with resizes.
    pub fn route(&mut self, event: InputEvent) -> RouterAction {
        let action = self.router.handle(event, &mut self.camera);
        if let RouterAction::Resize(width, height) = action {
            if width > 0 && height > 0 {
                self.viewport = (width, height);
            }
        }
        action
    }

    /// Moves the virtual cursor by a raw mouse delta.
    pub fn mouse_motion(&mut self, dx: f64, dy: f64) -> RouterAction {
        self.pointer.0 += dx;
        self.pointer.1 += dy;
        let (x, y) = self.pointer;
        self.route(InputEvent::CursorMoved { x, y })
    }

    /// Starts a frame: advances the clock and applies held movement keys.
    /// Returns the frame's delta time in seconds.
    pub fn advance(&mut self) -> f32 {
        let dt = self.clock.tick();
        self.router.apply_movement(dt, &mut self.camera);
        dt
    }
}

/// Maps a physical key to the key the application reacts to.
pub fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::KeyW => Key::Forward,
        KeyCode::KeyS => Key::Backward,
        KeyCode::KeyA => Key::Left,
        KeyCode::KeyD => Key::Right,
        KeyCode::Space => Key::Pause,
        KeyCode::Escape => Key::Escape,
        _ => Key::Other,
    }
}

/// Key event from its parts. Auto-repeat is dropped since held keys are
/// tracked as state.
pub fn key_event(code: KeyCode, state: ElementState, repeat: bool) -> Option<InputEvent> {
    if repeat {
        return None;
    }
    Some(InputEvent::Key {
        key: map_key(code),
        pressed: state.is_pressed(),
    })
}

/// Zoom change for a wheel delta. Scrolling up narrows the field of view.
pub fn scroll_delta(delta: MouseScrollDelta) -> f32 {
    let lines = match delta {
        MouseScrollDelta::LineDelta(_, y) => y as f64,
        MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y / PIXELS_PER_LINE,
    };
    -lines as f32
}

/// Adapts the window events the router cares about.
///
/// Cursor positions are not translated; look input comes from raw device
/// motion instead.
pub fn translate_window_event(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::CloseRequested => Some(InputEvent::CloseRequested),
        WindowEvent::Resized(PhysicalSize { width, height }) => Some(InputEvent::Resized {
            width: *width,
            height: *height,
        }),
        WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Scroll {
            dy: scroll_delta(*delta),
        }),
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(code),
                    state,
                    repeat,
                    ..
                },
            ..
        } => key_event(*code, *state, *repeat),
        _ => None,
    }
}

fn apply_cursor_mode(window: &Window, mode: CursorMode) {
    match mode {
        CursorMode::Captured => {
            if window.set_cursor_grab(CursorGrabMode::Locked).is_err() {
                if let Err(err) = window.set_cursor_grab(CursorGrabMode::Confined) {
                    log::warn!("Failed to capture cursor: {err}");
                }
            }
            window.set_cursor_visible(false);
        }
        CursorMode::Free => {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                log::warn!("Failed to release cursor: {err}");
            }
            window.set_cursor_visible(true);
        }
    }
}

/// Compiles the programs and uploads every model and the skybox.
fn load_scene(engine: &mut RenderEngine, settings: &AppSettings) -> Result<SceneHandles, InitError> {
    let skybox_shader = engine.create_shader(ShaderDesc::skybox());
    let lit_shader = engine.create_shader(ShaderDesc::lit());
    let tessellation_shader = engine.create_shader(ShaderDesc::tessellated());
    log::info!("Max tessellation segments per patch edge: {MAX_TESSELLATION_SEGMENTS}");

    let faces = CubemapFaces::load(
        &face_paths(&settings.asset("skybox"), "tga"),
        engine.max_texture_dimension(),
    );
    let cubemap = engine.load_cubemap(&faces);
    let skybox = engine.load_model(&ModelData::skybox());

    let mut load = |relative: &str| -> Result<_, InitError> {
        let data = ModelData::load(&settings.asset(relative))?;
        Ok(engine.load_model(&data))
    };
    let floor = load("floor/floor.obj")?;
    let player = load("quake/player.obj")?;
    let monkey = load("blender/monkey.obj")?;
    let cube = load("blender/cube.obj")?;

    Ok(SceneHandles {
        skybox_shader,
        lit_shader,
        tessellation_shader,
        skybox,
        cubemap,
        floor,
        player,
        monkey,
        cube,
    })
}

/// Everything that needs a live GPU device.
struct GpuState {
    engine: RenderEngine,
    ui: UiManager,
    composer: SceneComposer,
}

struct AppState {
    settings: AppSettings,
    context: AppContext,
    // dropped before the window it renders into
    gpu: Option<GpuState>,
    window: Option<Arc<Window>>,
    init_error: Option<InitError>,
}

/// Windowed application running the tessellation scene.
pub struct TesseraApp {
    event_loop: EventLoop<()>,
    state: AppState,
}

impl TesseraApp {
    pub fn new(settings: AppSettings) -> Result<Self, InitError> {
        let event_loop = EventLoop::new()?;
        let viewport = (settings.width, settings.height);
        Ok(Self {
            event_loop,
            state: AppState {
                settings,
                context: AppContext::new(viewport),
                gpu: None,
                window: None,
                init_error: None,
            },
        })
    }

    /// Runs until the window closes. Initialisation failures inside the
    /// event loop are returned once it has stopped.
    pub fn run(mut self) -> Result<(), InitError> {
        self.event_loop.set_control_flow(ControlFlow::Poll);
        self.event_loop.run_app(&mut self.state)?;

        match self.state.init_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn init_gpu(&self, window: &Arc<Window>) -> Result<GpuState, InitError> {
        let (width, height) = window.inner_size().into();
        let mut engine = pollster::block_on(RenderEngine::new(window.clone(), width, height))?;
        log::info!("Surface format: {:?}", engine.surface_format());

        let handles = load_scene(&mut engine, &self.settings)?;
        let ui = UiManager::new(
            engine.device(),
            engine.queue(),
            engine.surface_format(),
            window,
        );

        Ok(GpuState {
            engine,
            ui,
            composer: SceneComposer::new(handles),
        })
    }

    fn apply(&mut self, action: RouterAction, event_loop: &ActiveEventLoop) {
        match action {
            RouterAction::None => {}
            RouterAction::Exit => event_loop.exit(),
            RouterAction::SetCursorMode(mode) => {
                if let Some(window) = self.window.as_ref() {
                    apply_cursor_mode(window, mode);
                }
            }
            RouterAction::Resize(width, height) => {
                log::debug!("Resized to {width}x{height}");
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.engine.resize(width, height);
                }
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(gpu)) = (self.window.as_ref(), self.gpu.as_mut()) else {
            return;
        };
        let context = &mut self.context;

        context.advance();
        gpu.composer.compose(
            gpu.engine.begin_frame(),
            &context.camera,
            &context.config,
            context.viewport,
        );

        gpu.ui.tick();
        let paused = context.router.is_paused();
        if paused {
            let framerate = gpu.ui.framerate();
            let config = &mut context.config;
            gpu.ui
                .update_logic(window, |ui| settings_panel::draw(ui, config, framerate));
        }

        let ui = &mut gpu.ui;
        let result = gpu.engine.render_frame(|device, queue, encoder, view| {
            if paused {
                ui.render_display_only(device, queue, encoder, view);
            }
        });

        // a skipped or failed frame never reaches the UI callback
        gpu.ui.discard_frame();

        match result {
            Ok(_) => {}
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(err) => log::warn!("Dropped frame: {err}"),
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(PhysicalSize::new(self.settings.width, self.settings.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.init_error = Some(err.into());
                event_loop.exit();
                return;
            }
        };

        match self.init_gpu(&window) {
            Ok(gpu) => {
                self.context.viewport = gpu.engine.get_surface_size();
                self.gpu = Some(gpu);
            }
            Err(err) => {
                self.init_error = Some(err);
                event_loop.exit();
                return;
            }
        }

        apply_cursor_mode(&window, self.context.router.cursor_mode());
        self.window = Some(window);
        log::info!("Scene ready, press Space for settings and Escape to quit");
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::RedrawRequested = event {
            self.redraw(event_loop);
            return;
        }

        if let (Some(window), Some(gpu)) = (self.window.as_ref(), self.gpu.as_mut()) {
            let ui_event: Event<()> = Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            gpu.ui.handle_input(window, &ui_event);
        }

        if let Some(input) = translate_window_event(&event) {
            let action = self.context.route(input);
            self.apply(action, event_loop);
        }
    }

    fn device_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            let action = self.context.mouse_motion(dx, dy);
            self.apply(action, event_loop);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("Shutting down");
        self.gpu = None;
        self.window = None;
    }
}
