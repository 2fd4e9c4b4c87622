//! ImGui integration for the settings overlay
//!
//! Wraps the imgui frames, the winit platform glue and the wgpu renderer so
//! the application only has to forward events and hand over an encoder.

use super::frames::UiFrames;
use imgui::MouseCursor;
use imgui_wgpu::{Renderer, RendererConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use wgpu::{CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::Window,
};

const FONT_SIZE: f32 = 24.0;

/// Settings overlay renderer
///
/// Input is fed through [`UiManager::handle_input`] and every frame is
/// timed with [`UiManager::tick`]. While paused a frame is built with
/// [`UiManager::update_logic`] and then either drawn over the scene with
/// [`UiManager::render_display_only`] or dropped with
/// [`UiManager::discard_frame`].
pub struct UiManager {
    frames: UiFrames,
    platform: WinitPlatform,
    renderer: Renderer,
    last_cursor: Option<MouseCursor>,
}

impl UiManager {
    /// Creates the UI for `window`, rendering into `output_color_format`.
    ///
    /// DPI is locked to 1.0 so panel sizes match framebuffer pixels.
    pub fn new(
        device: &Device,
        queue: &Queue,
        output_color_format: TextureFormat,
        window: &Window,
    ) -> Self {
        let mut frames = UiFrames::new(FONT_SIZE);

        let mut platform = WinitPlatform::new(frames.context_mut());
        platform.attach_window(
            frames.context_mut().io_mut(),
            window,
            HiDpiMode::Locked(1.0),
        );

        let renderer_config = RendererConfig {
            texture_format: output_color_format,
            ..Default::default()
        };
        let renderer = Renderer::new(frames.context_mut(), device, queue, renderer_config);

        Self {
            frames,
            platform,
            renderer,
            last_cursor: None,
        }
    }

    /// Feeds the pointer, keyboard, resize and focus events to ImGui.
    pub fn handle_input<T>(&mut self, window: &Window, event: &Event<T>) {
        let Event::WindowEvent {
            event: window_event,
            ..
        } = event
        else {
            return;
        };

        if matches!(
            window_event,
            WindowEvent::CursorMoved { .. }
                | WindowEvent::MouseInput { .. }
                | WindowEvent::MouseWheel { .. }
                | WindowEvent::KeyboardInput { .. }
                | WindowEvent::Resized(_)
                | WindowEvent::Focused(_)
        ) {
            self.platform
                .handle_event(self.frames.context_mut().io_mut(), window, event);
        }
    }

    pub fn tick(&mut self) {
        self.frames.tick();
    }

    /// Frames per second as averaged by ImGui.
    pub fn framerate(&self) -> f32 {
        self.frames.io().framerate
    }

    /// Starts a new ImGui frame and builds it with `run_ui`.
    pub fn update_logic<F>(&mut self, window: &Window, run_ui: F)
    where
        F: FnOnce(&imgui::Ui),
    {
        if let Err(err) = self
            .platform
            .prepare_frame(self.frames.context_mut().io_mut(), window)
        {
            log::warn!("Failed to prepare UI frame: {err}");
        }

        let ui: &imgui::Ui = self.frames.begin();
        run_ui(ui);

        if self.last_cursor != ui.mouse_cursor() {
            self.last_cursor = ui.mouse_cursor();
            self.platform.prepare_render(ui, window);
        }
    }

    /// Drops a frame built by [`UiManager::update_logic`] that will not be
    /// drawn.
    pub fn discard_frame(&mut self) {
        self.frames.discard();
    }

    /// Renders the frame built by the last [`UiManager::update_logic`].
    ///
    /// Loads the existing color attachment so the scene stays underneath.
    pub fn render_display_only(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        color_attachment: &TextureView,
    ) {
        let Some(draw_data) = self.frames.finish() else {
            return;
        };

        if draw_data.display_size[0] <= 0.0 || draw_data.display_size[1] <= 0.0 {
            return;
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("imgui_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_attachment,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Err(err) = self
            .renderer
            .render(draw_data, queue, device, &mut render_pass)
        {
            log::error!("Failed to render UI: {err}");
        }
    }
}
