//! WGPU-based rendering engine
//!
//! Owns the surface, device and every GPU resource of the scene. The scene
//! composer draws into the engine's [`FrameRecorder`]; [`RenderEngine::render_frame`]
//! then uploads the recorded uniform snapshots and replays the draws in one
//! render pass, followed by an optional UI overlay.

use std::sync::Arc;
use wgpu::TextureFormat;

use crate::error::InitError;
use crate::gfx::{
    backend::{CubemapHandle, DrawMode, ModelHandle, RenderBackend, ShaderHandle},
    resources::{
        bindings::BindingLayouts, cubemap::CubemapFaces, model::GpuModel, model::ModelData,
        texture_resource::TextureResource,
    },
};
use crate::wgpu_utils::DynamicUniformBuffer;

use super::frame_recorder::{FrameRecorder, RecordedDraw};
use super::pipeline_manager::{PipelineConfig, PipelineKey, PipelineManager};
use super::shaders::ShaderDesc;

/// Size of the largest uniform struct any program declares.
pub const UNIFORM_SLOT_SIZE: u32 = 320;

/// Background behind the skybox, visible only where no face was loaded.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.3,
    g: 0.3,
    b: 0.3,
    a: 1.0,
};

/// Result of presenting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The surface was lost or outdated and has been reconfigured.
    Skipped,
}

struct ProgramInfo {
    uses_material: bool,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pipeline_manager: PipelineManager,
    layouts: BindingLayouts,
    recorder: FrameRecorder,
    uniform_buffer: DynamicUniformBuffer,
    uniform_bind_group: wgpu::BindGroup,
    programs: Vec<ProgramInfo>,
    models: Vec<GpuModel>,
    environments: Vec<wgpu::BindGroup>,
    fallback_environment: wgpu::BindGroup,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// Requests line polygon mode when the adapter offers it, for wireframe.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<RenderEngine, InitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let info = adapter.get_info();
        log::info!("Using adapter: {} ({:?})", info.name, info.backend);

        let line_mode_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        if !line_mode_supported {
            log::warn!("Adapter lacks POLYGON_MODE_LINE, wireframe will draw filled");
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: if line_mode_supported {
                    wgpu::Features::POLYGON_MODE_LINE
                } else {
                    wgpu::Features::empty()
                },
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(InitError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let layouts = BindingLayouts::new(&device, UNIFORM_SLOT_SIZE);
        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment;
        let recorder = FrameRecorder::new(
            UNIFORM_SLOT_SIZE,
            uniform_alignment,
            (config.width, config.height),
        );
        let uniform_buffer = DynamicUniformBuffer::new(&device, UNIFORM_SLOT_SIZE, 16 * 1024);
        let uniform_bind_group = layouts.uniform_bind_group(&device, &uniform_buffer);

        // sampled by draws whose sampler unit has no cubemap bound
        let fallback_cubemap = TextureResource::create_cubemap(
            &device,
            &queue,
            &CubemapFaces::solid([0, 0, 0, 255]),
            "Fallback Cubemap",
        );
        let fallback_environment = layouts.environment_bind_group(&device, &fallback_cubemap);

        let pipeline_manager = PipelineManager::new(device.clone(), line_mode_supported);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            format,
            pipeline_manager,
            layouts,
            recorder,
            uniform_buffer,
            uniform_bind_group,
            programs: Vec::new(),
            models: Vec::new(),
            environments: Vec::new(),
            fallback_environment,
        })
    }

    /// Compiles a program and registers its uniforms with the recorder.
    pub fn create_shader(&mut self, desc: ShaderDesc) -> ShaderHandle {
        let mut layouts = vec![
            self.layouts.uniforms.clone(),
            self.layouts.environment.clone(),
        ];
        if desc.uses_material {
            layouts.push(self.layouts.material.clone());
        }
        if let DrawMode::Patches { .. } = desc.draw_mode {
            layouts.push(self.layouts.patch.clone());
        }

        let config = PipelineConfig::new(desc.label, self.format, desc.draw_mode)
            .with_bind_group_layouts(layouts);
        let handle = self.pipeline_manager.load_shader(&desc.source, config);
        let recorded = self.recorder.register_program(desc.uniforms, desc.draw_mode);
        debug_assert_eq!(handle, recorded);

        self.programs.push(ProgramInfo {
            uses_material: desc.uses_material,
        });
        log::info!("Created shader program '{}'", desc.label);
        handle
    }

    pub fn load_model(&mut self, data: &ModelData) -> ModelHandle {
        let model = GpuModel::upload(&self.device, &self.queue, &self.layouts, data);
        log::info!(
            "Loaded model {} ({} meshes, {} triangles)",
            data.path.display(),
            model.meshes.len(),
            data.triangle_count()
        );
        self.models.push(model);
        ModelHandle(self.models.len() as u32 - 1)
    }

    pub fn load_cubemap(&mut self, faces: &CubemapFaces) -> CubemapHandle {
        let texture = TextureResource::create_cubemap(&self.device, &self.queue, faces, "Cubemap");
        self.environments
            .push(self.layouts.environment_bind_group(&self.device, &texture));
        CubemapHandle(self.environments.len() as u32 - 1)
    }

    /// Backend the scene composer records the next frame into.
    pub fn begin_frame(&mut self) -> &mut FrameRecorder {
        self.recorder.begin_frame();
        &mut self.recorder
    }

    /// Replays the recorded frame and presents it.
    ///
    /// `ui_callback` renders on top of the scene into the same encoder.
    pub fn render_frame<F>(&mut self, ui_callback: F) -> Result<FrameStatus, wgpu::SurfaceError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(FrameStatus::Skipped);
            }
            Err(err) => return Err(err),
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if self
            .uniform_buffer
            .upload(&self.device, &self.queue, self.recorder.uniform_arena())
        {
            self.uniform_bind_group = self
                .layouts
                .uniform_bind_group(&self.device, &self.uniform_buffer);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // pipeline variants must exist before the pass borrows them
        let draws: Vec<RecordedDraw> = self.recorder.draws().to_vec();
        for draw in &draws {
            self.pipeline_manager.get_pipeline(pipeline_key(draw));
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let (width, height) = self.viewport();
            render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);

            for draw in &draws {
                self.replay(&mut render_pass, draw);
            }
        }

        ui_callback(
            &self.device,
            &self.queue,
            &mut encoder,
            &surface_texture_view,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(FrameStatus::Presented)
    }

    fn replay(&self, render_pass: &mut wgpu::RenderPass<'_>, draw: &RecordedDraw) {
        let Some(pipeline) = self.pipeline_manager.cached_pipeline(pipeline_key(draw)) else {
            return;
        };
        let Some(model) = self.models.get(draw.model.0 as usize) else {
            log::error!("Draw of unknown model {:?}", draw.model);
            return;
        };
        let uses_material = self
            .programs
            .get(draw.shader.0 as usize)
            .is_some_and(|program| program.uses_material);
        let environment = draw
            .environment
            .and_then(|cubemap| self.environments.get(cubemap.0 as usize))
            .unwrap_or(&self.fallback_environment);

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
        render_pass.set_bind_group(1, environment, &[]);

        for mesh in &model.meshes {
            if uses_material {
                render_pass.set_bind_group(2, &mesh.material_bind_group, &[]);
            }
            match draw.draw_mode {
                DrawMode::Triangles => {
                    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
                DrawMode::Patches { .. } => {
                    render_pass.set_bind_group(3, &mesh.patch_bind_group, &[]);
                    let vertices = 3 * draw.segments * draw.segments;
                    render_pass.draw(0..vertices, 0..mesh.triangle_count());
                }
            }
        }
    }

    /// Resizes the surface, depth buffer and viewport. Zero sizes
    /// (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;

        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
        self.recorder.set_viewport(width, height);
    }

    /// Output rectangle clamped to the current surface.
    fn viewport(&self) -> (u32, u32) {
        let (width, height) = self.recorder.viewport();
        (
            width.clamp(1, self.config.width),
            height.clamp(1, self.config.height),
        )
    }

    /// Returns current surface dimensions
    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Largest width or height a 2D or cube texture may have on this device.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the surface texture format
    ///
    /// Used for creating compatible render targets and UI systems.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

fn pipeline_key(draw: &RecordedDraw) -> PipelineKey {
    PipelineKey {
        shader: draw.shader,
        depth_compare: draw.depth_compare,
        polygon_mode: draw.polygon_mode,
    }
}
