//! Render pipeline management
//!
//! wgpu bakes depth comparison and polygon mode into the pipeline, so every
//! program gets one pipeline per state combination it is drawn with. Variants
//! are created lazily the first time a draw asks for them and cached for the
//! rest of the run.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::gfx::backend::{self, DrawMode, ShaderHandle};
use crate::gfx::resources::{texture_resource::TextureResource, vertex::Vertex3D};

/// Fixed-function state a pipeline variant is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader: ShaderHandle,
    pub depth_compare: backend::DepthCompare,
    pub polygon_mode: backend::PolygonMode,
}

/// Configuration of one shader program
///
/// Everything about a pipeline that does not vary per draw.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub draw_mode: DrawMode,
    pub cull_mode: Option<Face>,
    pub color_format: TextureFormat,
}

impl PipelineConfig {
    pub fn new(label: &str, color_format: TextureFormat, draw_mode: DrawMode) -> Self {
        Self {
            label: label.to_owned(),
            bind_group_layouts: Vec::new(),
            draw_mode,
            cull_mode: Some(Face::Back),
            color_format,
        }
    }

    /// Sets all bind group layouts at once (builder pattern)
    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }
}

struct Program {
    module: ShaderModule,
    config: PipelineConfig,
    layout: PipelineLayout,
}

/// Manages shader modules and their pipeline variants
pub struct PipelineManager {
    device: Arc<Device>,
    programs: Vec<Program>,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
    line_mode_supported: bool,
}

impl PipelineManager {
    /// `line_mode_supported` reflects `Features::POLYGON_MODE_LINE` on the device.
    pub fn new(device: Arc<Device>, line_mode_supported: bool) -> Self {
        Self {
            device,
            programs: Vec::new(),
            pipelines: HashMap::new(),
            line_mode_supported,
        }
    }

    /// Compiles a WGSL program and returns its handle.
    ///
    /// Handles are assigned in load order starting at zero.
    pub fn load_shader(&mut self, source: &str, config: PipelineConfig) -> ShaderHandle {
        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(&config.label),
            source: ShaderSource::Wgsl(source.into()),
        });

        let layout_refs: Vec<&BindGroupLayout> = config.bind_group_layouts.iter().collect();
        let layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &layout_refs,
                push_constant_ranges: &[],
            });

        self.programs.push(Program {
            module,
            config,
            layout,
        });
        ShaderHandle(self.programs.len() as u32 - 1)
    }

    /// Gets or creates the pipeline variant for `key`.
    pub fn get_pipeline(&mut self, key: PipelineKey) -> Option<&RenderPipeline> {
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(key)?;
            self.pipelines.insert(key, pipeline);
        }
        self.pipelines.get(&key)
    }

    /// Pipeline variant for `key`, if it has already been created.
    pub fn cached_pipeline(&self, key: PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(&key)
    }

    fn create_pipeline(&self, key: PipelineKey) -> Option<RenderPipeline> {
        let Some(program) = self.programs.get(key.shader.0 as usize) else {
            log::error!("Failed to create pipeline: shader {:?} not found", key.shader);
            return None;
        };
        let config = &program.config;

        let polygon_mode = match key.polygon_mode {
            backend::PolygonMode::Fill => PolygonMode::Fill,
            backend::PolygonMode::Line if self.line_mode_supported => PolygonMode::Line,
            backend::PolygonMode::Line => {
                log::warn!("Wireframe is not supported by this device, drawing filled");
                PolygonMode::Fill
            }
        };
        let depth_compare = match key.depth_compare {
            backend::DepthCompare::Less => CompareFunction::Less,
            backend::DepthCompare::LessEqual => CompareFunction::LessEqual,
        };

        // patch programs fetch their vertices from storage buffers
        let vertex_layouts = [Vertex3D::desc()];
        let vertex_buffers: &[VertexBufferLayout] = match config.draw_mode {
            DrawMode::Triangles => &vertex_layouts,
            DrawMode::Patches { .. } => &[],
        };

        log::debug!(
            "Creating pipeline '{}' ({:?}, {:?}), {} cached",
            config.label,
            key.depth_compare,
            key.polygon_mode,
            self.pipelines.len()
        );

        let pipeline = self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&program.layout),
                vertex: VertexState {
                    module: &program.module,
                    entry_point: Some("vs_main"),
                    buffers: vertex_buffers,
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: &program.module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(ColorTargetState {
                        format: config.color_format,
                        blend: Some(BlendState::REPLACE),
                        write_mask: ColorWrites::ALL,
                    })],
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(DepthStencilState {
                    format: TextureResource::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare,
                    stencil: StencilState::default(),
                    bias: DepthBiasState::default(),
                }),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        Some(pipeline)
    }
}
