//! Immediate-mode backend calls turned into a replayable draw list
//!
//! [`FrameRecorder`] implements [`RenderBackend`] without touching the GPU.
//! Each program keeps its own [`UniformBlock`], so uniform writes persist
//! across draws and frames exactly like a bound program's state. A draw
//! snapshots the bound program's block into the frame's [`UniformArena`] and
//! records the fixed-function state in effect, which the render engine later
//! replays inside a single render pass.

use std::collections::HashMap;

use crate::gfx::backend::{
    CubemapHandle, DepthCompare, DrawMode, ModelHandle, PolygonMode, RenderBackend, ShaderHandle,
    Uniform,
};
use crate::wgpu_utils::UniformArena;

use super::shaders::TESSELLATION_SEGMENTS;
use super::uniform_layout::{UniformBlock, UniformLayout};

/// Sampler uniform that selects the environment cubemap.
pub const ENVIRONMENT_SAMPLER: &str = "skybox";
/// Upper bound on per-edge subdivision of a patch.
pub const MAX_TESSELLATION_SEGMENTS: u32 = 64;

/// Per-edge subdivision for a tessellation level: rounded half up and
/// clamped to `1..=MAX_TESSELLATION_SEGMENTS`. Non-finite levels give 1.
pub fn tessellation_segments(level: f32) -> u32 {
    if !level.is_finite() {
        return 1;
    }
    (level + 0.5)
        .floor()
        .clamp(1.0, MAX_TESSELLATION_SEGMENTS as f32) as u32
}

/// One recorded draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedDraw {
    pub shader: ShaderHandle,
    pub model: ModelHandle,
    pub draw_mode: DrawMode,
    pub depth_compare: DepthCompare,
    pub polygon_mode: PolygonMode,
    /// Dynamic offset of this draw's uniform snapshot.
    pub uniform_offset: u32,
    /// Cubemap bound to the program's environment sampler unit.
    pub environment: Option<CubemapHandle>,
    /// Subdivisions per patch edge; 1 for triangle programs.
    pub segments: u32,
}

struct Program {
    block: UniformBlock,
    draw_mode: DrawMode,
}

pub struct FrameRecorder {
    programs: Vec<Program>,
    current: Option<ShaderHandle>,
    depth_compare: DepthCompare,
    polygon_mode: PolygonMode,
    texture_units: HashMap<u32, CubemapHandle>,
    arena: UniformArena,
    draws: Vec<RecordedDraw>,
    viewport: (u32, u32),
}

impl FrameRecorder {
    /// `slot_size` must cover the largest program uniform struct.
    pub fn new(slot_size: u32, uniform_alignment: u32, viewport: (u32, u32)) -> Self {
        Self {
            programs: Vec::new(),
            current: None,
            depth_compare: DepthCompare::default(),
            polygon_mode: PolygonMode::default(),
            texture_units: HashMap::new(),
            arena: UniformArena::new(slot_size, uniform_alignment),
            draws: Vec::new(),
            viewport,
        }
    }

    pub fn register_program(&mut self, layout: UniformLayout, draw_mode: DrawMode) -> ShaderHandle {
        if layout.size() > self.arena.slot_size() {
            log::warn!(
                "Uniform struct of {} bytes exceeds the {} byte slot",
                layout.size(),
                self.arena.slot_size()
            );
        }
        self.programs.push(Program {
            block: UniformBlock::new(layout),
            draw_mode,
        });
        ShaderHandle(self.programs.len() as u32 - 1)
    }

    /// Drops last frame's draws. Program uniforms and fixed-function state
    /// are kept.
    pub fn begin_frame(&mut self) {
        self.arena.clear();
        self.draws.clear();
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn uniform_arena(&self) -> &UniformArena {
        &self.arena
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn program_mut(&mut self, shader: ShaderHandle) -> Option<&mut Program> {
        self.programs.get_mut(shader.0 as usize)
    }
}

impl RenderBackend for FrameRecorder {
    fn use_shader(&mut self, shader: ShaderHandle) {
        if self.program_mut(shader).is_none() {
            log::error!("Unknown shader program {:?}", shader);
            self.current = None;
            return;
        }
        self.current = Some(shader);
    }

    fn set_uniform(&mut self, name: &str, value: Uniform) {
        let Some(shader) = self.current else {
            log::warn!("Uniform '{}' set with no program bound", name);
            return;
        };
        if let Some(program) = self.program_mut(shader) {
            program.block.set(name, value);
        }
    }

    fn set_depth_compare(&mut self, compare: DepthCompare) {
        self.depth_compare = compare;
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
    }

    fn bind_cubemap(&mut self, unit: u32, cubemap: CubemapHandle) {
        self.texture_units.insert(unit, cubemap);
    }

    fn draw_model(&mut self, model: ModelHandle) {
        let Some(shader) = self.current else {
            log::warn!("Draw of {:?} with no program bound", model);
            return;
        };
        let texture_units = &self.texture_units;
        let Some(program) = self.programs.get_mut(shader.0 as usize) else {
            return;
        };

        let segments = match program.draw_mode {
            DrawMode::Triangles => 1,
            DrawMode::Patches { .. } => {
                let level = program.block.float("tessellationLevel").unwrap_or(1.0);
                let segments = tessellation_segments(level);
                program
                    .block
                    .set(TESSELLATION_SEGMENTS, Uniform::Int(segments as i32));
                segments
            }
        };

        let environment = program
            .block
            .sampler_unit(ENVIRONMENT_SAMPLER)
            .and_then(|unit| u32::try_from(unit).ok())
            .and_then(|unit| texture_units.get(&unit).copied());

        let uniform_offset = self.arena.push(program.block.bytes());
        self.draws.push(RecordedDraw {
            shader,
            model,
            draw_mode: program.draw_mode,
            depth_compare: self.depth_compare,
            polygon_mode: self.polygon_mode,
            uniform_offset,
            environment,
            segments,
        });
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::gfx::backend::CubemapHandle;
    use crate::gfx::camera::Camera;
    use crate::gfx::composer::{SceneComposer, SceneHandles};
    use crate::gfx::rendering::shaders::{ShaderDesc, SKYBOX_UNIFORMS};

    fn recorder_with_scene() -> (FrameRecorder, SceneComposer) {
        let mut recorder = FrameRecorder::new(320, 256, (800, 600));
        let skybox = ShaderDesc::skybox();
        let lit = ShaderDesc::lit();
        let tessellated = ShaderDesc::tessellated();

        let handles = SceneHandles {
            skybox_shader: recorder.register_program(skybox.uniforms, skybox.draw_mode),
            lit_shader: recorder.register_program(lit.uniforms, lit.draw_mode),
            tessellation_shader: recorder
                .register_program(tessellated.uniforms, tessellated.draw_mode),
            skybox: ModelHandle(0),
            cubemap: CubemapHandle(0),
            floor: ModelHandle(1),
            player: ModelHandle(2),
            monkey: ModelHandle(3),
            cube: ModelHandle(4),
        };
        (recorder, SceneComposer::new(handles))
    }

    fn float_at(recorder: &FrameRecorder, draw: &RecordedDraw, offset: usize) -> f32 {
        let start = draw.uniform_offset as usize + offset;
        bytemuck::pod_read_unaligned(&recorder.uniform_arena().bytes()[start..start + 4])
    }

    #[test]
    fn test_segments_round_half_up_and_clamp() {
        assert_eq!(tessellation_segments(2.0), 2);
        assert_eq!(tessellation_segments(2.5), 3);
        assert_eq!(tessellation_segments(3.49), 3);
        assert_eq!(tessellation_segments(0.2), 1);
        assert_eq!(tessellation_segments(-4.0), 1);
        assert_eq!(tessellation_segments(1000.0), MAX_TESSELLATION_SEGMENTS);
        assert_eq!(tessellation_segments(f32::NAN), 1);
        assert_eq!(tessellation_segments(f32::INFINITY), 1);
    }

    #[test]
    fn test_composed_frame_records_five_draws() {
        let (mut recorder, composer) = recorder_with_scene();
        let handles = *composer.handles();
        recorder.begin_frame();
        composer.compose(&mut recorder, &Camera::default(), &RenderConfig::default(), (800, 600));

        let draws = recorder.draws();
        let models: Vec<ModelHandle> = draws.iter().map(|d| d.model).collect();
        assert_eq!(
            models,
            vec![handles.skybox, handles.floor, handles.player, handles.monkey, handles.cube]
        );
        assert_eq!(draws[0].depth_compare, DepthCompare::LessEqual);
        assert!(draws[1..].iter().all(|d| d.depth_compare == DepthCompare::Less));
        assert!(draws.iter().all(|d| d.environment == Some(handles.cubemap)));
    }

    #[test]
    fn test_each_draw_gets_its_own_uniform_snapshot() {
        let (mut recorder, composer) = recorder_with_scene();
        recorder.begin_frame();
        composer.compose(&mut recorder, &Camera::default(), &RenderConfig::default(), (800, 600));

        let draws = recorder.draws().to_vec();
        let offsets: Vec<u32> = draws.iter().map(|d| d.uniform_offset).collect();
        assert_eq!(offsets, vec![0, 512, 1024, 1536, 2048]);

        // model translation x lives at byte 128 + 48
        let xs: Vec<f32> = draws[2..]
            .iter()
            .map(|d| float_at(&recorder, d, 128 + 48))
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_patch_draws_carry_segment_count() {
        let (mut recorder, composer) = recorder_with_scene();
        let config = RenderConfig {
            tessellation_level: 7.6,
            ..RenderConfig::default()
        };
        recorder.begin_frame();
        composer.compose(&mut recorder, &Camera::default(), &config, (800, 600));

        let draws = recorder.draws().to_vec();
        assert_eq!(draws[1].segments, 1);
        for draw in &draws[2..] {
            assert_eq!(draw.segments, 8);
            let start = draw.uniform_offset as usize + 312;
            let segments: i32 =
                bytemuck::pod_read_unaligned(&recorder.uniform_arena().bytes()[start..start + 4]);
            assert_eq!(segments, 8);
        }
    }

    #[test]
    fn test_begin_frame_keeps_program_state() {
        let (mut recorder, composer) = recorder_with_scene();
        recorder.begin_frame();
        composer.compose(&mut recorder, &Camera::default(), &RenderConfig::default(), (800, 600));
        let first: Vec<u8> = recorder.uniform_arena().bytes().to_vec();

        recorder.begin_frame();
        assert!(recorder.draws().is_empty());
        assert!(recorder.uniform_arena().is_empty());

        composer.compose(&mut recorder, &Camera::default(), &RenderConfig::default(), (800, 600));
        assert_eq!(recorder.uniform_arena().bytes(), first.as_slice());
    }

    #[test]
    fn test_wireframe_reaches_every_draw() {
        let (mut recorder, composer) = recorder_with_scene();
        let config = RenderConfig {
            wireframe: true,
            ..RenderConfig::default()
        };
        recorder.begin_frame();
        composer.compose(&mut recorder, &Camera::default(), &config, (800, 600));
        assert!(recorder
            .draws()
            .iter()
            .all(|d| d.polygon_mode == PolygonMode::Line));
    }

    #[test]
    fn test_draw_without_program_is_dropped() {
        let mut recorder = FrameRecorder::new(128, 256, (1, 1));
        recorder.draw_model(ModelHandle(0));
        recorder.use_shader(ShaderHandle(3));
        recorder.draw_model(ModelHandle(0));
        assert!(recorder.draws().is_empty());
    }

    #[test]
    fn test_environment_follows_sampler_unit() {
        let mut recorder = FrameRecorder::new(128, 256, (1, 1));
        let shader = recorder.register_program(
            UniformLayout::new(SKYBOX_UNIFORMS),
            DrawMode::Triangles,
        );
        recorder.use_shader(shader);
        recorder.bind_cubemap(0, CubemapHandle(7));
        recorder.bind_cubemap(4, CubemapHandle(9));

        recorder.draw_model(ModelHandle(0));
        recorder.set_int("skybox", 4);
        recorder.draw_model(ModelHandle(0));

        let environments: Vec<_> = recorder.draws().iter().map(|d| d.environment).collect();
        assert_eq!(environments, vec![None, Some(CubemapHandle(9))]);
    }

    #[test]
    fn test_viewport_is_tracked() {
        let mut recorder = FrameRecorder::new(128, 256, (800, 600));
        recorder.set_viewport(1024, 768);
        assert_eq!(recorder.viewport(), (1024, 768));
    }
}
