//! Per-frame scene composition
//!
//! Issues the fixed draw sequence for one frame: skybox, floor, then the
//! tessellated models. All uniform state is re-specified every frame so a
//! frame never depends on bindings left over from the previous one.

use cgmath::{Matrix4, Vector3};

use crate::config::RenderConfig;
use crate::gfx::{
    backend::{CubemapHandle, DepthCompare, ModelHandle, PolygonMode, RenderBackend, ShaderHandle},
    camera::{normal_matrix, Camera, FrameMatrices},
};

/// Texture unit the skybox program samples its cubemap from.
pub const SKYBOX_TEXTURE_UNIT: u32 = 0;
/// Texture unit lit programs sample reflections from.
pub const ENVIRONMENT_TEXTURE_UNIT: u32 = 4;

/// GPU handles the composer draws with, all created during initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneHandles {
    pub skybox_shader: ShaderHandle,
    pub lit_shader: ShaderHandle,
    pub tessellation_shader: ShaderHandle,
    pub skybox: ModelHandle,
    pub cubemap: CubemapHandle,
    pub floor: ModelHandle,
    pub player: ModelHandle,
    pub monkey: ModelHandle,
    pub cube: ModelHandle,
}

/// Translation followed by (possibly non-uniform) scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn uniform(translation: Vector3<f32>, scale: f32) -> Self {
        Self {
            translation,
            scale: Vector3::new(scale, scale, scale),
        }
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// Composes frames from camera and configuration state.
pub struct SceneComposer {
    handles: SceneHandles,
    floor: Placement,
    tessellated: [(ModelHandle, Placement); 3],
}

impl SceneComposer {
    pub fn new(handles: SceneHandles) -> Self {
        Self {
            handles,
            floor: Placement::identity(),
            tessellated: [
                (
                    handles.player,
                    Placement::uniform(Vector3::new(0.0, 0.5, 0.0), 0.25),
                ),
                (
                    handles.monkey,
                    Placement::uniform(Vector3::new(1.0, 0.5, 0.0), 0.25),
                ),
                (
                    handles.cube,
                    Placement::uniform(Vector3::new(-1.0, 0.5, 0.0), 0.25),
                ),
            ],
        }
    }

    pub fn handles(&self) -> &SceneHandles {
        &self.handles
    }

    /// Issues the complete command sequence for one frame.
    pub fn compose<B: RenderBackend>(
        &self,
        backend: &mut B,
        camera: &Camera,
        config: &RenderConfig,
        viewport: (u32, u32),
    ) {
        let matrices = FrameMatrices::new(camera, viewport);

        backend.set_polygon_mode(if config.wireframe {
            PolygonMode::Line
        } else {
            PolygonMode::Fill
        });

        self.draw_skybox(backend, &matrices);
        self.draw_floor(backend, camera, config, &matrices);
        self.draw_tessellated(backend, camera, config, &matrices);
    }

    fn draw_skybox<B: RenderBackend>(&self, backend: &mut B, matrices: &FrameMatrices) {
        // the skybox sits exactly on the far plane, equal to the cleared depth
        backend.set_depth_compare(DepthCompare::LessEqual);

        backend.use_shader(self.handles.skybox_shader);
        backend.set_mat4("projection", matrices.projection);
        backend.set_mat4("view", matrices.view);
        backend.set_int("skybox", SKYBOX_TEXTURE_UNIT as i32);
        backend.bind_cubemap(SKYBOX_TEXTURE_UNIT, self.handles.cubemap);
        backend.draw_model(self.handles.skybox);

        backend.set_depth_compare(DepthCompare::Less);
    }

    fn draw_floor<B: RenderBackend>(
        &self,
        backend: &mut B,
        camera: &Camera,
        config: &RenderConfig,
        matrices: &FrameMatrices,
    ) {
        backend.use_shader(self.handles.lit_shader);
        self.push_shared_uniforms(backend, camera, config, matrices);

        push_model_transform(backend, &self.floor.model_matrix());
        backend.draw_model(self.handles.floor);
    }

    fn draw_tessellated<B: RenderBackend>(
        &self,
        backend: &mut B,
        camera: &Camera,
        config: &RenderConfig,
        matrices: &FrameMatrices,
    ) {
        backend.use_shader(self.handles.tessellation_shader);
        self.push_shared_uniforms(backend, camera, config, matrices);

        backend.set_float("tessellationLevel", config.tessellation_level);
        backend.set_float("displacementFactor", config.displacement_factor);

        for (model, placement) in &self.tessellated {
            push_model_transform(backend, &placement.model_matrix());
            backend.draw_model(*model);
        }
    }

    /// Lighting, material, camera and environment state every lit program needs.
    fn push_shared_uniforms<B: RenderBackend>(
        &self,
        backend: &mut B,
        camera: &Camera,
        config: &RenderConfig,
        matrices: &FrameMatrices,
    ) {
        backend.set_vec3("ambientLightColor", config.ambient_radiance().into());
        backend.set_vec3("lightDirection", config.light_direction.into());
        backend.set_vec3("lightColor", config.light_radiance().into());

        backend.set_float("ambientOcclusionMix", config.ambient_occlusion_mix);
        backend.set_float("normalMappingMix", config.normal_mapping_mix);
        backend.set_float("reflectionMix", config.reflection_mix);
        backend.set_float("specularExponent", config.specular_exponent);

        backend.set_mat4("projection", matrices.projection);
        backend.set_vec3("viewPosition", camera.position);
        backend.set_mat4("view", matrices.view);

        backend.set_int("skybox", ENVIRONMENT_TEXTURE_UNIT as i32);
        backend.bind_cubemap(ENVIRONMENT_TEXTURE_UNIT, self.handles.cubemap);
    }
}

fn push_model_transform<B: RenderBackend>(backend: &mut B, model: &Matrix4<f32>) {
    backend.set_mat4("model", *model);
    backend.set_mat3("modelInvTra", normal_matrix(model));
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::{
        recording::{Command, RecordingBackend},
        Uniform,
    };
    use crate::gfx::camera::camera_utils::upper_3x3;
    use cgmath::SquareMatrix;

    fn handles() -> SceneHandles {
        SceneHandles {
            skybox_shader: ShaderHandle(0),
            lit_shader: ShaderHandle(1),
            tessellation_shader: ShaderHandle(2),
            skybox: ModelHandle(0),
            cubemap: CubemapHandle(0),
            floor: ModelHandle(1),
            player: ModelHandle(2),
            monkey: ModelHandle(3),
            cube: ModelHandle(4),
        }
    }

    fn compose_once(config: &RenderConfig) -> Vec<Command> {
        let composer = SceneComposer::new(handles());
        let camera = Camera::new(Vector3::new(0.0, 1.6, 5.0));
        let mut backend = RecordingBackend::default();
        composer.compose(&mut backend, &camera, config, (1280, 720));
        backend.take()
    }

    fn uniform<'a>(commands: &'a [Command], name: &str) -> Vec<&'a Uniform> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::SetUniform(n, value) if n == name => Some(value),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_draw_order() {
        let commands = compose_once(&RenderConfig::default());
        let draws: Vec<ModelHandle> = commands
            .iter()
            .filter_map(|c| match c {
                Command::DrawModel(m) => Some(*m),
                _ => None,
            })
            .collect();

        assert_eq!(
            draws,
            vec![
                ModelHandle(0),
                ModelHandle(1),
                ModelHandle(2),
                ModelHandle(3),
                ModelHandle(4)
            ]
        );
    }

    #[test]
    fn test_skybox_depth_compare_is_relaxed_then_restored() {
        let commands = compose_once(&RenderConfig::default());

        let relax = commands
            .iter()
            .position(|c| *c == Command::DepthCompare(DepthCompare::LessEqual))
            .expect("skybox relaxes depth compare");
        let skybox_draw = commands
            .iter()
            .position(|c| *c == Command::DrawModel(ModelHandle(0)))
            .expect("skybox drawn");
        let restore = commands
            .iter()
            .position(|c| *c == Command::DepthCompare(DepthCompare::Less))
            .expect("depth compare restored");
        let floor_draw = commands
            .iter()
            .position(|c| *c == Command::DrawModel(ModelHandle(1)))
            .expect("floor drawn");

        assert!(relax < skybox_draw);
        assert!(skybox_draw < restore);
        assert!(restore < floor_draw);
        assert!(commands[relax..skybox_draw].contains(&Command::BindCubemap(0, CubemapHandle(0))));
    }

    #[test]
    fn test_every_program_receives_uniforms_before_drawing() {
        let commands = compose_once(&RenderConfig::default());
        let lit_required = [
            "ambientLightColor",
            "lightDirection",
            "lightColor",
            "ambientOcclusionMix",
            "normalMappingMix",
            "reflectionMix",
            "specularExponent",
            "projection",
            "viewPosition",
            "view",
            "model",
            "modelInvTra",
        ];

        let mut current = None;
        let mut pushed: Vec<&str> = Vec::new();
        for command in &commands {
            match command {
                Command::UseShader(shader) => {
                    current = Some(*shader);
                    pushed.clear();
                }
                Command::SetUniform(name, _) => pushed.push(name),
                Command::DrawModel(_) => {
                    let required: &[&str] = match current {
                        Some(ShaderHandle(0)) => &["projection", "view", "skybox"],
                        Some(ShaderHandle(1)) => &lit_required,
                        Some(ShaderHandle(2)) => &lit_required,
                        other => panic!("draw with unexpected program {other:?}"),
                    };
                    for name in required {
                        assert!(pushed.contains(name), "{name} missing before draw");
                    }
                    if current == Some(ShaderHandle(2)) {
                        assert!(pushed.contains(&"tessellationLevel"));
                        assert!(pushed.contains(&"displacementFactor"));
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_composition_is_idempotent() {
        let config = RenderConfig::default();
        let first = compose_once(&config);
        let second = compose_once(&config);
        assert_eq!(first, second);

        let composer = SceneComposer::new(handles());
        let camera = Camera::new(Vector3::new(0.0, 1.6, 5.0));
        let mut backend = RecordingBackend::default();
        composer.compose(&mut backend, &camera, &config, (800, 600));
        let a = backend.take();
        composer.compose(&mut backend, &camera, &config, (800, 600));
        let b = backend.take();
        assert_eq!(a, b);
    }

    #[test]
    fn test_each_model_gets_its_own_normal_matrix() {
        let commands = compose_once(&RenderConfig::default());
        let models = uniform(&commands, "model");
        let normals = uniform(&commands, "modelInvTra");
        assert_eq!(models.len(), 4);
        assert_eq!(normals.len(), 4);

        for (model, normal) in models.iter().zip(&normals) {
            match (model, normal) {
                (Uniform::Mat4(m), Uniform::Mat3(n)) => assert_eq!(*n, normal_matrix(m)),
                other => panic!("unexpected uniform kinds {other:?}"),
            }
        }

        // floor is identity, player sits above the origin at quarter scale
        assert_eq!(*models[0], Uniform::Mat4(Matrix4::identity()));
        let player = Placement::uniform(Vector3::new(0.0, 0.5, 0.0), 0.25).model_matrix();
        assert_eq!(*models[1], Uniform::Mat4(player));
    }

    #[test]
    fn test_nonuniform_placement_corrects_normals() {
        let placement = Placement {
            translation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(2.0, 0.5, 1.0),
        };
        let model = placement.model_matrix();
        assert_ne!(normal_matrix(&model), upper_3x3(&model));
    }

    #[test]
    fn test_config_values_reach_uniforms() {
        let config = RenderConfig {
            tessellation_level: 17.0,
            displacement_factor: 0.4,
            ambient_light_intensity: 0.5,
            ..RenderConfig::default()
        };
        let commands = compose_once(&config);

        assert_eq!(uniform(&commands, "tessellationLevel"), vec![&Uniform::Float(17.0)]);
        assert_eq!(uniform(&commands, "displacementFactor"), vec![&Uniform::Float(0.4)]);
        for ambient in uniform(&commands, "ambientLightColor") {
            assert_eq!(*ambient, Uniform::Vec3(Vector3::new(0.5, 0.5, 0.5)));
        }
    }

    #[test]
    fn test_wireframe_is_respecified_each_frame() {
        let wire = compose_once(&RenderConfig {
            wireframe: true,
            ..RenderConfig::default()
        });
        assert_eq!(wire[0], Command::PolygonMode(PolygonMode::Line));

        let fill = compose_once(&RenderConfig::default());
        assert_eq!(fill[0], Command::PolygonMode(PolygonMode::Fill));
    }

    #[test]
    fn test_lit_programs_sample_environment_unit() {
        let commands = compose_once(&RenderConfig::default());
        let units = uniform(&commands, "skybox");
        assert_eq!(
            units,
            vec![
                &Uniform::Int(SKYBOX_TEXTURE_UNIT as i32),
                &Uniform::Int(ENVIRONMENT_TEXTURE_UNIT as i32),
                &Uniform::Int(ENVIRONMENT_TEXTURE_UNIT as i32),
            ]
        );
    }
}
