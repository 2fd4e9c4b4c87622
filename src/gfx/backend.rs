//! The boundary between scene composition and the GPU
//!
//! The scene composer only ever talks to a [`RenderBackend`]: it binds shader
//! programs by handle, pushes named uniforms into the bound program, toggles
//! the little fixed-function state it needs and asks models to draw
//! themselves. Handles are created during initialisation and stay valid for
//! the lifetime of the backend.

use cgmath::{Matrix3, Matrix4, Vector3};

/// Shader program handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u32);

/// Loaded model (one or more meshes with materials).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelHandle(pub u32);

/// Six-face cubemap texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubemapHandle(pub u32);

/// Primitive assembly used by a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Triangles,
    /// Tessellation input: fixed-size patches of `vertices` control points.
    Patches { vertices: u32 },
}

/// Depth test comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthCompare {
    #[default]
    Less,
    LessEqual,
}

/// Rasterisation fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

/// A value pushed into a named uniform of the bound program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec3(Vector3<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
}

/// GPU command interface used by the scene composer.
///
/// Uniform writes go to the currently bound program and persist in that
/// program until overwritten, so every program must receive its uniforms
/// after it is bound and before it draws.
pub trait RenderBackend {
    /// Makes `shader` the current program.
    fn use_shader(&mut self, shader: ShaderHandle);

    /// Writes a uniform of the current program. Names the program does not
    /// declare are ignored.
    fn set_uniform(&mut self, name: &str, value: Uniform);

    fn set_depth_compare(&mut self, compare: DepthCompare);

    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Binds `cubemap` to texture unit `unit`.
    fn bind_cubemap(&mut self, unit: u32, cubemap: CubemapHandle);

    /// Draws every mesh of `model` with the current program and its draw mode.
    fn draw_model(&mut self, model: ModelHandle);

    /// Re-specifies the output rectangle after a framebuffer resize.
    fn set_viewport(&mut self, width: u32, height: u32);

    fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, Uniform::Int(value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, Uniform::Float(value));
    }

    fn set_vec3(&mut self, name: &str, value: Vector3<f32>) {
        self.set_uniform(name, Uniform::Vec3(value));
    }

    fn set_mat3(&mut self, name: &str, value: Matrix3<f32>) {
        self.set_uniform(name, Uniform::Mat3(value));
    }

    fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) {
        self.set_uniform(name, Uniform::Mat4(value));
    }
}

/// Test double that records every backend call in order.
#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Command {
        UseShader(ShaderHandle),
        SetUniform(String, Uniform),
        DepthCompare(DepthCompare),
        PolygonMode(PolygonMode),
        BindCubemap(u32, CubemapHandle),
        DrawModel(ModelHandle),
        Viewport(u32, u32),
    }

    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        pub commands: Vec<Command>,
    }

    impl RecordingBackend {
        pub fn take(&mut self) -> Vec<Command> {
            std::mem::take(&mut self.commands)
        }
    }

    impl RenderBackend for RecordingBackend {
        fn use_shader(&mut self, shader: ShaderHandle) {
            self.commands.push(Command::UseShader(shader));
        }

        fn set_uniform(&mut self, name: &str, value: Uniform) {
            self.commands.push(Command::SetUniform(name.to_string(), value));
        }

        fn set_depth_compare(&mut self, compare: DepthCompare) {
            self.commands.push(Command::DepthCompare(compare));
        }

        fn set_polygon_mode(&mut self, mode: PolygonMode) {
            self.commands.push(Command::PolygonMode(mode));
        }

        fn bind_cubemap(&mut self, unit: u32, cubemap: CubemapHandle) {
            self.commands.push(Command::BindCubemap(unit, cubemap));
        }

        fn draw_model(&mut self, model: ModelHandle) {
            self.commands.push(Command::DrawModel(model));
        }

        fn set_viewport(&mut self, width: u32, height: u32) {
            self.commands.push(Command::Viewport(width, height));
        }
    }
}
