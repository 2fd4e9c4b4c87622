//! Built-in shader programs
//!
//! Each program pairs its WGSL source with the uniform declarations of its
//! `@group(0)` struct, in struct order, and the primitive mode it draws with.

use crate::gfx::backend::DrawMode;

use super::uniform_layout::{UniformKind, UniformLayout};

pub const SKYBOX_SHADER: &str = include_str!("shaders/skybox.wgsl");
pub const LIGHTING_SHADER: &str = include_str!("shaders/lighting.wgsl");
pub const LIT_SHADER: &str = include_str!("shaders/lit.wgsl");
pub const TESSELLATED_SHADER: &str = include_str!("shaders/tessellated.wgsl");

/// Uniform name the frame recorder fills with the integer subdivision count
/// before every patch draw.
pub const TESSELLATION_SEGMENTS: &str = "tessellationSegments";

/// `SkyboxUniforms` in skybox.wgsl.
pub const SKYBOX_UNIFORMS: &[(&str, UniformKind)] = &[
    ("projection", UniformKind::Mat4),
    ("view", UniformKind::Mat4),
    ("skybox", UniformKind::Sampler),
];

/// `Uniforms` in lighting.wgsl, shared by the lit and tessellated programs.
pub const LIT_UNIFORMS: &[(&str, UniformKind)] = &[
    ("projection", UniformKind::Mat4),
    ("view", UniformKind::Mat4),
    ("model", UniformKind::Mat4),
    ("modelInvTra", UniformKind::Mat3),
    ("viewPosition", UniformKind::Vec3),
    ("specularExponent", UniformKind::Float),
    ("ambientLightColor", UniformKind::Vec3),
    ("ambientOcclusionMix", UniformKind::Float),
    ("lightDirection", UniformKind::Vec3),
    ("normalMappingMix", UniformKind::Float),
    ("lightColor", UniformKind::Vec3),
    ("reflectionMix", UniformKind::Float),
    ("tessellationLevel", UniformKind::Float),
    ("displacementFactor", UniformKind::Float),
    (TESSELLATION_SEGMENTS, UniformKind::Int),
    ("skybox", UniformKind::Sampler),
];

/// Everything needed to build one shader program.
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    pub label: &'static str,
    pub source: String,
    pub uniforms: UniformLayout,
    pub draw_mode: DrawMode,
    /// Whether the program samples the per-mesh material textures.
    pub uses_material: bool,
}

impl ShaderDesc {
    pub fn skybox() -> Self {
        Self {
            label: "Skybox Shader",
            source: SKYBOX_SHADER.to_owned(),
            uniforms: UniformLayout::new(SKYBOX_UNIFORMS),
            draw_mode: DrawMode::Triangles,
            uses_material: false,
        }
    }

    pub fn lit() -> Self {
        Self {
            label: "Lit Shader",
            source: format!("{LIGHTING_SHADER}\n{LIT_SHADER}"),
            uniforms: UniformLayout::new(LIT_UNIFORMS),
            draw_mode: DrawMode::Triangles,
            uses_material: true,
        }
    }

    pub fn tessellated() -> Self {
        Self {
            label: "Tessellation Shader",
            source: format!("{LIGHTING_SHADER}\n{TESSELLATED_SHADER}"),
            uniforms: UniformLayout::new(LIT_UNIFORMS),
            draw_mode: DrawMode::Patches { vertices: 3 },
            uses_material: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(layout: &UniformLayout, name: &str) -> Option<u32> {
        layout.field(name).and_then(|field| field.offset)
    }

    #[test]
    fn test_lit_layout_matches_wgsl_struct() {
        let layout = ShaderDesc::lit().uniforms;
        assert_eq!(offset(&layout, "projection"), Some(0));
        assert_eq!(offset(&layout, "view"), Some(64));
        assert_eq!(offset(&layout, "model"), Some(128));
        assert_eq!(offset(&layout, "modelInvTra"), Some(192));
        assert_eq!(offset(&layout, "viewPosition"), Some(240));
        assert_eq!(offset(&layout, "specularExponent"), Some(252));
        assert_eq!(offset(&layout, "ambientLightColor"), Some(256));
        assert_eq!(offset(&layout, "ambientOcclusionMix"), Some(268));
        assert_eq!(offset(&layout, "lightDirection"), Some(272));
        assert_eq!(offset(&layout, "normalMappingMix"), Some(284));
        assert_eq!(offset(&layout, "lightColor"), Some(288));
        assert_eq!(offset(&layout, "reflectionMix"), Some(300));
        assert_eq!(offset(&layout, "tessellationLevel"), Some(304));
        assert_eq!(offset(&layout, "displacementFactor"), Some(308));
        assert_eq!(offset(&layout, TESSELLATION_SEGMENTS), Some(312));
        assert_eq!(layout.size(), 320);
    }

    #[test]
    fn test_skybox_layout() {
        let layout = ShaderDesc::skybox().uniforms;
        assert_eq!(offset(&layout, "view"), Some(64));
        assert_eq!(layout.size(), 128);
        assert!(layout.field("skybox").is_some());
    }

    #[test]
    fn test_programs_share_entry_points() {
        for desc in [ShaderDesc::skybox(), ShaderDesc::lit(), ShaderDesc::tessellated()] {
            assert!(desc.source.contains("fn vs_main"), "{}", desc.label);
            assert!(desc.source.contains("fn fs_main"), "{}", desc.label);
        }
    }

    #[test]
    fn test_only_tessellation_draws_patches() {
        assert_eq!(ShaderDesc::lit().draw_mode, DrawMode::Triangles);
        assert_eq!(
            ShaderDesc::tessellated().draw_mode,
            DrawMode::Patches { vertices: 3 }
        );
    }
}
