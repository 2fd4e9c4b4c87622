// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles vertices, models, textures, cubemaps and bind groups for rendering.

pub mod bindings;
pub mod cubemap;
pub mod model;
pub mod texture_resource;
pub mod vertex;

// Re-export main types
pub use bindings::{BindingLayouts, MaterialTextures};
pub use cubemap::{face_paths, CubemapFaces, FACE_NAMES};
pub use model::{GpuMesh, GpuModel, ModelData};
pub use texture_resource::TextureResource;
pub use vertex::Vertex3D;
