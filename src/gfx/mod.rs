//! # Graphics Module
//!
//! Everything between the camera and the screen.
//!
//! - **Camera** ([`camera`]) - Fly camera and projection math
//! - **Backend** ([`backend`]) - The GPU command interface frames are composed against
//! - **Composer** ([`composer`]) - Fixed per-frame draw sequence of the scene
//! - **Rendering** ([`rendering`]) - wgpu pipelines, shaders and frame replay
//! - **Resources** ([`resources`]) - Models, textures, cubemaps and bind groups
//!
//! The composer never touches wgpu directly. It drives a [`backend::RenderBackend`],
//! which the render engine implements by recording draws and replaying them
//! inside one render pass.

pub mod backend;
pub mod camera;
pub mod composer;
pub mod rendering;
pub mod resources;

// Re-export commonly used types
pub use camera::Camera;
pub use composer::{SceneComposer, SceneHandles};
pub use rendering::render_engine::RenderEngine;
