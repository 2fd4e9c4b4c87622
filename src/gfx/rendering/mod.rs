// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Records backend calls, manages pipelines and replays frames on the GPU.

pub mod frame_recorder;
pub mod pipeline_manager;
pub mod render_engine;
pub mod shaders;
pub mod uniform_layout;

// Re-export main types
pub use frame_recorder::{FrameRecorder, RecordedDraw};
pub use pipeline_manager::{PipelineConfig, PipelineKey, PipelineManager};
pub use render_engine::{FrameStatus, RenderEngine};
pub use shaders::ShaderDesc;
