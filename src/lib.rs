// src/lib.rs
//! Tessera
//!
//! A small real-time scene renderer built on wgpu and winit: a cubemap
//! skybox, a lit floor and displacement-mapped models tessellated on the GPU,
//! viewed through a fly camera. Space pauses the scene and opens a settings
//! panel; Escape quits.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod input;
pub mod ui;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::TesseraApp;
pub use config::{AppSettings, RenderConfig};
pub use error::{AssetError, InitError};

/// Opens the window and runs the scene until it is closed.
pub fn run(settings: AppSettings) -> Result<(), InitError> {
    TesseraApp::new(settings)?.run()
}
