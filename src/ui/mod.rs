//! # User Interface Module
//!
//! Dear ImGui overlay for the renderer. [`UiManager`] handles the imgui, winit
//! and wgpu integration on top of the frame bookkeeping in [`frames`];
//! [`settings_panel`] is the panel that edits the
//! [`RenderConfig`](crate::config::RenderConfig) while the application is
//! paused.

pub mod frames;
pub mod manager;
pub mod settings_panel;

pub use manager::UiManager;
