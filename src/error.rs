//! Error types for initialisation and asset loading
//!
//! Initialisation failures are fatal and abort before the frame loop starts.
//! Asset failures are fatal for models and downgraded to diagnostics for
//! individual cubemap faces.

use std::path::PathBuf;

/// Fatal failures while bringing up the window, surface or GPU device.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Failures while reading models or images from disk.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("model {0} contains no meshes")]
    EmptyModel(PathBuf),

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {path} is {size:?}, larger than the device limit of {max}")]
    TooLarge {
        path: PathBuf,
        size: (u32, u32),
        max: u32,
    },

    #[error("cubemap face {path} is {size:?}, faces must be square")]
    NonSquareFace { path: PathBuf, size: (u32, u32) },

    #[error("cubemap face {path} is {actual:?}, expected {expected:?}")]
    FaceSize {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
