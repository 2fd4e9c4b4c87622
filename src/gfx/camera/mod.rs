pub mod camera_utils;
pub mod fly_camera;

// Re-export main types
pub use camera_utils::{normal_matrix, perspective_projection, FrameMatrices};
pub use fly_camera::{Camera, CameraMovement};
