use cgmath::{perspective, Deg, Matrix, Matrix3, Matrix4, SquareMatrix};

use super::fly_camera::Camera;

pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

/// Remaps OpenGL clip-space depth [-1, 1] to the [0, 1] range wgpu expects.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Perspective projection with fixed near/far planes.
///
/// `aspect` is viewport width over height; degenerate viewports (minimised
/// windows) fall back to a square aspect so the matrix stays finite.
pub fn perspective_projection(fovy_degrees: f32, aspect: f32) -> Matrix4<f32> {
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    OPENGL_TO_WGPU_MATRIX * perspective(Deg(fovy_degrees), aspect, Z_NEAR, Z_FAR)
}

/// Inverse-transpose of the upper 3x3 of `model`.
///
/// Normals transformed by the model matrix itself stop being perpendicular to
/// their surface once the scale is non-uniform. A singular matrix (zero scale)
/// has no meaningful normal transform; its upper 3x3 is returned unchanged.
pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = upper_3x3(model);
    upper.invert().map(|inv| inv.transpose()).unwrap_or(upper)
}

pub fn upper_3x3(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

/// View, projection and their product for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub view_projection: Matrix4<f32>,
}

impl FrameMatrices {
    /// Uses the camera zoom as field of view and the viewport for aspect.
    pub fn new(camera: &Camera, viewport: (u32, u32)) -> Self {
        let aspect = viewport.0 as f32 / viewport.1 as f32;
        let projection = perspective_projection(camera.zoom(), aspect);
        let view = camera.get_view_matrix();
        Self {
            projection,
            view,
            view_projection: projection * view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3, Vector4};

    fn max_abs_diff(a: Matrix3<f32>, b: Matrix3<f32>) -> f32 {
        let a: [[f32; 3]; 3] = a.into();
        let b: [[f32; 3]; 3] = b.into();
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_normal_matrix_differs_under_nonuniform_scale() {
        let model = Matrix4::from_translation(Vector3::new(1.0, 0.5, 0.0))
            * Matrix4::from_nonuniform_scale(1.0, 4.0, 0.5);

        let normal = normal_matrix(&model);
        assert!(max_abs_diff(normal, upper_3x3(&model)) > 0.1);

        // a sloped surface keeps its normal perpendicular after transformation
        let tangent = Vector3::new(1.0, 1.0, 0.0);
        let surface_normal = Vector3::new(1.0, -1.0, 0.0);
        let t = upper_3x3(&model) * tangent;
        let n = normal * surface_normal;
        assert!(t.dot(n).abs() < 1e-5);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale_is_proportional() {
        let model = Matrix4::from_scale(0.25);
        let normal = normal_matrix(&model);
        assert!(max_abs_diff(normal, Matrix3::identity() * 4.0) < 1e-5);
    }

    #[test]
    fn test_identity_normal_matrix() {
        let normal = normal_matrix(&Matrix4::identity());
        assert!(max_abs_diff(normal, Matrix3::identity()) < 1e-6);
    }

    #[test]
    fn test_singular_model_falls_back_to_upper() {
        let model = Matrix4::from_nonuniform_scale(1.0, 0.0, 1.0);
        assert_eq!(normal_matrix(&model), upper_3x3(&model));
    }

    #[test]
    fn test_projection_depth_range_is_zero_to_one() {
        let projection = perspective_projection(45.0, 16.0 / 9.0);

        let near = projection * Vector4::new(0.0, 0.0, -Z_NEAR, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, -Z_FAR, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_aspect_is_finite() {
        let projection = perspective_projection(45.0, f32::NAN);
        let values: [[f32; 4]; 4] = projection.into();
        assert!(values.iter().flatten().all(|v| v.is_finite()));
    }
}
