// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use glam::{Mat4, Vec4};

/// Clip-volume bounds in the form `glFrustum` takes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// Symmetric frustum from a vertical field of view in degrees.
    ///
    /// `half_height = tan(fov / 2) * near` and `half_width = half_height * aspect`.
    pub fn from_fov(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let half_height = (fov_y_degrees.to_radians() / 2.0).tan() * near;
        let half_width = half_height * aspect;
        Self {
            left: -half_width,
            right: half_width,
            bottom: -half_height,
            top: half_height,
            near,
            far,
        }
    }

    /// Perspective projection matching the classic `glFrustum` matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        let Self {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;

        // column-major
        Mat4::from_cols(
            Vec4::new(2.0 * n / (r - l), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 * n / (t - b), 0.0, 0.0),
            Vec4::new(
                (r + l) / (r - l),
                (t + b) / (t - b),
                -(f + n) / (f - n),
                -1.0,
            ),
            Vec4::new(0.0, 0.0, -2.0 * f * n / (f - n), 0.0),
        )
    }
}
