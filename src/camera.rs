// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use glam::{Mat4, Vec3};

use crate::input::MovementKeys;
use crate::settings::CameraSettings;

/// Camera position and orientation. Rotation is stored in degrees.
///
/// Values are unbounded; nothing wraps or clamps them.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub rotation_degrees: Vec3,
}

/// Per-frame increments applied while a key is held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSteps {
    pub move_step: f32,
    pub turn_step_degrees: f32,
}

impl Default for CameraSteps {
    fn default() -> Self {
        Self {
            move_step: 0.1,
            turn_step_degrees: 10.0,
        }
    }
}

impl From<&CameraSettings> for CameraSteps {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            move_step: settings.move_step,
            turn_step_degrees: settings.turn_step_degrees,
        }
    }
}

impl CameraState {
    /// Applies one frame of held keys.
    ///
    /// Each axis has a preferred key: D beats A, W beats S, Up beats Down and
    /// Right beats Left. Holding both keys of a pair moves in the preferred
    /// direction, it does not cancel out. Steps are per frame, not per second.
    pub fn apply_keys(&mut self, keys: &MovementKeys, steps: &CameraSteps) {
        if keys.right {
            self.position.x += steps.move_step;
        } else if keys.left {
            self.position.x -= steps.move_step;
        }

        if keys.forward {
            self.position.z -= steps.move_step;
        } else if keys.back {
            self.position.z += steps.move_step;
        }

        if keys.look_up {
            self.rotation_degrees.x += steps.turn_step_degrees;
        } else if keys.look_down {
            self.rotation_degrees.x -= steps.turn_step_degrees;
        }

        if keys.look_right {
            self.rotation_degrees.y += steps.turn_step_degrees;
        } else if keys.look_left {
            self.rotation_degrees.y -= steps.turn_step_degrees;
        }
    }

    /// Builds the modelview matrix from scratch: the inverse camera rotation
    /// about X, then Y, then Z, followed by the inverse translation.
    pub fn modelview_matrix(&self) -> Mat4 {
        let rotation = self.rotation_degrees;
        Mat4::IDENTITY
            * Mat4::from_rotation_x(-rotation.x.to_radians())
            * Mat4::from_rotation_y(-rotation.y.to_radians())
            * Mat4::from_rotation_z(-rotation.z.to_radians())
            * Mat4::from_translation(-self.position)
    }
}
