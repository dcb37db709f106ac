use glam::{Quat, Vec2, Vec3};

/// Degrees of rotation applied per pixel of pointer travel.
pub const DEFAULT_DEGREES_PER_PIXEL: f32 = 0.5;

/// Pointer buttons held during a move event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerButtons {
    pub primary: bool,
    pub secondary: bool,
    pub middle: bool,
}

impl PointerButtons {
    pub const NONE: Self = Self {
        primary: false,
        secondary: false,
        middle: false,
    };

    pub const PRIMARY: Self = Self {
        primary: true,
        secondary: false,
        middle: false,
    };
}

/// Accumulates the model orientation from pointer drags.
///
/// Each drag step builds a rotation about the vertical axis from the
/// horizontal delta and one about the horizontal axis from the vertical delta,
/// then composes them on the left: `rot_x * rot_y * orientation`. The
/// quaternion is never renormalised, so long sessions accumulate a little
/// floating point drift.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationController {
    orientation: Quat,
    last_position: Vec2,
    degrees_per_pixel: f32,
}

impl Default for RotationController {
    fn default() -> Self {
        Self::new(DEFAULT_DEGREES_PER_PIXEL)
    }
}

impl RotationController {
    pub fn new(degrees_per_pixel: f32) -> Self {
        Self {
            orientation: Quat::IDENTITY,
            last_position: Vec2::ZERO,
            degrees_per_pixel,
        }
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn last_position(&self) -> Vec2 {
        self.last_position
    }

    /// Handles a pointer move against the tracked last position.
    ///
    /// Returns `true` when the orientation changed and a redraw is needed.
    pub fn on_pointer_move(&mut self, position: Vec2, buttons: PointerButtons) -> bool {
        let previous = self.last_position;
        self.on_pointer_drag(position, previous, buttons)
    }

    /// Applies one drag step from `previous` to `current`.
    ///
    /// Without the primary button only the tracked position moves.
    pub fn on_pointer_drag(
        &mut self,
        current: Vec2,
        previous: Vec2,
        buttons: PointerButtons,
    ) -> bool {
        let rotated = if buttons.primary {
            let delta = current - previous;
            self.orientation = drag_rotation(delta, self.degrees_per_pixel) * self.orientation;
            true
        } else {
            false
        };
        self.last_position = current;
        rotated
    }
}

/// Incremental rotation for one drag delta, `rot_x * rot_y`.
pub fn drag_rotation(delta: Vec2, degrees_per_pixel: f32) -> Quat {
    let rot_x = Quat::from_axis_angle(Vec3::Y, (degrees_per_pixel * delta.x).to_radians());
    let rot_y = Quat::from_axis_angle(Vec3::X, (degrees_per_pixel * delta.y).to_radians());
    rot_x * rot_y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Quat, b: Quat) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn horizontal_drag_rotates_about_vertical_axis() {
        let mut controller = RotationController::default();
        assert!(controller.on_pointer_drag(Vec2::new(20.0, 0.0), Vec2::ZERO, PointerButtons::PRIMARY));
        let expected = Quat::from_axis_angle(Vec3::Y, 10f32.to_radians());
        assert!(approx_eq(controller.orientation(), expected));
    }

    #[test]
    fn increment_is_composed_on_the_left() {
        let mut controller = RotationController::default();
        controller.on_pointer_drag(Vec2::new(30.0, 0.0), Vec2::ZERO, PointerButtons::PRIMARY);
        let before = controller.orientation();
        controller.on_pointer_drag(Vec2::new(30.0, 14.0), Vec2::new(30.0, 0.0), PointerButtons::PRIMARY);

        let rot_x = Quat::from_axis_angle(Vec3::Y, 0.0);
        let rot_y = Quat::from_axis_angle(Vec3::X, 7f32.to_radians());
        assert!(approx_eq(controller.orientation(), rot_x * rot_y * before));
        assert!(!approx_eq(controller.orientation(), before * rot_x * rot_y));
    }

    #[test]
    fn diagonal_step_applies_vertical_axis_rotation_first_in_product() {
        let step = drag_rotation(Vec2::new(10.0, 6.0), DEFAULT_DEGREES_PER_PIXEL);
        let rot_x = Quat::from_axis_angle(Vec3::Y, 5f32.to_radians());
        let rot_y = Quat::from_axis_angle(Vec3::X, 3f32.to_radians());
        assert!(approx_eq(step, rot_x * rot_y));
        assert!(!approx_eq(step, rot_y * rot_x));
    }

    #[test]
    fn moves_without_primary_only_track_position() {
        let mut controller = RotationController::default();
        let buttons = PointerButtons {
            secondary: true,
            ..PointerButtons::NONE
        };
        assert!(!controller.on_pointer_move(Vec2::new(40.0, 25.0), buttons));
        assert_eq!(controller.orientation(), Quat::IDENTITY);
        assert_eq!(controller.last_position(), Vec2::new(40.0, 25.0));

        assert!(controller.on_pointer_move(Vec2::new(50.0, 25.0), PointerButtons::PRIMARY));
        let expected = Quat::from_axis_angle(Vec3::Y, 5f32.to_radians());
        assert!(approx_eq(controller.orientation(), expected));
    }

    #[test]
    fn drag_order_matters() {
        let mut first = RotationController::default();
        first.on_pointer_move(Vec2::new(10.0, 0.0), PointerButtons::PRIMARY);
        first.on_pointer_move(Vec2::new(10.0, 10.0), PointerButtons::PRIMARY);

        let mut second = RotationController::default();
        second.on_pointer_move(Vec2::new(0.0, 10.0), PointerButtons::PRIMARY);
        second.on_pointer_move(Vec2::new(10.0, 10.0), PointerButtons::PRIMARY);

        assert!(!approx_eq(first.orientation(), second.orientation()));
    }

    #[test]
    fn custom_scale_changes_step_size() {
        let mut controller = RotationController::new(1.0);
        controller.on_pointer_drag(Vec2::new(0.0, 90.0), Vec2::ZERO, PointerButtons::PRIMARY);
        let expected = Quat::from_axis_angle(Vec3::X, 90f32.to_radians());
        assert!(approx_eq(controller.orientation(), expected));
    }
}
