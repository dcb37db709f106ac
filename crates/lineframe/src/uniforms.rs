use glam::{Mat4, Quat, Vec3};

use crate::backend::UniformValue;

pub const ORTHO_EXTENT: f32 = 10.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;
pub const EYE_DISTANCE: f32 = 2.0;

/// Model-view-projection for one frame: a fixed orthographic box, the model
/// pushed back along -Z, then the accumulated orientation.
pub fn setup_matrix(orientation: Quat) -> Mat4 {
    let projection = Mat4::orthographic_rh(
        -ORTHO_EXTENT,
        ORTHO_EXTENT,
        -ORTHO_EXTENT,
        ORTHO_EXTENT,
        NEAR_PLANE,
        FAR_PLANE,
    );
    projection * Mat4::from_translation(Vec3::new(0.0, 0.0, -EYE_DISTANCE)) * Mat4::from_quat(orientation)
}

/// Writes `value` into a std140 block at `offset`. Writes that would run past
/// the block are dropped.
pub(crate) fn write_std140(block: &mut [u8], offset: u32, value: UniformValue) -> bool {
    let offset = offset as usize;
    let matrix;
    let bytes: &[u8] = match &value {
        UniformValue::Float(value) => bytemuck::bytes_of(value),
        UniformValue::Mat4(value) => {
            matrix = value.to_cols_array();
            bytemuck::cast_slice(&matrix)
        }
    };
    match block.get_mut(offset..offset + bytes.len()) {
        Some(slot) => {
            slot.copy_from_slice(bytes);
            true
        }
        None => false,
    }
}
