//! GPU-side layouts of per-frame shader data.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use static_assertions::const_assert_eq;

/// UV rectangle covering the whole texture: offset (0, 0), size (1, 1).
pub const FULL_UV_RECT: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

/// One sprite instance as the vertex and fragment shaders read it from the
/// instance storage buffer (std430).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
    /// Offset in `xy`, size in `zw`, both normalized.
    pub uv_rect: [f32; 4],
    pub texture_index: u32,
    pub _pad: [u32; 3],
}

const_assert_eq!(std::mem::size_of::<InstanceData>(), 96);

impl InstanceData {
    pub const SIZE: u64 = std::mem::size_of::<InstanceData>() as u64;

    pub fn new(model: Mat4, uv_rect: Vec4, texture_index: u32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            uv_rect: uv_rect.to_array(),
            texture_index,
            _pad: [0; 3],
        }
    }
}

/// Camera data uploaded once per frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

const_assert_eq!(std::mem::size_of::<CameraUniform>(), 64);

impl CameraUniform {
    pub const SIZE: u64 = std::mem::size_of::<CameraUniform>() as u64;

    pub fn new(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout_offsets() {
        let instance = InstanceData::new(Mat4::IDENTITY, Vec4::new(0.5, 0.25, 0.5, 0.25), 7);
        let bytes = bytemuck::bytes_of(&instance);
        assert_eq!(bytes.len(), 96);

        let uv: &[f32] = bytemuck::cast_slice(&bytes[64..80]);
        assert_eq!(uv, &[0.5, 0.25, 0.5, 0.25]);
        assert_eq!(u32::from_ne_bytes(bytes[80..84].try_into().unwrap()), 7);
        assert!(bytes[84..].iter().all(|&b| b == 0));
    }
}
