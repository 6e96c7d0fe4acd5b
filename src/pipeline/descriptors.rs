//! Descriptor set layouts of the sprite shader.
//!
//! Set 0 (global, one per frame in flight):
//! - binding 0: camera uniform buffer, vertex stage
//! - binding 1: sampler shared by every sprite texture, fragment stage
//! - binding 2: variable-count array of sampled images, fragment stage
//!
//! Set 1 (instances, one per frame in flight):
//! - binding 0: storage buffer of packed instance data, vertex and fragment stages

use ash::vk;

use crate::backend::{DescriptorBinding, DescriptorKind, DescriptorPoolSizes};

pub const GLOBAL_SET: u32 = 0;
pub const INSTANCE_SET: u32 = 1;

pub const CAMERA_BINDING: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;
pub const TEXTURES_BINDING: u32 = 2;
pub const INSTANCES_BINDING: u32 = 0;

/// Sets the pool can hand out per frame in flight.
pub const SETS_PER_FRAME: u32 = 10_000;

pub fn global_bindings(max_textures: u32) -> [DescriptorBinding; 3] {
    [
        DescriptorBinding::single(
            CAMERA_BINDING,
            DescriptorKind::UniformBuffer,
            vk::ShaderStageFlags::VERTEX,
        ),
        DescriptorBinding::single(
            SAMPLER_BINDING,
            DescriptorKind::Sampler,
            vk::ShaderStageFlags::FRAGMENT,
        ),
        DescriptorBinding::variable_array(
            TEXTURES_BINDING,
            DescriptorKind::SampledImage,
            max_textures,
            vk::ShaderStageFlags::FRAGMENT,
        ),
    ]
}

pub fn instance_bindings() -> [DescriptorBinding; 1] {
    [DescriptorBinding::single(
        INSTANCES_BINDING,
        DescriptorKind::StorageBuffer,
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
    )]
}

/// Pool holding one global and one instance set per frame in flight.
pub fn pool_sizes(frames_in_flight: u32, max_textures: u32) -> DescriptorPoolSizes {
    DescriptorPoolSizes {
        sizes: vec![
            (DescriptorKind::UniformBuffer, frames_in_flight),
            (DescriptorKind::Sampler, frames_in_flight),
            (DescriptorKind::SampledImage, frames_in_flight * max_textures),
            (DescriptorKind::StorageBuffer, frames_in_flight),
        ],
        max_sets: frames_in_flight * SETS_PER_FRAME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_array_is_last_binding() {
        let bindings = global_bindings(64);
        let highest = bindings.iter().map(|b| b.binding).max();
        let variable: Vec<_> = bindings.iter().filter(|b| b.variable_count).collect();
        assert_eq!(variable.len(), 1);
        assert_eq!(Some(variable[0].binding), highest);
        assert_eq!(variable[0].count, 64);
    }

    #[test]
    fn test_pool_scales_with_frames() {
        let sizes = pool_sizes(3, 16);
        assert_eq!(sizes.max_sets, 30_000);
        assert!(sizes
            .sizes
            .contains(&(DescriptorKind::SampledImage, 48)));
        assert!(sizes.sizes.contains(&(DescriptorKind::UniformBuffer, 3)));
    }
}
