//! Descriptor set layouts, pools, sets and writes.

use ash::vk;

use crate::backend::types::{DescriptorBinding, DescriptorPoolSizes, DescriptorWrite};
use crate::error::GraphicsError;

pub fn create_descriptor_set_layout(
    device: &ash::Device,
    bindings: &[DescriptorBinding],
) -> Result<vk::DescriptorSetLayout, GraphicsError> {
    let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding.binding)
                .descriptor_type(binding.kind.to_vk())
                .descriptor_count(binding.count)
                .stage_flags(binding.stages)
        })
        .collect();

    let binding_flags: Vec<vk::DescriptorBindingFlags> = bindings
        .iter()
        .map(|binding| {
            if binding.variable_count {
                vk::DescriptorBindingFlags::PARTIALLY_BOUND
                    | vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT
            } else {
                vk::DescriptorBindingFlags::empty()
            }
        })
        .collect();

    let mut flags_info =
        vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);

    let create_info = vk::DescriptorSetLayoutCreateInfo::default()
        .bindings(&vk_bindings)
        .push_next(&mut flags_info);

    unsafe { device.create_descriptor_set_layout(&create_info, None) }.map_err(|e| {
        GraphicsError::ResourceCreationFailed(format!(
            "Failed to create descriptor set layout: {:?}",
            e
        ))
    })
}

pub fn create_descriptor_pool(
    device: &ash::Device,
    sizes: &DescriptorPoolSizes,
) -> Result<vk::DescriptorPool, GraphicsError> {
    let pool_sizes: Vec<vk::DescriptorPoolSize> = sizes
        .sizes
        .iter()
        .map(|(kind, count)| vk::DescriptorPoolSize {
            ty: kind.to_vk(),
            descriptor_count: *count,
        })
        .collect();

    let pool_info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .max_sets(sizes.max_sets)
        .pool_sizes(&pool_sizes);

    unsafe { device.create_descriptor_pool(&pool_info, None) }.map_err(|e| {
        GraphicsError::ResourceCreationFailed(format!("Failed to create descriptor pool: {:?}", e))
    })
}

pub fn allocate_descriptor_set(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    variable_count: Option<u32>,
) -> Result<vk::DescriptorSet, GraphicsError> {
    let layouts = [layout];
    let counts = [variable_count.unwrap_or(0)];
    let mut variable_info =
        vk::DescriptorSetVariableDescriptorCountAllocateInfo::default().descriptor_counts(&counts);

    let mut alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);
    if variable_count.is_some() {
        alloc_info = alloc_info.push_next(&mut variable_info);
    }

    let sets = unsafe { device.allocate_descriptor_sets(&alloc_info) }.map_err(|e| {
        GraphicsError::ResourceCreationFailed(format!("Failed to allocate descriptor set: {:?}", e))
    })?;

    sets.into_iter().next().ok_or_else(|| {
        GraphicsError::Internal("Descriptor set allocation returned no sets".to_string())
    })
}

pub fn write_descriptor(device: &ash::Device, set: vk::DescriptorSet, write: DescriptorWrite<'_>) {
    match write {
        DescriptorWrite::UniformBuffer { binding, buffer }
        | DescriptorWrite::StorageBuffer { binding, buffer } => {
            let ty = if matches!(write, DescriptorWrite::UniformBuffer { .. }) {
                vk::DescriptorType::UNIFORM_BUFFER
            } else {
                vk::DescriptorType::STORAGE_BUFFER
            };
            let buffer_info = [vk::DescriptorBufferInfo::default()
                .buffer(buffer.raw())
                .offset(0)
                .range(buffer.size())];
            let write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(binding)
                .descriptor_type(ty)
                .buffer_info(&buffer_info);
            unsafe { device.update_descriptor_sets(&[write], &[]) };
        }
        DescriptorWrite::Sampler { binding, sampler } => {
            let image_info = [vk::DescriptorImageInfo::default().sampler(sampler.raw())];
            let write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(binding)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .image_info(&image_info);
            unsafe { device.update_descriptor_sets(&[write], &[]) };
        }
        DescriptorWrite::SampledImages { binding, textures } => {
            if textures.is_empty() {
                return;
            }
            let image_infos: Vec<vk::DescriptorImageInfo> = textures
                .iter()
                .map(|texture| {
                    vk::DescriptorImageInfo::default()
                        .image_view(texture.view())
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                })
                .collect();
            let write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(binding)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .image_info(&image_infos);
            unsafe { device.update_descriptor_sets(&[write], &[]) };
        }
    }
}
