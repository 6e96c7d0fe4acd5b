//! Graphics pipeline creation for the instanced sprite draw.

use std::ffi::CString;

use ash::vk;

use crate::backend::types::GraphicsPipelineDescriptor;
use crate::error::GraphicsError;

use super::shader::create_shader_module;

pub fn create_pipeline_layout(
    device: &ash::Device,
    set_layouts: &[vk::DescriptorSetLayout],
) -> Result<vk::PipelineLayout, GraphicsError> {
    let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(set_layouts);

    unsafe { device.create_pipeline_layout(&create_info, None) }.map_err(|e| {
        GraphicsError::ResourceCreationFailed(format!("Failed to create pipeline layout: {:?}", e))
    })
}

/// Create the sprite pipeline.
///
/// Fixed state: triangle list, back-face culling with clockwise front faces,
/// no depth, straight alpha blending and dynamic viewport/scissor. Rendering
/// targets a single color attachment of `color_format` with dynamic rendering.
pub fn create_graphics_pipeline(
    device: &ash::Device,
    descriptor: &GraphicsPipelineDescriptor<'_>,
) -> Result<vk::Pipeline, GraphicsError> {
    let vertex_entry_c = CString::new(descriptor.vertex_entry).map_err(|e| {
        GraphicsError::InvalidParameter(format!(
            "Invalid vertex entry point name (contains null byte): {}",
            e
        ))
    })?;
    let fragment_entry_c = CString::new(descriptor.fragment_entry).map_err(|e| {
        GraphicsError::InvalidParameter(format!(
            "Invalid fragment entry point name (contains null byte): {}",
            e
        ))
    })?;

    let vertex_module = create_shader_module(
        device,
        descriptor.shader_source,
        naga::ShaderStage::Vertex,
        descriptor.vertex_entry,
    )?;
    let fragment_module = match create_shader_module(
        device,
        descriptor.shader_source,
        naga::ShaderStage::Fragment,
        descriptor.fragment_entry,
    ) {
        Ok(module) => module,
        Err(e) => {
            unsafe { device.destroy_shader_module(vertex_module, None) };
            return Err(e);
        }
    };

    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module)
            .name(&vertex_entry_c),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_module)
            .name(&fragment_entry_c),
    ];

    let binding_descriptions = [vk::VertexInputBindingDescription::default()
        .binding(0)
        .stride(descriptor.vertex_stride)
        .input_rate(vk::VertexInputRate::VERTEX)];

    let attribute_descriptions: Vec<vk::VertexInputAttributeDescription> = descriptor
        .vertex_attributes
        .iter()
        .map(|attr| {
            vk::VertexInputAttributeDescription::default()
                .location(attr.location)
                .binding(0)
                .format(attr.format)
                .offset(attr.offset)
        })
        .collect();

    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&binding_descriptions)
        .vertex_attribute_descriptions(&attribute_descriptions);

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(false)
        .depth_write_enable(false)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .color_write_mask(vk::ColorComponentFlags::RGBA)];

    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let color_attachment_formats = [descriptor.color_format];
    let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
        .color_attachment_formats(&color_attachment_formats)
        .depth_attachment_format(vk::Format::UNDEFINED);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .depth_stencil_state(&depth_stencil_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(descriptor.layout)
        .push_next(&mut rendering_info);

    let result = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
    };

    // Modules are only needed while the pipeline is being built.
    unsafe {
        device.destroy_shader_module(vertex_module, None);
        device.destroy_shader_module(fragment_module, None);
    }

    let pipelines = result.map_err(|(_, e)| {
        GraphicsError::ResourceCreationFailed(format!(
            "Failed to create graphics pipeline '{}': {:?}",
            descriptor.label, e
        ))
    })?;

    log::info!("Created graphics pipeline '{}'", descriptor.label);

    pipelines.into_iter().next().ok_or_else(|| {
        GraphicsError::Internal("Pipeline creation returned no pipelines".to_string())
    })
}
