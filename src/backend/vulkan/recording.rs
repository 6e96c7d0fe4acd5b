//! Frame command buffer recording and layout transitions.

use ash::vk;

use crate::backend::types::{BufferCopy, FrameRecording};
use crate::error::GraphicsError;
use crate::overlay::OverlayRenderer;

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

/// One image layout transition.
#[derive(Debug, Clone, Copy)]
pub struct LayoutTransition {
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
}

impl LayoutTransition {
    /// Swapchain image about to be rendered. The acquire semaphore is waited
    /// on at color output, so no earlier stage has to be blocked.
    pub const TO_COLOR_ATTACHMENT: Self = Self {
        old_layout: vk::ImageLayout::UNDEFINED,
        new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        src_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        src_access: vk::AccessFlags::empty(),
        dst_access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
    };

    pub const TO_PRESENT: Self = Self {
        old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        new_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        src_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        src_access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        dst_access: vk::AccessFlags::empty(),
    };

    pub const TO_TRANSFER_DST: Self = Self {
        old_layout: vk::ImageLayout::UNDEFINED,
        new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
        dst_stage: vk::PipelineStageFlags::TRANSFER,
        src_access: vk::AccessFlags::empty(),
        dst_access: vk::AccessFlags::TRANSFER_WRITE,
    };

    pub const TO_SHADER_READ: Self = Self {
        old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        src_stage: vk::PipelineStageFlags::TRANSFER,
        dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        src_access: vk::AccessFlags::TRANSFER_WRITE,
        dst_access: vk::AccessFlags::SHADER_READ,
    };

    pub fn record(&self, device: &ash::Device, cmd: vk::CommandBuffer, image: vk::Image) {
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(COLOR_RANGE)
            .src_access_mask(self.src_access)
            .dst_access_mask(self.dst_access);

        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                self.src_stage,
                self.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }
}

/// Copy the packed instances and make them visible to the shaders that read
/// the storage buffer.
fn record_instance_upload(device: &ash::Device, cmd: vk::CommandBuffer, copy: &BufferCopy<'_>) {
    let region = vk::BufferCopy::default()
        .src_offset(0)
        .dst_offset(0)
        .size(copy.size);

    let barrier = vk::BufferMemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .buffer(copy.dst.raw())
        .offset(0)
        .size(copy.size);

    unsafe {
        device.cmd_copy_buffer(cmd, copy.src.raw(), copy.dst.raw(), &[region]);
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[barrier],
            &[],
        );
    }
}

/// Reset `cmd` and record the whole frame.
pub fn record_frame(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    recording: &FrameRecording<'_>,
    overlay: Option<&mut dyn OverlayRenderer>,
) -> Result<(), GraphicsError> {
    unsafe { device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty()) }
        .map_err(|e| GraphicsError::from_vk("Failed to reset command buffer", e))?;

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    unsafe { device.begin_command_buffer(cmd, &begin_info) }
        .map_err(|e| GraphicsError::from_vk("Failed to begin command buffer", e))?;

    if let Some(copy) = &recording.instance_upload {
        record_instance_upload(device, cmd, copy);
    }

    LayoutTransition::TO_COLOR_ATTACHMENT.record(device, cmd, recording.image);

    let clear_value = vk::ClearValue {
        color: vk::ClearColorValue {
            float32: recording.clear_color,
        },
    };
    let color_attachments = [vk::RenderingAttachmentInfo::default()
        .image_view(recording.view)
        .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .clear_value(clear_value)];

    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: recording.extent,
    };
    let rendering_info = vk::RenderingInfo::default()
        .render_area(render_area)
        .layer_count(1)
        .color_attachments(&color_attachments);

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: recording.extent.width as f32,
        height: recording.extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };

    unsafe {
        device.cmd_begin_rendering(cmd, &rendering_info);
        device.cmd_set_viewport(cmd, 0, &[viewport]);
        device.cmd_set_scissor(cmd, 0, &[render_area]);
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, recording.pipeline);
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            recording.pipeline_layout,
            0,
            &recording.descriptor_sets,
            &[],
        );
        device.cmd_bind_vertex_buffers(cmd, 0, &[recording.vertex_buffer.raw()], &[0]);
        device.cmd_bind_index_buffer(
            cmd,
            recording.index_buffer.raw(),
            0,
            vk::IndexType::UINT16,
        );
        device.cmd_draw_indexed(cmd, recording.index_count, recording.instance_count, 0, 0, 0);
    }

    let overlay_result = match overlay {
        Some(overlay) => overlay.record(cmd, recording.extent),
        None => Ok(()),
    };

    unsafe { device.cmd_end_rendering(cmd) };
    LayoutTransition::TO_PRESENT.record(device, cmd, recording.image);

    let end_result = unsafe { device.end_command_buffer(cmd) }
        .map_err(|e| GraphicsError::from_vk("Failed to end command buffer", e));

    overlay_result.and(end_result)
}
