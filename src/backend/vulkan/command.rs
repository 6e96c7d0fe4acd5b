//! Vulkan command pool and one-shot command buffers.

use ash::vk;

use crate::error::GraphicsError;

/// Create a command pool for graphics operations.
pub fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> Result<vk::CommandPool, GraphicsError> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    unsafe { device.create_command_pool(&pool_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create command pool: {:?}", e))
    })
}

/// Record `record` into a fresh command buffer, submit it and block until
/// the queue is idle.
///
/// Used for setup uploads only; per-frame work goes through the frame ring.
pub fn submit_one_shot<F>(
    device: &ash::Device,
    pool: vk::CommandPool,
    queue: vk::Queue,
    record: F,
) -> Result<(), GraphicsError>
where
    F: FnOnce(vk::CommandBuffer),
{
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let command_buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
        .map_err(|e| GraphicsError::from_vk("Failed to allocate one-shot command buffer", e))?;
    let command_buffer = command_buffers[0];

    let result = (|| {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .map_err(|e| GraphicsError::from_vk("Failed to begin one-shot command buffer", e))?;

        record(command_buffer);

        unsafe { device.end_command_buffer(command_buffer) }
            .map_err(|e| GraphicsError::from_vk("Failed to end one-shot command buffer", e))?;

        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        unsafe { device.queue_submit(queue, &[submit_info], vk::Fence::null()) }
            .map_err(|e| GraphicsError::from_vk("Failed to submit one-shot command buffer", e))?;
        unsafe { device.queue_wait_idle(queue) }
            .map_err(|e| GraphicsError::from_vk("Failed to wait for queue", e))
    })();

    unsafe { device.free_command_buffers(pool, &command_buffers) };
    result
}
