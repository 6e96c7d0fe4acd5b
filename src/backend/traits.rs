//! Core backend abstraction trait.
//!
//! Defines the device operations the frame protocol needs. Both the Vulkan
//! backend and the simulated device implement it.

use ash::vk;

use crate::error::GraphicsResult;
use crate::overlay::OverlayRenderer;

use super::types::*;
use super::{GpuBuffer, GpuSampler, GpuTexture};

/// Device operations used by the swapchain ring, the sprite pipeline and the
/// frame renderer.
///
/// Handles returned by `create_*` methods belong to the caller, who must hand
/// them back to the matching `destroy_*` method once the GPU is done with them.
pub trait RenderBackend {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Block until the device has finished all submitted work.
    fn wait_idle(&self) -> GraphicsResult<()>;

    // ===== Presentation =====

    /// Query what the presentation surface supports right now.
    fn surface_support(&self) -> GraphicsResult<SurfaceSupport>;

    /// Create a swapchain and return it with its images.
    ///
    /// `old_swapchain` may be null.
    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
        old_swapchain: vk::SwapchainKHR,
    ) -> GraphicsResult<(vk::SwapchainKHR, Vec<vk::Image>)>;

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// Create a 2-D color view of a swapchain image.
    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
    ) -> GraphicsResult<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);

    /// Acquire the next presentable image, signaling `signal` when it is ready.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> GraphicsResult<AcquireOutcome>;

    /// Queue `image_index` for presentation once `wait` is signaled.
    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> GraphicsResult<PresentOutcome>;

    // ===== Resources =====

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<GpuBuffer>;

    /// Copy `size` bytes between buffers with a one-shot command buffer and
    /// wait for the queue to drain.
    fn copy_buffer_blocking(
        &self,
        src: &GpuBuffer,
        dst: &GpuBuffer,
        size: u64,
    ) -> GraphicsResult<()>;

    /// Create a sampled texture and upload tightly packed RGBA8 `pixels`.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: &[u8],
    ) -> GraphicsResult<GpuTexture>;

    /// Nearest-filtered, edge-clamped sampler shared by every sprite texture.
    fn create_sampler(&self, label: &str) -> GraphicsResult<GpuSampler>;

    // ===== Synchronization =====

    fn create_semaphore(&self) -> GraphicsResult<vk::Semaphore>;

    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    fn create_fence(&self, signaled: bool) -> GraphicsResult<vk::Fence>;

    fn destroy_fence(&self, fence: vk::Fence);

    /// Block until `fence` is signaled.
    fn wait_for_fence(&self, fence: vk::Fence) -> GraphicsResult<()>;

    fn reset_fence(&self, fence: vk::Fence) -> GraphicsResult<()>;

    fn is_fence_signaled(&self, fence: vk::Fence) -> GraphicsResult<bool>;

    // ===== Commands =====

    fn allocate_command_buffers(&self, count: u32) -> GraphicsResult<Vec<vk::CommandBuffer>>;

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]);

    /// Reset `command_buffer` and record one full frame into it.
    ///
    /// The overlay, when present, records inside the same rendering scope
    /// after the instanced draw.
    fn record_frame(
        &self,
        command_buffer: vk::CommandBuffer,
        recording: &FrameRecording<'_>,
        overlay: Option<&mut dyn OverlayRenderer>,
    ) -> GraphicsResult<()>;

    fn submit_frame(&self, submission: &FrameSubmission) -> GraphicsResult<()>;

    /// Submit a batch with no command buffers that waits on `wait_semaphore`
    /// and signals `fence`. Consumes an acquisition signal without drawing.
    fn submit_empty(&self, wait_semaphore: vk::Semaphore, fence: vk::Fence) -> GraphicsResult<()>;

    // ===== Descriptors and pipelines =====

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> GraphicsResult<vk::DescriptorSetLayout>;

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    /// Create a pool whose sets may be freed individually.
    fn create_descriptor_pool(
        &self,
        sizes: &DescriptorPoolSizes,
    ) -> GraphicsResult<vk::DescriptorPool>;

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    /// Allocate one set. `variable_count` sizes the layout's variable-count
    /// binding and is ignored for layouts without one.
    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        variable_count: Option<u32>,
    ) -> GraphicsResult<vk::DescriptorSet>;

    fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> GraphicsResult<()>;

    fn write_descriptor(
        &self,
        set: vk::DescriptorSet,
        write: DescriptorWrite<'_>,
    ) -> GraphicsResult<()>;

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> GraphicsResult<vk::PipelineLayout>;

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> GraphicsResult<vk::Pipeline>;

    fn destroy_pipeline(&self, pipeline: vk::Pipeline);
}
