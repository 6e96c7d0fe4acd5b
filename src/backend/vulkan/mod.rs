//! Native Vulkan backend implementation using ash.
//!
//! This backend provides direct Vulkan access:
//! - Validation layers routed into `log` when enabled
//! - gpu-allocator for memory management
//! - Dynamic rendering (Vulkan 1.3 core)
//! - Descriptor indexing for the unbounded sprite texture array
//!
//! Every [`GpuBuffer`], [`GpuTexture`] and [`GpuSampler`] created by the
//! backend must be dropped before the backend itself.

mod allocator;
mod command;
mod debug;
mod descriptor;
mod device;
mod instance;
mod pipeline;
mod recording;
pub(crate) mod shader;

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::khr::{surface, swapchain};
use ash::vk;
use gpu_allocator::vulkan::Allocator;
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};

use crate::config::RendererConfig;
use crate::error::{GraphicsError, GraphicsResult};
use crate::overlay::OverlayRenderer;

use super::traits::RenderBackend;
use super::types::*;
use super::{GpuBuffer, GpuSampler, GpuTexture};

use self::device::{DeviceSelection, SurfaceQuery};
use self::recording::LayoutTransition;

/// Surface plus the extension loaders that drive it.
struct Presentation {
    surface_fn: surface::Instance,
    swapchain_fn: swapchain::Device,
    surface: vk::SurfaceKHR,
}

/// Vulkan-based GPU backend using ash.
pub struct VulkanBackend {
    /// Vulkan entry points (function loader). Must outlive the instance.
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    /// `None` for headless backends.
    presentation: Option<Presentation>,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    /// Single queue used for graphics, transfer and presentation.
    queue: vk::Queue,
    queue_family: u32,
    /// Dropped explicitly before the device is destroyed.
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,
    command_pool: vk::CommandPool,
}

impl VulkanBackend {
    /// Create a backend presenting to `window`.
    pub fn new<W>(config: &RendererConfig, window: &W) -> GraphicsResult<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GraphicsError::InitializationFailed(format!("No display handle: {e}")))?
            .as_raw();
        let window = window
            .window_handle()
            .map_err(|e| GraphicsError::InitializationFailed(format!("No window handle: {e}")))?
            .as_raw();
        Self::create(config, Some((display, window)))
    }

    /// Create a backend without a presentation surface.
    ///
    /// Everything except swapchain operations works, which is enough for
    /// buffer and pipeline tests on machines with a GPU.
    pub fn new_headless(config: &RendererConfig) -> GraphicsResult<Self> {
        Self::create(config, None)
    }

    fn create(
        config: &RendererConfig,
        handles: Option<(RawDisplayHandle, RawWindowHandle)>,
    ) -> GraphicsResult<Self> {
        config.validate()?;

        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
        })?;

        let instance::InstanceBundle {
            instance,
            debug_utils,
            debug_messenger,
        } = instance::create_instance(
            &entry,
            &config.application_name,
            handles.map(|(display, _)| display),
            config.validation,
        )?;

        let surface_parts = match handles {
            Some((display, window)) => {
                let surface = unsafe {
                    ash_window::create_surface(&entry, &instance, display, window, None)
                }
                .map_err(|e| {
                    GraphicsError::InitializationFailed(format!(
                        "Failed to create surface: {:?}",
                        e
                    ))
                })?;
                Some((surface::Instance::new(&entry, &instance), surface))
            }
            None => None,
        };

        let query = surface_parts.as_ref().map(|(loader, surface)| SurfaceQuery {
            loader,
            surface: *surface,
        });
        let selection: DeviceSelection =
            device::select_physical_device(&instance, query.as_ref())?;

        let device =
            device::create_logical_device(&instance, selection, surface_parts.is_some())?;
        let queue = unsafe { device.get_device_queue(selection.queue_family, 0) };

        let allocator = allocator::create_allocator(
            &instance,
            selection.physical_device,
            device.clone(),
        )?;
        let command_pool = command::create_command_pool(&device, selection.queue_family)?;

        let presentation = surface_parts.map(|(surface_fn, surface)| Presentation {
            swapchain_fn: swapchain::Device::new(&instance, &device),
            surface_fn,
            surface,
        });

        log::info!(
            "Vulkan backend initialized (queue family {}, presentation: {})",
            selection.queue_family,
            presentation.is_some()
        );

        Ok(Self {
            _entry: entry,
            instance,
            debug_utils,
            debug_messenger,
            presentation,
            physical_device: selection.physical_device,
            device,
            queue,
            queue_family: selection.queue_family,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            command_pool,
        })
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    fn presentation(&self) -> GraphicsResult<&Presentation> {
        self.presentation.as_ref().ok_or_else(|| {
            GraphicsError::FeatureNotSupported("backend was created without a surface".to_string())
        })
    }

    fn submit_one_shot<F>(&self, record: F) -> GraphicsResult<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        command::submit_one_shot(&self.device, self.command_pool, self.queue, record)
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            self.device.destroy_command_pool(self.command_pool, None);

            if Arc::strong_count(&*self.allocator) > 1 {
                log::warn!(
                    "VulkanBackend dropped while GPU resources are still alive. \
                     Drop buffers and textures before the backend."
                );
            }
            // SAFETY: the allocator is never touched again after this point
            ManuallyDrop::drop(&mut self.allocator);

            if let Some(presentation) = &self.presentation {
                presentation
                    .surface_fn
                    .destroy_surface(presentation.surface, None);
            }

            self.device.destroy_device(None);

            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

impl RenderBackend for VulkanBackend {
    fn name(&self) -> &'static str {
        "Vulkan Backend (ash)"
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
        unsafe { self.device.device_wait_idle() }
            .map_err(|e| GraphicsError::from_vk("Failed to wait for device idle", e))
    }

    fn surface_support(&self) -> GraphicsResult<SurfaceSupport> {
        let presentation = self.presentation()?;
        let surface_fn = &presentation.surface_fn;
        let surface = presentation.surface;

        unsafe {
            let capabilities = surface_fn
                .get_physical_device_surface_capabilities(self.physical_device, surface)
                .map_err(|e| GraphicsError::from_vk("Failed to query surface capabilities", e))?;
            let formats = surface_fn
                .get_physical_device_surface_formats(self.physical_device, surface)
                .map_err(|e| GraphicsError::from_vk("Failed to query surface formats", e))?;
            let present_modes = surface_fn
                .get_physical_device_surface_present_modes(self.physical_device, surface)
                .map_err(|e| GraphicsError::from_vk("Failed to query present modes", e))?;

            Ok(SurfaceSupport {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
        old_swapchain: vk::SwapchainKHR,
    ) -> GraphicsResult<(vk::SwapchainKHR, Vec<vk::Image>)> {
        let presentation = self.presentation()?;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(presentation.surface)
            .min_image_count(descriptor.image_count)
            .image_format(descriptor.surface_format.format)
            .image_color_space(descriptor.surface_format.color_space)
            .image_extent(descriptor.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(descriptor.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(descriptor.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { presentation.swapchain_fn.create_swapchain(&create_info, None) }
            .map_err(|e| {
                GraphicsError::ResourceCreationFailed(format!(
                    "Failed to create swapchain: {:?}",
                    e
                ))
            })?;

        let images = match unsafe { presentation.swapchain_fn.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { presentation.swapchain_fn.destroy_swapchain(swapchain, None) };
                return Err(GraphicsError::from_vk("Failed to get swapchain images", e));
            }
        };

        log::info!(
            "Created Vulkan swapchain: {}x{} with {} images ({:?})",
            descriptor.extent.width,
            descriptor.extent.height,
            images.len(),
            descriptor.present_mode
        );

        Ok((swapchain, images))
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        if let Some(presentation) = &self.presentation {
            unsafe { presentation.swapchain_fn.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
    ) -> GraphicsResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe { self.device.create_image_view(&create_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create image view: {:?}", e))
        })
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> GraphicsResult<AcquireOutcome> {
        let presentation = self.presentation()?;
        let result = unsafe {
            presentation.swapchain_fn.acquire_next_image(
                swapchain,
                u64::MAX,
                signal,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, false)) => Ok(AcquireOutcome::Acquired(index)),
            Ok((index, true)) => Ok(AcquireOutcome::Suboptimal(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
            Err(e) => Err(GraphicsError::from_vk("Failed to acquire swapchain image", e)),
        }
    }

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> GraphicsResult<PresentOutcome> {
        let presentation = self.presentation()?;
        let wait_semaphores = [wait];
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { presentation.swapchain_fn.queue_present(self.queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(GraphicsError::from_vk("Failed to present", e)),
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<GpuBuffer> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer '{}' has zero size",
                descriptor.label_or("unnamed")
            )));
        }

        let create_info = vk::BufferCreateInfo::default()
            .size(descriptor.size)
            .usage(descriptor.usage.to_vk())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&create_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create buffer: {:?}", e))
        })?;

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let allocation = match allocator::allocate(
            &self.allocator,
            descriptor.label_or("buffer"),
            requirements,
            descriptor.memory.to_location(),
            true,
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_buffer(buffer, None) };
            let _ = self.allocator.lock().free(allocation);
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "Failed to bind buffer memory: {:?}",
                e
            )));
        }

        Ok(GpuBuffer::Vulkan {
            device: self.device.clone(),
            allocator: Arc::clone(&*self.allocator),
            buffer,
            allocation: Mutex::new(Some(allocation)),
            size: descriptor.size,
            memory: descriptor.memory,
        })
    }

    fn copy_buffer_blocking(
        &self,
        src: &GpuBuffer,
        dst: &GpuBuffer,
        size: u64,
    ) -> GraphicsResult<()> {
        if size > src.size() || size > dst.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "copy of {} bytes exceeds buffer sizes ({} -> {})",
                size,
                src.size(),
                dst.size()
            )));
        }
        let region = vk::BufferCopy::default().size(size);
        self.submit_one_shot(|cmd| unsafe {
            self.device
                .cmd_copy_buffer(cmd, src.raw(), dst.raw(), &[region]);
        })
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: &[u8],
    ) -> GraphicsResult<GpuTexture> {
        if pixels.len() as u64 != descriptor.byte_size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture upload has {} bytes, expected {}",
                pixels.len(),
                descriptor.byte_size()
            )));
        }

        let staging = self.create_buffer(
            &BufferDescriptor::new(
                descriptor.byte_size(),
                BufferUsage::TRANSFER_SRC,
                MemoryKind::HostVisible,
            )
            .with_label("texture staging"),
        )?;
        staging.write_data(self, pixels)?;

        let extent = vk::Extent3D {
            width: descriptor.width,
            height: descriptor.height,
            depth: 1,
        };
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(descriptor.format)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.device.create_image(&image_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create image: {:?}", e))
        })?;

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let label = descriptor.label.as_deref().unwrap_or("texture");
        let allocation = match allocator::allocate(
            &self.allocator,
            label,
            requirements,
            MemoryLocation::GpuOnly,
            false,
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        // From here on the texture owns the image and its memory, so every
        // failure path below cleans up by dropping it.
        let bind_result = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        };
        let mut texture = GpuTexture::Vulkan {
            device: self.device.clone(),
            allocator: Arc::clone(&*self.allocator),
            image,
            view: vk::ImageView::null(),
            allocation: Mutex::new(Some(allocation)),
            width: descriptor.width,
            height: descriptor.height,
        };
        bind_result.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to bind image memory: {:?}", e))
        })?;

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_extent(extent);

        self.submit_one_shot(|cmd| unsafe {
            LayoutTransition::TO_TRANSFER_DST.record(&self.device, cmd, image);
            self.device.cmd_copy_buffer_to_image(
                cmd,
                staging.raw(),
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
            LayoutTransition::TO_SHADER_READ.record(&self.device, cmd, image);
        })?;

        let new_view = self.create_image_view(image, descriptor.format)?;
        if let GpuTexture::Vulkan { view, .. } = &mut texture {
            *view = new_view;
        }

        log::debug!(
            "Uploaded texture '{}' ({}x{})",
            label,
            descriptor.width,
            descriptor.height
        );
        Ok(texture)
    }

    fn create_sampler(&self, label: &str) -> GraphicsResult<GpuSampler> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::NEAREST)
            .min_filter(vk::Filter::NEAREST)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .max_lod(vk::LOD_CLAMP_NONE);

        let sampler = unsafe { self.device.create_sampler(&create_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!(
                "Failed to create sampler '{}': {:?}",
                label, e
            ))
        })?;

        Ok(GpuSampler::Vulkan {
            device: self.device.clone(),
            sampler,
        })
    }

    fn create_semaphore(&self) -> GraphicsResult<vk::Semaphore> {
        let create_info = vk::SemaphoreCreateInfo::default();
        unsafe { self.device.create_semaphore(&create_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create semaphore: {:?}", e))
        })
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn create_fence(&self, signaled: bool) -> GraphicsResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        unsafe { self.device.create_fence(&create_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create fence: {:?}", e))
        })
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) };
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> GraphicsResult<()> {
        unsafe { self.device.wait_for_fences(&[fence], true, u64::MAX) }
            .map_err(|e| GraphicsError::from_vk("Failed to wait for fence", e))
    }

    fn reset_fence(&self, fence: vk::Fence) -> GraphicsResult<()> {
        unsafe { self.device.reset_fences(&[fence]) }
            .map_err(|e| GraphicsError::from_vk("Failed to reset fence", e))
    }

    fn is_fence_signaled(&self, fence: vk::Fence) -> GraphicsResult<bool> {
        unsafe { self.device.get_fence_status(fence) }
            .map_err(|e| GraphicsError::from_vk("Failed to query fence", e))
    }

    fn allocate_command_buffers(&self, count: u32) -> GraphicsResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| GraphicsError::from_vk("Failed to allocate command buffers", e))
    }

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        if command_buffers.is_empty() {
            return;
        }
        unsafe {
            self.device
                .free_command_buffers(self.command_pool, command_buffers)
        };
    }

    fn record_frame(
        &self,
        command_buffer: vk::CommandBuffer,
        recording: &FrameRecording<'_>,
        overlay: Option<&mut dyn OverlayRenderer>,
    ) -> GraphicsResult<()> {
        recording::record_frame(&self.device, command_buffer, recording, overlay)
    }

    fn submit_frame(&self, submission: &FrameSubmission) -> GraphicsResult<()> {
        let wait_semaphores = [submission.wait_semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [submission.command_buffer];
        let signal_semaphores = [submission.signal_semaphore];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .queue_submit(self.queue, &[submit_info], submission.fence)
        }
        .map_err(|e| GraphicsError::from_vk("Failed to submit frame", e))
    }

    fn submit_empty(&self, wait_semaphore: vk::Semaphore, fence: vk::Fence) -> GraphicsResult<()> {
        let wait_semaphores = [wait_semaphore];
        let wait_stages = [vk::PipelineStageFlags::ALL_COMMANDS];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages);

        unsafe { self.device.queue_submit(self.queue, &[submit_info], fence) }
            .map_err(|e| GraphicsError::from_vk("Failed to submit semaphore wait", e))
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> GraphicsResult<vk::DescriptorSetLayout> {
        descriptor::create_descriptor_set_layout(&self.device, bindings)
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) };
    }

    fn create_descriptor_pool(
        &self,
        sizes: &DescriptorPoolSizes,
    ) -> GraphicsResult<vk::DescriptorPool> {
        descriptor::create_descriptor_pool(&self.device, sizes)
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) };
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        variable_count: Option<u32>,
    ) -> GraphicsResult<vk::DescriptorSet> {
        descriptor::allocate_descriptor_set(&self.device, pool, layout, variable_count)
    }

    fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> GraphicsResult<()> {
        unsafe { self.device.free_descriptor_sets(pool, sets) }
            .map_err(|e| GraphicsError::from_vk("Failed to free descriptor sets", e))
    }

    fn write_descriptor(
        &self,
        set: vk::DescriptorSet,
        write: DescriptorWrite<'_>,
    ) -> GraphicsResult<()> {
        descriptor::write_descriptor(&self.device, set, write);
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> GraphicsResult<vk::PipelineLayout> {
        pipeline::create_pipeline_layout(&self.device, set_layouts)
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) };
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> GraphicsResult<vk::Pipeline> {
        pipeline::create_graphics_pipeline(&self.device, descriptor)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) };
    }
}
