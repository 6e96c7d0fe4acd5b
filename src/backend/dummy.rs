//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't touch a GPU. Handles are fabricated from a counter,
//! buffers are host memory, and every call is recorded so tests can check
//! how the frame protocol drove the device.
//!
//! By default submissions complete immediately. With
//! [`DummyBackend::set_deferred_completion`] they stay pending until someone
//! waits on their fence, which makes the frames-in-flight overlap observable.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ash::vk::{self, Handle};
use parking_lot::Mutex;

use crate::error::{GraphicsError, GraphicsResult};
use crate::overlay::OverlayRenderer;

use super::traits::RenderBackend;
use super::types::*;
use super::{GpuBuffer, GpuSampler, GpuTexture};

/// Counts of objects currently alive on the simulated device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveObjects {
    pub swapchains: usize,
    pub swapchain_images: usize,
    pub image_views: usize,
    pub semaphores: usize,
    pub fences: usize,
    pub command_buffers: usize,
    pub buffers: usize,
    pub textures: usize,
    pub samplers: usize,
    pub descriptor_set_layouts: usize,
    pub descriptor_pools: usize,
    pub descriptor_sets: usize,
    pub pipeline_layouts: usize,
    pub pipelines: usize,
}

/// Operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub acquires: usize,
    pub fence_waits: usize,
    pub submissions: usize,
    /// Batches submitted only to consume an acquisition signal.
    pub empty_submissions: usize,
    pub presents: usize,
    pub swapchains_created: usize,
    pub blocking_copies: usize,
    pub wait_idles: usize,
    /// Protocol violations detected, such as re-recording a command buffer
    /// whose previous submission has not completed.
    pub violations: usize,
}

/// One frame recorded by [`RenderBackend::record_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedFrame {
    pub command_buffer: vk::CommandBuffer,
    pub image_index: u32,
    pub descriptor_sets: [vk::DescriptorSet; 2],
    pub instance_count: u32,
    pub index_count: u32,
    pub instance_bytes_copied: u64,
    pub overlay_recorded: bool,
}

#[derive(Debug, Default)]
struct FenceState {
    signaled: bool,
}

#[derive(Debug)]
struct PendingSubmission {
    command_buffer: vk::CommandBuffer,
    fence: vk::Fence,
}

#[derive(Debug)]
struct DummyState {
    surface: SurfaceSupport,
    swapchains: HashMap<vk::SwapchainKHR, Vec<vk::Image>>,
    image_views: HashSet<vk::ImageView>,
    semaphores: HashSet<vk::Semaphore>,
    /// Semaphores signaled by acquisition and not yet waited on.
    signaled_semaphores: HashSet<vk::Semaphore>,
    fences: HashMap<vk::Fence, FenceState>,
    command_buffers: HashSet<vk::CommandBuffer>,
    descriptor_set_layouts: HashMap<vk::DescriptorSetLayout, Vec<DescriptorBinding>>,
    descriptor_pools: HashSet<vk::DescriptorPool>,
    descriptor_sets: HashMap<vk::DescriptorSet, vk::DescriptorPool>,
    pipeline_layouts: HashSet<vk::PipelineLayout>,
    pipelines: HashSet<vk::Pipeline>,
    pending: Vec<PendingSubmission>,
    deferred_completion: bool,
    stale_acquires: usize,
    suboptimal_acquires: usize,
    stale_presents: usize,
    acquire_script: VecDeque<u32>,
    next_image: u32,
    stats: DummyStats,
    recorded: Vec<RecordedFrame>,
}

/// Simulated GPU device.
#[derive(Debug)]
pub struct DummyBackend {
    next_handle: AtomicU64,
    live_buffers: Arc<AtomicUsize>,
    live_textures: Arc<AtomicUsize>,
    live_samplers: Arc<AtomicUsize>,
    state: Mutex<DummyState>,
}

/// Surface the dummy device reports until told otherwise.
pub fn default_surface_support() -> SurfaceSupport {
    SurfaceSupport {
        capabilities: vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 8,
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            max_image_array_layers: 1,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        },
        formats: vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ],
        present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
    }
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::with_surface(default_surface_support())
    }

    /// Create a dummy backend reporting the given surface support.
    pub fn with_surface(surface: SurfaceSupport) -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            live_buffers: Arc::new(AtomicUsize::new(0)),
            live_textures: Arc::new(AtomicUsize::new(0)),
            live_samplers: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(DummyState {
                surface,
                swapchains: HashMap::new(),
                image_views: HashSet::new(),
                semaphores: HashSet::new(),
                signaled_semaphores: HashSet::new(),
                fences: HashMap::new(),
                command_buffers: HashSet::new(),
                descriptor_set_layouts: HashMap::new(),
                descriptor_pools: HashSet::new(),
                descriptor_sets: HashMap::new(),
                pipeline_layouts: HashSet::new(),
                pipelines: HashSet::new(),
                pending: Vec::new(),
                deferred_completion: false,
                stale_acquires: 0,
                suboptimal_acquires: 0,
                stale_presents: 0,
                acquire_script: VecDeque::new(),
                next_image: 0,
                stats: DummyStats::default(),
                recorded: Vec::new(),
            }),
        }
    }

    fn next_raw(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    // ===== Test controls =====

    /// Keep submissions pending until their fence is waited on.
    pub fn set_deferred_completion(&self, deferred: bool) {
        self.state.lock().deferred_completion = deferred;
    }

    /// Make the next `count` acquisitions report a stale surface.
    pub fn inject_stale_acquires(&self, count: usize) {
        self.state.lock().stale_acquires = count;
    }

    /// Make the next `count` successful acquisitions report a suboptimal
    /// surface. The image is still acquired and the semaphore signaled.
    pub fn inject_suboptimal_acquires(&self, count: usize) {
        self.state.lock().suboptimal_acquires = count;
    }

    /// Make the next `count` presentations report a stale surface.
    pub fn inject_stale_presents(&self, count: usize) {
        self.state.lock().stale_presents = count;
    }

    /// Hand out image indices in this order before falling back to round robin.
    pub fn script_acquire_order(&self, indices: &[u32]) {
        self.state.lock().acquire_script = indices.iter().copied().collect();
    }

    /// Change the framebuffer extent reported by the surface.
    pub fn set_surface_extent(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.surface.capabilities.current_extent = vk::Extent2D { width, height };
    }

    /// Complete every pending submission.
    pub fn complete_all_submissions(&self) {
        let mut state = self.state.lock();
        let pending = std::mem::take(&mut state.pending);
        for submission in pending {
            if let Some(fence) = state.fences.get_mut(&submission.fence) {
                fence.signaled = true;
            }
        }
    }

    // ===== Instrumentation =====

    pub fn stats(&self) -> DummyStats {
        self.state.lock().stats
    }

    pub fn live_objects(&self) -> LiveObjects {
        let state = self.state.lock();
        LiveObjects {
            swapchains: state.swapchains.len(),
            swapchain_images: state.swapchains.values().map(Vec::len).sum(),
            image_views: state.image_views.len(),
            semaphores: state.semaphores.len(),
            fences: state.fences.len(),
            command_buffers: state.command_buffers.len(),
            buffers: self.live_buffers.load(Ordering::Relaxed),
            textures: self.live_textures.load(Ordering::Relaxed),
            samplers: self.live_samplers.load(Ordering::Relaxed),
            descriptor_set_layouts: state.descriptor_set_layouts.len(),
            descriptor_pools: state.descriptor_pools.len(),
            descriptor_sets: state.descriptor_sets.len(),
            pipeline_layouts: state.pipeline_layouts.len(),
            pipelines: state.pipelines.len(),
        }
    }

    /// Frames recorded so far, oldest first.
    pub fn recorded_frames(&self) -> Vec<RecordedFrame> {
        self.state.lock().recorded.clone()
    }

    pub fn pending_submissions(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn violation(state: &mut DummyState, message: String) -> GraphicsError {
        state.stats.violations += 1;
        log::error!("DummyBackend: {}", message);
        GraphicsError::Internal(message)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
        log::trace!("DummyBackend: wait_idle");
        self.complete_all_submissions();
        self.state.lock().stats.wait_idles += 1;
        Ok(())
    }

    fn surface_support(&self) -> GraphicsResult<SurfaceSupport> {
        Ok(self.state.lock().surface.clone())
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
        _old_swapchain: vk::SwapchainKHR,
    ) -> GraphicsResult<(vk::SwapchainKHR, Vec<vk::Image>)> {
        log::trace!(
            "DummyBackend: creating swapchain {}x{} with {} images",
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.image_count
        );
        let swapchain = vk::SwapchainKHR::from_raw(self.next_raw());
        let images: Vec<vk::Image> = (0..descriptor.image_count)
            .map(|_| vk::Image::from_raw(self.next_raw()))
            .collect();

        let mut state = self.state.lock();
        state.swapchains.insert(swapchain, images.clone());
        state.stats.swapchains_created += 1;
        state.next_image = 0;
        Ok((swapchain, images))
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        log::trace!("DummyBackend: destroying swapchain {:?}", swapchain);
        self.state.lock().swapchains.remove(&swapchain);
    }

    fn create_image_view(
        &self,
        _image: vk::Image,
        _format: vk::Format,
    ) -> GraphicsResult<vk::ImageView> {
        let view = vk::ImageView::from_raw(self.next_raw());
        self.state.lock().image_views.insert(view);
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.state.lock().image_views.remove(&view);
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> GraphicsResult<AcquireOutcome> {
        let mut state = self.state.lock();
        state.stats.acquires += 1;

        if state.stale_acquires > 0 {
            state.stale_acquires -= 1;
            log::trace!("DummyBackend: acquire reports a stale surface");
            return Ok(AcquireOutcome::Stale);
        }

        let image_count = match state.swapchains.get(&swapchain) {
            Some(images) => images.len() as u32,
            None => {
                return Err(Self::violation(
                    &mut state,
                    format!("acquire on unknown swapchain {:?}", swapchain),
                ))
            }
        };

        if !state.signaled_semaphores.insert(signal) {
            return Err(Self::violation(
                &mut state,
                format!("acquire signals semaphore {:?} that is already signaled", signal),
            ));
        }

        let index = match state.acquire_script.pop_front() {
            Some(index) => index,
            None => {
                let index = state.next_image;
                state.next_image = (state.next_image + 1) % image_count.max(1);
                index
            }
        };

        if index >= image_count {
            return Err(Self::violation(
                &mut state,
                format!("scripted image index {} out of range", index),
            ));
        }

        if state.suboptimal_acquires > 0 {
            state.suboptimal_acquires -= 1;
            log::trace!("DummyBackend: acquired image {} on a suboptimal surface", index);
            return Ok(AcquireOutcome::Suboptimal(index));
        }

        log::trace!("DummyBackend: acquired image {}", index);
        Ok(AcquireOutcome::Acquired(index))
    }

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        _wait: vk::Semaphore,
    ) -> GraphicsResult<PresentOutcome> {
        let mut state = self.state.lock();
        state.stats.presents += 1;

        if !state.swapchains.contains_key(&swapchain) {
            return Err(Self::violation(
                &mut state,
                format!("present on unknown swapchain {:?}", swapchain),
            ));
        }

        if state.stale_presents > 0 {
            state.stale_presents -= 1;
            log::trace!("DummyBackend: present reports a stale surface");
            return Ok(PresentOutcome::Stale);
        }

        log::trace!("DummyBackend: presented image {}", image_index);
        Ok(PresentOutcome::Presented)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<GpuBuffer> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer '{}' has zero size",
                descriptor.label_or("unnamed")
            )));
        }
        self.live_buffers.fetch_add(1, Ordering::Relaxed);
        Ok(GpuBuffer::Dummy {
            buffer: vk::Buffer::from_raw(self.next_raw()),
            size: descriptor.size,
            memory: descriptor.memory,
            contents: Mutex::new(vec![0u8; descriptor.size as usize]),
            live: Arc::clone(&self.live_buffers),
        })
    }

    fn copy_buffer_blocking(
        &self,
        src: &GpuBuffer,
        dst: &GpuBuffer,
        size: u64,
    ) -> GraphicsResult<()> {
        log::trace!("DummyBackend: blocking copy of {} bytes", size);
        copy_contents(src, dst, size)?;
        self.state.lock().stats.blocking_copies += 1;
        Ok(())
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: &[u8],
    ) -> GraphicsResult<GpuTexture> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{})",
            descriptor.label,
            descriptor.width,
            descriptor.height
        );
        if pixels.len() as u64 != descriptor.byte_size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture upload has {} bytes, expected {}",
                pixels.len(),
                descriptor.byte_size()
            )));
        }
        self.live_textures.fetch_add(1, Ordering::Relaxed);
        Ok(GpuTexture::Dummy {
            image: vk::Image::from_raw(self.next_raw()),
            view: vk::ImageView::from_raw(self.next_raw()),
            width: descriptor.width,
            height: descriptor.height,
            live: Arc::clone(&self.live_textures),
        })
    }

    fn create_sampler(&self, label: &str) -> GraphicsResult<GpuSampler> {
        log::trace!("DummyBackend: creating sampler {:?}", label);
        self.live_samplers.fetch_add(1, Ordering::Relaxed);
        Ok(GpuSampler::Dummy {
            sampler: vk::Sampler::from_raw(self.next_raw()),
            live: Arc::clone(&self.live_samplers),
        })
    }

    fn create_semaphore(&self) -> GraphicsResult<vk::Semaphore> {
        let semaphore = vk::Semaphore::from_raw(self.next_raw());
        self.state.lock().semaphores.insert(semaphore);
        Ok(semaphore)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        let mut state = self.state.lock();
        if state.signaled_semaphores.remove(&semaphore) {
            let _ = Self::violation(
                &mut state,
                format!("semaphore {:?} destroyed with a pending signal", semaphore),
            );
        }
        state.semaphores.remove(&semaphore);
    }

    fn create_fence(&self, signaled: bool) -> GraphicsResult<vk::Fence> {
        let fence = vk::Fence::from_raw(self.next_raw());
        self.state
            .lock()
            .fences
            .insert(fence, FenceState { signaled });
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut state = self.state.lock();
        if state.pending.iter().any(|p| p.fence == fence) {
            let _ = Self::violation(
                &mut state,
                format!("fence {:?} destroyed while a submission is pending", fence),
            );
        }
        state.fences.remove(&fence);
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> GraphicsResult<()> {
        let mut state = self.state.lock();
        state.stats.fence_waits += 1;

        let signaled = match state.fences.get(&fence) {
            Some(fence_state) => fence_state.signaled,
            None => {
                return Err(Self::violation(
                    &mut state,
                    format!("wait on unknown fence {:?}", fence),
                ))
            }
        };
        if signaled {
            return Ok(());
        }

        // Waiting lets the simulated GPU retire everything up to this fence.
        match state.pending.iter().position(|p| p.fence == fence) {
            Some(position) => {
                let retired: Vec<PendingSubmission> = state.pending.drain(..=position).collect();
                for submission in retired {
                    log::trace!(
                        "DummyBackend: retired submission of {:?}",
                        submission.command_buffer
                    );
                    if let Some(fence_state) = state.fences.get_mut(&submission.fence) {
                        fence_state.signaled = true;
                    }
                }
                Ok(())
            }
            None => Err(Self::violation(
                &mut state,
                format!("wait on fence {:?} that will never be signaled", fence),
            )),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> GraphicsResult<()> {
        let mut state = self.state.lock();
        if state.pending.iter().any(|p| p.fence == fence) {
            return Err(Self::violation(
                &mut state,
                format!("reset of fence {:?} with a pending submission", fence),
            ));
        }
        match state.fences.get_mut(&fence) {
            Some(fence_state) => {
                fence_state.signaled = false;
                Ok(())
            }
            None => Err(Self::violation(
                &mut state,
                format!("reset of unknown fence {:?}", fence),
            )),
        }
    }

    fn is_fence_signaled(&self, fence: vk::Fence) -> GraphicsResult<bool> {
        let state = self.state.lock();
        state
            .fences
            .get(&fence)
            .map(|f| f.signaled)
            .ok_or_else(|| GraphicsError::InvalidParameter(format!("unknown fence {:?}", fence)))
    }

    fn allocate_command_buffers(&self, count: u32) -> GraphicsResult<Vec<vk::CommandBuffer>> {
        let buffers: Vec<vk::CommandBuffer> = (0..count)
            .map(|_| vk::CommandBuffer::from_raw(self.next_raw()))
            .collect();
        self.state
            .lock()
            .command_buffers
            .extend(buffers.iter().copied());
        Ok(buffers)
    }

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        let mut state = self.state.lock();
        for command_buffer in command_buffers {
            if state
                .pending
                .iter()
                .any(|p| p.command_buffer == *command_buffer)
            {
                let _ = Self::violation(
                    &mut state,
                    format!(
                        "command buffer {:?} freed while its submission is pending",
                        command_buffer
                    ),
                );
            }
            state.command_buffers.remove(command_buffer);
        }
    }

    fn record_frame(
        &self,
        command_buffer: vk::CommandBuffer,
        recording: &FrameRecording<'_>,
        overlay: Option<&mut dyn OverlayRenderer>,
    ) -> GraphicsResult<()> {
        {
            let mut state = self.state.lock();
            if !state.command_buffers.contains(&command_buffer) {
                return Err(Self::violation(
                    &mut state,
                    format!("record into unknown command buffer {:?}", command_buffer),
                ));
            }
            if state
                .pending
                .iter()
                .any(|p| p.command_buffer == command_buffer)
            {
                return Err(Self::violation(
                    &mut state,
                    format!(
                        "command buffer {:?} re-recorded while its submission is pending",
                        command_buffer
                    ),
                ));
            }
            for set in recording.descriptor_sets {
                if !state.descriptor_sets.contains_key(&set) {
                    return Err(Self::violation(
                        &mut state,
                        format!("frame binds unknown descriptor set {:?}", set),
                    ));
                }
            }
        }

        // The copy is executed right away: the simulated GPU runs commands at
        // record time and the staging buffer is not touched again this frame.
        let mut instance_bytes_copied = 0;
        if let Some(copy) = recording.instance_upload {
            copy_contents(copy.src, copy.dst, copy.size)?;
            instance_bytes_copied = copy.size;
        }

        let overlay_recorded = match overlay {
            Some(overlay) => {
                overlay.record(command_buffer, recording.extent)?;
                true
            }
            None => false,
        };

        log::trace!(
            "DummyBackend: recorded frame for image {} with {} instances",
            recording.image_index,
            recording.instance_count
        );

        self.state.lock().recorded.push(RecordedFrame {
            command_buffer,
            image_index: recording.image_index,
            descriptor_sets: recording.descriptor_sets,
            instance_count: recording.instance_count,
            index_count: recording.index_count,
            instance_bytes_copied,
            overlay_recorded,
        });
        Ok(())
    }

    fn submit_frame(&self, submission: &FrameSubmission) -> GraphicsResult<()> {
        let mut state = self.state.lock();

        match state.fences.get(&submission.fence) {
            Some(fence) if fence.signaled => {
                return Err(Self::violation(
                    &mut state,
                    format!("submit with signaled fence {:?}", submission.fence),
                ))
            }
            Some(_) => {}
            None => {
                return Err(Self::violation(
                    &mut state,
                    format!("submit with unknown fence {:?}", submission.fence),
                ))
            }
        }
        if state
            .pending
            .iter()
            .any(|p| p.command_buffer == submission.command_buffer)
        {
            return Err(Self::violation(
                &mut state,
                format!(
                    "command buffer {:?} submitted while already pending",
                    submission.command_buffer
                ),
            ));
        }
        if !state.signaled_semaphores.remove(&submission.wait_semaphore) {
            return Err(Self::violation(
                &mut state,
                format!(
                    "submit waits on semaphore {:?} that nothing signaled",
                    submission.wait_semaphore
                ),
            ));
        }

        state.stats.submissions += 1;
        if state.deferred_completion {
            state.pending.push(PendingSubmission {
                command_buffer: submission.command_buffer,
                fence: submission.fence,
            });
        } else if let Some(fence) = state.fences.get_mut(&submission.fence) {
            fence.signaled = true;
        }
        log::trace!(
            "DummyBackend: submitted {:?}",
            submission.command_buffer
        );
        Ok(())
    }

    fn submit_empty(&self, wait_semaphore: vk::Semaphore, fence: vk::Fence) -> GraphicsResult<()> {
        let mut state = self.state.lock();

        match state.fences.get(&fence) {
            Some(fence_state) if !fence_state.signaled => {}
            _ => {
                return Err(Self::violation(
                    &mut state,
                    format!("empty submit with unknown or signaled fence {:?}", fence),
                ))
            }
        }
        if !state.signaled_semaphores.remove(&wait_semaphore) {
            return Err(Self::violation(
                &mut state,
                format!(
                    "empty submit waits on semaphore {:?} that nothing signaled",
                    wait_semaphore
                ),
            ));
        }

        state.stats.empty_submissions += 1;
        if state.deferred_completion {
            state.pending.push(PendingSubmission {
                command_buffer: vk::CommandBuffer::null(),
                fence,
            });
        } else if let Some(fence_state) = state.fences.get_mut(&fence) {
            fence_state.signaled = true;
        }
        log::trace!("DummyBackend: empty submission consuming {:?}", wait_semaphore);
        Ok(())
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> GraphicsResult<vk::DescriptorSetLayout> {
        let highest = bindings.iter().map(|b| b.binding).max();
        if let Some(variable) = bindings.iter().find(|b| b.variable_count) {
            if Some(variable.binding) != highest {
                return Err(GraphicsError::InvalidParameter(format!(
                    "variable-count binding {} is not the highest binding",
                    variable.binding
                )));
            }
        }
        let layout = vk::DescriptorSetLayout::from_raw(self.next_raw());
        self.state
            .lock()
            .descriptor_set_layouts
            .insert(layout, bindings.to_vec());
        Ok(layout)
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.state.lock().descriptor_set_layouts.remove(&layout);
    }

    fn create_descriptor_pool(
        &self,
        sizes: &DescriptorPoolSizes,
    ) -> GraphicsResult<vk::DescriptorPool> {
        log::trace!(
            "DummyBackend: creating descriptor pool (max sets: {})",
            sizes.max_sets
        );
        let pool = vk::DescriptorPool::from_raw(self.next_raw());
        self.state.lock().descriptor_pools.insert(pool);
        Ok(pool)
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        let mut state = self.state.lock();
        state.descriptor_pools.remove(&pool);
        state.descriptor_sets.retain(|_, owner| *owner != pool);
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        variable_count: Option<u32>,
    ) -> GraphicsResult<vk::DescriptorSet> {
        let mut state = self.state.lock();
        if !state.descriptor_pools.contains(&pool) {
            return Err(GraphicsError::InvalidParameter(format!(
                "unknown descriptor pool {:?}",
                pool
            )));
        }
        let bindings = state.descriptor_set_layouts.get(&layout).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("unknown descriptor set layout {:?}", layout))
        })?;
        if let (Some(count), Some(variable)) =
            (variable_count, bindings.iter().find(|b| b.variable_count))
        {
            if count > variable.count {
                return Err(GraphicsError::InvalidParameter(format!(
                    "variable descriptor count {} exceeds capacity {}",
                    count, variable.count
                )));
            }
        }
        let set = vk::DescriptorSet::from_raw(self.next_raw());
        state.descriptor_sets.insert(set, pool);
        Ok(set)
    }

    fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> GraphicsResult<()> {
        let mut state = self.state.lock();
        for set in sets {
            match state.descriptor_sets.get(set) {
                Some(owner) if *owner == pool => {
                    state.descriptor_sets.remove(set);
                }
                _ => {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "descriptor set {:?} does not belong to pool {:?}",
                        set, pool
                    )))
                }
            }
        }
        Ok(())
    }

    fn write_descriptor(
        &self,
        set: vk::DescriptorSet,
        write: DescriptorWrite<'_>,
    ) -> GraphicsResult<()> {
        if !self.state.lock().descriptor_sets.contains_key(&set) {
            return Err(GraphicsError::InvalidParameter(format!(
                "write to unknown descriptor set {:?}",
                set
            )));
        }
        log::trace!("DummyBackend: descriptor write {:?}", write_binding(&write));
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> GraphicsResult<vk::PipelineLayout> {
        log::trace!(
            "DummyBackend: creating pipeline layout with {} sets",
            set_layouts.len()
        );
        let layout = vk::PipelineLayout::from_raw(self.next_raw());
        self.state.lock().pipeline_layouts.insert(layout);
        Ok(layout)
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.state.lock().pipeline_layouts.remove(&layout);
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> GraphicsResult<vk::Pipeline> {
        // Shaders still go through the real compiler so broken WGSL fails here too.
        super::vulkan::shader::compile_wgsl(
            descriptor.shader_source,
            naga::ShaderStage::Vertex,
            descriptor.vertex_entry,
        )?;
        super::vulkan::shader::compile_wgsl(
            descriptor.shader_source,
            naga::ShaderStage::Fragment,
            descriptor.fragment_entry,
        )?;
        log::trace!("DummyBackend: creating pipeline '{}'", descriptor.label);
        let pipeline = vk::Pipeline::from_raw(self.next_raw());
        self.state.lock().pipelines.insert(pipeline);
        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.state.lock().pipelines.remove(&pipeline);
    }
}

fn write_binding(write: &DescriptorWrite<'_>) -> u32 {
    match write {
        DescriptorWrite::UniformBuffer { binding, .. }
        | DescriptorWrite::StorageBuffer { binding, .. }
        | DescriptorWrite::Sampler { binding, .. }
        | DescriptorWrite::SampledImages { binding, .. } => *binding,
    }
}

fn copy_contents(src: &GpuBuffer, dst: &GpuBuffer, size: u64) -> GraphicsResult<()> {
    if size > src.size() || size > dst.size() {
        return Err(GraphicsError::InvalidParameter(format!(
            "copy of {} bytes exceeds buffer sizes ({} -> {})",
            size,
            src.size(),
            dst.size()
        )));
    }
    match (src, dst) {
        (
            GpuBuffer::Dummy { contents: from, .. },
            GpuBuffer::Dummy { contents: to, .. },
        ) => {
            let len = size as usize;
            let from = from.lock();
            to.lock()[..len].copy_from_slice(&from[..len]);
            Ok(())
        }
        _ => Err(GraphicsError::InvalidParameter(
            "dummy backend can only copy dummy buffers".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swapchain(backend: &DummyBackend, images: u32) -> vk::SwapchainKHR {
        let descriptor = SwapchainDescriptor {
            surface_format: vk::SurfaceFormatKHR::default(),
            extent: vk::Extent2D {
                width: 64,
                height: 64,
            },
            image_count: images,
            present_mode: vk::PresentModeKHR::FIFO,
            pre_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        };
        backend
            .create_swapchain(&descriptor, vk::SwapchainKHR::null())
            .unwrap()
            .0
    }

    #[test]
    fn test_dummy_handles_are_unique() {
        let backend = DummyBackend::new();
        let a = backend.create_fence(true).unwrap();
        let b = backend.create_fence(true).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_objects().fences, 2);
        backend.destroy_fence(a);
        assert_eq!(backend.live_objects().fences, 1);
    }

    #[test]
    fn test_dummy_buffer_drop_updates_live_count() {
        let backend = DummyBackend::new();
        let descriptor = BufferDescriptor::new(16, BufferUsage::UNIFORM, MemoryKind::HostVisible);
        let buffer = backend.create_buffer(&descriptor).unwrap();
        assert_eq!(backend.live_objects().buffers, 1);
        drop(buffer);
        assert_eq!(backend.live_objects().buffers, 0);
    }

    #[test]
    fn test_dummy_deferred_fence_completes_on_wait() {
        let backend = DummyBackend::new();
        backend.set_deferred_completion(true);
        let swapchain = swapchain(&backend, 2);
        let semaphore = backend.create_semaphore().unwrap();
        let fence = backend.create_fence(false).unwrap();
        let cmd = backend.allocate_command_buffers(1).unwrap()[0];

        backend.acquire_next_image(swapchain, semaphore).unwrap();
        backend
            .submit_frame(&FrameSubmission {
                command_buffer: cmd,
                wait_semaphore: semaphore,
                signal_semaphore: vk::Semaphore::null(),
                fence,
            })
            .unwrap();

        assert!(!backend.is_fence_signaled(fence).unwrap());
        assert_eq!(backend.pending_submissions(), 1);
        backend.wait_for_fence(fence).unwrap();
        assert!(backend.is_fence_signaled(fence).unwrap());
        assert_eq!(backend.pending_submissions(), 0);
    }

    #[test]
    fn test_dummy_wait_on_unsubmitted_fence_is_violation() {
        let backend = DummyBackend::new();
        let fence = backend.create_fence(false).unwrap();
        assert!(backend.wait_for_fence(fence).is_err());
        assert_eq!(backend.stats().violations, 1);
    }

    #[test]
    fn test_dummy_stale_injection() {
        let backend = DummyBackend::new();
        let swapchain = swapchain(&backend, 3);
        let semaphore = backend.create_semaphore().unwrap();
        backend.inject_stale_acquires(1);
        assert_eq!(
            backend.acquire_next_image(swapchain, semaphore).unwrap(),
            AcquireOutcome::Stale
        );
        assert_eq!(
            backend.acquire_next_image(swapchain, semaphore).unwrap(),
            AcquireOutcome::Acquired(0)
        );
    }

    #[test]
    fn test_dummy_suboptimal_acquire_signals_semaphore() {
        let backend = DummyBackend::new();
        let swapchain = swapchain(&backend, 3);
        let semaphore = backend.create_semaphore().unwrap();
        let fence = backend.create_fence(false).unwrap();
        backend.inject_suboptimal_acquires(1);

        assert_eq!(
            backend.acquire_next_image(swapchain, semaphore).unwrap(),
            AcquireOutcome::Suboptimal(0)
        );
        backend.submit_empty(semaphore, fence).unwrap();
        assert!(backend.is_fence_signaled(fence).unwrap());
        assert_eq!(backend.stats().empty_submissions, 1);

        backend.destroy_semaphore(semaphore);
        assert_eq!(backend.stats().violations, 0);
    }

    #[test]
    fn test_dummy_destroying_signaled_semaphore_is_violation() {
        let backend = DummyBackend::new();
        let swapchain = swapchain(&backend, 2);
        let semaphore = backend.create_semaphore().unwrap();

        backend.acquire_next_image(swapchain, semaphore).unwrap();
        backend.destroy_semaphore(semaphore);

        assert_eq!(backend.stats().violations, 1);
        assert_eq!(backend.live_objects().semaphores, 0);
    }

    #[test]
    fn test_dummy_scripted_acquire_order() {
        let backend = DummyBackend::new();
        let swapchain = swapchain(&backend, 3);
        backend.script_acquire_order(&[2, 5]);
        let a = backend.create_semaphore().unwrap();
        let b = backend.create_semaphore().unwrap();
        assert_eq!(
            backend.acquire_next_image(swapchain, a).unwrap(),
            AcquireOutcome::Acquired(2)
        );
        assert!(backend.acquire_next_image(swapchain, b).is_err());
    }

    #[test]
    fn test_dummy_variable_count_must_be_highest_binding() {
        let backend = DummyBackend::new();
        let bindings = [
            DescriptorBinding::variable_array(
                0,
                DescriptorKind::SampledImage,
                8,
                vk::ShaderStageFlags::FRAGMENT,
            ),
            DescriptorBinding::single(
                1,
                DescriptorKind::UniformBuffer,
                vk::ShaderStageFlags::VERTEX,
            ),
        ];
        assert!(backend.create_descriptor_set_layout(&bindings).is_err());
    }
}
