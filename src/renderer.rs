//! Per-frame update and submission.
//!
//! [`FrameRenderer::draw_frame`] runs the whole protocol for one frame:
//!
//! 1. cull and pack the scene on the CPU (capacity and texture index errors
//!    surface here, before any GPU state changes)
//! 2. wait for the frame slot's fence, acquire an image
//! 3. wait for the image's last fence, hand the image to this frame slot
//! 4. upload the camera, stage the instances and record
//! 5. reset the fence, submit, present, advance the pacing index
//!
//! A stale or suboptimal surface at acquisition, or a stale one at
//! presentation, rebuilds the swapchain ring and drops the frame. An image
//! acquired on a suboptimal surface is released with an empty submission
//! first. Any error after acquisition leaves the renderer failed: later calls
//! return an error instead of waiting on a fence nothing will signal.

use bytemuck::bytes_of;
use glam::Mat4;

use crate::backend::{
    AcquireOutcome, BufferCopy, BufferDescriptor, BufferUsage, FrameRecording, FrameSubmission,
    GpuBuffer, GpuSampler, MemoryKind, PresentOutcome, RenderBackend,
};
use crate::config::{FrameParams, RendererConfig};
use crate::error::{GraphicsError, GraphicsResult};
use crate::overlay::OverlayRenderer;
use crate::pipeline::{FrameBindings, SpritePipeline};
use crate::resources::{QuadMesh, TextureData, TextureRegistry};
use crate::scene::{pack_instances, CameraUniform, InstanceData, SceneView};
use crate::swapchain::{FrameSlot, Swapchain};

/// What happened to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and queued for presentation.
    Presented,
    /// The surface went stale; the ring was rebuilt and the frame dropped.
    SwapchainRebuilt,
    /// The surface has a zero extent (minimized window); nothing was done.
    Skipped,
}

/// Buffers duplicated per frame in flight so the CPU can fill frame k+1
/// while the GPU still reads frame k.
#[derive(Debug)]
struct FrameResources {
    camera_buffer: GpuBuffer,
    instance_staging: GpuBuffer,
    instance_buffer: GpuBuffer,
}

impl FrameResources {
    fn new<B: RenderBackend + ?Sized>(
        backend: &B,
        max_instances: usize,
        index: usize,
    ) -> GraphicsResult<Self> {
        let instance_bytes = max_instances as u64 * InstanceData::SIZE;

        let camera_buffer = backend.create_buffer(
            &BufferDescriptor::new(
                CameraUniform::SIZE,
                BufferUsage::UNIFORM,
                MemoryKind::HostVisible,
            )
            .with_label(format!("camera {}", index)),
        )?;
        let instance_staging = backend.create_buffer(
            &BufferDescriptor::new(
                instance_bytes,
                BufferUsage::TRANSFER_SRC,
                MemoryKind::HostVisible,
            )
            .with_label(format!("instance staging {}", index)),
        )?;
        let instance_buffer = backend.create_buffer(
            &BufferDescriptor::new(
                instance_bytes,
                BufferUsage::STORAGE | BufferUsage::TRANSFER_DST,
                MemoryKind::DeviceLocal,
            )
            .with_label(format!("instances {}", index)),
        )?;

        Ok(Self {
            camera_buffer,
            instance_staging,
            instance_buffer,
        })
    }
}

fn frame_bindings(frames: &[FrameResources]) -> Vec<FrameBindings<'_>> {
    frames
        .iter()
        .map(|frame| FrameBindings {
            camera_buffer: &frame.camera_buffer,
            instance_buffer: &frame.instance_buffer,
        })
        .collect()
}

/// Drives the swapchain ring, the sprite pipeline and the per-frame buffers.
///
/// Owns the backend, which is dropped last.
pub struct FrameRenderer<B: RenderBackend> {
    config: RendererConfig,
    swapchain: Swapchain,
    pipeline: SpritePipeline,
    textures: TextureRegistry,
    frames: Vec<FrameResources>,
    quad: QuadMesh,
    sampler: GpuSampler,
    /// Reused across frames to avoid reallocating the packed instances.
    scratch: Vec<InstanceData>,
    window_extent: (u32, u32),
    rebuild_pending: bool,
    /// Set when a frame fails after acquiring an image.
    failure: Option<String>,
    destroyed: bool,
    backend: B,
}

impl<B: RenderBackend> FrameRenderer<B> {
    /// Create the swapchain ring, per-frame buffers, quad mesh and pipeline.
    ///
    /// `window_extent` is the framebuffer size in pixels.
    pub fn new(
        backend: B,
        config: RendererConfig,
        window_extent: (u32, u32),
    ) -> GraphicsResult<Self> {
        config.validate()?;

        let mut swapchain = Swapchain::new(&backend, &config, window_extent)?;

        let (quad, sampler, frames, pipeline) =
            match Self::create_resources(&backend, &config, &swapchain) {
                Ok(resources) => resources,
                Err(e) => {
                    if let Err(destroy_error) = swapchain.destroy(&backend) {
                        log::error!("Failed to release swapchain: {}", destroy_error);
                    }
                    return Err(e);
                }
            };

        log::info!(
            "Frame renderer ready on {} ({} instances per frame)",
            backend.name(),
            config.max_instances
        );

        Ok(Self {
            textures: TextureRegistry::new(config.max_textures),
            config,
            swapchain,
            pipeline,
            frames,
            quad,
            sampler,
            scratch: Vec::new(),
            window_extent,
            rebuild_pending: false,
            failure: None,
            destroyed: false,
            backend,
        })
    }

    fn create_resources(
        backend: &B,
        config: &RendererConfig,
        swapchain: &Swapchain,
    ) -> GraphicsResult<(QuadMesh, GpuSampler, Vec<FrameResources>, SpritePipeline)> {
        let quad = QuadMesh::upload(backend)?;
        let sampler = backend.create_sampler("sprite sampler")?;
        let frames = (0..config.frames_in_flight)
            .map(|index| FrameResources::new(backend, config.max_instances, index))
            .collect::<GraphicsResult<Vec<_>>>()?;
        let pipeline = SpritePipeline::new(
            backend,
            swapchain.format(),
            config.max_textures,
            &frame_bindings(&frames),
            &sampler,
            &[],
        )?;
        Ok((quad, sampler, frames, pipeline))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn texture_count(&self) -> u32 {
        self.textures.len()
    }

    /// Record a new framebuffer size. The ring is rebuilt on the next frame
    /// with a non-zero extent.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.window_extent != (width, height) {
            self.window_extent = (width, height);
            self.rebuild_pending = true;
        }
    }

    /// Decode an encoded image and register it. Returns its texture index.
    pub fn load_texture(&mut self, bytes: &[u8], name: &str) -> GraphicsResult<u32> {
        let data = TextureData::from_bytes(bytes, name)?;
        self.register_texture(&data)
    }

    /// Register tightly packed RGBA8 pixels. Returns the texture index.
    pub fn load_texture_rgba(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> GraphicsResult<u32> {
        let name = format!("texture {}", self.textures.len());
        let data = TextureData::from_rgba(width, height, pixels.to_vec(), &name)?;
        self.register_texture(&data)
    }

    /// Upload `data` and re-register the texture array of every global set.
    pub fn register_texture(&mut self, data: &TextureData) -> GraphicsResult<u32> {
        self.ensure_alive()?;

        // The global sets are about to be freed; nothing may still read them.
        self.backend.wait_idle()?;

        let index = self.textures.register(&self.backend, data)?;
        self.pipeline.rebind_textures(
            &self.backend,
            &frame_bindings(&self.frames),
            &self.sampler,
            self.textures.textures(),
        )?;
        Ok(index)
    }

    /// Draw one frame of `scene`.
    pub fn draw_frame(
        &mut self,
        scene: &SceneView<'_>,
        params: FrameParams,
        overlay: Option<&mut dyn OverlayRenderer>,
    ) -> GraphicsResult<FrameOutcome> {
        self.ensure_alive()?;
        if !(params.pixels_per_unit.is_finite() && params.pixels_per_unit > 0.0) {
            return Err(GraphicsError::InvalidParameter(format!(
                "pixels per unit must be positive, got {}",
                params.pixels_per_unit
            )));
        }

        if self.surface_is_empty()? {
            log::trace!("Surface has a zero extent, skipping frame");
            return Ok(FrameOutcome::Skipped);
        }
        if self.rebuild_pending {
            self.rebuild_swapchain()?;
            if self.rebuild_pending {
                return Ok(FrameOutcome::Skipped);
            }
        }

        let extent = self.swapchain.extent();
        let camera = scene
            .camera
            .fitted((extent.width, extent.height), params.pixels_per_unit);
        let instance_count = pack_instances(
            scene,
            &camera,
            params.pixels_per_unit,
            self.config.max_instances as u32,
            self.textures.len(),
            &mut self.scratch,
        )?;

        let frame = *self.swapchain.current_frame();
        self.backend.wait_for_fence(frame.fence)?;

        let image_index = match self
            .backend
            .acquire_next_image(self.swapchain.handle(), frame.start_semaphore)?
        {
            AcquireOutcome::Acquired(index) => index,
            AcquireOutcome::Suboptimal(index) => {
                log::warn!("Swapchain suboptimal at acquire of image {}, rebuilding", index);
                let released = self.release_acquisition(&frame);
                self.fail_on_error(released)?;
                self.rebuild_swapchain()?;
                return Ok(FrameOutcome::SwapchainRebuilt);
            }
            AcquireOutcome::Stale => {
                log::warn!("Swapchain stale at acquire, rebuilding");
                self.rebuild_swapchain()?;
                return Ok(FrameOutcome::SwapchainRebuilt);
            }
        };

        let presented = self.submit_acquired(
            &frame,
            image_index,
            camera.view_projection(),
            instance_count,
            overlay,
        );
        match self.fail_on_error(presented)? {
            PresentOutcome::Presented => {
                self.swapchain.move_to_next_frame();
                Ok(FrameOutcome::Presented)
            }
            PresentOutcome::Stale => {
                log::warn!("Swapchain stale at present, rebuilding");
                self.rebuild_swapchain()?;
                Ok(FrameOutcome::SwapchainRebuilt)
            }
        }
    }

    /// Record, submit and present into an acquired image.
    fn submit_acquired(
        &mut self,
        frame: &FrameSlot,
        image_index: u32,
        view_projection: Mat4,
        instance_count: u32,
        overlay: Option<&mut dyn OverlayRenderer>,
    ) -> GraphicsResult<PresentOutcome> {
        let frame_index = self.swapchain.current_frame_index();
        let extent = self.swapchain.extent();

        let slot = *self.swapchain.image_slot(image_index)?;
        if let Some(last_fence) = slot.last_fence {
            self.backend.wait_for_fence(last_fence)?;
        }
        self.swapchain.image_slot_mut(image_index)?.last_fence = Some(frame.fence);

        let resources = &self.frames[frame_index];
        resources
            .camera_buffer
            .write_data(&self.backend, bytes_of(&CameraUniform::new(view_projection)))?;

        let instance_bytes: &[u8] = bytemuck::cast_slice(&self.scratch);
        if !instance_bytes.is_empty() {
            let mut staging = resources.instance_staging.map()?;
            staging[..instance_bytes.len()].copy_from_slice(instance_bytes);
        }
        let instance_upload = (!instance_bytes.is_empty()).then(|| BufferCopy {
            src: &resources.instance_staging,
            dst: &resources.instance_buffer,
            size: instance_bytes.len() as u64,
        });

        let recording = FrameRecording {
            image_index,
            image: slot.image,
            view: slot.view,
            extent,
            clear_color: self.config.clear_color,
            pipeline: self.pipeline.pipeline(),
            pipeline_layout: self.pipeline.pipeline_layout(),
            descriptor_sets: self.pipeline.descriptor_sets(frame_index)?,
            vertex_buffer: self.quad.vertex_buffer(),
            index_buffer: self.quad.index_buffer(),
            index_count: self.quad.index_count(),
            instance_count,
            instance_upload,
        };
        self.backend
            .record_frame(slot.command_buffer, &recording, overlay)?;

        // Unsignaled from here until the submission completes.
        self.backend.reset_fence(frame.fence)?;
        self.backend.submit_frame(&FrameSubmission {
            command_buffer: slot.command_buffer,
            wait_semaphore: frame.start_semaphore,
            signal_semaphore: frame.end_semaphore,
            fence: frame.fence,
        })?;

        log::trace!(
            "Submitted frame {} on image {} with {} instances",
            frame_index,
            image_index,
            instance_count
        );

        self.backend
            .present(self.swapchain.handle(), image_index, frame.end_semaphore)
    }

    /// Consume the acquisition signal of a frame that will not be drawn, so
    /// the semaphore is idle once the device is.
    fn release_acquisition(&self, frame: &FrameSlot) -> GraphicsResult<()> {
        self.backend.reset_fence(frame.fence)?;
        self.backend.submit_empty(frame.start_semaphore, frame.fence)
    }

    /// An error between acquisition and presentation leaves semaphores and
    /// fences in a state the next frame cannot recover from.
    fn fail_on_error<T>(&mut self, result: GraphicsResult<T>) -> GraphicsResult<T> {
        if let Err(e) = &result {
            log::error!("Frame failed after image acquisition: {}", e);
            self.failure = Some(e.to_string());
        }
        result
    }

    fn surface_is_empty(&self) -> GraphicsResult<bool> {
        if self.window_extent.0 == 0 || self.window_extent.1 == 0 {
            return Ok(true);
        }
        let current = self.backend.surface_support()?.capabilities.current_extent;
        Ok(current.width == 0 || current.height == 0)
    }

    /// Tear the ring down and build it again at the current extent.
    ///
    /// Stays pending when the surface has shrunk to nothing in the meantime.
    fn rebuild_swapchain(&mut self) -> GraphicsResult<()> {
        self.rebuild_pending = true;
        self.swapchain.destroy(&self.backend)?;
        if self.surface_is_empty()? {
            return Ok(());
        }

        self.swapchain = Swapchain::new(&self.backend, &self.config, self.window_extent)?;
        self.rebuild_pending = false;
        Ok(())
    }

    fn ensure_alive(&self) -> GraphicsResult<()> {
        if self.destroyed {
            return Err(GraphicsError::InvalidParameter(
                "frame renderer has been destroyed".to_string(),
            ));
        }
        if let Some(failure) = &self.failure {
            return Err(GraphicsError::Internal(format!(
                "frame renderer is unusable after a failed frame: {}",
                failure
            )));
        }
        Ok(())
    }

    /// Description of the error that left the renderer unusable, if any.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Wait for the device and release every GPU object the renderer owns.
    /// Also runs on drop.
    pub fn destroy(&mut self) -> GraphicsResult<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        self.backend.wait_idle()?;
        self.pipeline.destroy(&self.backend);
        self.swapchain.destroy(&self.backend)?;
        self.textures.clear();
        self.frames.clear();
        log::info!("Frame renderer destroyed");
        Ok(())
    }
}

impl<B: RenderBackend> Drop for FrameRenderer<B> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::error!("Failed to destroy frame renderer: {}", e);
        }
    }
}
