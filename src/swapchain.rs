//! Swapchain frame ring.
//!
//! Two independent rings share the swapchain:
//!
//! - [`FrameSlot`]s pace the CPU. There is one per frame in flight, each with
//!   the semaphores and fence of one submission.
//! - [`ImageSlot`]s belong to presentable images. Each owns the command buffer
//!   recorded for that image and remembers the fence of the last submission
//!   that used it.
//!
//! The presentation engine may hand out images in any order, so a frame slot
//! can land on an image whose previous submission came from another frame
//! slot. Waiting on the image's last fence before recording closes that gap.

use ash::vk;

use crate::backend::{RenderBackend, SurfaceSupport, SwapchainDescriptor};
use crate::config::{PresentMode, RendererConfig};
use crate::error::{GraphicsError, GraphicsResult};

/// Synchronization for one frame in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    /// Signaled by acquisition, waited on by the submission.
    pub start_semaphore: vk::Semaphore,
    /// Signaled by the submission, waited on by presentation.
    pub end_semaphore: vk::Semaphore,
    /// Signaled when the submission completes. Created signaled.
    pub fence: vk::Fence,
}

/// One presentable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSlot {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub command_buffer: vk::CommandBuffer,
    /// Fence of the last submission that rendered into this image.
    pub last_fence: Option<vk::Fence>,
}

/// Pick the required surface format.
pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    required: vk::Format,
) -> GraphicsResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| f.format == required)
        .ok_or(GraphicsError::SurfaceFormatNotFound(required))
}

/// Use the surface's current extent when it dictates one, otherwise clamp
/// the requested size to what the surface allows.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    requested: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: requested.0.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: requested.1.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// The minimum image count, clamped to the maximum when the surface has one.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count.max(1);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// The preferred mode when the surface offers it, FIFO otherwise.
pub fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    preferred: PresentMode,
) -> vk::PresentModeKHR {
    let wanted = preferred.to_vk();
    if available.contains(&wanted) {
        wanted
    } else {
        log::warn!("Present mode {:?} unavailable, falling back to FIFO", preferred);
        vk::PresentModeKHR::FIFO
    }
}

/// Swapchain with its image slots and frame slots.
///
/// Must be released with [`Swapchain::destroy`].
#[derive(Debug)]
pub struct Swapchain {
    swapchain: vk::SwapchainKHR,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    images: Vec<ImageSlot>,
    frames: Vec<FrameSlot>,
    frame_index: usize,
    destroyed: bool,
}

impl Swapchain {
    /// Create the ring. `requested` is the window's framebuffer size, used
    /// only when the surface does not dictate an extent.
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &B,
        config: &RendererConfig,
        requested: (u32, u32),
    ) -> GraphicsResult<Self> {
        if config.frames_in_flight == 0 {
            return Err(GraphicsError::InvalidParameter(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }

        let SurfaceSupport {
            capabilities,
            formats,
            present_modes,
        } = backend.surface_support()?;

        let surface_format = choose_surface_format(&formats, config.surface_format)?;
        let extent = choose_extent(&capabilities, requested);
        if extent.width == 0 || extent.height == 0 {
            return Err(GraphicsError::InvalidParameter(
                "cannot create a swapchain with a zero extent".to_string(),
            ));
        }
        let present_mode = choose_present_mode(&present_modes, config.present_mode);

        let descriptor = SwapchainDescriptor {
            surface_format,
            extent,
            image_count: choose_image_count(&capabilities),
            present_mode,
            pre_transform: capabilities.current_transform,
        };
        let (swapchain, images) =
            backend.create_swapchain(&descriptor, vk::SwapchainKHR::null())?;

        let mut ring = Self {
            swapchain,
            surface_format,
            extent,
            present_mode,
            images: Vec::with_capacity(images.len()),
            frames: Vec::with_capacity(config.frames_in_flight),
            frame_index: 0,
            destroyed: false,
        };

        if let Err(e) = ring.create_slots(backend, &images, config.frames_in_flight) {
            ring.release(backend);
            return Err(e);
        }

        log::info!(
            "Created swapchain {}x{} ({:?}, {:?}) with {} images and {} frames in flight",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
            ring.images.len(),
            ring.frames.len()
        );
        Ok(ring)
    }

    fn create_slots<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &B,
        images: &[vk::Image],
        frames_in_flight: usize,
    ) -> GraphicsResult<()> {
        let command_buffers = backend.allocate_command_buffers(images.len() as u32)?;
        for (&image, command_buffer) in images.iter().zip(command_buffers) {
            let view = match backend.create_image_view(image, self.surface_format.format) {
                Ok(view) => view,
                Err(e) => {
                    backend.free_command_buffers(&[command_buffer]);
                    return Err(e);
                }
            };
            self.images.push(ImageSlot {
                image,
                view,
                command_buffer,
                last_fence: None,
            });
        }

        for _ in 0..frames_in_flight {
            let start_semaphore = backend.create_semaphore()?;
            let end_semaphore = match backend.create_semaphore() {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    backend.destroy_semaphore(start_semaphore);
                    return Err(e);
                }
            };
            let fence = match backend.create_fence(true) {
                Ok(fence) => fence,
                Err(e) => {
                    backend.destroy_semaphore(start_semaphore);
                    backend.destroy_semaphore(end_semaphore);
                    return Err(e);
                }
            };
            self.frames.push(FrameSlot {
                start_semaphore,
                end_semaphore,
                fence,
            });
        }
        Ok(())
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn format(&self) -> vk::Format {
        self.surface_format.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Pacing index of the frame being prepared.
    pub fn current_frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn current_frame(&self) -> &FrameSlot {
        &self.frames[self.frame_index]
    }

    pub fn image_slot(&self, index: u32) -> GraphicsResult<&ImageSlot> {
        self.images.get(index as usize).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("no swapchain image {}", index))
        })
    }

    pub fn image_slot_mut(&mut self, index: u32) -> GraphicsResult<&mut ImageSlot> {
        self.images.get_mut(index as usize).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("no swapchain image {}", index))
        })
    }

    /// Advance the pacing index after a presented frame.
    pub fn move_to_next_frame(&mut self) {
        self.frame_index = (self.frame_index + 1) % self.frames.len();
    }

    /// Wait for the device to go idle, then release every handle.
    pub fn destroy<B: RenderBackend + ?Sized>(&mut self, backend: &B) -> GraphicsResult<()> {
        if self.destroyed {
            return Ok(());
        }
        backend.wait_idle()?;
        self.release(backend);
        log::debug!("Destroyed swapchain");
        Ok(())
    }

    fn release<B: RenderBackend + ?Sized>(&mut self, backend: &B) {
        let command_buffers: Vec<vk::CommandBuffer> =
            self.images.iter().map(|slot| slot.command_buffer).collect();
        if !command_buffers.is_empty() {
            backend.free_command_buffers(&command_buffers);
        }

        for frame in self.frames.drain(..) {
            backend.destroy_semaphore(frame.start_semaphore);
            backend.destroy_semaphore(frame.end_semaphore);
            backend.destroy_fence(frame.fence);
        }
        for slot in self.images.drain(..) {
            backend.destroy_image_view(slot.view);
        }
        backend.destroy_swapchain(self.swapchain);

        self.swapchain = vk::SwapchainKHR::null();
        self.frame_index = 0;
        self.destroyed = true;
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        if !self.destroyed {
            log::warn!("Swapchain dropped without destroy(); its handles are leaked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{default_surface_support, DummyBackend};

    fn caps(current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: 16,
                height: 16,
            },
            max_image_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_extent_uses_current_when_fixed() {
        let extent = choose_extent(&caps((640, 480)), (2000, 10));
        assert_eq!((extent.width, extent.height), (640, 480));
    }

    #[test]
    fn test_extent_clamps_when_free() {
        let extent = choose_extent(&caps((u32::MAX, u32::MAX)), (2000, 10));
        assert_eq!((extent.width, extent.height), (1024, 16));
    }

    #[test]
    fn test_image_count_clamp() {
        let mut capabilities = caps((1, 1));
        capabilities.min_image_count = 3;
        capabilities.max_image_count = 2;
        assert_eq!(choose_image_count(&capabilities), 2);
        capabilities.max_image_count = 0;
        assert_eq!(choose_image_count(&capabilities), 3);
    }

    #[test]
    fn test_present_mode_fallback() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(
            choose_present_mode(&modes, PresentMode::Mailbox),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&modes, PresentMode::Immediate),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_missing_format_is_fatal() {
        let mut surface = default_surface_support();
        surface
            .formats
            .retain(|f| f.format != vk::Format::B8G8R8A8_UNORM);
        let backend = DummyBackend::with_surface(surface);

        let result = Swapchain::new(&backend, &RendererConfig::default(), (800, 600));
        assert!(matches!(
            result,
            Err(GraphicsError::SurfaceFormatNotFound(vk::Format::B8G8R8A8_UNORM))
        ));
        assert_eq!(backend.live_objects().swapchains, 0);
    }

    #[test]
    fn test_ring_counts_and_pacing() {
        let backend = DummyBackend::new();
        let config = RendererConfig::default().with_frames_in_flight(2);
        let mut ring = Swapchain::new(&backend, &config, (800, 600)).unwrap();

        assert_eq!(ring.image_count(), 3);
        assert_eq!(ring.frames_in_flight(), 2);
        let live = backend.live_objects();
        assert_eq!(live.image_views, 3);
        assert_eq!(live.command_buffers, 3);
        assert_eq!(live.semaphores, 4);
        assert_eq!(live.fences, 2);
        assert!(backend.is_fence_signaled(ring.current_frame().fence).unwrap());

        let first = *ring.current_frame();
        ring.move_to_next_frame();
        assert_eq!(ring.current_frame_index(), 1);
        assert_ne!(*ring.current_frame(), first);
        ring.move_to_next_frame();
        assert_eq!(ring.current_frame_index(), 0);
        assert_eq!(*ring.current_frame(), first);

        assert!(ring.image_slot(2).is_ok());
        assert!(ring.image_slot(3).is_err());

        ring.destroy(&backend).unwrap();
        assert_eq!(backend.live_objects(), Default::default());
        assert_eq!(backend.stats().wait_idles, 1);
    }

    #[test]
    fn test_zero_extent_is_rejected() {
        let backend = DummyBackend::new();
        backend.set_surface_extent(0, 0);
        let result = Swapchain::new(&backend, &RendererConfig::default(), (0, 0));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }
}
