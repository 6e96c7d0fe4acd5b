//! GPU backend abstraction layer.
//!
//! The frame protocol talks to the device only through [`RenderBackend`], so
//! the same code drives real hardware and the simulated device used in tests.
//!
//! # Available Backends
//!
//! - [`vulkan::VulkanBackend`]: native Vulkan via ash
//! - [`dummy::DummyBackend`]: no-op device that records what it was asked to do
//!
//! Resources that own memory ([`GpuBuffer`], [`GpuTexture`], [`GpuSampler`])
//! are released on drop. Plain synchronization handles and descriptor objects
//! are raw `vk` handles with explicit `destroy_*` calls on the backend.

pub mod dummy;
pub mod traits;
pub mod types;
pub mod vulkan;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator};
use parking_lot::Mutex;

pub use traits::RenderBackend;
pub use types::*;

/// Handle to a GPU buffer resource.
#[allow(clippy::large_enum_variant)]
pub enum GpuBuffer {
    /// Simulated buffer backed by host memory.
    Dummy {
        buffer: vk::Buffer,
        size: u64,
        memory: MemoryKind,
        contents: Mutex<Vec<u8>>,
        live: Arc<AtomicUsize>,
    },
    /// Vulkan buffer with its gpu-allocator allocation.
    Vulkan {
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        buffer: vk::Buffer,
        allocation: Mutex<Option<Allocation>>,
        size: u64,
        memory: MemoryKind,
    },
}

impl GpuBuffer {
    /// Raw Vulkan handle.
    pub fn raw(&self) -> vk::Buffer {
        match self {
            Self::Dummy { buffer, .. } | Self::Vulkan { buffer, .. } => *buffer,
        }
    }

    /// Size in bytes, as requested at creation.
    pub fn size(&self) -> u64 {
        match self {
            Self::Dummy { size, .. } | Self::Vulkan { size, .. } => *size,
        }
    }

    pub fn memory(&self) -> MemoryKind {
        match self {
            Self::Dummy { memory, .. } | Self::Vulkan { memory, .. } => *memory,
        }
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy {
                buffer,
                size,
                memory,
                ..
            } => f
                .debug_struct("GpuBuffer::Dummy")
                .field("buffer", buffer)
                .field("size", size)
                .field("memory", memory)
                .finish_non_exhaustive(),
            Self::Vulkan {
                buffer,
                size,
                memory,
                ..
            } => f
                .debug_struct("GpuBuffer::Vulkan")
                .field("buffer", buffer)
                .field("size", size)
                .field("memory", memory)
                .finish_non_exhaustive(),
        }
    }
}

/// Handle to a sampled 2-D texture and its view.
#[allow(clippy::large_enum_variant)]
pub enum GpuTexture {
    Dummy {
        image: vk::Image,
        view: vk::ImageView,
        width: u32,
        height: u32,
        live: Arc<AtomicUsize>,
    },
    Vulkan {
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        image: vk::Image,
        view: vk::ImageView,
        allocation: Mutex<Option<Allocation>>,
        width: u32,
        height: u32,
    },
}

impl GpuTexture {
    pub fn image(&self) -> vk::Image {
        match self {
            Self::Dummy { image, .. } | Self::Vulkan { image, .. } => *image,
        }
    }

    pub fn view(&self) -> vk::ImageView {
        match self {
            Self::Dummy { view, .. } | Self::Vulkan { view, .. } => *view,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Dummy { width, height, .. } | Self::Vulkan { width, height, .. } => {
                (*width, *height)
            }
        }
    }
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (width, height) = self.size();
        f.debug_struct("GpuTexture")
            .field("image", &self.image())
            .field("view", &self.view())
            .field("width", &width)
            .field("height", &height)
            .finish_non_exhaustive()
    }
}

/// Handle to a GPU sampler resource.
pub enum GpuSampler {
    Dummy {
        sampler: vk::Sampler,
        live: Arc<AtomicUsize>,
    },
    Vulkan {
        device: ash::Device,
        sampler: vk::Sampler,
    },
}

impl GpuSampler {
    pub fn raw(&self) -> vk::Sampler {
        match self {
            Self::Dummy { sampler, .. } | Self::Vulkan { sampler, .. } => *sampler,
        }
    }
}

impl std::fmt::Debug for GpuSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuSampler")
            .field("sampler", &self.raw())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Resource cleanup (Drop implementations)
// ============================================================================

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        match self {
            GpuBuffer::Dummy { live, .. } => {
                live.fetch_sub(1, Ordering::Relaxed);
            }
            GpuBuffer::Vulkan {
                device,
                allocator,
                buffer,
                allocation,
                ..
            } => {
                unsafe {
                    device.destroy_buffer(*buffer, None);
                }
                if let Some(allocation) = allocation.lock().take() {
                    if let Err(e) = allocator.lock().free(allocation) {
                        log::error!("Failed to free buffer memory: {}", e);
                    }
                }
            }
        }
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        match self {
            GpuTexture::Dummy { live, .. } => {
                live.fetch_sub(1, Ordering::Relaxed);
            }
            GpuTexture::Vulkan {
                device,
                allocator,
                image,
                view,
                allocation,
                ..
            } => {
                unsafe {
                    device.destroy_image_view(*view, None);
                    device.destroy_image(*image, None);
                }
                if let Some(allocation) = allocation.lock().take() {
                    if let Err(e) = allocator.lock().free(allocation) {
                        log::error!("Failed to free texture memory: {}", e);
                    }
                }
            }
        }
    }
}

impl Drop for GpuSampler {
    fn drop(&mut self) {
        match self {
            GpuSampler::Dummy { live, .. } => {
                live.fetch_sub(1, Ordering::Relaxed);
            }
            GpuSampler::Vulkan { device, sampler } => unsafe {
                device.destroy_sampler(*sampler, None);
            },
        }
    }
}
