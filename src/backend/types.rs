//! Plain data types exchanged between the frame protocol and a backend.

use ash::vk;
use bitflags::bitflags;

use super::{GpuBuffer, GpuSampler, GpuTexture};

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be copied from.
        const TRANSFER_SRC = 1 << 4;
        /// Buffer can be copied to.
        const TRANSFER_DST = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

impl BufferUsage {
    pub(crate) fn to_vk(self) -> vk::BufferUsageFlags {
        let mut flags = vk::BufferUsageFlags::empty();
        if self.contains(Self::VERTEX) {
            flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
        }
        if self.contains(Self::INDEX) {
            flags |= vk::BufferUsageFlags::INDEX_BUFFER;
        }
        if self.contains(Self::UNIFORM) {
            flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
        }
        if self.contains(Self::STORAGE) {
            flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
        }
        if self.contains(Self::TRANSFER_SRC) {
            flags |= vk::BufferUsageFlags::TRANSFER_SRC;
        }
        if self.contains(Self::TRANSFER_DST) {
            flags |= vk::BufferUsageFlags::TRANSFER_DST;
        }
        flags
    }
}

/// Where a buffer's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Device-local memory, written only through a staging copy.
    DeviceLocal,
    /// Host-visible, coherent memory that stays mapped for its whole lifetime.
    HostVisible,
}

impl MemoryKind {
    pub fn is_host_visible(self) -> bool {
        matches!(self, MemoryKind::HostVisible)
    }

    pub(crate) fn to_location(self) -> gpu_allocator::MemoryLocation {
        match self {
            MemoryKind::DeviceLocal => gpu_allocator::MemoryLocation::GpuOnly,
            MemoryKind::HostVisible => gpu_allocator::MemoryLocation::CpuToGpu,
        }
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Memory placement.
    pub memory: MemoryKind,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage, memory: MemoryKind) -> Self {
        Self {
            label: None,
            size,
            usage,
            memory,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub(crate) fn label_or(&self, fallback: &'static str) -> &str {
        self.label.as_deref().unwrap_or(fallback)
    }
}

/// Descriptor for a sampled 2-D texture with RGBA8 contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
}

impl TextureDescriptor {
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            label: None,
            width,
            height,
            format: vk::Format::R8G8B8A8_SRGB,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Byte size of a tightly packed RGBA8 upload.
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

/// What the surface reports it can do.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Resolved swapchain parameters handed to the backend.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainDescriptor {
    pub surface_format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub present_mode: vk::PresentModeKHR,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

/// Result of asking the presentation engine for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is available at this index.
    Acquired(u32),
    /// An image was acquired and its semaphore will be signaled, but the
    /// surface no longer matches the swapchain and should be rebuilt.
    Suboptimal(u32),
    /// The surface is out of date; no image was acquired.
    Stale,
}

/// Result of presenting an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// The surface is out of date or suboptimal and must be rebuilt.
    Stale,
}

/// Kind of resource bound at a descriptor binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    UniformBuffer,
    StorageBuffer,
    Sampler,
    SampledImage,
}

impl DescriptorKind {
    pub(crate) fn to_vk(self) -> vk::DescriptorType {
        match self {
            DescriptorKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
            DescriptorKind::Sampler => vk::DescriptorType::SAMPLER,
            DescriptorKind::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        }
    }
}

/// One binding of a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub kind: DescriptorKind,
    /// Array size, or the upper bound for a variable-count binding.
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
    /// Partially bound with a per-set variable descriptor count.
    /// Only valid on the highest binding of a layout.
    pub variable_count: bool,
}

impl DescriptorBinding {
    pub fn single(binding: u32, kind: DescriptorKind, stages: vk::ShaderStageFlags) -> Self {
        Self {
            binding,
            kind,
            count: 1,
            stages,
            variable_count: false,
        }
    }

    pub fn variable_array(
        binding: u32,
        kind: DescriptorKind,
        max_count: u32,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        Self {
            binding,
            kind,
            count: max_count,
            stages,
            variable_count: true,
        }
    }
}

/// Sizing for a descriptor pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPoolSizes {
    pub sizes: Vec<(DescriptorKind, u32)>,
    pub max_sets: u32,
}

/// A single descriptor update.
#[derive(Debug, Clone, Copy)]
pub enum DescriptorWrite<'a> {
    UniformBuffer {
        binding: u32,
        buffer: &'a GpuBuffer,
    },
    StorageBuffer {
        binding: u32,
        buffer: &'a GpuBuffer,
    },
    Sampler {
        binding: u32,
        sampler: &'a GpuSampler,
    },
    SampledImages {
        binding: u32,
        textures: &'a [GpuTexture],
    },
}

/// One vertex attribute of the single interleaved vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: vk::Format,
    pub offset: u32,
}

/// Everything needed to build the sprite pipeline.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescriptor<'a> {
    pub label: &'a str,
    pub shader_source: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub layout: vk::PipelineLayout,
    pub vertex_stride: u32,
    pub vertex_attributes: &'a [VertexAttribute],
    pub color_format: vk::Format,
}

/// A buffer-to-buffer copy recorded into the frame command buffer.
#[derive(Debug, Clone, Copy)]
pub struct BufferCopy<'a> {
    pub src: &'a GpuBuffer,
    pub dst: &'a GpuBuffer,
    pub size: u64,
}

/// Description of the single command buffer recorded each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameRecording<'a> {
    pub image_index: u32,
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
    pub clear_color: [f32; 4],
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    /// Global set (camera + textures) then instance set.
    pub descriptor_sets: [vk::DescriptorSet; 2],
    pub vertex_buffer: &'a GpuBuffer,
    pub index_buffer: &'a GpuBuffer,
    pub index_count: u32,
    pub instance_count: u32,
    /// Staging to device-local instance copy; `None` when nothing is visible.
    pub instance_upload: Option<BufferCopy<'a>>,
}

/// Semaphore and fence wiring of one queue submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSubmission {
    pub command_buffer: vk::CommandBuffer,
    /// Waited on at the color-attachment-output stage.
    pub wait_semaphore: vk::Semaphore,
    pub signal_semaphore: vk::Semaphore,
    pub fence: vk::Fence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_conversion() {
        let usage = BufferUsage::STORAGE | BufferUsage::TRANSFER_DST;
        let flags = usage.to_vk();
        assert!(flags.contains(vk::BufferUsageFlags::STORAGE_BUFFER));
        assert!(flags.contains(vk::BufferUsageFlags::TRANSFER_DST));
        assert!(!flags.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    }

    #[test]
    fn test_texture_byte_size() {
        let desc = TextureDescriptor::rgba8(16, 8);
        assert_eq!(desc.byte_size(), 16 * 8 * 4);
    }
}
