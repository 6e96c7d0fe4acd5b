//! Vertex format and the unit quad every sprite instance is drawn with.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::backend::{
    BufferDescriptor, BufferUsage, GpuBuffer, MemoryKind, RenderBackend, VertexAttribute,
};
use crate::error::GraphicsResult;

/// Interleaved sprite vertex: position, color and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<Vertex>(), 32);

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            location: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        },
        VertexAttribute {
            location: 1,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 12,
        },
        VertexAttribute {
            location: 2,
            format: vk::Format::R32G32_SFLOAT,
            offset: 24,
        },
    ];

    pub const fn new(position: [f32; 3], color: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }
}

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Unit quad spanning (0,0) to (1,1) in model space.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([0.0, 0.0, 0.0], WHITE, [0.0, 0.0]),
    Vertex::new([1.0, 0.0, 0.0], WHITE, [1.0, 0.0]),
    Vertex::new([1.0, 1.0, 0.0], WHITE, [1.0, 1.0]),
    Vertex::new([0.0, 1.0, 0.0], WHITE, [0.0, 1.0]),
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Device-local vertex and index buffers of the unit quad.
#[derive(Debug)]
pub struct QuadMesh {
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
}

impl QuadMesh {
    /// Upload the quad once through the staging path.
    pub fn upload<B: RenderBackend + ?Sized>(backend: &B) -> GraphicsResult<Self> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let index_bytes: &[u8] = bytemuck::cast_slice(&QUAD_INDICES);

        let vertex_buffer = backend.create_buffer(
            &BufferDescriptor::new(
                vertex_bytes.len() as u64,
                BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
                MemoryKind::DeviceLocal,
            )
            .with_label("quad vertices"),
        )?;
        vertex_buffer.write_data(backend, vertex_bytes)?;

        let index_buffer = backend.create_buffer(
            &BufferDescriptor::new(
                index_bytes.len() as u64,
                BufferUsage::INDEX | BufferUsage::TRANSFER_DST,
                MemoryKind::DeviceLocal,
            )
            .with_label("quad indices"),
        )?;
        index_buffer.write_data(backend, index_bytes)?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
        })
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &GpuBuffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        QUAD_INDICES.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_quad_winding_is_clockwise_in_screen_space() {
        // With y pointing down on screen, (0,0) -> (1,0) -> (1,1) turns clockwise.
        for tri in QUAD_INDICES.chunks(3) {
            let a = QUAD_VERTICES[tri[0] as usize].position;
            let b = QUAD_VERTICES[tri[1] as usize].position;
            let c = QUAD_VERTICES[tri[2] as usize].position;
            let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(cross > 0.0);
        }
    }

    #[test]
    fn test_quad_upload() {
        let backend = DummyBackend::new();
        let quad = QuadMesh::upload(&backend).unwrap();
        assert_eq!(quad.index_count(), 6);
        assert_eq!(quad.vertex_buffer().size(), 4 * 32);
        assert_eq!(quad.index_buffer().size(), 12);
        assert_eq!(backend.stats().blocking_copies, 2);
    }
}
