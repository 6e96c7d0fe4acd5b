//! Buffer write paths: persistent mapping for host-visible memory and
//! staging uploads for device-local memory.

use std::ops::{Deref, DerefMut};

use gpu_allocator::vulkan::Allocation;
use parking_lot::MutexGuard;

use crate::backend::{BufferDescriptor, BufferUsage, GpuBuffer, MemoryKind, RenderBackend};
use crate::error::{GraphicsError, GraphicsResult};

enum MappedInner<'a> {
    Host(MutexGuard<'a, Vec<u8>>),
    Device(MutexGuard<'a, Option<Allocation>>),
}

/// Scoped view of a host-visible buffer's memory.
///
/// The memory stays mapped by the allocator for the buffer's whole lifetime;
/// the guard only bounds the CPU borrow. Dropping it releases the borrow.
pub struct MappedBuffer<'a> {
    inner: MappedInner<'a>,
    len: usize,
}

impl Deref for MappedBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.inner {
            MappedInner::Host(bytes) => &bytes[..self.len],
            MappedInner::Device(allocation) => allocation
                .as_ref()
                .and_then(|a| a.mapped_slice())
                .map(|slice| &slice[..self.len])
                .unwrap_or(&[]),
        }
    }
}

impl DerefMut for MappedBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        match &mut self.inner {
            MappedInner::Host(bytes) => &mut bytes[..len],
            MappedInner::Device(allocation) => allocation
                .as_mut()
                .and_then(|a| a.mapped_slice_mut())
                .map(|slice| &mut slice[..len])
                .unwrap_or(&mut []),
        }
    }
}

impl Drop for MappedBuffer<'_> {
    fn drop(&mut self) {
        log::trace!("Unmapped {} bytes", self.len);
    }
}

impl GpuBuffer {
    /// Borrow the buffer's memory for CPU access.
    ///
    /// Fails for device-local buffers, which are only reachable through a
    /// staging copy.
    pub fn map(&self) -> GraphicsResult<MappedBuffer<'_>> {
        if !self.memory().is_host_visible() {
            return Err(GraphicsError::InvalidParameter(
                "cannot map a device-local buffer".to_string(),
            ));
        }

        let len = self.size() as usize;
        let inner = match self {
            GpuBuffer::Dummy { contents, .. } => MappedInner::Host(contents.lock()),
            GpuBuffer::Vulkan { allocation, .. } => {
                let guard = allocation.lock();
                let mapped = guard
                    .as_ref()
                    .map(|a| a.mapped_ptr().is_some())
                    .unwrap_or(false);
                if !mapped {
                    return Err(GraphicsError::Internal(
                        "host-visible buffer has no mapped pointer".to_string(),
                    ));
                }
                MappedInner::Device(guard)
            }
        };

        Ok(MappedBuffer { inner, len })
    }

    /// Write `data` to the start of the buffer.
    ///
    /// Host-visible buffers are written in place. Device-local buffers go
    /// through a temporary staging buffer and a blocking copy, so this path
    /// is meant for setup uploads, not per-frame data.
    pub fn write_data<B>(&self, backend: &B, data: &[u8]) -> GraphicsResult<()>
    where
        B: RenderBackend + ?Sized,
    {
        if data.len() as u64 > self.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes exceeds buffer size {}",
                data.len(),
                self.size()
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        match self.memory() {
            MemoryKind::HostVisible => {
                let mut mapped = self.map()?;
                mapped[..data.len()].copy_from_slice(data);
                Ok(())
            }
            MemoryKind::DeviceLocal => {
                let staging = backend.create_buffer(
                    &BufferDescriptor::new(
                        data.len() as u64,
                        BufferUsage::TRANSFER_SRC,
                        MemoryKind::HostVisible,
                    )
                    .with_label("staging"),
                )?;
                staging.map()?.copy_from_slice(data);
                backend.copy_buffer_blocking(&staging, self, data.len() as u64)
            }
        }
    }

    /// Read the whole buffer back. Host-visible buffers only.
    pub fn read_data(&self) -> GraphicsResult<Vec<u8>> {
        Ok(self.map()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    fn host_buffer(backend: &DummyBackend, size: u64) -> GpuBuffer {
        backend
            .create_buffer(&BufferDescriptor::new(
                size,
                BufferUsage::UNIFORM,
                MemoryKind::HostVisible,
            ))
            .unwrap()
    }

    #[test]
    fn test_map_write_then_read() {
        let backend = DummyBackend::new();
        let buffer = host_buffer(&backend, 8);
        {
            let mut mapped = buffer.map().unwrap();
            mapped[..4].copy_from_slice(&[1, 2, 3, 4]);
        }
        assert_eq!(buffer.read_data().unwrap(), vec![1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_map_device_local_fails() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(
                8,
                BufferUsage::STORAGE | BufferUsage::TRANSFER_DST,
                MemoryKind::DeviceLocal,
            ))
            .unwrap();
        assert!(matches!(
            buffer.map(),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_write_larger_than_buffer_fails() {
        let backend = DummyBackend::new();
        let buffer = host_buffer(&backend, 4);
        let result = buffer.write_data(&backend, &[0u8; 5]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_device_local_write_uses_staging_copy() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(
                4,
                BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
                MemoryKind::DeviceLocal,
            ))
            .unwrap();
        buffer.write_data(&backend, &[9, 8, 7, 6]).unwrap();

        assert_eq!(backend.stats().blocking_copies, 1);
        // The staging buffer is gone once the write returns.
        assert_eq!(backend.live_objects().buffers, 1);
    }
}
