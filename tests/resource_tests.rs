//! Buffer and texture tests against every available backend.
//!
//! Vulkan cases use a headless device and are skipped on machines without
//! a Vulkan driver.

mod common;

use rstest::rstest;

use common::{generate_test_pattern, Backend, TestContext};
use tile_renderer::{
    backend::{BufferUsage, MemoryKind},
    resources::{QuadMesh, TextureData, TextureRegistry, QUAD_INDICES},
    GraphicsError,
};

macro_rules! context_or_skip {
    ($backend:expr) => {
        match TestContext::new($backend) {
            Some(ctx) => ctx,
            None => {
                eprintln!("Backend {} not available, skipping", $backend.name());
                return;
            }
        }
    };
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_host_visible_write_read(#[case] backend: Backend) {
    let ctx = context_or_skip!(backend);
    let data = generate_test_pattern(512);

    let buffer = ctx.create_buffer(512, BufferUsage::UNIFORM, MemoryKind::HostVisible);
    buffer.write_data(ctx.device.as_ref(), &data).unwrap();

    assert_eq!(buffer.read_data().unwrap(), data);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_device_local_roundtrip_through_staging(#[case] backend: Backend) {
    let ctx = context_or_skip!(backend);
    const BUFFER_SIZE: u64 = 1024;
    let data = generate_test_pattern(BUFFER_SIZE as usize);

    let gpu_buffer = ctx.create_buffer(
        BUFFER_SIZE,
        BufferUsage::STORAGE | BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
        MemoryKind::DeviceLocal,
    );
    let readback = ctx.create_readback_buffer(BUFFER_SIZE);

    gpu_buffer.write_data(ctx.device.as_ref(), &data).unwrap();
    ctx.device
        .copy_buffer_blocking(&gpu_buffer, &readback, BUFFER_SIZE)
        .unwrap();

    assert_eq!(readback.read_data().unwrap(), data);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_partial_write_keeps_tail(#[case] backend: Backend) {
    let ctx = context_or_skip!(backend);

    let buffer = ctx.create_buffer(16, BufferUsage::UNIFORM, MemoryKind::HostVisible);
    buffer.write_data(ctx.device.as_ref(), &[7; 16]).unwrap();
    buffer.write_data(ctx.device.as_ref(), &[1, 2, 3, 4]).unwrap();

    let contents = buffer.read_data().unwrap();
    assert_eq!(&contents[..4], &[1, 2, 3, 4]);
    assert!(contents[4..].iter().all(|b| *b == 7));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_invalid_buffer_access(#[case] backend: Backend) {
    let ctx = context_or_skip!(backend);

    let device_local = ctx.create_buffer(64, BufferUsage::STORAGE, MemoryKind::DeviceLocal);
    assert!(matches!(
        device_local.map(),
        Err(GraphicsError::InvalidParameter(_))
    ));

    let small = ctx.create_buffer(8, BufferUsage::UNIFORM, MemoryKind::HostVisible);
    assert!(small.write_data(ctx.device.as_ref(), &[0; 9]).is_err());

    let zero = ctx.device.create_buffer(&tile_renderer::backend::BufferDescriptor::new(
        0,
        BufferUsage::UNIFORM,
        MemoryKind::HostVisible,
    ));
    assert!(zero.is_err());
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_quad_mesh_upload(#[case] backend: Backend) {
    let ctx = context_or_skip!(backend);

    let quad = QuadMesh::upload(ctx.device.as_ref()).unwrap();
    assert_eq!(quad.index_count(), QUAD_INDICES.len() as u32);
    assert_eq!(quad.index_buffer().memory(), MemoryKind::DeviceLocal);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_texture_registry_indices(#[case] backend: Backend) {
    let ctx = context_or_skip!(backend);
    let mut registry = TextureRegistry::new(2);

    let a = registry
        .register(
            ctx.device.as_ref(),
            &TextureData::checkerboard(16, [0, 0, 0, 255], [255, 255, 255, 255]),
        )
        .unwrap();
    let b = registry
        .register(ctx.device.as_ref(), &TextureData::solid_color([255, 0, 0, 255], "red"))
        .unwrap();
    let overflow = registry.register(
        ctx.device.as_ref(),
        &TextureData::solid_color([0, 255, 0, 255], "green"),
    );

    assert_eq!((a, b), (0, 1));
    assert!(overflow.is_err());
    assert_eq!(registry.get(0).map(|t| t.size()), Some((16, 16)));
    assert_eq!(registry.get(1).map(|t| t.size()), Some((1, 1)));
}
