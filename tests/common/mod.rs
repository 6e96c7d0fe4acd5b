//! Shared fixtures for the integration tests.
//!
//! Frame tests run on the simulated device, which checks the synchronization
//! protocol as it goes. Resource tests also run on a headless Vulkan device
//! when one is available and skip otherwise.

#![allow(dead_code)]

use ash::vk;
use glam::Vec3;

use tile_renderer::{
    backend::{dummy::DummyBackend, BufferDescriptor, BufferUsage, GpuBuffer, MemoryKind},
    Camera, FrameOutcome, FrameParams, FrameRenderer, GraphicsError, GraphicsResult, Map,
    OverlayRenderer,
    RenderBackend, RendererConfig, SceneView, Sprite, TileData, VulkanBackend, World,
};

/// Framebuffer extent the dummy surface reports by default.
pub const SURFACE_EXTENT: (u32, u32) = (800, 600);

/// Pixels per unit that make the default surface 25x18.75 tiles.
pub const PIXELS_PER_UNIT: f32 = 32.0;

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Simulated device (always available).
    Dummy,
    /// Headless Vulkan device via ash.
    Vulkan,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Dummy => "dummy",
            Backend::Vulkan => "vulkan",
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// A backend for resource-level tests.
///
/// Returns `None` when the backend cannot be created on this machine.
pub struct TestContext {
    pub backend: Backend,
    pub device: Box<dyn RenderBackend>,
}

impl TestContext {
    pub fn new(backend: Backend) -> Option<Self> {
        init_logging();
        let device: Box<dyn RenderBackend> = match backend {
            Backend::Dummy => Box::new(DummyBackend::new()),
            Backend::Vulkan => {
                let config = RendererConfig::default().with_validation(false);
                Box::new(VulkanBackend::new_headless(&config).ok()?)
            }
        };
        Some(Self { backend, device })
    }

    pub fn create_buffer(&self, size: u64, usage: BufferUsage, memory: MemoryKind) -> GpuBuffer {
        self.device
            .create_buffer(&BufferDescriptor::new(size, usage, memory).with_label("test"))
            .expect("Failed to create buffer")
    }

    /// Host-visible buffer that can be the target of a copy and read back.
    pub fn create_readback_buffer(&self, size: u64) -> GpuBuffer {
        self.create_buffer(size, BufferUsage::TRANSFER_DST, MemoryKind::HostVisible)
    }
}

/// Bytes 0, 1, .., 255, 0, 1, .. of the given length.
pub fn generate_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

// ============================================================================
// Frame Fixtures
// ============================================================================

pub fn small_config() -> RendererConfig {
    RendererConfig::default()
        .with_frames_in_flight(2)
        .with_max_instances(4096)
        .with_max_textures(16)
        .with_validation(false)
}

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Renderer on a fresh simulated device with the default surface.
pub fn dummy_renderer(config: RendererConfig) -> FrameRenderer<DummyBackend> {
    init_logging();
    FrameRenderer::new(DummyBackend::new(), config, SURFACE_EXTENT)
        .expect("Failed to create frame renderer")
}

/// Renderer with `count` 1x1 textures loaded, so sprites may use texture
/// indices below `count`.
pub fn textured_renderer(config: RendererConfig, count: u32) -> FrameRenderer<DummyBackend> {
    let mut renderer = dummy_renderer(config);
    for _ in 0..count {
        renderer
            .load_texture_rgba(1, 1, &[255, 255, 255, 255])
            .expect("Failed to load texture");
    }
    renderer
}

/// A `rows` x `columns` map filled with texture 0.
pub fn filled_map(rows: u32, columns: u32) -> Map {
    let mut map = Map::new(rows, columns, 16);
    map.fill(0, &TileData::new("ground", 0, 0));
    map
}

pub fn world_with(positions: &[(f32, f32)], texture_index: u32) -> World {
    let mut world = World::new();
    for &(x, y) in positions {
        world.add_game_object(Vec3::new(x, y, 0.0), Sprite::new(texture_index));
    }
    world
}

pub fn camera_at(x: f32, y: f32) -> Camera {
    Camera::for_viewport(Vec3::new(x, y, 0.0), SURFACE_EXTENT, PIXELS_PER_UNIT)
}

/// Draw `frames` frames of the same scene and return their outcomes.
pub fn draw_frames<B: RenderBackend>(
    renderer: &mut FrameRenderer<B>,
    scene: &SceneView<'_>,
    frames: usize,
) -> GraphicsResult<Vec<FrameOutcome>> {
    (0..frames)
        .map(|_| renderer.draw_frame(scene, FrameParams::new(PIXELS_PER_UNIT), None))
        .collect()
}

/// Overlay whose recording always fails.
#[derive(Debug, Default)]
pub struct FailingOverlay;

impl OverlayRenderer for FailingOverlay {
    fn record(
        &mut self,
        _command_buffer: vk::CommandBuffer,
        _extent: vk::Extent2D,
    ) -> GraphicsResult<()> {
        Err(GraphicsError::Internal("overlay recording failed".to_string()))
    }
}

/// Overlay that only counts how often it was asked to record.
#[derive(Debug, Default)]
pub struct CountingOverlay {
    pub recorded: usize,
    pub last_extent: Option<vk::Extent2D>,
}

impl OverlayRenderer for CountingOverlay {
    fn record(
        &mut self,
        _command_buffer: vk::CommandBuffer,
        extent: vk::Extent2D,
    ) -> GraphicsResult<()> {
        self.recorded += 1;
        self.last_extent = Some(extent);
        Ok(())
    }
}
