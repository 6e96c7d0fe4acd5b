//! Tile Renderer - frame orchestration for instanced 2-D tile maps on Vulkan
//!
//! Every frame the CPU culls the tile map and the game objects against the
//! camera, packs the survivors into a per-frame instance buffer, and records a
//! single instanced draw of a unit quad. Textures live in one descriptor
//! array indexed per instance.
//!
//! # Backends
//! - **Vulkan**: native Vulkan via ash, gpu-allocator for memory, dynamic rendering
//! - **Dummy**: a simulated device that records and checks synchronization,
//!   used by the test suite and by headless runs
//!
//! # Frame protocol
//! - a ring of swapchain images with per-image command buffers
//! - `frames_in_flight` frame slots, each with its own fence and semaphores
//! - instance data staged in host memory and copied to device memory
//!   inside the frame's command buffer
//! - stale surfaces rebuild the whole ring and drop the frame
//!
//! See [`FrameRenderer`] for the entry point.

pub mod backend;
pub mod config;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod swapchain;
pub mod window;
pub mod world;

pub use backend::dummy::DummyBackend;
pub use backend::vulkan::VulkanBackend;
pub use backend::RenderBackend;
pub use config::{FrameParams, PresentMode, RendererConfig};
pub use error::{GraphicsError, GraphicsResult};
pub use overlay::{EguiOverlay, OverlayRenderer};
pub use renderer::{FrameOutcome, FrameRenderer};
pub use scene::{Camera, CameraArea, SceneView};
pub use window::Window;
pub use world::{GameObject, Map, Sprite, TextureAtlas, Tile, TileData, World};
