//! UI overlay hook.
//!
//! The frame renderer knows nothing about UI toolkits. Anything that wants to
//! draw on top of the sprites implements [`OverlayRenderer`] and is handed the
//! frame's command buffer while its rendering scope is still open.

mod egui_overlay;

pub use egui_overlay::EguiOverlay;

use ash::vk;

use crate::error::GraphicsResult;

/// Records extra draw commands into the frame command buffer.
pub trait OverlayRenderer {
    /// Called after the instanced sprite draw and before the image leaves the
    /// color attachment layout. `command_buffer` is recording inside a
    /// dynamic rendering scope that targets the swapchain image.
    fn record(
        &mut self,
        command_buffer: vk::CommandBuffer,
        extent: vk::Extent2D,
    ) -> GraphicsResult<()>;
}
