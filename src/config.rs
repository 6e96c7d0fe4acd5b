//! Renderer configuration.
//!
//! [`RendererConfig`] is fixed at construction time. [`FrameParams`] is passed
//! into every frame update, so values such as the zoom level never live in
//! shared global state.

use ash::vk;

use crate::error::GraphicsError;

/// Presentation mode for the swapchain.
///
/// Controls how frames are synchronized with the display. Modes the surface
/// does not offer fall back to [`PresentMode::Fifo`], which is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// No synchronization. May cause tearing but has lowest latency.
    Immediate,
    /// Triple buffering. Low latency without tearing.
    #[default]
    Mailbox,
    /// VSync enabled. No tearing, but may have higher latency.
    Fifo,
    /// VSync with relaxed timing. May tear if a frame is late.
    FifoRelaxed,
}

impl PresentMode {
    pub(crate) fn to_vk(self) -> vk::PresentModeKHR {
        match self {
            PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
            PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
            PresentMode::Fifo => vk::PresentModeKHR::FIFO,
            PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        }
    }
}

/// Configuration for creating a [`FrameRenderer`](crate::FrameRenderer).
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name reported to the driver.
    pub application_name: String,
    /// Number of frames the CPU may submit ahead of the GPU.
    pub frames_in_flight: usize,
    /// Capacity of each per-frame instance buffer, in instances.
    pub max_instances: usize,
    /// Upper bound of the texture array in the global descriptor set.
    pub max_textures: u32,
    /// Preferred presentation mode.
    pub present_mode: PresentMode,
    /// Required swapchain color format.
    pub surface_format: vk::Format,
    /// Clear color for the color attachment.
    pub clear_color: [f32; 4],
    /// Enable Vulkan validation layers.
    pub validation: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Tile Renderer".to_string(),
            frames_in_flight: 2,
            max_instances: 16 * 1024,
            max_textures: 1024,
            present_mode: PresentMode::default(),
            surface_format: vk::Format::B8G8R8A8_UNORM,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            validation: cfg!(debug_assertions),
        }
    }
}

impl RendererConfig {
    /// Set the frames-in-flight depth.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Set the instance buffer capacity.
    ///
    /// Provision for the worst case: every map tile plus every entity.
    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = max_instances;
        self
    }

    /// Set the texture array capacity.
    pub fn with_max_textures(mut self, max_textures: u32) -> Self {
        self.max_textures = max_textures;
        self
    }

    /// Set the present mode.
    pub fn with_present_mode(mut self, present_mode: PresentMode) -> Self {
        self.present_mode = present_mode;
        self
    }

    /// Set the required surface format.
    pub fn with_surface_format(mut self, format: vk::Format) -> Self {
        self.surface_format = format;
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Reject configurations the frame protocol cannot run with.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.frames_in_flight == 0 {
            return Err(GraphicsError::InvalidParameter(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.max_instances == 0 {
            return Err(GraphicsError::InvalidParameter(
                "max_instances must be at least 1".to_string(),
            ));
        }
        if self.max_textures == 0 {
            return Err(GraphicsError::InvalidParameter(
                "max_textures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-frame parameters supplied by the application each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Screen pixels covered by one world unit (one tile edge).
    pub pixels_per_unit: f32,
}

impl FrameParams {
    pub fn new(pixels_per_unit: f32) -> Self {
        Self { pixels_per_unit }
    }
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            pixels_per_unit: 32.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.surface_format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(config.present_mode, PresentMode::Mailbox);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RendererConfig::default()
            .with_frames_in_flight(3)
            .with_max_instances(2500)
            .with_present_mode(PresentMode::Fifo)
            .with_validation(false);

        assert_eq!(config.frames_in_flight, 3);
        assert_eq!(config.max_instances, 2500);
        assert_eq!(config.present_mode.to_vk(), vk::PresentModeKHR::FIFO);
        assert!(!config.validation);
    }

    #[test]
    fn test_config_rejects_zero_depth() {
        let config = RendererConfig::default().with_frames_in_flight(0);
        assert!(matches!(
            config.validate(),
            Err(GraphicsError::InvalidParameter(_))
        ));

        let config = RendererConfig::default().with_max_instances(0);
        assert!(config.validate().is_err());
    }
}
