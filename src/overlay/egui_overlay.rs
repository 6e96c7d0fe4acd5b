//! egui overlay drawn with egui-ash-renderer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ash::vk;
use egui_ash_renderer::{DynamicRendering, Options, Renderer};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use winit::event::WindowEvent;
use winit::window::Window;

use crate::backend::vulkan::VulkanBackend;
use crate::error::{GraphicsError, GraphicsResult};

use super::OverlayRenderer;

fn renderer_error(context: &str, error: egui_ash_renderer::RendererError) -> GraphicsError {
    GraphicsError::Internal(format!("{}: {}", context, error))
}

fn is_srgb(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::B8G8R8A8_SRGB | vk::Format::R8G8B8A8_SRGB | vk::Format::A8B8G8R8_SRGB_PACK32
    )
}

/// egui context, winit input state and the Vulkan renderer for its output.
///
/// Call [`EguiOverlay::run`] once per frame before drawing, then pass the
/// overlay to the frame renderer. [`EguiOverlay::destroy`] must run before
/// the backend is dropped.
pub struct EguiOverlay {
    ctx: egui::Context,
    winit_state: egui_winit::State,
    /// Dropped before the allocator it draws from.
    renderer: Option<Renderer>,
    /// egui-ash-renderer needs its own allocator behind a std mutex.
    allocator: Option<Arc<Mutex<Allocator>>>,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    paint_jobs: Vec<egui::ClippedPrimitive>,
    pixels_per_point: f32,
    /// Textures egui released, freed once the frames that may sample them
    /// have retired.
    pending_frees: VecDeque<Vec<egui::TextureId>>,
    frames_in_flight: usize,
}

impl EguiOverlay {
    pub fn new(
        backend: &VulkanBackend,
        window: &Window,
        color_format: vk::Format,
        frames_in_flight: usize,
    ) -> GraphicsResult<Self> {
        let ctx = egui::Context::default();
        let winit_state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: backend.instance().clone(),
            device: backend.device().clone(),
            physical_device: backend.physical_device(),
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to create egui allocator: {}", e))
        })?;
        let allocator = Arc::new(Mutex::new(allocator));

        let renderer = Renderer::with_gpu_allocator(
            Arc::clone(&allocator),
            backend.device().clone(),
            DynamicRendering {
                color_attachment_format: color_format,
                depth_attachment_format: None,
            },
            Options {
                in_flight_frames: frames_in_flight,
                srgb_framebuffer: is_srgb(color_format),
                ..Default::default()
            },
        )
        .map_err(|e| renderer_error("Failed to create egui renderer", e))?;

        log::info!("Created egui overlay for {:?}", color_format);

        Ok(Self {
            ctx,
            winit_state,
            renderer: Some(renderer),
            allocator: Some(allocator),
            queue: backend.queue(),
            command_pool: backend.command_pool(),
            paint_jobs: Vec::new(),
            pixels_per_point: window.scale_factor() as f32,
            pending_frees: VecDeque::new(),
            frames_in_flight,
        })
    }

    pub fn context(&self) -> &egui::Context {
        &self.ctx
    }

    /// Feed a window event to egui. Returns true when egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn wants_keyboard_input(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }

    pub fn wants_pointer_input(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Build this frame's UI and upload any texture changes.
    ///
    /// Texture uploads use blocking one-shot submissions, so this must run
    /// outside of frame recording.
    pub fn run(&mut self, window: &Window, ui: impl FnMut(&egui::Context)) -> GraphicsResult<()> {
        let raw_input = self.winit_state.take_egui_input(window);
        let output = self.ctx.run(raw_input, ui);

        self.winit_state
            .handle_platform_output(window, output.platform_output);

        self.pixels_per_point = output.pixels_per_point;
        self.paint_jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        if !output.textures_delta.set.is_empty() {
            renderer
                .set_textures(self.queue, self.command_pool, &output.textures_delta.set)
                .map_err(|e| renderer_error("Failed to upload egui textures", e))?;
        }

        self.pending_frees.push_back(output.textures_delta.free);
        while self.pending_frees.len() > self.frames_in_flight {
            if let Some(ids) = self.pending_frees.pop_front() {
                if !ids.is_empty() {
                    renderer
                        .free_textures(&ids)
                        .map_err(|e| renderer_error("Failed to free egui textures", e))?;
                }
            }
        }
        Ok(())
    }

    /// Release GPU resources. Waits for the device first.
    pub fn destroy(&mut self, backend: &VulkanBackend) {
        if let Err(e) = unsafe { backend.device().device_wait_idle() } {
            log::error!("Failed to wait for device before destroying egui overlay: {:?}", e);
        }

        self.renderer = None;
        self.allocator = None;
        self.pending_frees.clear();
    }
}

impl OverlayRenderer for EguiOverlay {
    fn record(
        &mut self,
        command_buffer: vk::CommandBuffer,
        extent: vk::Extent2D,
    ) -> GraphicsResult<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        if self.paint_jobs.is_empty() {
            return Ok(());
        }

        renderer
            .cmd_draw(command_buffer, extent, self.pixels_per_point, &self.paint_jobs)
            .map_err(|e| renderer_error("Failed to record egui draw", e))
    }
}

impl Drop for EguiOverlay {
    fn drop(&mut self) {
        if self.renderer.is_some() || self.allocator.is_some() {
            log::warn!("EguiOverlay dropped without destroy(); GPU resources may outlive the device");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_detection() {
        assert!(is_srgb(vk::Format::B8G8R8A8_SRGB));
        assert!(!is_srgb(vk::Format::B8G8R8A8_UNORM));
    }
}
