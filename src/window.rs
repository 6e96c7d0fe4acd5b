//! Window management using winit

use std::sync::Arc;

use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Window as WinitWindow, WindowBuilder},
};

use crate::error::{GraphicsError, GraphicsResult};

/// Size and lifecycle flags tracked from window events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    width: u32,
    height: u32,
    resized: bool,
    close_requested: bool,
}

impl WindowState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resized: false,
            close_requested: false,
        }
    }

    /// Current framebuffer dimensions in physical pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// A minimized window reports a zero-sized framebuffer.
    pub fn is_minimized(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn was_resized(&self) -> bool {
        self.resized
    }

    pub fn clear_resize_flag(&mut self) {
        self.resized = false;
    }

    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                if (size.width, size.height) != (self.width, self.height) {
                    self.width = size.width;
                    self.height = size.height;
                    self.resized = true;
                }
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            _ => {}
        }
    }
}

/// Wrapper around winit window with additional state
pub struct Window {
    window: Arc<WinitWindow>,
    state: WindowState,
}

impl Window {
    /// Create a new window with the given title and dimensions
    pub fn new(
        event_loop: &EventLoop<()>,
        title: &str,
        width: u32,
        height: u32,
    ) -> GraphicsResult<Self> {
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .build(event_loop)
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!("Failed to create window: {e}"))
            })?;

        let size = window.inner_size();
        Ok(Self {
            window: Arc::new(window),
            state: WindowState::new(size.width, size.height),
        })
    }

    /// Get the raw window for backend initialization
    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    pub fn window_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.state.dimensions()
    }

    pub fn was_resized(&self) -> bool {
        self.state.was_resized()
    }

    pub fn clear_resize_flag(&mut self) {
        self.state.clear_resize_flag();
    }

    pub fn should_close(&self) -> bool {
        self.state.should_close()
    }

    /// Ask the event loop to exit after the current callback.
    pub fn request_close(&mut self) {
        self.state.request_close();
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        self.state.handle_event(event);
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

/// What the event loop hands to the application callback.
pub enum LoopEvent<'a> {
    /// A window event, after the window state has been updated.
    Window(&'a WindowEvent),
    /// All pending events were processed; time to draw.
    Frame,
}

/// Create an event loop and drive `callback` until the window closes or the
/// callback fails.
///
/// `setup` runs once with the window before the loop starts, so that GPU
/// state can be created from the window handle.
pub fn run<S, T, F>(
    title: &str,
    width: u32,
    height: u32,
    setup: S,
    mut callback: F,
) -> GraphicsResult<()>
where
    S: FnOnce(&Window) -> GraphicsResult<T>,
    F: FnMut(&mut T, &mut Window, LoopEvent<'_>) -> GraphicsResult<()>,
{
    let event_loop = EventLoop::new().map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create event loop: {e}"))
    })?;
    let mut window = Window::new(&event_loop, title, width, height)?;
    let mut app = setup(&window)?;
    let mut failure = None;

    event_loop
        .run(|event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            let result = match event {
                Event::WindowEvent { event, .. } => {
                    window.handle_event(&event);
                    callback(&mut app, &mut window, LoopEvent::Window(&event))
                }
                Event::AboutToWait => {
                    let result = callback(&mut app, &mut window, LoopEvent::Frame);
                    window.request_redraw();
                    result
                }
                _ => Ok(()),
            };

            if let Err(e) = result {
                log::error!("Stopping event loop: {}", e);
                failure = Some(e);
                elwt.exit();
            } else if window.should_close() {
                elwt.exit();
            }
        })
        .map_err(|e| GraphicsError::Internal(format!("Event loop failed: {e}")))?;

    // The application state holds GPU objects tied to the window; release it
    // while the window is still alive.
    drop(app);

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_sets_flag_once() {
        let mut state = WindowState::new(800, 600);
        state.handle_event(&WindowEvent::Resized(PhysicalSize::new(800, 600)));
        assert!(!state.was_resized());

        state.handle_event(&WindowEvent::Resized(PhysicalSize::new(1024, 768)));
        assert!(state.was_resized());
        assert_eq!(state.dimensions(), (1024, 768));

        state.clear_resize_flag();
        assert!(!state.was_resized());
    }

    #[test]
    fn test_minimized_window() {
        let mut state = WindowState::new(800, 600);
        state.handle_event(&WindowEvent::Resized(PhysicalSize::new(0, 0)));
        assert!(state.is_minimized());
        assert!(state.was_resized());
    }

    #[test]
    fn test_close_request() {
        let mut state = WindowState::new(320, 240);
        assert!(!state.should_close());
        state.handle_event(&WindowEvent::CloseRequested);
        assert!(state.should_close());
    }
}
