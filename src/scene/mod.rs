//! Scene description handed to the renderer each frame.

mod camera;
mod culling;
mod instance;

pub use camera::*;
pub use culling::*;
pub use instance::*;

use crate::world::{Map, TextureAtlas, World};

/// Read-only view of everything drawn in one frame.
///
/// The camera supplies the position; the renderer fits its area and
/// projection to the framebuffer and the frame's pixels per unit.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub camera: &'a Camera,
    pub map: Option<&'a Map>,
    pub world: Option<&'a World>,
    pub atlas: Option<&'a TextureAtlas>,
}

impl<'a> SceneView<'a> {
    /// Scene with nothing to draw.
    pub fn new(camera: &'a Camera) -> Self {
        Self {
            camera,
            map: None,
            world: None,
            atlas: None,
        }
    }

    pub fn with_map(mut self, map: &'a Map) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_world(mut self, world: &'a World) -> Self {
        self.world = Some(world);
        self
    }

    pub fn with_atlas(mut self, atlas: &'a TextureAtlas) -> Self {
        self.atlas = Some(atlas);
        self
    }
}
