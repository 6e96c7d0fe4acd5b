//! CPU-side world state the renderer reads every frame.
//!
//! Tiles and game objects both carry a [`Sprite`]: the texture they sample and
//! the atlas frame currently shown. One world unit is one tile.

mod atlas;
mod map;

pub use atlas::*;
pub use map::*;

use glam::Vec3;

/// Texture reference plus the animation frame currently shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sprite {
    pub texture_index: u32,
    pub current_frame: u16,
}

impl Sprite {
    pub fn new(texture_index: u32) -> Self {
        Self {
            texture_index,
            current_frame: 0,
        }
    }

    pub fn with_frame(mut self, frame: u16) -> Self {
        self.current_frame = frame;
        self
    }
}

/// Free-standing entity drawn on top of the map.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub index: usize,
    pub position: Vec3,
    pub sprite: Sprite,
}

/// Collection of game objects in insertion order.
#[derive(Debug, Default)]
pub struct World {
    game_objects: Vec<GameObject>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_game_object(&mut self, position: Vec3, sprite: Sprite) -> &GameObject {
        let index = self.game_objects.len();
        self.game_objects.push(GameObject {
            index,
            position,
            sprite,
        });
        &self.game_objects[index]
    }

    pub fn game_objects(&self) -> &[GameObject] {
        &self.game_objects
    }

    pub fn game_object_mut(&mut self, index: usize) -> Option<&mut GameObject> {
        self.game_objects.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.game_objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.game_objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.game_objects.clear();
    }
}
