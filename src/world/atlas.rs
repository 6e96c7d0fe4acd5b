//! Sprite sheet frames and their normalized UV rectangles.

use std::collections::HashMap;

use glam::Vec4;

use crate::scene::FULL_UV_RECT;

use super::Sprite;

/// Pixel rectangle of one frame inside a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasFrame {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl AtlasFrame {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Frames of one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasEntry {
    pub id: u32,
    pub texture_width: u32,
    pub texture_height: u32,
    pub frames: Vec<AtlasFrame>,
}

impl AtlasEntry {
    /// Entry whose frames tile the texture left to right, top to bottom.
    pub fn grid(
        id: u32,
        texture_width: u32,
        texture_height: u32,
        frame_width: u16,
        frame_height: u16,
    ) -> Self {
        let mut frames = Vec::new();
        if frame_width > 0 && frame_height > 0 {
            let rows = texture_height / frame_height as u32;
            let columns = texture_width / frame_width as u32;
            for row in 0..rows {
                for column in 0..columns {
                    frames.push(AtlasFrame::new(
                        (column * frame_width as u32) as u16,
                        (row * frame_height as u32) as u16,
                        frame_width,
                        frame_height,
                    ));
                }
            }
        }

        Self {
            id,
            texture_width,
            texture_height,
            frames,
        }
    }

    /// Normalized `(u, v, width, height)` of `frame`, or `None` when the entry
    /// has no such frame or an empty texture.
    pub fn uv_rect(&self, frame: u16) -> Option<Vec4> {
        let frame = self.frames.get(frame as usize)?;
        if self.texture_width == 0 || self.texture_height == 0 {
            return None;
        }
        let w = self.texture_width as f32;
        let h = self.texture_height as f32;
        Some(Vec4::new(
            frame.x as f32 / w,
            frame.y as f32 / h,
            frame.width as f32 / w,
            frame.height as f32 / h,
        ))
    }
}

/// Atlas entries keyed by texture index.
#[derive(Debug, Clone, Default)]
pub struct TextureAtlas {
    entries: HashMap<u32, AtlasEntry>,
}

impl TextureAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture_index: u32, entry: AtlasEntry) {
        self.entries.insert(texture_index, entry);
    }

    pub fn entry(&self, texture_index: u32) -> Option<&AtlasEntry> {
        self.entries.get(&texture_index)
    }

    pub fn entry_by_id(&self, id: u32) -> Option<(u32, &AtlasEntry)> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(index, entry)| (*index, entry))
    }

    pub fn frame_count(&self, texture_index: u32) -> usize {
        self.entry(texture_index).map_or(0, |e| e.frames.len())
    }

    /// UV rectangle for the sprite's current frame. Textures without an entry
    /// and unknown frames sample the whole texture.
    pub fn uv_rect(&self, sprite: &Sprite) -> Vec4 {
        self.entry(sprite.texture_index)
            .and_then(|entry| entry.uv_rect(sprite.current_frame))
            .unwrap_or(FULL_UV_RECT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_frames() {
        let entry = AtlasEntry::grid(3, 64, 32, 16, 16);
        assert_eq!(entry.frames.len(), 8);
        assert_eq!(entry.frames[5], AtlasFrame::new(16, 16, 16, 16));
    }

    #[test]
    fn test_uv_rect_normalized() {
        let mut atlas = TextureAtlas::new();
        atlas.insert(2, AtlasEntry::grid(7, 64, 32, 16, 16));

        let uv = atlas.uv_rect(&Sprite::new(2).with_frame(5));
        assert_eq!(uv, Vec4::new(0.25, 0.5, 0.25, 0.5));
        assert_eq!(atlas.frame_count(2), 8);
        assert_eq!(atlas.entry_by_id(7).map(|(index, _)| index), Some(2));
    }

    #[test]
    fn test_unknown_frame_falls_back_to_full_texture() {
        let mut atlas = TextureAtlas::new();
        atlas.insert(0, AtlasEntry::grid(1, 32, 32, 16, 16));

        assert_eq!(atlas.uv_rect(&Sprite::new(0).with_frame(9)), FULL_UV_RECT);
        assert_eq!(atlas.uv_rect(&Sprite::new(4)), FULL_UV_RECT);
    }
}
