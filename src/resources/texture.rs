//! Texture loading and the registry behind sprite texture indices

use std::path::Path;

use image::{DynamicImage, GenericImageView};

use crate::backend::{GpuTexture, RenderBackend, TextureDescriptor};
use crate::error::{GraphicsError, GraphicsResult};

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> GraphicsResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(|e| {
            GraphicsError::InvalidParameter(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self::from_image(img, &name))
    }

    /// Decode an encoded image (PNG, JPEG, ...) held in memory.
    pub fn from_bytes(bytes: &[u8], name: &str) -> GraphicsResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| {
            GraphicsError::InvalidParameter(format!("Failed to decode texture '{}': {}", name, e))
        })?;
        Ok(Self::from_image(img, name))
    }

    /// Wrap tightly packed RGBA8 pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>, name: &str) -> GraphicsResult<Self> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture '{}' has an empty extent {}x{}",
                name, width, height
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture '{}' has {} bytes of pixels, expected {}",
                name,
                pixels.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
            name: name.to_string(),
        })
    }

    fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.to_rgba8().into_raw(),
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Create a checkerboard texture with 8x8 pixel cells.
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                pixels.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            pixels,
            name: "checkerboard".to_string(),
        }
    }

    pub fn descriptor(&self) -> TextureDescriptor {
        TextureDescriptor::rgba8(self.width, self.height).with_label(self.name.clone())
    }
}

/// Uploaded textures in registration order.
///
/// A texture's position in the registry is the texture index sprites refer
/// to and the slot it occupies in the shader's image array.
#[derive(Debug)]
pub struct TextureRegistry {
    textures: Vec<GpuTexture>,
    capacity: u32,
}

impl TextureRegistry {
    pub fn new(capacity: u32) -> Self {
        Self {
            textures: Vec::new(),
            capacity,
        }
    }

    /// Upload `data` and return its texture index.
    pub fn register<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &B,
        data: &TextureData,
    ) -> GraphicsResult<u32> {
        if self.len() >= self.capacity {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture '{}' exceeds the texture capacity of {}",
                data.name, self.capacity
            )));
        }

        let texture = backend.create_texture(&data.descriptor(), &data.pixels)?;
        let index = self.len();
        self.textures.push(texture);

        log::info!(
            "Registered texture '{}' ({}x{}) at index {}",
            data.name,
            data.width,
            data.height,
            index
        );
        Ok(index)
    }

    pub fn len(&self) -> u32 {
        self.textures.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn textures(&self) -> &[GpuTexture] {
        &self.textures
    }

    pub fn get(&self, index: u32) -> Option<&GpuTexture> {
        self.textures.get(index as usize)
    }

    /// Release every texture. The caller makes sure the GPU no longer
    /// samples them.
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let data = TextureData::from_bytes(&encoded_png(3, 2), "tiles").unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.pixels.len(), 3 * 2 * 4);
        assert_eq!(&data.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = TextureData::from_bytes(b"not an image", "broken");
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_rgba_size_mismatch() {
        assert!(TextureData::from_rgba(2, 2, vec![0; 15], "short").is_err());
        assert!(TextureData::from_rgba(0, 2, vec![], "empty").is_err());
        assert!(TextureData::from_rgba(2, 2, vec![0; 16], "ok").is_ok());
    }

    #[test]
    fn test_checkerboard() {
        let tex = TextureData::checkerboard(16, [255, 0, 0, 255], [0, 0, 255, 255]);
        assert_eq!(tex.pixels.len(), 16 * 16 * 4);
        assert_eq!(&tex.pixels[..4], &[255, 0, 0, 255]);
        // Pixel (8, 0) is in the second cell.
        assert_eq!(&tex.pixels[8 * 4..8 * 4 + 4], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_registry_indices_and_capacity() {
        let backend = DummyBackend::new();
        let mut registry = TextureRegistry::new(2);
        let white = TextureData::solid_color([255; 4], "white");

        assert_eq!(registry.register(&backend, &white).unwrap(), 0);
        assert_eq!(registry.register(&backend, &white).unwrap(), 1);
        assert!(registry.register(&backend, &white).is_err());
        assert_eq!(registry.len(), 2);
        assert_eq!(backend.live_objects().textures, 2);

        registry.clear();
        assert_eq!(backend.live_objects().textures, 0);
    }
}
