//! Resource management
//!
//! Buffer write paths, the quad mesh and texture uploads.

mod buffer;
mod mesh;
mod texture;

pub use buffer::*;
pub use mesh::*;
pub use texture::*;
