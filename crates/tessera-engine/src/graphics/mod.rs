//! Textures, materials and sprites.
//!
//! Textures and materials live in name-keyed reference-counted caches. A
//! material holds one reference to its diffuse texture; a sprite holds one
//! reference to its material. Releasing the last reference frees the GPU
//! objects behind it. Untextured materials hold a reference to the shared
//! [`WHITE_TEXTURE`] instead, so the tint alone decides their color.

mod material;
mod sprite;
mod texture;

pub use material::{Material, MaterialDeps, MaterialManager};
pub use sprite::{Sprite, QUAD_VERTEX_COUNT};
pub use texture::{Texture, TextureManager, WHITE_TEXTURE};

use crate::device::GraphicsContext;
use crate::message::MessageBus;

/// Context and bus borrowed while a texture is created or freed.
pub struct TextureDeps<'a> {
    pub gl: &'a mut dyn GraphicsContext,
    pub bus: &'a mut MessageBus,
}

impl<'a> TextureDeps<'a> {
    pub fn new(gl: &'a mut dyn GraphicsContext, bus: &'a mut MessageBus) -> Self {
        Self { gl, bus }
    }

    /// Shorter-lived copy, so one set of borrows can serve several calls.
    pub fn reborrow(&mut self) -> TextureDeps<'_> {
        TextureDeps { gl: &mut *self.gl, bus: &mut *self.bus }
    }
}
