use std::cell::Cell;
use std::rc::Rc;

use crate::assets::AssetManager;
use crate::coords::Color;
use crate::error::{ResourceKind, Result};
use crate::resource::{ReleaseOutcome, Resource, ResourceCache};

use super::texture::{Texture, TextureManager};
use super::TextureDeps;

/// What a material needs when it is freed: the texture registry it took its
/// reference from, plus the texture dependencies to pass along.
pub struct MaterialDeps<'a> {
    pub textures: &'a mut TextureManager,
    pub gpu: TextureDeps<'a>,
}

impl MaterialDeps<'_> {
    pub fn reborrow(&mut self) -> MaterialDeps<'_> {
        MaterialDeps { textures: &mut *self.textures, gpu: self.gpu.reborrow() }
    }
}

/// Diffuse texture + tint.
pub struct Material {
    name: String,
    diffuse_texture_name: Option<String>,
    /// The named texture, or the shared white one when untextured.
    diffuse_texture: Rc<Texture>,
    tint: Cell<Color>,
}

impl Material {
    /// Builds a material, taking one reference to `diffuse_texture_name`
    /// (loading it if needed). An empty or absent name means untextured, and
    /// the material takes a reference to the shared white texture instead.
    pub fn new(
        name: impl Into<String>,
        diffuse_texture_name: Option<&str>,
        tint: Color,
        textures: &mut TextureManager,
        gpu: TextureDeps<'_>,
        assets: &mut AssetManager,
    ) -> Result<Self> {
        let diffuse_texture_name = diffuse_texture_name.filter(|n| !n.is_empty());
        let diffuse_texture = match diffuse_texture_name {
            Some(texture) => textures.get_or_load(texture, gpu, assets)?,
            None => textures.acquire_white(gpu.gl)?,
        };

        Ok(Self {
            name: name.into(),
            diffuse_texture_name: diffuse_texture_name.map(str::to_string),
            diffuse_texture,
            tint: Cell::new(tint),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn diffuse_texture_name(&self) -> Option<&str> {
        self.diffuse_texture_name.as_deref()
    }

    /// Texture bound to unit 0 when drawing.
    pub fn diffuse_texture(&self) -> &Rc<Texture> {
        &self.diffuse_texture
    }

    pub fn tint(&self) -> Color {
        self.tint.get()
    }

    /// Shared by every sprite using this material.
    pub fn set_tint(&self, tint: Color) {
        self.tint.set(tint);
    }
}

impl Resource for Material {
    const KIND: ResourceKind = ResourceKind::Material;
    type Deps<'a> = MaterialDeps<'a>;

    fn destroy(&self, deps: MaterialDeps<'_>) {
        deps.textures.release(self.diffuse_texture.name(), deps.gpu);
    }
}

/// Reference-counted material registry.
#[derive(Default)]
pub struct MaterialManager {
    cache: ResourceCache<Material>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `material` with one reference owned by the caller. A material
    /// whose name is already taken is destroyed and `false` is returned.
    pub fn register(&mut self, material: Material, deps: MaterialDeps<'_>) -> bool {
        let name = material.name.clone();
        match self.cache.register(&name, material) {
            Ok(()) => true,
            Err(rejected) => {
                rejected.destroy(deps);
                false
            }
        }
    }

    pub fn acquire(&mut self, name: &str) -> Result<Rc<Material>> {
        self.cache.acquire(name)
    }

    pub fn release(&mut self, name: &str, deps: MaterialDeps<'_>) -> ReleaseOutcome {
        self.cache.release(name, deps)
    }

    pub fn get(&self, name: &str) -> Option<Rc<Material>> {
        self.cache.get(name)
    }

    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.cache.reference_count(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
