use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::assets::{asset_loaded_code, AssetManager, ImageAsset};
use crate::device::{GraphicsContext, TextureHandle};
use crate::error::{EngineError, ResourceKind, Result};
use crate::message::{HandlerRef, Message, MessageHandler};
use crate::resource::{ReleaseOutcome, Resource, ResourceCache};

use super::TextureDeps;

const PLACEHOLDER_RGBA: [u8; 4] = [255, 255, 255, 255];

/// Cache name of the 1×1 white texture bound for untextured materials.
pub const WHITE_TEXTURE: &str = "::white";

/// Receives the asset-loaded message for one texture.
#[derive(Default)]
struct AssetSlot {
    pending: Option<Rc<ImageAsset>>,
}

impl MessageHandler for AssetSlot {
    fn on_message(&mut self, message: &Message) {
        let asset = message.context.clone().and_then(|c| c.downcast::<ImageAsset>().ok());
        match asset {
            Some(asset) => self.pending = Some(asset),
            None => log::warn!("'{}' carried no image asset", message.code),
        }
    }
}

/// GPU texture that shows a white placeholder until its image arrives.
pub struct Texture {
    name: String,
    handle: TextureHandle,
    width: Cell<u32>,
    height: Cell<u32>,
    loaded: Cell<bool>,
    slot: Rc<RefCell<AssetSlot>>,
    subscribed: Cell<bool>,
}

impl Texture {
    /// Creates the GPU texture and requests `name` from `assets`.
    ///
    /// If the asset is already loaded it is uploaded before returning;
    /// otherwise the texture waits for the loaded message on the bus.
    pub fn new(name: &str, deps: TextureDeps<'_>, assets: &mut AssetManager) -> Result<Self> {
        let TextureDeps { gl, bus } = deps;

        let handle = gl.create_texture().map_err(EngineError::Context)?;
        gl.active_texture(0);
        gl.bind_texture(Some(handle));
        gl.tex_image_2d(1, 1, &PLACEHOLDER_RGBA);
        gl.bind_texture(None);

        let texture = Self {
            name: name.to_string(),
            handle,
            width: Cell::new(1),
            height: Cell::new(1),
            loaded: Cell::new(false),
            slot: Rc::new(RefCell::new(AssetSlot::default())),
            subscribed: Cell::new(false),
        };

        let code = asset_loaded_code(name);
        texture.subscribed.set(bus.subscribe(&code, texture.handler()).is_ok());

        if let Some(asset) = assets.get_asset(name, bus) {
            gl.active_texture(0);
            gl.bind_texture(Some(handle));
            texture.upload(gl, &asset);
            gl.bind_texture(None);
            if texture.subscribed.replace(false) {
                let _ = bus.unsubscribe(&code, &texture.handler());
            }
        }

        log::debug!("texture '{name}' created");
        Ok(texture)
    }

    /// A 1×1 opaque white texture that never waits for an asset.
    pub fn white(name: &str, gl: &mut dyn GraphicsContext) -> Result<Self> {
        let handle = gl.create_texture().map_err(EngineError::Context)?;
        gl.active_texture(0);
        gl.bind_texture(Some(handle));
        gl.tex_image_2d(1, 1, &PLACEHOLDER_RGBA);
        gl.bind_texture(None);

        log::debug!("texture '{name}' created (solid white)");
        Ok(Self {
            name: name.to_string(),
            handle,
            width: Cell::new(1),
            height: Cell::new(1),
            loaded: Cell::new(true),
            slot: Rc::new(RefCell::new(AssetSlot::default())),
            subscribed: Cell::new(false),
        })
    }

    fn handler(&self) -> HandlerRef {
        self.slot.clone()
    }

    /// Uploads `asset` into the currently bound texture.
    fn upload(&self, gl: &mut dyn GraphicsContext, asset: &ImageAsset) {
        gl.tex_image_2d(asset.width, asset.height, &asset.pixels);
        self.width.set(asset.width);
        self.height.set(asset.height);
        self.loaded.set(true);
        log::debug!("texture '{}' uploaded ({}x{})", self.name, asset.width, asset.height);
    }

    /// Binds this texture to `unit`, first uploading any image delivered
    /// since the last bind.
    pub fn activate_and_bind(&self, gl: &mut dyn GraphicsContext, unit: u32) {
        gl.active_texture(unit);
        gl.bind_texture(Some(self.handle));
        let pending = self.slot.borrow_mut().pending.take();
        if let Some(asset) = pending {
            self.upload(gl, &asset);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Whether real image data (not the placeholder) is on the GPU.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }
}

impl Resource for Texture {
    const KIND: ResourceKind = ResourceKind::Texture;
    type Deps<'a> = TextureDeps<'a>;

    fn destroy(&self, deps: TextureDeps<'_>) {
        if self.subscribed.replace(false) {
            let code = asset_loaded_code(&self.name);
            // The bus reports a missing subscription itself.
            let _ = deps.bus.unsubscribe(&code, &self.handler());
        }
        deps.gl.delete_texture(self.handle);
    }
}

/// Reference-counted texture registry.
#[derive(Default)]
pub struct TextureManager {
    cache: ResourceCache<Texture>,
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `texture` with one reference. A texture whose name is already
    /// taken is destroyed and `false` is returned.
    pub fn register(&mut self, texture: Texture, deps: TextureDeps<'_>) -> bool {
        let name = texture.name.clone();
        match self.cache.register(&name, texture) {
            Ok(()) => true,
            Err(rejected) => {
                rejected.destroy(deps);
                false
            }
        }
    }

    pub fn acquire(&mut self, name: &str) -> Result<Rc<Texture>> {
        self.cache.acquire(name)
    }

    /// Acquires `name`, creating and registering it first when absent.
    ///
    /// Either way the caller owns exactly one new reference.
    pub fn get_or_load(
        &mut self,
        name: &str,
        mut deps: TextureDeps<'_>,
        assets: &mut AssetManager,
    ) -> Result<Rc<Texture>> {
        if self.cache.contains(name) {
            return self.cache.acquire(name);
        }

        let texture = Texture::new(name, deps.reborrow(), assets)?;
        if let Err(rejected) = self.cache.register(name, texture) {
            rejected.destroy(deps);
        }
        self.cache.get(name).ok_or_else(|| EngineError::ResourceNotFound {
            kind: ResourceKind::Texture,
            name: name.to_string(),
        })
    }

    /// Acquires the shared [`WHITE_TEXTURE`], creating it on first use.
    pub fn acquire_white(&mut self, gl: &mut dyn GraphicsContext) -> Result<Rc<Texture>> {
        if !self.cache.contains(WHITE_TEXTURE) {
            let white = Texture::white(WHITE_TEXTURE, gl)?;
            if let Err(rejected) = self.cache.register(WHITE_TEXTURE, white) {
                gl.delete_texture(rejected.handle);
            }
            return self.cache.get(WHITE_TEXTURE).ok_or_else(|| EngineError::ResourceNotFound {
                kind: ResourceKind::Texture,
                name: WHITE_TEXTURE.to_string(),
            });
        }
        self.cache.acquire(WHITE_TEXTURE)
    }

    pub fn release(&mut self, name: &str, deps: TextureDeps<'_>) -> ReleaseOutcome {
        self.cache.release(name, deps)
    }

    pub fn get(&self, name: &str) -> Option<Rc<Texture>> {
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
