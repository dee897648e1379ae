use std::collections::HashMap;
use std::rc::Rc;

use crate::message::{Message, MessageBus};

use super::loader::{AssetLoader, ImageAsset, LoadStatus};

/// Prefix of the message code announcing a loaded asset.
pub const ASSET_LOADED_PREFIX: &str = "MESSAGE_ASSET_LOADER_ASSET_LOADED::";

/// Message code posted when `asset_name` finishes loading.
pub fn asset_loaded_code(asset_name: &str) -> String {
    format!("{ASSET_LOADED_PREFIX}{asset_name}")
}

/// Loader registry + loaded-asset store.
///
/// Loaded assets are announced with a NORMAL-priority message whose context is
/// the `Rc<ImageAsset>`.
#[derive(Default)]
pub struct AssetManager {
    loaders: Vec<Box<dyn AssetLoader>>,
    loaded: HashMap<String, Rc<ImageAsset>>,
}

impl AssetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_loader(&mut self, loader: Box<dyn AssetLoader>) {
        self.loaders.push(loader);
    }

    /// Dispatches `name` to the first loader handling its extension.
    pub fn load_asset(&mut self, name: &str, bus: &mut MessageBus) {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let Some(loader) = self
            .loaders
            .iter_mut()
            .find(|l| l.supported_extensions().iter().any(|ext| *ext == extension))
        else {
            log::warn!(
                "unable to load asset '{name}': no loader is associated with extension '{extension}'"
            );
            return;
        };

        match loader.load_asset(name) {
            LoadStatus::Ready(asset) => self.on_asset_loaded(asset, bus),
            LoadStatus::Pending => log::debug!("asset '{name}' is loading"),
            LoadStatus::Failed(reason) => log::warn!("failed to load asset '{name}': {reason}"),
        }
    }

    /// Stores `asset` and announces it on the bus.
    pub fn on_asset_loaded(&mut self, asset: ImageAsset, bus: &mut MessageBus) {
        let code = asset_loaded_code(&asset.name);
        let asset = Rc::new(asset);
        log::debug!("asset '{}' loaded ({}x{})", asset.name, asset.width, asset.height);
        self.loaded.insert(asset.name.clone(), Rc::clone(&asset));
        bus.post(Message::new(code).with_context(asset));
    }

    pub fn is_asset_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Returns the asset if loaded; otherwise starts loading it and returns `None`.
    pub fn get_asset(&mut self, name: &str, bus: &mut MessageBus) -> Option<Rc<ImageAsset>> {
        if let Some(asset) = self.loaded.get(name) {
            return Some(Rc::clone(asset));
        }
        self.load_asset(name, bus);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryImageLoader;
    use crate::message::{HandlerRef, MessageHandler};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Collector(Vec<(String, u32)>);

    impl MessageHandler for Collector {
        fn on_message(&mut self, message: &Message) {
            let width = message.context_as::<ImageAsset>().map_or(0, |a| a.width);
            self.0.push((message.code.clone(), width));
        }
    }

    /// Loader that never completes on its own.
    struct Deferred;

    impl AssetLoader for Deferred {
        fn supported_extensions(&self) -> &[&'static str] {
            &["dds"]
        }

        fn load_asset(&mut self, _name: &str) -> LoadStatus {
            LoadStatus::Pending
        }
    }

    #[test]
    fn ready_load_is_stored_and_announced() {
        let mut bus = MessageBus::new();
        let seen = Rc::new(RefCell::new(Collector::default()));
        let code = asset_loaded_code("hero.PNG");
        bus.subscribe(&code, seen.clone() as HandlerRef).unwrap();

        let mut assets = AssetManager::new();
        assets.register_loader(Box::new(
            MemoryImageLoader::new().with_image(ImageAsset::solid("hero.PNG", 3, 1, [0; 4])),
        ));

        // Extension match is case-insensitive.
        assert!(assets.get_asset("hero.PNG", &mut bus).is_none());
        assert!(assets.is_asset_loaded("hero.PNG"));
        assert!(seen.borrow().0.is_empty());

        bus.update(0.0);
        assert_eq!(seen.borrow().0, vec![(code, 3)]);
        assert_eq!(assets.get_asset("hero.PNG", &mut bus).unwrap().width, 3);
    }

    #[test]
    fn pending_load_completes_through_host_callback() {
        let mut bus = MessageBus::new();
        let mut assets = AssetManager::new();
        assets.register_loader(Box::new(Deferred));

        assert!(assets.get_asset("sky.dds", &mut bus).is_none());
        assert!(!assets.is_asset_loaded("sky.dds"));

        assets.on_asset_loaded(ImageAsset::solid("sky.dds", 1, 1, [9; 4]), &mut bus);
        assert!(assets.is_asset_loaded("sky.dds"));
    }

    #[test]
    fn unknown_extension_is_ignored() {
        let mut bus = MessageBus::new();
        let mut assets = AssetManager::new();
        assets.register_loader(Box::new(MemoryImageLoader::new()));
        assert!(assets.get_asset("level.tmx", &mut bus).is_none());
        assert!(assets.get_asset("noextension", &mut bus).is_none());
        assert!(!assets.is_asset_loaded("level.tmx"));
    }
}
