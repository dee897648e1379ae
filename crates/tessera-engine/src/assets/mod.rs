//! Asset loading boundary.
//!
//! The engine never performs I/O itself. Loaders either hand back an asset
//! immediately or report it as pending; the host completes pending loads by
//! calling [`AssetManager::on_asset_loaded`], which announces the asset on the
//! message bus under [`asset_loaded_code`].

mod loader;
mod manager;

pub use loader::{AssetLoader, ImageAsset, LoadStatus, MemoryImageLoader};
pub use manager::{asset_loaded_code, AssetManager, ASSET_LOADED_PREFIX};
