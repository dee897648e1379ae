use std::collections::HashMap;

/// Decoded image: tightly packed RGBA8 rows, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageAsset {
    /// Builds an image, returning `None` when `pixels` does not hold exactly
    /// `width * height` RGBA texels.
    pub fn new(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { name: name.into(), width, height, pixels })
    }

    /// Single-color image.
    pub fn solid(name: impl Into<String>, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let texels = width as usize * height as usize;
        Self {
            name: name.into(),
            width,
            height,
            pixels: rgba.repeat(texels),
        }
    }
}

/// Outcome of a load request.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// The asset is available now.
    Ready(ImageAsset),
    /// The host will deliver it later through `AssetManager::on_asset_loaded`.
    Pending,
    Failed(String),
}

/// Source of assets for a set of file extensions.
pub trait AssetLoader {
    /// Lower-case extensions without the dot.
    fn supported_extensions(&self) -> &[&'static str];

    fn load_asset(&mut self, name: &str) -> LoadStatus;
}

/// Serves images that were inserted ahead of time.
#[derive(Debug, Default)]
pub struct MemoryImageLoader {
    images: HashMap<String, ImageAsset>,
}

impl MemoryImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: ImageAsset) {
        self.images.insert(image.name.clone(), image);
    }

    pub fn with_image(mut self, image: ImageAsset) -> Self {
        self.insert(image);
        self
    }
}

impl AssetLoader for MemoryImageLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["png", "jpg", "jpeg", "gif", "bmp"]
    }

    fn load_asset(&mut self, name: &str) -> LoadStatus {
        match self.images.get(name) {
            Some(image) => LoadStatus::Ready(image.clone()),
            None => LoadStatus::Failed(format!("no in-memory image named '{name}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_is_validated() {
        assert!(ImageAsset::new("a.png", 2, 2, vec![0; 16]).is_some());
        assert!(ImageAsset::new("a.png", 2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn memory_loader_serves_inserted_images() {
        let mut loader =
            MemoryImageLoader::new().with_image(ImageAsset::solid("wood.png", 2, 1, [1, 2, 3, 4]));

        match loader.load_asset("wood.png") {
            LoadStatus::Ready(img) => assert_eq!(img.pixels, vec![1, 2, 3, 4, 1, 2, 3, 4]),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(matches!(loader.load_asset("stone.png"), LoadStatus::Failed(_)));
    }
}
