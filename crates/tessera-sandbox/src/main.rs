use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use tessera_engine::assets::{asset_loaded_code, AssetLoader, ImageAsset, LoadStatus, MemoryImageLoader};
use tessera_engine::coords::{Color, Vec3};
use tessera_engine::headless::HeadlessContext;
use tessera_engine::logging::{init_logging, LoggingConfig};
use tessera_engine::message::{HandlerRef, Message, MessageHandler};
use tessera_engine::{Engine, EngineConfig};

const FRAMES: u32 = 120;
const DT: f32 = 1.0 / 60.0;

/// Loader standing in for a host that fetches `.ktx` images asynchronously.
struct Streaming;

impl AssetLoader for Streaming {
    fn supported_extensions(&self) -> &[&'static str] {
        &["ktx"]
    }

    fn load_asset(&mut self, name: &str) -> LoadStatus {
        log::info!("streaming '{name}' in the background");
        LoadStatus::Pending
    }
}

/// Logs every asset announcement it is subscribed to.
struct LoadWatcher;

impl MessageHandler for LoadWatcher {
    fn on_message(&mut self, message: &Message) {
        if let Some(asset) = message.context_as::<ImageAsset>() {
            log::info!("asset ready: {} ({}x{})", asset.name, asset.width, asset.height);
        }
    }
}

fn checker(name: &str, size: u32, a: [u8; 4], b: [u8; 4]) -> Result<ImageAsset> {
    let pixels = (0..size * size)
        .flat_map(|i| if (i % size + i / size) % 2 == 0 { a } else { b })
        .collect();
    ImageAsset::new(name, size, size, pixels).context("checker image has the wrong size")
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = EngineConfig {
        width: 640,
        height: 360,
        clear_color: Color::from_u8(20, 24, 32, 255),
        ..Default::default()
    };
    let mut engine = Engine::new(HeadlessContext::new(), config);

    {
        let (assets, bus) = engine.assets_mut();
        assets.register_loader(Box::new(
            MemoryImageLoader::new()
                .with_image(ImageAsset::solid("hero.png", 16, 16, [230, 80, 60, 255]))
                .with_image(checker("floor.png", 8, [90, 90, 90, 255], [60, 60, 60, 255])?),
        ));
        assets.register_loader(Box::new(Streaming));

        let watcher: HandlerRef = Rc::new(RefCell::new(LoadWatcher));
        for name in ["hero.png", "floor.png", "sky.ktx"] {
            // Duplicates are logged by the bus.
            let _ = bus.subscribe(&asset_loaded_code(name), watcher.clone());
        }
    }

    engine.start().context("starting engine")?;

    engine.register_material("hero", Some("hero.png"), Color::white())?;
    engine.register_material("floor", Some("floor.png"), Color::new(0.8, 0.8, 0.8, 1.0))?;
    engine.register_material("sky", Some("sky.ktx"), Color::white())?;

    engine.create_sprite("sky", "sky", 640.0, 180.0).context("creating sky")?;
    for i in 0..5 {
        let tile = engine
            .create_sprite(&format!("floor-{i}"), "floor", 128.0, 32.0)
            .context("creating floor tile")?;
        tile.position = Vec3::new(i as f32 * 128.0, 328.0, 0.0);
    }
    engine.create_sprite("player", "hero", 32.0, 32.0).context("creating player")?.position =
        Vec3::new(16.0, 296.0, 1.0);

    for frame in 0..FRAMES {
        if frame == 30 {
            // The host finishes streaming half a second in.
            let sky = checker("sky.ktx", 4, [120, 170, 255, 255], [140, 190, 255, 255])?;
            let (assets, bus) = engine.assets_mut();
            assets.on_asset_loaded(sky, bus);
        }
        if frame == 90 {
            engine.resize(1280, 720);
        }

        engine.update(DT);
        if let Some(player) = engine.sprite_mut("player") {
            player.position.x += 120.0 * DT;
        }
        engine.render().with_context(|| format!("rendering frame {frame}"))?;
    }

    let gl = engine.gl();
    log::info!(
        "{} frames, {} draw calls, {} GL errors",
        engine.frame_count(),
        gl.draw_calls().len(),
        gl.errors().len()
    );
    for name in ["hero.png", "floor.png", "sky.ktx"] {
        if let Some(texture) = engine.textures().get(name) {
            log::info!(
                "texture {name}: {}x{} loaded={} refs={:?}",
                texture.width(),
                texture.height(),
                texture.is_loaded(),
                engine.textures().reference_count(name)
            );
        }
    }

    engine.destroy_sprite("sky")?;
    engine.release_material("sky");
    engine.shutdown();
    for material in ["hero", "floor"] {
        engine.release_material(material);
    }
    log::info!(
        "after shutdown: {} buffers, {} textures, {} programs",
        engine.gl().live_buffers(),
        engine.gl().live_textures(),
        engine.gl().live_programs()
    );
    Ok(())
}
