//! Frame driver tying the subsystems together.
//!
//! The host owns the loop: it calls [`Engine::update`] then
//! [`Engine::render`] once per frame and forwards surface size changes to
//! [`Engine::resize`].

use crate::assets::AssetManager;
use crate::config::EngineConfig;
use crate::coords::{surface_projection, Color, Mat4};
use crate::device::GraphicsContext;
use crate::error::{EngineError, Result};
use crate::gl::Shader;
use crate::graphics::{Material, MaterialDeps, MaterialManager, Sprite, TextureDeps, TextureManager};
use crate::message::MessageBus;
use crate::resource::ReleaseOutcome;

/// Vertex stage of the built-in sprite shader.
pub const SPRITE_VERTEX_SHADER: &str = "
attribute vec3 a_position;
attribute vec2 a_texCoord;

uniform mat4 u_projection;
uniform mat4 u_model;

varying vec2 v_texCoord;

void main() {
    gl_Position = u_projection * u_model * vec4(a_position, 1.0);
    v_texCoord = a_texCoord;
}
";

/// Fragment stage of the built-in sprite shader.
pub const SPRITE_FRAGMENT_SHADER: &str = "
precision mediump float;

uniform vec4 u_tint;
uniform sampler2D u_diffuse;

varying vec2 v_texCoord;

void main() {
    gl_FragColor = u_tint * texture2D(u_diffuse, v_texCoord);
}
";

/// Owns the graphics context and every engine subsystem.
pub struct Engine<G: GraphicsContext> {
    gl: G,
    config: EngineConfig,

    bus: MessageBus,
    assets: AssetManager,
    textures: TextureManager,
    materials: MaterialManager,

    shader: Option<Shader>,
    sprites: Vec<Sprite>,

    size: (u32, u32),
    projection: Mat4,
    frames: u64,
}

impl<G: GraphicsContext> Engine<G> {
    pub fn new(gl: G, config: EngineConfig) -> Self {
        let size = (config.width, config.height);
        Self {
            gl,
            bus: MessageBus::with_budget(config.messages_per_update),
            assets: AssetManager::new(),
            textures: TextureManager::new(),
            materials: MaterialManager::new(),
            shader: None,
            sprites: Vec::new(),
            size,
            projection: surface_projection(size.0 as f32, size.1 as f32),
            frames: 0,
            config,
        }
    }

    /// Compiles the sprite shader and prepares the surface.
    ///
    /// Calling `start` again is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.shader.is_some() {
            log::warn!("engine already started");
            return Ok(());
        }

        self.gl.clear_color(self.config.clear_color.to_array());
        let shader = Shader::new(
            &mut self.gl,
            self.config.sprite_shader_name.clone(),
            SPRITE_VERTEX_SHADER,
            SPRITE_FRAGMENT_SHADER,
        )?;
        shader.use_program(&mut self.gl);
        self.shader = Some(shader);

        let (width, height) = (self.config.width, self.config.height);
        self.resize(width, height);
        log::info!("engine started ({width}x{height})");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.shader.is_some()
    }

    /// Applies a new surface size. Zero-sized surfaces are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return;
        }
        self.size = (width, height);
        self.gl.viewport(0, 0, width, height);
        self.projection = surface_projection(width as f32, height as f32);
    }

    /// Delivers queued messages. Returns how many were delivered.
    pub fn update(&mut self, dt: f32) -> usize {
        self.bus.update(dt)
    }

    /// Clears the surface and draws every sprite in creation order.
    pub fn render(&mut self) -> Result<()> {
        let shader = self.shader.as_ref().ok_or(EngineError::NotStarted)?;

        self.gl.clear();
        shader.use_program(&mut self.gl);
        let projection = self.projection.to_cols_array();
        self.gl.uniform_matrix_4fv(shader.uniform_location("u_projection")?, &projection);

        for sprite in &self.sprites {
            sprite.draw(&mut self.gl, shader)?;
        }

        self.frames += 1;
        log::trace!("frame {} rendered {} sprite(s)", self.frames, self.sprites.len());
        Ok(())
    }

    // ── resources ────────────────────────────────────────────────────────

    /// Creates and registers a material. The engine keeps the registering
    /// reference until [`release_material`](Self::release_material).
    ///
    /// Returns `false` when the name was already taken.
    pub fn register_material(
        &mut self,
        name: &str,
        diffuse_texture: Option<&str>,
        tint: Color,
    ) -> Result<bool> {
        let material = Material::new(
            name,
            diffuse_texture,
            tint,
            &mut self.textures,
            TextureDeps::new(&mut self.gl, &mut self.bus),
            &mut self.assets,
        )?;
        let deps = MaterialDeps {
            textures: &mut self.textures,
            gpu: TextureDeps::new(&mut self.gl, &mut self.bus),
        };
        Ok(self.materials.register(material, deps))
    }

    /// Drops the reference taken by [`register_material`](Self::register_material).
    pub fn release_material(&mut self, name: &str) -> ReleaseOutcome {
        let deps = MaterialDeps {
            textures: &mut self.textures,
            gpu: TextureDeps::new(&mut self.gl, &mut self.bus),
        };
        self.materials.release(name, deps)
    }

    // ── sprites ──────────────────────────────────────────────────────────

    /// Creates and loads a sprite using `material_name`.
    pub fn create_sprite(
        &mut self,
        name: &str,
        material_name: &str,
        width: f32,
        height: f32,
    ) -> Result<&mut Sprite> {
        let shader = self.shader.as_ref().ok_or(EngineError::NotStarted)?;
        if self.sprites.iter().any(|s| s.name() == name) {
            return Err(EngineError::DuplicateSprite(name.to_string()));
        }

        let mut sprite = Sprite::new(name, material_name, width, height, &mut self.materials)?;
        if let Err(e) = sprite.load(&mut self.gl, shader) {
            let deps = MaterialDeps {
                textures: &mut self.textures,
                gpu: TextureDeps::new(&mut self.gl, &mut self.bus),
            };
            sprite.destroy(&mut self.materials, deps);
            return Err(e);
        }

        self.sprites.push(sprite);
        let index = self.sprites.len() - 1;
        Ok(&mut self.sprites[index])
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.name() == name)
    }

    pub fn sprite_mut(&mut self, name: &str) -> Option<&mut Sprite> {
        self.sprites.iter_mut().find(|s| s.name() == name)
    }

    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.sprites.iter()
    }

    /// Removes `name`, freeing its buffer and its material reference.
    pub fn destroy_sprite(&mut self, name: &str) -> Result<ReleaseOutcome> {
        let index = self
            .sprites
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| EngineError::SpriteNotFound(name.to_string()))?;

        let sprite = self.sprites.remove(index);
        let deps = MaterialDeps {
            textures: &mut self.textures,
            gpu: TextureDeps::new(&mut self.gl, &mut self.bus),
        };
        Ok(sprite.destroy(&mut self.materials, deps))
    }

    /// Destroys every sprite and the sprite shader. Materials registered
    /// through the engine stay until released.
    pub fn shutdown(&mut self) {
        for sprite in std::mem::take(&mut self.sprites) {
            let deps = MaterialDeps {
                textures: &mut self.textures,
                gpu: TextureDeps::new(&mut self.gl, &mut self.bus),
            };
            sprite.destroy(&mut self.materials, deps);
        }
        if let Some(shader) = self.shader.take() {
            self.gl.use_program(None);
            shader.destroy(&mut self.gl);
        }
        log::info!("engine shut down after {} frame(s)", self.frames);
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gl(&self) -> &G {
        &self.gl
    }

    pub fn gl_mut(&mut self) -> &mut G {
        &mut self.gl
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MessageBus {
        &mut self.bus
    }

    pub fn assets(&self) -> &AssetManager {
        &self.assets
    }

    /// Asset manager together with the bus it announces loads on, for hosts
    /// completing pending loads.
    pub fn assets_mut(&mut self) -> (&mut AssetManager, &mut MessageBus) {
        (&mut self.assets, &mut self.bus)
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    pub fn shader(&self) -> Option<&Shader> {
        self.shader.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}
