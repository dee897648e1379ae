use crate::coords::Color;
use crate::message::DEFAULT_MESSAGES_PER_UPDATE;

/// Engine start-up parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Initial surface size in pixels.
    pub width: u32,
    pub height: u32,

    /// Color the surface is cleared to every frame.
    pub clear_color: Color,

    /// Queued messages delivered per `update`.
    pub messages_per_update: usize,

    /// Name under which the built-in sprite shader is reported in errors.
    pub sprite_shader_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: Color::black(),
            messages_per_update: DEFAULT_MESSAGES_PER_UPDATE,
            sprite_shader_name: "basic".to_string(),
        }
    }
}
