//! Tessera engine crate.
//!
//! Resource lifecycle and messaging core for a small 2D sprite renderer:
//! reference-counted textures and materials, GPU buffer and shader wrappers
//! over a [`device::GraphicsContext`], and a priority-queued message bus.

pub mod config;
pub mod coords;
pub mod device;
pub mod error;
pub mod headless;
pub mod logging;

pub mod assets;
pub mod engine;
pub mod gl;
pub mod graphics;
pub mod message;
pub mod resource;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{BusWarning, EngineError, Result};
