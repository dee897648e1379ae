//! Graphics context boundary.
//!
//! The engine core never talks to a GPU driver directly. Everything it needs
//! (buffers, shaders, textures, draw calls, viewport/clear state) goes through
//! the [`GraphicsContext`] trait, which the host platform layer implements.
//! [`crate::headless::HeadlessContext`] is the in-process implementation used by
//! tests and the sandbox.

mod context;
mod types;

pub use context::GraphicsContext;
pub use types::{
    ActiveInfo, BufferHandle, BufferTarget, BufferUsage, DataType, DrawMode, ProgramHandle,
    ShaderHandle, ShaderStage, TextureHandle, UniformLocation,
};
