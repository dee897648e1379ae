//! GPU object wrappers built on [`crate::device::GraphicsContext`].

mod buffer;
mod shader;

pub use buffer::{AttributeInfo, GlBuffer};
pub use shader::Shader;
