//! Headless graphics context.
//!
//! Used by tests and by hosts that only need to drive the engine without a GPU
//! (tooling, CI). It behaves like a strict GL driver: objects are validated,
//! shader sources are checked, and draw calls are recorded for inspection.

mod context;
mod glsl;

pub use context::{AttribPointer, DrawCall, DrawKind, HeadlessContext, UniformValue};
