//! Color and math types.
//!
//! World space is in surface pixels with the origin at the top-left corner
//! and +Y pointing down; the engine's projection maps it to clip space.

mod color;

pub use color::Color;
pub use glam::{Mat4, Vec3};

/// Orthographic projection for a `width` x `height` pixel surface
/// (top-left origin, +Y down, z in `[-100, 100]`).
pub fn surface_projection(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, width, height, 0.0, -100.0, 100.0)
}
