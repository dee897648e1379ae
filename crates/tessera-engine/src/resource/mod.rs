//! Reference-counted resource registry shared by the texture and material managers.

mod cache;

pub use cache::{ReleaseOutcome, Resource, ResourceCache};
