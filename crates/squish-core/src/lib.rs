//! Squish Core - Shared types for the squish simulation crates
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Mathematical primitives (re-exported from glam)
//! - Transform for positioning render objects and bodies
//! - Frame time tracking for the per-frame tick

pub mod time;
pub mod types;

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use time::FrameTime;
pub use types::{Color, Transform};
