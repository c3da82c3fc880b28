//! Squish ECS - Entity Component System
//!
//! Entities are generational indices, components live in sparse sets, and every
//! entity carries a compact component mask. Systems declare their queries as
//! [`QueryDescriptor`]s (required components, exclusions, mandatory flag and an
//! optional "added" listener) that are evaluated against the mask table each
//! frame.

mod component;
mod entity;
mod error;
mod mask;
mod query;
mod query_state;
mod system;
mod world;

pub use component::Component;
pub use entity::Entity;
pub use error::EcsError;
pub use mask::{ComponentId, ComponentMask, MAX_COMPONENT_TYPES};
pub use query::{QueryIter, WorldQuery};
pub use query_state::{QueryDescriptor, QueryState};
pub use system::{FrameReport, System, SystemSchedule};
pub use world::World;
