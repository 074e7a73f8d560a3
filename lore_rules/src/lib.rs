//! # Lore Rules
//!
//! The contracts of the narrative world: tiles and ticks, event and story
//! entities, their tags, and the lifecycle rules they obey.
//! This crate holds no randomness and no propagation logic; it only defines
//! the data the engine in `lore_core` reads and mutates.

pub mod entities;
pub mod error;
pub mod narrative;
pub mod world;

pub use entities::*;
pub use error::*;
pub use narrative::*;
pub use world::*;
