//! # Lore Core (Loreweave)
//!
//! Deterministic diffusion of narrative artifacts. Events and stories built with
//! `lore_rules` spread from their origin tile across a caller-supplied adjacency
//! graph, decaying with distance and throttled by how crowded each tile already is.
//!
//! ## Core Components
//!
//! - **propagation**: Seeded single-visit breadth-first spread with per-hop decay
//! - **saturation**: Per-tile occupancy counters that turn into a throttling factor
//! - **stream**: The seeded draw stream, resumable from a saved position
//! - **config**: TOML-loadable tuning knobs
//!
//! ## Determinism
//!
//! Same seed, same configuration, same entity, same graph (including neighbor
//! order) and same call order always produce the same affected tiles.
//! The engine keeps no state besides its draw stream; the saturation manager and
//! entities belong to the caller and are borrowed for one call at a time.

pub mod config;
pub mod propagation;
pub mod saturation;
pub mod stream;

pub use config::*;
pub use propagation::*;
pub use saturation::*;
pub use stream::*;
