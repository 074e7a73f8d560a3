//! Event Propagation - spreads events and stories across the tile graph.
//!
//! The propagation algorithm is a seeded, single-visit breadth-first search:
//! 1. **Seed**: The origin tile is affected at hop 0 with the base probability
//! 2. **Expand**: Nodes below the hop limit look at their neighbors in list order
//! 3. **Weigh**: Each unvisited neighbor gets `probability * decay * connectivity * saturation`
//! 4. **Roll**: Above the floor, one draw from the stream decides acceptance
//! 5. **Occupy**: Accepted tiles are queued and registered with the saturation manager
//!
//! Every tile is evaluated at most once per call, so the search terminates even on
//! cyclic graphs. Registration happens during the search, which lets a large event
//! throttle its own later hops.

mod connectivity;
mod decay;

pub use connectivity::*;
pub use decay::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, trace, warn};

use lore_rules::{AdjacencyMap, Event, Story, TileId};

use crate::config::ConfigError;
use crate::saturation::SaturationManager;
use crate::stream::{DrawStream, StreamPosition};

/// Tuning for the propagation search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Decay constant `k`.
    pub decay_constant: f64,

    /// Falloff curve applied per hop.
    pub decay_curve: DecayCurve,

    /// Effective probabilities below this never roll.
    pub min_probability: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            decay_constant: 0.8,
            decay_curve: DecayCurve::Exponential,
            min_probability: 0.01,
        }
    }
}

impl PropagationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.decay_constant.is_finite() || self.decay_constant < 0.0 {
            return Err(ConfigError::Invalid {
                field: "propagation.decay_constant",
                reason: format!("must be finite and >= 0, got {}", self.decay_constant),
            });
        }
        if !(0.0..=1.0).contains(&self.min_probability) {
            return Err(ConfigError::Invalid {
                field: "propagation.min_probability",
                reason: format!("must be within [0, 1], got {}", self.min_probability),
            });
        }
        Ok(())
    }
}

/// Something that can spread across the tile graph.
///
/// Implemented for [`Event`] and [`Story`] so both share one search.
pub trait Spreadable {
    /// Short label for logs.
    fn label(&self) -> &str;

    fn origin(&self) -> TileId;

    fn initial_probability(&self) -> f64;

    fn hop_limit(&self) -> u32;

    /// Remaining capacity of `tile` for this kind of content.
    fn capacity_at(&self, saturation: &SaturationManager, tile: TileId) -> f64;

    /// Register one occurrence on `tile`.
    fn occupy(&self, saturation: &mut SaturationManager, tile: TileId);

    /// Store the outcome of a propagation pass.
    fn absorb(&mut self, affected: &BTreeSet<TileId>, deepest_hop: u32);
}

impl Spreadable for Event {
    fn label(&self) -> &str {
        self.id().as_str()
    }

    fn origin(&self) -> TileId {
        self.origin_tile()
    }

    fn initial_probability(&self) -> f64 {
        self.base_probability()
    }

    fn hop_limit(&self) -> u32 {
        self.max_hops()
    }

    fn capacity_at(&self, saturation: &SaturationManager, tile: TileId) -> f64 {
        saturation.saturation_factor(tile, self.category())
    }

    fn occupy(&self, saturation: &mut SaturationManager, tile: TileId) {
        saturation.register_event(tile, self.category());
    }

    fn absorb(&mut self, affected: &BTreeSet<TileId>, deepest_hop: u32) {
        self.record_spread(affected.iter().copied(), deepest_hop);
    }
}

impl Spreadable for Story {
    fn label(&self) -> &str {
        self.id().as_str()
    }

    fn origin(&self) -> TileId {
        self.origin_tile()
    }

    fn initial_probability(&self) -> f64 {
        self.base_probability()
    }

    fn hop_limit(&self) -> u32 {
        self.max_hops()
    }

    fn capacity_at(&self, saturation: &SaturationManager, tile: TileId) -> f64 {
        saturation.story_saturation_factor(tile, self.story_type())
    }

    fn occupy(&self, saturation: &mut SaturationManager, tile: TileId) {
        saturation.register_story(tile, self.story_type());
    }

    fn absorb(&mut self, affected: &BTreeSet<TileId>, deepest_hop: u32) {
        self.record_spread(affected.iter().copied(), deepest_hop);
    }
}

/// Outcome of one propagation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Tiles reached, origin included.
    pub affected: BTreeSet<TileId>,
    /// Tiles evaluated, origin included.
    pub visited: usize,
    /// Tiles evaluated but not reached.
    pub rejected: usize,
    /// Deepest hop at which a tile was reached.
    pub deepest_hop: u32,
    /// Draws consumed from the stream by this call.
    pub draws: u64,
}

/// A queued tile in the search.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    tile: TileId,
    probability: f64,
    hop: u32,
}

/// Seeded propagation engine.
///
/// One instance owns one draw stream. Every call consumes further draws from it,
/// so reproducing a run requires the same seed and the same call order.
pub struct EventPropagation {
    config: PropagationConfig,
    stream: DrawStream,
    connectivity: Box<dyn ConnectivityModel>,
}

impl std::fmt::Debug for EventPropagation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPropagation")
            .field("config", &self.config)
            .field("stream", &self.stream.position())
            .finish_non_exhaustive()
    }
}

impl EventPropagation {
    /// Create an engine with the default configuration (`k = 0.8`).
    pub fn new(seed: u64) -> Self {
        Self {
            config: PropagationConfig::default(),
            stream: DrawStream::new(seed),
            connectivity: Box::new(UniformConnectivity),
        }
    }

    /// Create an engine with a custom decay constant.
    pub fn with_decay_constant(seed: u64, decay_constant: f64) -> Result<Self, ConfigError> {
        Self::with_config(
            seed,
            PropagationConfig {
                decay_constant,
                ..PropagationConfig::default()
            },
        )
    }

    /// Create an engine with a full configuration.
    pub fn with_config(seed: u64, config: PropagationConfig) -> Result<Self, ConfigError> {
        Self::resume(StreamPosition { seed, draws: 0 }, config)
    }

    /// Recreate an engine whose stream continues from a saved position.
    ///
    /// See [`DrawStream::resume`] for the replay cost.
    pub fn resume(position: StreamPosition, config: PropagationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            stream: DrawStream::resume(position),
            connectivity: Box::new(UniformConnectivity),
        })
    }

    /// Replace the connectivity weighting between adjacent tiles.
    pub fn with_connectivity(mut self, model: impl ConnectivityModel + 'static) -> Self {
        self.connectivity = Box::new(model);
        self
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Current position of the draw stream, for snapshots.
    pub fn stream_position(&self) -> StreamPosition {
        self.stream.position()
    }

    /// Decay multiplier for a hop distance under the configured curve.
    pub fn decay_at(&self, hop: u32) -> f64 {
        self.config.decay_curve.apply(self.config.decay_constant, hop)
    }

    /// Spread an event and return every tile it reached.
    pub fn propagate_event(
        &mut self,
        event: &mut Event,
        neighbors: &AdjacencyMap,
        saturation: &mut SaturationManager,
    ) -> BTreeSet<TileId> {
        self.spread(event, neighbors, saturation).affected
    }

    /// Spread a story and return every tile it reached.
    pub fn propagate_story(
        &mut self,
        story: &mut Story,
        neighbors: &AdjacencyMap,
        saturation: &mut SaturationManager,
    ) -> BTreeSet<TileId> {
        self.spread(story, neighbors, saturation).affected
    }

    /// Spread an event and return the full report.
    pub fn propagate_event_report(
        &mut self,
        event: &mut Event,
        neighbors: &AdjacencyMap,
        saturation: &mut SaturationManager,
    ) -> PropagationReport {
        self.spread(event, neighbors, saturation)
    }

    /// Spread a story and return the full report.
    pub fn propagate_story_report(
        &mut self,
        story: &mut Story,
        neighbors: &AdjacencyMap,
        saturation: &mut SaturationManager,
    ) -> PropagationReport {
        self.spread(story, neighbors, saturation)
    }

    /// Run the single-visit search for any [`Spreadable`].
    pub fn spread<S: Spreadable + ?Sized>(
        &mut self,
        subject: &mut S,
        neighbors: &AdjacencyMap,
        saturation: &mut SaturationManager,
    ) -> PropagationReport {
        let origin = subject.origin();
        let hop_limit = subject.hop_limit();
        let draws_before = self.stream.position().draws;

        let mut visited: HashSet<TileId> = HashSet::from([origin]);
        let mut affected: BTreeSet<TileId> = BTreeSet::from([origin]);
        let mut queue = VecDeque::from([Frontier {
            tile: origin,
            probability: subject.initial_probability(),
            hop: 0,
        }]);
        let mut rejected = 0;
        let mut deepest_hop = 0;

        while let Some(node) = queue.pop_front() {
            if node.hop >= hop_limit {
                continue;
            }
            let Some(adjacent) = neighbors.get(&node.tile) else {
                continue;
            };

            let next_hop = node.hop + 1;
            let decay = self.decay_at(next_hop);

            for &neighbor in adjacent {
                if !visited.insert(neighbor) {
                    continue;
                }

                let connectivity = self.connectivity_between(node.tile, neighbor);
                let capacity = subject.capacity_at(saturation, neighbor);
                let effective = node.probability * decay * connectivity * capacity;

                let accepted = effective >= self.config.min_probability
                    && self.stream.next_unit() < effective;

                trace!(
                    subject = subject.label(),
                    tile = neighbor.0,
                    hop = next_hop,
                    effective,
                    accepted,
                    "evaluated hop"
                );

                if accepted {
                    affected.insert(neighbor);
                    subject.occupy(saturation, neighbor);
                    deepest_hop = deepest_hop.max(next_hop);
                    queue.push_back(Frontier {
                        tile: neighbor,
                        probability: effective,
                        hop: next_hop,
                    });
                } else {
                    rejected += 1;
                }
            }
        }

        subject.absorb(&affected, deepest_hop);

        let report = PropagationReport {
            visited: visited.len(),
            rejected,
            deepest_hop,
            draws: self.stream.position().draws - draws_before,
            affected,
        };

        debug!(
            subject = subject.label(),
            origin = origin.0,
            affected = report.affected.len(),
            visited = report.visited,
            deepest_hop = report.deepest_hop,
            "propagation finished"
        );

        report
    }

    fn connectivity_between(&self, from: TileId, to: TileId) -> f64 {
        let factor = self.connectivity.factor(from, to);
        if !factor.is_finite() {
            warn!(from = from.0, to = to.0, factor, "non-finite connectivity factor, treating as 0");
            return 0.0;
        }
        factor.clamp(0.0, 1.0)
    }
}
