//! Event definitions - discrete occurrences that spread from an origin tile.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{validate_identity, validate_spread_parameters, EventId, StoryId};
use crate::error::ValidationError;
use crate::narrative::{EventCategory, EventStatus};
use crate::world::{Tick, TileId};

/// A discrete occurrence in the world.
///
/// Identity and spread parameters are fixed at construction. Only the lifecycle
/// fields (`status`, `hop_count`, `affected_regions`, `last_processed_tick`) and
/// free-form metadata change afterwards. Deserialization runs the same checks
/// as [`EventBuilder::build`] and keeps the origin among the affected regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct Event {
    id: EventId,
    title: String,
    description: Option<String>,
    category: EventCategory,
    status: EventStatus,

    origin_tile: TileId,
    origin_tick: Tick,

    /// Chance (0.0 - 1.0) of crossing the first hop before decay.
    base_probability: f64,
    max_hops: u32,
    /// Deepest hop this event has reached so far.
    hop_count: u32,
    /// Scheduling priority from 0 to 10.
    priority: u8,

    linked_story_id: Option<StoryId>,

    /// Key -> predicate pairs evaluated by the host simulator.
    trigger_conditions: BTreeMap<String, Value>,
    /// Key -> payload pairs applied by the host simulator.
    effects: BTreeMap<String, Value>,

    affected_regions: BTreeSet<TileId>,

    metadata: HashMap<String, Value>,

    last_processed_tick: Option<Tick>,
}

impl Event {
    /// Start building a new event.
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn origin_tile(&self) -> TileId {
        self.origin_tile
    }

    pub fn origin_tick(&self) -> Tick {
        self.origin_tick
    }

    pub fn base_probability(&self) -> f64 {
        self.base_probability
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    pub fn hop_count(&self) -> u32 {
        self.hop_count
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn linked_story_id(&self) -> Option<&StoryId> {
        self.linked_story_id.as_ref()
    }

    pub fn trigger_conditions(&self) -> &BTreeMap<String, Value> {
        &self.trigger_conditions
    }

    pub fn effects(&self) -> &BTreeMap<String, Value> {
        &self.effects
    }

    /// Every tile this event has reached, origin included.
    pub fn affected_regions(&self) -> &BTreeSet<TileId> {
        &self.affected_regions
    }

    /// Check if the event has reached a tile.
    pub fn affects(&self, tile: TileId) -> bool {
        self.affected_regions.contains(&tile)
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Attach or replace a metadata entry.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn last_processed_tick(&self) -> Option<Tick> {
        self.last_processed_tick
    }

    /// Move the event to a new lifecycle state.
    pub fn transition_to(&mut self, next: EventStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::InvalidEventTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Merge tiles reached by a propagation pass and raise the hop counter.
    ///
    /// The hop counter never moves backwards.
    pub fn record_spread(&mut self, tiles: impl IntoIterator<Item = TileId>, deepest_hop: u32) {
        self.affected_regions.extend(tiles);
        self.hop_count = self.hop_count.max(deepest_hop);
    }

    /// Remember the last tick at which the host simulator processed this event.
    pub fn mark_processed(&mut self, tick: Tick) {
        self.last_processed_tick = Some(tick);
    }
}

/// Persisted form of an [`Event`], checked before it becomes one.
#[derive(Deserialize)]
struct EventRecord {
    id: EventId,
    title: String,
    description: Option<String>,
    category: EventCategory,
    status: EventStatus,
    origin_tile: TileId,
    origin_tick: Tick,
    base_probability: f64,
    max_hops: u32,
    hop_count: u32,
    priority: u8,
    linked_story_id: Option<StoryId>,
    #[serde(default)]
    trigger_conditions: BTreeMap<String, Value>,
    #[serde(default)]
    effects: BTreeMap<String, Value>,
    #[serde(default)]
    affected_regions: BTreeSet<TileId>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    last_processed_tick: Option<Tick>,
}

impl TryFrom<EventRecord> for Event {
    type Error = ValidationError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        validate_identity(record.id.as_str(), &record.title)?;
        validate_spread_parameters(record.base_probability, record.priority)?;

        let mut affected_regions = record.affected_regions;
        affected_regions.insert(record.origin_tile);

        Ok(Event {
            id: record.id,
            title: record.title,
            description: record.description,
            category: record.category,
            status: record.status,
            origin_tile: record.origin_tile,
            origin_tick: record.origin_tick,
            base_probability: record.base_probability,
            max_hops: record.max_hops,
            hop_count: record.hop_count,
            priority: record.priority,
            linked_story_id: record.linked_story_id,
            trigger_conditions: record.trigger_conditions,
            effects: record.effects,
            affected_regions,
            metadata: record.metadata,
            last_processed_tick: record.last_processed_tick,
        })
    }
}

/// Validating builder for [`Event`].
///
/// `id`, `title`, and `category` are required.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    id: Option<EventId>,
    title: Option<String>,
    description: Option<String>,
    category: Option<EventCategory>,
    status: EventStatus,
    origin_tile: TileId,
    origin_tick: Tick,
    base_probability: f64,
    max_hops: u32,
    priority: u8,
    linked_story_id: Option<StoryId>,
    trigger_conditions: BTreeMap<String, Value>,
    effects: BTreeMap<String, Value>,
    metadata: HashMap<String, Value>,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self {
            id: None,
            title: None,
            description: None,
            category: None,
            status: EventStatus::Pending,
            origin_tile: TileId::default(),
            origin_tick: Tick::default(),
            base_probability: 0.5,
            max_hops: 3,
            priority: 5,
            linked_story_id: None,
            trigger_conditions: BTreeMap::new(),
            effects: BTreeMap::new(),
            metadata: HashMap::new(),
        }
    }
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(EventId::new(id));
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn origin_tile(mut self, tile: impl Into<TileId>) -> Self {
        self.origin_tile = tile.into();
        self
    }

    pub fn origin_tick(mut self, tick: Tick) -> Self {
        self.origin_tick = tick;
        self
    }

    pub fn base_probability(mut self, probability: f64) -> Self {
        self.base_probability = probability;
        self
    }

    pub fn max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn linked_story(mut self, story_id: StoryId) -> Self {
        self.linked_story_id = Some(story_id);
        self
    }

    pub fn trigger_condition(mut self, key: impl Into<String>, value: Value) -> Self {
        self.trigger_conditions.insert(key.into(), value);
        self
    }

    pub fn effect(mut self, key: impl Into<String>, value: Value) -> Self {
        self.effects.insert(key.into(), value);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Validate and build the event.
    pub fn build(self) -> Result<Event, ValidationError> {
        let id = self.id.ok_or(ValidationError::EmptyId)?;
        let title = self.title.unwrap_or_default();
        validate_identity(id.as_str(), &title)?;
        let category = self.category.ok_or(ValidationError::MissingCategory)?;
        validate_spread_parameters(self.base_probability, self.priority)?;

        Ok(Event {
            id,
            title,
            description: self.description,
            category,
            status: self.status,
            origin_tile: self.origin_tile,
            origin_tick: self.origin_tick,
            base_probability: self.base_probability,
            max_hops: self.max_hops,
            hop_count: 0,
            priority: self.priority,
            linked_story_id: self.linked_story_id,
            trigger_conditions: self.trigger_conditions,
            effects: self.effects,
            affected_regions: BTreeSet::from([self.origin_tile]),
            metadata: self.metadata,
            last_processed_tick: None,
        })
    }
}
