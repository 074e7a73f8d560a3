//! Story definitions - narrative threads that outlive the events behind them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use super::{validate_identity, validate_spread_parameters, EventId, StoryId};
use crate::error::ValidationError;
use crate::narrative::{StoryStatus, StoryType};
use crate::world::{Tick, TileCoordinate, TileId, WorldGrid};

/// A legend, rumor, prophecy or other long-lived narrative thread.
///
/// Deserialization runs the same checks as [`StoryBuilder::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoryRecord")]
pub struct Story {
    id: StoryId,
    title: String,
    description: Option<String>,
    story_type: StoryType,
    status: StoryStatus,

    origin_tile: TileId,
    origin_tick: Tick,

    base_probability: f64,
    max_hops: u32,
    hop_count: u32,
    priority: u8,

    /// Events this story grew out of or spawned.
    linked_event_ids: Vec<EventId>,

    affected_regions: BTreeSet<TileId>,

    metadata: HashMap<String, Value>,

    last_processed_tick: Option<Tick>,
}

impl Story {
    /// Start building a new story.
    pub fn builder() -> StoryBuilder {
        StoryBuilder::default()
    }

    pub fn id(&self) -> &StoryId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn story_type(&self) -> StoryType {
        self.story_type
    }

    pub fn status(&self) -> StoryStatus {
        self.status
    }

    pub fn origin_tile(&self) -> TileId {
        self.origin_tile
    }

    pub fn origin_tick(&self) -> Tick {
        self.origin_tick
    }

    /// Decompose the origin tile into grid coordinates.
    ///
    /// Returns `None` when the origin does not lie on `grid`.
    pub fn origin_coordinate(&self, grid: &WorldGrid) -> Option<TileCoordinate> {
        grid.decode(self.origin_tile)
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

    pub fn linked_event_ids(&self) -> &[EventId] {
        &self.linked_event_ids
    }

    /// Link an event to this story. Duplicate links are ignored.
    pub fn link_event(&mut self, event_id: EventId) {
        if !self.linked_event_ids.contains(&event_id) {
            self.linked_event_ids.push(event_id);
        }
    }

    pub fn affected_regions(&self) -> &BTreeSet<TileId> {
        &self.affected_regions
    }

    pub fn affects(&self, tile: TileId) -> bool {
        self.affected_regions.contains(&tile)
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn last_processed_tick(&self) -> Option<Tick> {
        self.last_processed_tick
    }

    /// Move the story to a new lifecycle state.
    pub fn transition_to(&mut self, next: StoryStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::InvalidStoryTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Merge tiles reached by a propagation pass and raise the hop counter.
    pub fn record_spread(&mut self, tiles: impl IntoIterator<Item = TileId>, deepest_hop: u32) {
        self.affected_regions.extend(tiles);
        self.hop_count = self.hop_count.max(deepest_hop);
    }

    pub fn mark_processed(&mut self, tick: Tick) {
        self.last_processed_tick = Some(tick);
    }
}

/// Persisted form of a [`Story`], checked before it becomes one.
#[derive(Deserialize)]
struct StoryRecord {
    id: StoryId,
    title: String,
    description: Option<String>,
    story_type: StoryType,
    status: StoryStatus,
    origin_tile: TileId,
    origin_tick: Tick,
    base_probability: f64,
    max_hops: u32,
    hop_count: u32,
    priority: u8,
    #[serde(default)]
    linked_event_ids: Vec<EventId>,
    #[serde(default)]
    affected_regions: BTreeSet<TileId>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    last_processed_tick: Option<Tick>,
}

impl TryFrom<StoryRecord> for Story {
    type Error = ValidationError;

    fn try_from(record: StoryRecord) -> Result<Self, Self::Error> {
        validate_identity(record.id.as_str(), &record.title)?;
        validate_spread_parameters(record.base_probability, record.priority)?;

        let mut affected_regions = record.affected_regions;
        affected_regions.insert(record.origin_tile);

        let mut linked_event_ids: Vec<EventId> = Vec::with_capacity(record.linked_event_ids.len());
        for event_id in record.linked_event_ids {
            if !linked_event_ids.contains(&event_id) {
                linked_event_ids.push(event_id);
            }
        }

        Ok(Story {
            id: record.id,
            title: record.title,
            description: record.description,
            story_type: record.story_type,
            status: record.status,
            origin_tile: record.origin_tile,
            origin_tick: record.origin_tick,
            base_probability: record.base_probability,
            max_hops: record.max_hops,
            hop_count: record.hop_count,
            priority: record.priority,
            linked_event_ids,
            affected_regions,
            metadata: record.metadata,
            last_processed_tick: record.last_processed_tick,
        })
    }
}

/// Validating builder for [`Story`].
///
/// `id`, `title`, and `story_type` are required.
#[derive(Debug, Clone)]
pub struct StoryBuilder {
    id: Option<StoryId>,
    title: Option<String>,
    description: Option<String>,
    story_type: Option<StoryType>,
    status: StoryStatus,
    origin_tile: TileId,
    origin_tick: Tick,
    base_probability: f64,
    max_hops: u32,
    priority: u8,
    linked_event_ids: Vec<EventId>,
    metadata: HashMap<String, Value>,
}

impl Default for StoryBuilder {
    fn default() -> Self {
        Self {
            id: None,
            title: None,
            description: None,
            story_type: None,
            status: StoryStatus::Active,
            origin_tile: TileId::default(),
            origin_tick: Tick::default(),
            base_probability: 0.5,
            max_hops: 3,
            priority: 5,
            linked_event_ids: Vec::new(),
            metadata: HashMap::new(),
        }
    }
}

impl StoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(StoryId::new(id));
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

    pub fn story_type(mut self, story_type: StoryType) -> Self {
        self.story_type = Some(story_type);
        self
    }

    pub fn status(mut self, status: StoryStatus) -> Self {
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

    pub fn linked_event(mut self, event_id: EventId) -> Self {
        if !self.linked_event_ids.contains(&event_id) {
            self.linked_event_ids.push(event_id);
        }
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Validate and build the story.
    pub fn build(self) -> Result<Story, ValidationError> {
        let id = self.id.ok_or(ValidationError::EmptyId)?;
        let title = self.title.unwrap_or_default();
        validate_identity(id.as_str(), &title)?;
        let story_type = self.story_type.ok_or(ValidationError::MissingStoryType)?;
        validate_spread_parameters(self.base_probability, self.priority)?;

        Ok(Story {
            id,
            title,
            description: self.description,
            story_type,
            status: self.status,
            origin_tile: self.origin_tile,
            origin_tick: self.origin_tick,
            base_probability: self.base_probability,
            max_hops: self.max_hops,
            hop_count: 0,
            priority: self.priority,
            linked_event_ids: self.linked_event_ids,
            affected_regions: BTreeSet::from([self.origin_tile]),
            metadata: self.metadata,
            last_processed_tick: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dragon_legend() -> StoryBuilder {
        Story::builder()
            .id("story-dragon")
            .title("The Dragon of Ashfall")
            .story_type(StoryType::Legend)
    }

    #[test]
    fn test_story_defaults() {
        let story = dragon_legend().build().unwrap();

        assert_eq!(story.status(), StoryStatus::Active);
        assert_eq!(story.story_type(), StoryType::Legend);
        assert_eq!(story.hop_count(), 0);
        assert!(story.affects(TileId(0)));
        assert!(story.linked_event_ids().is_empty());
    }

    #[test]
    fn test_story_requires_type() {
        let result = Story::builder().id("story-1").title("Whispers").build();
        assert_eq!(result.unwrap_err(), ValidationError::MissingStoryType);
    }

    #[test]
    fn test_story_rejects_bad_parameters() {
        assert!(dragon_legend().base_probability(2.0).build().is_err());
        assert!(dragon_legend().priority(200).build().is_err());
        assert!(Story::builder()
            .id("  ")
            .title("Blank")
            .story_type(StoryType::Rumor)
            .build()
            .is_err());
    }

    #[test]
    fn test_origin_coordinate_uses_grid() {
        let story = dragon_legend().origin_tile(TileId(205)).build().unwrap();

        let grid = WorldGrid::new(100, 100);
        assert_eq!(story.origin_coordinate(&grid), Some(TileCoordinate::new(5, 2)));

        let small = WorldGrid::new(10, 10);
        assert_eq!(story.origin_coordinate(&small), None);
    }

    #[test]
    fn test_link_event_dedupes() {
        let event_id = EventId::new("evt-eruption");
        let mut story = dragon_legend().linked_event(event_id.clone()).build().unwrap();

        story.link_event(event_id);
        story.link_event(EventId::new("evt-sighting"));

        assert_eq!(story.linked_event_ids().len(), 2);
    }

    #[test]
    fn test_story_lifecycle() {
        let mut story = dragon_legend().build().unwrap();

        story.transition_to(StoryStatus::Dormant).unwrap();
        story.transition_to(StoryStatus::Discredited).unwrap();
        assert!(story.transition_to(StoryStatus::Active).is_err());
        story.transition_to(StoryStatus::Archived).unwrap();

        assert!(story.status().is_terminal());
    }

    #[test]
    fn test_story_deserialization_validates() {
        let story = dragon_legend().origin_tile(TileId(9)).build().unwrap();
        let valid = serde_json::to_value(&story).unwrap();

        let restored: Story = serde_json::from_value(valid.clone()).unwrap();
        assert_eq!(restored, story);

        let mut bad_probability = valid.clone();
        bad_probability["base_probability"] = serde_json::json!(-0.5);
        assert!(serde_json::from_value::<Story>(bad_probability).is_err());

        let mut blank_title = valid.clone();
        blank_title["title"] = serde_json::json!("   ");
        assert!(serde_json::from_value::<Story>(blank_title).is_err());

        let mut no_regions = valid;
        no_regions["affected_regions"] = serde_json::json!([]);
        let restored: Story = serde_json::from_value(no_regions).unwrap();
        assert!(restored.affects(TileId(9)));
    }
}
