//! Saturation - per-tile narrative capacity that throttles propagation.
//!
//! Every tile keeps counts of the stories and events currently registered on it.
//! The counts are turned into a saturation factor in `[0.0, 1.0]`:
//! `1.0` means the tile is empty, `0.0` means it cannot absorb anything more.
//! Tracking is per tile so a busy hub resists new arrivals while the rest of
//! the world stays open.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use lore_rules::{EventCategory, StoryType, TileId};

use crate::config::ConfigError;

/// Capacity limits for a single tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationConfig {
    /// Stories a tile can hold before it is fully saturated.
    pub max_stories_per_tile: u32,
    /// Events a tile can hold before it is fully saturated.
    pub max_events_per_tile: u32,
    /// Fraction of a cap at which the soft-cap hint fires.
    pub soft_cap_ratio: f64,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self {
            max_stories_per_tile: 50,
            max_events_per_tile: 20,
            soft_cap_ratio: 0.8,
        }
    }
}

impl SaturationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.soft_cap_ratio) {
            return Err(ConfigError::Invalid {
                field: "saturation.soft_cap_ratio",
                reason: format!("must be within [0, 1], got {}", self.soft_cap_ratio),
            });
        }
        Ok(())
    }
}

/// Counts keyed by tag with a rolled-up total per tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize + Eq + Hash",
    deserialize = "K: Deserialize<'de> + Eq + Hash"
))]
struct TileCounters<K> {
    by_key: HashMap<TileId, HashMap<K, u32>>,
    #[serde(default)]
    totals: HashMap<TileId, u32>,
}

impl<K> Default for TileCounters<K> {
    fn default() -> Self {
        Self {
            by_key: HashMap::new(),
            totals: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> TileCounters<K> {
    fn increment(&mut self, tile: TileId, key: K) {
        *self.by_key.entry(tile).or_default().entry(key).or_insert(0) += 1;
        *self.totals.entry(tile).or_insert(0) += 1;
    }

    fn decrement(&mut self, tile: TileId, key: K) {
        let Some(keys) = self.by_key.get_mut(&tile) else {
            return;
        };
        let Some(count) = keys.get_mut(&key) else {
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            keys.remove(&key);
        }
        if keys.is_empty() {
            self.by_key.remove(&tile);
        }

        if let Some(total) = self.totals.get_mut(&tile) {
            *total = total.saturating_sub(1);
            if *total == 0 {
                self.totals.remove(&tile);
            }
        }
    }

    fn total(&self, tile: TileId) -> u32 {
        self.totals.get(&tile).copied().unwrap_or(0)
    }

    fn count(&self, tile: TileId, key: K) -> u32 {
        self.by_key
            .get(&tile)
            .and_then(|keys| keys.get(&key))
            .copied()
            .unwrap_or(0)
    }

    fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.totals.keys().copied()
    }

    fn grand_total(&self) -> u64 {
        self.totals.values().map(|&n| u64::from(n)).sum()
    }

    fn clear(&mut self) {
        self.by_key.clear();
        self.totals.clear();
    }

    /// Drop empty entries and recompute every total from the breakdown.
    fn rebuild_totals(&mut self) {
        for keys in self.by_key.values_mut() {
            keys.retain(|_, count| *count > 0);
        }
        self.by_key.retain(|_, keys| !keys.is_empty());

        self.totals = self
            .by_key
            .iter()
            .map(|(&tile, keys)| {
                let total = keys.values().fold(0u32, |sum, &n| sum.saturating_add(n));
                (tile, total)
            })
            .collect();
    }
}

/// Remaining capacity as a factor in `[0.0, 1.0]`. A zero cap is always saturated.
fn remaining_capacity(current: u32, cap: u32) -> f64 {
    if cap == 0 {
        return 0.0;
    }
    (1.0 - f64::from(current) / f64::from(cap)).max(0.0)
}

fn soft_cap_reached(current: u32, cap: u32, ratio: f64) -> bool {
    f64::from(current) >= f64::from(cap) * ratio
}

/// Aggregate view of the manager for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturationSummary {
    pub tracked_tiles: usize,
    pub total_stories: u64,
    pub total_events: u64,
    pub saturated_tiles: usize,
}

/// Tracks how many stories and events occupy each tile.
///
/// The manager is a plain context object: it is handed to every propagation call
/// by `&mut` and is not synchronized internally. Hosts that propagate in parallel
/// must serialize access themselves.
///
/// A restored snapshot has its caps validated and its per-tile totals
/// recomputed from the per-type breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "SaturationSnapshot")]
pub struct SaturationManager {
    config: SaturationConfig,
    stories: TileCounters<StoryType>,
    events: TileCounters<EventCategory>,
}

#[derive(Deserialize)]
struct SaturationSnapshot {
    #[serde(default)]
    config: SaturationConfig,
    #[serde(default)]
    stories: TileCounters<StoryType>,
    #[serde(default)]
    events: TileCounters<EventCategory>,
}

impl TryFrom<SaturationSnapshot> for SaturationManager {
    type Error = ConfigError;

    fn try_from(snapshot: SaturationSnapshot) -> Result<Self, Self::Error> {
        snapshot.config.validate()?;

        let mut stories = snapshot.stories;
        let mut events = snapshot.events;
        stories.rebuild_totals();
        events.rebuild_totals();

        Ok(Self {
            config: snapshot.config,
            stories,
            events,
        })
    }
}

impl SaturationManager {
    /// Create a manager with the default caps (50 stories, 20 events per tile).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager with custom caps.
    pub fn with_config(config: SaturationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &SaturationConfig {
        &self.config
    }

    /// Record a story present on a tile.
    pub fn register_story(&mut self, tile: TileId, story_type: StoryType) {
        self.stories.increment(tile, story_type);
    }

    /// Record an event present on a tile.
    pub fn register_event(&mut self, tile: TileId, category: EventCategory) {
        self.events.increment(tile, category);
    }

    /// Remove one story registration. Does nothing if none is recorded.
    pub fn unregister_story(&mut self, tile: TileId, story_type: StoryType) {
        self.stories.decrement(tile, story_type);
    }

    /// Remove one event registration. Does nothing if none is recorded.
    pub fn unregister_event(&mut self, tile: TileId, category: EventCategory) {
        self.events.decrement(tile, category);
    }

    /// Remaining event capacity of a tile.
    ///
    /// The factor is driven by the tile's total across all categories, so any
    /// event on the tile crowds out every other.
    pub fn saturation_factor(&self, tile: TileId, _category: EventCategory) -> f64 {
        remaining_capacity(self.events.total(tile), self.config.max_events_per_tile)
    }

    /// Remaining story capacity of a tile, across all story types.
    pub fn story_saturation_factor(&self, tile: TileId, _story_type: StoryType) -> f64 {
        remaining_capacity(self.stories.total(tile), self.config.max_stories_per_tile)
    }

    /// Soft-cap hint: the tile holds at least `soft_cap_ratio` of its story cap.
    pub fn is_story_cap_reached(&self, tile: TileId) -> bool {
        soft_cap_reached(
            self.stories.total(tile),
            self.config.max_stories_per_tile,
            self.config.soft_cap_ratio,
        )
    }

    /// Soft-cap hint: the tile holds at least `soft_cap_ratio` of its event cap.
    pub fn is_event_cap_reached(&self, tile: TileId) -> bool {
        soft_cap_reached(
            self.events.total(tile),
            self.config.max_events_per_tile,
            self.config.soft_cap_ratio,
        )
    }

    /// Total stories registered on a tile.
    pub fn story_count(&self, tile: TileId) -> u32 {
        self.stories.total(tile)
    }

    /// Total events registered on a tile.
    pub fn event_count(&self, tile: TileId) -> u32 {
        self.events.total(tile)
    }

    pub fn story_count_of(&self, tile: TileId, story_type: StoryType) -> u32 {
        self.stories.count(tile, story_type)
    }

    pub fn event_count_of(&self, tile: TileId, category: EventCategory) -> u32 {
        self.events.count(tile, category)
    }

    /// Tiles holding at least one story or event.
    pub fn tracked_tiles(&self) -> BTreeSet<TileId> {
        self.stories.tiles().chain(self.events.tiles()).collect()
    }

    /// Tiles at or beyond a hard cap for stories or events.
    pub fn saturated_tiles(&self) -> BTreeSet<TileId> {
        self.tracked_tiles()
            .into_iter()
            .filter(|&tile| {
                self.stories.total(tile) >= self.config.max_stories_per_tile
                    || self.events.total(tile) >= self.config.max_events_per_tile
            })
            .collect()
    }

    pub fn summary(&self) -> SaturationSummary {
        SaturationSummary {
            tracked_tiles: self.tracked_tiles().len(),
            total_stories: self.stories.grand_total(),
            total_events: self.events.grand_total(),
            saturated_tiles: self.saturated_tiles().len(),
        }
    }

    /// Clear all counts. Caps are kept.
    pub fn reset(&mut self) {
        self.stories.clear();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_count() {
        let mut manager = SaturationManager::new();
        let tile = TileId(3);

        manager.register_story(tile, StoryType::Legend);
        manager.register_story(tile, StoryType::Legend);
        manager.register_story(tile, StoryType::Rumor);
        manager.register_event(tile, EventCategory::Regional);

        assert_eq!(manager.story_count(tile), 3);
        assert_eq!(manager.story_count_of(tile, StoryType::Legend), 2);
        assert_eq!(manager.story_count_of(tile, StoryType::Rumor), 1);
        assert_eq!(manager.event_count(tile), 1);
        assert_eq!(manager.event_count(TileId(4)), 0);
    }

    #[test]
    fn test_unregister_removes_empty_keys() {
        let mut manager = SaturationManager::new();
        let tile = TileId(1);

        manager.register_event(tile, EventCategory::Personal);
        manager.register_event(tile, EventCategory::World);
        manager.unregister_event(tile, EventCategory::Personal);

        assert_eq!(manager.event_count(tile), 1);
        assert_eq!(manager.event_count_of(tile, EventCategory::Personal), 0);
        assert!(!manager.events.by_key[&tile].contains_key(&EventCategory::Personal));

        manager.unregister_event(tile, EventCategory::World);
        assert!(manager.tracked_tiles().is_empty());
        assert!(manager.events.by_key.is_empty());
        assert!(manager.events.totals.is_empty());
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let mut manager = SaturationManager::new();

        manager.unregister_story(TileId(9), StoryType::Quest);
        manager.register_story(TileId(9), StoryType::Legend);
        manager.unregister_story(TileId(9), StoryType::Quest);

        assert_eq!(manager.story_count(TileId(9)), 1);
    }

    #[test]
    fn test_totals_match_breakdown() {
        let mut manager = SaturationManager::new();
        let tile = TileId(2);

        for (i, category) in EventCategory::ALL.iter().enumerate() {
            for _ in 0..=i {
                manager.register_event(tile, *category);
            }
        }
        manager.unregister_event(tile, EventCategory::Triggered);

        let breakdown: u32 = EventCategory::ALL
            .iter()
            .map(|c| manager.event_count_of(tile, *c))
            .sum();
        assert_eq!(manager.event_count(tile), breakdown);
        assert_eq!(breakdown, 14);
    }

    #[test]
    fn test_saturation_factor() {
        let mut manager = SaturationManager::new();
        let tile = TileId(0);

        assert_eq!(manager.saturation_factor(tile, EventCategory::Regional), 1.0);

        for _ in 0..5 {
            manager.register_event(tile, EventCategory::Regional);
        }
        // 5 of 20 events
        assert!((manager.saturation_factor(tile, EventCategory::World) - 0.75).abs() < 1e-9);

        for _ in 0..25 {
            manager.register_event(tile, EventCategory::Random);
        }
        assert_eq!(manager.saturation_factor(tile, EventCategory::Regional), 0.0);
    }

    #[test]
    fn test_story_saturation_factor() {
        let mut manager = SaturationManager::new();
        let tile = TileId(0);

        for _ in 0..10 {
            manager.register_story(tile, StoryType::Prophecy);
        }
        // 10 of 50 stories
        assert!((manager.story_saturation_factor(tile, StoryType::Legend) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_zero_cap_is_always_saturated() {
        let manager = SaturationManager::with_config(SaturationConfig {
            max_stories_per_tile: 0,
            max_events_per_tile: 0,
            ..SaturationConfig::default()
        })
        .unwrap();

        assert_eq!(manager.saturation_factor(TileId(0), EventCategory::World), 0.0);
        assert_eq!(manager.story_saturation_factor(TileId(0), StoryType::Rumor), 0.0);
    }

    #[test]
    fn test_soft_caps() {
        let mut manager = SaturationManager::new();
        let tile = TileId(5);

        for _ in 0..15 {
            manager.register_event(tile, EventCategory::Regional);
        }
        assert!(!manager.is_event_cap_reached(tile));

        // 16 = 80% of 20
        manager.register_event(tile, EventCategory::Regional);
        assert!(manager.is_event_cap_reached(tile));

        for _ in 0..39 {
            manager.register_story(tile, StoryType::Mystery);
        }
        assert!(!manager.is_story_cap_reached(tile));
        manager.register_story(tile, StoryType::Mystery);
        assert!(manager.is_story_cap_reached(tile));
    }

    #[test]
    fn test_saturated_tiles_and_summary() {
        let mut manager = SaturationManager::new();

        for _ in 0..20 {
            manager.register_event(TileId(1), EventCategory::World);
        }
        manager.register_story(TileId(2), StoryType::Comedy);

        assert_eq!(manager.saturated_tiles(), BTreeSet::from([TileId(1)]));

        let summary = manager.summary();
        assert_eq!(summary.tracked_tiles, 2);
        assert_eq!(summary.total_events, 20);
        assert_eq!(summary.total_stories, 1);
        assert_eq!(summary.saturated_tiles, 1);
    }

    #[test]
    fn test_reset() {
        let mut manager = SaturationManager::new();

        manager.register_story(TileId(1), StoryType::Tragedy);
        manager.register_event(TileId(2), EventCategory::Triggered);
        manager.reset();

        assert!(manager.tracked_tiles().is_empty());
        assert_eq!(manager.story_count(TileId(1)), 0);
        assert_eq!(manager.config().max_events_per_tile, 20);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut manager = SaturationManager::new();
        manager.register_story(TileId(7), StoryType::Legend);
        manager.register_event(TileId(7), EventCategory::Regional);

        let json = serde_json::to_string(&manager).unwrap();
        let restored: SaturationManager = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.story_count_of(TileId(7), StoryType::Legend), 1);
        assert_eq!(restored.event_count_of(TileId(7), EventCategory::Regional), 1);
        assert_eq!(restored.summary(), manager.summary());
    }

    #[test]
    fn test_with_config_rejects_bad_ratio() {
        for ratio in [f64::NAN, 1.5, -0.1] {
            let result = SaturationManager::with_config(SaturationConfig {
                soft_cap_ratio: ratio,
                ..SaturationConfig::default()
            });
            assert!(matches!(
                result,
                Err(ConfigError::Invalid { field: "saturation.soft_cap_ratio", .. })
            ));
        }
    }

    #[test]
    fn test_snapshot_totals_follow_breakdown() {
        let json = serde_json::json!({
            "config": SaturationConfig::default(),
            "stories": {
                "by_key": { "3": { "LEGEND": 2, "RUMOR": 0 } },
                "totals": { "3": 40 }
            },
            "events": {
                "by_key": {},
                "totals": { "1": 5 }
            }
        });

        let restored: SaturationManager = serde_json::from_value(json).unwrap();

        assert_eq!(restored.event_count(TileId(1)), 0);
        assert_eq!(restored.story_count(TileId(3)), 2);
        assert_eq!(restored.story_count_of(TileId(3), StoryType::Legend), 2);
        assert!(!restored.stories.by_key[&TileId(3)].contains_key(&StoryType::Rumor));
        assert_eq!(restored.tracked_tiles(), BTreeSet::from([TileId(3)]));
    }

    #[test]
    fn test_snapshot_rejects_bad_ratio() {
        let mut json = serde_json::to_value(SaturationManager::new()).unwrap();
        json["config"]["soft_cap_ratio"] = serde_json::json!(3.0);

        assert!(serde_json::from_value::<SaturationManager>(json).is_err());
    }
}
