//! Narrative tags: event categories, story types, and their lifecycle states.

use serde::{Deserialize, Serialize};

/// Scope of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    /// Affects the whole world (cataclysms, eclipses).
    World,
    /// Bound to a region of tiles.
    Regional,
    /// Concerns a single character or household.
    Personal,
    /// Spontaneous background occurrence.
    Random,
    /// Fired by an external trigger condition.
    Triggered,
}

impl EventCategory {
    pub const ALL: [EventCategory; 5] = [
        EventCategory::World,
        EventCategory::Regional,
        EventCategory::Personal,
        EventCategory::Random,
        EventCategory::Triggered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::World => "WORLD",
            EventCategory::Regional => "REGIONAL",
            EventCategory::Personal => "PERSONAL",
            EventCategory::Random => "RANDOM",
            EventCategory::Triggered => "TRIGGERED",
        }
    }
}

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Pending,
    Active,
    Propagating,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub const ALL: [EventStatus; 5] = [
        EventStatus::Pending,
        EventStatus::Active,
        EventStatus::Propagating,
        EventStatus::Completed,
        EventStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Active => "ACTIVE",
            EventStatus::Propagating => "PROPAGATING",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }

    /// Completed and cancelled events never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Cancelled)
    }

    /// Whether the event is currently influencing the world.
    pub fn is_live(&self) -> bool {
        matches!(self, EventStatus::Active | EventStatus::Propagating)
    }

    /// Check if moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        use EventStatus::*;

        if *self == next {
            return true;
        }
        match self {
            Pending => matches!(next, Active | Propagating | Cancelled),
            Active => matches!(next, Propagating | Completed | Cancelled),
            Propagating => matches!(next, Active | Completed | Cancelled),
            Completed | Cancelled => false,
        }
    }
}

/// Kind of a long-lived narrative thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryType {
    Legend,
    Rumor,
    Quest,
    Prophecy,
    Tragedy,
    Comedy,
    Mystery,
}

impl StoryType {
    pub const ALL: [StoryType; 7] = [
        StoryType::Legend,
        StoryType::Rumor,
        StoryType::Quest,
        StoryType::Prophecy,
        StoryType::Tragedy,
        StoryType::Comedy,
        StoryType::Mystery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryType::Legend => "LEGEND",
            StoryType::Rumor => "RUMOR",
            StoryType::Quest => "QUEST",
            StoryType::Prophecy => "PROPHECY",
            StoryType::Tragedy => "TRAGEDY",
            StoryType::Comedy => "COMEDY",
            StoryType::Mystery => "MYSTERY",
        }
    }
}

/// Lifecycle state of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryStatus {
    #[default]
    Active,
    /// Still known but nobody is retelling it.
    Dormant,
    Resolved,
    Archived,
    /// Shown to be false.
    Discredited,
}

impl StoryStatus {
    pub const ALL: [StoryStatus; 5] = [
        StoryStatus::Active,
        StoryStatus::Dormant,
        StoryStatus::Resolved,
        StoryStatus::Archived,
        StoryStatus::Discredited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Active => "ACTIVE",
            StoryStatus::Dormant => "DORMANT",
            StoryStatus::Resolved => "RESOLVED",
            StoryStatus::Archived => "ARCHIVED",
            StoryStatus::Discredited => "DISCREDITED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StoryStatus::Archived)
    }

    /// Check if moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(&self, next: StoryStatus) -> bool {
        use StoryStatus::*;

        if *self == next {
            return true;
        }
        match self {
            Active => matches!(next, Dormant | Resolved | Discredited),
            Dormant => matches!(next, Active | Resolved | Discredited),
            Resolved | Discredited => matches!(next, Archived),
            Archived => false,
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(EventCategory, EventStatus, StoryType, StoryStatus);
