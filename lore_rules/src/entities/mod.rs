//! Narrative entities: discrete events and longer-lived stories.

mod event;
mod story;

pub use event::*;
pub use story::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Unique identifier for events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random id for generators that do not supply their own.
    pub fn generate() -> Self {
        Self(format!("evt-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for stories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub String);

impl StoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random id for generators that do not supply their own.
    pub fn generate() -> Self {
        Self(format!("story-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Highest priority an event or story may carry.
pub const MAX_PRIORITY: u8 = 10;

pub(crate) fn validate_identity(id: &str, title: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

pub(crate) fn validate_spread_parameters(
    base_probability: f64,
    priority: u8,
) -> Result<(), ValidationError> {
    // NaN fails the range check as well
    if !(0.0..=1.0).contains(&base_probability) {
        return Err(ValidationError::ProbabilityOutOfRange(base_probability));
    }
    if priority > MAX_PRIORITY {
        return Err(ValidationError::PriorityOutOfRange(priority));
    }
    Ok(())
}
