//! Validation errors raised while building or mutating narrative entities.

use thiserror::Error;

use crate::narrative::{EventStatus, StoryStatus};

/// A violated construction or lifecycle invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("id must not be empty")]
    EmptyId,

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("base probability must be within [0.0, 1.0], got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("priority must be within [0, 10], got {0}")]
    PriorityOutOfRange(u8),

    #[error("event category is required")]
    MissingCategory,

    #[error("story type is required")]
    MissingStoryType,

    #[error("event cannot move from {from} to {to}")]
    InvalidEventTransition { from: EventStatus, to: EventStatus },

    #[error("story cannot move from {from} to {to}")]
    InvalidStoryTransition { from: StoryStatus, to: StoryStatus },
}
