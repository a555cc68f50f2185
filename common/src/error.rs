use thiserror::Error;

use crate::lane::LaneState;

/// Rejected before any lane starts. Never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("lane count must be a positive integer, got {0}")]
    InvalidLaneCount(i64),

    #[error("no input location given")]
    MissingInput,

    #[error("no output location given")]
    MissingOutput,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("key is shorter than two letters")]
    KeyTooShort,

    #[error("key contains characters outside a-z")]
    KeyNotLowercaseAscii,

    #[error("key letters are not in ascending order")]
    KeyNotSorted,

    #[error("key is not the sorted letters of the word")]
    KeyMismatch,
}

/// A pair whose key does not belong to its word. Counted and dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed record ({key:?}, {word:?}): {reason}")]
pub struct MalformedRecord {
    pub key: String,
    pub word: String,
    pub reason: MalformedReason,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaneError {
    #[error("lane {lane} cannot move from {from} to {to}")]
    InvalidTransition {
        lane: usize,
        from: LaneState,
        to: LaneState,
    },

    #[error("lane {lane} failed while {stage}: {reason}")]
    Failed {
        lane: usize,
        stage: LaneState,
        reason: String,
    },
}

impl LaneError {
    pub fn lane(&self) -> usize {
        match self {
            Self::InvalidTransition { lane, .. } | Self::Failed { lane, .. } => *lane,
        }
    }

    /// The state the lane was in when the error surfaced.
    pub fn stage(&self) -> LaneState {
        match self {
            Self::InvalidTransition { from, .. } => *from,
            Self::Failed { stage, .. } => *stage,
        }
    }
}
