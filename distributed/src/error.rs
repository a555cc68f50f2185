use std::{fmt, time::Duration};

use common::{ConfigError, LaneError};
use thiserror::Error;

/// Stages a map task moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStage {
    Partitioning,
    Combining,
}

impl fmt::Display for MapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partitioning => f.write_str("partitioning"),
            Self::Combining => f.write_str("combining"),
        }
    }
}

/// Why one attempt of one task did not complete.
#[derive(Debug, Error, Clone)]
pub enum TaskError {
    #[error("split {split} failed while {stage}: {reason}")]
    Map {
        split: usize,
        stage: MapStage,
        reason: String,
    },

    #[error(transparent)]
    Lane(#[from] LaneError),

    #[error("no completion within {0:?}")]
    TimedOut(Duration),

    #[error("worker lost the task: {0}")]
    Lost(String),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{task} failed after {attempts} attempts: {source}")]
    Exhausted {
        task: String,
        attempts: u32,
        #[source]
        source: TaskError,
    },

    #[error("run aborted, partial output discarded")]
    Aborted,

    #[error("lane {0} produced no output")]
    MissingLane(usize),
}
