use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use tracing::debug;

use crate::{
    error::LaneError, panic_message, reduce::AnagramGroup, record::Record, sort::KeyGroup,
    workload::Workload,
};

/// Where a lane is in its life. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LaneState {
    Collecting,
    Combining,
    Sorting,
    Reducing,
    Done,
}

impl LaneState {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Collecting => Some(Self::Combining),
            Self::Combining => Some(Self::Sorting),
            Self::Sorting => Some(Self::Reducing),
            Self::Reducing => Some(Self::Done),
            Self::Done => None,
        }
    }
}

impl fmt::Display for LaneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collecting => "collecting",
            Self::Combining => "combining",
            Self::Sorting => "sorting",
            Self::Reducing => "reducing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a lane hands back once it reaches [`LaneState::Done`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneOutput {
    pub lane: usize,
    /// Records received while collecting.
    pub collected: usize,
    /// Records left after the combiner.
    pub combined: usize,
    /// Groups in ascending key order.
    pub groups: Vec<AnagramGroup>,
}

/// One worker's slice of the key space and the records it owns.
///
/// A lane that failed is poisoned: every further step returns the original
/// failure. Recovery means building a fresh lane from the same input.
#[derive(Debug)]
pub struct Lane {
    index: usize,
    state: LaneState,
    workload: Workload,
    buffer: Vec<Record>,
    groups: Vec<KeyGroup>,
    collected: usize,
    combined: usize,
    failure: Option<LaneError>,
}

impl Lane {
    pub fn new(index: usize, workload: Workload) -> Self {
        Self {
            index,
            state: LaneState::Collecting,
            workload,
            buffer: Vec::new(),
            groups: Vec::new(),
            collected: 0,
            combined: 0,
            failure: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> LaneState {
        self.state
    }

    pub fn collect<I>(&mut self, records: I) -> Result<(), LaneError>
    where
        I: IntoIterator<Item = Record>,
    {
        self.check(LaneState::Collecting)?;
        let before = self.buffer.len();
        self.buffer.extend(records);
        self.collected += self.buffer.len() - before;
        Ok(())
    }

    pub fn combine(&mut self) -> Result<(), LaneError> {
        self.advance(LaneState::Combining)?;
        let combine = self.workload.combine;
        let buffer = std::mem::take(&mut self.buffer);
        self.buffer = self.guarded(move || combine(buffer))?;
        self.combined = self.buffer.len();
        debug!(
            lane = self.index,
            collected = self.collected,
            combined = self.combined,
            "lane combined"
        );
        Ok(())
    }

    pub fn sort(&mut self) -> Result<(), LaneError> {
        self.advance(LaneState::Sorting)?;
        let Workload {
            sort_cmp, group_eq, ..
        } = self.workload;
        let mut buffer = std::mem::take(&mut self.buffer);
        self.groups = self.guarded(move || {
            crate::sort::sort_records(&mut buffer, sort_cmp);
            crate::sort::group_sorted(buffer, group_eq)
        })?;
        debug!(lane = self.index, keys = self.groups.len(), "lane sorted");
        Ok(())
    }

    pub fn reduce(&mut self) -> Result<Vec<AnagramGroup>, LaneError> {
        self.advance(LaneState::Reducing)?;
        let reduce = self.workload.reduce;
        let groups = std::mem::take(&mut self.groups);
        let output = self.guarded(move || {
            groups
                .into_iter()
                .filter_map(|group| reduce(&group.key, group.words))
                .collect::<Vec<_>>()
        })?;
        self.advance(LaneState::Done)?;
        debug!(lane = self.index, groups = output.len(), "lane reduced");
        Ok(output)
    }

    /// Drives the lane from wherever collection left it to [`LaneState::Done`].
    pub fn run(mut self) -> Result<LaneOutput, LaneError> {
        self.combine()?;
        self.sort()?;
        let groups = self.reduce()?;
        Ok(LaneOutput {
            lane: self.index,
            collected: self.collected,
            combined: self.combined,
            groups,
        })
    }

    fn check(&self, expected: LaneState) -> Result<(), LaneError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if self.state != expected {
            return Err(LaneError::InvalidTransition {
                lane: self.index,
                from: self.state,
                to: expected,
            });
        }
        Ok(())
    }

    fn advance(&mut self, to: LaneState) -> Result<(), LaneError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if self.state.next() != Some(to) {
            return Err(LaneError::InvalidTransition {
                lane: self.index,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    fn guarded<T>(&mut self, step: impl FnOnce() -> T) -> Result<T, LaneError> {
        panic::catch_unwind(AssertUnwindSafe(step)).map_err(|payload| {
            let err = LaneError::Failed {
                lane: self.index,
                stage: self.state,
                reason: panic_message(payload),
            };
            self.failure = Some(err.clone());
            err
        })
    }
}
