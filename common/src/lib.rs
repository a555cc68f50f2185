//! Core of the anagram grouping job: records, the partitioner, the local
//! combiner, the secondary sort, the group reducer and the lane that strings
//! them together.

use std::{any::Any, ops::Deref};

pub mod combine;
pub mod config;
pub mod error;
pub mod lane;
pub mod partition;
pub mod record;
pub mod reduce;
pub mod sort;
pub mod workload;

pub use config::JobConfig;
pub use error::{ConfigError, LaneError, MalformedReason, MalformedRecord};
pub use lane::{Lane, LaneOutput, LaneState};
pub use partition::{assign_lane, LaneCount};
pub use record::{GroupKey, Record};
pub use reduce::AnagramGroup;
pub use workload::Workload;

/// Turns one input file into normalized `(groupKey, word)` pairs.
pub type MapFn = fn(filename: &str, contents: &str) -> Vec<(String, String)>;

/// A runnable application: its map function plus the workload that consumes
/// the map output.
pub struct App {
    pub app_name: String,
    map: MapFn,
    workload: Workload,
}

impl App {
    pub fn new(app_name: &str, map: MapFn, workload: Workload) -> Self {
        Self {
            app_name: app_name.to_string(),
            map,
            workload,
        }
    }

    pub fn map(&self, filename: &str, contents: &str) -> Vec<(String, String)> {
        (self.map)(filename, contents)
    }

    pub fn workload(&self) -> Workload {
        self.workload
    }
}

impl Deref for App {
    type Target = Workload;

    fn deref(&self) -> &Self::Target {
        &self.workload
    }
}

/// Best-effort text of a caught panic.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
