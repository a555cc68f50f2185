use std::path::PathBuf;

use crate::{error::ConfigError, partition::LaneCount};

/// Everything a run may be configured with. Built once and validated up
/// front, so no lane ever starts on a bad configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub lanes: LaneCount,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

impl JobConfig {
    pub fn new(
        lanes: i64,
        inputs: Vec<PathBuf>,
        output: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let lanes = LaneCount::new(lanes)?;
        if inputs.is_empty() || inputs.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::MissingInput);
        }
        let output = output
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingOutput)?;
        Ok(Self {
            lanes,
            inputs,
            output,
        })
    }
}
