use std::{hash::Hasher, num::NonZeroUsize};

use fnv::FnvHasher;

use crate::{error::ConfigError, record::GroupKey};

/// Number of lanes in a run. Zero and negative counts cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneCount(NonZeroUsize);

impl LaneCount {
    pub const ONE: Self = Self(NonZeroUsize::MIN);

    pub fn new(count: i64) -> Result<Self, ConfigError> {
        usize::try_from(count)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or(ConfigError::InvalidLaneCount(count))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// All lane indices, in order.
    pub fn lanes(self) -> std::ops::Range<usize> {
        0..self.get()
    }
}

impl TryFrom<usize> for LaneCount {
    type Error = ConfigError;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        NonZeroUsize::new(count)
            .map(Self)
            .ok_or(ConfigError::InvalidLaneCount(0))
    }
}

/// Hashes a group key for partitioning.
///
/// 64-bit FNV-1a over the raw key bytes (offset basis `0xcbf29ce484222325`,
/// prime `0x100000001b3`), masked to 31 bits. No per-process seed is involved,
/// so the value is the same in every run and on every machine.
pub fn key_hash(key: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    hasher.finish() & 0x7fff_ffff
}

/// Picks the lane owning `key`: `key_hash(key) % lanes`.
pub fn assign_lane(key: &GroupKey, lanes: LaneCount) -> usize {
    // key_hash fits in 31 bits, so the remainder always fits in usize
    (key_hash(key.as_str()) % lanes.get() as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> GroupKey {
        GroupKey::parse(s).unwrap()
    }

    #[test]
    fn lane_count_rejects_non_positive() {
        assert_eq!(LaneCount::new(0), Err(ConfigError::InvalidLaneCount(0)));
        assert_eq!(LaneCount::new(-3), Err(ConfigError::InvalidLaneCount(-3)));
        assert_eq!(LaneCount::new(8).unwrap().get(), 8);
        assert!(LaneCount::try_from(0usize).is_err());
        assert_eq!(LaneCount::ONE.get(), 1);
    }

    #[test]
    fn hash_is_fnv1a() {
        // published FNV-1a 64 test vector for "a" is 0xaf63dc4c8601ec8c
        assert_eq!(key_hash("a"), 0xaf63dc4c8601ec8c & 0x7fff_ffff);
        assert_eq!(key_hash(""), 0xcbf29ce484222325 & 0x7fff_ffff);
    }

    #[test]
    fn single_lane_takes_everything() {
        for k in ["acer", "enot", "act", "zz"] {
            assert_eq!(assign_lane(&key(k), LaneCount::ONE), 0);
        }
    }

    #[test]
    fn assignment_is_stable_and_in_range() {
        let lanes = LaneCount::new(8).unwrap();
        for k in ["acer", "enot", "act", "aabb", "eilnst"] {
            let first = assign_lane(&key(k), lanes);
            assert!(first < 8);
            assert_eq!(first, assign_lane(&key(k), lanes));
        }
    }
}
