use crate::{
    combine,
    partition::{self, LaneCount},
    reduce::{self, ReduceFn},
    record::{GroupKey, Record},
    sort::{self, GroupEq, SortCmp},
};

pub type PartitionFn = fn(&GroupKey, LaneCount) -> usize;
pub type CombineFn = fn(Vec<Record>) -> Vec<Record>;

/// The pluggable pieces of a run, wired together as plain functions.
#[derive(Clone, Copy)]
pub struct Workload {
    pub partition: PartitionFn,
    pub combine: CombineFn,
    pub sort_cmp: SortCmp,
    pub group_eq: GroupEq,
    pub reduce: ReduceFn,
}

impl Workload {
    /// Same workload with the local combiner replaced by a pass-through.
    pub fn without_combiner(self) -> Self {
        Self {
            combine: combine::pass_through,
            ..self
        }
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            partition: partition::assign_lane,
            combine: combine::combine,
            sort_cmp: sort::sort_cmp,
            group_eq: sort::group_eq,
            reduce: reduce::reduce,
        }
    }
}

impl std::fmt::Debug for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workload").finish_non_exhaustive()
    }
}
