use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use common::{panic_message, Lane, Record, Workload};
use tokio::{
    task,
    time::{sleep, Duration},
};
use tracing::{debug, info, warn};

use crate::{
    coordinator::{Coordinator, MapTask, ReduceTask, Segment, TaskKind, TaskOutput},
    error::{MapStage, TaskError},
};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct Worker {
    id: usize,
    coordinator: Arc<Coordinator>,
    workload: Workload,
}

impl Worker {
    pub fn new(id: usize, coordinator: Arc<Coordinator>, workload: Workload) -> Self {
        Self {
            id,
            coordinator,
            workload,
        }
    }

    pub async fn run(self) {
        loop {
            let reply = self.coordinator.poll_task();
            match reply.task {
                Some(task) => {
                    let id = task.id.clone();
                    let workload = self.workload;
                    debug!(worker = self.id, "running {}", task);
                    let result = task::spawn_blocking(move || match &task.inner {
                        TaskKind::Map(map) => do_map(map, workload),
                        TaskKind::Reduce(reduce) => do_reduce(reduce, workload),
                    })
                    .await;
                    match result {
                        Ok(Ok(output)) => self.coordinator.complete_task(&id, output).await,
                        Ok(Err(err)) => self.coordinator.fail_task(&id, err).await,
                        Err(err) => {
                            self.coordinator
                                .fail_task(&id, TaskError::Lost(err.to_string()))
                                .await
                        }
                    }
                }
                None if reply.shutdown => {
                    debug!(worker = self.id, "worker exit");
                    return;
                }
                None => sleep(POLL_INTERVAL).await,
            }
        }
    }
}

fn map_guard<T>(split: usize, stage: MapStage, step: impl FnOnce() -> T) -> Result<T, TaskError> {
    panic::catch_unwind(AssertUnwindSafe(step)).map_err(|payload| TaskError::Map {
        split,
        stage,
        reason: panic_message(payload),
    })
}

/// Validates a split's pairs, routes them to lanes and combines every lane
/// buffer before it leaves the task.
pub fn do_map(task: &MapTask, workload: Workload) -> Result<TaskOutput, TaskError> {
    let lanes = task.n_lanes;
    let mut malformed = 0u64;

    let buffers = map_guard(task.index, MapStage::Partitioning, || {
        let mut buffers: Vec<Vec<Record>> = lanes.lanes().map(|_| Vec::new()).collect();
        for pair in task.split.pairs.iter().cloned() {
            match Record::try_from(pair) {
                Ok(record) => {
                    let lane = (workload.partition)(record.key(), lanes);
                    match buffers.get_mut(lane) {
                        Some(buffer) => buffer.push(record),
                        None => return Err(format!("partitioner chose lane {lane} of {}", lanes.get())),
                    }
                }
                Err(err) => {
                    debug!(split = %task.split.name, "{err}");
                    malformed += 1;
                }
            }
        }
        Ok(buffers)
    })?
    .map_err(|reason| TaskError::Map {
        split: task.index,
        stage: MapStage::Partitioning,
        reason,
    })?;

    if malformed > 0 {
        warn!(split = %task.split.name, malformed, "rejected malformed records");
    }

    let segments = map_guard(task.index, MapStage::Combining, || {
        buffers
            .into_iter()
            .map(|buffer| (!buffer.is_empty()).then(|| Segment::new((workload.combine)(buffer))))
            .collect::<Vec<_>>()
    })?;

    info!(
        split = %task.split.name,
        records = task.split.pairs.len(),
        "map task {} done",
        task.index
    );
    Ok(TaskOutput::Map {
        index: task.index,
        segments,
        malformed,
    })
}

/// Feeds a lane its segments and runs it to completion.
pub fn do_reduce(task: &ReduceTask, workload: Workload) -> Result<TaskOutput, TaskError> {
    let mut lane = Lane::new(task.lane, workload);
    for segment in &task.segments {
        lane.collect(segment.iter().cloned())?;
    }
    let output = lane.run()?;
    info!(
        lane = output.lane,
        collected = output.collected,
        groups = output.groups.len(),
        "reduce task done"
    );
    Ok(TaskOutput::Reduce(output))
}
