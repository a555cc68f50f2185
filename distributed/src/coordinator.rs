use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use common::{LaneCount, LaneOutput, Record};
use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use itertools::Itertools;
use tokio::{
    sync::{oneshot, Mutex},
    task::JoinHandle,
    time,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{RunError, TaskError};

pub type TaskId = String;
type TaskMap = DashMap<TaskId, Task>;

/// Records one map task produced for one lane, already combined.
pub type Segment = Arc<Vec<Record>>;

/// One independently mapped chunk of input: normalized pairs, unvalidated.
#[derive(Debug, Clone, Default)]
pub struct Split {
    pub name: String,
    pub pairs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct MapTask {
    pub index: usize,
    pub split: Arc<Split>,
    pub n_lanes: LaneCount,
}

/// Everything one lane needs, captured at the barrier so a retry starts from
/// exactly the same input.
#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub lane: usize,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub enum TaskKind {
    Map(MapTask),
    Reduce(ReduceTask),
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub attempt: u32,
    pub inner: TaskKind,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            TaskKind::Map(m) => write!(f, "map task {} ({})", m.index, m.split.name),
            TaskKind::Reduce(r) => write!(f, "reduce task for lane {}", r.lane),
        }
    }
}

pub enum TaskOutput {
    Map {
        index: usize,
        /// Indexed by lane. Empty lanes are `None`.
        segments: Vec<Option<Segment>>,
        malformed: u64,
    },
    Reduce(LaneOutput),
}

#[derive(Debug)]
pub struct PollReply {
    pub task: Option<Task>,
    pub shutdown: bool,
}

impl fmt::Display for PollReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.task {
            Some(task) => write!(f, "PollReply:{{ task: {}, shutdown: {} }}", task, self.shutdown),
            None => write!(f, "PollReply:{{ task: none, shutdown: {} }}", self.shutdown),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Concurrent workers. Independent of the lane count.
    pub workers: usize,
    /// A running attempt older than this is handed out again.
    pub task_timeout: Duration,
    /// Attempts per task before the whole run fails.
    pub max_attempts: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            task_timeout: Duration::from_secs(10),
            max_attempts: 3,
        }
    }
}

/// Hands out tasks, tracks which are running and owns the exchange between
/// the map and the reduce phase.
///
/// Map tasks are handed out first. Once every map task has completed the
/// exchange is frozen and one reduce task per lane is queued, so no lane
/// starts reducing before all of its input has arrived.
#[derive(Debug)]
pub struct Coordinator {
    options: RunOptions,
    n_lanes: LaneCount,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    reduce_stage: AtomicBool,
    finished: AtomicBool,
    /// Tasks of the current stage that have not completed yet.
    outstanding: AtomicUsize,
    pending_tasks: SegQueue<Task>,
    running_tasks: TaskMap,
    exchange: DashMap<usize, Vec<(usize, Segment)>>,
    lane_outputs: DashMap<usize, LaneOutput>,
    retry_handlers: DashMap<TaskId, JoinHandle<()>>,
    malformed: AtomicU64,
    failure: std::sync::Mutex<Option<RunError>>,
}

impl Coordinator {
    fn init_map(&self, splits: Vec<Split>) {
        let map_tasks = splits
            .into_iter()
            .enumerate()
            .map(|(index, split)| MapTask {
                index,
                split: Arc::new(split),
                n_lanes: self.n_lanes,
            })
            .collect_vec();

        self.outstanding.store(map_tasks.len(), Ordering::SeqCst);
        for task in map_tasks {
            self.pending_tasks.push(Task {
                id: Uuid::new_v4().to_string(),
                attempt: 0,
                inner: TaskKind::Map(task),
            });
        }
    }

    fn init_reduce(&self) {
        let reduce_tasks = self
            .n_lanes
            .lanes()
            .map(|lane| {
                let segments = self
                    .exchange
                    .remove(&lane)
                    .map(|(_, mut segments)| {
                        segments.sort_by_key(|(split, _)| *split);
                        segments.into_iter().map(|(_, segment)| segment).collect()
                    })
                    .unwrap_or_default();
                ReduceTask { lane, segments }
            })
            .collect_vec();

        self.outstanding.store(reduce_tasks.len(), Ordering::SeqCst);
        for task in reduce_tasks {
            self.pending_tasks.push(Task {
                id: Uuid::new_v4().to_string(),
                attempt: 0,
                inner: TaskKind::Reduce(task),
            });
        }
    }

    pub fn new(
        splits: Vec<Split>,
        n_lanes: LaneCount,
        options: RunOptions,
        shutdown: oneshot::Sender<()>,
    ) -> Self {
        let this = Self {
            options,
            n_lanes,
            shutdown: Mutex::new(Some(shutdown)),
            reduce_stage: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            pending_tasks: SegQueue::new(),
            running_tasks: TaskMap::new(),
            exchange: DashMap::new(),
            lane_outputs: DashMap::new(),
            retry_handlers: DashMap::new(),
            malformed: AtomicU64::new(0),
            failure: std::sync::Mutex::new(None),
        };
        if splits.is_empty() {
            info!("no input splits, going straight to reduce");
            this.reduce_stage.store(true, Ordering::SeqCst);
            this.init_reduce();
        } else {
            this.init_map(splits);
        }
        this
    }

    pub fn n_lanes(&self) -> LaneCount {
        self.n_lanes
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

impl Coordinator {
    fn spawn_retry(self: &Arc<Self>, task: &Task) {
        let id = task.id.clone();
        let timeout = self.options.task_timeout;
        let this = Arc::clone(self);

        let handler = tokio::spawn(async move {
            time::sleep(timeout).await;
            this.retry_handlers.remove(&id);
            if let Some((_, task)) = this.running_tasks.remove(&id) {
                warn!("task timeout: {}", task);
                this.retry(task, TaskError::TimedOut(timeout)).await;
            }
        });

        self.retry_handlers.insert(task.id.clone(), handler);
    }

    /// Puts a failed attempt back in the queue under a fresh id, or fails the
    /// run once the task is out of attempts.
    async fn retry(&self, task: Task, err: TaskError) {
        if self.is_finished() {
            return;
        }
        let attempts = task.attempt + 1;
        if attempts >= self.options.max_attempts {
            error!("{} failed for good: {}", task, err);
            self.finish(Some(RunError::Exhausted {
                task: task.to_string(),
                attempts,
                source: err,
            }))
            .await;
            return;
        }

        warn!("{} failed (attempt {}): {}, retrying", task, attempts, err);
        self.pending_tasks.push(Task {
            id: Uuid::new_v4().to_string(),
            attempt: attempts,
            inner: task.inner,
        });
    }

    fn reduce_stage(&self) -> bool {
        self.reduce_stage.load(Ordering::Acquire)
    }

    fn cancel_retry(&self, id: &str) {
        if let Some((_, handler)) = self.retry_handlers.remove(id) {
            handler.abort()
        }
    }

    async fn finish(&self, failure: Option<RunError>) {
        if let Some(failure) = failure {
            if let Ok(mut slot) = self.failure.lock() {
                slot.get_or_insert(failure);
            }
        }
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }

        let ids = self.retry_handlers.iter().map(|e| e.key().clone()).collect_vec();
        for id in ids {
            self.cancel_retry(&id);
        }

        let mut inner = self.shutdown.lock().await;
        if let Some(sender) = inner.take() {
            let _ = sender.send(());
        }
    }
}

impl Coordinator {
    pub fn poll_task(self: &Arc<Self>) -> PollReply {
        if self.is_finished() {
            return PollReply {
                task: None,
                shutdown: true,
            };
        }

        let reply = match self.pending_tasks.pop() {
            Some(task) => {
                debug_assert!(self.reduce_stage() ^ matches!(task.inner, TaskKind::Map(_)));

                self.running_tasks.insert(task.id.clone(), task.clone());
                self.spawn_retry(&task);
                PollReply {
                    task: Some(task),
                    shutdown: false,
                }
            }
            None => PollReply {
                task: None,
                shutdown: false,
            },
        };

        if reply.task.is_some() {
            debug!("poll task reply: {}", reply);
        }
        reply
    }

    pub async fn complete_task(&self, id: &str, output: TaskOutput) {
        // only accept output while the attempt is still running; a timed-out
        // attempt has been handed to someone else
        let Some((_, task)) = self.running_tasks.remove(id) else {
            debug!("ignoring completion of stale attempt {}", id);
            return;
        };
        self.cancel_retry(id);
        if self.is_finished() {
            return;
        }
        info!("task done: {}", task);

        match output {
            TaskOutput::Map {
                index,
                segments,
                malformed,
            } => {
                self.malformed.fetch_add(malformed, Ordering::Relaxed);
                for (lane, segment) in segments.into_iter().enumerate() {
                    if let Some(segment) = segment {
                        self.exchange.entry(lane).or_default().push((index, segment));
                    }
                }
            }
            TaskOutput::Reduce(output) => {
                self.lane_outputs.insert(output.lane, output);
            }
        }

        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let previous_reduce = self.reduce_stage.fetch_or(true, Ordering::SeqCst);
            if !previous_reduce {
                info!(
                    malformed = self.malformed(),
                    "map done, init reduce for {} lanes",
                    self.n_lanes.get()
                );
                self.init_reduce();
            } else {
                info!("all done");
                self.finish(None).await;
            }
        }
    }

    pub async fn fail_task(&self, id: &str, err: TaskError) {
        let Some((_, task)) = self.running_tasks.remove(id) else {
            debug!("ignoring failure of stale attempt {}: {}", id, err);
            return;
        };
        self.cancel_retry(id);
        if self.is_finished() {
            return;
        }
        self.retry(task, err).await;
    }

    /// Stops the run. Workers drain, nothing is written.
    pub async fn abort(&self) {
        warn!("abort requested");
        self.finish(Some(RunError::Aborted)).await;
    }

    /// Collects the lane outputs once the run is over.
    pub fn take_output(&self) -> Result<(Vec<LaneOutput>, u64), RunError> {
        if let Some(failure) = self.failure.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(failure);
        }
        let outputs = self
            .n_lanes
            .lanes()
            .map(|lane| {
                self.lane_outputs
                    .remove(&lane)
                    .map(|(_, output)| output)
                    .ok_or(RunError::MissingLane(lane))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((outputs, self.malformed()))
    }
}
