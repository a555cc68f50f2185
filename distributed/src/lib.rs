use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use common::{LaneCount, LaneOutput, Workload};
use futures::future::join_all;
use time::macros::format_description;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

pub mod coordinator;
pub mod error;
pub mod output;
pub mod worker;

pub use coordinator::{Coordinator, RunOptions, Split};
pub use error::{RunError, TaskError};

use worker::Worker;

/// Logs to stderr and, when `log_dir` is set, to `{log_dir}/{name}.log`.
///
/// Keep the returned guard alive until exit or buffered file lines are lost.
pub fn init_logger(log_dir: Option<&Path>, name: &str) -> Option<WorkerGuard> {
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_timer(timer.clone())
        .with_writer(std::io::stderr);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, format!("{name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_timer(timer)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();
    guard
}

/// Fresh uuid-named path inside `dir` for output staged before its rename.
pub fn temp_file(dir: &Path) -> PathBuf {
    dir.join(format!(".mr-tmp-{}", Uuid::new_v4()))
}

/// How long a finished run waits for its workers before abandoning them.
pub const WORKER_GRACE: Duration = Duration::from_millis(250);

/// Result of a finished run.
#[derive(Debug)]
pub struct JobOutput {
    /// One entry per lane, in lane order.
    pub lanes: Vec<LaneOutput>,
    /// Pairs rejected because their key did not match their word.
    pub malformed: u64,
}

/// A configured run that has not started yet.
pub struct Job {
    coordinator: Arc<Coordinator>,
    shutdown: oneshot::Receiver<()>,
    workload: Workload,
}

impl Job {
    pub fn new(splits: Vec<Split>, n_lanes: LaneCount, workload: Workload, options: RunOptions) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            coordinator: Arc::new(Coordinator::new(splits, n_lanes, options, tx)),
            shutdown: rx,
            workload,
        }
    }

    /// Handle for aborting the run from elsewhere.
    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Starts the workers and waits until every lane is done or the run fails.
    pub async fn run(self) -> Result<JobOutput, RunError> {
        let n_workers = self.coordinator.options().workers.max(1);
        info!(
            lanes = self.coordinator.n_lanes().get(),
            workers = n_workers,
            "starting run"
        );
        let mut workers = (0..n_workers)
            .map(|id| tokio::spawn(Worker::new(id, Arc::clone(&self.coordinator), self.workload).run()))
            .collect::<Vec<_>>();

        self.shutdown.await.ok();

        // idle workers see the shutdown within one poll; a worker still inside
        // a stale or aborted attempt is abandoned, its result would be ignored
        let drained = tokio::time::timeout(WORKER_GRACE, join_all(workers.iter_mut())).await;
        match drained {
            Ok(joined) => {
                for err in joined.into_iter().filter_map(Result::err) {
                    warn!("worker ended abnormally: {}", err);
                }
            }
            Err(_) => {
                warn!("abandoning workers still busy with stale attempts");
                for worker in &workers {
                    worker.abort();
                }
            }
        }

        let (lanes, malformed) = self.coordinator.take_output()?;
        Ok(JobOutput { lanes, malformed })
    }
}

/// Runs the workload over `splits` with `n_lanes` lanes.
pub async fn run_job(
    splits: Vec<Split>,
    n_lanes: LaneCount,
    workload: Workload,
    options: RunOptions,
) -> Result<JobOutput, RunError> {
    Job::new(splits, n_lanes, workload, options).run().await
}
