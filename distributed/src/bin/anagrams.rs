use anyhow::{Context, Result};
use clap::Parser;
use common::{App, JobConfig};
use distributed::{init_logger, output::write_outputs, Job, RunOptions, Split};
use futures::future::try_join_all;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{fs, task};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
pub struct Cli {
    /// Number of lanes, i.e. reduce partitions.
    #[arg(short = 'n', long, default_value_t = 8, allow_negative_numbers = true)]
    lanes: i64,
    /// Directory receiving one `mr-out-{lane}` file per lane.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Concurrent workers; defaults to the number of CPUs.
    #[arg(short, long)]
    workers: Option<usize>,
    /// Seconds before a running task is handed out again.
    #[arg(long, default_value_t = 10)]
    task_timeout: u64,
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,
    /// Also log to `{log_dir}/anagrams.log`.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    input_files: Vec<PathBuf>,
}

async fn load_splits(app: Arc<App>, config: &JobConfig) -> Result<Vec<Split>> {
    let loads = config.inputs.iter().cloned().map(|path| {
        let app = Arc::clone(&app);
        async move {
            let contents = fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let name = path.to_string_lossy().into_owned();
            let split = task::spawn_blocking(move || {
                let pairs = app.map(&name, &contents);
                Split { name, pairs }
            })
            .await?;
            anyhow::Ok(split)
        }
    });
    let splits = try_join_all(loads).await?;
    info!(app = %app.app_name, splits = splits.len(), "input normalized");
    Ok(splits)
}

async fn run(cli: Cli) -> Result<()> {
    let config = JobConfig::new(cli.lanes, cli.input_files, cli.output)?;
    let mut options = RunOptions {
        task_timeout: Duration::from_secs(cli.task_timeout),
        max_attempts: cli.max_attempts.max(1),
        ..RunOptions::default()
    };
    if let Some(workers) = cli.workers {
        options.workers = workers;
    }

    let app = Arc::new(app_anagram::app());
    let splits = load_splits(Arc::clone(&app), &config).await?;
    let job = Job::new(splits, config.lanes, app.workload(), options);

    let coordinator = job.coordinator();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted");
            coordinator.abort().await;
        }
    });

    let output = match job.run().await {
        Ok(output) => output,
        Err(err) => {
            error!("run failed: {}", err);
            return Err(err.into());
        }
    };

    let written = write_outputs(&config.output, &output.lanes)
        .with_context(|| format!("writing {}", config.output.display()))?;
    let groups: usize = output.lanes.iter().map(|lane| lane.groups.len()).sum();
    info!(
        files = written.len(),
        groups,
        malformed = output.malformed,
        "all done, output in {}",
        config.output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logger(cli.log_dir.as_deref(), "anagrams");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));
    // blocking threads still inside an abandoned attempt must not keep us alive
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}
