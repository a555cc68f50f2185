use anyhow::Context;
use clap::Parser;
use common::{App, JobConfig, Lane, LaneOutput, MalformedRecord, Record};
use itertools::{Either, Itertools};
use std::{
    fs::{read_to_string, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs the anagram job in a single lane, in process.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(short, long, default_value = "mr-anagram-seq")]
    output: PathBuf,
    input_files: Vec<PathBuf>,
}

fn run(app: &App, config: &JobConfig) -> anyhow::Result<(LaneOutput, usize)> {
    let mut lane = Lane::new(0, app.workload());
    let mut malformed = 0;
    for file in &config.inputs {
        let content =
            read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        let (records, rejected): (Vec<Record>, Vec<MalformedRecord>) = app
            .map(&file.to_string_lossy(), &content)
            .into_iter()
            .map(Record::try_from)
            .partition_map(|r| match r {
                Ok(record) => Either::Left(record),
                Err(err) => Either::Right(err),
            });
        for err in &rejected {
            warn!(file = %file.display(), "{err}");
        }
        malformed += rejected.len();
        lane.collect(records)?;
    }
    Ok((lane.run()?, malformed))
}

fn write_output(path: &Path, output: &LaneOutput) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for group in &output.groups {
        writeln!(writer, "{}", group)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = JobConfig::new(1, cli.input_files, Some(cli.output))?;
    let app = app_anagram::app();

    let (output, malformed) = run(&app, &config)?;
    write_output(&config.output, &output)?;
    info!(
        app = %app.app_name,
        records = output.collected,
        groups = output.groups.len(),
        malformed,
        "wrote {}",
        config.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(dir: &Path, texts: &[&str]) -> JobConfig {
        let inputs = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let path = dir.join(format!("pg-{i}.txt"));
                std::fs::write(&path, text).unwrap();
                path
            })
            .collect();
        JobConfig::new(1, inputs, Some(dir.join("mr-anagram-seq"))).unwrap()
    }

    #[test]
    fn groups_words_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = job(dir.path(), &["The race, the care.", "Acre! tone note cat race"]);
        let (output, malformed) = run(&app_anagram::app(), &config).unwrap();
        write_output(&config.output, &output).unwrap();

        assert_eq!(malformed, 0);
        let written = std::fs::read_to_string(&config.output).unwrap();
        assert_eq!(written, "3 acre,care,race\n2 note,tone\n");
    }

    #[test]
    fn empty_input_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = job(dir.path(), &[""]);
        let (output, _) = run(&app_anagram::app(), &config).unwrap();
        write_output(&config.output, &output).unwrap();
        assert_eq!(std::fs::read_to_string(&config.output).unwrap(), "");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig::new(
            1,
            vec![dir.path().join("nope.txt")],
            Some(dir.path().join("out")),
        )
        .unwrap();
        assert!(run(&app_anagram::app(), &config).is_err());
    }
}
