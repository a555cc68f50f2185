use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use common::LaneOutput;
use tracing::{debug, info};

use crate::temp_file;

const OUTPUT_PREFIX: &str = "mr-out-";

pub fn output_name(lane: usize) -> String {
    format!("{OUTPUT_PREFIX}{lane}")
}

fn write_lane(path: &Path, output: &LaneOutput) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for group in &output.groups {
        writeln!(writer, "{}", group)?;
    }
    writer.flush()
}

/// Writes one `mr-out-{lane}` file per lane into `dir`.
///
/// Every lane goes to a temp file first; the final names only appear once all
/// lanes are on disk, and a failed rename removes this call's files again.
/// Output files left from an earlier run with more lanes are removed so the
/// directory always holds exactly this run's output.
pub fn write_outputs(dir: &Path, outputs: &[LaneOutput]) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut staged = Vec::with_capacity(outputs.len());
    for output in outputs {
        let tmp = temp_file(dir);
        if let Err(err) = write_lane(&tmp, output) {
            let _ = fs::remove_file(&tmp);
            for (tmp, _) in &staged {
                let _ = fs::remove_file(tmp);
            }
            return Err(err);
        }
        staged.push((tmp, dir.join(output_name(output.lane))));
    }

    let mut written = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();
    while let Some((tmp, dest)) = pending.next() {
        if let Err(err) = fs::rename(&tmp, &dest) {
            let _ = fs::remove_file(&tmp);
            for (tmp, _) in pending {
                let _ = fs::remove_file(tmp);
            }
            // never leave lanes of two different runs side by side
            for dest in &written {
                let _ = fs::remove_file(dest);
            }
            return Err(err);
        }
        debug!("wrote {}", dest.display());
        written.push(dest);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let stale = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix(OUTPUT_PREFIX))
            .and_then(|lane| lane.parse::<usize>().ok())
            .map_or(false, |lane| lane >= outputs.len());
        if stale {
            info!("removing stale output {}", path.display());
            fs::remove_file(&path)?;
        }
    }

    Ok(written)
}
