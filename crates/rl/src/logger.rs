//! Scalar training logs.
//!
//! Each run gets its own directory `<log_dir>/<prefix>_<n>` (first free `n`,
//! starting at 1) holding a `scalars.jsonl` file with one JSON record per
//! logged value.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::RlError;

#[derive(Serialize)]
struct Record<'a> {
    tag: &'a str,
    step: usize,
    value: f64,
    wall_time: String,
}

pub struct ScalarLogger {
    run_dir: PathBuf,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ScalarLogger {
    /// # Errors
    /// Returns [`RlError::Io`] if the run directory or log file cannot be created.
    pub fn create(log_dir: &Path, prefix: &str) -> Result<Self, RlError> {
        fs::create_dir_all(log_dir).map_err(|e| RlError::io(log_dir, e))?;
        let run_id = next_run_id(log_dir, prefix)?;
        let run_dir = log_dir.join(format!("{prefix}_{run_id}"));
        fs::create_dir_all(&run_dir).map_err(|e| RlError::io(&run_dir, e))?;
        let path = run_dir.join("scalars.jsonl");
        let file = File::create(&path).map_err(|e| RlError::io(&path, e))?;
        debug!(path = %path.display(), "scalar log opened");
        Ok(Self { run_dir, path, writer: BufWriter::new(file) })
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// # Errors
    /// Returns [`RlError`] if the record cannot be written.
    pub fn record(&mut self, tag: &str, step: usize, value: f64) -> Result<(), RlError> {
        let record = Record { tag, step, value, wall_time: chrono::Utc::now().to_rfc3339() };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n").map_err(|e| RlError::io(&self.path, e))
    }

    /// # Errors
    /// Returns [`RlError::Io`] if buffered records cannot be written out.
    pub fn flush(&mut self) -> Result<(), RlError> {
        self.writer.flush().map_err(|e| RlError::io(&self.path, e))
    }
}

fn next_run_id(log_dir: &Path, prefix: &str) -> Result<usize, RlError> {
    let entries = fs::read_dir(log_dir).map_err(|e| RlError::io(log_dir, e))?;
    let latest = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            name.strip_prefix(prefix)?.strip_prefix('_')?.parse::<usize>().ok()
        })
        .max()
        .unwrap_or(0);
    Ok(latest + 1)
}
