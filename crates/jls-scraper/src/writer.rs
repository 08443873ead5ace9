use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use jls_crawler::log::Log;
use jls_crawler::log_to;
use serde::{Deserialize, Serialize};

use crate::record::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma separated values with a header row
    Csv,
    /// Tab separated values with a header row
    Tsv,
    /// Pretty printed array of objects
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Json => "json",
        }
    }
}

/// File stem shared by every output of a run.
pub fn stem(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Writes a batch once per format, never touching existing files.
#[derive(Debug, Clone)]
pub struct Persister {
    dir: PathBuf,
    prefix: String,
    formats: Vec<OutputFormat>,
}

impl Persister {
    pub fn new<P: Into<PathBuf>>(dir: P, prefix: &str, formats: &[OutputFormat]) -> Self {
        let mut unique = Vec::with_capacity(formats.len());
        for f in formats {
            if !unique.contains(f) {
                unique.push(*f);
            }
        }
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
            formats: unique,
        }
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs_err::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn path(&self, at: DateTime<Local>, format: OutputFormat) -> PathBuf {
        let name = match self.prefix.as_str() {
            "" => stem(at),
            prefix => format!("{prefix}_{}", stem(at)),
        };
        self.dir.join(format!("{name}.{}", format.extension()))
    }

    /// Returns the written files, none when `batch` is empty.
    pub fn persist(
        &self,
        batch: &[JobRecord],
        at: DateTime<Local>,
        log: &dyn Log,
    ) -> anyhow::Result<Vec<PathBuf>> {
        if batch.is_empty() {
            log_to!(log, Warn, "No jobs found.");
            return Ok(vec![]);
        }
        self.ensure_dir()?;

        let mut written = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let path = self.path(at, *format);
            if let Err(e) = write_file(&path, *format, batch) {
                // A run leaves either all of its files or none
                for path in &written {
                    fs_err::remove_file(path).ok();
                }
                return Err(e);
            }
            written.push(path);
        }

        let paths = written
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        log_to!(log, Info, "Saved {} jobs to {paths}", batch.len());
        Ok(written)
    }
}

fn write_file(path: &Path, format: OutputFormat, batch: &[JobRecord]) -> anyhow::Result<()> {
    let file = fs_err::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;

    let res = write_records(file, format, batch);
    if res.is_err() {
        fs_err::remove_file(path).ok();
    }
    res
}

fn write_records<W: Write>(file: W, format: OutputFormat, batch: &[JobRecord]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv | OutputFormat::Tsv => {
            let delimiter = if format == OutputFormat::Tsv { b'\t' } else { b',' };
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(file);
            for record in batch {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            let mut wtr = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut wtr, batch)?;
            wtr.write_all(b"\n")?;
            wtr.flush()?;
        }
    }
    Ok(())
}
