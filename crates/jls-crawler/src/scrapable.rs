use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use log::Log;

/// Turns one fetched page into persisted records.
pub trait Scrapable {
    fn scrap(&mut self, page: &[u8], ctx: &ScrapingContext) -> anyhow::Result<RunReport>;
}

pub struct ScrapingContext<'a> {
    /// Where the page was fetched from
    pub location: &'a str,
    /// Start of the run, also names the output files
    pub started_at: DateTime<Local>,
    pub log: &'a dyn Log,
}

/// What one pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub written: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub files: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            written: 0,
            skipped: 0,
            duplicates: 0,
            files: vec![],
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.files.is_empty() {
            return write!(f, "No jobs saved ({} listings skipped)", self.skipped);
        }
        let files = self
            .files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Scraped and saved {} jobs to {files}", self.written)?;
        if self.skipped > 0 {
            write!(f, " ({} listings skipped)", self.skipped)?;
        }
        Ok(())
    }
}
