use std::path::PathBuf;

use jls_crawler::{log_to, RunReport, Scrapable, ScrapingContext};
use serde::{Deserialize, Serialize};

use crate::dedup::dedupe;
use crate::document;
use crate::extractor::{extract, Extraction};
use crate::writer::{OutputFormat, Persister};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobBoardConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
}

impl Default for JobBoardConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            formats: default_formats(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    String::from("scraped_jobs")
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Csv, OutputFormat::Json]
}

/// Extracts, dedupes and persists the listings of a job board page.
#[derive(Debug, Clone)]
pub struct JobBoard {
    persister: Persister,
}

impl JobBoard {
    /// Fails when the output directory can't be created.
    pub fn new(config: &JobBoardConfig) -> anyhow::Result<Self> {
        let formats = if config.formats.is_empty() {
            default_formats()
        } else {
            config.formats.clone()
        };
        let persister = Persister::new(&config.output_dir, &config.file_prefix, &formats);
        persister.ensure_dir()?;
        Ok(Self { persister })
    }
}

impl Scrapable for JobBoard {
    fn scrap(&mut self, page: &[u8], ctx: &ScrapingContext) -> anyhow::Result<RunReport> {
        let html = document::parse(page);
        let Extraction {
            shape,
            records,
            skipped,
        } = extract(&html, ctx.log);
        if let Some(shape) = shape {
            log_to!(
                ctx.log,
                Debug,
                "Found {} {shape} listings on {}",
                records.len() + skipped,
                ctx.location
            );
        }

        let found = records.len();
        let batch = dedupe(records);
        let files = self.persister.persist(&batch, ctx.started_at, ctx.log)?;

        Ok(RunReport {
            started_at: ctx.started_at,
            written: if files.is_empty() { 0 } else { batch.len() },
            skipped,
            duplicates: found - batch.len(),
            files,
        })
    }
}
