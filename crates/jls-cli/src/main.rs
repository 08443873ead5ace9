use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use env_logger::Env;
use jls_crawler::journal::{FileLog, Journal};
use jls_crawler::log::{LevelFilter, Log};
use jls_crawler::{
    log_to, run_schedule, Cadence, Crawler, CrawlerConfig, HttpFetcher, Pipeline, SystemClock,
};
use jls_scraper::{JobBoard, JobBoardConfig, OutputFormat};
use serde::{Deserialize, Serialize};
use tokio::runtime;

/// Job listings scraper
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Scrape the job board once
    #[arg(long)]
    pub run: bool,
    /// Keep scraping on a schedule: `hourly` or `daily`
    #[arg(long, value_name = "INTERVAL")]
    pub schedule: Option<String>,
    /// Optional yaml configuration file
    #[arg(long, env = "JLS_CONFIG")]
    pub config: Option<PathBuf>,
    /// Override the job board url
    #[arg(long)]
    pub url: Option<String>,
    /// Override the download timeout, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Override the user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override the time of the daily run (HH:MM)
    #[arg(long, value_name = "HH:MM")]
    pub daily_at: Option<String>,
    /// Override the directory receiving scraped files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Override the output file name prefix
    #[arg(long)]
    pub prefix: Option<String>,
    /// Override the output formats, repeat for several
    #[arg(long = "format", value_enum)]
    pub formats: Vec<OutputFormat>,
    /// Override the log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Only log to the log file
    #[arg(long, short)]
    pub quiet: bool,
    #[arg(long, hide = true)]
    pub completions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub scraper: JobBoardConfig,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            scraper: JobBoardConfig::default(),
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("job_scraper.log")
}

impl TryFrom<&Args> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let mut conf: AppConfig = if let Some(path) = &args.config {
            let file = File::open(path)
                .with_context(|| format!("Couldn't open config {}", path.display()))?;
            serde_yaml::from_reader(file)
                .with_context(|| format!("Couldn't read config {}", path.display()))?
        } else {
            AppConfig::default()
        };
        if let Some(url) = &args.url {
            conf.crawler.url = url.to_string();
        }
        if let Some(timeout) = args.timeout {
            conf.crawler.timeout_secs = timeout;
        }
        if let Some(user_agent) = &args.user_agent {
            conf.crawler.user_agent = user_agent.to_string();
        }
        if let Some(daily_at) = &args.daily_at {
            conf.crawler.daily_at = daily_at.to_string();
        }
        if let Some(output_dir) = &args.output_dir {
            conf.scraper.output_dir = output_dir.clone();
        }
        if let Some(prefix) = &args.prefix {
            conf.scraper.file_prefix = prefix.to_string();
        }
        if !args.formats.is_empty() {
            conf.scraper.formats = args.formats.clone();
        }
        if let Some(log_file) = &args.log_file {
            conf.log_file = log_file.clone();
        }
        Ok(conf)
    }
}

const USAGE: &str =
    "Nothing to do: use --run to scrape once, --schedule hourly|daily to keep scraping (see --help)";

/// Hint to print when no flag asks for any work.
pub fn usage_hint(args: &Args) -> Option<&'static str> {
    if !args.run && args.schedule.is_none() {
        Some(USAGE)
    } else {
        None
    }
}

/// Runs what the flags ask for. An invalid schedule is reported before any
/// work is done and leaves nothing behind.
pub async fn scrape(args: &Args, conf: &AppConfig, log: &dyn Log) -> anyhow::Result<()> {
    let cadence = match &args.schedule {
        Some(interval) => match Cadence::parse(interval, &conf.crawler.daily_at) {
            Ok(cadence) => Some(cadence),
            Err(e) => {
                log_to!(log, Warn, "Scheduling not started: {e}");
                return Ok(());
            }
        },
        None => None,
    };

    let fetcher = HttpFetcher::new(&conf.crawler)?;
    let board = JobBoard::new(&conf.scraper)?;
    let mut crawler = Crawler::new(&conf.crawler, fetcher, board, log);

    if args.run {
        match crawler.run(Local::now()).await {
            Ok(report) => println!("{report}"),
            Err(e) => eprintln!("Run failed: {e}"),
        }
    }

    if let Some(cadence) = cadence {
        println!("Scraping {cadence}, press Ctrl-C to stop");
        let stop = async {
            tokio::signal::ctrl_c().await.ok();
        };
        run_schedule(cadence, &SystemClock, &mut crawler, stop, log).await;
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.completions {
        generate(Shell::Bash, &mut Args::command(), "jls", &mut io::stdout());
        return Ok(());
    }
    if let Some(hint) = usage_hint(&args) {
        println!("{hint}");
        return Ok(());
    }

    let conf = AppConfig::try_from(&args)?;

    let mut journal = Journal::new().with(FileLog::open(&conf.log_file, LevelFilter::Info)?);
    if !args.quiet {
        journal = journal
            .with(env_logger::Builder::from_env(Env::default().default_filter_or("info")).build());
    }

    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(scrape(&args, &conf, &journal))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use jls_crawler::journal::{Level, MemoryLog};

    use super::*;

    #[test]
    fn args_are_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_combine() {
        let args = Args::try_parse_from(["jls", "--run", "--schedule", "daily"]).unwrap();
        assert!(args.run);
        assert_eq!(args.schedule.as_deref(), Some("daily"));

        let args = Args::try_parse_from(["jls", "--format", "tsv", "--format", "json"]).unwrap();
        assert_eq!(args.formats, vec![OutputFormat::Tsv, OutputFormat::Json]);

        assert!(Args::try_parse_from(["jls", "--format", "xml"]).is_err());
    }

    #[test]
    fn yaml_config_with_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("jls.yaml");
        fs::write(
            &path,
            "crawler:\n  url: https://example.org/jobs\n  timeoutSecs: 3\n\
             scraper:\n  outputDir: out\n  formats: [tsv]\n",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "jls",
            "--run",
            "--config",
            path.to_str().unwrap(),
            "--timeout",
            "5",
            "--daily-at",
            "06:15",
        ])
        .unwrap();
        let conf = AppConfig::try_from(&args).unwrap();

        assert_eq!(conf.crawler.url, "https://example.org/jobs");
        assert_eq!(conf.crawler.timeout_secs, 5);
        assert_eq!(conf.crawler.daily_at, "06:15");
        assert_eq!(conf.scraper.output_dir, PathBuf::from("out"));
        assert_eq!(conf.scraper.formats, vec![OutputFormat::Tsv]);
        assert_eq!(conf.scraper.file_prefix, "scraped_jobs");
        assert_eq!(conf.log_file, PathBuf::from("job_scraper.log"));
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let args = Args::try_parse_from(["jls", "--run", "--config", "/nonexistent/jls.yaml"])
            .unwrap();
        assert!(AppConfig::try_from(&args).is_err());
    }

    #[test]
    fn no_flag_prints_usage() {
        let args = Args::try_parse_from(["jls"]).unwrap();
        assert_eq!(usage_hint(&args), Some(USAGE));

        let args = Args::try_parse_from(["jls", "--quiet", "--format", "csv"]).unwrap();
        assert!(usage_hint(&args).is_some());

        let args = Args::try_parse_from(["jls", "--run"]).unwrap();
        assert_eq!(usage_hint(&args), None);
        let args = Args::try_parse_from(["jls", "--schedule", "hourly"]).unwrap();
        assert_eq!(usage_hint(&args), None);
    }

    #[tokio::test]
    async fn unknown_interval_does_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("never");

        let cases: [&[&str]; 2] = [&["--schedule", "weekly"], &["--run", "--schedule", "weekly"]];
        for flags in cases {
            let mut argv = vec!["jls", "--output-dir", out.to_str().unwrap()];
            argv.extend_from_slice(flags);
            let args = Args::try_parse_from(argv).unwrap();
            let conf = AppConfig::try_from(&args).unwrap();
            let log = MemoryLog::new();

            scrape(&args, &conf, &log).await.unwrap();

            assert_eq!(log.count(Level::Warn, "Scheduling not started"), 1);
            assert_eq!(log.records().len(), 1);
            assert!(!out.exists());
        }
    }
}
