pub mod journal;

mod config;
mod crawler;
mod fetcher;
mod schedule;
mod scrapable;

pub use config::{parse_daily_time, ConfigError, CrawlerConfig};
pub use crawler::{Crawler, Pipeline, RunError};
pub use fetcher::{Fetch, HttpFetcher, TransportError};
pub use schedule::{run_schedule, Cadence, Clock, SystemClock};
pub use scrapable::{RunReport, Scrapable, ScrapingContext};

pub use anyhow;
pub use log;
