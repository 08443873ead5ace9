use std::future::Future;

use chrono::{DateTime, Local};
use log::Log;

use crate::config::CrawlerConfig;
use crate::fetcher::{Fetch, TransportError};
use crate::log_to;
use crate::scrapable::{RunReport, Scrapable, ScrapingContext};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("scraping failed: {0:#}")]
    Scrap(anyhow::Error),
}

/// One complete Fetch → Scrap run, as triggered by hand or by the scheduler.
pub trait Pipeline {
    fn run(&mut self, started_at: DateTime<Local>)
        -> impl Future<Output = Result<RunReport, RunError>>;
}

pub struct Crawler<'a, F, S> {
    config: &'a CrawlerConfig,
    fetcher: F,
    scraper: S,
    log: &'a dyn Log,
}

impl<'a, F, S> Crawler<'a, F, S>
where
    F: Fetch,
    S: Scrapable,
{
    pub fn new(config: &'a CrawlerConfig, fetcher: F, scraper: S, log: &'a dyn Log) -> Self {
        Self {
            config,
            fetcher,
            scraper,
            log,
        }
    }
}

impl<'a, F, S> Pipeline for Crawler<'a, F, S>
where
    F: Fetch,
    S: Scrapable,
{
    async fn run(&mut self, started_at: DateTime<Local>) -> Result<RunReport, RunError> {
        let url = self.config.url.as_str();

        let page = match self.fetcher.fetch(url).await {
            Ok(page) => {
                log_to!(self.log, Info, "Successfully accessed {url}");
                page
            }
            Err(e) => {
                log_to!(self.log, Error, "Network error: {e}");
                return Err(e.into());
            }
        };

        let ctx = ScrapingContext {
            location: url,
            started_at,
            log: self.log,
        };
        self.scraper.scrap(&page, &ctx).map_err(|e| {
            log_to!(self.log, Error, "Couldn't scrap {url}: {e:#}");
            RunError::Scrap(e)
        })
    }
}
