use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Wall-clock time of the daily run, `HH:MM`
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            daily_at: default_daily_at(),
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn daily_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_daily_time(&self.daily_at)
    }
}

fn default_url() -> String {
    String::from("https://vacancymail.co.zw/jobs/")
}

fn default_user_agent() -> String {
    format!("jls/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_daily_at() -> String {
    String::from("08:00")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid schedule interval {0:?}, expected `hourly` or `daily`")]
    UnknownInterval(String),
    #[error("invalid daily time {0:?}, expected HH:MM")]
    DailyTime(String),
}

pub fn parse_daily_time(s: &str) -> Result<NaiveTime, ConfigError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ConfigError::DailyTime(s.to_string()))
}
