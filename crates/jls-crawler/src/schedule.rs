//! Periodic triggering of a [`Pipeline`].
//!
//! Runs are awaited inline, so a trigger that falls due while a run is still
//! in progress can never start a second one: once the run returns, every
//! trigger it overlapped is dropped and logged, and the loop waits for the
//! next boundary. Triggers that passed before the run started (the wall
//! clock jumped, e.g. after a suspend) are dropped as missed.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone};
use log::Log;

use crate::config::{parse_daily_time, ConfigError};
use crate::crawler::Pipeline;
use crate::log_to;

/// Longest uninterrupted sleep, so wall-clock jumps get noticed.
const MAX_NAP: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every hour, counted from the scheduler start
    Hourly,
    /// Every day at a fixed local time
    Daily(NaiveTime),
}

impl Cadence {
    pub fn parse(interval: &str, daily_at: &str) -> Result<Self, ConfigError> {
        match interval.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily(parse_daily_time(daily_at)?)),
            _ => Err(ConfigError::UnknownInterval(interval.to_string())),
        }
    }

    /// First trigger after the scheduler started at `start`.
    pub fn first_due(&self, start: DateTime<Local>) -> DateTime<Local> {
        match self {
            Self::Hourly => start + chrono::Duration::hours(1),
            Self::Daily(at) => {
                let today = at_local(start.date_naive(), *at);
                if today > start {
                    today
                } else {
                    at_local(next_day(start.date_naive()), *at)
                }
            }
        }
    }

    /// Trigger following the one due at `prev`.
    pub fn next_due(&self, prev: DateTime<Local>) -> DateTime<Local> {
        match self {
            Self::Hourly => prev + chrono::Duration::hours(1),
            Self::Daily(at) => at_local(next_day(prev.date_naive()), *at),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::Daily(at) => write!(f, "daily at {}", at.format("%H:%M")),
        }
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

// Nonexistent local times (DST gap) move forward until they exist.
fn at_local(date: NaiveDate, time: NaiveTime) -> DateTime<Local> {
    let mut naive = date.and_time(time);
    loop {
        if let Some(dt) = Local.from_local_datetime(&naive).earliest() {
            return dt;
        }
        naive += chrono::Duration::minutes(30);
    }
}

/// Source of time for the scheduler.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn sleep(&self, duration: Duration) -> tokio::time::Sleep {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Triggers `pipeline` on `cadence` until `stop` resolves.
///
/// A failed run is logged and the loop stays scheduled. `stop` is only
/// observed between runs.
pub async fn run_schedule<C, P, S>(
    cadence: Cadence,
    clock: &C,
    pipeline: &mut P,
    stop: S,
    log: &dyn Log,
) where
    C: Clock,
    P: Pipeline,
    S: Future<Output = ()>,
{
    tokio::pin!(stop);

    let mut due = cadence.first_due(clock.now());
    log_to!(log, Info, "Scheduler started ({cadence}), next run at {due}");

    loop {
        loop {
            let now = clock.now();
            if now >= due {
                break;
            }
            let nap = (due - now).to_std().unwrap_or(Duration::ZERO).min(MAX_NAP);
            tokio::select! {
                _ = &mut stop => {
                    log_to!(log, Info, "Scheduler stopped");
                    return;
                }
                _ = clock.sleep(nap) => {}
            }
        }

        let started_at = clock.now();
        log_to!(log, Info, "Starting scheduled run due at {due}");
        match pipeline.run(started_at).await {
            Ok(report) => log_to!(log, Info, "Scheduled run finished: {report}"),
            Err(e) => log_to!(log, Error, "Scheduled run failed: {e}"),
        }

        due = cadence.next_due(due);
        let now = clock.now();
        while due <= now {
            if due > started_at {
                log_to!(
                    log,
                    Warn,
                    "Skipping trigger due at {due}: previous run was still in progress"
                );
            } else {
                log_to!(
                    log,
                    Warn,
                    "Missed trigger due at {due}: the clock jumped past it"
                );
            }
            due = cadence.next_due(due);
        }
        log_to!(log, Info, "Next run at {due}");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use chrono::Timelike;
    use tokio::time::Instant;

    use crate::crawler::RunError;
    use crate::fetcher::TransportError;
    use crate::journal::{Level, MemoryLog};
    use crate::scrapable::RunReport;

    use super::*;

    /// Local time driven by tokio's (paused) clock.
    struct PausedClock {
        origin: DateTime<Local>,
        started: Instant,
    }

    impl PausedClock {
        fn new(origin: DateTime<Local>) -> Self {
            Self {
                origin,
                started: Instant::now(),
            }
        }
    }

    impl Clock for PausedClock {
        fn now(&self) -> DateTime<Local> {
            self.origin + chrono::Duration::from_std(self.started.elapsed()).unwrap()
        }
    }

    /// Records start times, each run lasting `durations[i]` (or instant).
    struct FakePipeline {
        clock: Rc<PausedClock>,
        durations: Vec<Duration>,
        fail_first: bool,
        starts: Rc<RefCell<Vec<DateTime<Local>>>>,
    }

    impl Pipeline for FakePipeline {
        async fn run(&mut self, started_at: DateTime<Local>) -> Result<RunReport, RunError> {
            let n = {
                let mut starts = self.starts.borrow_mut();
                starts.push(started_at);
                starts.len() - 1
            };
            if let Some(d) = self.durations.get(n) {
                self.clock.sleep(*d).await;
            }
            if self.fail_first && n == 0 {
                return Err(RunError::Transport(TransportError::Timeout {
                    url: "http://jobs".into(),
                    timeout: Duration::from_secs(10),
                }));
            }
            Ok(RunReport::new(started_at))
        }
    }

    fn origin() -> DateTime<Local> {
        at_local(
            NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn parse_cadence() {
        assert_eq!(Cadence::parse("hourly", "08:00").unwrap(), Cadence::Hourly);
        assert_eq!(
            Cadence::parse("Daily", "07:30").unwrap(),
            Cadence::Daily(NaiveTime::from_hms_opt(7, 30, 0).unwrap())
        );
        assert!(matches!(
            Cadence::parse("weekly", "08:00"),
            Err(ConfigError::UnknownInterval(i)) if i == "weekly"
        ));
        assert!(matches!(
            Cadence::parse("daily", "25:00"),
            Err(ConfigError::DailyTime(_))
        ));
    }

    #[test]
    fn hourly_is_offset_from_start() {
        let start = origin() + chrono::Duration::minutes(17);
        let first = Cadence::Hourly.first_due(start);
        assert_eq!(first - start, chrono::Duration::hours(1));
        assert_eq!(
            Cadence::Hourly.next_due(first) - first,
            chrono::Duration::hours(1)
        );
    }

    #[test]
    fn daily_at_fixed_time() {
        let at = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let cadence = Cadence::Daily(at);

        // 09:00 is past 08:00, first run is tomorrow
        let first = cadence.first_due(origin());
        assert_eq!(first.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 13).unwrap());
        assert_eq!((first.hour(), first.minute()), (8, 0));

        let early = origin() - chrono::Duration::hours(2);
        let first = cadence.first_due(early);
        assert_eq!(first.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());

        let next = cadence.next_due(first);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 13).unwrap());
        assert_eq!((next.hour(), next.minute()), (8, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_triggers_are_dropped() {
        let clock = Rc::new(PausedClock::new(origin()));
        let starts = Rc::new(RefCell::new(vec![]));
        let mut pipeline = FakePipeline {
            clock: clock.clone(),
            durations: vec![Duration::from_secs(150 * 60)],
            fail_first: false,
            starts: starts.clone(),
        };
        let log = MemoryLog::new();

        // Runs at +1h (lasting until +3h30), +2h and +3h are dropped, next at +4h
        let stop = tokio::time::sleep(Duration::from_secs(4 * 3600 + 1800));
        run_schedule(Cadence::Hourly, clock.as_ref(), &mut pipeline, stop, &log).await;

        let starts = starts.borrow();
        assert_eq!(starts.len(), 2);
        assert_eq!((starts[0] - origin()).num_seconds(), 3600);
        assert_eq!((starts[1] - origin()).num_seconds(), 4 * 3600);
        assert_eq!(log.count(Level::Warn, "Skipping trigger"), 2);
        assert_eq!(log.count(Level::Warn, "Missed trigger"), 0);
        assert_eq!(log.count(Level::Info, "Scheduler stopped"), 1);
    }

    /// Paused clock whose wall time leaps forward once `after` has elapsed.
    struct JumpingClock {
        inner: PausedClock,
        after: Duration,
        leap: chrono::Duration,
    }

    impl Clock for JumpingClock {
        fn now(&self) -> DateTime<Local> {
            if self.inner.started.elapsed() >= self.after {
                self.inner.now() + self.leap
            } else {
                self.inner.now()
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clock_jump_is_not_blamed_on_a_run() {
        // 09:30 jumps to 12:45: the 10:00 run fires at once, 11:00 and 12:00
        // were missed while nothing ran
        let clock = JumpingClock {
            inner: PausedClock::new(origin()),
            after: Duration::from_secs(1800),
            leap: chrono::Duration::minutes(195),
        };
        let starts = Rc::new(RefCell::new(vec![]));
        let mut pipeline = FakePipeline {
            clock: Rc::new(PausedClock::new(origin())),
            durations: vec![],
            fail_first: false,
            starts: starts.clone(),
        };
        let log = MemoryLog::new();

        let stop = tokio::time::sleep(Duration::from_secs(40 * 60));
        run_schedule(Cadence::Hourly, &clock, &mut pipeline, stop, &log).await;

        let starts = starts.borrow();
        assert_eq!(starts.len(), 1);
        assert_eq!((starts[0] - origin()).num_minutes(), 30 + 195);
        assert_eq!(log.count(Level::Warn, "Missed trigger"), 2);
        assert_eq!(log.count(Level::Warn, "still in progress"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_keeps_schedule_alive() {
        let clock = Rc::new(PausedClock::new(origin()));
        let starts = Rc::new(RefCell::new(vec![]));
        let mut pipeline = FakePipeline {
            clock: clock.clone(),
            durations: vec![],
            fail_first: true,
            starts: starts.clone(),
        };
        let log = MemoryLog::new();

        let stop = tokio::time::sleep(Duration::from_secs(3 * 3600 + 60));
        run_schedule(Cadence::Hourly, clock.as_ref(), &mut pipeline, stop, &log).await;

        assert_eq!(starts.borrow().len(), 3);
        assert_eq!(log.count(Level::Error, "Scheduled run failed"), 1);
        assert_eq!(log.count(Level::Info, "Scheduled run finished"), 2);
        assert_eq!(log.count(Level::Warn, "Skipping trigger"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_trigger() {
        let clock = PausedClock::new(origin());
        let starts = Rc::new(RefCell::new(vec![]));
        let mut pipeline = FakePipeline {
            clock: Rc::new(PausedClock::new(origin())),
            durations: vec![],
            fail_first: false,
            starts: starts.clone(),
        };
        let log = MemoryLog::new();

        let stop = tokio::time::sleep(Duration::from_secs(1800));
        run_schedule(Cadence::Hourly, &clock, &mut pipeline, stop, &log).await;

        assert!(starts.borrow().is_empty());
    }
}
