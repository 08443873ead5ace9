//! Logging capability handed to every pipeline component.
//!
//! Nothing here installs a global logger: callers acquire a [`Journal`] at
//! start up and pass it down as `&dyn Log`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

pub use log::Level;

/// Logs a formatted message to an explicit `&dyn Log`.
///
/// ```ignore
/// log_to!(log, Warn, "Skipped a listing: {e}");
/// ```
#[macro_export]
macro_rules! log_to {
    ($log:expr, $lvl:ident, $($arg:tt)+) => {
        $crate::journal::emit(
            $log,
            $crate::journal::Level::$lvl,
            ::std::module_path!(),
            ::std::format_args!($($arg)+),
        )
    };
}

pub fn emit(log: &dyn Log, level: Level, target: &str, args: fmt::Arguments) {
    let record = Record::builder()
        .level(level)
        .target(target)
        .args(args)
        .build();
    if log.enabled(record.metadata()) {
        log.log(&record);
    }
}

/// Append-only log file, one `timestamp - LEVEL - message` line per record.
pub struct FileLog {
    file: Mutex<LineWriter<File>>,
    level: LevelFilter,
}

impl FileLog {
    pub fn open<P: AsRef<Path>>(path: P, level: LevelFilter) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Couldn't open log file {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(LineWriter::new(file)),
            level,
        })
    }
}

impl Log for FileLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = self.file.lock() {
            writeln!(
                file,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                level_name(record.level()),
                record.args()
            )
            .ok();
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            file.flush().ok();
        }
    }
}

// Level names in the log file: `WARNING`, not `WARN`.
fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Fans records out to several sinks.
#[derive(Default)]
pub struct Journal {
    sinks: Vec<Box<dyn Log>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl Log + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl Log for Journal {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.sinks.iter().any(|s| s.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        for sink in &self.sinks {
            if sink.enabled(record.metadata()) {
                sink.log(record);
            }
        }
    }

    fn flush(&self) {
        self.sinks.iter().for_each(|s| s.flush());
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Keeps every record in memory, to inspect what a run reported.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Messages logged at `level` that contain `needle`.
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.records()
            .iter()
            .filter(|(l, msg)| *l == level && msg.contains(needle))
            .count()
    }
}

impl Log for MemoryLog {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}
