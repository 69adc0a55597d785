//! Diagnostic logging. Output lines are prefixed `[ddSMT LEVEL]`, a format
//! the stock `log` backends don't produce verbatim, so this installs a
//! small direct `log::Log` implementation against the same `log` facade
//! instead.
use log::{Level, LevelFilter, Log, Metadata, Record};

struct DdsmtLogger {
    filter: LevelFilter,
}

impl Log for DdsmtLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        eprintln!("[ddSMT {level}] {}", record.args());
    }

    fn flush(&self) {}
}

/// `-v` is repeatable: 0 warn, 1 info, >=2 debug.
pub fn level_for_verbosity(v: u8) -> LevelFilter {
    match v {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

pub fn init(verbosity: u8) {
    let filter = level_for_verbosity(verbosity);
    let logger = Box::new(DdsmtLogger { filter });
    log::set_boxed_logger(logger).expect("logger already initialized");
    log::set_max_level(filter);
}
