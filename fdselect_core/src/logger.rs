//! Stderr backend for the `log` facade.
//!
//! Line format: `[unix-millis] [LEVEL] ThreadId(n): message`.

use log::{LevelFilter, Log, Metadata, Record};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Global stderr logger lock to avoid interleaved output from multiple threads.
static LOGGER_LOCK: Mutex<()> = Mutex::new(());

static LOGGER: StderrLogger = StderrLogger;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = render(record.level(), record.args());
        let _guard = LOGGER_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = io::stderr().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn render(level: log::Level, args: &fmt::Arguments<'_>) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let millis = ts.as_secs() * 1000 + (ts.subsec_millis() as u64);
    let tid = std::thread::current().id();
    format!("[{}] [{}] {:?}: {}\n", millis, level, tid, args)
}

/// Installs the stderr logger and sets the maximum level. Calling it again
/// only changes the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_layout() {
        let line = render(log::Level::Warn, &format_args!("fd {} ready", 7));
        assert!(line.starts_with('['));
        assert!(line.contains("] [WARN] ThreadId("));
        assert!(line.ends_with(": fd 7 ready\n"));
    }

    #[test]
    fn init_is_idempotent() {
        init(LevelFilter::Debug);
        init(LevelFilter::Warn);
        assert_eq!(log::max_level(), LevelFilter::Warn);
        log::warn!("logger smoke test");
    }
}
