//! Process-wide logger that keeps recent lines for the status panel.
//!
//! Lines are stamped with the seconds since the logger was installed, which
//! lines them up with song positions when the song started right away.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

const LOG_CAPACITY: usize = 500;

/// Bounded, shared store of formatted log lines. The oldest line is evicted
/// first.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap();
        if lines.len() >= LOG_CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// The newest `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap();
        let skip = lines.len().saturating_sub(count);
        lines.iter().skip(skip).cloned().collect()
    }
}

struct PanelLogger {
    level: LevelFilter,
    started: Instant,
    buffer: LogBuffer,
    echo_stderr: bool,
}

impl Log for PanelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            &record.args().to_string(),
        );
        if self.echo_stderr {
            eprintln!("{}", line);
        }
        self.buffer.push(line);
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<PanelLogger> = OnceLock::new();

/// Install the logger and return the shared line buffer.
///
/// The level comes from `RUST_LOG`; `PIANOLA_LOG_STDERR` (anything but `0`)
/// also echoes every line to stderr.
pub fn init() -> LogBuffer {
    let level = std::env::var("RUST_LOG")
        .map(|level| parse_level(&level))
        .unwrap_or(LevelFilter::Info);
    let echo_stderr = std::env::var("PIANOLA_LOG_STDERR")
        .map(|value| value != "0")
        .unwrap_or(false);

    let logger = LOGGER.get_or_init(|| PanelLogger {
        level,
        started: Instant::now(),
        buffer: LogBuffer::default(),
        echo_stderr,
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }

    logger.buffer.clone()
}

fn format_line(seconds: f64, level: Level, message: &str) -> String {
    format!("{:>8.3}s {:<5} {}", seconds, level, message)
}

fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level(" warn "), LevelFilter::Warn);
        assert_eq!(parse_level("pianola=trace"), LevelFilter::Info);
    }

    #[test]
    fn buffer_keeps_only_the_newest_lines() {
        let buffer = LogBuffer::default();
        for i in 0..(LOG_CAPACITY + 3) {
            buffer.push(format!("line {}", i));
        }
        assert_eq!(buffer.tail(usize::MAX).len(), LOG_CAPACITY);

        let tail = buffer.tail(2);
        assert_eq!(tail, vec!["line 501".to_string(), "line 502".to_string()]);
        assert_eq!(buffer.tail(usize::MAX)[0], "line 3");
    }

    #[test]
    fn lines_carry_elapsed_seconds_and_level() {
        assert_eq!(
            format_line(1.5, Level::Info, "press y"),
            "   1.500s INFO  press y"
        );
    }
}
