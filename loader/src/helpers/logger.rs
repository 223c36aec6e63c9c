use std::{
    env,
    io::{stderr, IsTerminal, Write},
    sync::Mutex,
};

use anyhow::{bail, Result};
use log::{LevelFilter, Metadata, Record};
use termcolor::{BufferedStandardStream, Color, ColorChoice, ColorSpec, WriteColor};
use time::{macros::format_description, OffsetDateTime};

/// Target used for messages forwarded from libbpf.
pub(crate) const LIBBPF_TARGET: &str = "libbpf";

/// Our own logger implementation, to handle log:: messages.
pub(crate) struct Logger {
    /// Max level the logger will output.
    max_level: LevelFilter,
    /// Inner writer, alongside its configuration.
    inner: Mutex<LoggerWriter>,
}

struct LoggerWriter {
    /// Log messages always go to stderr. Progress and the attachment summary
    /// are printed on stdout so both can be redirected separately.
    stderr: BufferedStandardStream,
    /// Should colors be used in the output?
    use_colors: bool,
}

impl Logger {
    pub(crate) fn init(max_level: LevelFilter) -> Result<()> {
        let logger = Logger {
            max_level,
            inner: Mutex::new(LoggerWriter {
                stderr: BufferedStandardStream::stderr(ColorChoice::Auto),
                use_colors: Self::check_color_use(),
            }),
        };

        log::set_max_level(max_level);
        log::set_boxed_logger(Box::new(logger))?;
        Ok(())
    }

    pub(crate) fn try_log(&self, record: &Record) -> Result<()> {
        static LEVEL_COLORS: &[Option<Color>] = &[
            None,                // Default.
            Some(Color::Red),    // Error.
            Some(Color::Yellow), // Warn.
            Some(Color::Blue),   // Info.
            Some(Color::Cyan),   // Debug.
            Some(Color::White),  // Trace.
        ];
        let inner: &mut LoggerWriter = &mut *self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("logger lock poisoned"))?;

        // If the log level allows debug! and/or trace!, show the time.
        if self.max_level >= LevelFilter::Debug {
            OffsetDateTime::now_utc().format_into(
                &mut inner.stderr,
                format_description!("[hour]:[minute]:[second].[subsecond digits:6] "),
            )?;
        }

        // Show the level for error! and warn!, or if the max level includes
        // debug!.
        if record.level() <= LevelFilter::Warn || self.max_level >= LevelFilter::Debug {
            if inner.use_colors {
                inner
                    .stderr
                    .set_color(ColorSpec::new().set_fg(LEVEL_COLORS[record.level() as usize]))?;
            }
            write!(inner.stderr, "{:5} ", record.level())?;
            if inner.use_colors {
                inner.stderr.reset()?;
            }
        }

        // libbpf messages already end with a new line.
        if record.target() == LIBBPF_TARGET {
            write!(inner.stderr, "{LIBBPF_TARGET}: {}", record.args())?;
        } else {
            writeln!(inner.stderr, "{}", record.args())?;
        }

        inner.stderr.flush()?;
        Ok(())
    }

    /// Check if colors can be used in the output.
    fn check_color_use() -> bool {
        if !stderr().is_terminal() {
            return false;
        }
        matches!(env::var("TERM"), Ok(x) if x != "dumb")
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Not much we can do to report the error...
        let _ = self.try_log(record);
    }

    fn flush(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            // Not much we can do to report the error...
            let _ = inner.stderr.flush();
        }
    }
}

/// Convert a log level given on the command line to a filter.
pub(crate) fn parse_level(level: &str) -> Result<LevelFilter> {
    Ok(match level {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        x => bail!("Invalid log level: {x}"),
    })
}
