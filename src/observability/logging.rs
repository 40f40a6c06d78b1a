//! Structured logging.
//!
//! # Responsibilities
//! - Open the log sink (standard error or an append-only file)
//! - Render one line per event:
//!   `<program> at <timestamp> [PID #<pid>] (<level>) <message>`
//! - Filter by a minimum level chosen at startup
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - No global subscriber: `Logger` owns its `Dispatch` and is installed as
//!   the scoped default for the thread that runs the watcher
//! - Each line is written with a single `write` on an `O_APPEND` descriptor,
//!   so the two processes of a synchronized fork never split a line

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::dispatcher::DefaultGuard;
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// `asctime(3)` layout, always rendered in UTC.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Severity of a log line, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    #[serde(alias = "error")]
    Err,
}

impl LogLevel {
    const ALL: [LogLevel; 4] = [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Err];

    /// Move the level by `steps` (negative is more verbose), clamped to the
    /// known range.
    pub fn adjusted(self, steps: i32) -> Self {
        let max = Self::ALL.len() as i32 - 1;
        let idx = (self as i32 + steps).clamp(0, max);
        Self::ALL[idx as usize]
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Err => LevelFilter::ERROR,
        }
    }
}

fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::TRACE | Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "err",
    }
}

/// Append-only destination shared by every log line and by the validator's
/// output.
#[derive(Debug, Clone)]
pub struct LogSink {
    file: Arc<File>,
}

impl LogSink {
    /// A private duplicate of standard error. It survives the daemon
    /// pointing fd 2 at `/dev/null`.
    pub fn stderr() -> io::Result<Self> {
        let fd = io::stderr().as_fd().try_clone_to_owned()?;
        Ok(Self {
            file: Arc::new(File::from(fd)),
        })
    }

    /// Open (or create, mode 0600) a log file for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(path)?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Resolve a configured destination; `None`, `""` and `-` mean standard
    /// error.
    pub fn from_target(target: Option<&Path>) -> io::Result<Self> {
        match target {
            Some(path) if !path.as_os_str().is_empty() && path != Path::new("-") => {
                Self::open(path)
            }
            _ => Self::stderr(),
        }
    }

    /// A fresh descriptor on the sink, for a child process's stdout or stderr.
    pub fn stdio(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.file.try_clone()?))
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = &'a File;

    fn make_writer(&'a self) -> Self::Writer {
        &self.file
    }
}

struct LineFormat {
    program: String,
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} at {} [PID #{}] ({}) ",
            self.program,
            chrono::Utc::now().format(TIMESTAMP_FORMAT),
            std::process::id(),
            level_label(event.metadata().level()),
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Explicit logger handle: a sink, a minimum level and the subscriber that
/// ties them together.
pub struct Logger {
    dispatch: Dispatch,
    sink: LogSink,
    level: LogLevel,
}

impl Logger {
    /// Build a logger named after the running executable.
    pub fn new(sink: LogSink, level: LogLevel) -> Self {
        Self::with_program(program_name(), sink, level)
    }

    pub fn with_program(program: impl Into<String>, sink: LogSink, level: LogLevel) -> Self {
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(LineFormat {
                program: program.into(),
            })
            .with_writer(sink.clone())
            .with_filter(level.filter());
        let dispatch = Dispatch::new(tracing_subscriber::registry().with(layer));

        Self {
            dispatch,
            sink,
            level,
        }
    }

    /// Make this logger the current thread's default until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        tracing::dispatcher::set_default(&self.dispatch)
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sink", &self.sink)
            .field("level", &self.level)
            .finish()
    }
}

/// Base name of the running executable.
fn program_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
