//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing macros (info!/warn!/...)
//!     → logging.rs (Logger: level filter + line format)
//!     → LogSink (stderr duplicate or append-only file)
//!
//! The validator command writes straight into the same sink.
//! ```

pub mod logging;

pub use logging::{LogLevel, LogSink, Logger};
