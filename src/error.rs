//! Error taxonomy for the notifier.
//!
//! # Design Decisions
//! - One enum for every failure the watcher can hit at runtime
//! - Recoverable kinds (`ConfigInvalid`, `CapacityExceeded`) are values the
//!   caller logs and moves past; everything else ends the process
//! - OS failures carry the `std::io::Error` they came from

use std::io;
use std::path::PathBuf;

use nix::unistd::Pid;

use crate::config::loader::ConfigError;
use crate::watch::event::DecodeError;

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, NotifierError>;

/// Errors raised by the watcher, its dispatcher and the reload actuator.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// A kernel or OS resource could not be acquired or used.
    #[error("{context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The watch could not be registered, or the kernel dropped it.
    #[error("cannot watch {}: {reason}", path.display())]
    Watch { path: PathBuf, reason: String },

    /// The validator ran and rejected the configuration.
    #[error("configuration check failed with exit status {status}")]
    ConfigInvalid { status: String },

    /// The validator could not be launched.
    #[error("failed to run `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// The reload signal could not be delivered.
    #[error("kill({pid}, SIGHUP) failed: {source}")]
    Signal {
        pid: Pid,
        #[source]
        source: io::Error,
    },

    /// The target pid failed the startup liveness probe.
    #[error("invalid target process {pid}: {reason}")]
    InvalidTarget { pid: i32, reason: String },

    /// The coalescing buffer has no room left for this name.
    #[error("no room for `{name}` in a {capacity}-byte summary")]
    CapacityExceeded { name: String, capacity: usize },

    /// A kernel event record could not be decoded.
    #[error("malformed inotify record: {0}")]
    Decode(#[from] DecodeError),

    /// The forked child went away before releasing the parent.
    #[error("child {pid} exited before signaling the fork barrier")]
    BarrierBroken { pid: Pid },

    /// Configuration file error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl NotifierError {
    /// Wrap an OS error with the operation that produced it.
    pub fn resource(context: impl Into<String>, source: impl Into<io::Error>) -> Self {
        Self::Resource {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Whether this error must terminate the watcher.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::ConfigInvalid { .. } | Self::CapacityExceeded { .. }
        )
    }
}
