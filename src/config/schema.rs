//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the optional TOML
//! file. Command-line flags are applied on top by the binary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::observability::logging::LogLevel;

/// Default validator command, run through `sh -c`.
pub const DEFAULT_CHECK_COMMAND: &str = "apache2 -t";

/// Default byte budget of one coalesced summary.
pub const DEFAULT_SUMMARY_CAPACITY: usize = 4096;

/// Root configuration for the notifier.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NotifierConfig {
    /// Log sink and minimum level.
    pub log: LogConfig,

    /// What to do when the watched directory changes.
    pub reload: ReloadConfig,

    /// Detaching from the controlling terminal.
    pub daemon: DaemonConfig,
}

/// Log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file, appended to. `None` or `-` means standard error.
    pub file: Option<PathBuf>,

    /// Minimum level written to the sink.
    pub level: LogLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: LogLevel::Info,
        }
    }
}

/// How a coalesced batch is turned into a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    /// Run the check command and signal only if it passes.
    #[default]
    Validate,
    /// Signal right away; the target validates on its own.
    Direct,
}

/// Reload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Reload policy.
    pub policy: ReloadPolicy,

    /// Shell command checking the target's configuration.
    pub check_command: String,

    /// Byte budget of the space-joined summary of changed names.
    pub summary_capacity: usize,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            policy: ReloadPolicy::Validate,
            check_command: DEFAULT_CHECK_COMMAND.to_string(),
            summary_capacity: DEFAULT_SUMMARY_CAPACITY,
        }
    }
}

/// Daemonization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Fork into the background before watching.
    pub detach: bool,

    /// Also point standard error at `/dev/null` in the daemon.
    pub redirect_stderr: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            detach: true,
            redirect_stderr: true,
        }
    }
}
