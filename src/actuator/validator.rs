//! External configuration check.

use std::process::{Command, ExitStatus, Stdio};

use crate::error::{NotifierError, Result};
use crate::observability::LogSink;

/// Exit status `sh` uses for a command it cannot find.
const EXIT_NOT_FOUND: i32 = 127;

/// Something that can tell whether the target's configuration is loadable.
pub trait Validator {
    /// `Ok(())` when the configuration is valid, `ConfigInvalid` when it is
    /// not, any other error when the check itself could not run.
    fn check(&mut self, sink: &LogSink) -> Result<()>;
}

/// Runs a shell command with stdout and stderr appended to the log sink.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    command: String,
}

impl CommandValidator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Validator for CommandValidator {
    fn check(&mut self, sink: &LogSink) -> Result<()> {
        let stdout = sink
            .stdio()
            .map_err(|e| NotifierError::resource("dup log sink for validator stdout", e))?;
        let stderr = sink
            .stdio()
            .map_err(|e| NotifierError::resource("dup log sink for validator stderr", e))?;

        tracing::debug!(command = %self.command, "running sh -c");
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .map_err(|e| NotifierError::Spawn {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        interpret(&self.command, status)
    }
}

/// Map a validator exit status onto the reload decision.
///
/// 0 is valid, 127 means the command could not be found and is fatal, and
/// any other outcome (other exit codes, death by signal) is an invalid
/// configuration.
pub fn interpret(command: &str, status: ExitStatus) -> Result<()> {
    match status.code() {
        Some(0) => Ok(()),
        Some(EXIT_NOT_FOUND) => Err(NotifierError::Spawn {
            command: command.to_string(),
            reason: "command not found (exit status 127)".to_string(),
        }),
        Some(code) => Err(NotifierError::ConfigInvalid {
            status: code.to_string(),
        }),
        None => Err(NotifierError::ConfigInvalid {
            status: status.to_string(),
        }),
    }
}
