//! Detaching from the controlling terminal.

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;

use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::unistd::{dup2, setsid};

use crate::config::DaemonConfig;
use crate::error::Result;
use crate::lifecycle::sync_fork::{synchronized_fork, Forked};

/// How to daemonize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonOptions {
    /// Point standard error at `/dev/null` too.
    pub redirect_stderr: bool,
}

impl From<&DaemonConfig> for DaemonOptions {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            redirect_stderr: config.redirect_stderr,
        }
    }
}

/// Fork into a new session with standard streams on `/dev/null`.
///
/// The parent is held back until the child has finished detaching, logs
/// the daemon's pid and gets `Forked::Parent` back. Whether it then exits
/// is the caller's decision.
pub fn daemonize(options: DaemonOptions) -> Result<Forked> {
    synchronized_fork(
        |child| tracing::debug!("daemon PID = #{child}"),
        || detach(options.redirect_stderr),
    )
}

/// Best effort: a daemon that fails to detach fully keeps running.
fn detach(redirect_stderr: bool) {
    if let Err(errno) = setsid() {
        tracing::warn!(error = %errno, "setsid failed");
    }

    let null = match OpenOptions::new().read(true).write(true).open("/dev/null") {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(error = %err, "cannot open /dev/null, standard streams left alone");
            return;
        }
    };

    let mut streams = vec![STDIN_FILENO, STDOUT_FILENO];
    if redirect_stderr {
        streams.push(STDERR_FILENO);
    }
    for stream in streams {
        if let Err(errno) = dup2(null.as_raw_fd(), stream) {
            tracing::warn!(fd = stream, error = %errno, "dup2 onto /dev/null failed");
        }
    }
}
