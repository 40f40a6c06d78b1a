//! Startup orchestration.
//!
//! # Responsibilities
//! - Probe the target process
//! - Register the watch
//! - Daemonize
//! - Assemble the reload handler and enter the dispatch loop
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The watch is registered before forking, so a bad path fails in the
//!   foreground process with a non-zero exit status; the inotify descriptor
//!   is inherited by the daemon
//! - Steps run in order, never concurrently

use std::convert::Infallible;
use std::path::PathBuf;

use crate::actuator::{Actuator, CommandValidator, ProcessTarget, ReloadHandler, ReloadTarget};
use crate::config::NotifierConfig;
use crate::dispatch::PollSet;
use crate::error::Result;
use crate::lifecycle::daemon::{daemonize, DaemonOptions};
use crate::lifecycle::sync_fork::Forked;
use crate::observability::Logger;
use crate::watch::{open_watch, Coalescer};

/// Everything the watcher needs, resolved from file and command line.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory to watch.
    pub path: PathBuf,
    /// Process to reload, if any.
    pub target_pid: Option<i32>,
    pub config: NotifierConfig,
}

/// Run the watcher. Returns only with a fatal error.
pub fn run(settings: Settings, logger: &Logger) -> Result<Infallible> {
    let Settings {
        path,
        target_pid,
        config,
    } = settings;

    let target = target_pid.map(ProcessTarget::probe).transpose()?;
    if let Some(target) = &target {
        tracing::debug!(pid = %target.pid(), "target process is alive");
    }

    let watch = open_watch(&path)?;

    if config.daemon.detach {
        if let Forked::Parent { .. } = daemonize(DaemonOptions::from(&config.daemon))? {
            // The daemon owns the watch from here on.
            std::process::exit(0);
        }
    }

    tracing::info!(
        path = %path.display(),
        policy = ?config.reload.policy,
        "watching for configuration changes"
    );

    let actuator = Actuator::new(
        config.reload.policy,
        Box::new(CommandValidator::new(config.reload.check_command)),
        target.map(|t| Box::new(t) as Box<dyn ReloadTarget>),
        logger,
    );
    let handler = ReloadHandler::new(watch, Coalescer::new(config.reload.summary_capacity), actuator);

    PollSet::new(vec![Box::new(handler)])?.run()
}
