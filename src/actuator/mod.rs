//! Reload actuation.
//!
//! # Data Flow
//! ```text
//! CoalescedBatch (non-empty)
//!     → policy = validate: validator.rs runs the check command
//!         → exit 0      → target.rs sends SIGHUP
//!         → exit 1..126 → warning, nothing sent, keep watching
//!         → 127 / spawn → fatal
//!     → policy = direct: target.rs sends SIGHUP
//! ```
//!
//! # Design Decisions
//! - Only SIGHUP is ever sent
//! - A target that cannot be signaled is fatal; the watcher has no other job
//! - Validator and target are traits so the decision logic can be exercised
//!   without spawning processes

pub mod handler;
pub mod target;
pub mod validator;

pub use handler::ReloadHandler;
pub use target::{ProcessTarget, ReloadTarget};
pub use validator::{CommandValidator, Validator};

use crate::config::ReloadPolicy;
use crate::error::Result;
use crate::observability::{LogSink, Logger};
use crate::watch::CoalescedBatch;

/// What the actuator did with one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing new in the batch.
    Idle,
    /// The check command rejected the configuration.
    Rejected,
    /// The target was signaled.
    Signaled,
    /// The change was accepted but no target is configured.
    NoTarget,
}

/// Applies the configured reload policy to coalesced batches.
pub struct Actuator {
    policy: ReloadPolicy,
    validator: Box<dyn Validator>,
    target: Option<Box<dyn ReloadTarget>>,
    sink: LogSink,
}

impl Actuator {
    pub fn new(
        policy: ReloadPolicy,
        validator: Box<dyn Validator>,
        target: Option<Box<dyn ReloadTarget>>,
        logger: &Logger,
    ) -> Self {
        Self {
            policy,
            validator,
            target,
            sink: logger.sink().clone(),
        }
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    /// React to one batch. Recoverable failures are logged and reported as
    /// an outcome; only fatal errors are returned.
    pub fn act(&mut self, batch: &CoalescedBatch) -> Result<Outcome> {
        if batch.is_empty() {
            tracing::debug!("nothing new in this batch");
            return Ok(Outcome::Idle);
        }

        tracing::info!(names = %batch.summary(), "changes detected");

        if self.policy == ReloadPolicy::Validate {
            tracing::info!("Checking config files:");
            match self.validator.check(&self.sink) {
                Ok(()) => {}
                Err(err) if !err.is_fatal() => {
                    tracing::warn!(error = %err, "Error found in config file. Please fix it");
                    return Ok(Outcome::Rejected);
                }
                Err(err) => return Err(err),
            }
        }

        match self.target.as_mut() {
            Some(target) => {
                target.reload()?;
                tracing::info!(process = %target.describe(), "sent SIGHUP");
                Ok(Outcome::Signaled)
            }
            None => {
                tracing::info!("no target process configured, nothing to signal");
                Ok(Outcome::NoTarget)
            }
        }
    }
}
