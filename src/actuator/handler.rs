//! Glue between the dispatcher, the coalescer and the actuator.

use std::os::fd::{AsFd, BorrowedFd};

use crate::actuator::{Actuator, Outcome};
use crate::dispatch::ReadyHandler;
use crate::error::Result;
use crate::watch::{Coalescer, WatchHandle};

/// Owns the watch for the lifetime of the dispatch loop and turns each
/// wake-up into at most one reload.
pub struct ReloadHandler {
    watch: WatchHandle,
    coalescer: Coalescer,
    actuator: Actuator,
}

impl ReloadHandler {
    pub fn new(watch: WatchHandle, coalescer: Coalescer, actuator: Actuator) -> Self {
        Self {
            watch,
            coalescer,
            actuator,
        }
    }

    /// Drain pending events and act on them once.
    pub fn handle(&mut self) -> Result<Outcome> {
        let batch = self.coalescer.drain_and_coalesce(&self.watch)?;
        self.actuator.act(&batch)
    }
}

impl AsFd for ReloadHandler {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.watch.as_fd()
    }
}

impl ReadyHandler for ReloadHandler {
    fn on_ready(&mut self) -> Result<()> {
        self.handle().map(|_| ())
    }
}
