//! Readiness dispatch.
//!
//! # Data Flow
//! ```text
//! startup: PollSet::new(handlers) → every fd forced to O_NONBLOCK
//!
//! loop:
//!     poll(fds, infinite timeout)
//!     → for each fd with POLLIN: handler.on_ready()
//!     → a handler error ends the loop (and the process)
//! ```
//!
//! # Design Decisions
//! - Single thread, fixed handler set, no registration after startup
//! - Never times out, so an idle watcher costs no CPU
//! - Error, hang-up or invalid fd without POLLIN is fatal instead of
//!   being polled again in a tight loop

pub mod poll_set;

pub use poll_set::{PollSet, ReadyHandler};
