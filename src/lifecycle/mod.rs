//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Probe target → Register watch → Daemonize → Dispatch loop
//!
//! Daemonize (daemon.rs):
//!     synchronized_fork:
//!         child:  setsid → stdio onto /dev/null → release barrier
//!         parent: wait on barrier → log daemon pid → caller exits 0
//!
//! Shutdown:
//!     none; any fatal error is logged and the process exits 1
//! ```
//!
//! # Design Decisions
//! - Crash-only: no retries, an external supervisor restarts the watcher
//! - The fork barrier is a pipe, so a child that dies early cannot leave
//!   the parent blocked forever

pub mod daemon;
pub mod startup;
pub mod sync_fork;

pub use daemon::{daemonize, DaemonOptions};
pub use startup::Settings;
pub use sync_fork::{synchronized_fork, Forked, SyncBarrier};
