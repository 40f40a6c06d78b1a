//! Directory watching subsystem.
//!
//! # Data Flow
//! ```text
//! registrar.rs: open_watch(path) → WatchHandle (inotify fd, non-blocking)
//!
//! On readiness:
//!     coalesce.rs drains the fd until EAGAIN
//!     → event.rs decodes each read into RawEventRecords
//!     → names deduplicated into one CoalescedBatch
//! ```
//!
//! # Design Decisions
//! - One directory, immediate children only
//! - A batch covers exactly one drain; nothing carries over between wake-ups
//! - Overflowing the summary drops names with a warning, never fails

pub mod coalesce;
pub mod event;
pub mod registrar;

pub use coalesce::{CoalescedBatch, Coalescer, Summary};
pub use event::{EventRecords, RawEventRecord};
pub use registrar::{open_watch, WatchHandle};
