//! Coalescing of one drain worth of events into a single summary.
//!
//! Everything readable from the inotify descriptor at wake-up time is
//! drained, and the distinct entry names are joined with single spaces into
//! a bounded summary. Names are compared as raw bytes, so two names that are
//! not valid UTF-8 stay distinct. A name is a duplicate when it already
//! occurs in the summary followed by a space or the end of the text. The
//! left side is not checked, so `b.conf` arriving after `ab.conf` counts as
//! a duplicate, and a name containing a space can match across two entries.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::inotify::AddWatchFlags;

use crate::error::{NotifierError, Result};
use crate::watch::event::{EventRecords, RawEventRecord};
use crate::watch::registrar::WatchHandle;

/// Size of a single read from the inotify descriptor.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Outcome of offering a name to a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Added,
    Duplicate,
}

/// Space-joined, deduplicated names with a hard byte budget.
#[derive(Debug, Clone)]
pub struct Summary {
    bytes: Vec<u8>,
    capacity: usize,
}

impl Summary {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The summary for display. Bytes that are not UTF-8 are replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes still available, separators included.
    pub fn remaining(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    /// Whether `name` already occurs, ending on a space or the end of text.
    pub fn contains(&self, name: impl AsRef<OsStr>) -> bool {
        let hay = self.bytes.as_slice();
        let needle = name.as_ref().as_bytes();
        if needle.is_empty() || needle.len() > hay.len() {
            return false;
        }
        hay.windows(needle.len()).enumerate().any(|(at, window)| {
            let end = at + needle.len();
            window == needle && (end == hay.len() || hay[end] == b' ')
        })
    }

    /// Append `name` unless it is already present.
    ///
    /// A name that does not fit is refused with `CapacityExceeded` and the
    /// summary is left unchanged.
    pub fn push(&mut self, name: impl AsRef<OsStr>) -> Result<Appended> {
        let name = name.as_ref();
        if self.contains(name) {
            return Ok(Appended::Duplicate);
        }

        let separator = usize::from(!self.bytes.is_empty());
        if name.len() + separator > self.remaining() {
            return Err(NotifierError::CapacityExceeded {
                name: name.to_string_lossy().into_owned(),
                capacity: self.capacity,
            });
        }

        if separator == 1 {
            self.bytes.push(b' ');
        }
        self.bytes.extend_from_slice(name.as_bytes());
        Ok(Appended::Added)
    }
}

/// The distinct names seen in one drain of the event queue.
#[derive(Debug, Clone)]
pub struct CoalescedBatch {
    summary: Summary,
    names: Vec<OsString>,
    overflowed: bool,
    records: usize,
}

impl CoalescedBatch {
    pub fn new(capacity: usize) -> Self {
        Self {
            summary: Summary::with_capacity(capacity),
            names: Vec::new(),
            overflowed: false,
            records: 0,
        }
    }

    /// True when nothing new was observed and no events were lost.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && !self.overflowed
    }

    pub fn summary(&self) -> Cow<'_, str> {
        self.summary.text()
    }

    /// Names in first-seen order, exactly as the kernel reported them.
    pub fn names(&self) -> impl Iterator<Item = &OsStr> {
        self.names.iter().map(OsString::as_os_str)
    }

    /// Whether the kernel reported a queue overflow during this drain.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Number of raw records folded into this batch.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Fold one decoded record into the batch.
    ///
    /// Fails only when the kernel has dropped the watch on `tracked`.
    pub fn absorb(&mut self, record: &RawEventRecord<'_>, tracked: &Path) -> Result<()> {
        self.records += 1;

        if record.mask.contains(AddWatchFlags::IN_Q_OVERFLOW) {
            tracing::warn!("inotify queue overflowed, some changes were not itemized");
            self.overflowed = true;
            return Ok(());
        }

        if record.mask.contains(AddWatchFlags::IN_IGNORED) {
            return Err(NotifierError::Watch {
                path: tracked.to_path_buf(),
                reason: "watch removed by the kernel (directory deleted or unmounted)".to_string(),
            });
        }

        let Some(name) = record.name() else {
            return Ok(());
        };

        match self.summary.push(name) {
            Ok(Appended::Added) => self.names.push(name.to_os_string()),
            Ok(Appended::Duplicate) => {
                tracing::debug!(name = %name.to_string_lossy(), mask = ?record.mask, "already coalesced, skipping");
            }
            Err(err) => {
                tracing::warn!(error = %err, "summary full, dropping event");
            }
        }
        Ok(())
    }
}

/// Drains a watch handle into coalesced batches.
pub struct Coalescer {
    capacity: usize,
    buf: Box<[u8]>,
}

impl Coalescer {
    /// `capacity` is the byte budget of each batch's summary.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Read until the queue is empty and coalesce what was read.
    ///
    /// Any read failure other than `EAGAIN`/`EINTR`, and any malformed
    /// record, is fatal.
    pub fn drain_and_coalesce(&mut self, handle: &WatchHandle) -> Result<CoalescedBatch> {
        let mut batch = CoalescedBatch::new(self.capacity);

        loop {
            let len = match handle.read(&mut self.buf) {
                Ok(0) | Err(Errno::EAGAIN) => break,
                Ok(len) => len,
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    return Err(NotifierError::resource(
                        format!("read({}, {} bytes)", handle.path().display(), self.buf.len()),
                        errno,
                    ))
                }
            };

            for record in EventRecords::new(&self.buf[..len]) {
                batch.absorb(&record?, handle.path())?;
            }
        }

        tracing::debug!(
            records = batch.records(),
            summary = %batch.summary(),
            "drained inotify queue"
        );
        Ok(batch)
    }
}
