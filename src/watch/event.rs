//! Decoding of raw inotify records.
//!
//! The kernel packs variable-length records back to back:
//!
//! ```text
//! | wd: i32 | mask: u32 | cookie: u32 | len: u32 | name: [u8; len] |
//! ```
//!
//! `name` is NUL padded and `len` may be zero. `EventRecords` walks a read
//! buffer record by record, checking every header and name against the end
//! of the buffer.

use std::ffi::OsStr;
use std::iter::FusedIterator;
use std::os::unix::ffi::OsStrExt;

use nix::sys::inotify::AddWatchFlags;

/// Size of the fixed part of `struct inotify_event`.
pub const HEADER_SIZE: usize = 16;

/// A record that does not fit the buffer it was read into.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{available} bytes left at offset {offset}, header needs {HEADER_SIZE}")]
    TruncatedHeader { offset: usize, available: usize },

    #[error("name of {len} bytes at offset {offset} runs past the end of a {total}-byte buffer")]
    NameOutOfBounds { offset: usize, len: usize, total: usize },
}

/// One decoded kernel event, borrowing its name from the read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEventRecord<'a> {
    pub wd: i32,
    pub mask: AddWatchFlags,
    pub cookie: u32,
    name: &'a [u8],
}

impl<'a> RawEventRecord<'a> {
    /// Affected entry of the watched directory, if the event carries one.
    pub fn name(&self) -> Option<&'a OsStr> {
        if self.name.is_empty() {
            None
        } else {
            Some(OsStr::from_bytes(self.name))
        }
    }
}

/// Lazy iterator over the records of one read.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug)]
pub struct EventRecords<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> EventRecords<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            failed: false,
        }
    }

    fn fail(&mut self, err: DecodeError) -> Option<Result<RawEventRecord<'a>, DecodeError>> {
        self.failed = true;
        Some(Err(err))
    }
}

fn word(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

impl<'a> Iterator for EventRecords<'a> {
    type Item = Result<RawEventRecord<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }

        let rest = &self.buf[self.offset..];
        if rest.len() < HEADER_SIZE {
            return self.fail(DecodeError::TruncatedHeader {
                offset: self.offset,
                available: rest.len(),
            });
        }

        let wd = i32::from_ne_bytes(word(rest, 0));
        let mask = u32::from_ne_bytes(word(rest, 4));
        let cookie = u32::from_ne_bytes(word(rest, 8));
        let len = u32::from_ne_bytes(word(rest, 12)) as usize;

        let end = match HEADER_SIZE.checked_add(len) {
            Some(end) if end <= rest.len() => end,
            _ => {
                return self.fail(DecodeError::NameOutOfBounds {
                    offset: self.offset,
                    len,
                    total: self.buf.len(),
                })
            }
        };

        let padded = &rest[HEADER_SIZE..end];
        let name = match padded.iter().position(|&b| b == 0) {
            Some(nul) => &padded[..nul],
            None => padded,
        };

        self.offset += end;
        Some(Ok(RawEventRecord {
            wd,
            mask: AddWatchFlags::from_bits_truncate(mask),
            cookie,
            name,
        }))
    }
}

impl FusedIterator for EventRecords<'_> {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a record the way the kernel lays it out, name padded to 16.
    pub(crate) fn record(wd: i32, mask: AddWatchFlags, cookie: u32, name: impl AsRef<[u8]>) -> Vec<u8> {
        let name = name.as_ref();
        let padded_len = if name.is_empty() {
            0
        } else {
            (name.len() + 1).div_ceil(HEADER_SIZE) * HEADER_SIZE
        };
        let mut out = Vec::with_capacity(HEADER_SIZE + padded_len);
        out.extend_from_slice(&wd.to_ne_bytes());
        out.extend_from_slice(&mask.bits().to_ne_bytes());
        out.extend_from_slice(&cookie.to_ne_bytes());
        out.extend_from_slice(&(padded_len as u32).to_ne_bytes());
        out.extend_from_slice(name);
        out.resize(HEADER_SIZE + padded_len, 0);
        out
    }

    #[test]
    fn decodes_consecutive_records() {
        let mut buf = record(1, AddWatchFlags::IN_CREATE, 0, "a.conf");
        buf.extend(record(1, AddWatchFlags::IN_MOVED_TO, 42, "a-much-longer-name.conf"));

        let records: Vec<_> = EventRecords::new(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), Some(OsStr::new("a.conf")));
        assert_eq!(records[0].mask, AddWatchFlags::IN_CREATE);
        assert_eq!(records[1].cookie, 42);
        assert_eq!(records[1].name(), Some(OsStr::new("a-much-longer-name.conf")));
    }

    #[test]
    fn nameless_record_has_no_name() {
        let buf = record(-1, AddWatchFlags::IN_Q_OVERFLOW, 0, "");
        let rec = EventRecords::new(&buf).next().unwrap().unwrap();
        assert_eq!(rec.wd, -1);
        assert!(rec.name().is_none());
    }

    #[test]
    fn truncated_header_stops_iteration() {
        let mut buf = record(1, AddWatchFlags::IN_MODIFY, 0, "a.conf");
        buf.extend_from_slice(&[0u8; 7]);

        let mut records = EventRecords::new(&buf);
        assert!(records.next().unwrap().is_ok());
        assert_eq!(
            records.next(),
            Some(Err(DecodeError::TruncatedHeader {
                offset: 32,
                available: 7
            }))
        );
        assert_eq!(records.next(), None);
    }

    #[test]
    fn name_past_end_is_rejected() {
        let mut buf = record(1, AddWatchFlags::IN_DELETE, 0, "a.conf");
        buf.truncate(20);

        let mut records = EventRecords::new(&buf);
        assert!(matches!(
            records.next(),
            Some(Err(DecodeError::NameOutOfBounds { len: 16, .. }))
        ));
        assert!(records.next().is_none());
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        assert_eq!(EventRecords::new(&[]).count(), 0);
    }
}
