//! inotify watch registration.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};

use crate::error::{NotifierError, Result};

/// Events reported for the immediate children of the watched directory.
pub fn watch_mask() -> AddWatchFlags {
    AddWatchFlags::IN_CREATE
        | AddWatchFlags::IN_MODIFY
        | AddWatchFlags::IN_DELETE
        | AddWatchFlags::IN_MOVED_FROM
        | AddWatchFlags::IN_MOVED_TO
        | AddWatchFlags::IN_ONLYDIR
        // nix has no named constant for this one.
        | AddWatchFlags::from_bits_retain(nix::libc::IN_EXCL_UNLINK)
}

/// An inotify instance with a single directory watch on it.
///
/// Closing happens on drop.
#[derive(Debug)]
pub struct WatchHandle {
    inotify: Inotify,
    path: PathBuf,
}

impl WatchHandle {
    /// The watched directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read raw event bytes. Fails with `EAGAIN` once the queue is empty.
    pub fn read(&self, buf: &mut [u8]) -> nix::Result<usize> {
        nix::unistd::read(self.inotify.as_fd().as_raw_fd(), buf)
    }
}

impl AsFd for WatchHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inotify.as_fd()
    }
}

/// Start watching `path` for entries being created, written, deleted or
/// renamed in or out.
pub fn open_watch(path: &Path) -> Result<WatchHandle> {
    let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC)
        .map_err(|errno| NotifierError::resource("inotify_init1", errno))?;

    // On failure `inotify` is dropped here, releasing the instance.
    inotify
        .add_watch(path, watch_mask())
        .map_err(|errno| NotifierError::Watch {
            path: path.to_path_buf(),
            reason: errno.desc().to_string(),
        })?;

    tracing::debug!(path = %path.display(), fd = inotify.as_fd().as_raw_fd(), "inotify watch added");

    Ok(WatchHandle {
        inotify,
        path: path.to_path_buf(),
    })
}
