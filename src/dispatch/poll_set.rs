//! Fixed-size `poll(2)` loop.

use std::convert::Infallible;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::error::{NotifierError, Result};

/// A descriptor plus whatever runs when it becomes readable. The handler's
/// own fields carry any per-descriptor context.
pub trait ReadyHandler: AsFd {
    /// Called once per wake-up in which the descriptor is readable.
    /// Returning an error stops the dispatcher.
    fn on_ready(&mut self) -> Result<()>;
}

/// The set of handlers served by the dispatch loop.
pub struct PollSet {
    handlers: Vec<Box<dyn ReadyHandler>>,
}

impl PollSet {
    /// Take ownership of `handlers` and put their descriptors in
    /// non-blocking mode.
    pub fn new(handlers: Vec<Box<dyn ReadyHandler>>) -> Result<Self> {
        for handler in &handlers {
            set_nonblocking(handler.as_fd())?;
        }
        Ok(Self { handlers })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Serve readiness until a handler or the wait itself fails.
    pub fn run(mut self) -> Result<Infallible> {
        tracing::debug!(descriptors = self.handlers.len(), "entering dispatch loop");
        loop {
            for idx in self.wait()? {
                self.handlers[idx].on_ready()?;
            }
        }
    }

    /// Block until at least one descriptor is ready; return the readable ones.
    fn wait(&self) -> Result<Vec<usize>> {
        let mut fds: Vec<PollFd<'_>> = self
            .handlers
            .iter()
            .map(|handler| PollFd::new(handler.as_fd(), PollFlags::POLLIN))
            .collect();

        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => break,
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(NotifierError::resource("poll", errno)),
            }
        }

        let mut ready = Vec::with_capacity(fds.len());
        for (idx, fd) in fds.iter().enumerate() {
            let revents = fd.revents().unwrap_or_else(PollFlags::empty);
            if revents.contains(PollFlags::POLLIN) {
                ready.push(idx);
            } else if revents.intersects(PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL) {
                return Err(NotifierError::resource(
                    format!("poll(fd {})", self.handlers[idx].as_fd().as_raw_fd()),
                    io::Error::other(format!("descriptor reported {revents:?}")),
                ));
            }
        }
        Ok(ready)
    }
}

fn set_nonblocking(fd: BorrowedFd<'_>) -> Result<()> {
    let raw = fd.as_raw_fd();
    let flags = fcntl(raw, FcntlArg::F_GETFL)
        .map_err(|errno| NotifierError::resource(format!("fcntl({raw}, F_GETFL)"), errno))?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(raw, FcntlArg::F_SETFL(flags))
        .map_err(|errno| NotifierError::resource(format!("fcntl({raw}, F_SETFL)"), errno))?;
    Ok(())
}
