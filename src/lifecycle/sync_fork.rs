//! `fork(2)` with a child-first ordering guarantee.
//!
//! The barrier is a close-on-exec pipe shared by both processes. The child
//! writes one byte after its routine; the parent blocks on reading it before
//! running its own. If the child dies first, the parent reads end-of-file
//! instead and never runs its routine.

use std::fs::File;
use std::io::{self, Read, Write};

use nix::fcntl::OFlag;
use nix::unistd::{fork, pipe2, ForkResult, Pid};

use crate::error::{NotifierError, Result};

/// Which side of a successful [`synchronized_fork`] the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forked {
    /// The original process; `child` already finished its routine.
    Parent { child: Pid },
    /// The new process.
    Child,
}

/// One-shot "child signals, parent waits" barrier.
#[derive(Debug)]
pub struct SyncBarrier {
    reader: File,
    writer: File,
}

impl SyncBarrier {
    pub fn new() -> Result<Self> {
        let (reader, writer) = pipe2(OFlag::O_CLOEXEC)
            .map_err(|errno| NotifierError::resource("pipe2(O_CLOEXEC)", errno))?;
        Ok(Self {
            reader: File::from(reader),
            writer: File::from(writer),
        })
    }

    /// Child side: release the parent. Consumes this end of the barrier.
    pub fn release(self) {
        let Self { reader, mut writer } = self;
        drop(reader);
        if let Err(err) = writer.write_all(&[1]) {
            tracing::warn!(error = %err, "failed to release fork barrier");
        }
    }

    /// Parent side: block until `child` releases the barrier.
    pub fn wait(self, child: Pid) -> Result<()> {
        let Self { mut reader, writer } = self;
        // Our copy of the write end must be gone, or a dead child would
        // never produce end-of-file.
        drop(writer);

        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(1) => return Ok(()),
                Ok(_) => return Err(NotifierError::BarrierBroken { pid: child }),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(NotifierError::resource("read fork barrier", err)),
            }
        }
    }
}

/// Fork, run `child` in the new process, and only then run `parent` in the
/// original one.
///
/// If the barrier cannot be set up or `fork` fails, neither routine runs.
/// Both processes return from this call; the barrier is closed on both
/// sides by then.
pub fn synchronized_fork<P, C>(parent: P, child: C) -> Result<Forked>
where
    P: FnOnce(Pid),
    C: FnOnce(),
{
    let barrier = SyncBarrier::new()?;

    // SAFETY: the watcher forks while single-threaded, before the dispatch
    // loop starts; the child only runs `child` and returns.
    match unsafe { fork() } {
        Err(errno) => Err(NotifierError::resource("fork", errno)),
        Ok(ForkResult::Child) => {
            child();
            barrier.release();
            Ok(Forked::Child)
        }
        Ok(ForkResult::Parent { child: pid }) => {
            barrier.wait(pid)?;
            parent(pid);
            Ok(Forked::Parent { child: pid })
        }
    }
}
