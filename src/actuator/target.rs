//! The process asked to reload.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::error::{NotifierError, Result};

/// Receiver of reload requests.
pub trait ReloadTarget {
    /// Ask the target to reload its configuration.
    fn reload(&mut self) -> Result<()>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// A live process, reloaded with `SIGHUP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTarget {
    pid: Pid,
}

impl ProcessTarget {
    /// Check that `pid` names a process we may signal, without signaling it.
    ///
    /// This is the only liveness check; later reloads signal directly.
    pub fn probe(pid: i32) -> Result<Self> {
        if pid <= 0 {
            return Err(NotifierError::InvalidTarget {
                pid,
                reason: "pid must be a positive number".to_string(),
            });
        }

        let pid = Pid::from_raw(pid);
        kill(pid, None).map_err(|errno| NotifierError::InvalidTarget {
            pid: pid.as_raw(),
            reason: errno.desc().to_string(),
        })?;

        Ok(Self { pid })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }
}

impl ReloadTarget for ProcessTarget {
    fn reload(&mut self) -> Result<()> {
        kill(self.pid, Signal::SIGHUP).map_err(|errno| NotifierError::Signal {
            pid: self.pid,
            source: errno.into(),
        })
    }

    fn describe(&self) -> String {
        format!("PID #{}", self.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_pids() {
        assert!(matches!(
            ProcessTarget::probe(0),
            Err(NotifierError::InvalidTarget { pid: 0, .. })
        ));
        assert!(matches!(
            ProcessTarget::probe(-1),
            Err(NotifierError::InvalidTarget { pid: -1, .. })
        ));
    }

    #[test]
    fn own_process_is_alive() {
        let me = std::process::id() as i32;
        let target = ProcessTarget::probe(me).unwrap();
        assert_eq!(target.pid().as_raw(), me);
        assert_eq!(target.describe(), format!("PID #{me}"));
    }

    #[test]
    fn reaped_child_is_not_alive() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id() as i32;
        child.wait().unwrap();

        assert!(matches!(
            ProcessTarget::probe(pid),
            Err(NotifierError::InvalidTarget { .. })
        ));
    }
}
