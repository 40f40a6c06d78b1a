//! Shared utilities for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use reload_notifier::observability::{LogLevel, LogSink, Logger};

/// Message the dummy daemon logs for every SIGHUP it receives.
#[allow(dead_code)]
pub const RECEIVED_SIGHUP: &str = "Received SIGHUP from";

/// A debug-level logger writing to `notifier.log` inside `dir`.
#[allow(dead_code)]
pub fn file_logger(dir: &Path) -> (Logger, PathBuf) {
    let path = dir.join("notifier.log");
    let sink = LogSink::open(&path).unwrap();
    (Logger::with_program("notifier", sink, LogLevel::Debug), path)
}

/// A foreground `dummy-daemon`, killed on drop.
#[allow(dead_code)]
pub struct DummyDaemon {
    pub child: Child,
    pub log: PathBuf,
}

#[allow(dead_code)]
impl DummyDaemon {
    /// Start the daemon in `dir` and wait until it is ready for signals.
    pub fn start(dir: &Path) -> Self {
        let log = dir.join("dummy-daemon.log");
        let child = Command::new(env!("CARGO_BIN_EXE_dummy-daemon"))
            .arg("--foreground")
            .arg("--logs")
            .arg(&log)
            .stdin(Stdio::null())
            .spawn()
            .unwrap();
        let daemon = Self { child, log };
        assert!(
            wait_for(&daemon.log, "waiting for SIGHUP", Duration::from_secs(5)),
            "dummy-daemon never became ready"
        );
        daemon
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// SIGHUP deliveries logged so far.
    pub fn received(&self) -> usize {
        count_matches(&self.log, RECEIVED_SIGHUP)
    }

    /// Wait until `expected` deliveries are logged, then linger briefly so
    /// that a surplus delivery would be seen too.
    pub fn settle(&self, expected: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.received() < expected && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        std::thread::sleep(Duration::from_millis(200));
        self.received()
    }

    /// Kill the daemon and reap it.
    pub fn stop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for DummyDaemon {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poll `log` until it contains `needle` or `timeout` passes.
#[allow(dead_code)]
pub fn wait_for(log: &Path, needle: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if std::fs::read_to_string(log)
            .unwrap_or_default()
            .contains(needle)
        {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Count lines of `log` containing `needle`.
#[allow(dead_code)]
pub fn count_matches(log: &Path, needle: &str) -> usize {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .filter(|line| line.contains(needle))
        .count()
}

/// Count log lines at a given level label, e.g. `"warn"`.
#[allow(dead_code)]
pub fn count_level(log: &Path, level: &str) -> usize {
    count_matches(log, &format!("({level})"))
}

/// Poll `child` until it exits or `timeout` passes.
#[allow(dead_code)]
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    None
}
