//! End-to-end reload decisions with a real watch and a real target process.

use std::fs;
use std::path::Path;

use reload_notifier::actuator::{
    Actuator, CommandValidator, Outcome, ProcessTarget, ReloadHandler, ReloadTarget,
};
use reload_notifier::config::ReloadPolicy;
use reload_notifier::watch::{open_watch, Coalescer};
use reload_notifier::{Logger, NotifierError};

mod common;

use common::DummyDaemon;

fn handler(dir: &Path, policy: ReloadPolicy, check: &str, pid: u32, logger: &Logger) -> ReloadHandler {
    let target = ProcessTarget::probe(pid as i32).unwrap();
    let actuator = Actuator::new(
        policy,
        Box::new(CommandValidator::new(check)),
        Some(Box::new(target) as Box<dyn ReloadTarget>),
        logger,
    );
    ReloadHandler::new(open_watch(dir).unwrap(), Coalescer::new(4096), actuator)
}

#[test]
fn test_direct_policy_sends_one_sighup_for_two_files() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, log) = common::file_logger(logs.path());
    let _guard = logger.install();
    let server = DummyDaemon::start(logs.path());

    let mut handler = handler(watched.path(), ReloadPolicy::Direct, "false", server.pid(), &logger);
    fs::write(watched.path().join("a.conf"), "a").unwrap();
    fs::write(watched.path().join("b.conf"), "b").unwrap();

    assert_eq!(handler.handle().unwrap(), Outcome::Signaled);
    assert_eq!(server.settle(1), 1);

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("a.conf b.conf"));
    assert_eq!(text.matches("sent SIGHUP").count(), 1);
}

#[test]
fn test_sender_pid_is_reported_by_target() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, _log) = common::file_logger(logs.path());
    let server = DummyDaemon::start(logs.path());

    let mut handler = handler(watched.path(), ReloadPolicy::Direct, "true", server.pid(), &logger);
    fs::write(watched.path().join("a.conf"), "a").unwrap();
    assert_eq!(handler.handle().unwrap(), Outcome::Signaled);

    let expected = format!("{} {}", common::RECEIVED_SIGHUP, std::process::id());
    assert!(common::wait_for(&server.log, &expected, std::time::Duration::from_secs(5)));
}

#[test]
fn test_each_batch_is_one_delivery() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, _log) = common::file_logger(logs.path());
    let server = DummyDaemon::start(logs.path());

    let mut handler = handler(watched.path(), ReloadPolicy::Direct, "true", server.pid(), &logger);

    fs::write(watched.path().join("a.conf"), "a").unwrap();
    fs::write(watched.path().join("a.conf"), "again").unwrap();
    assert_eq!(handler.handle().unwrap(), Outcome::Signaled);
    assert_eq!(server.settle(1), 1);

    fs::write(watched.path().join("b.conf"), "b").unwrap();
    assert_eq!(handler.handle().unwrap(), Outcome::Signaled);
    assert_eq!(server.settle(2), 2);
}

#[test]
fn test_passing_check_signals_target() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, log) = common::file_logger(logs.path());
    let _guard = logger.install();
    let server = DummyDaemon::start(logs.path());

    let mut handler = handler(
        watched.path(),
        ReloadPolicy::Validate,
        "echo 'Syntax OK'",
        server.pid(),
        &logger,
    );
    fs::write(watched.path().join("a.conf"), "a").unwrap();

    assert_eq!(handler.handle().unwrap(), Outcome::Signaled);
    assert_eq!(server.settle(1), 1);
    assert!(fs::read_to_string(&log).unwrap().contains("Syntax OK"));
}

#[test]
fn test_failing_check_leaves_target_alone() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, log) = common::file_logger(logs.path());
    let _guard = logger.install();
    let server = DummyDaemon::start(logs.path());

    let mut handler = handler(watched.path(), ReloadPolicy::Validate, "exit 1", server.pid(), &logger);
    fs::write(watched.path().join("a.conf"), "broken").unwrap();

    assert_eq!(handler.handle().unwrap(), Outcome::Rejected);
    assert_eq!(server.settle(0), 0);
    assert_eq!(common::count_level(&log, "warn"), 1);
}

#[test]
fn test_missing_check_command_is_fatal() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, _log) = common::file_logger(logs.path());
    let _guard = logger.install();
    let server = DummyDaemon::start(logs.path());

    let mut handler = handler(
        watched.path(),
        ReloadPolicy::Validate,
        "reload-notifier-missing-checker",
        server.pid(),
        &logger,
    );
    fs::write(watched.path().join("a.conf"), "a").unwrap();

    let err = handler.handle().unwrap_err();
    assert!(matches!(err, NotifierError::Spawn { .. }));
    assert_eq!(server.settle(0), 0);
}

#[test]
fn test_nothing_new_means_no_action() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, _log) = common::file_logger(logs.path());
    let server = DummyDaemon::start(logs.path());

    let mut handler = handler(watched.path(), ReloadPolicy::Direct, "true", server.pid(), &logger);
    assert_eq!(handler.handle().unwrap(), Outcome::Idle);
    assert_eq!(server.settle(0), 0);
}

#[test]
fn test_vanished_target_is_fatal_on_signal() {
    let watched = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let (logger, _log) = common::file_logger(logs.path());
    let mut server = DummyDaemon::start(logs.path());

    let mut handler = handler(watched.path(), ReloadPolicy::Direct, "true", server.pid(), &logger);
    server.stop();

    fs::write(watched.path().join("a.conf"), "a").unwrap();
    let err = handler.handle().unwrap_err();
    assert!(matches!(err, NotifierError::Signal { .. }));
}
