//! Stand-in server for trying the notifier out: daemonizes, then logs every
//! SIGHUP it receives along with the sender's pid. SIGHUP never terminates
//! it.

use std::convert::Infallible;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use nix::errno::Errno;
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};

use reload_notifier::dispatch::{PollSet, ReadyHandler};
use reload_notifier::lifecycle::{daemonize, DaemonOptions, Forked};
use reload_notifier::observability::{LogLevel, LogSink, Logger};
use reload_notifier::{NotifierError, Result};

#[derive(Parser)]
#[command(name = "dummy-daemon", version)]
#[command(about = "Log every SIGHUP received", long_about = None)]
struct Cli {
    /// Log file ("-" for standard error)
    #[arg(short, long, value_name = "FILE")]
    logs: Option<PathBuf>,

    /// Less output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    silent: u8,

    /// Stay in the foreground
    #[arg(short, long)]
    foreground: bool,
}

/// Reads queued SIGHUPs from a signalfd.
struct SighupLogger {
    fd: SignalFd,
}

impl SighupLogger {
    fn new(mask: &SigSet) -> Result<Self> {
        let fd = SignalFd::with_flags(mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
            .map_err(|errno| NotifierError::resource("signalfd(SIGHUP)", errno))?;
        Ok(Self { fd })
    }
}

impl AsFd for SighupLogger {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl ReadyHandler for SighupLogger {
    fn on_ready(&mut self) -> Result<()> {
        loop {
            match self.fd.read_signal() {
                Ok(Some(info)) => tracing::info!("Received SIGHUP from {}", info.ssi_pid),
                Ok(None) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(NotifierError::resource("read(signalfd)", errno)),
            }
        }
    }
}

fn run(cli: &Cli) -> Result<Infallible> {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGHUP);
    // Blocked before forking, so a SIGHUP that arrives while the daemon is
    // still starting stays pending instead of killing it.
    mask.thread_block()
        .map_err(|errno| NotifierError::resource("pthread_sigmask(SIG_BLOCK, SIGHUP)", errno))?;

    if !cli.foreground {
        if let Forked::Parent { .. } = daemonize(DaemonOptions { redirect_stderr: true })? {
            std::process::exit(0);
        }
    }

    let handler = SighupLogger::new(&mask)?;
    tracing::info!("waiting for SIGHUP");
    PollSet::new(vec![Box::new(handler)])?.run()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let sink = match LogSink::from_target(cli.logs.as_deref()) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("dummy-daemon: failed to initialize logs: {err}");
            return ExitCode::FAILURE;
        }
    };
    let logger = Logger::new(sink, LogLevel::Debug.adjusted(i32::from(cli.silent)));
    let _guard = logger.install();

    match run(&cli) {
        Ok(never) => match never {},
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
