//! reload-notifier
//!
//! Watches one configuration directory and, when something in it changes,
//! asks a long-running server to reload (SIGHUP), optionally checking the
//! configuration first.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                        RELOAD NOTIFIER                           │
//!   │                                                                  │
//!   │  ┌───────────┐   inotify fd   ┌──────────┐   ready   ┌─────────┐ │
//!   │  │  watch    │───────────────▶│ dispatch │──────────▶│  watch  │ │
//!   │  │ registrar │                │ poll loop│           │coalesce │ │
//!   │  └───────────┘                └──────────┘           └────┬────┘ │
//!   │                                                           │      │
//!   │                                          CoalescedBatch   ▼      │
//!   │                                                     ┌──────────┐ │
//!   │   target server ◀──────────── SIGHUP ───────────────│ actuator │ │
//!   │                                                     │ validate │ │
//!   │                                                     └──────────┘ │
//!   │  ┌────────────────────────────────────────────────────────────┐  │
//!   │  │ Cross-cutting: config · observability · lifecycle (daemon) │  │
//!   │  └────────────────────────────────────────────────────────────┘  │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};

use reload_notifier::config::loader::load_config;
use reload_notifier::config::validation::validate_config;
use reload_notifier::config::{NotifierConfig, ReloadPolicy};
use reload_notifier::lifecycle::startup::{self, Settings};
use reload_notifier::observability::{LogSink, Logger};

#[derive(Parser)]
#[command(name = "reload-notifier", version)]
#[command(about = "Reload a server when its configuration directory changes", long_about = None)]
struct Cli {
    /// Directory to watch
    path: PathBuf,

    /// Log file ("-" for standard error)
    #[arg(short, long, value_name = "FILE")]
    logs: Option<PathBuf>,

    /// More output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Less output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    silent: u8,

    /// PID of the process to send SIGHUP to
    #[arg(short, long, allow_negative_numbers = true)]
    pid: Option<i32>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reload policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Shell command checking the server configuration
    #[arg(long, value_name = "CMD")]
    check_command: Option<String>,

    /// Stay in the foreground
    #[arg(short, long)]
    foreground: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Check the configuration, then signal
    Validate,
    /// Signal without checking
    Direct,
}

impl From<PolicyArg> for ReloadPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Validate => ReloadPolicy::Validate,
            PolicyArg::Direct => ReloadPolicy::Direct,
        }
    }
}

impl Cli {
    /// Command-line flags win over the configuration file.
    fn apply(&self, config: &mut NotifierConfig) {
        if let Some(logs) = &self.logs {
            config.log.file = Some(logs.clone());
        }
        let steps = i32::from(self.silent) - i32::from(self.verbose);
        config.log.level = config.log.level.adjusted(steps);
        if let Some(policy) = self.policy {
            config.reload.policy = policy.into();
        }
        if let Some(command) = &self.check_command {
            config.reload.check_command = command.clone();
        }
        if self.foreground {
            config.daemon.detach = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let program = env!("CARGO_PKG_NAME");

    // Logs are not set up yet; report straight to stderr.
    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{program}: {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => NotifierConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(errors) = validate_config(&config) {
        for err in errors {
            eprintln!("{program}: {err}");
        }
        return ExitCode::FAILURE;
    }

    let sink = match LogSink::from_target(config.log.file.as_deref()) {
        Ok(sink) => sink,
        Err(err) => {
            let target = config
                .log
                .file
                .as_deref()
                .map_or_else(|| "-".to_string(), |p| p.display().to_string());
            eprintln!("{program}: failed to initialize logs with {target}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let logger = Logger::new(sink, config.log.level);
    let _guard = logger.install();

    let settings = Settings {
        path: cli.path,
        target_pid: cli.pid,
        config,
    };

    match startup::run(settings, &logger) {
        Ok(never) => match never {},
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
