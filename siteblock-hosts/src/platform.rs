//! Platform capabilities the controller consumes: a privilege check and a
//! best-effort DNS cache flush.
//!
//! Both are injected as a [`Platform`] trait object so the controller can be
//! exercised without touching the real operating system.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::PlatformError;

pub trait Platform: Send + Sync {
    /// Whether the process may write the system hosts file.
    fn has_elevated_privileges(&self) -> bool;

    /// Ask the OS resolver to drop cached answers.
    fn flush_dns_cache(&self) -> Result<(), PlatformError>;
}

/// The real operating system.
#[derive(Debug, Clone)]
pub struct SystemPlatform {
    #[cfg(not(unix))]
    hosts_path: PathBuf,
}

impl SystemPlatform {
    /// `hosts_path` is only consulted on platforms without a uid check.
    #[cfg(unix)]
    pub fn new(_hosts_path: impl Into<PathBuf>) -> Self {
        Self {}
    }

    #[cfg(not(unix))]
    pub fn new(hosts_path: impl Into<PathBuf>) -> Self {
        Self {
            hosts_path: hosts_path.into(),
        }
    }
}

impl Platform for SystemPlatform {
    #[cfg(unix)]
    fn has_elevated_privileges(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }

    #[cfg(not(unix))]
    fn has_elevated_privileges(&self) -> bool {
        std::fs::OpenOptions::new()
            .append(true)
            .open(&self.hosts_path)
            .is_ok()
    }

    fn flush_dns_cache(&self) -> Result<(), PlatformError> {
        let plan = flush_plan(std::env::consts::OS);
        run_flush(plan.strategy, plan.commands)
    }
}

type FlushCommand = (&'static str, &'static [&'static str]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushStrategy {
    /// Every command runs, in order; the first failure stops the flush.
    Sequence,
    /// Commands are alternatives; the first one that succeeds wins.
    FirstSuccess,
}

#[derive(Debug)]
struct FlushPlan {
    strategy: FlushStrategy,
    commands: &'static [FlushCommand],
}

fn flush_plan(os: &str) -> FlushPlan {
    match os {
        "windows" => FlushPlan {
            strategy: FlushStrategy::Sequence,
            commands: &[("ipconfig", &["/flushdns"])],
        },
        "macos" => FlushPlan {
            strategy: FlushStrategy::Sequence,
            commands: &[
                ("dscacheutil", &["-flushcache"]),
                ("killall", &["-HUP", "mDNSResponder"]),
            ],
        },
        _ => FlushPlan {
            strategy: FlushStrategy::FirstSuccess,
            commands: &[
                ("resolvectl", &["flush-caches"]),
                ("systemctl", &["restart", "systemd-resolved"]),
                ("service", &["network-manager", "restart"]),
            ],
        },
    }
}

fn run_flush(strategy: FlushStrategy, commands: &[FlushCommand]) -> Result<(), PlatformError> {
    match strategy {
        FlushStrategy::Sequence => {
            if commands.is_empty() {
                return Err(PlatformError::NoFlushMethod);
            }
            for (program, args) in commands {
                run_quiet(program, args)?;
            }
            tracing::debug!(commands = commands.len(), "flushed DNS cache");
            Ok(())
        }
        FlushStrategy::FirstSuccess => {
            let mut last_error = None;
            for (program, args) in commands {
                match run_quiet(program, args) {
                    Ok(()) => {
                        tracing::debug!(command = program, "flushed DNS cache");
                        return Ok(());
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "DNS flush method failed");
                        last_error = Some(err);
                    }
                }
            }
            Err(last_error.unwrap_or(PlatformError::NoFlushMethod))
        }
    }
}

fn run_quiet(program: &str, args: &[&str]) -> Result<(), PlatformError> {
    let command = format!("{program} {}", args.join(" "));
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| PlatformError::Spawn {
            command: command.clone(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(PlatformError::CommandFailed {
            command,
            status: status.to_string(),
        })
    }
}

/// A platform that never shells out and only counts flush requests.
#[derive(Debug, Clone, Default)]
pub struct NoopPlatform {
    elevated: bool,
    fail_flush: bool,
    flushes: Arc<AtomicUsize>,
}

impl NoopPlatform {
    pub fn new(elevated: bool) -> Self {
        Self {
            elevated,
            ..Self::default()
        }
    }

    /// Every flush reports failure.
    pub fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Platform for NoopPlatform {
    fn has_elevated_privileges(&self) -> bool {
        self.elevated
    }

    fn flush_dns_cache(&self) -> Result<(), PlatformError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        if self.fail_flush {
            Err(PlatformError::NoFlushMethod)
        } else {
            Ok(())
        }
    }
}
