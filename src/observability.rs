//! Diagnostic verbosity and in-process counters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Diagnostic logging threshold exposed to the host application.
///
/// Numeric levels follow the host-facing API: `DEBUG = 0`, `INFO = 1`,
/// `WARN = 2`, `ERROR = 3`. Content-flow diagnostics are only emitted when
/// their level is at or above the current threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Verbosity {
    /// Map a host-supplied numeric level, clamping out-of-range values.
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=0 => Verbosity::Debug,
            1 => Verbosity::Info,
            2 => Verbosity::Warn,
            _ => Verbosity::Error,
        }
    }

    pub fn as_level(self) -> i64 {
        self as i64
    }

    /// Whether a diagnostic at `level` passes this threshold
    pub fn allows(self, level: Verbosity) -> bool {
        level >= self
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub fn as_directive(self) -> &'static str {
        match self {
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Warn => "warn",
            Verbosity::Error => "error",
        }
    }

    fn from_u8(raw: u8) -> Self {
        Self::from_level(i64::from(raw))
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Info
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Shared diagnostics handle: current verbosity plus delivery counters
#[derive(Debug)]
pub struct Diagnostics {
    verbosity: AtomicU8,
    events_dispatched: AtomicU64,
    errors_emitted: AtomicU64,
    slots_buffered: AtomicU64,
    slots_drained: AtomicU64,
    listener_failures: AtomicU64,
}

impl Diagnostics {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity: AtomicU8::new(verbosity as u8),
            events_dispatched: AtomicU64::new(0),
            errors_emitted: AtomicU64::new(0),
            slots_buffered: AtomicU64::new(0),
            slots_drained: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_u8(self.verbosity.load(Ordering::Relaxed))
    }

    pub fn set_verbosity(&self, verbosity: Verbosity) {
        self.verbosity.store(verbosity as u8, Ordering::Relaxed);
        tracing::debug!(%verbosity, "Verbosity updated");
    }

    pub fn allows(&self, level: Verbosity) -> bool {
        self.verbosity().allows(level)
    }

    pub fn event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_emitted(&self) {
        self.errors_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn slot_buffered(&self) {
        self.slots_buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn slots_drained(&self, count: usize) {
        self.slots_drained.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn listener_failed(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            errors_emitted: self.errors_emitted.load(Ordering::Relaxed),
            slots_buffered: self.slots_buffered.load(Ordering::Relaxed),
            slots_drained: self.slots_drained.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Verbosity::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_dispatched: u64,
    pub errors_emitted: u64,
    pub slots_buffered: u64,
    pub slots_drained: u64,
    pub listener_failures: u64,
}
