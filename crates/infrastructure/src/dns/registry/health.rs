use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// RTT assumed for a server that has never answered.
pub const INITIAL_RTT: Duration = Duration::from_millis(100);

/// Per-server health cell. Every field is updated with atomics so the
/// resolver never takes a lock on the hot path.
///
/// Timestamps are microseconds since the owning registry's epoch, offset by
/// one so that zero means "never".
#[derive(Debug, Default)]
pub struct ServerHealth {
    /// Smoothed RTT in microseconds, 0 until the first success
    rtt_micros: AtomicU64,
    consecutive_failures: AtomicU32,
    last_success: AtomicU64,
    last_failure: AtomicU64,
}

/// Point-in-time copy of a health cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub smoothed_rtt: Duration,
    pub measured: bool,
    pub consecutive_failures: u32,
    pub last_success: Option<u64>,
    pub last_failure: Option<u64>,
}

impl ServerHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `rtt` into the moving average (alpha = 1/4) and clear the
    /// failure streak.
    pub fn record_success(&self, rtt: Duration, now: u64) {
        let sample = (rtt.as_micros() as u64).max(1);
        let _ = self
            .rtt_micros
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old| {
                if old == 0 {
                    Some(sample)
                } else {
                    Some((old - old / 4 + sample / 4).max(1))
                }
            });
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.last_success.store(now, Ordering::Relaxed);
    }

    pub fn record_failure(&self, now: u64) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        self.last_failure.store(now, Ordering::Relaxed);
    }

    pub fn smoothed_rtt(&self) -> Duration {
        match self.rtt_micros.load(Ordering::Relaxed) {
            0 => INITIAL_RTT,
            micros => Duration::from_micros(micros),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn last_failure(&self) -> u64 {
        self.last_failure.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let nonzero = |v: u64| (v != 0).then_some(v);
        HealthSnapshot {
            smoothed_rtt: self.smoothed_rtt(),
            measured: self.rtt_micros.load(Ordering::Relaxed) != 0,
            consecutive_failures: self.consecutive_failures(),
            last_success: nonzero(self.last_success.load(Ordering::Relaxed)),
            last_failure: nonzero(self.last_failure()),
        }
    }
}
