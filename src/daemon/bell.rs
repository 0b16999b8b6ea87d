//! The bell loop.
//!
//! `BellDaemon` owns the beep, the playback backend and the throttle. It
//! blocks on a `BellSource`, waits out the throttle interval, performs the
//! beep and goes back to waiting. A failed beep is logged and never stops
//! the loop.
//!
//! Notifications that arrive while a beep is playing are coalesced by the
//! channel feeding the loop: it holds at most one pending bell.

use std::fs::File;
use std::io::{Read, Seek};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::beep::Beep;
use crate::playback::PcmBackend;

/// A payload-less "beep now" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bell;

/// Where bell notifications come from.
pub trait BellSource {
    /// Blocks until the next bell. `None` means no more bells will come.
    fn next_bell(&mut self) -> Option<Bell>;
}

impl BellSource for Receiver<Bell> {
    fn next_bell(&mut self) -> Option<Bell> {
        self.recv().ok()
    }
}

/// Creates the channel between notification sources and the bell loop.
///
/// The channel holds a single pending bell, so a burst of notifications
/// during a beep results in exactly one more beep.
#[must_use]
pub fn bell_channel() -> (Sender<Bell>, Receiver<Bell>) {
    crossbeam_channel::bounded(1)
}

/// Result of handing a notification to the bell loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// The bell was queued.
    Queued,
    /// A bell was already pending; this one was merged into it.
    Coalesced,
    /// The bell loop has stopped.
    Closed,
}

/// Hands one notification to the bell loop without blocking.
pub fn notify(tx: &Sender<Bell>, stats: &BellStats) -> Notify {
    stats.rings.fetch_add(1, Ordering::Relaxed);
    match tx.try_send(Bell) {
        Ok(()) => Notify::Queued,
        Err(TrySendError::Full(_)) => {
            stats.coalesced.fetch_add(1, Ordering::Relaxed);
            debug!("Bell already pending, coalescing");
            Notify::Coalesced
        }
        Err(TrySendError::Disconnected(_)) => Notify::Closed,
    }
}

// ============================================================================
// Throttle
// ============================================================================

/// Minimum interval between the end of one beep and the start of the next.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_beep: Option<Instant>,
}

impl Throttle {
    /// Creates a throttle; an interval of 0 disables it.
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            last_beep: None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time still to wait at `now`, if any.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }
        let ready_at = self.last_beep? + self.interval;
        ready_at.checked_duration_since(now).filter(|d| !d.is_zero())
    }

    /// Blocks until the next beep may start.
    pub fn wait(&self) {
        while let Some(remaining) = self.remaining(Instant::now()) {
            debug!("Throttling for {:?}", remaining);
            thread::sleep(remaining);
        }
    }

    /// Records the end of a beep.
    pub fn record(&mut self, at: Instant) {
        self.last_beep = Some(at);
    }
}

// ============================================================================
// BellStats
// ============================================================================

/// Counters shared between the bell loop and the control socket.
#[derive(Debug, Default)]
pub struct BellStats {
    rings: AtomicU64,
    beeps: AtomicU64,
    failures: AtomicU64,
    coalesced: AtomicU64,
}

/// Point-in-time copy of `BellStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BellStatsSnapshot {
    /// Notifications received
    pub rings: u64,
    /// Beeps performed successfully
    pub beeps: u64,
    /// Beeps that failed
    pub failures: u64,
    /// Notifications merged into a pending one
    pub coalesced: u64,
}

impl BellStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> BellStatsSnapshot {
        BellStatsSnapshot {
            rings: self.rings.load(Ordering::Relaxed),
            beeps: self.beeps.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// BellDaemon
// ============================================================================

/// Plays the beep for every bell, honoring the throttle.
pub struct BellDaemon<B, S = File> {
    beep: Beep<S>,
    backend: B,
    throttle: Throttle,
    stats: Arc<BellStats>,
}

impl<B, S> BellDaemon<B, S>
where
    B: PcmBackend,
    S: Read + Seek,
{
    /// Creates a bell loop around a prepared beep.
    pub fn new(beep: Beep<S>, backend: B, throttle_ms: u64) -> Self {
        Self {
            beep,
            backend,
            throttle: Throttle::new(throttle_ms),
            stats: Arc::new(BellStats::new()),
        }
    }

    /// Uses shared counters instead of private ones.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<BellStats>) -> Self {
        self.stats = stats;
        self
    }

    /// The counters updated by this loop.
    #[must_use]
    pub fn stats(&self) -> Arc<BellStats> {
        Arc::clone(&self.stats)
    }

    /// Handles one bell: wait out the throttle, beep, record the time.
    ///
    /// Returns true if the beep succeeded.
    pub fn ring(&mut self) -> bool {
        self.throttle.wait();

        let ok = match self.beep.perform(&self.backend) {
            Ok(()) => {
                self.stats.beeps.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Beep failed: {}", e);
                if let Some(hint) = e.suggestion() {
                    debug!("Hint: {}", hint);
                }
                false
            }
        };

        self.throttle.record(Instant::now());
        ok
    }

    /// Beeps once at start-up.
    pub fn test_bell(&mut self) -> bool {
        info!("Playing test bell");
        self.ring()
    }

    /// Rings for every bell from `source` until it is exhausted, then frees
    /// the beep.
    pub fn run<Src: BellSource>(mut self, mut source: Src) {
        info!("Waiting for bells using {}", self.backend.name());

        while let Some(Bell) = source.next_bell() {
            self.ring();
        }

        debug!("Bell source closed");
        self.beep.free();
    }
}

// ============================================================================
// Tests
// ============================================================================
