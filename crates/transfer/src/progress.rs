use std::fmt;
use std::time::{Duration, Instant};

/// Cumulative byte count observed at an instant.
#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    bytes: u64,
}

/// Snapshot derived from the two most recent samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub transferred: u64,
    pub total: u64,
    /// Time since the tracker was created.
    pub elapsed: Duration,
    /// Bytes per second between the previous sample and this one.
    pub speed: f64,
    /// Remaining bytes divided by `speed`; zero when `speed` is zero.
    pub eta: Duration,
}

impl ProgressReport {
    /// Completion percentage; 100 for an empty transfer.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.transferred as f64 / self.total as f64 * 100.0
    }

    /// Mean throughput since the tracker was created.
    pub fn average_speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.transferred as f64 / secs
    }

    pub fn is_complete(&self) -> bool {
        self.transferred == self.total
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% complete | {:.2} KB/s | ETA {:.2}s",
            self.percent(),
            self.speed / 1024.0,
            self.eta.as_secs_f64()
        )
    }
}

/// Turns cumulative byte counts into speed and ETA reports.
///
/// Purely observational; it never affects what goes on the wire.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    started: Instant,
    last: Sample,
}

impl ProgressTracker {
    /// Starts tracking a transfer of `total` bytes now.
    pub fn new(total: u64) -> Self {
        Self::starting_at(total, Instant::now())
    }

    /// Starts tracking with an explicit start instant.
    pub fn starting_at(total: u64, started: Instant) -> Self {
        Self {
            total,
            started,
            last: Sample {
                at: started,
                bytes: 0,
            },
        }
    }

    /// Records `transferred` cumulative bytes at the current instant.
    pub fn record(&mut self, transferred: u64) -> ProgressReport {
        self.record_at(transferred, Instant::now())
    }

    /// Records `transferred` cumulative bytes at `now`.
    ///
    /// The count is clamped into `[previous, total]` so reports never go
    /// backwards or past the total.
    pub fn record_at(&mut self, transferred: u64, now: Instant) -> ProgressReport {
        let bytes = transferred.min(self.total).max(self.last.bytes);
        let interval = now.saturating_duration_since(self.last.at);

        let speed = if interval.is_zero() {
            0.0
        } else {
            (bytes - self.last.bytes) as f64 / interval.as_secs_f64()
        };

        let remaining = self.total - bytes;
        let eta = if speed > 0.0 {
            Duration::try_from_secs_f64(remaining as f64 / speed).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };

        self.last = Sample { at: now, bytes };

        ProgressReport {
            transferred: bytes,
            total: self.total,
            elapsed: now.saturating_duration_since(self.started),
            speed,
            eta,
        }
    }

    /// Time since the tracker was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
