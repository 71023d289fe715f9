use std::time::{Duration, Instant};

use crate::TransferError;

/// Which way the bytes flow, seen from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    pub fn verb(self) -> &'static str {
        match self {
            Direction::Upload => "Uploading",
            Direction::Download => "Downloading",
        }
    }
}

/// Lifecycle of a transfer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Pending,
    InProgress,
    Completed,
    Failed(String),
}

/// Byte accounting for one transfer on one connection.
///
/// `transferred` never decreases and never exceeds `expected`; the session
/// is complete exactly when the two are equal.
#[derive(Debug, Clone)]
pub struct TransferSession {
    file_name: String,
    direction: Direction,
    expected: u64,
    transferred: u64,
    phase: Phase,
    started_at: Option<Instant>,
    completed_at: Option<Instant>,
}

impl TransferSession {
    /// Creates a pending session for `expected` bytes.
    pub fn new(file_name: impl Into<String>, direction: Direction, expected: u64) -> Self {
        Self {
            file_name: file_name.into(),
            direction,
            expected,
            transferred: 0,
            phase: Phase::Pending,
            started_at: None,
            completed_at: None,
        }
    }

    /// Marks the session as in-progress.
    pub fn start(&mut self) {
        self.phase = Phase::InProgress;
        self.started_at = Some(Instant::now());
    }

    /// Accounts for `bytes` more bytes and returns the new total.
    ///
    /// Fails without changing the counters if the total would pass
    /// `expected` or the session has already ended.
    pub fn advance(&mut self, bytes: u64) -> Result<u64, TransferError> {
        match self.phase {
            Phase::Pending => self.start(),
            Phase::InProgress => {}
            Phase::Completed | Phase::Failed(_) => {
                return Err(TransferError::SessionNotActive(self.file_name.clone()));
            }
        }

        let attempted = self.transferred.saturating_add(bytes);
        if attempted > self.expected {
            return Err(TransferError::Overflow {
                expected: self.expected,
                attempted,
            });
        }
        self.transferred = attempted;
        Ok(attempted)
    }

    /// Marks the session as completed if every expected byte was accounted for.
    pub fn finish(&mut self) -> Result<(), TransferError> {
        if matches!(self.phase, Phase::Failed(_)) {
            return Err(TransferError::SessionNotActive(self.file_name.clone()));
        }
        if !self.is_complete() {
            return Err(TransferError::Truncated {
                expected: self.expected,
                received: self.transferred,
            });
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        self.phase = Phase::Completed;
        self.completed_at = Some(Instant::now());
        Ok(())
    }

    /// Marks the session as failed with an error message.
    pub fn fail(&mut self, err: impl Into<String>) {
        self.phase = Phase::Failed(err.into());
        self.completed_at = Some(Instant::now());
    }

    pub fn is_complete(&self) -> bool {
        self.transferred == self.expected
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn remaining(&self) -> u64 {
        self.expected - self.transferred
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Time since [`start`](Self::start), frozen once the session ends.
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }
}
