//! Per-connection transfer state shared by the client and server sides.
//!
//! - [`TransferSession`]: expected/transferred byte counters with a phase tag.
//! - [`UploadBuffer`]: capacity-checked reassembly of an upload in memory.
//! - [`ProgressTracker`]: throughput and ETA derived from byte samples.

mod buffer;
mod checksum;
mod progress;
mod session;
mod validation;

pub use buffer::UploadBuffer;
pub use checksum::{calculate_file_checksum, checksum_bytes};
pub use progress::{ProgressReport, ProgressTracker};
pub use ramstash_protocol::CHUNK_SIZE;
pub use session::{Direction, Phase, TransferSession};
pub use validation::validate_file_name;

/// Default ceiling on a single upload held in memory (1 GiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("received more than the declared {expected} bytes (would reach {attempted})")]
    Overflow { expected: u64, attempted: u64 },

    #[error("stream ended after {received} of {expected} bytes")]
    Truncated { expected: u64, received: u64 },

    #[error("declared size {size} exceeds the limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("cannot allocate receive buffer: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    #[error("session not active: {0}")]
    SessionNotActive(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),
}
