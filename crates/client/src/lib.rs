//! ramstash client.
//!
//! Each operation opens its own TCP connection, sends one framed request
//! header, and drives the transfer to completion. Progress is reported on
//! an `mpsc` channel without ever blocking the transfer.

mod client;
mod download;
mod error;
mod upload;

pub use client::{ClientConfig, TransferClient, TransferSummary};
pub use error::ClientError;

use std::time::Duration;

/// Timeout for the TCP connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
