//! ramstash TCP server.
//!
//! Accepts connections on a TCP port, spawns one task per connection, and
//! runs a single upload, download or list exchange against the shared
//! [`FileStore`](ramstash_store::FileStore) before closing the connection.

mod connection;
mod server;

pub use server::{ServerConfig, TransferServer};

/// Errors produced by the server.
///
/// Every variant is scoped to one connection; none of them stop the
/// accept loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ramstash_protocol::ProtocolError),

    #[error(transparent)]
    Transfer(#[from] ramstash_transfer::TransferError),
}
