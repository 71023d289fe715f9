//! Error types for the client.

/// Errors produced by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ramstash_protocol::ProtocolError),

    #[error(transparent)]
    Transfer(#[from] ramstash_transfer::TransferError),

    /// The server answered a download with its not-found literal.
    #[error("file not found on server: {0}")]
    FileNotFound(String),

    #[error("invalid local path: {0}")]
    InvalidPath(String),

    #[error("connection timed out")]
    Timeout,

    #[error("unexpected response from server: {0}")]
    UnexpectedResponse(String),
}
