//! Wire protocol for ramstash file transfers.
//!
//! Every connection carries exactly one operation. The client opens with a
//! JSON request header terminated by [`SENTINEL`]; raw file bytes may follow
//! on the same stream without further framing.
//!
//! # Wire format
//!
//! See [`wire`] for the framing rules and [`messages`] for the header shapes.

pub mod constants;
pub mod messages;
pub mod wire;

pub use constants::{CHUNK_SIZE, DEFAULT_MAX_HEADER_SIZE, DEFAULT_PORT, FILE_NOT_FOUND, SENTINEL};
pub use messages::{DownloadRequest, DownloadResponse, Request, UploadRequest};
pub use wire::{Frame, FrameDecoder, encode_frame, read_frame, write_frame};

/// Errors produced while framing or decoding headers.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header: {0}")]
    Json(#[from] serde_json::Error),

    #[error("header is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("header exceeds {limit} bytes without a terminator")]
    HeaderTooLarge { limit: usize },

    #[error("connection closed before a complete header was received")]
    UnexpectedEof,
}
