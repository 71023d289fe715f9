/// Marker separating a text header from the payload that follows it.
pub const SENTINEL: &[u8; 4] = b"\r\n\r\n";

/// Size of one payload write/read unit (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// TCP port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 9999;

/// Upper bound on buffered header bytes before the sentinel must appear.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 64 * 1024;

/// Literal reply for a download of an unknown name.
///
/// Sent raw, with neither JSON nor a sentinel, and the connection is closed
/// right after it. Kept as-is for compatibility with existing peers.
pub const FILE_NOT_FOUND: &[u8] = b"File not found";
