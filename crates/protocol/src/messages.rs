use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request headers
// ---------------------------------------------------------------------------

/// Request header sent by the client as the first frame of a connection.
///
/// Tagged by the `operation` field, e.g. `{"operation":"LIST"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "UPPERCASE")]
pub enum Request {
    /// Followed on the wire by exactly `file_size` raw bytes.
    Upload(UploadRequest),
    Download(DownloadRequest),
    List,
}

impl Request {
    /// Operation name as it appears on the wire.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Upload(_) => "UPLOAD",
            Request::Download(_) => "DOWNLOAD",
            Request::List => "LIST",
        }
    }
}

/// Announces an upload and the size of the payload that follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    pub file_size: u64,
    /// Hex SHA-256 of the content, as computed by the sender.
    ///
    /// Informational only: receivers store it but never check it.
    #[serde(default)]
    pub file_hash: String,
}

/// Asks for a stored file by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub file_name: String,
}

// ---------------------------------------------------------------------------
// Response headers
// ---------------------------------------------------------------------------

/// Header preceding the payload of a successful download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub file_size: u64,
}
