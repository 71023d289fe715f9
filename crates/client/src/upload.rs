//! Client side of an upload.

use std::path::Path;

use ramstash_protocol::{CHUNK_SIZE, Request, UploadRequest, write_frame};
use ramstash_transfer::{
    Direction, ProgressReport, ProgressTracker, TransferError, TransferSession,
    calculate_file_checksum,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ClientError;
use crate::client::TransferSummary;

/// Local file checked and hashed before any connection is opened.
pub(crate) struct PreparedUpload {
    pub file_name: String,
    pub file_size: u64,
    pub file_hash: String,
}

/// Stats and hashes the file. Streams it once in full.
pub(crate) async fn prepare(path: &Path, file_name: String) -> Result<PreparedUpload, ClientError> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(ClientError::InvalidPath(format!(
            "not a regular file: {}",
            path.display()
        )));
    }

    let file_hash = calculate_file_checksum(path).await?;
    debug!(file = %file_name, hash = %file_hash, "content hash computed");

    Ok(PreparedUpload {
        file_name,
        file_size: metadata.len(),
        file_hash,
    })
}

/// Sends the header and streams the file a second time in chunks.
///
/// Returns once the server has closed the connection.
pub(crate) async fn send(
    stream: TcpStream,
    path: &Path,
    prepared: PreparedUpload,
    progress_tx: &mpsc::Sender<ProgressReport>,
) -> Result<TransferSummary, ClientError> {
    let PreparedUpload {
        file_name,
        file_size,
        file_hash,
    } = prepared;

    let (mut reader, writer) = stream.into_split();
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, writer);

    let header = Request::Upload(UploadRequest {
        file_name: file_name.clone(),
        file_size,
        file_hash: file_hash.clone(),
    });
    write_frame(&mut writer, &header).await?;

    let mut file = tokio::fs::File::open(path).await?;
    let mut session = TransferSession::new(&file_name, Direction::Upload, file_size);
    let mut tracker = ProgressTracker::new(file_size);
    session.start();

    let streamed = stream_chunks(
        &mut file,
        &mut writer,
        &mut session,
        &mut tracker,
        progress_tx,
    )
    .await;
    if let Err(e) = streamed {
        session.fail(e.to_string());
        warn!(
            file = %file_name,
            sent = session.transferred(),
            expected = file_size,
            "upload failed: {e}"
        );
        return Err(e);
    }

    // Half-close: EOF tells the server the payload is over.
    writer.shutdown().await?;

    // The server commits once the declared size is in and then closes.
    let mut trailing = Vec::new();
    reader.read_to_end(&mut trailing).await?;
    if !trailing.is_empty() {
        debug!(bytes = trailing.len(), "ignoring unexpected bytes after upload");
    }

    session.finish()?;
    let elapsed = tracker.elapsed();
    info!(
        file = %file_name,
        size = file_size,
        elapsed_ms = elapsed.as_millis() as u64,
        "upload completed"
    );

    Ok(TransferSummary {
        file_name,
        direction: session.direction(),
        bytes: file_size,
        elapsed,
        file_hash: Some(file_hash),
    })
}

/// Copies the file to `writer` in chunks, reporting progress after each.
async fn stream_chunks<R, W>(
    file: &mut R,
    writer: &mut W,
    session: &mut TransferSession,
    tracker: &mut ProgressTracker,
    progress_tx: &mpsc::Sender<ProgressReport>,
) -> Result<(), ClientError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    while !session.is_complete() {
        let to_read = session.remaining().min(buf.len() as u64) as usize;
        let n = file.read(&mut buf[..to_read]).await?;
        if n == 0 {
            // The file shrank after it was measured.
            return Err(TransferError::Truncated {
                expected: session.expected(),
                received: session.transferred(),
            }
            .into());
        }

        writer.write_all(&buf[..n]).await?;
        session.advance(n as u64)?;

        // Report progress (non-blocking).
        let _ = progress_tx.try_send(tracker.record(session.transferred()));
    }
    if session.expected() == 0 {
        let _ = progress_tx.try_send(tracker.record(0));
    }
    Ok(())
}
