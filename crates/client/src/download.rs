//! Client side of a download.
//!
//! Payload bytes go to `<dest>.part` first and are renamed onto the
//! destination only after the declared size arrived in full, so a miss or a
//! broken transfer never leaves a file behind.

use std::path::{Path, PathBuf};

use ramstash_protocol::{
    CHUNK_SIZE, DownloadRequest, DownloadResponse, FILE_NOT_FOUND, Frame, FrameDecoder, Request,
    read_frame, write_frame,
};
use ramstash_transfer::{Direction, ProgressReport, ProgressTracker, TransferSession};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ClientError;
use crate::client::TransferSummary;

/// Requests `file_name` and writes the payload to `dest`.
pub(crate) async fn receive(
    stream: TcpStream,
    file_name: String,
    dest: &Path,
    max_header_size: usize,
    progress_tx: &mpsc::Sender<ProgressReport>,
) -> Result<TransferSummary, ClientError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = Request::Download(DownloadRequest {
        file_name: file_name.clone(),
    });
    write_frame(&mut writer, &request).await?;
    writer.shutdown().await?;

    let mut decoder = FrameDecoder::new(max_header_size);
    let frame: Frame<DownloadResponse> = match read_frame(&mut reader, &mut decoder).await? {
        Some(frame) => frame,
        None if decoder.buffered() == FILE_NOT_FOUND => {
            return Err(ClientError::FileNotFound(file_name));
        }
        None => {
            return Err(ClientError::UnexpectedResponse(
                String::from_utf8_lossy(decoder.buffered()).into_owned(),
            ));
        }
    };

    let file_size = frame.header.file_size;
    info!(file = %file_name, size = file_size, "downloading");

    let part_path = partial_path(dest);
    let mut session = TransferSession::new(&file_name, Direction::Download, file_size);
    let mut tracker = ProgressTracker::new(file_size);
    session.start();
    let result = write_payload(
        &mut reader,
        &part_path,
        frame.payload,
        &mut session,
        &mut tracker,
        progress_tx,
    )
    .await;

    if let Err(e) = result {
        session.fail(e.to_string());
        warn!(
            file = %file_name,
            received = session.transferred(),
            expected = file_size,
            "download failed: {e}"
        );
        if let Err(rm) = tokio::fs::remove_file(&part_path).await {
            warn!(path = %part_path.display(), "failed to remove partial download: {rm}");
        }
        return Err(e);
    }

    tokio::fs::rename(&part_path, dest).await?;
    let elapsed = tracker.elapsed();
    info!(
        file = %file_name,
        size = file_size,
        elapsed_ms = elapsed.as_millis() as u64,
        "download completed"
    );

    Ok(TransferSummary {
        file_name,
        direction: session.direction(),
        bytes: file_size,
        elapsed,
        file_hash: None,
    })
}

/// Appends the initial slice and every later read to `part_path`.
async fn write_payload<R: AsyncRead + Unpin>(
    reader: &mut R,
    part_path: &Path,
    initial: Vec<u8>,
    session: &mut TransferSession,
    tracker: &mut ProgressTracker,
    progress_tx: &mpsc::Sender<ProgressReport>,
) -> Result<(), ClientError> {
    let mut file = BufWriter::with_capacity(CHUNK_SIZE, tokio::fs::File::create(part_path).await?);
    if !initial.is_empty() {
        session.advance(initial.len() as u64)?;
        file.write_all(&initial).await?;
        let _ = progress_tx.try_send(tracker.record(session.transferred()));
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        session.advance(n as u64)?;
        file.write_all(&buf[..n]).await?;

        // Report progress (non-blocking).
        let _ = progress_tx.try_send(tracker.record(session.transferred()));
    }

    file.flush().await?;
    session.finish()?;
    if session.expected() == 0 {
        let _ = progress_tx.try_send(tracker.record(0));
    }
    debug!(path = %part_path.display(), bytes = session.expected(), "payload written");
    Ok(())
}

/// `dir/name.ext` -> `dir/name.ext.part`.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
