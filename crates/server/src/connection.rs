//! One request/response exchange on an accepted connection.
//!
//! ```text
//! UPLOAD:   client -> [header][fileSize bytes]             server commits, closes
//! DOWNLOAD: server -> [{"fileSize":N}][N bytes]             or "File not found"
//! LIST:     server -> [["name", ...]]
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use ramstash_protocol::{
    CHUNK_SIZE, DownloadResponse, FILE_NOT_FOUND, Frame, FrameDecoder, ProtocolError, Request,
    UploadRequest, read_frame, write_frame,
};
use ramstash_store::{FileStore, StoredFile};
use ramstash_transfer::{
    Direction, TransferError, TransferSession, UploadBuffer, validate_file_name,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use crate::ServerError;
use crate::server::ServerConfig;

/// Reads the request header and runs the matching operation.
pub(crate) async fn handle(
    stream: TcpStream,
    peer_addr: SocketAddr,
    store: &FileStore,
    config: &ServerConfig,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let mut decoder = FrameDecoder::new(config.max_header_size);
    let frame: Frame<Request> = match read_frame(&mut reader, &mut decoder).await? {
        Some(frame) => frame,
        None if decoder.buffered().is_empty() => {
            debug!(%peer_addr, "peer closed without sending a request");
            return Ok(());
        }
        None => return Err(ProtocolError::UnexpectedEof.into()),
    };

    debug!(%peer_addr, operation = frame.header.operation(), "request received");

    match frame.header {
        Request::Upload(request) => {
            receive_upload(
                &mut reader,
                frame.payload,
                request,
                store,
                config.max_upload_size,
                peer_addr,
            )
            .await?;
        }
        Request::Download(request) => {
            send_download(&mut writer, &request.file_name, store, peer_addr).await?;
        }
        Request::List => {
            send_list(&mut writer, store, peer_addr).await?;
        }
    }

    writer.shutdown().await?;
    Ok(())
}

/// Reassembles an upload and commits it as soon as the declared size is in.
///
/// A chunk that would pass the declared size fails the upload, as does EOF
/// before the last byte. Nothing is committed on failure.
async fn receive_upload<R: AsyncRead + Unpin>(
    reader: &mut R,
    initial: Vec<u8>,
    request: UploadRequest,
    store: &FileStore,
    max_upload_size: u64,
    peer_addr: SocketAddr,
) -> Result<(), ServerError> {
    validate_file_name(&request.file_name)?;

    info!(
        %peer_addr,
        file = %request.file_name,
        size = request.file_size,
        "receiving upload"
    );
    // Stored alongside the blob but never compared with it.
    debug!(file = %request.file_name, hash = %request.file_hash, "declared content hash");

    let mut upload = UploadBuffer::new(&request.file_name, request.file_size, max_upload_size)?;
    if let Err(e) = fill_upload(reader, &mut upload, &initial).await {
        upload.fail(e.to_string());
        let session = upload.session();
        warn!(
            %peer_addr,
            file = %session.file_name(),
            received = session.transferred(),
            expected = session.expected(),
            "upload failed: {e}"
        );
        return Err(e);
    }

    let elapsed = upload.session().elapsed();
    let data = upload.finish()?;
    let size = data.len();
    let replaced = store
        .put(
            request.file_name.clone(),
            StoredFile::new(data, request.file_hash),
        )
        .is_some();

    info!(
        %peer_addr,
        file = %request.file_name,
        size,
        replaced,
        elapsed_ms = elapsed.as_millis() as u64,
        "upload completed"
    );
    Ok(())
}

/// Appends the initial slice and later reads until the buffer is full.
async fn fill_upload<R: AsyncRead + Unpin>(
    reader: &mut R,
    upload: &mut UploadBuffer,
    initial: &[u8],
) -> Result<(), ServerError> {
    upload.write(initial)?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    while !upload.is_complete() {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            let session = upload.session();
            return Err(TransferError::Truncated {
                expected: session.expected(),
                received: session.transferred(),
            }
            .into());
        }
        upload.write(&buf[..n])?;
        trace!(
            file = %upload.session().file_name(),
            received = upload.session().transferred(),
            total = upload.session().expected(),
            "upload chunk received"
        );
    }
    Ok(())
}

/// Streams a stored file, or the not-found literal.
async fn send_download<W: AsyncWrite + Unpin>(
    writer: &mut W,
    file_name: &str,
    store: &FileStore,
    peer_addr: SocketAddr,
) -> Result<(), ServerError> {
    let Some(file) = store.get(file_name) else {
        info!(%peer_addr, file = %file_name, "requested file not found");
        writer.write_all(FILE_NOT_FOUND).await?;
        return Ok(());
    };

    let mut session = TransferSession::new(file_name, Direction::Download, file.size());
    session.start();

    if let Err(e) = stream_file(writer, file.data(), &mut session).await {
        session.fail(e.to_string());
        warn!(
            %peer_addr,
            file = %file_name,
            sent = session.transferred(),
            expected = session.expected(),
            "download failed: {e}"
        );
        return Err(e);
    }
    session.finish()?;

    info!(
        %peer_addr,
        file = %file_name,
        size = session.expected(),
        elapsed_ms = session.elapsed().as_millis() as u64,
        "download completed"
    );
    Ok(())
}

/// Writes the response header and `data` in chunks.
async fn stream_file<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &Arc<[u8]>,
    session: &mut TransferSession,
) -> Result<(), ServerError> {
    write_frame(
        writer,
        &DownloadResponse {
            file_size: session.expected(),
        },
    )
    .await?;

    for chunk in data.chunks(CHUNK_SIZE) {
        // write_all waits on the socket, so at most one chunk is in flight.
        writer.write_all(chunk).await?;
        session.advance(chunk.len() as u64)?;
        trace!(
            file = %session.file_name(),
            sent = session.transferred(),
            total = session.expected(),
            "download chunk sent"
        );
        tokio::task::yield_now().await;
    }
    writer.flush().await?;
    Ok(())
}

/// Sends the sorted list of stored names.
async fn send_list<W: AsyncWrite + Unpin>(
    writer: &mut W,
    store: &FileStore,
    peer_addr: SocketAddr,
) -> Result<(), ServerError> {
    let names = store.names();
    write_frame(writer, &names).await?;
    writer.flush().await?;
    debug!(%peer_addr, count = names.len(), "file list sent");
    Ok(())
}
