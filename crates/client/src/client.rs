//! Connection setup and the public client API.

use std::path::Path;
use std::time::Duration;

use ramstash_protocol::{DEFAULT_MAX_HEADER_SIZE, FrameDecoder, Request, read_frame, write_frame};
use ramstash_transfer::{Direction, ProgressReport, validate_file_name};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{CONNECT_TIMEOUT, ClientError, download, upload};

/// Client-side limits.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    /// Longest response header accepted before the sentinel.
    pub max_header_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }
}

/// Outcome of a completed upload or download.
#[derive(Debug, Clone)]
pub struct TransferSummary {
    pub file_name: String,
    pub direction: Direction,
    pub bytes: u64,
    pub elapsed: Duration,
    /// SHA-256 sent in the upload header. Downloads carry no hash.
    pub file_hash: Option<String>,
}

/// Client for one ramstash server. Every call opens a fresh connection.
#[derive(Debug, Clone)]
pub struct TransferClient {
    host: String,
    port: u16,
    config: ClientConfig,
}

impl TransferClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(host, port, ClientConfig::default())
    }

    pub fn with_config(host: impl Into<String>, port: u16, config: ClientConfig) -> Self {
        Self {
            host: host.into(),
            port,
            config,
        }
    }

    /// Uploads `path` under its basename.
    ///
    /// The file is hashed before connecting, so a missing or unreadable file
    /// fails without touching the network.
    pub async fn upload(
        &self,
        path: &Path,
        progress_tx: mpsc::Sender<ProgressReport>,
    ) -> Result<TransferSummary, ClientError> {
        let file_name = file_name_of(path)?;
        let prepared = upload::prepare(path, file_name).await?;
        let stream = self.connect().await?;
        upload::send(stream, path, prepared, &progress_tx).await
    }

    /// Downloads the file named by the basename of `dest` and writes it to
    /// `dest`.
    pub async fn download(
        &self,
        dest: &Path,
        progress_tx: mpsc::Sender<ProgressReport>,
    ) -> Result<TransferSummary, ClientError> {
        let file_name = file_name_of(dest)?;
        let stream = self.connect().await?;
        download::receive(
            stream,
            file_name,
            dest,
            self.config.max_header_size,
            &progress_tx,
        )
        .await
    }

    /// Names of all files held by the server, sorted.
    pub async fn list(&self) -> Result<Vec<String>, ClientError> {
        let stream = self.connect().await?;
        let (mut reader, mut writer) = stream.into_split();

        write_frame(&mut writer, &Request::List).await?;
        writer.shutdown().await?;

        let mut decoder = FrameDecoder::new(self.config.max_header_size);
        match read_frame::<_, Vec<String>>(&mut reader, &mut decoder).await? {
            Some(frame) => {
                debug!(count = frame.header.len(), "file list received");
                Ok(frame.header)
            }
            None => Err(ClientError::UnexpectedResponse(
                String::from_utf8_lossy(decoder.buffered()).into_owned(),
            )),
        }
    }

    async fn connect(&self) -> Result<TcpStream, ClientError> {
        let addr = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                info!(host = %self.host, port = self.port, "connected");
                Ok(stream)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ClientError::Timeout),
        }
    }
}

/// Basename of `path` as it is named on the server.
fn file_name_of(path: &Path) -> Result<String, ClientError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::InvalidPath(path.display().to_string()))?;
    validate_file_name(name)?;
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use ramstash_server::{ServerConfig, TransferServer};
    use ramstash_store::FileStore;
    use ramstash_transfer::{TransferError, checksum_bytes};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn start_server() -> (Arc<TransferServer>, SocketAddr) {
        let config = ServerConfig {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..ServerConfig::default()
        };
        let server = TransferServer::new(config, FileStore::new());
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let srv = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = srv.serve(listener).await;
        });

        (server, addr)
    }

    fn client_for(addr: SocketAddr) -> TransferClient {
        TransferClient::new(addr.ip().to_string(), addr.port())
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    fn drain(rx: &mut mpsc::Receiver<ProgressReport>) -> Vec<ProgressReport> {
        let mut reports = Vec::new();
        while let Ok(report) = rx.try_recv() {
            reports.push(report);
        }
        reports
    }

    /// Accepts one connection, reads the request to EOF, and answers with
    /// `response`.
    async fn fake_server(response: Vec<u8>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            stream.write_all(&response).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn round_trip_preserves_bytes() {
        let (server, addr) = start_server().await;
        let client = client_for(addr);
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();

        for size in [0usize, 1, 65536, 65537, 3 * 1024 * 1024] {
            let name = format!("file-{size}.bin");
            let data = pattern(size);
            let src = src_dir.path().join(&name);
            tokio::fs::write(&src, &data).await.unwrap();

            let (tx, _rx) = mpsc::channel(4096);
            let sent = client.upload(&src, tx).await.unwrap();
            assert_eq!(sent.bytes, size as u64);
            assert_eq!(sent.file_name, name);

            let dest = dst_dir.path().join(&name);
            let (tx, _rx) = mpsc::channel(4096);
            let received = client.download(&dest, tx).await.unwrap();
            assert_eq!(received.bytes, size as u64);

            let got = tokio::fs::read(&dest).await.unwrap();
            assert_eq!(got, data, "size {size}");
        }

        assert_eq!(server.store().len(), 5);
        server.shutdown();
    }

    #[tokio::test]
    async fn upload_stores_declared_hash() {
        let (server, addr) = start_server().await;
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("hashed.txt");
        let data = b"content to hash".to_vec();
        tokio::fs::write(&src, &data).await.unwrap();

        let (tx, _rx) = mpsc::channel(16);
        let summary = client_for(addr).upload(&src, tx).await.unwrap();

        let expected = checksum_bytes(&data);
        assert_eq!(summary.file_hash.as_deref(), Some(expected.as_str()));
        let stored = server.store().get("hashed.txt").unwrap();
        assert_eq!(stored.declared_hash(), expected);
        server.shutdown();
    }

    #[tokio::test]
    async fn download_miss_creates_nothing() {
        let (server, addr) = start_server().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("absent.bin");

        let (tx, _rx) = mpsc::channel(16);
        let err = client_for(addr).download(&dest, tx).await.unwrap_err();

        assert!(matches!(err, ClientError::FileNotFound(ref name) if name == "absent.bin"));
        assert!(!dest.exists());
        assert!(!dir.path().join("absent.bin.part").exists());
        server.shutdown();
    }

    #[tokio::test]
    async fn download_miss_keeps_existing_destination() {
        let (server, addr) = start_server().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("local.txt");
        tokio::fs::write(&dest, b"keep me").await.unwrap();

        let (tx, _rx) = mpsc::channel(16);
        let err = client_for(addr).download(&dest, tx).await.unwrap_err();

        assert!(matches!(err, ClientError::FileNotFound(_)));
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"keep me");
        server.shutdown();
    }

    #[tokio::test]
    async fn second_upload_replaces_first() {
        let (server, addr) = start_server().await;
        let client = client_for(addr);
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("doc.txt");

        tokio::fs::write(&src, b"first version").await.unwrap();
        let (tx, _rx) = mpsc::channel(16);
        client.upload(&src, tx).await.unwrap();

        tokio::fs::write(&src, b"second").await.unwrap();
        let (tx, _rx) = mpsc::channel(16);
        client.upload(&src, tx).await.unwrap();

        assert_eq!(server.store().len(), 1);
        assert_eq!(&server.store().get("doc.txt").unwrap().data()[..], b"second");

        let dest = dir.path().join("out").join("doc.txt");
        tokio::fs::create_dir_all(dest.parent().unwrap()).await.unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let received = client.download(&dest, tx).await.unwrap();
        assert_eq!(received.bytes, 6);
        assert_eq!(received.direction, Direction::Download);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"second");
        server.shutdown();
    }

    #[tokio::test]
    async fn list_returns_sorted_names() {
        let (server, addr) = start_server().await;
        let client = client_for(addr);
        assert!(client.list().await.unwrap().is_empty());

        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            let src = dir.path().join(name);
            tokio::fs::write(&src, name.as_bytes()).await.unwrap();
            let (tx, _rx) = mpsc::channel(16);
            client.upload(&src, tx).await.unwrap();
        }

        assert_eq!(client.list().await.unwrap(), vec!["alpha", "mid", "zeta"]);
        server.shutdown();
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_ends_at_total() {
        let (server, addr) = start_server().await;
        let client = client_for(addr);
        let dir = tempfile::tempdir().unwrap();
        let size = 1024 * 1024 + 123;
        let src = dir.path().join("progress.bin");
        tokio::fs::write(&src, pattern(size)).await.unwrap();

        let (tx, mut rx) = mpsc::channel(4096);
        client.upload(&src, tx).await.unwrap();
        let uploads = drain(&mut rx);

        let dest = dir.path().join("out").join("progress.bin");
        tokio::fs::create_dir_all(dest.parent().unwrap()).await.unwrap();
        let (tx, mut rx) = mpsc::channel(4096);
        client.download(&dest, tx).await.unwrap();
        let downloads = drain(&mut rx);

        for reports in [uploads, downloads] {
            assert!(!reports.is_empty());
            for pair in reports.windows(2) {
                assert!(pair[0].transferred <= pair[1].transferred);
            }
            for report in &reports {
                assert!(report.transferred <= report.total);
                assert!(report.speed >= 0.0);
                assert!(report.eta.as_secs_f64().is_finite());
            }
            let last = reports.last().unwrap();
            assert_eq!(last.transferred, size as u64);
            assert!(last.is_complete());
        }
        server.shutdown();
    }

    #[tokio::test]
    async fn empty_upload_reports_once() {
        let (server, addr) = start_server().await;
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("empty");
        tokio::fs::write(&src, b"").await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        client_for(addr).upload(&src, tx).await.unwrap();

        let reports = drain(&mut rx);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].percent(), 100.0);
        server.shutdown();
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(16);
        // No server needed: the file is checked before connecting.
        let err = TransferClient::new("127.0.0.1", 1)
            .upload(&dir.path().join("nope.bin"), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[tokio::test]
    async fn upload_of_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        tokio::fs::create_dir(&sub).await.unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let err = TransferClient::new("127.0.0.1", 1)
            .upload(&sub, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(addr).list().await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[tokio::test]
    async fn truncated_download_removes_partial_file() {
        let mut response = b"{\"fileSize\":10}\r\n\r\n".to_vec();
        response.extend_from_slice(b"abcd");
        let addr = fake_server(response).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("short.bin");

        let (tx, _rx) = mpsc::channel(16);
        let err = client_for(addr).download(&dest, tx).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Transfer(TransferError::Truncated {
                expected: 10,
                received: 4
            })
        ));
        assert!(!dest.exists());
        assert!(!dir.path().join("short.bin.part").exists());
    }

    #[tokio::test]
    async fn overflowing_download_removes_partial_file() {
        let mut response = b"{\"fileSize\":10}\r\n\r\n".to_vec();
        response.extend_from_slice(b"0123456789AB");
        let addr = fake_server(response).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("long.bin");

        let (tx, _rx) = mpsc::channel(16);
        let err = client_for(addr).download(&dest, tx).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Transfer(TransferError::Overflow { expected: 10, .. })
        ));
        assert!(!dest.exists());
        assert!(!dir.path().join("long.bin.part").exists());
    }

    #[tokio::test]
    async fn garbage_response_is_unexpected() {
        let addr = fake_server(b"nope".to_vec()).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.bin");

        let (tx, _rx) = mpsc::channel(16);
        let err = client_for(addr).download(&dest, tx).await.unwrap_err();

        assert!(matches!(err, ClientError::UnexpectedResponse(ref body) if body == "nope"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn header_written_one_byte_at_a_time() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            for byte in b"{\"fileSize\":3}\r\n\r\nxyz" {
                stream.write_all(&[*byte]).await.unwrap();
                stream.flush().await.unwrap();
                tokio::task::yield_now().await;
            }
            stream.shutdown().await.unwrap();
        });
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("slow.bin");

        let (tx, _rx) = mpsc::channel(16);
        client_for(addr).download(&dest, tx).await.unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"xyz");
    }

    #[test]
    fn file_name_is_basename() {
        assert_eq!(
            file_name_of(Path::new("/some/dir/report.pdf")).unwrap(),
            "report.pdf"
        );
        assert!(matches!(
            file_name_of(Path::new("/")),
            Err(ClientError::InvalidPath(_))
        ));
        assert!(matches!(
            file_name_of(Path::new("dir/..")),
            Err(ClientError::InvalidPath(_))
        ));
    }
}
