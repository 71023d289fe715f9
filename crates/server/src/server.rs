//! Accept loop.
//!
//! Listens on a TCP port and hands each accepted stream to its own task, so
//! a slow or stalled peer never holds up the others.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use ramstash_protocol::{DEFAULT_MAX_HEADER_SIZE, DEFAULT_PORT};
use ramstash_store::FileStore;
use ramstash_transfer::DEFAULT_MAX_UPLOAD_SIZE;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::ServerError;
use crate::connection;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (all interfaces by default).
    pub bind_addr: IpAddr,
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// Longest request header accepted before the sentinel.
    pub max_header_size: usize,
    /// Largest declared upload size accepted.
    pub max_upload_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// The ramstash file server.
pub struct TransferServer {
    config: ServerConfig,
    store: FileStore,
    cancel: CancellationToken,
}

impl TransferServer {
    /// Creates a server over `store`.
    pub fn new(config: ServerConfig, store: FileStore) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle to the store shared by all connections.
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Stops accepting new connections. Transfers already running finish.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = SocketAddr::new(self.config.bind_addr, self.config.port);
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("server listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Binds and serves until [`shutdown`](Self::shutdown) is called.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` until shutdown.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("server shutting down");
                    break Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer_addr).await {
                                    tracing::error!(%peer_addr, "connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), ServerError> {
        tracing::info!(%peer_addr, "client connected");
        let result = connection::handle(stream, peer_addr, &self.store, &self.config).await;
        tracing::debug!(%peer_addr, "client disconnected");
        result
    }
}
