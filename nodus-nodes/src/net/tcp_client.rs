//! TCP client node.
//!
//! Writes the data of every message as one line to a TCP server. The
//! `server` setting is either `host:port` (the node owns its client) or
//! `ref://<id>` (the client is shared through the resource pool).
//!
//! The socket is opened lazily by the first message. Concurrent first
//! messages race for the node's connect guard; losers wait
//! `connect_wait_ms` once and then fail with `ConnectInProgress`.

use crate::config::decode;
use nodus_core::config::EngineConfig;
use nodus_core::definition::Configuration;
use nodus_core::error::{NodusError, Result};
use nodus_core::message::{Message, Outcome};
use nodus_core::net_resource::{NetResourceNode, NodeUtils};
use nodus_core::traits::{Component, NetResource, ProcessFuture, SharedResource};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Component type of [`TcpClientNode`].
pub const TCP_CLIENT_TYPE: &str = "net::tcp_client";

/// A lazily connected line-oriented TCP client.
#[derive(Debug)]
pub struct TcpClient {
    server: String,
    connect_timeout: Duration,
    connected: AtomicBool,
    /// Set by `close`; a closed client never opens a socket again.
    closed: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpClient {
    /// Create a client handle. No I/O happens until [`TcpClient::connect`].
    pub fn new(server: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            server: server.into(),
            connect_timeout,
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            stream: Mutex::new(None),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn closed_error(&self) -> NodusError {
        NodusError::Network {
            cause: format!("client for {} is closed", self.server),
        }
    }

    /// Open the socket unless it is already open. Fails once the client is
    /// closed.
    pub async fn connect(&self) -> Result<()> {
        let mut stream = self.stream.lock().await;
        if self.is_closed() {
            stream.take();
            return Err(self.closed_error());
        }
        if stream.is_some() && self.is_connected() {
            return Ok(());
        }

        tracing::debug!(server = %self.server, "Connecting");
        let socket = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.server))
            .await
            .map_err(|_| NodusError::Network {
                cause: format!(
                    "connect to {} timed out after {:?}",
                    self.server, self.connect_timeout
                ),
            })?
            .map_err(|e| NodusError::Network {
                cause: format!("connect to {}: {e}", self.server),
            })?;

        // `close` may have run while the dial was in flight.
        if self.is_closed() {
            return Err(self.closed_error());
        }
        *stream = Some(socket);
        self.connected.store(true, Ordering::Release);
        tracing::info!(server = %self.server, "Connected");
        Ok(())
    }

    /// Write `line` followed by a newline.
    ///
    /// A write error drops the socket; the next caller reconnects.
    pub async fn send(&self, line: &str) -> Result<()> {
        let mut stream = self.stream.lock().await;
        if self.is_closed() {
            stream.take();
            return Err(self.closed_error());
        }
        if !self.is_connected() {
            stream.take();
            return Err(NodusError::Network {
                cause: format!("not connected to {}", self.server),
            });
        }
        let Some(socket) = stream.as_mut() else {
            self.connected.store(false, Ordering::Release);
            return Err(NodusError::Network {
                cause: format!("not connected to {}", self.server),
            });
        };

        let mut payload = String::with_capacity(line.len() + 1);
        payload.push_str(line);
        payload.push('\n');

        let written = match socket.write_all(payload.as_bytes()).await {
            Ok(()) => socket.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            stream.take();
            self.connected.store(false, Ordering::Release);
            tracing::warn!(server = %self.server, error = %e, "Write failed, connection dropped");
            return Err(NodusError::Network {
                cause: format!("write to {}: {e}", self.server),
            });
        }
        Ok(())
    }

    /// Mark the client closed and drop the socket if nobody is writing.
    ///
    /// A socket held by an in-flight write is dropped by the next `send`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        if let Ok(mut stream) = self.stream.try_lock() {
            stream.take();
        }
    }
}

#[derive(Debug, Deserialize)]
struct TcpClientConfig {
    server: String,
}

/// Releases the connect guard when dropped, including on cancellation.
struct ConnectClaim<'a>(&'a NetResourceNode<Arc<TcpClient>>);

impl Drop for ConnectClaim<'_> {
    fn drop(&mut self) {
        self.0.mark_connected();
    }
}

/// TCP client node.
///
/// # Example Configuration
/// ```json
/// { "id": "push", "type": "net::tcp_client", "configuration": { "server": "ref://tcp01" } }
/// ```
pub struct TcpClientNode {
    resource: NetResourceNode<Arc<TcpClient>>,
    connect_wait: Duration,
}

impl TcpClientNode {
    pub fn new() -> Self {
        Self {
            resource: NetResourceNode::new(TCP_CLIENT_TYPE),
            connect_wait: Duration::ZERO,
        }
    }

    /// The client the next message would use.
    pub fn client(&self) -> Result<Arc<TcpClient>> {
        self.resource.connection()
    }

    async fn ensure_connected(&self, client: &TcpClient) -> Result<()> {
        if client.is_connected() {
            return Ok(());
        }
        if self.resource.try_claim_connect() {
            let _claim = ConnectClaim(&self.resource);
            return client.connect().await;
        }

        tokio::time::sleep(self.connect_wait).await;
        if client.is_connected() {
            Ok(())
        } else {
            Err(NodusError::ConnectInProgress {
                server: client.server().to_string(),
            })
        }
    }
}

impl Default for TcpClientNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for TcpClientNode {
    fn component_type(&self) -> &str {
        TCP_CLIENT_TYPE
    }

    fn init(&mut self, config: &EngineConfig, configuration: &Configuration) -> Result<()> {
        let settings: TcpClientConfig = decode(configuration)?;
        let server = settings.server.trim().to_string();
        if server.is_empty() {
            return Err(NodusError::ConfigValue {
                field: "server".to_string(),
                cause: "must not be empty".to_string(),
            });
        }
        if NodeUtils::is_init_net_resource(configuration) && NodeUtils::is_net_pool_ref(&server) {
            return Err(NodusError::ConfigValue {
                field: "server".to_string(),
                cause: "a pooled resource cannot reference the pool".to_string(),
            });
        }

        self.connect_wait = config.settings.connect_wait();
        let connect_timeout = config.settings.connect_timeout();
        let target = server.clone();
        self.resource.init(config, &server, move || {
            Ok(Arc::new(TcpClient::new(target.clone(), connect_timeout)))
        })
    }

    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
        Box::pin(async move {
            let client = self.resource.connection()?;
            self.ensure_connected(&client).await?;
            client.send(&msg.data).await?;
            Ok(Outcome::success(msg))
        })
    }

    fn destroy(&self) {
        if let Some(client) = self.resource.take_local() {
            tracing::debug!(server = %client.server(), "Closing TCP client");
            client.close();
        }
    }

    fn as_net_resource(&self) -> Option<&dyn NetResource> {
        Some(self)
    }
}

impl NetResource for TcpClientNode {
    fn net_resource(&self) -> Result<SharedResource> {
        let client = self.resource.connection()?;
        Ok(Arc::new(client))
    }
}
