//! Single-exchange TCP connection.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::debug;

use crate::config::LimitsConfig;
use crate::error::{ProtocolErrorKind, RpcError};
use crate::protocol::{handshake, recv_value, send_value};

struct ConnectionIo {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

/// One TCP connection carrying exactly one request/response exchange.
///
/// The connection is exclusively owned by the side that opened or accepted
/// it. [`Connection::close`] releases the socket and both buffers; it may be
/// called any number of times, including after a failed exchange. Dropping
/// an unclosed connection releases the same resources without the orderly
/// shutdown.
pub struct Connection {
    peer: String,
    io: Option<ConnectionIo>,
    max_message_size: usize,
    io_timeout: Duration,
}

impl Connection {
    /// Connect to a service and complete the preamble handshake.
    pub async fn open(address: &str, limits: &LimitsConfig) -> Result<Self, RpcError> {
        let connect_timeout = limits.connect_timeout();
        let stream = match timeout(connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RpcError::ConnectionFailure {
                    address: address.to_string(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(RpcError::Timeout {
                    operation: "connecting",
                    after_ms: connect_timeout.as_millis() as u64,
                })
            }
        };

        debug!(peer = %address, "Connected");
        Self::establish(stream, address.to_string(), limits).await
    }

    /// Wait for one peer on `listener` and complete the preamble handshake.
    pub async fn accept(listener: &TcpListener, limits: &LimitsConfig) -> Result<Self, RpcError> {
        let (stream, addr) = listener.accept().await?;
        debug!(peer = %addr, "Accepted connection");
        Self::establish(stream, addr.to_string(), limits).await
    }

    /// Wrap an already-accepted stream and complete the preamble handshake.
    ///
    /// On handshake failure the stream is released before returning.
    pub async fn establish(
        stream: TcpStream,
        peer: String,
        limits: &LimitsConfig,
    ) -> Result<Self, RpcError> {
        // Frames are small and flushed explicitly; don't let Nagle hold them.
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        let mut conn = Self {
            peer,
            io: Some(ConnectionIo {
                reader: BufReader::new(read_half),
                writer: BufWriter::new(write_half),
            }),
            max_message_size: limits.max_message_size,
            io_timeout: limits.io_timeout(),
        };

        let io_timeout = conn.io_timeout;
        let result = match conn.io.as_mut() {
            Some(io) => handshake(&mut io.reader, &mut io.writer, io_timeout).await,
            None => Err(RpcError::protocol(ProtocolErrorKind::ConnectionClosed)),
        };

        match result {
            Ok(()) => Ok(conn),
            Err(e) => {
                conn.close().await;
                Err(e)
            }
        }
    }

    /// Peer address, for logging.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.io.is_none()
    }

    fn io_mut(&mut self) -> Result<&mut ConnectionIo, RpcError> {
        self.io
            .as_mut()
            .ok_or_else(|| RpcError::protocol(ProtocolErrorKind::ConnectionClosed))
    }

    /// Encode and send one message.
    pub async fn send<T: Serialize>(&mut self, value: &T) -> Result<(), RpcError> {
        let io_timeout = self.io_timeout;
        let io = self.io_mut()?;
        send_value(&mut io.writer, value, io_timeout).await
    }

    /// Receive and decode one message, bounded by the I/O timeout.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T, RpcError> {
        let (max_size, io_timeout) = (self.max_message_size, self.io_timeout);
        let io = self.io_mut()?;
        recv_value(&mut io.reader, max_size, io_timeout).await
    }

    /// Send a request and wait for its response.
    pub async fn call<Req, Resp>(&mut self, request: &Req) -> Result<Resp, RpcError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        self.send(request).await?;
        self.recv().await
    }

    /// Release the connection.
    ///
    /// Flushes and shuts down the write half, then drops both halves and their
    /// buffers. Shutdown errors are logged, not returned: the resources are
    /// released either way.
    pub async fn close(&mut self) {
        let Some(mut io) = self.io.take() else {
            return;
        };

        match timeout(self.io_timeout, io.writer.shutdown()).await {
            Ok(Ok(())) => debug!(peer = %self.peer, "Connection closed"),
            Ok(Err(e)) => debug!(peer = %self.peer, error = %e, "Shutdown failed while closing"),
            Err(_) => debug!(peer = %self.peer, "Shutdown timed out while closing"),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
