//! Duplex stream abstraction and its WebSocket implementation.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use membrane_proto::{ClientMessage, ServerMessage};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Errors on a single duplex stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The stream could not be opened.
    #[error("failed to open stream: {0}")]
    Connect(String),

    /// Sending a message failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Receiving a message failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// The peer closed the stream abruptly, without the graceful
    /// end-of-stream path. Build/discovery runs expect this shape.
    #[error("connection closed")]
    ConnectionClosed,

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] membrane_proto::ProtoError),
}

/// One duplex stream to the membrane server.
///
/// `receive` returning `Ok(None)` is the expected terminal state: the peer
/// finished the stream cleanly. Implementations must deliver inbound
/// messages strictly in arrival order.
#[async_trait]
pub trait WorkStream: Send {
    /// Inbound message type.
    type Inbound: Send;
    /// Outbound message type.
    type Outbound: Send;

    /// Send one message.
    async fn send(&mut self, msg: Self::Outbound) -> Result<(), StreamError>;

    /// Receive the next message, or `None` on clean end of stream.
    async fn receive(&mut self) -> Result<Option<Self::Inbound>, StreamError>;

    /// Close the send side. Safe to call after the peer has already closed.
    async fn close_send(&mut self) -> Result<(), StreamError>;
}

/// WebSocket-backed stream carrying JSON text frames.
#[derive(Debug)]
pub struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsStream {
    /// Wrap an established WebSocket.
    #[must_use]
    pub fn new(inner: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { inner }
    }
}

fn map_ws_error(e: WsError, shape: fn(String) -> StreamError) -> StreamError {
    match e {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            StreamError::ConnectionClosed
        }
        other => shape(other.to_string()),
    }
}

#[async_trait]
impl WorkStream for WsStream {
    type Inbound = ServerMessage;
    type Outbound = ClientMessage;

    async fn send(&mut self, msg: ClientMessage) -> Result<(), StreamError> {
        let json = msg.to_json()?;
        self.inner
            .send(Message::Text(json))
            .await
            .map_err(|e| map_ws_error(e, StreamError::Send))
    }

    async fn receive(&mut self) -> Result<Option<ServerMessage>, StreamError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => {
                    let msg = ServerMessage::from_json(&text)?;
                    return Ok(Some(msg));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(other)) => {
                    // Ping/pong are answered by tungstenite itself.
                    debug!(frame = ?other, "skipping non-text frame");
                }
                Some(Err(e)) => return Err(map_ws_error(e, StreamError::Receive)),
            }
        }
    }

    async fn close_send(&mut self) -> Result<(), StreamError> {
        match self.inner.close(None).await {
            Ok(())
            | Err(
                WsError::ConnectionClosed
                | WsError::AlreadyClosed
                | WsError::Protocol(ProtocolError::SendAfterClosing),
            ) => Ok(()),
            Err(e) => Err(StreamError::Send(e.to_string())),
        }
    }
}
