//! Duplex text channels carrying the flight protocol.
//!
//! [`WsChannel`] talks to a real flight server over WebSocket.
//! [`MemoryChannel`] is an in-process pair used to embed a server in the same
//! process (and by the test suites).

use crate::error::ChannelError;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Ordered, reliable delivery of whole text messages.
pub trait Channel: Send {
    /// Write one message.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Wait for the next message. Returns [`ChannelError::Closed`] once the
    /// peer is gone.
    fn recv_text(&mut self) -> impl Future<Output = Result<String, ChannelError>> + Send;

    /// Close the channel. Closing twice is not an error.
    fn close(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

// ========== WEBSOCKET ==========

/// WebSocket client channel.
///
/// Keep-alive is left to the transport: server pings are answered by
/// tungstenite while reading, and ping/pong frames never surface here.
pub struct WsChannel {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsChannel {
    /// Connect to a flight server, e.g. `ws://localhost:8765`.
    pub async fn connect(url: &str) -> Result<Self> {
        let request = url.into_client_request()?;
        let (socket, _) = connect_async(request).await?;
        tracing::debug!(url, "WebSocket connected");
        Ok(Self { socket })
    }
}

impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(map_ws_error)
    }

    async fn recv_text(&mut self) -> Result<String, ChannelError> {
        while let Some(msg) = self.socket.next().await {
            match msg.map_err(map_ws_error)? {
                Message::Text(text) => return Ok(text),
                Message::Binary(data) => {
                    return String::from_utf8(data)
                        .map_err(|_| ChannelError::Transport("non-text binary frame".to_string()));
                }
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                        .unwrap_or_else(|| "close frame".to_string());
                    return Err(ChannelError::Closed(reason));
                }
                _ => {}
            }
        }
        Err(ChannelError::Closed("stream ended".to_string()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        match self.socket.close(None).await {
            Ok(()) => Ok(()),
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(map_ws_error(err)),
        }
    }
}

fn map_ws_error(err: WsError) -> ChannelError {
    match &err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Io(_)
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            ChannelError::Closed(err.to_string())
        }
        _ => ChannelError::Transport(err.to_string()),
    }
}

// ========== IN-MEMORY ==========

/// One end of an in-process channel pair.
pub struct MemoryChannel {
    tx: Option<mpsc::Sender<String>>,
    rx: mpsc::Receiver<String>,
}

impl MemoryChannel {
    /// Create two connected ends. `capacity` bounds the messages in flight
    /// per direction.
    pub fn pair(capacity: usize) -> (MemoryChannel, MemoryChannel) {
        let capacity = capacity.max(1);
        let (a_tx, a_rx) = mpsc::channel(capacity);
        let (b_tx, b_rx) = mpsc::channel(capacity);
        (
            MemoryChannel { tx: Some(a_tx), rx: b_rx },
            MemoryChannel { tx: Some(b_tx), rx: a_rx },
        )
    }
}

impl Channel for MemoryChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ChannelError::Closed("closed locally".to_string()))?;
        tx.send(text)
            .await
            .map_err(|_| ChannelError::Closed("peer dropped".to_string()))
    }

    async fn recv_text(&mut self) -> Result<String, ChannelError> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| ChannelError::Closed("peer dropped".to_string()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}
