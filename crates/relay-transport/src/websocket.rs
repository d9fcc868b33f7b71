//! WebSocket transport implementation.
//!
//! This module provides a WebSocket-based transport using tokio-tungstenite.
//! The origin policy is applied during the HTTP upgrade: a denied handshake
//! is answered with 403 and never becomes a socket.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        http::StatusCode,
        Error as WsError, Message,
    },
    WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::traits::{Listener, OriginPolicy, Socket, TransportError};

/// WebSocket listener configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum message size in bytes.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().expect("valid default address"),
            max_message_size: 64 * 1024, // 64 KB
        }
    }
}

/// WebSocket listener with handshake origin gating.
pub struct WebSocketListener {
    listener: TcpListener,
    config: WebSocketConfig,
    origin_policy: OriginPolicy,
}

impl WebSocketListener {
    /// Create a new WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn new(
        config: WebSocketConfig,
        origin_policy: OriginPolicy,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(TransportError::Io)?;

        info!("WebSocket transport listening on {}", config.bind_addr);

        Ok(Self {
            listener,
            config,
            origin_policy,
        })
    }

    /// Create a listener with default config that allows every origin.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        Self::new(
            WebSocketConfig {
                bind_addr: addr,
                ..Default::default()
            },
            std::sync::Arc::new(|_| true),
        )
        .await
    }

    /// Get the local address this listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }
}

#[async_trait]
impl Listener for WebSocketListener {
    async fn accept(&self) -> Result<Box<dyn Socket>, TransportError> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Io)?;

        debug!("Accepted TCP connection from {}", addr);

        let policy = self.origin_policy.clone();
        let mut origin: Option<String> = None;
        let mut rejected = false;

        let callback = |request: &Request, response: Response| {
            origin = request
                .headers()
                .get("origin")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            if policy(origin.as_deref()) {
                Ok(response)
            } else {
                rejected = true;
                let mut denial = ErrorResponse::new(Some("origin not allowed".to_string()));
                *denial.status_mut() = StatusCode::FORBIDDEN;
                Err(denial)
            }
        };

        // The handshake future borrows `origin` and `rejected` through the
        // callback; it must be dropped before they are read.
        let handshake = accept_hdr_async(stream, callback).await;

        match handshake {
            Ok(ws_stream) => {
                debug!("WebSocket handshake completed with {}", addr);
                Ok(Box::new(WebSocketSocket::new(
                    ws_stream,
                    addr,
                    origin,
                    self.config.max_message_size,
                )))
            }
            Err(_) if rejected => {
                warn!(origin = origin.as_deref().unwrap_or("<none>"), remote = %addr, "Handshake rejected by origin policy");
                Err(TransportError::OriginRejected)
            }
            Err(error) => {
                warn!("WebSocket handshake failed: {}", error);
                Err(TransportError::Other(format!(
                    "WebSocket handshake failed: {error}"
                )))
            }
        }
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// An accepted WebSocket connection.
pub struct WebSocketSocket {
    stream: WebSocketStream<TcpStream>,
    remote_addr: SocketAddr,
    origin: Option<String>,
    is_open: bool,
    max_message_size: usize,
}

impl WebSocketSocket {
    fn new(
        stream: WebSocketStream<TcpStream>,
        remote_addr: SocketAddr,
        origin: Option<String>,
        max_message_size: usize,
    ) -> Self {
        Self {
            stream,
            remote_addr,
            origin,
            is_open: true,
            max_message_size,
        }
    }
}

#[async_trait]
impl Socket for WebSocketSocket {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > self.max_message_size {
                        warn!(
                            "Message too large: {} bytes (max: {})",
                            text.len(),
                            self.max_message_size
                        );
                        return Err(TransportError::ReceiveFailed("message too large".into()));
                    }
                    return Ok(Some(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    // The wire protocol is textual; accept binary frames
                    // that carry valid UTF-8 for client compatibility.
                    match String::from_utf8(data) {
                        Ok(text) => return Ok(Some(text)),
                        Err(_) => warn!("Dropping non-UTF-8 binary frame"),
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(error) = self.stream.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {}", error);
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    // Ignore pong messages
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {
                    // Raw frame, ignore
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(error)) => {
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(error.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|error| TransportError::SendFailed(error.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;
        self.stream
            .close(None)
            .await
            .map_err(|error| TransportError::Other(format!("failed to close: {error}")))
    }

    fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    fn remote_addr(&self) -> Option<String> {
        Some(self.remote_addr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    async fn bind_with_policy(policy: OriginPolicy) -> (WebSocketListener, SocketAddr) {
        let listener = WebSocketListener::new(
            WebSocketConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
                ..Default::default()
            },
            policy,
        )
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    fn request_with_origin(
        addr: SocketAddr,
        origin: &str,
    ) -> tokio_tungstenite::tungstenite::handshake::client::Request {
        let mut request = format!("ws://{addr}").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", origin.parse().unwrap());
        request
    }

    #[test]
    fn test_websocket_config_default() {
        let config = WebSocketConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_message_size, 64 * 1024);
    }

    #[tokio::test]
    async fn test_text_roundtrip() {
        let (listener, addr) = bind_with_policy(Arc::new(|_| true)).await;

        let client = tokio::spawn(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
            ws.send(Message::Text("hello".to_string())).await.unwrap();
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => text,
                other => panic!("unexpected message: {other:?}"),
            }
        });

        let mut socket = listener.accept().await.unwrap();
        assert_eq!(socket.recv().await.unwrap(), Some("hello".to_string()));
        socket.send("world".to_string()).await.unwrap();

        assert_eq!(client.await.unwrap(), "world");
    }

    #[tokio::test]
    async fn test_origin_allowed() {
        let (listener, addr) =
            bind_with_policy(Arc::new(|origin| origin == Some("https://good.example"))).await;

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(request_with_origin(addr, "https://good.example"))
                .await
                .map(|_| ())
        });

        let socket = listener.accept().await.unwrap();
        assert_eq!(socket.origin(), Some("https://good.example"));
        assert!(client.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_origin_rejected_creates_no_socket() {
        let (listener, addr) =
            bind_with_policy(Arc::new(|origin| origin == Some("https://good.example"))).await;

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(request_with_origin(addr, "https://evil.example"))
                .await
                .map(|_| ())
        });

        assert!(matches!(
            listener.accept().await,
            Err(TransportError::OriginRejected)
        ));
        assert!(client.await.unwrap().is_err());
    }
}
