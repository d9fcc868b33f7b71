//! # relay-transport
//!
//! Transport layer for the relay realtime router.
//!
//! The router core never touches sockets directly; it consumes the
//! [`Listener`] and [`Socket`] traits defined here. The shipped
//! implementation is WebSocket via tokio-tungstenite, with origin gating
//! applied during the HTTP upgrade - a denied handshake never becomes a
//! connection.
//!
//! ```rust,ignore
//! use relay_transport::{Listener, WebSocketListener};
//!
//! async fn accept_loop(listener: WebSocketListener) {
//!     loop {
//!         match listener.accept().await {
//!             Ok(socket) => { /* hand to the router pump */ }
//!             Err(error) => { /* log and keep accepting */ }
//!         }
//!     }
//! }
//! ```

pub mod traits;
pub mod websocket;

pub use traits::{Listener, OriginPolicy, Socket, TransportError};
pub use websocket::{WebSocketConfig, WebSocketListener};
