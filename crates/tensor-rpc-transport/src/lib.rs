//! Transport abstraction layer for tensor RPC.
//!
//! Provides the [`Transport`] and [`Connection`] traits that move whole
//! encoded messages between the master and its workers. A transport never
//! splits or merges messages: every `send` on one side is exactly one
//! `recv` on the other, and each received buffer is wrapped in a fresh
//! [`RpcMessage`].
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`
//!
//! The in-process [`channel`] transport is always available.

#![allow(async_fn_in_trait)]

pub mod channel;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use channel::{
    channel_pair, channel_transport, ChannelConnection, ChannelConnector, ChannelTransport,
};
pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tensor_rpc_protocol::RpcMessage;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide identifier of one master/worker link, used to tag log
/// lines on both ends. Shown as `conn-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Issues an identifier no other connection in this process has,
    /// whichever transport created it.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The worker side of a transport: hands out one [`Connection`] per master
/// that dials in.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next master to connect.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting masters. Connections already handed out stay open.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A bidirectional link that carries whole encoded calls and replies.
///
/// Implementations preserve message boundaries: one `send` is observed as
/// exactly one `recv` by the peer, never split and never merged with a
/// neighbouring buffer.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Hands one complete buffer to the peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next complete buffer from the peer, or `Ok(None)` once the peer has
    /// closed and everything it sent has been delivered.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stops sending. The peer's `recv` returns `Ok(None)` after draining.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Sends an encoded call or reply.
    async fn send_message(&self, message: &RpcMessage) -> Result<(), Self::Error> {
        self.send(message.as_bytes()).await
    }

    /// Receives the next buffer as a fresh [`RpcMessage`] with its cursor
    /// at byte 0. The buffer is moved into the envelope, not copied.
    async fn recv_message(&self) -> Result<Option<RpcMessage>, Self::Error> {
        Ok(self.recv().await?.map(RpcMessage::new))
    }
}
