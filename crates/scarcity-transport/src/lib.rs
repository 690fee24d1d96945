//! # scarcity-transport
//!
//! Peer-addressable message bus over an untrusted relay.
//!
//! The relay connection is a WebSocket carrying JSON frames: a `welcome`
//! assigns this node its peer id, `peer:joined` / `peer:left` maintain the
//! peer set, and `p2p` frames route application payloads. After a
//! configurable delay each joined peer may be upgraded to a direct QUIC
//! channel negotiated through the relay; sends transparently fall back to
//! the relay when the direct channel fails. Consumers never observe which
//! path carried a message.
//!
//! ## Modules
//!
//! - [`frames`] — Relay wire frames
//! - [`direct`] — Direct-channel QUIC endpoint
//! - [`transport`] — The [`PeerTransport`] event loop

pub mod direct;
pub mod frames;
pub mod transport;

pub use transport::{InboundMessage, PeerEvent, PeerTransport, TransportConfig};

/// Hard ceiling on reaching `ready` (receiving `welcome`) after connect.
pub const READY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Ceiling on the cleanup path when closing the transport.
pub const CLOSE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// Error types for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The relay connection failed or closed.
    #[error("relay connection: {0}")]
    Relay(String),

    /// `welcome` did not arrive within [`READY_TIMEOUT`].
    #[error("relay did not become ready within {0:?}")]
    ReadyTimeout(std::time::Duration),

    /// The transport has been closed; in-flight sends fail with this.
    #[error("not connected")]
    NotConnected,

    /// The target peer is not in the known peer set.
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// A frame failed to encode or decode.
    #[error("frame codec: {0}")]
    Codec(String),

    /// TLS or QUIC setup for the direct channel failed.
    #[error("direct channel: {0}")]
    Direct(String),
}

/// Convenience result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
