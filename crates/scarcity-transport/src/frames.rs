//! Relay wire frames.
//!
//! Every frame on the relay WebSocket is a JSON object tagged by `type`.
//! Application payloads ride in `p2p` frames; payloads whose own `type`
//! starts with `transport:` are signaling for the direct-channel upgrade
//! and are consumed internally, never delivered to subscribers.

use serde::{Deserialize, Serialize};

/// Prefix marking transport-internal signaling payloads.
pub const SIGNALING_PREFIX: &str = "transport:";

/// Payload type for a direct-channel offer.
pub const DIRECT_OFFER: &str = "transport:direct-offer";

/// A frame on the relay socket.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayFrame {
    /// Relay assigns this node its peer id; the transport is ready.
    #[serde(rename = "welcome")]
    Welcome {
        #[serde(rename = "peerId")]
        peer_id: String,
    },

    /// A peer joined the relay.
    #[serde(rename = "peer:joined")]
    PeerJoined {
        #[serde(rename = "peerId")]
        peer_id: String,
    },

    /// A peer left the relay.
    #[serde(rename = "peer:left")]
    PeerLeft {
        #[serde(rename = "peerId")]
        peer_id: String,
    },

    /// Routed application payload.
    #[serde(rename = "p2p")]
    P2p {
        #[serde(rename = "targetPeerId", skip_serializing_if = "Option::is_none", default)]
        target_peer_id: Option<String>,
        #[serde(rename = "fromPeerId", skip_serializing_if = "Option::is_none", default)]
        from_peer_id: Option<String>,
        payload: serde_json::Value,
    },
}

impl RelayFrame {
    /// Encode to the JSON text carried on the socket.
    pub fn encode(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::TransportError::Codec(e.to_string()))
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> crate::Result<Self> {
        serde_json::from_str(text).map_err(|e| crate::TransportError::Codec(e.to_string()))
    }
}

/// Whether a p2p payload is transport-internal signaling.
pub fn is_signaling(payload: &serde_json::Value) -> bool {
    payload
        .get("type")
        .and_then(|t| t.as_str())
        .is_some_and(|t| t.starts_with(SIGNALING_PREFIX))
}

/// Build a direct-channel offer payload advertising our QUIC address.
pub fn direct_offer(addr: &str) -> serde_json::Value {
    serde_json::json!({ "type": DIRECT_OFFER, "addr": addr })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_roundtrip() {
        let text = r#"{"type":"welcome","peerId":"p-1"}"#;
        match RelayFrame::decode(text).expect("decode") {
            RelayFrame::Welcome { peer_id } => assert_eq!(peer_id, "p-1"),
            other => unreachable!("expected welcome, got {other:?}"),
        }
    }

    #[test]
    fn test_peer_event_tag_names() {
        let joined = RelayFrame::PeerJoined {
            peer_id: "p-2".into(),
        };
        let json = joined.encode().expect("encode");
        assert!(json.contains(r#""type":"peer:joined""#));
        let left = RelayFrame::decode(r#"{"type":"peer:left","peerId":"p-2"}"#).expect("decode");
        assert!(matches!(left, RelayFrame::PeerLeft { .. }));
    }

    #[test]
    fn test_p2p_frame_shape() {
        let frame = RelayFrame::P2p {
            target_peer_id: Some("p-3".into()),
            from_peer_id: None,
            payload: serde_json::json!({"type": "ping", "timestamp": 1}),
        };
        let json = frame.encode().expect("encode");
        assert!(json.contains(r#""targetPeerId":"p-3""#));
        assert!(!json.contains("fromPeerId"));
    }

    #[test]
    fn test_signaling_detection() {
        assert!(is_signaling(&direct_offer("127.0.0.1:4567")));
        assert!(!is_signaling(&serde_json::json!({"type": "nullifier"})));
        assert!(!is_signaling(&serde_json::json!({"no_type": true})));
    }
}
