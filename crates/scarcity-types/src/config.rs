//! Node configuration sections.
//!
//! The persisted config is a JSON document with `witness`, `freebird`,
//! `hypertoken`, and `tor` sections. Environment variables override the
//! primary endpoints (see [`NodeConfig::apply_env`]).

use serde::{Deserialize, Serialize};

/// Complete node configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub witness: WitnessSettings,
    #[serde(default)]
    pub freebird: FreebirdSettings,
    #[serde(default)]
    pub hypertoken: HypertokenSettings,
    #[serde(default)]
    pub tor: TorSettings,
}

/// Witness federation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WitnessSettings {
    /// Gateway URLs. Two or more enable quorum querying.
    #[serde(default = "default_witness_gateways")]
    pub gateways: Vec<String>,
    /// Federation network identifier.
    #[serde(default = "default_network_id")]
    pub network_id: String,
    /// Signature threshold required for full confidence. Zero means
    /// "discover from the gateway config".
    #[serde(default)]
    pub threshold: usize,
    /// Witness BLS public keys (48-byte G1, hex) keyed by witness id.
    /// Enables local aggregate verification when the gateway is unreachable.
    #[serde(default)]
    pub witness_pubkeys: std::collections::HashMap<String, String>,
}

/// Freebird issuer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FreebirdSettings {
    /// Issuer endpoints, tried in order.
    #[serde(default = "default_freebird_issuers")]
    pub issuers: Vec<String>,
    /// Verifier endpoint.
    #[serde(default = "default_freebird_verifier")]
    pub verifier: String,
}

/// Peer-network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HypertokenSettings {
    /// Relay URL for the peer transport.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// Delay before attempting a direct-channel upgrade to a joined peer.
    #[serde(default = "default_upgrade_delay_ms")]
    pub upgrade_delay_ms: u64,
    /// Gossip proof-of-work difficulty in leading zero bits. Zero disables
    /// the PoW gate.
    #[serde(default)]
    pub pow_difficulty: u32,
}

/// Tor SOCKS5 proxy settings. Read once at adapter construction.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TorSettings {
    /// SOCKS5 proxy address, e.g. "socks5h://127.0.0.1:9050".
    #[serde(default)]
    pub socks5: Option<String>,
}

fn default_witness_gateways() -> Vec<String> {
    vec!["http://127.0.0.1:8720".to_string()]
}

fn default_network_id() -> String {
    "scarcity-main".to_string()
}

fn default_freebird_issuers() -> Vec<String> {
    vec!["http://127.0.0.1:8620".to_string()]
}

fn default_freebird_verifier() -> String {
    "http://127.0.0.1:8621".to_string()
}

fn default_relay_url() -> String {
    "ws://127.0.0.1:8520".to_string()
}

fn default_upgrade_delay_ms() -> u64 {
    2_000
}

impl Default for WitnessSettings {
    fn default() -> Self {
        Self {
            gateways: default_witness_gateways(),
            network_id: default_network_id(),
            threshold: 0,
            witness_pubkeys: std::collections::HashMap::new(),
        }
    }
}

impl Default for FreebirdSettings {
    fn default() -> Self {
        Self {
            issuers: default_freebird_issuers(),
            verifier: default_freebird_verifier(),
        }
    }
}

impl Default for HypertokenSettings {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            upgrade_delay_ms: default_upgrade_delay_ms(),
            pow_difficulty: 0,
        }
    }
}

impl NodeConfig {
    /// Overlay the well-known environment variables onto this config.
    ///
    /// `FREEBIRD_ISSUER_URL`, `FREEBIRD_VERIFIER_URL`, `WITNESS_GATEWAY_URL`,
    /// and `HYPERTOKEN_RELAY_URL` each replace their file-configured
    /// counterpart when set and non-empty.
    pub fn apply_env(&mut self) {
        if let Some(url) = env_nonempty("FREEBIRD_ISSUER_URL") {
            self.freebird.issuers = vec![url];
        }
        if let Some(url) = env_nonempty("FREEBIRD_VERIFIER_URL") {
            self.freebird.verifier = url;
        }
        if let Some(url) = env_nonempty("WITNESS_GATEWAY_URL") {
            self.witness.gateways = vec![url];
        }
        if let Some(url) = env_nonempty("HYPERTOKEN_RELAY_URL") {
            self.hypertoken.relay_url = url;
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = NodeConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: NodeConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.witness.network_id, "scarcity-main");
        assert_eq!(back.hypertoken.upgrade_delay_ms, 2_000);
        assert!(back.tor.socks5.is_none());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let json = r#"{"witness": {"gateways": ["http://gw.example:1234"]}}"#;
        let config: NodeConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.witness.gateways, vec!["http://gw.example:1234"]);
        assert_eq!(config.freebird.verifier, "http://127.0.0.1:8621");
    }
}
