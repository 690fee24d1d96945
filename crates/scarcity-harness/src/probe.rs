//! External-service reachability probes.

use std::time::Duration;

use tracing::{info, warn};

use scarcity_types::config::NodeConfig;

/// Per-probe timeout; a probe is a liveness check, not a health audit.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Reachability snapshot of the three external services.
#[derive(Clone, Copy, Debug)]
pub struct ProbeReport {
    pub freebird: bool,
    pub witness: bool,
    pub relay: bool,
}

impl ProbeReport {
    /// Whether every external service answered.
    pub fn all_up(&self) -> bool {
        self.freebird && self.witness && self.relay
    }

    /// Whether nothing answered (fully degraded operation).
    pub fn all_down(&self) -> bool {
        !self.freebird && !self.witness && !self.relay
    }
}

/// Probe every configured service and log the outcome.
pub async fn probe_services(config: &NodeConfig) -> ProbeReport {
    let freebird = probe_http(config.freebird.issuers.first(), "/.well-known/issuer").await;
    let witness = probe_http(config.witness.gateways.first(), "/v1/config").await;
    let relay = probe_relay(&config.hypertoken.relay_url).await;

    let report = ProbeReport {
        freebird,
        witness,
        relay,
    };
    info!(
        freebird = report.freebird,
        witness = report.witness,
        relay = report.relay,
        "service probe complete"
    );
    if report.all_down() {
        warn!("no external service reachable; running on fallback paths only");
    }
    report
}

async fn probe_http(base: Option<&String>, path: &str) -> bool {
    let Some(base) = base else {
        return false;
    };
    let url = format!("{}{}", base.trim_end_matches('/'), path);
    let Ok(client) = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() else {
        return false;
    };
    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// A relay probe is a plain TCP dial of the WebSocket host.
async fn probe_relay(relay_url: &str) -> bool {
    let Some(addr) = host_port(relay_url) else {
        return false;
    };
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, tokio::net::TcpStream::connect(&addr)).await,
        Ok(Ok(_))
    )
}

/// Extract `host:port` from a ws:// or wss:// URL, defaulting the port.
fn host_port(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host_part = rest.split('/').next()?;
    if host_part.is_empty() {
        return None;
    }
    if host_part.contains(':') {
        Some(host_part.to_string())
    } else {
        let port = if scheme == "wss" { 443 } else { 80 };
        Some(format!("{host_part}:{port}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port_extraction() {
        assert_eq!(
            host_port("ws://127.0.0.1:8520").as_deref(),
            Some("127.0.0.1:8520")
        );
        assert_eq!(
            host_port("wss://relay.example/path").as_deref(),
            Some("relay.example:443")
        );
        assert_eq!(host_port("not a url"), None);
    }

    #[tokio::test]
    async fn test_probe_all_down_offline() {
        let mut config = NodeConfig::default();
        config.freebird.issuers = vec!["http://127.0.0.1:9".to_string()];
        config.witness.gateways = vec!["http://127.0.0.1:19".to_string()];
        config.hypertoken.relay_url = "ws://127.0.0.1:29".to_string();
        let report = probe_services(&config).await;
        assert!(report.all_down());
        assert!(!report.all_up());
    }
}
