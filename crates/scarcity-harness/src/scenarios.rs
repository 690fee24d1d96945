//! End-to-end scenario orchestration.
//!
//! Each scenario exercises the full stack — engine, adapters, gossip,
//! validator — using only in-process peers, so the self-test runs
//! identically against live services and on the fallback paths.

use std::sync::Arc;

use tracing::{info, warn};

use scarcity_freebird::FreebirdClient;
use scarcity_gossip::{GossipConfig, NullifierGossip, PeerLink, WitnessProofVerifier};
use scarcity_token::{TokenEngine, TokenError};
use scarcity_types::config::NodeConfig;
use scarcity_types::{now_ms, Attestation, GossipMessage, HtlcCondition, PeerDirection};
use scarcity_validator::{TransferValidator, ValidatorConfig};
use scarcity_witness::WitnessClient;

/// A peer link with no peers behind it; sends succeed and go nowhere.
/// Scenario nodes are wired through gossip state directly.
pub struct NullLink;

#[async_trait::async_trait]
impl PeerLink for NullLink {
    async fn send(&self, _peer_id: &str, _message: &GossipMessage) -> bool {
        true
    }

    async fn disconnect(&self, _peer_id: &str) {}
}

type ScenarioGossip = NullifierGossip<NullLink, WitnessProofVerifier>;

/// Outcome of one scenario.
#[derive(Clone, Debug)]
pub struct ScenarioOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl ScenarioOutcome {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

/// One node's worth of protocol stack.
struct Node {
    engine: TokenEngine<ScenarioGossip>,
    gossip: Arc<ScenarioGossip>,
    validator: TransferValidator<ScenarioGossip, WitnessClient>,
}

fn build_node(config: &NodeConfig) -> anyhow::Result<Node> {
    let freebird = Arc::new(FreebirdClient::new(
        config.freebird.clone(),
        &config.tor,
    )?);
    let witness = Arc::new(WitnessClient::new(config.witness.clone())?);
    let gossip = Arc::new(NullifierGossip::new(
        GossipConfig {
            pow_difficulty: config.hypertoken.pow_difficulty,
            ..GossipConfig::default()
        },
        Arc::new(NullLink),
        Arc::new(WitnessProofVerifier(witness.clone())),
    ));
    let engine = TokenEngine::new(freebird, witness.clone(), gossip.clone());
    let validator = TransferValidator::new(
        ValidatorConfig::default(),
        gossip.clone(),
        witness,
    );
    Ok(Node {
        engine,
        gossip,
        validator,
    })
}

/// Run every scenario in order, collecting outcomes.
pub async fn run_all(config: &NodeConfig) -> Vec<ScenarioOutcome> {
    let mut outcomes = Vec::new();
    outcomes.push(run(basic_transfer(config)).await);
    outcomes.push(run(double_spend(config)).await);
    outcomes.push(run(fallback_degradation(config)).await);
    outcomes.push(run(split_conservation(config)).await);
    outcomes.push(run(htlc_refund(config)).await);
    outcomes.push(run(spam_resistance(config)).await);
    outcomes
}

async fn run(
    scenario: impl std::future::Future<Output = ScenarioOutcome>,
) -> ScenarioOutcome {
    let outcome = scenario.await;
    if outcome.passed {
        info!(scenario = outcome.name, detail = %outcome.detail, "scenario passed");
    } else {
        warn!(scenario = outcome.name, detail = %outcome.detail, "scenario FAILED");
    }
    outcome
}

/// Mint, transfer, and receive on a second node.
async fn basic_transfer(config: &NodeConfig) -> ScenarioOutcome {
    const NAME: &str = "basic-transfer";
    let (sender, receiver) = match (build_node(config), build_node(config)) {
        (Ok(s), Ok(r)) => (s, r),
        (Err(e), _) | (_, Err(e)) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    let mut token = match sender.engine.mint(100) {
        Ok(token) => token,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };
    let package = match sender.engine.transfer(&mut token, b"scenario-recipient").await {
        Ok(package) => package,
        Err(e) => return ScenarioOutcome::fail(NAME, format!("transfer: {e}")),
    };
    if !token.spent {
        return ScenarioOutcome::fail(NAME, "source not marked spent");
    }

    let result = receiver.validator.validate_fast(&package).await;
    let received = match receiver.engine.receive(&package, [0x21; 32]).await {
        Ok(received) => received,
        Err(e) => return ScenarioOutcome::fail(NAME, format!("receive: {e}")),
    };
    if received.amount != 100 {
        return ScenarioOutcome::fail(NAME, "amount not conserved");
    }

    // On a live network with peers the validator admits; degraded it
    // reports exactly the confidence shortfall.
    let acceptable =
        result.valid || result.reason.as_deref() == Some("Confidence below threshold");
    if acceptable {
        ScenarioOutcome::pass(NAME, format!("confidence {:.2}", result.confidence))
    } else {
        ScenarioOutcome::fail(NAME, format!("unexpected rejection: {:?}", result.reason))
    }
}

/// A spent instance cannot spend again, and a receiver that saw the spend
/// via gossip rejects a replayed package.
async fn double_spend(config: &NodeConfig) -> ScenarioOutcome {
    const NAME: &str = "double-spend";
    let (sender, receiver) = match (build_node(config), build_node(config)) {
        (Ok(s), Ok(r)) => (s, r),
        (Err(e), _) | (_, Err(e)) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    let mut token = match sender.engine.mint(100) {
        Ok(token) => token,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };
    let package = match sender.engine.transfer(&mut token, b"first-recipient").await {
        Ok(package) => package,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    // Local alarm: the same instance refuses a second spend.
    if !matches!(
        sender.engine.transfer(&mut token, b"second-recipient").await,
        Err(TokenError::AlreadySpent)
    ) {
        return ScenarioOutcome::fail(NAME, "second local spend was not refused");
    }

    // Receiver-side alarm: the spend arrives by gossip, then the package
    // is replayed to the validator.
    receiver
        .gossip
        .peer_connected("relay-peer", PeerDirection::Inbound, None)
        .await;
    receiver
        .gossip
        .handle_message(
            "relay-peer",
            GossipMessage::Nullifier {
                nullifier: package.nullifier,
                proof: package.proof.clone(),
                timestamp: now_ms(),
                ownership_proof: package.ownership_proof,
                pow_nonce: None,
            },
        )
        .await;

    let verdict = receiver.validator.validate_fast(&package).await;
    if verdict.valid {
        return ScenarioOutcome::fail(NAME, "replayed package was admitted");
    }
    match verdict.reason.as_deref() {
        Some(reason) if reason.starts_with("Double-spend detected") => {
            ScenarioOutcome::pass(NAME, reason.to_string())
        }
        other => ScenarioOutcome::fail(NAME, format!("wrong rejection: {other:?}")),
    }
}

/// With services unreachable the flow still completes, at low confidence.
async fn fallback_degradation(config: &NodeConfig) -> ScenarioOutcome {
    const NAME: &str = "fallback-degradation";
    let mut offline = config.clone();
    offline.freebird.issuers = vec!["http://127.0.0.1:9".to_string()];
    offline.freebird.verifier = "http://127.0.0.1:19".to_string();
    offline.witness.gateways = vec!["http://127.0.0.1:29".to_string()];

    let (sender, receiver) = match (build_node(&offline), build_node(&offline)) {
        (Ok(s), Ok(r)) => (s, r),
        (Err(e), _) | (_, Err(e)) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    let mut token = match sender.engine.mint(50) {
        Ok(token) => token,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };
    let package = match sender.engine.transfer(&mut token, b"offline-recipient").await {
        Ok(package) => package,
        Err(e) => return ScenarioOutcome::fail(NAME, format!("offline transfer: {e}")),
    };
    if receiver.engine.receive(&package, [0x33; 32]).await.is_err() {
        return ScenarioOutcome::fail(NAME, "offline receive failed");
    }

    let verdict = receiver.validator.validate_fast(&package).await;
    if !verdict.valid && verdict.confidence < 0.7 {
        ScenarioOutcome::pass(NAME, format!("degraded confidence {:.2}", verdict.confidence))
    } else {
        ScenarioOutcome::fail(
            NAME,
            format!("expected sub-threshold confidence, got {:.2}", verdict.confidence),
        )
    }
}

/// Split 100 into 30/40/30 and receive every part.
async fn split_conservation(config: &NodeConfig) -> ScenarioOutcome {
    const NAME: &str = "split-conservation";
    let node = match build_node(config) {
        Ok(node) => node,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    let mut token = match node.engine.mint(100) {
        Ok(token) => token,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };
    let packages = match node
        .engine
        .split(&mut token, &[30, 40, 30], &[b"k1", b"k2", b"k3"])
        .await
    {
        Ok(packages) => packages,
        Err(e) => return ScenarioOutcome::fail(NAME, format!("split: {e}")),
    };

    let mut total = 0;
    for (index, package) in packages.iter().enumerate() {
        match node.engine.receive(package, [index as u8 + 1; 32]).await {
            Ok(received) => total += received.amount,
            Err(e) => return ScenarioOutcome::fail(NAME, format!("receive part {index}: {e}")),
        }
    }
    if total == 100 && token.spent {
        ScenarioOutcome::pass(NAME, "three parts, total conserved")
    } else {
        ScenarioOutcome::fail(NAME, format!("total {total}, spent {}", token.spent))
    }
}

/// Time-locked transfer: late claim fails, refund succeeds.
async fn htlc_refund(config: &NodeConfig) -> ScenarioOutcome {
    const NAME: &str = "htlc-refund";
    let node = match build_node(config) {
        Ok(node) => node,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    let mut token = match node.engine.mint(40) {
        Ok(token) => token,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };
    let condition = HtlcCondition::Time {
        timelock_ms: now_ms() + 100,
    };
    let package = match node
        .engine
        .transfer_htlc(&mut token, b"locked-recipient", condition, Some("ee".repeat(32)))
        .await
    {
        Ok(package) => package,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    if !matches!(
        node.engine.receive(&package, [0x44; 32]).await,
        Err(TokenError::TimelockExpired { .. })
    ) {
        return ScenarioOutcome::fail(NAME, "late claim was not refused");
    }
    match node.engine.refund_htlc(&package, [0x55; 32]).await {
        Ok(refunded) if refunded.amount == 40 => {
            ScenarioOutcome::pass(NAME, "claim refused, refund honored")
        }
        Ok(_) => ScenarioOutcome::fail(NAME, "refund amount wrong"),
        Err(e) => ScenarioOutcome::fail(NAME, format!("refund: {e}")),
    }
}

/// Ten hostile peers flood unverifiable spends; nothing lands and the
/// peers are evicted.
async fn spam_resistance(config: &NodeConfig) -> ScenarioOutcome {
    const NAME: &str = "spam-resistance";
    let node = match build_node(config) {
        Ok(node) => node,
        Err(e) => return ScenarioOutcome::fail(NAME, e.to_string()),
    };

    let hostile_proof = |nullifier: u8, index: u8| Attestation {
        // A single fabricated signature: fails gateway verification and
        // the structural fallback alike.
        hash: [nullifier; 32],
        timestamp: now_ms() - 10_000_000,
        signatures: vec![format!("bogus-{index}")],
        witness_ids: vec![format!("fake-{index}")],
        aggregated: false,
        raw: None,
    };

    for peer in 0..10u8 {
        let peer_id = format!("hostile-{peer}");
        node.gossip
            .peer_connected(&peer_id, PeerDirection::Inbound, None)
            .await;
        for index in 0..20u8 {
            let nullifier = [peer.wrapping_mul(20).wrapping_add(index); 32];
            node.gossip
                .handle_message(
                    &peer_id,
                    GossipMessage::Nullifier {
                        nullifier,
                        proof: hostile_proof(nullifier[0], index),
                        timestamp: now_ms(),
                        ownership_proof: None,
                        pow_nonce: None,
                    },
                )
                .await;
        }
    }

    let stats = node.gossip.stats().await;
    let mut removed = 0;
    for peer in 0..10u8 {
        if node
            .gossip
            .peer_reputation(&format!("hostile-{peer}"))
            .await
            .is_none()
        {
            removed += 1;
        }
    }

    if stats.seen_nullifiers == 0 && removed >= 9 {
        ScenarioOutcome::pass(NAME, format!("seen-set empty, {removed}/10 peers removed"))
    } else {
        ScenarioOutcome::fail(
            NAME,
            format!("seen {}, removed {removed}/10", stats.seen_nullifiers),
        )
    }
}
