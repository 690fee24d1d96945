//! # scarcity-validator
//!
//! Tiered acceptance pipeline for transfer packages: an age cliff, gossip
//! duplicate detection, a federation lookup, attestation verification, a
//! propagation wait, and a tunable confidence score.
//!
//! The 0.5 gossip threshold separates "one peer told me" (likely the
//! legitimate first sighting of the spend) from "many peers told me"
//! (convergent evidence it was spent elsewhere).

use std::sync::Arc;

use tracing::{debug, info};

use scarcity_gossip::{NullifierGossip, PeerLink, ProofVerifier};
use scarcity_types::{now_ms, Attestation, Hash32, TransferPackage, ValidationResult};
use scarcity_witness::WitnessClient;

/// Gossip-tier rejection threshold on the peer-convergence fraction.
pub const GOSSIP_DOUBLE_SPEND_THRESHOLD: f64 = 0.5;

/// Validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Propagation wait before the second gossip check.
    pub wait_time_ms: u64,
    /// Minimum admissible confidence in [0, 1].
    pub min_confidence: f64,
    /// Age cliff for attestations (the "lazy demurrage" cutoff).
    pub max_token_age_ms: i64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            wait_time_ms: 5_000,
            min_confidence: 0.7,
            // The authoritative numeric expression; works out to roughly
            // 14.4 months despite being described as "~1.5 years".
            max_token_age_ms: 24 * 24 * 24 * 3_600 * 1_000,
        }
    }
}

/// Gossip-side facts the validator consumes.
pub trait GossipProbe: Send + Sync {
    fn check_nullifier(
        &self,
        nullifier: &Hash32,
    ) -> impl std::future::Future<Output = f64> + Send;
    fn connected_peers(&self) -> impl std::future::Future<Output = usize> + Send;
}

/// Federation-side facts the validator consumes.
pub trait FederationProbe: Send + Sync {
    fn check_nullifier(
        &self,
        nullifier: &Hash32,
    ) -> impl std::future::Future<Output = f64> + Send;
    fn verify(&self, proof: &Attestation) -> impl std::future::Future<Output = bool> + Send;
    fn depth(&self) -> impl std::future::Future<Output = usize> + Send;
}

impl<L: PeerLink, V: ProofVerifier> GossipProbe for NullifierGossip<L, V> {
    async fn check_nullifier(&self, nullifier: &Hash32) -> f64 {
        NullifierGossip::check_nullifier(self, nullifier).await
    }

    async fn connected_peers(&self) -> usize {
        self.stats().await.connected_peers
    }
}

impl FederationProbe for WitnessClient {
    async fn check_nullifier(&self, nullifier: &Hash32) -> f64 {
        WitnessClient::check_nullifier(self, nullifier).await
    }

    async fn verify(&self, proof: &Attestation) -> bool {
        WitnessClient::verify(self, proof).await
    }

    async fn depth(&self) -> usize {
        self.federation_depth().await
    }
}

/// Confidence model: peer convergence, federation depth, and wait time,
/// each capped so the components weigh 0.5 / 0.3 / 0.2.
pub fn confidence(peers: usize, depth: usize, wait_ms: u64) -> f64 {
    let peer_score = (peers as f64 / 10.0).min(0.5);
    let witness_score = (depth as f64 / 3.0).min(0.3);
    let time_score = (wait_ms as f64 / 10_000.0).min(0.2);
    peer_score + witness_score + time_score
}

/// The tiered transfer validator.
pub struct TransferValidator<G, F> {
    gossip: Arc<G>,
    witness: Arc<F>,
    config: ValidatorConfig,
}

impl<G: GossipProbe, F: FederationProbe> TransferValidator<G, F> {
    pub fn new(config: ValidatorConfig, gossip: Arc<G>, witness: Arc<F>) -> Self {
        Self {
            gossip,
            witness,
            config,
        }
    }

    /// Standard validation: all tiers plus the configured propagation wait.
    pub async fn validate(&self, package: &TransferPackage) -> ValidationResult {
        self.validate_with_wait(package, self.config.wait_time_ms)
            .await
    }

    /// Fast validation: the synchronous tiers only, no propagation wait.
    /// The confidence score is computed with wait = 0, so callers accept
    /// the correspondingly lower ceiling.
    pub async fn validate_fast(&self, package: &TransferPackage) -> ValidationResult {
        self.validate_with_wait(package, 0).await
    }

    /// Deep validation: standard tiers with a caller-chosen extended wait.
    pub async fn validate_deep(&self, package: &TransferPackage, wait_ms: u64) -> ValidationResult {
        self.validate_with_wait(package, wait_ms).await
    }

    async fn validate_with_wait(
        &self,
        package: &TransferPackage,
        wait_ms: u64,
    ) -> ValidationResult {
        // Tier 1: age cliff.
        let age = now_ms() - package.proof.timestamp;
        if age > self.config.max_token_age_ms {
            info!(token = %package.token_id, age_ms = age, "package rejected: expired");
            return ValidationResult::reject(0.0, "Token expired");
        }

        // Tier 2: gossip convergence.
        let gossip_seen = self.gossip.check_nullifier(&package.nullifier).await;
        if gossip_seen > GOSSIP_DOUBLE_SPEND_THRESHOLD {
            info!(token = %package.token_id, gossip_seen, "package rejected: gossip double-spend");
            return ValidationResult::reject(
                gossip_seen,
                "Double-spend detected in gossip network",
            );
        }

        // Tier 3: federation log.
        let witness_seen = self.witness.check_nullifier(&package.nullifier).await;
        if witness_seen > 0.0 {
            info!(token = %package.token_id, witness_seen, "package rejected: witness double-spend");
            return ValidationResult::reject(
                witness_seen,
                "Double-spend detected by witness federation",
            );
        }

        // Tier 4: attestation.
        if !self.witness.verify(&package.proof).await {
            info!(token = %package.token_id, "package rejected: invalid attestation");
            return ValidationResult::reject(0.0, "Invalid attestation");
        }

        // Tier 5: propagation wait, then re-check convergence.
        if wait_ms > 0 {
            debug!(wait_ms, "waiting for gossip propagation");
            tokio::time::sleep(std::time::Duration::from_millis(wait_ms)).await;
            let gossip_seen = self.gossip.check_nullifier(&package.nullifier).await;
            if gossip_seen > GOSSIP_DOUBLE_SPEND_THRESHOLD {
                info!(token = %package.token_id, gossip_seen, "package rejected after wait");
                return ValidationResult::reject(
                    gossip_seen,
                    "Double-spend detected in gossip network",
                );
            }
        }

        // Tier 6: confidence threshold.
        let peers = self.gossip.connected_peers().await;
        let depth = self.witness.depth().await;
        let score = confidence(peers, depth, wait_ms);
        if score < self.config.min_confidence {
            info!(token = %package.token_id, score, "package rejected: confidence below threshold");
            return ValidationResult::reject(score, "Confidence below threshold");
        }

        debug!(token = %package.token_id, score, "package admitted");
        ValidationResult::accept(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeGossip {
        seen: f64,
        peers: usize,
        checks: AtomicUsize,
    }

    impl GossipProbe for FakeGossip {
        async fn check_nullifier(&self, _nullifier: &Hash32) -> f64 {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.seen
        }

        async fn connected_peers(&self) -> usize {
            self.peers
        }
    }

    struct FakeFederation {
        seen: f64,
        verdict: bool,
        depth: usize,
    }

    impl FederationProbe for FakeFederation {
        async fn check_nullifier(&self, _nullifier: &Hash32) -> f64 {
            self.seen
        }

        async fn verify(&self, _proof: &Attestation) -> bool {
            self.verdict
        }

        async fn depth(&self) -> usize {
            self.depth
        }
    }

    fn package(proof_age_ms: i64) -> TransferPackage {
        TransferPackage {
            token_id: "ab".repeat(32),
            amount: 100,
            commitment: [0x01; 32],
            nullifier: [0x02; 32],
            proof: Attestation {
                hash: [0x03; 32],
                timestamp: now_ms() - proof_age_ms,
                signatures: vec!["a".into(), "b".into()],
                witness_ids: vec!["w0".into(), "w1".into()],
                aggregated: false,
                raw: None,
            },
            ownership_proof: None,
            condition: None,
            refund_key: None,
        }
    }

    fn validator(
        gossip_seen: f64,
        peers: usize,
        federation: FakeFederation,
    ) -> TransferValidator<FakeGossip, FakeFederation> {
        TransferValidator::new(
            ValidatorConfig {
                wait_time_ms: 10,
                ..ValidatorConfig::default()
            },
            Arc::new(FakeGossip {
                seen: gossip_seen,
                peers,
                checks: AtomicUsize::new(0),
            }),
            Arc::new(federation),
        )
    }

    fn healthy_federation() -> FakeFederation {
        FakeFederation {
            seen: 0.0,
            verdict: true,
            depth: 3,
        }
    }

    #[tokio::test]
    async fn test_accepts_clean_package_on_healthy_network() {
        let v = validator(0.0, 10, healthy_federation());
        // Full peer and depth scores; wait contributes the remainder.
        let result = v.validate_deep(&package(1_000), 10_000).await;
        assert!(result.valid);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_age_cliff_rejects_expired() {
        let v = validator(0.0, 10, healthy_federation());
        let expired = package(ValidatorConfig::default().max_token_age_ms + 1_000);
        let result = v.validate_fast(&expired).await;
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Token expired"));
    }

    #[tokio::test]
    async fn test_gossip_threshold_is_strictly_above_half() {
        // Exactly 0.5 is the legitimate-first-sighting case and passes.
        let v = validator(0.5, 10, healthy_federation());
        assert!(v.validate_fast(&package(0)).await.valid);

        let v = validator(0.6, 10, healthy_federation());
        let result = v.validate_fast(&package(0)).await;
        assert!(!result.valid);
        assert_eq!(
            result.reason.as_deref(),
            Some("Double-spend detected in gossip network")
        );
    }

    #[tokio::test]
    async fn test_federation_tier_rejects_any_sighting() {
        let v = validator(
            0.0,
            10,
            FakeFederation {
                seen: 0.5,
                verdict: true,
                depth: 3,
            },
        );
        let result = v.validate_fast(&package(0)).await;
        assert!(!result.valid);
        assert_eq!(
            result.reason.as_deref(),
            Some("Double-spend detected by witness federation")
        );
    }

    #[tokio::test]
    async fn test_invalid_attestation_rejected() {
        let v = validator(
            0.0,
            10,
            FakeFederation {
                seen: 0.0,
                verdict: false,
                depth: 3,
            },
        );
        let result = v.validate_fast(&package(0)).await;
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Invalid attestation"));
    }

    #[tokio::test]
    async fn test_fast_mode_skips_wait_and_scores_lower() {
        let v = validator(0.0, 10, healthy_federation());
        let result = v.validate_fast(&package(0)).await;
        // One gossip check only (no post-wait re-check).
        assert_eq!(v.gossip.checks.load(Ordering::SeqCst), 1);
        // 0.5 + 0.3 + 0.0 = 0.8
        assert!(result.valid);
        assert!((result.confidence - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_degraded_network_fails_threshold() {
        // No peers, default depth, short wait: 0.0 + 0.3 + small < 0.7.
        let v = validator(0.0, 0, healthy_federation());
        let result = v.validate(&package(0)).await;
        assert!(!result.valid);
        assert!(result.confidence < 0.7);
        assert_eq!(result.reason.as_deref(), Some("Confidence below threshold"));
    }

    #[test]
    fn test_confidence_formula_and_monotonicity() {
        // Component caps.
        assert!((confidence(10, 3, 10_000) - 1.0).abs() < 1e-9);
        assert!((confidence(5, 3, 5_000) - (0.5 + 0.3 + 0.2f64.min(0.5))).abs() < 1e-9);
        assert!((confidence(0, 0, 0) - 0.0).abs() < 1e-9);

        // Monotone in wait up to saturation.
        let mut last = 0.0;
        for wait in [0u64, 1_000, 2_500, 5_000, 10_000, 30_000] {
            let c = confidence(4, 3, wait);
            assert!(c >= last);
            last = c;
        }
    }
}
