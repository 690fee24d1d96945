//! # scarcity-witness
//!
//! Adapter for the Witness timestamping federation. Submits package hashes
//! for threshold-signed attestations, checks nullifiers against the
//! federation log, and verifies attestations through a three-stage ladder:
//! gateway verification, local BLS aggregate verification, and a structural
//! fallback.
//!
//! With two or more gateways configured, nullifier lookups and
//! verifications query all of them in parallel and follow the majority,
//! logging disagreement; a tie counts as not-seen.

mod wire;

use std::collections::HashMap;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use scarcity_crypto::encoding::from_hex32;
use scarcity_crypto::hash::sha256_concat;
use scarcity_types::config::WitnessSettings;
use scarcity_types::{now_ms, Attestation};

use wire::{AttestationEnvelope, GatewayConfig, SignaturesForm, TimestampRequest, VerifyResponse};

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Structural-fallback acceptance window for attestation age.
const MAX_FALLBACK_AGE_MS: i64 = 24 * 3_600 * 1_000;

/// Minimum signer count accepted when no threshold is configured or
/// discovered.
const DEFAULT_THRESHOLD: usize = 2;

/// Federation depth assumed until discovery reports the real threshold.
const DEFAULT_DEPTH: usize = 3;

/// Error types for the Witness adapter.
#[derive(Debug, thiserror::Error)]
pub enum WitnessError {
    /// Timestamp submission failed on every gateway and fallback was
    /// disabled by the caller.
    #[error("no gateway accepted the timestamp request")]
    AllGatewaysFailed,

    /// A gateway response failed to decode.
    #[error("malformed gateway response: {0}")]
    Malformed(String),

    /// HTTP client construction failed.
    #[error("http client: {0}")]
    Http(String),
}

/// Convenience result type for the adapter.
pub type Result<T> = std::result::Result<T, WitnessError>;

/// Discovered federation facts, cached after the first `/v1/config` probe.
#[derive(Clone, Debug, Default)]
struct Discovered {
    attempted: bool,
    threshold: Option<usize>,
    /// Witness id -> hex BLS public key, from the gateway config.
    pubkeys: HashMap<String, String>,
}

/// Client for one or more Witness gateways.
pub struct WitnessClient {
    settings: WitnessSettings,
    http: reqwest::Client,
    discovered: Mutex<Discovered>,
}

impl WitnessClient {
    pub fn new(settings: WitnessSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WitnessError::Http(e.to_string()))?;
        Ok(Self {
            settings,
            http,
            discovered: Mutex::new(Discovered::default()),
        })
    }

    /// Probe `/v1/config` once and cache the federation threshold and any
    /// published witness public keys.
    pub async fn discover(&self) {
        let mut discovered = self.discovered.lock().await;
        if discovered.attempted {
            return;
        }
        discovered.attempted = true;
        for gateway in &self.settings.gateways {
            let endpoint = format!("{}/v1/config", gateway.trim_end_matches('/'));
            match self.http.get(&endpoint).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<GatewayConfig>().await {
                        Ok(config) => {
                            info!(
                                network_id = %config.network_id,
                                threshold = config.threshold,
                                witnesses = config.witnesses.len(),
                                "witness federation discovered"
                            );
                            discovered.threshold = Some(config.threshold);
                            for w in config.witnesses {
                                if let Some(pk) = w.pubkey {
                                    discovered.pubkeys.insert(w.id, pk);
                                }
                            }
                            return;
                        }
                        Err(e) => warn!(gateway = %gateway, error = %e, "bad federation config"),
                    }
                }
                Ok(response) => {
                    warn!(gateway = %gateway, status = %response.status(), "config probe rejected")
                }
                Err(e) => warn!(gateway = %gateway, error = %e, "gateway unreachable"),
            }
        }
    }

    /// Signature threshold required for full lookup confidence.
    pub async fn threshold(&self) -> usize {
        if self.settings.threshold > 0 {
            return self.settings.threshold;
        }
        self.discover().await;
        self.discovered
            .lock()
            .await
            .threshold
            .unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Federation depth used by the validator's confidence model.
    pub async fn federation_depth(&self) -> usize {
        self.discover().await;
        self.discovered
            .lock()
            .await
            .threshold
            .unwrap_or(DEFAULT_DEPTH)
    }

    /// Submit a package hash for timestamping.
    ///
    /// Gateways are tried in order; the first success is normalized into
    /// the canonical [`Attestation`] form with the federation-native
    /// envelope preserved under `raw`. When every gateway is unreachable
    /// the adapter degrades to a locally fabricated attestation that only
    /// the structural fallback will accept, so offline flows complete at
    /// reduced confidence rather than failing.
    pub async fn timestamp(&self, hash: &[u8; 32]) -> Attestation {
        let request = TimestampRequest {
            hash: hex::encode(hash),
        };
        for gateway in &self.settings.gateways {
            let endpoint = format!("{}/v1/timestamp", gateway.trim_end_matches('/'));
            match self
                .http
                .post(&endpoint)
                .json(&request)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    match response.json::<serde_json::Value>().await {
                        Ok(value) => match normalize_envelope(&value) {
                            Ok(attestation) => {
                                debug!(gateway = %gateway, "witness timestamp issued");
                                return attestation;
                            }
                            Err(e) => warn!(gateway = %gateway, error = %e, "unusable envelope"),
                        },
                        Err(e) => warn!(gateway = %gateway, error = %e, "non-JSON response"),
                    }
                }
                Ok(response) => {
                    warn!(gateway = %gateway, status = %response.status(), "timestamp rejected")
                }
                Err(e) => warn!(gateway = %gateway, error = %e, "gateway unreachable"),
            }
        }
        warn!("all witness gateways failed; issuing local fallback attestation");
        fallback_attestation(hash)
    }

    /// Verify an attestation.
    ///
    /// Preferred path: gateway `/v1/verify` (quorum across gateways when
    /// two or more are configured). When no gateway answers: local BLS
    /// aggregate verification for the aggregated form with known signer
    /// keys, else a structural check.
    pub async fn verify(&self, attestation: &Attestation) -> bool {
        let envelope = attestation
            .raw
            .clone()
            .unwrap_or_else(|| reconstruct_envelope(attestation));

        let answers = self.query_gateways(|gateway| {
            let endpoint = format!("{}/v1/verify", gateway.trim_end_matches('/'));
            let body = serde_json::json!({ "attestation": envelope.clone() });
            let http = self.http.clone();
            async move {
                let response = http.post(&endpoint).json(&body).send().await.ok()?;
                if !response.status().is_success() {
                    return None;
                }
                response
                    .json::<VerifyResponse>()
                    .await
                    .ok()
                    .map(|v| v.valid)
            }
        });
        let answers: Vec<Option<bool>> = answers.await;

        let reachable: Vec<bool> = answers.into_iter().flatten().collect();
        if !reachable.is_empty() {
            return majority(&reachable, "witness verify");
        }

        if attestation.aggregated {
            if let Some(valid) = self.verify_aggregate_locally(attestation).await {
                return valid;
            }
        }

        structural_check(attestation)
    }

    /// Confidence that a nullifier is known to the federation.
    ///
    /// 0.0 when unknown or unreachable; 0.5 when attested below threshold;
    /// 1.0 when attested at or above threshold.
    pub async fn check_nullifier(&self, nullifier: &[u8; 32]) -> f64 {
        let threshold = self.threshold().await;
        let hex_key = hex::encode(nullifier);

        let answers = self.query_gateways(|gateway| {
            let endpoint = format!(
                "{}/v1/timestamp/{}",
                gateway.trim_end_matches('/'),
                hex_key
            );
            let http = self.http.clone();
            async move {
                let response = http.get(&endpoint).send().await.ok()?;
                if response.status().as_u16() == 404 {
                    return Some(0.0f64);
                }
                if !response.status().is_success() {
                    return None;
                }
                let envelope = response.json::<AttestationEnvelope>().await.ok()?;
                let signer_count = match &envelope.attestation.signatures {
                    SignaturesForm::MultiSig(sigs) => sigs.len(),
                    SignaturesForm::Aggregated { signers, .. } => signers.len(),
                };
                Some(if signer_count >= threshold { 1.0 } else { 0.5 })
            }
        });
        let answers: Vec<Option<f64>> = answers.await;

        let reachable: Vec<f64> = answers.into_iter().flatten().collect();
        if reachable.is_empty() {
            return 0.0;
        }

        let seen: Vec<f64> = reachable.iter().copied().filter(|c| *c > 0.0).collect();
        let unseen = reachable.len() - seen.len();
        if seen.len() == unseen && !seen.is_empty() {
            warn!("witness gateways tied on nullifier lookup; treating as not-seen");
            return 0.0;
        }
        if seen.len() > unseen {
            if unseen > 0 {
                warn!(
                    seen = seen.len(),
                    unseen, "witness gateways disagree on nullifier; following majority"
                );
            }
            return seen.into_iter().fold(0.0, f64::max);
        }
        0.0
    }

    /// Run one query closure against every configured gateway in parallel.
    async fn query_gateways<F, Fut, T>(&self, make: F) -> Vec<Option<T>>
    where
        F: Fn(&str) -> Fut,
        Fut: std::future::Future<Output = Option<T>>,
    {
        join_all(self.settings.gateways.iter().map(|g| make(g.as_str()))).await
    }

    /// Local BLS aggregate verification. Returns `None` when the inputs
    /// needed for the byte-exact signed message are unavailable.
    async fn verify_aggregate_locally(&self, attestation: &Attestation) -> Option<bool> {
        let raw = attestation.raw.as_ref()?;
        let body = raw.get("attestation")?;
        let network_id = body.get("network_id")?.as_str()?;
        let sequence = body.get("sequence")?.as_u64()?;

        let signature = hex::decode(attestation.signatures.first()?).ok()?;

        self.discover().await;
        let discovered = self.discovered.lock().await;
        let mut pubkeys = Vec::with_capacity(attestation.witness_ids.len());
        for id in &attestation.witness_ids {
            let hex_pk = self
                .settings
                .witness_pubkeys
                .get(id)
                .or_else(|| discovered.pubkeys.get(id))?;
            pubkeys.push(hex::decode(hex_pk).ok()?);
        }

        let message = scarcity_bls::witness_message(
            &attestation.hash,
            attestation.timestamp,
            network_id,
            sequence,
        );
        match scarcity_bls::verify_aggregate(&message, &signature, &pubkeys) {
            Ok(valid) => {
                debug!(valid, "local BLS aggregate verification");
                Some(valid)
            }
            Err(e) => {
                warn!(error = %e, "local BLS verification unusable");
                Some(false)
            }
        }
    }
}

/// Majority vote over gateway answers, warning on disagreement.
/// A tie is conservative: false.
fn majority(votes: &[bool], what: &str) -> bool {
    let yes = votes.iter().filter(|v| **v).count();
    let no = votes.len() - yes;
    if yes > 0 && no > 0 {
        warn!(yes, no, "{what}: gateways disagree; following majority");
    }
    yes > no
}

/// Structural fallback: shape-only acceptance for multi-sig attestations
/// when nothing stronger is available.
fn structural_check(attestation: &Attestation) -> bool {
    if attestation.aggregated {
        return false;
    }
    attestation.timestamp > 0
        && attestation.signatures.len() >= 2
        && attestation.signatures.len() == attestation.witness_ids.len()
        && attestation.age_ms(now_ms()) <= MAX_FALLBACK_AGE_MS
}

/// Normalize a gateway envelope into the canonical attestation, keeping
/// the federation-native form under `raw`.
fn normalize_envelope(value: &serde_json::Value) -> Result<Attestation> {
    let envelope: AttestationEnvelope = serde_json::from_value(value.clone())
        .map_err(|e| WitnessError::Malformed(e.to_string()))?;
    let body = &envelope.attestation.attestation;
    let hash = from_hex32(&body.hash).map_err(|e| WitnessError::Malformed(e.to_string()))?;

    let (signatures, witness_ids, aggregated) = match &envelope.attestation.signatures {
        SignaturesForm::MultiSig(sigs) => (
            sigs.iter().map(|s| s.signature.clone()).collect(),
            sigs.iter().map(|s| s.witness_id.clone()).collect(),
            false,
        ),
        SignaturesForm::Aggregated { aggregate, signers } => {
            (vec![aggregate.clone()], signers.clone(), true)
        }
    };

    Ok(Attestation {
        hash,
        timestamp: body.timestamp,
        signatures,
        witness_ids,
        aggregated,
        raw: value.get("attestation").cloned(),
    })
}

/// Rebuild a gateway-shaped envelope from the canonical form, for
/// verification of attestations that lost their `raw` in transit.
fn reconstruct_envelope(attestation: &Attestation) -> serde_json::Value {
    let signatures = if attestation.aggregated {
        serde_json::json!({
            "aggregate": attestation.signatures.first().cloned().unwrap_or_default(),
            "signers": attestation.witness_ids,
        })
    } else {
        serde_json::Value::Array(
            attestation
                .witness_ids
                .iter()
                .zip(&attestation.signatures)
                .map(|(id, sig)| serde_json::json!({ "witness_id": id, "signature": sig }))
                .collect(),
        )
    };
    serde_json::json!({
        "attestation": {
            "hash": hex::encode(attestation.hash),
            "timestamp": attestation.timestamp,
            "network_id": "",
            "sequence": 0,
        },
        "signatures": signatures,
    })
}

/// Locally fabricated attestation for fully offline operation. Two
/// deterministic pseudo-signatures satisfy the structural check and
/// nothing stronger.
fn fallback_attestation(hash: &[u8; 32]) -> Attestation {
    let sig = |index: u8| hex::encode(sha256_concat(&[hash, b"local-witness", &[index]]));
    Attestation {
        hash: *hash,
        timestamp: now_ms(),
        signatures: vec![sig(0), sig(1)],
        witness_ids: vec!["local-0".to_string(), "local-1".to_string()],
        aggregated: false,
        raw: None,
    }
}
