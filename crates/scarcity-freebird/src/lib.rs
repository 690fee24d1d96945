//! # scarcity-freebird
//!
//! Adapter for the Freebird anonymous-authorization service: blinded VOPRF
//! issuance with per-issuer DLEQ verification, sequential issuer failover,
//! and deterministic fallbacks when no issuer is reachable.
//!
//! Redundancy model: issuers are tried in configured order and each
//! response is independently DLEQ-verified; the first verifiably correct
//! response wins. There is no quorum aggregation.
//!
//! When the service is unreachable the adapter degrades rather than
//! erroring: blinding falls back to hashing and verification to structural
//! checks. The validator's confidence model scores such paths lower.

mod wire;

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use scarcity_crypto::hash::sha256_concat;
use scarcity_crypto::random_bytes32;
use scarcity_types::config::{FreebirdSettings, TorSettings};
use scarcity_types::FREEBIRD_CONTEXT;
use scarcity_voprf::{blind as voprf_blind, finalize as voprf_finalize, BlindState, TOKEN_LEN};

use wire::{IssueRequest, IssueResponse, IssuerMetadata, SybilProof, VerifyRequest, VerifyResponse};

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Validity window claimed when asking the verifier to check a token.
const TOKEN_EXP_SECS: u64 = 3_600;

/// Domain string binding ownership proofs to the token secret.
const OWNERSHIP_PROOF_DOMAIN: &[u8] = b"OWNERSHIP_PROOF";

/// Domain string for the fallback "issued" marker.
const ISSUED_DOMAIN: &[u8] = b"ISSUED";

/// Error types for the Freebird adapter.
#[derive(Debug, thiserror::Error)]
pub enum FreebirdError {
    /// Every configured issuer failed or flunked its DLEQ check.
    #[error("all {0} issuer(s) failed for a blinded element with live state")]
    AllIssuersFailed(usize),

    /// The blinded element has no stored state (expired or never blinded here).
    #[error("unknown blinded element: {0}")]
    UnknownBlindedElement(String),

    /// The VOPRF layer rejected an issuer response.
    #[error(transparent)]
    Voprf(#[from] scarcity_voprf::VoprfError),

    /// HTTP client construction failed.
    #[error("http client: {0}")]
    Http(String),
}

/// Convenience result type for the adapter.
pub type Result<T> = std::result::Result<T, FreebirdError>;

/// One reachable issuer with its advertised metadata.
#[derive(Clone, Debug)]
pub struct IssuerInfo {
    pub url: String,
    pub issuer_id: String,
    /// Compressed P-256 VOPRF public key.
    pub public_key: Vec<u8>,
    pub epoch: u64,
}

/// Outcome of a blind call.
#[derive(Clone, Debug)]
pub struct BlindedCommitment {
    /// The 32-byte recipient commitment placed in the transfer package.
    pub commitment: [u8; 32],
    /// Hex key into the adapter's blind-state table; absent on the
    /// hash-based fallback path (no finalization is possible).
    pub blinded_hex: Option<String>,
}

struct AdapterState {
    initialized: bool,
    issuers: Vec<IssuerInfo>,
    /// Blind states keyed by blinded-point hex. Entries are removed on
    /// finalize or terminal failure.
    blind_states: HashMap<String, BlindState>,
}

/// Client for one or more Freebird issuers plus a verifier endpoint.
pub struct FreebirdClient {
    settings: FreebirdSettings,
    http: reqwest::Client,
    state: Mutex<AdapterState>,
}

impl FreebirdClient {
    /// Build a client. The Tor config is read once here; if any configured
    /// endpoint is an `.onion` address and a SOCKS5 proxy is configured,
    /// every fetch goes through the proxy.
    pub fn new(settings: FreebirdSettings, tor: &TorSettings) -> Result<Self> {
        let mut urls: Vec<&str> = settings.issuers.iter().map(String::as_str).collect();
        urls.push(settings.verifier.as_str());
        let http = build_http_client(&urls, tor)?;
        Ok(Self {
            settings,
            http,
            state: Mutex::new(AdapterState {
                initialized: false,
                issuers: Vec::new(),
                blind_states: HashMap::new(),
            }),
        })
    }

    /// Probe issuer metadata. Lazy and idempotent: the first call populates
    /// the reachable-issuer cache, later calls are no-ops.
    pub async fn init(&self) {
        let mut state = self.state.lock().await;
        if state.initialized {
            return;
        }
        for url in &self.settings.issuers {
            match self.probe_issuer(url).await {
                Ok(info) => {
                    info!(issuer = %info.issuer_id, url = %url, epoch = info.epoch, "freebird issuer reachable");
                    state.issuers.push(info);
                }
                Err(reason) => {
                    warn!(url = %url, %reason, "freebird issuer unreachable");
                }
            }
        }
        if state.issuers.is_empty() {
            warn!("no freebird issuer reachable; degrading to hash-based fallbacks");
        }
        state.initialized = true;
    }

    async fn probe_issuer(&self, url: &str) -> std::result::Result<IssuerInfo, String> {
        let endpoint = format!("{}/.well-known/issuer", url.trim_end_matches('/'));
        let response = self
            .http
            .get(&endpoint)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }
        let meta: IssuerMetadata = response.json().await.map_err(|e| e.to_string())?;
        let public_key = URL_SAFE_NO_PAD
            .decode(&meta.voprf.pubkey)
            .map_err(|e| format!("bad issuer pubkey: {e}"))?;
        Ok(IssuerInfo {
            url: url.to_string(),
            issuer_id: meta.issuer_id,
            public_key,
            epoch: meta.epoch,
        })
    }

    /// Blind a recipient public key into a commitment.
    ///
    /// With a reachable issuer this runs the VOPRF blind and stores the
    /// state for a later [`issue`](Self::issue) call; the commitment is the
    /// hash of the blinded element. With no issuer it degrades to
    /// `SHA-256(public_key || random_nonce)`, which hides the recipient but
    /// cannot be finalized.
    pub async fn blind(&self, recipient_public_key: &[u8]) -> Result<BlindedCommitment> {
        self.init().await;
        let mut state = self.state.lock().await;
        if state.issuers.is_empty() {
            let nonce = random_bytes32();
            return Ok(BlindedCommitment {
                commitment: sha256_concat(&[recipient_public_key, &nonce]),
                blinded_hex: None,
            });
        }

        let blind_state = voprf_blind(recipient_public_key, FREEBIRD_CONTEXT)?;
        let blinded_hex = hex::encode(blind_state.blinded);
        let commitment = sha256_concat(&[&blind_state.blinded]);
        state.blind_states.insert(blinded_hex.clone(), blind_state);
        debug!(blinded = %blinded_hex, "stored freebird blind state");
        Ok(BlindedCommitment {
            commitment,
            blinded_hex: Some(blinded_hex),
        })
    }

    /// Ask the issuers to evaluate a previously blinded element.
    ///
    /// Issuers are tried in configured order; the first response whose DLEQ
    /// proof verifies against that issuer's advertised key wins and the
    /// blind state is discarded. If every issuer fails while state exists,
    /// the call errors. If no issuer was ever reachable and no state
    /// exists, a deterministic fallback marker is returned.
    pub async fn issue(&self, blinded_hex: &str) -> Result<Vec<u8>> {
        self.init().await;
        let mut state = self.state.lock().await;

        // State is removed up front: it is discarded on success and on
        // terminal all-issuers failure alike.
        let Some(blind_state) = state.blind_states.remove(blinded_hex) else {
            if state.issuers.is_empty() {
                let blinded = hex::decode(blinded_hex).unwrap_or_default();
                return Ok(sha256_concat(&[&blinded, ISSUED_DOMAIN]).to_vec());
            }
            return Err(FreebirdError::UnknownBlindedElement(blinded_hex.to_string()));
        };

        let blinded_b64 = URL_SAFE_NO_PAD.encode(blind_state.blinded);
        let issuers = state.issuers.clone();
        for issuer in &issuers {
            match self.try_issue(issuer, &blinded_b64).await {
                Ok(token) => match voprf_finalize(
                    &blind_state,
                    &token,
                    &issuer.public_key,
                    FREEBIRD_CONTEXT,
                ) {
                    Ok(_unblinded) => {
                        debug!(issuer = %issuer.issuer_id, "freebird issuance verified");
                        return Ok(token);
                    }
                    Err(e) => {
                        warn!(issuer = %issuer.issuer_id, error = %e, "issuer response failed DLEQ; trying next");
                    }
                },
                Err(reason) => {
                    warn!(issuer = %issuer.issuer_id, %reason, "issuer request failed; trying next");
                }
            }
        }
        Err(FreebirdError::AllIssuersFailed(issuers.len()))
    }

    async fn try_issue(
        &self,
        issuer: &IssuerInfo,
        blinded_b64: &str,
    ) -> std::result::Result<Vec<u8>, String> {
        let endpoint = format!("{}/v1/oprf/issue", issuer.url.trim_end_matches('/'));
        let request = IssueRequest {
            blinded_element_b64: blinded_b64.to_string(),
            sybil_proof: SybilProof {
                proof_type: "none".to_string(),
            },
        };
        let response = self
            .http
            .post(&endpoint)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }
        let body: IssueResponse = response.json().await.map_err(|e| e.to_string())?;
        let token = URL_SAFE_NO_PAD
            .decode(&body.token)
            .map_err(|e| format!("bad token encoding: {e}"))?;
        if token.len() != TOKEN_LEN {
            return Err(format!("token must be {TOKEN_LEN} bytes, got {}", token.len()));
        }
        Ok(token)
    }

    /// Check a token with the verifier endpoint.
    ///
    /// Unreachable verifier degrades to a structural check: a token of
    /// length 32 (fallback marker) or 130 (issued token) is accepted.
    pub async fn verify_token(&self, token: &[u8]) -> bool {
        self.init().await;
        let issuer = { self.state.lock().await.issuers.first().cloned() };

        if let Some(issuer) = issuer {
            let endpoint = format!("{}/v1/verify", self.settings.verifier.trim_end_matches('/'));
            let now_secs = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let request = VerifyRequest {
                token_b64: URL_SAFE_NO_PAD.encode(token),
                issuer_id: issuer.issuer_id.clone(),
                exp: now_secs + TOKEN_EXP_SECS,
                epoch: issuer.epoch,
            };
            match self
                .http
                .post(&endpoint)
                .timeout(REQUEST_TIMEOUT)
                .json(&request)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    match response.json::<VerifyResponse>().await {
                        Ok(body) => return body.ok,
                        Err(e) => warn!(error = %e, "malformed verifier response; falling back"),
                    }
                }
                Ok(response) => {
                    warn!(status = %response.status(), "verifier rejected request; falling back")
                }
                Err(e) => warn!(error = %e, "verifier unreachable; falling back"),
            }
        }

        token.len() == 32 || token.len() == TOKEN_LEN
    }

    /// Ownership proof bound to the token secret.
    ///
    /// `SHA-256(secret || "OWNERSHIP_PROOF")`. The contract is only that the
    /// value is derivable from the secret alone; the placeholder construction
    /// must be replaced before production use.
    pub fn create_ownership_proof(secret: &[u8; 32]) -> [u8; 32] {
        sha256_concat(&[secret, OWNERSHIP_PROOF_DOMAIN])
    }

    /// Whether any issuer was reachable at init time.
    pub async fn is_degraded(&self) -> bool {
        self.init().await;
        self.state.lock().await.issuers.is_empty()
    }
}

/// Build the HTTP client, routing through the SOCKS5 proxy when any
/// endpoint is a Tor hidden service.
fn build_http_client(urls: &[&str], tor: &TorSettings) -> Result<reqwest::Client> {
    let wants_tor = urls.iter().any(|u| is_onion(u));
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
    if wants_tor {
        if let Some(socks5) = &tor.socks5 {
            let proxy =
                reqwest::Proxy::all(socks5).map_err(|e| FreebirdError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }
    builder.build().map_err(|e| FreebirdError::Http(e.to_string()))
}

/// Whether a URL points at a Tor hidden service.
fn is_onion(url: &str) -> bool {
    url.split("://")
        .nth(1)
        .unwrap_or(url)
        .split(['/', ':'])
        .next()
        .is_some_and(|host| host.ends_with(".onion"))
}
