//! Freebird HTTP wire structures.

use serde::{Deserialize, Serialize};

/// `GET {issuer}/.well-known/issuer` response.
#[derive(Clone, Debug, Deserialize)]
pub struct IssuerMetadata {
    pub issuer_id: String,
    pub voprf: VoprfMetadata,
    pub epoch: u64,
}

/// VOPRF section of the issuer metadata.
#[derive(Clone, Debug, Deserialize)]
pub struct VoprfMetadata {
    /// base64url-encoded compressed P-256 public key.
    pub pubkey: String,
}

/// `POST {issuer}/v1/oprf/issue` request body.
#[derive(Clone, Debug, Serialize)]
pub struct IssueRequest {
    pub blinded_element_b64: String,
    pub sybil_proof: SybilProof,
}

/// Sybil-resistance attachment; this client always sends `none`.
#[derive(Clone, Debug, Serialize)]
pub struct SybilProof {
    #[serde(rename = "type")]
    pub proof_type: String,
}

/// `POST {issuer}/v1/oprf/issue` response body.
#[derive(Clone, Debug, Deserialize)]
pub struct IssueResponse {
    /// base64url-encoded 130-byte token.
    pub token: String,
}

/// `POST {verifier}/v1/verify` request body.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyRequest {
    pub token_b64: String,
    pub issuer_id: String,
    pub exp: u64,
    pub epoch: u64,
}

/// `POST {verifier}/v1/verify` response body.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifyResponse {
    pub ok: bool,
}
