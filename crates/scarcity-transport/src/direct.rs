//! Direct-channel QUIC endpoint.
//!
//! Each node binds one QUIC endpoint serving both roles: it accepts
//! direct-channel connections from peers that received our offer, and it
//! dials peers whose offers we received. TLS is a self-signed certificate
//! used purely for transport encryption; peer identity rides in the hello
//! frame exchanged on the first bidirectional stream, authenticated at the
//! relay layer that carried the offer.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::{ClientConfig, Connection, Endpoint, ServerConfig};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, TransportError};

/// ALPN protocol identifier for Scarcity direct channels.
pub const ALPN_SCARCITY: &[u8] = b"scarcity/1";

/// Maximum direct-channel message size.
pub const MAX_MESSAGE_SIZE: usize = 262_144;

/// Hello frame identifying the dialing peer on a fresh connection.
#[derive(Debug, Serialize, Deserialize)]
pub struct DirectHello {
    #[serde(rename = "peerId")]
    pub peer_id: String,
}

/// A QUIC endpoint acting as both dialer and listener.
pub struct DirectNode {
    endpoint: Endpoint,
    local_addr: SocketAddr,
}

impl DirectNode {
    /// Bind a dual-role endpoint on an ephemeral port.
    pub fn bind() -> Result<Self> {
        let server_config = build_server_config()?;
        let client_config = build_client_config()?;

        let mut endpoint =
            Endpoint::server(server_config, SocketAddr::from(([0, 0, 0, 0], 0)))
                .map_err(|e| TransportError::Direct(format!("bind failed: {e}")))?;
        endpoint.set_default_client_config(client_config);

        let local_addr = endpoint
            .local_addr()
            .map_err(|e| TransportError::Direct(e.to_string()))?;
        debug!(%local_addr, "direct-channel endpoint bound");

        Ok(Self {
            endpoint,
            local_addr,
        })
    }

    /// The address advertised in direct-channel offers.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept the next inbound connection and read the peer's hello.
    ///
    /// Returns `None` once the endpoint is closed.
    pub async fn accept(&self) -> Option<(String, Connection)> {
        loop {
            let incoming = self.endpoint.accept().await?;
            let Ok(connection) = incoming.await else {
                continue;
            };
            match read_hello(&connection).await {
                Ok(peer_id) => return Some((peer_id, connection)),
                Err(e) => {
                    debug!(error = %e, "direct connection without valid hello dropped");
                    connection.close(quinn::VarInt::from_u32(1), b"bad hello");
                }
            }
        }
    }

    /// Dial a peer's advertised address and introduce ourselves.
    pub async fn connect(&self, addr: SocketAddr, our_peer_id: &str) -> Result<Connection> {
        let connection = self
            .endpoint
            .connect(addr, "scarcity-node")
            .map_err(|e| TransportError::Direct(e.to_string()))?
            .await
            .map_err(|e| TransportError::Direct(e.to_string()))?;

        let hello = serde_json::to_vec(&DirectHello {
            peer_id: our_peer_id.to_string(),
        })
        .map_err(|e| TransportError::Codec(e.to_string()))?;
        send_frame(&connection, &hello).await?;

        debug!(remote = %connection.remote_address(), "direct channel established");
        Ok(connection)
    }

    /// Close the endpoint and every connection on it.
    pub fn close(&self) {
        self.endpoint.close(quinn::VarInt::from_u32(0), b"closed");
    }
}

/// Send one length-prefixed frame on a fresh unidirectional stream.
///
/// Wire format: `[length:4 LE][data:length]`.
pub async fn send_frame(connection: &Connection, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| TransportError::Codec("frame too large".to_string()))?;
    let mut stream = connection
        .open_uni()
        .await
        .map_err(|e| TransportError::Direct(e.to_string()))?;
    stream
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| TransportError::Direct(e.to_string()))?;
    stream
        .write_all(data)
        .await
        .map_err(|e| TransportError::Direct(e.to_string()))?;
    stream
        .finish()
        .map_err(|e| TransportError::Direct(e.to_string()))?;
    Ok(())
}

/// Receive one length-prefixed frame from a unidirectional stream.
pub async fn recv_frame(connection: &Connection) -> Result<Vec<u8>> {
    let mut stream = connection
        .accept_uni()
        .await
        .map_err(|e| TransportError::Direct(e.to_string()))?;
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| TransportError::Direct(e.to_string()))?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(TransportError::Codec(format!(
            "frame length {len} exceeds maximum {MAX_MESSAGE_SIZE}"
        )));
    }
    let mut buf = vec![0u8; len];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(|e| TransportError::Direct(e.to_string()))?;
    Ok(buf)
}

/// Read and parse the hello frame on a fresh inbound connection.
async fn read_hello(connection: &Connection) -> Result<String> {
    let raw = recv_frame(connection).await?;
    let hello: DirectHello =
        serde_json::from_slice(&raw).map_err(|e| TransportError::Codec(e.to_string()))?;
    if hello.peer_id.is_empty() {
        return Err(TransportError::Codec("empty peer id in hello".to_string()));
    }
    Ok(hello.peer_id)
}

// ---------------------------------------------------------------------------
// TLS / certificate helpers
// ---------------------------------------------------------------------------

/// Generate a self-signed certificate and key for the direct channel.
fn generate_self_signed_cert() -> Result<(CertificateDer<'static>, PrivateKeyDer<'static>)> {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ED25519)
        .map_err(|e| TransportError::Direct(format!("key generation failed: {e}")))?;
    let params = rcgen::CertificateParams::new(vec!["scarcity-node".to_string()])
        .map_err(|e| TransportError::Direct(format!("cert params failed: {e}")))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| TransportError::Direct(format!("self-signed cert failed: {e}")))?;

    let cert_der = CertificateDer::from(cert.der().to_vec());
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    Ok((cert_der, key_der))
}

fn build_server_config() -> Result<ServerConfig> {
    let (cert_der, key_der) = generate_self_signed_cert()?;

    let provider = rustls::crypto::ring::default_provider();
    let mut tls_config = rustls::ServerConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| TransportError::Direct(format!("server TLS config failed: {e}")))?
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key_der)
        .map_err(|e| TransportError::Direct(format!("server cert config failed: {e}")))?;
    tls_config.alpn_protocols = vec![ALPN_SCARCITY.to_vec()];

    Ok(ServerConfig::with_crypto(Arc::new(
        quinn::crypto::rustls::QuicServerConfig::try_from(tls_config)
            .map_err(|e| TransportError::Direct(format!("QUIC server crypto failed: {e}")))?,
    )))
}

fn build_client_config() -> Result<ClientConfig> {
    let provider = rustls::crypto::ring::default_provider();
    let mut tls_config = rustls::ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| TransportError::Direct(format!("client TLS config failed: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
        .with_no_client_auth();
    tls_config.alpn_protocols = vec![ALPN_SCARCITY.to_vec()];

    Ok(ClientConfig::new(Arc::new(
        quinn::crypto::rustls::QuicClientConfig::try_from(tls_config)
            .map_err(|e| TransportError::Direct(format!("QUIC client crypto failed: {e}")))?,
    )))
}

/// Accepts any server certificate. The direct channel is encrypted but not
/// TLS-authenticated; the peer was already identified through the relay
/// that signaled the offer.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA256,
        ]
    }
}
