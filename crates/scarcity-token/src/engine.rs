//! The token lifecycle engine.

use std::sync::Arc;

use tracing::{debug, info};

use scarcity_crypto::hash::{be64, constant_time_eq, sha256, sha256_concat};
use scarcity_crypto::nullifier::{derive_nullifier, package_hash};
use scarcity_crypto::random_bytes32;
use scarcity_freebird::FreebirdClient;
use scarcity_gossip::{NullifierGossip, PeerLink, ProofVerifier};
use scarcity_types::{
    now_ms, Attestation, BridgePackage, Hash32, HtlcCondition, MergePackage, TransferPackage,
};
use scarcity_witness::WitnessClient;

use crate::token::Token;
use crate::{Result, TokenError};

/// Seam to the gossip engine's publish side.
pub trait SpendPublisher: Send + Sync {
    /// Announce one spend; errors if this node has already seen the
    /// nullifier (the sender's own double-spend alarm).
    fn publish(
        &self,
        nullifier: Hash32,
        proof: Attestation,
        ownership_proof: Option<Hash32>,
    ) -> impl std::future::Future<Output = scarcity_gossip::Result<()>> + Send;

    /// Announce several spends atomically: all or none.
    fn publish_all(
        &self,
        spends: Vec<(Hash32, Attestation, Option<Hash32>)>,
    ) -> impl std::future::Future<Output = scarcity_gossip::Result<()>> + Send;
}

impl<L: PeerLink, V: ProofVerifier> SpendPublisher for NullifierGossip<L, V> {
    async fn publish(
        &self,
        nullifier: Hash32,
        proof: Attestation,
        ownership_proof: Option<Hash32>,
    ) -> scarcity_gossip::Result<()> {
        NullifierGossip::publish(self, nullifier, proof, ownership_proof).await
    }

    async fn publish_all(
        &self,
        spends: Vec<(Hash32, Attestation, Option<Hash32>)>,
    ) -> scarcity_gossip::Result<()> {
        NullifierGossip::publish_all(self, spends).await
    }
}

/// The lifecycle engine, wired to its three collaborators.
pub struct TokenEngine<P> {
    freebird: Arc<FreebirdClient>,
    witness: Arc<WitnessClient>,
    gossip: Arc<P>,
}

impl<P: SpendPublisher> TokenEngine<P> {
    pub fn new(freebird: Arc<FreebirdClient>, witness: Arc<WitnessClient>, gossip: Arc<P>) -> Self {
        Self {
            freebird,
            witness,
            gossip,
        }
    }

    /// Mint a fresh token.
    pub fn mint(&self, amount: u64) -> Result<Token> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount(0));
        }
        let token = Token::mint(amount);
        info!(token = %token.id, amount, "minted token");
        Ok(token)
    }

    /// Spend a token to a recipient.
    ///
    /// Derives the spend nullifier and a blinded recipient commitment,
    /// obtains the Witness attestation over the package hash, publishes
    /// the spend into gossip, and only then marks the instance spent.
    pub async fn transfer(
        &self,
        token: &mut Token,
        recipient_public_key: &[u8],
    ) -> Result<TransferPackage> {
        self.transfer_conditional(token, recipient_public_key, None, None)
            .await
    }

    /// Hash- or time-locked conditional transfer. Time locks require a
    /// refund key so the sender can reclaim after expiry.
    pub async fn transfer_htlc(
        &self,
        token: &mut Token,
        recipient_public_key: &[u8],
        condition: HtlcCondition,
        refund_key: Option<String>,
    ) -> Result<TransferPackage> {
        if matches!(condition, HtlcCondition::Time { .. }) && refund_key.is_none() {
            return Err(TokenError::RefundKeyRequired);
        }
        self.transfer_conditional(token, recipient_public_key, Some(condition), refund_key)
            .await
    }

    async fn transfer_conditional(
        &self,
        token: &mut Token,
        recipient_public_key: &[u8],
        condition: Option<HtlcCondition>,
        refund_key: Option<String>,
    ) -> Result<TransferPackage> {
        if token.spent {
            return Err(TokenError::AlreadySpent);
        }

        let spend_time = now_ms();
        let nullifier = derive_nullifier(&token.secret, &token.id, spend_time);
        let blinded = self.freebird.blind(recipient_public_key).await?;
        let ownership_proof = FreebirdClient::create_ownership_proof(&token.secret);

        let hash = package_hash(&token.id, token.amount, &blinded.commitment, &nullifier);
        let proof = self.witness.timestamp(&hash).await;

        self.gossip
            .publish(nullifier, proof.clone(), Some(ownership_proof))
            .await?;
        token.spent = true;
        info!(token = %token.id, amount = token.amount, "transfer published");

        Ok(TransferPackage {
            token_id: token.id.clone(),
            amount: token.amount,
            commitment: blinded.commitment,
            nullifier,
            proof,
            ownership_proof: Some(ownership_proof),
            condition,
            refund_key,
        })
    }

    /// Accept an inbound plain or time-locked package.
    ///
    /// The protocol does not prevent the recipient from transferring the
    /// resulting token onward.
    pub async fn receive(
        &self,
        package: &TransferPackage,
        recipient_secret: [u8; 32],
    ) -> Result<Token> {
        self.claim(package, recipient_secret, None).await
    }

    /// Claim a hash-locked package by revealing the preimage.
    pub async fn claim_htlc(
        &self,
        package: &TransferPackage,
        recipient_secret: [u8; 32],
        preimage: &[u8],
    ) -> Result<Token> {
        self.claim(package, recipient_secret, Some(preimage)).await
    }

    async fn claim(
        &self,
        package: &TransferPackage,
        recipient_secret: [u8; 32],
        preimage: Option<&[u8]>,
    ) -> Result<Token> {
        match &package.condition {
            None => {}
            Some(HtlcCondition::Hash { hashlock }) => {
                let preimage = preimage.ok_or(TokenError::PreimageRequired)?;
                if !constant_time_eq(&sha256(preimage), hashlock) {
                    return Err(TokenError::WrongPreimage);
                }
            }
            Some(HtlcCondition::Time { timelock_ms }) => {
                if now_ms() >= *timelock_ms {
                    return Err(TokenError::TimelockExpired {
                        timelock_ms: *timelock_ms,
                    });
                }
            }
        }

        self.verify_package_proofs(&package.proof, package.ownership_proof)
            .await?;

        debug!(token = %package.token_id, "package accepted");
        Ok(Token::from_parts(
            package.token_id.clone(),
            package.amount,
            recipient_secret,
        ))
    }

    /// Reclaim a time-locked package after its timelock expired, producing
    /// a token payable to the refund key holder.
    pub async fn refund_htlc(
        &self,
        package: &TransferPackage,
        refund_secret: [u8; 32],
    ) -> Result<Token> {
        let Some(HtlcCondition::Time { timelock_ms }) = &package.condition else {
            return Err(TokenError::NotTimeLocked);
        };
        if now_ms() < *timelock_ms {
            return Err(TokenError::TimelockNotExpired {
                timelock_ms: *timelock_ms,
            });
        }

        self.verify_package_proofs(&package.proof, package.ownership_proof)
            .await?;

        info!(token = %package.token_id, "time-locked package refunded");
        Ok(Token::from_parts(
            package.token_id.clone(),
            package.amount,
            refund_secret,
        ))
    }

    /// Split a token into several amounts for several recipients.
    ///
    /// One nullifier spends the source; every resulting package shares the
    /// same joint attestation over the concatenated package data, making
    /// the split atomic.
    pub async fn split(
        &self,
        token: &mut Token,
        amounts: &[u64],
        recipients: &[&[u8]],
    ) -> Result<Vec<TransferPackage>> {
        if amounts.len() != recipients.len() {
            return Err(TokenError::LengthMismatch {
                amounts: amounts.len(),
                recipients: recipients.len(),
            });
        }
        self.distribute(token, amounts, recipients).await
    }

    /// Multi-party atomic distribution: one source nullifier, one slot per
    /// `(public_key, amount)` part. Amounts must sum exactly.
    pub async fn transfer_multi_party(
        &self,
        token: &mut Token,
        parts: &[(&[u8], u64)],
    ) -> Result<Vec<TransferPackage>> {
        let amounts: Vec<u64> = parts.iter().map(|(_, amount)| *amount).collect();
        let recipients: Vec<&[u8]> = parts.iter().map(|(key, _)| *key).collect();
        self.distribute(token, &amounts, &recipients).await
    }

    async fn distribute(
        &self,
        token: &mut Token,
        amounts: &[u64],
        recipients: &[&[u8]],
    ) -> Result<Vec<TransferPackage>> {
        if token.spent {
            return Err(TokenError::AlreadySpent);
        }
        if amounts.iter().any(|a| *a == 0) {
            return Err(TokenError::InvalidAmount(0));
        }
        let total: u64 = amounts.iter().sum();
        if total != token.amount {
            return Err(TokenError::AmountMismatch {
                expected: token.amount,
                actual: total,
            });
        }

        let spend_time = now_ms();
        let nullifier = derive_nullifier(&token.secret, &token.id, spend_time);
        let ownership_proof = FreebirdClient::create_ownership_proof(&token.secret);

        let mut commitments = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            commitments.push(self.freebird.blind(recipient).await?.commitment);
        }

        let joint = joint_hash(&token.id, amounts, &commitments, &[nullifier]);
        let proof = self.witness.timestamp(&joint).await;

        self.gossip
            .publish(nullifier, proof.clone(), Some(ownership_proof))
            .await?;
        token.spent = true;
        info!(token = %token.id, parts = amounts.len(), "split published");

        Ok(amounts
            .iter()
            .zip(commitments)
            .map(|(amount, commitment)| TransferPackage {
                token_id: token.id.clone(),
                amount: *amount,
                commitment,
                nullifier,
                proof: proof.clone(),
                ownership_proof: Some(ownership_proof),
                condition: None,
                refund_key: None,
            })
            .collect())
    }

    /// Merge several tokens into one fresh token for a single recipient.
    ///
    /// One nullifier per source, one joint attestation, and an atomic
    /// publish: either every source's nullifier enters gossip or none
    /// does, and sources are marked spent only after the batch lands.
    pub async fn merge(
        &self,
        sources: &mut [Token],
        recipient_public_key: &[u8],
    ) -> Result<MergePackage> {
        if sources.is_empty() {
            return Err(TokenError::InvalidAmount(0));
        }
        if sources.iter().any(|t| t.spent) {
            return Err(TokenError::AlreadySpent);
        }

        let spend_time = now_ms();
        let nullifiers: Vec<Hash32> = sources
            .iter()
            .map(|t| derive_nullifier(&t.secret, &t.id, spend_time))
            .collect();
        let amount: u64 = sources.iter().map(|t| t.amount).sum();
        let merged_id = hex::encode(random_bytes32());

        let blinded = self.freebird.blind(recipient_public_key).await?;
        let ownership_proof = FreebirdClient::create_ownership_proof(&sources[0].secret);

        let amounts: Vec<u64> = sources.iter().map(|t| t.amount).collect();
        let joint = joint_hash(&merged_id, &amounts, &[blinded.commitment], &nullifiers);
        let proof = self.witness.timestamp(&joint).await;

        let spends = nullifiers
            .iter()
            .map(|n| (*n, proof.clone(), Some(ownership_proof)))
            .collect();
        self.gossip.publish_all(spends).await?;
        for source in sources.iter_mut() {
            source.spent = true;
        }
        info!(merged = %merged_id, amount, sources = amounts.len(), "merge published");

        Ok(MergePackage {
            token_id: merged_id,
            amount,
            commitment: blinded.commitment,
            nullifiers: nullifiers.iter().map(hex::encode).collect(),
            proof,
            ownership_proof: Some(ownership_proof),
        })
    }

    /// Accept a merged token.
    pub async fn receive_merge(
        &self,
        package: &MergePackage,
        recipient_secret: [u8; 32],
    ) -> Result<Token> {
        self.verify_package_proofs(&package.proof, package.ownership_proof)
            .await?;
        Ok(Token::from_parts(
            package.token_id.clone(),
            package.amount,
            recipient_secret,
        ))
    }

    /// Bridge phase one: lock a token in this federation, committing to a
    /// recipient in the target federation.
    ///
    /// The lock nullifier enters this federation's gossip and Witness log,
    /// so the token cannot be re-spent here.
    pub async fn bridge_lock(
        &self,
        token: &mut Token,
        source_federation_id: &str,
        target_federation_id: &str,
        target_recipient_public_key: &[u8],
    ) -> Result<BridgePackage> {
        if token.spent {
            return Err(TokenError::AlreadySpent);
        }

        let spend_time = now_ms();
        let nullifier = derive_nullifier(&token.secret, &token.id, spend_time);
        let blinded = self.freebird.blind(target_recipient_public_key).await?;
        let ownership_proof = FreebirdClient::create_ownership_proof(&token.secret);

        let hash = package_hash(&token.id, token.amount, &blinded.commitment, &nullifier);
        let source_attestation = self.witness.timestamp(&hash).await;

        self.gossip
            .publish(nullifier, source_attestation.clone(), Some(ownership_proof))
            .await?;
        token.spent = true;
        info!(
            token = %token.id,
            source = source_federation_id,
            target = target_federation_id,
            "bridge lock published"
        );

        Ok(BridgePackage {
            source_federation_id: source_federation_id.to_string(),
            target_federation_id: target_federation_id.to_string(),
            source_lock_nullifier: nullifier,
            source_attestation,
            target_mint_commitment: blinded.commitment,
            target_attestation: None,
            token_id: token.id.clone(),
            amount: token.amount,
        })
    }

    /// Bridge phase two, run against the target federation's adapters:
    /// verify the source lock and mint the token here with the same id and
    /// amount. The package is updated with the target attestation.
    pub async fn bridge_mint(
        &self,
        package: &mut BridgePackage,
        recipient_secret: [u8; 32],
    ) -> Result<Token> {
        if !self.witness.verify(&package.source_attestation).await {
            return Err(TokenError::InvalidAttestation);
        }

        let mint_hash = package_hash(
            &package.token_id,
            package.amount,
            &package.target_mint_commitment,
            &package.source_lock_nullifier,
        );
        let target_attestation = self.witness.timestamp(&mint_hash).await;
        package.target_attestation = Some(target_attestation);
        info!(
            token = %package.token_id,
            target = %package.target_federation_id,
            "bridge mint attested"
        );

        Ok(Token::from_parts(
            package.token_id.clone(),
            package.amount,
            recipient_secret,
        ))
    }

    async fn verify_package_proofs(
        &self,
        proof: &Attestation,
        ownership_proof: Option<Hash32>,
    ) -> Result<()> {
        if !self.witness.verify(proof).await {
            return Err(TokenError::InvalidAttestation);
        }
        if let Some(ownership) = ownership_proof {
            if !self.freebird.verify_token(&ownership).await {
                return Err(TokenError::InvalidOwnershipProof);
            }
        }
        Ok(())
    }
}

/// Joint hash binding a distribution: id, every amount, every commitment,
/// every nullifier.
fn joint_hash(
    token_id: &str,
    amounts: &[u64],
    commitments: &[Hash32],
    nullifiers: &[Hash32],
) -> Hash32 {
    let mut data = Vec::with_capacity(
        token_id.len() + amounts.len() * 8 + (commitments.len() + nullifiers.len()) * 32,
    );
    data.extend_from_slice(token_id.as_bytes());
    for amount in amounts {
        data.extend_from_slice(&be64(*amount));
    }
    for commitment in commitments {
        data.extend_from_slice(commitment);
    }
    for nullifier in nullifiers {
        data.extend_from_slice(nullifier);
    }
    sha256_concat(&[&data])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    use scarcity_types::config::{FreebirdSettings, TorSettings, WitnessSettings};

    /// Publisher with local duplicate detection and no network.
    #[derive(Default)]
    struct MemoryPublisher {
        seen: Mutex<HashSet<String>>,
    }

    impl SpendPublisher for MemoryPublisher {
        async fn publish(
            &self,
            nullifier: Hash32,
            _proof: Attestation,
            _ownership_proof: Option<Hash32>,
        ) -> scarcity_gossip::Result<()> {
            let mut seen = self.seen.lock().await;
            if !seen.insert(hex::encode(nullifier)) {
                return Err(scarcity_gossip::GossipError::DoubleSpend);
            }
            Ok(())
        }

        async fn publish_all(
            &self,
            spends: Vec<(Hash32, Attestation, Option<Hash32>)>,
        ) -> scarcity_gossip::Result<()> {
            let mut seen = self.seen.lock().await;
            if spends
                .iter()
                .any(|(n, _, _)| seen.contains(&hex::encode(n)))
            {
                return Err(scarcity_gossip::GossipError::DoubleSpend);
            }
            for (n, _, _) in spends {
                seen.insert(hex::encode(n));
            }
            Ok(())
        }
    }

    /// Engine wired to unreachable services: everything runs on the
    /// deterministic degradation paths.
    fn offline_engine() -> TokenEngine<MemoryPublisher> {
        let freebird = FreebirdClient::new(
            FreebirdSettings {
                issuers: vec!["http://127.0.0.1:9".to_string()],
                verifier: "http://127.0.0.1:19".to_string(),
            },
            &TorSettings::default(),
        )
        .expect("freebird client");
        let witness = WitnessClient::new(WitnessSettings {
            gateways: vec!["http://127.0.0.1:29".to_string()],
            network_id: "scarcity-test".to_string(),
            threshold: 2,
            witness_pubkeys: Default::default(),
        })
        .expect("witness client");
        TokenEngine::new(
            Arc::new(freebird),
            Arc::new(witness),
            Arc::new(MemoryPublisher::default()),
        )
    }

    #[tokio::test]
    async fn test_mint_transfer_receive_offline() {
        let engine = offline_engine();
        let mut token = engine.mint(50).expect("mint");

        let package = engine.transfer(&mut token, b"recipient-pk").await.expect("transfer");
        assert!(token.spent);
        assert_eq!(package.amount, 50);
        assert_eq!(package.token_id, token.id);

        let received = engine
            .receive(&package, [0x42; 32])
            .await
            .expect("receive");
        assert_eq!(received.amount, 50);
        assert_eq!(received.id, token.id);
        assert!(!received.spent);
    }

    #[tokio::test]
    async fn test_spent_instance_cannot_transfer_again() {
        let engine = offline_engine();
        let mut token = engine.mint(100).expect("mint");
        engine.transfer(&mut token, b"alice").await.expect("first transfer");
        assert!(matches!(
            engine.transfer(&mut token, b"bob").await,
            Err(TokenError::AlreadySpent)
        ));
    }

    #[tokio::test]
    async fn test_mint_zero_rejected() {
        let engine = offline_engine();
        assert!(matches!(engine.mint(0), Err(TokenError::InvalidAmount(0))));
    }

    #[tokio::test]
    async fn test_split_conserves_amounts() {
        let engine = offline_engine();
        let mut token = engine.mint(100).expect("mint");

        let packages = engine
            .split(&mut token, &[30, 40, 30], &[b"k1", b"k2", b"k3"])
            .await
            .expect("split");
        assert!(token.spent);
        assert_eq!(packages.len(), 3);
        assert_eq!(packages.iter().map(|p| p.amount).sum::<u64>(), 100);

        // All parts share the spend nullifier and the joint attestation.
        assert!(packages.windows(2).all(|w| w[0].nullifier == w[1].nullifier));
        assert!(packages.windows(2).all(|w| w[0].proof.hash == w[1].proof.hash));

        // Each part is receivable.
        for (index, package) in packages.iter().enumerate() {
            let received = engine
                .receive(package, [index as u8 + 1; 32])
                .await
                .expect("receive part");
            assert_eq!(received.amount, [30u64, 40, 30][index]);
        }
    }

    #[tokio::test]
    async fn test_split_validation_errors() {
        let engine = offline_engine();
        let mut token = engine.mint(100).expect("mint");

        assert!(matches!(
            engine.split(&mut token, &[50, 50], &[b"only-one"]).await,
            Err(TokenError::LengthMismatch { .. })
        ));
        assert!(matches!(
            engine.split(&mut token, &[60, 50], &[b"a", b"b"]).await,
            Err(TokenError::AmountMismatch {
                expected: 100,
                actual: 110
            })
        ));
        assert!(matches!(
            engine.split(&mut token, &[100, 0], &[b"a", b"b"]).await,
            Err(TokenError::InvalidAmount(0))
        ));
        // Failed validation left the token unspent.
        assert!(!token.spent);
    }

    #[tokio::test]
    async fn test_multi_party_distribution() {
        let engine = offline_engine();
        let mut token = engine.mint(90).expect("mint");
        let packages = engine
            .transfer_multi_party(&mut token, &[(b"a".as_slice(), 30), (b"b".as_slice(), 60)])
            .await
            .expect("multi-party");
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].amount, 30);
        assert_eq!(packages[1].amount, 60);
        assert!(token.spent);
    }

    #[tokio::test]
    async fn test_merge_conserves_and_marks_all_spent() {
        let engine = offline_engine();
        let mut sources = vec![
            engine.mint(10).expect("mint"),
            engine.mint(20).expect("mint"),
            engine.mint(30).expect("mint"),
        ];

        let package = engine.merge(&mut sources, b"recipient").await.expect("merge");
        assert_eq!(package.amount, 60);
        assert_eq!(package.nullifiers.len(), 3);
        assert!(sources.iter().all(|t| t.spent));

        let merged = engine
            .receive_merge(&package, [0x07; 32])
            .await
            .expect("receive merge");
        assert_eq!(merged.amount, 60);
        assert_eq!(merged.id, package.token_id);
    }

    #[tokio::test]
    async fn test_merge_with_spent_source_is_atomic() {
        let engine = offline_engine();
        let mut spent = engine.mint(10).expect("mint");
        engine.transfer(&mut spent, b"x").await.expect("spend");
        let mut sources = vec![spent, engine.mint(20).expect("mint")];

        assert!(matches!(
            engine.merge(&mut sources, b"recipient").await,
            Err(TokenError::AlreadySpent)
        ));
        // The unspent source stays unspent.
        assert!(!sources[1].spent);
    }

    #[tokio::test]
    async fn test_htlc_hash_lock() {
        let engine = offline_engine();
        let mut token = engine.mint(25).expect("mint");
        let preimage = b"open sesame";
        let condition = HtlcCondition::Hash {
            hashlock: sha256(preimage),
        };

        let package = engine
            .transfer_htlc(&mut token, b"recipient", condition, None)
            .await
            .expect("htlc transfer");

        // No preimage, wrong preimage, then the right one.
        assert!(matches!(
            engine.receive(&package, [1; 32]).await,
            Err(TokenError::PreimageRequired)
        ));
        assert!(matches!(
            engine.claim_htlc(&package, [1; 32], b"wrong").await,
            Err(TokenError::WrongPreimage)
        ));
        let claimed = engine
            .claim_htlc(&package, [1; 32], preimage)
            .await
            .expect("claim");
        assert_eq!(claimed.amount, 25);
    }

    #[tokio::test]
    async fn test_htlc_time_lock_claim_and_refund_windows() {
        let engine = offline_engine();

        // Claim works strictly before the timelock.
        let mut token = engine.mint(25).expect("mint");
        let open = HtlcCondition::Time {
            timelock_ms: now_ms() + 60_000,
        };
        let package = engine
            .transfer_htlc(&mut token, b"r", open, Some("ff".repeat(32)))
            .await
            .expect("transfer");
        assert!(engine.receive(&package, [2; 32]).await.is_ok());
        assert!(matches!(
            engine.refund_htlc(&package, [3; 32]).await,
            Err(TokenError::TimelockNotExpired { .. })
        ));

        // After expiry only the refund succeeds.
        let mut token = engine.mint(25).expect("mint");
        let expired = HtlcCondition::Time {
            timelock_ms: now_ms() - 1,
        };
        let package = engine
            .transfer_htlc(&mut token, b"r", expired, Some("ff".repeat(32)))
            .await
            .expect("transfer");
        assert!(matches!(
            engine.receive(&package, [2; 32]).await,
            Err(TokenError::TimelockExpired { .. })
        ));
        let refunded = engine.refund_htlc(&package, [3; 32]).await.expect("refund");
        assert_eq!(refunded.amount, 25);
    }

    #[tokio::test]
    async fn test_time_lock_requires_refund_key() {
        let engine = offline_engine();
        let mut token = engine.mint(10).expect("mint");
        assert!(matches!(
            engine
                .transfer_htlc(
                    &mut token,
                    b"r",
                    HtlcCondition::Time {
                        timelock_ms: now_ms() + 1_000
                    },
                    None
                )
                .await,
            Err(TokenError::RefundKeyRequired)
        ));
        assert!(!token.spent);
    }

    #[tokio::test]
    async fn test_bridge_lock_then_mint_preserves_identity() {
        let source_engine = offline_engine();
        let target_engine = offline_engine();

        let mut token = source_engine.mint(75).expect("mint");
        let mut bridge = source_engine
            .bridge_lock(&mut token, "fed-a", "fed-b", b"target-recipient")
            .await
            .expect("lock");
        assert!(token.spent);
        assert_eq!(bridge.amount, 75);
        assert!(bridge.target_attestation.is_none());

        let minted = target_engine
            .bridge_mint(&mut bridge, [0x11; 32])
            .await
            .expect("mint");
        assert_eq!(minted.id, token.id);
        assert_eq!(minted.amount, 75);
        assert!(bridge.target_attestation.is_some());

        // The source instance cannot be spent again.
        assert!(matches!(
            source_engine.transfer(&mut token, b"elsewhere").await,
            Err(TokenError::AlreadySpent)
        ));
    }
}
