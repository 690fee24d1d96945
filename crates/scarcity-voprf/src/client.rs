//! Client-side blind, finalize, and aggregation.

use p256::{ProjectivePoint, Scalar};

use crate::dleq::{self, DleqProof};
use crate::group::{decode_point, encode_point, hash_to_curve};
use crate::{Result, VoprfError, POINT_LEN, TOKEN_LEN};

/// Client blind state, held between `blind` and `finalize`.
pub struct BlindState {
    /// The blinding scalar `r`.
    blind: Scalar,
    /// The original input, kept so callers can re-blind after a failed
    /// issuance without re-deriving it.
    pub input: Vec<u8>,
    /// Compressed blinded element `H(input)·r`.
    pub blinded: [u8; POINT_LEN],
}

/// Blind an input for issuance.
///
/// Maps the input to a curve point H via hash-to-curve, draws a random
/// blinding scalar r, and returns the compressed `H·r` plus the state
/// needed to finalize.
pub fn blind(input: &[u8], context: &[u8]) -> Result<BlindState> {
    use p256::elliptic_curve::Field;

    let h = hash_to_curve(input, context)?;
    let r = Scalar::random(&mut rand::rngs::OsRng);
    let blinded = h * r;
    Ok(BlindState {
        blind: r,
        input: input.to_vec(),
        blinded: encode_point(&blinded),
    })
}

/// Finalize an issued token.
///
/// The token wire form is `A(33) || B(33) || proof(64)`. The DLEQ proof is
/// verified against the issuer's advertised public key before unblinding;
/// either a malformed encoding or a DLEQ mismatch means the issuer is
/// adversarial and the token must be discarded.
///
/// Returns the compressed unblinded element `B·r⁻¹`.
pub fn finalize(
    state: &BlindState,
    token: &[u8],
    issuer_public_key: &[u8],
    context: &[u8],
) -> Result<[u8; POINT_LEN]> {
    if token.len() != TOKEN_LEN {
        return Err(VoprfError::Malformed(format!(
            "token must be {TOKEN_LEN} bytes, got {}",
            token.len()
        )));
    }

    let a = decode_point(&token[..POINT_LEN])?;
    let b = decode_point(&token[POINT_LEN..2 * POINT_LEN])?;
    let proof = DleqProof::from_bytes(&token[2 * POINT_LEN..])?;
    let q = decode_point(issuer_public_key)?;

    // The issuer must have evaluated our blinded element, not some other A.
    if encode_point(&a) != state.blinded {
        return Err(VoprfError::Malformed(
            "issuer echoed a different blinded element".to_string(),
        ));
    }

    if !dleq::verify(context, &q, &a, &b, &proof) {
        return Err(VoprfError::DleqMismatch);
    }

    let r_inv = Option::<Scalar>::from(state.blind.invert())
        .ok_or_else(|| VoprfError::DegenerateScalar("zero blinding scalar".to_string()))?;
    Ok(encode_point(&(b * r_inv)))
}

/// One issuer's partial evaluation in a threshold deployment.
#[derive(Clone, Debug)]
pub struct PartialEvaluation {
    /// The issuer's share index (non-zero).
    pub index: u64,
    /// Compressed partial evaluation point.
    pub value: [u8; POINT_LEN],
}

/// Lagrange-interpolated combination of partial evaluations at zero.
///
/// Federation-side reference: the single-issuer client never calls this,
/// but a threshold federation combines shares exactly so.
pub fn aggregate(partials: &[PartialEvaluation]) -> Result<[u8; POINT_LEN]> {
    use p256::elliptic_curve::Field;

    if partials.is_empty() {
        return Err(VoprfError::Malformed("no partial evaluations".to_string()));
    }

    let mut acc = ProjectivePoint::IDENTITY;
    for p_i in partials {
        let x_i = Scalar::from(p_i.index);
        let mut num = Scalar::ONE;
        let mut den = Scalar::ONE;
        for p_j in partials {
            if p_j.index == p_i.index {
                continue;
            }
            let x_j = Scalar::from(p_j.index);
            num *= x_j;
            den *= x_j - x_i;
        }
        let den_inv = Option::<Scalar>::from(den.invert()).ok_or_else(|| {
            VoprfError::DegenerateScalar("duplicate share indices".to_string())
        })?;
        let lambda = num * den_inv;
        acc += decode_point(&p_i.value)? * lambda;
    }
    Ok(encode_point(&acc))
}
