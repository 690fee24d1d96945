//! P-256 group helpers: hash-to-curve and point/scalar codecs.

use p256::elliptic_curve::bigint::U256;
use p256::elliptic_curve::hash2curve::{ExpandMsgXmd, GroupDigest};
use p256::elliptic_curve::ops::Reduce;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::elliptic_curve::PrimeField;
use p256::{AffinePoint, EncodedPoint, FieldBytes, NistP256, ProjectivePoint, Scalar};
use sha2::Sha256;

use crate::{Result, VoprfError, POINT_LEN};

/// RFC 9497 ciphersuite context for the verifiable mode of P256-SHA256.
const RFC9497_CONTEXT: &[u8] = b"OPRFV1-\x01-P256-SHA256";

/// Map an input to a curve point with the suite's hash-to-group operation.
///
/// The domain-separation tag is the RFC 9497 `HashToGroup-` prefix over the
/// ciphersuite context joined with the application context, so distinct
/// deployments land in disjoint images.
pub fn hash_to_curve(input: &[u8], context: &[u8]) -> Result<ProjectivePoint> {
    let mut dst = Vec::with_capacity(12 + RFC9497_CONTEXT.len() + 1 + context.len());
    dst.extend_from_slice(b"HashToGroup-");
    dst.extend_from_slice(RFC9497_CONTEXT);
    dst.push(b'-');
    dst.extend_from_slice(context);

    NistP256::hash_from_bytes::<ExpandMsgXmd<Sha256>>(&[input], &[dst.as_slice()])
        .map_err(|e| VoprfError::HashToCurve(e.to_string()))
}

/// Compressed SEC1 encoding of a point.
pub fn encode_point(point: &ProjectivePoint) -> [u8; POINT_LEN] {
    let encoded = point.to_affine().to_encoded_point(true);
    let mut out = [0u8; POINT_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Decode a compressed SEC1 point, rejecting identity and off-curve values.
pub fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    if bytes.len() != POINT_LEN {
        return Err(VoprfError::Malformed(format!(
            "point must be {POINT_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let encoded = EncodedPoint::from_bytes(bytes)
        .map_err(|e| VoprfError::Malformed(format!("bad SEC1 encoding: {e}")))?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or_else(|| VoprfError::Malformed("point not on curve".to_string()))?;
    let point = ProjectivePoint::from(affine);
    if bool::from(p256::elliptic_curve::group::Group::is_identity(&point)) {
        return Err(VoprfError::Malformed("identity point".to_string()));
    }
    Ok(point)
}

/// Reduce a 32-byte digest into a scalar mod the curve order.
pub fn scalar_from_digest(digest: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(digest))
}

/// Canonical 32-byte big-endian encoding of a scalar.
pub fn encode_scalar(scalar: &Scalar) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&scalar.to_repr());
    out
}

/// Decode a 32-byte big-endian scalar, rejecting values ≥ the curve order.
pub fn decode_scalar(bytes: &[u8]) -> Result<Scalar> {
    if bytes.len() != 32 {
        return Err(VoprfError::Malformed(format!(
            "scalar must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let field_bytes = FieldBytes::from_slice(bytes);
    Option::<Scalar>::from(Scalar::from_repr(*field_bytes))
        .ok_or_else(|| VoprfError::Malformed("scalar out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::elliptic_curve::Field;
    use rand::rngs::OsRng;

    #[test]
    fn test_hash_to_curve_deterministic() {
        let p1 = hash_to_curve(b"input", b"ctx").expect("hash");
        let p2 = hash_to_curve(b"input", b"ctx").expect("hash");
        assert_eq!(encode_point(&p1), encode_point(&p2));
    }

    #[test]
    fn test_hash_to_curve_context_separation() {
        let p1 = hash_to_curve(b"input", b"ctx-a").expect("hash");
        let p2 = hash_to_curve(b"input", b"ctx-b").expect("hash");
        assert_ne!(encode_point(&p1), encode_point(&p2));
    }

    #[test]
    fn test_point_codec_roundtrip() {
        let scalar = Scalar::random(&mut OsRng);
        let point = ProjectivePoint::GENERATOR * scalar;
        let encoded = encode_point(&point);
        let decoded = decode_point(&encoded).expect("decode");
        assert_eq!(encode_point(&decoded), encoded);
    }

    #[test]
    fn test_decode_point_rejects_garbage() {
        assert!(decode_point(&[0u8; 33]).is_err());
        assert!(decode_point(&[0xFF; 33]).is_err());
        assert!(decode_point(&[0x02; 16]).is_err());
    }

    #[test]
    fn test_scalar_codec_roundtrip() {
        let scalar = Scalar::random(&mut OsRng);
        let encoded = encode_scalar(&scalar);
        let decoded = decode_scalar(&encoded).expect("decode");
        assert_eq!(encode_scalar(&decoded), encoded);
    }

    #[test]
    fn test_decode_scalar_rejects_order() {
        // The curve order itself is out of range.
        let order = [
            0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFF, 0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84, 0xF3, 0xB9, 0xCA, 0xC2,
            0xFC, 0x63, 0x25, 0x51,
        ];
        assert!(decode_scalar(&order).is_err());
    }
}
