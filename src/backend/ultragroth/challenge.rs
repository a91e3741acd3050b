//! Fiat-Shamir challenge binding round 2 to the round-1 commitment.

use crate::util::arithmetic::{fe_from_be_bytes_mod_order, PrimeField};
use halo2_curves::bn256::{Fr, G1Affine};
use sha3::{Digest, Keccak256};

/// Hashes the commitment's affine coordinates (32-byte big-endian each,
/// `x || y`) with Keccak-256 and reduces the digest modulo the scalar
/// field order. The identity hashes as all zeroes.
pub fn derive_challenge(commitment: &G1Affine) -> Fr {
    let mut buf = [0u8; 64];
    let mut x = commitment.x.to_repr();
    x.reverse();
    buf[..32].copy_from_slice(&x);
    let mut y = commitment.y.to_repr();
    y.reverse();
    buf[32..].copy_from_slice(&y);
    let digest = Keccak256::digest(buf);
    fe_from_be_bytes_mod_order(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo2_curves::group::prime::PrimeCurveAffine;

    #[test]
    fn test_challenge_is_deterministic() {
        let point = G1Affine::generator();
        assert_eq!(derive_challenge(&point), derive_challenge(&point));
    }

    #[test]
    fn test_challenge_separates_points() {
        let g = G1Affine::generator();
        let g2: G1Affine = (g * Fr::from(2)).into();
        assert_ne!(derive_challenge(&g), derive_challenge(&g2));
        // a sign flip changes only y and must still change the challenge
        assert_ne!(derive_challenge(&g), derive_challenge(&-g));
    }
}
