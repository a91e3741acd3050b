//! Blinded multi-scalar commitments used by both proving rounds.

use crate::util::arithmetic::{variable_base_msm, PrimeField};
use halo2_curves::bn256::{Fr, G1, G1Affine};
use halo2_curves::group::Curve;
use rand::RngCore;

/// Samples a blinding scalar from 31 random bytes, one byte short of the
/// field width so the draw is always canonical.
pub fn rand_blinding<R: RngCore>(rng: &mut R) -> Fr {
    let mut repr = [0u8; 32];
    rng.fill_bytes(&mut repr[..31]);
    Fr::from_repr(repr).unwrap()
}

/// `MSM(points, scalars) + r * blinding_base` for a fresh blinding factor
/// `r`, returned alongside the commitment.
pub fn commit<R: RngCore>(
    scalars: &[Fr],
    points: &[G1Affine],
    blinding_base: &G1Affine,
    rng: &mut R,
) -> (G1Affine, Fr) {
    let r = rand_blinding(rng);
    let acc: G1 = variable_base_msm(scalars, points) + blinding_base * r;
    (acc.to_affine(), r)
}
