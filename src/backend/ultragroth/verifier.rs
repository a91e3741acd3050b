//! Proof verification: one product-of-pairings check.

use crate::{
    backend::ultragroth::{
        challenge::derive_challenge,
        key::VerificationKey,
        pairing::pairing_check,
        Proof,
    },
    util::arithmetic::variable_base_msm,
    Error,
};
use halo2_curves::bn256::{Fr, G1};
use halo2_curves::group::{prime::PrimeCurveAffine, Curve};

/// Checks
/// `e(piA, piB) * e(-alpha1, beta2) * e(-vkX, gamma2)
///  * e(-finalCommitment, finalDelta2) * e(-roundCommitment, roundDelta2) == 1`
/// where `vkX` commits to the public inputs and the recomputed challenge.
///
/// The only hard error is a public-input count that does not match the
/// key; everything else is a plain reject.
pub fn verify(
    vk: &VerificationKey,
    proof: &Proof,
    public_inputs: &[Fr],
) -> Result<bool, Error> {
    if public_inputs.len() + 1 != vk.ic.len() {
        return Err(Error::InvalidSnark(format!(
            "{} public inputs for a key with {} input columns",
            public_inputs.len(),
            vk.ic.len()
        )));
    }

    let challenge = derive_challenge(&proof.round_commitment);
    let mut vk_x: G1 = vk.ic[0].to_curve();
    vk_x += variable_base_msm(public_inputs, &vk.ic[1..]);
    vk_x += vk.ic_rand * challenge;

    Ok(pairing_check(
        &[
            proof.pi_a,
            -vk.alpha1,
            (-vk_x).to_affine(),
            -proof.final_commitment,
            -proof.round_commitment,
        ],
        &[
            proof.pi_b,
            vk.beta2,
            vk.gamma2,
            vk.final_delta2,
            vk.round_delta2,
        ],
    ))
}
