//! Two-round proof generation.

use crate::{
    backend::ultragroth::{
        challenge::derive_challenge,
        commitment::{commit, rand_blinding},
        key::ProvingKey,
        lookup::compute_lookup,
        qap::QapEvaluator,
        witness::Witness,
        Proof,
    },
    log_debug, log_info,
    util::{arithmetic::variable_base_msm, start_timer},
    Error,
};
use halo2_curves::bn256::{Fr, G1, G2};
use halo2_curves::group::Curve;
use rand::{rngs::OsRng, RngCore};

pub struct Prover {
    key: ProvingKey,
    qap: QapEvaluator,
}

impl Prover {
    pub fn new(key: ProvingKey) -> Self {
        let qap = QapEvaluator::new(key.domain_size);
        Self { key, qap }
    }

    pub fn key(&self) -> &ProvingKey {
        &self.key
    }

    pub fn prove(&self, witness: &mut Witness) -> Result<(Proof, Vec<Fr>), Error> {
        self.prove_with_rng(witness, &mut OsRng)
    }

    /// Runs both rounds over the witness. Challenge-dependent slots are
    /// overwritten in place, so the witness holds the completed assignment
    /// afterwards.
    pub fn prove_with_rng<R: RngCore>(
        &self,
        witness: &mut Witness,
        rng: &mut R,
    ) -> Result<(Proof, Vec<Fr>), Error> {
        let _timer = start_timer(|| "prove");
        let key = &self.key;
        if witness.values.len() != key.n_vars {
            return Err(Error::InvalidWitness(format!(
                "witness has {} values, the key expects {}",
                witness.values.len(),
                key.n_vars
            )));
        }

        // round 1: commit to the lookup-relevant slots
        let round_scalars = gather(&witness.values, &key.round_indexes);
        let (round_commitment, round_blinding) = commit(
            &round_scalars,
            &key.round_points_c,
            &key.final_delta1,
            rng,
        );

        let challenge = derive_challenge(&round_commitment);
        log_debug!("derived round challenge");
        compute_lookup(&mut witness.values, &witness.lookup, challenge)?;

        // round 2: Groth16-style proof over the completed witness
        let r = rand_blinding(rng);
        let s = rand_blinding(rng);

        let pi_a: G1 = variable_base_msm(&witness.values, &key.points_a)
            + key.alpha1
            + key.final_delta1 * r;
        let pi_b1: G1 = variable_base_msm(&witness.values, &key.points_b1)
            + key.beta1
            + key.final_delta1 * s;
        let pi_b: G2 = variable_base_msm(&witness.values, &key.points_b2)
            + key.beta2
            + key.final_delta2 * s;

        let quotient = self.qap.quotient(&witness.values, &key.coefs)?;

        let final_scalars = gather(&witness.values, &key.final_indexes);
        let mut pi_c: G1 = variable_base_msm(&final_scalars, &key.final_points_c);
        pi_c += variable_base_msm(&quotient, &key.points_h);
        pi_c += pi_a * s;
        pi_c += pi_b1 * r;
        pi_c -= key.final_delta1 * (r * s);
        pi_c -= key.round_delta1 * round_blinding;

        let proof = Proof {
            pi_a: pi_a.to_affine(),
            pi_b: pi_b.to_affine(),
            final_commitment: pi_c.to_affine(),
            round_commitment,
        };
        let public_signals = self.public_signals(&witness.values);
        log_info!("proof generated ({} public signals)", public_signals.len());
        Ok((proof, public_signals))
    }

    /// Public slots of a completed witness, the challenge slot excluded.
    pub fn public_signals(&self, values: &[Fr]) -> Vec<Fr> {
        (1..=self.key.n_public)
            .filter(|&i| i != self.key.rand_index)
            .map(|i| values[i])
            .collect()
    }
}

fn gather(values: &[Fr], indexes: &[u32]) -> Vec<Fr> {
    indexes.iter().map(|&i| values[i as usize]).collect()
}
