//! Two-round Groth16-style zk-SNARK with an in-circuit log-derivative
//! lookup argument over BN254.
//!
//! Round 1 commits to the lookup-relevant witness slots; a Keccak-256
//! challenge derived from that commitment completes the witness (inverse
//! table columns of the log-derivative argument); round 2 is a
//! Groth16-style proof over the completed witness with an extra
//! cancellation term for the round commitment. Verification is a single
//! five-way product-of-pairings check.

use crate::Error;
use halo2_curves::bn256::{G1Affine, G2Affine};
use serde::{Deserialize, Serialize};

pub mod api;
pub mod challenge;
pub mod commitment;
pub mod key;
pub mod lookup;
pub mod pairing;
pub mod prover;
pub mod qap;
pub mod verifier;
pub mod witness;

use key::{g1_from_strings, g1_to_strings, g2_from_strings, g2_to_strings};

/// Protocol id stored in section 1 of a proving key.
pub const ZKEY_PROTOCOL_ID: u32 = 1337;
pub const PROTOCOL_NAME: &str = "ultragroth";
pub const CURVE_NAME: &str = "bn128";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Proof {
    pub pi_a: G1Affine,
    pub pi_b: G2Affine,
    pub final_commitment: G1Affine,
    pub round_commitment: G1Affine,
}

#[derive(Serialize, Deserialize)]
struct ProofJson {
    protocol: String,
    curve: String,
    pi_a: [String; 3],
    pi_b: [[String; 2]; 3],
    final_commitment: [String; 3],
    round_commitment: [String; 3],
}

impl Proof {
    pub fn to_json(&self) -> Result<String, Error> {
        let json = ProofJson {
            protocol: PROTOCOL_NAME.to_string(),
            curve: CURVE_NAME.to_string(),
            pi_a: g1_to_strings(&self.pi_a),
            pi_b: g2_to_strings(&self.pi_b),
            final_commitment: g1_to_strings(&self.final_commitment),
            round_commitment: g1_to_strings(&self.round_commitment),
        };
        serde_json::to_string(&json).map_err(|err| Error::Serialization(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let json: ProofJson =
            serde_json::from_str(json).map_err(|err| Error::Serialization(err.to_string()))?;
        if json.protocol != PROTOCOL_NAME {
            return Err(Error::Serialization(format!(
                "unexpected protocol {:?}",
                json.protocol
            )));
        }
        Ok(Self {
            pi_a: g1_from_strings(&json.pi_a)?,
            pi_b: g2_from_strings(&json.pi_b)?,
            final_commitment: g1_from_strings(&json.final_commitment)?,
            round_commitment: g1_from_strings(&json.round_commitment)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        api,
        challenge::derive_challenge,
        key::{tests::g2_point_outside_subgroup, Coef, ProvingKey, VerificationKey, ZKEY_TAG},
        prover::Prover,
        verifier::verify,
        witness::{tests::encode_wtns, LookupInfo, Witness},
        Proof, ZKEY_PROTOCOL_ID,
    };
    use crate::{
        util::arithmetic::{modulus, root_of_unity, Field, PrimeField},
        Error,
    };
    use halo2_curves::bn256::{Fq, Fr, G1Affine, G2Affine, G1, G2};
    use halo2_curves::group::{prime::PrimeCurveAffine, Curve, Group};
    use rand::rngs::OsRng;
    use rand::RngCore;

    // Fixed test circuit over 10 signals and a domain of size 4, with a
    // one-entry lookup table {0} used by two chunks:
    //
    //   signals: w0 = 1, w1 public, w2 challenge slot, w3/w4 chunk
    //   values, w5 private, w6/w7 = inv1, w8 = inv2, w9 = prod
    //
    //   row 0: (w2 + w3) * w6 = w0
    //   row 1: (w2 + w4) * w7 = w0
    //   row 2:  w2       * w8 = w0
    //   row 3:  w5       * w5 = w1
    const N_VARS: usize = 10;
    const N_PUBLIC: usize = 2;
    const DOMAIN_SIZE: usize = 4;
    const RAND_INDEX: usize = 2;
    const ROUND_INDEXES: [u32; 2] = [3, 4];

    fn test_rows() -> [(Vec<(usize, Fr)>, Vec<(usize, Fr)>, Vec<(usize, Fr)>); 4] {
        let one = Fr::ONE;
        [
            (vec![(2, one), (3, one)], vec![(6, one)], vec![(0, one)]),
            (vec![(2, one), (4, one)], vec![(7, one)], vec![(0, one)]),
            (vec![(2, one)], vec![(8, one)], vec![(0, one)]),
            (vec![(5, one)], vec![(5, one)], vec![(1, one)]),
        ]
    }

    fn test_coefs() -> Vec<Coef> {
        let mut coefs = Vec::new();
        for (row, (a, b, _)) in test_rows().iter().enumerate() {
            for (signal, value) in a {
                coefs.push(Coef {
                    matrix: 0,
                    row: row as u32,
                    signal: *signal as u32,
                    value: *value,
                });
            }
            for (signal, value) in b {
                coefs.push(Coef {
                    matrix: 1,
                    row: row as u32,
                    signal: *signal as u32,
                    value: *value,
                });
            }
        }
        coefs
    }

    fn nonzero_scalar(rng: &mut impl RngCore) -> Fr {
        loop {
            let scalar = Fr::random(&mut *rng);
            if !bool::from(scalar.is_zero()) {
                return scalar;
            }
        }
    }

    /// Trusted setup for the test circuit from fresh toxic waste.
    fn build_test_key() -> ProvingKey {
        let rng = &mut OsRng;
        let tau = nonzero_scalar(rng);
        let alpha = nonzero_scalar(rng);
        let beta = nonzero_scalar(rng);
        let gamma = nonzero_scalar(rng);
        let delta_round = nonzero_scalar(rng);
        let delta_final = nonzero_scalar(rng);

        let n = DOMAIN_SIZE;
        let log2_n = 2;
        let omega = root_of_unity::<Fr>(log2_n);
        let z_tau = tau.pow_vartime([n as u64]) - Fr::ONE;
        // L_r(tau) = Z(tau) * omega^r / (n * (tau - omega^r))
        let lagrange: Vec<Fr> = (0..n)
            .map(|r| {
                let root = omega.pow_vartime([r as u64]);
                z_tau * root * (Fr::from(n as u64) * (tau - root)).invert().unwrap()
            })
            .collect();

        let mut a_tau = vec![Fr::ZERO; N_VARS];
        let mut b_tau = vec![Fr::ZERO; N_VARS];
        let mut c_tau = vec![Fr::ZERO; N_VARS];
        for (row, (a, b, c)) in test_rows().iter().enumerate() {
            for (signal, value) in a {
                a_tau[*signal] += *value * lagrange[row];
            }
            for (signal, value) in b {
                b_tau[*signal] += *value * lagrange[row];
            }
            for (signal, value) in c {
                c_tau[*signal] += *value * lagrange[row];
            }
        }
        let columns: Vec<Fr> = (0..N_VARS)
            .map(|i| beta * a_tau[i] + alpha * b_tau[i] + c_tau[i])
            .collect();

        let g1 = G1::generator();
        let g2 = G2::generator();
        let gamma_inv = gamma.invert().unwrap();
        let delta_round_inv = delta_round.invert().unwrap();
        let delta_final_inv = delta_final.invert().unwrap();

        let ic: Vec<G1Affine> = (0..=N_PUBLIC)
            .map(|i| (g1 * (columns[i] * gamma_inv)).to_affine())
            .collect();
        let round_points_c: Vec<G1Affine> = ROUND_INDEXES
            .iter()
            .map(|&i| (g1 * (columns[i as usize] * delta_round_inv)).to_affine())
            .collect();
        let final_indexes: Vec<u32> = (0..N_VARS as u32).collect();
        let final_points_c: Vec<G1Affine> = final_indexes
            .iter()
            .map(|&i| {
                let i = i as usize;
                if i <= N_PUBLIC || ROUND_INDEXES.contains(&(i as u32)) {
                    G1Affine::identity()
                } else {
                    (g1 * (columns[i] * delta_final_inv)).to_affine()
                }
            })
            .collect();

        // pointsH over the coset {eta * omega^i}: the quotient arrives as
        // (A*B - C) coset values, and Z is the constant eta^n - 1 there
        let eta = root_of_unity::<Fr>(log2_n + 1);
        let eta_n = eta.pow_vartime([n as u64]);
        let zc_tau = tau.pow_vartime([n as u64]) - eta_n;
        let coset_scale = z_tau * (eta_n - Fr::ONE).invert().unwrap() * delta_final_inv;
        let points_h: Vec<G1Affine> = (0..n)
            .map(|i| {
                let point = eta * omega.pow_vartime([i as u64]);
                // Lc_i(tau) = Zc(tau) / (n * point^(n-1) * (tau - point))
                let denom = Fr::from(n as u64) * point.pow_vartime([n as u64 - 1]) * (tau - point);
                let lc_tau = zc_tau * denom.invert().unwrap();
                (g1 * (lc_tau * coset_scale)).to_affine()
            })
            .collect();

        ProvingKey {
            n_vars: N_VARS,
            n_public: N_PUBLIC,
            domain_size: n,
            rand_index: RAND_INDEX,
            alpha1: (g1 * alpha).to_affine(),
            beta1: (g1 * beta).to_affine(),
            beta2: (g2 * beta).to_affine(),
            gamma2: (g2 * gamma).to_affine(),
            round_delta1: (g1 * delta_round).to_affine(),
            round_delta2: (g2 * delta_round).to_affine(),
            final_delta1: (g1 * delta_final).to_affine(),
            final_delta2: (g2 * delta_final).to_affine(),
            ic,
            coefs: test_coefs(),
            points_a: a_tau.iter().map(|v| (g1 * v).to_affine()).collect(),
            points_b1: b_tau.iter().map(|v| (g1 * v).to_affine()).collect(),
            points_b2: b_tau.iter().map(|v| (g2 * v).to_affine()).collect(),
            round_points_c,
            final_points_c,
            round_indexes: ROUND_INDEXES.to_vec(),
            final_indexes,
            points_h,
        }
    }

    fn test_lookup() -> LookupInfo {
        LookupInfo {
            chunks: vec![0, 0],
            frequencies: vec![2],
            wtns_indexes: vec![2, 6, 7, 8, 9],
            push_indexes: vec![0, 1, 2, 3, 4],
        }
    }

    /// Witness for `w5^2 = w1`; the challenge-dependent slots start as
    /// zeroes and are filled during proving.
    fn build_test_witness(w1: Fr, w5: Fr) -> Witness {
        let mut values = vec![Fr::ZERO; N_VARS];
        values[0] = Fr::ONE;
        values[1] = w1;
        values[5] = w5;
        Witness {
            values,
            lookup: test_lookup(),
        }
    }

    fn prove_default() -> (VerificationKey, Proof, Vec<Fr>) {
        let prover = Prover::new(build_test_key());
        let vk = prover.key().verification_key();
        let mut witness = build_test_witness(Fr::from(9), Fr::from(3));
        let (proof, public_signals) = prover.prove(&mut witness).unwrap();
        (vk, proof, public_signals)
    }

    #[test]
    fn test_prove_verify_round_trip() {
        let (vk, proof, public_signals) = prove_default();
        assert_eq!(public_signals, vec![Fr::from(9)]);
        assert!(verify(&vk, &proof, &public_signals).unwrap());
    }

    #[test]
    fn test_rejects_wrong_public_input() {
        let (vk, proof, _) = prove_default();
        assert!(!verify(&vk, &proof, &[Fr::from(10)]).unwrap());
    }

    #[test]
    fn test_rejects_unsatisfied_witness() {
        let prover = Prover::new(build_test_key());
        let vk = prover.key().verification_key();
        // 4 * 4 != 9, the square constraint breaks
        let mut witness = build_test_witness(Fr::from(9), Fr::from(4));
        let (proof, public_signals) = prover.prove(&mut witness).unwrap();
        assert!(!verify(&vk, &proof, &public_signals).unwrap());
    }

    #[test]
    fn test_rejects_tampered_proof() {
        let (vk, proof, public_signals) = prove_default();
        let bump = |point: &G1Affine| (*point + G1Affine::generator()).to_affine();
        for tampered in [
            Proof {
                pi_a: bump(&proof.pi_a),
                ..proof
            },
            Proof {
                pi_b: (proof.pi_b + G2Affine::generator()).to_affine(),
                ..proof
            },
            Proof {
                final_commitment: bump(&proof.final_commitment),
                ..proof
            },
            Proof {
                round_commitment: bump(&proof.round_commitment),
                ..proof
            },
        ] {
            assert!(!verify(&vk, &tampered, &public_signals).unwrap());
        }
    }

    #[test]
    fn test_wrong_input_count_is_hard_error() {
        let (vk, proof, _) = prove_default();
        assert!(matches!(
            verify(&vk, &proof, &[]),
            Err(Error::InvalidSnark(_))
        ));
        assert!(matches!(
            verify(&vk, &proof, &[Fr::from(9), Fr::from(9)]),
            Err(Error::InvalidSnark(_))
        ));
    }

    #[test]
    fn test_challenge_slot_holds_the_derived_challenge() {
        let prover = Prover::new(build_test_key());
        let mut witness = build_test_witness(Fr::from(9), Fr::from(3));
        let (proof, _) = prover.prove(&mut witness).unwrap();
        let challenge = derive_challenge(&proof.round_commitment);
        assert_eq!(witness.values[RAND_INDEX], challenge);
        // lookup columns are consistent with the challenge
        assert_eq!(witness.values[8], challenge.invert().unwrap());
        assert_eq!(witness.values[9], witness.values[8].double());
    }

    #[test]
    fn test_proof_json_round_trip() {
        let (vk, proof, public_signals) = prove_default();
        let proof_json = proof.to_json().unwrap();
        let parsed = Proof::from_json(&proof_json).unwrap();
        assert_eq!(parsed, proof);

        let vk_json = vk.to_json().unwrap();
        let public_json = api::public_signals_to_json(&public_signals);
        assert!(api::verify(&proof_json, &public_json, &vk_json).unwrap());
    }

    #[test]
    fn test_proof_json_rejects_pi_b_outside_subgroup() {
        let (_, proof, _) = prove_default();
        let mut json: serde_json::Value =
            serde_json::from_str(&proof.to_json().unwrap()).unwrap();
        let bad = g2_point_outside_subgroup();
        json["pi_b"] = serde_json::to_value(super::g2_to_strings(&bad)).unwrap();
        assert!(matches!(
            Proof::from_json(&json.to_string()),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_verification_key_json_round_trip() {
        let vk = Prover::new(build_test_key()).key().verification_key();
        let parsed = VerificationKey::from_json(&vk.to_json().unwrap()).unwrap();
        assert_eq!(parsed, vk);
    }

    // --- container round trips and the buffer API ---

    fn g1_bytes(point: &G1Affine) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&point.x.to_repr());
        out.extend_from_slice(&point.y.to_repr());
        out
    }

    fn g2_bytes(point: &G2Affine) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        out.extend_from_slice(&point.x.c0.to_repr());
        out.extend_from_slice(&point.x.c1.to_repr());
        out.extend_from_slice(&point.y.c0.to_repr());
        out.extend_from_slice(&point.y.c1.to_repr());
        out
    }

    fn encode_zkey(key: &ProvingKey) -> Vec<u8> {
        let mut header = Vec::new();
        let mut q = modulus::<Fq>().to_bytes_le();
        q.resize(32, 0);
        let mut r = modulus::<Fr>().to_bytes_le();
        r.resize(32, 0);
        header.extend_from_slice(&32u32.to_le_bytes());
        header.extend_from_slice(&q);
        header.extend_from_slice(&32u32.to_le_bytes());
        header.extend_from_slice(&r);
        for value in [
            key.n_vars,
            key.n_public,
            key.domain_size,
            key.round_indexes.len(),
            key.final_indexes.len(),
            key.rand_index,
        ] {
            header.extend_from_slice(&(value as u32).to_le_bytes());
        }
        header.extend_from_slice(&g1_bytes(&key.alpha1));
        header.extend_from_slice(&g1_bytes(&key.beta1));
        header.extend_from_slice(&g2_bytes(&key.beta2));
        header.extend_from_slice(&g2_bytes(&key.gamma2));
        header.extend_from_slice(&g1_bytes(&key.round_delta1));
        header.extend_from_slice(&g2_bytes(&key.round_delta2));
        header.extend_from_slice(&g1_bytes(&key.final_delta1));
        header.extend_from_slice(&g2_bytes(&key.final_delta2));

        let g1s = |points: &[G1Affine]| -> Vec<u8> { points.iter().flat_map(g1_bytes).collect() };
        let g2s = |points: &[G2Affine]| -> Vec<u8> { points.iter().flat_map(g2_bytes).collect() };
        let u32s =
            |values: &[u32]| -> Vec<u8> { values.iter().flat_map(|v| v.to_le_bytes()).collect() };

        let mut coef_bytes = Vec::new();
        for coef in &key.coefs {
            coef_bytes.extend_from_slice(&coef.matrix.to_le_bytes());
            coef_bytes.extend_from_slice(&coef.row.to_le_bytes());
            coef_bytes.extend_from_slice(&coef.signal.to_le_bytes());
            coef_bytes.extend_from_slice(&coef.value.to_repr());
        }

        let sections: Vec<(u32, Vec<u8>)> = vec![
            (1, ZKEY_PROTOCOL_ID.to_le_bytes().to_vec()),
            (2, header),
            (3, g1s(&key.ic)),
            (4, coef_bytes),
            (5, g1s(&key.points_a)),
            (6, g1s(&key.points_b1)),
            (7, g2s(&key.points_b2)),
            (8, g1s(&key.round_points_c)),
            (9, g1s(&key.final_points_c)),
            (10, u32s(&key.round_indexes)),
            (11, u32s(&key.final_indexes)),
            (12, g1s(&key.points_h)),
            (13, Vec::new()),
        ];

        let mut out = Vec::new();
        out.extend_from_slice(ZKEY_TAG.as_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&(sections.len() as u32).to_le_bytes());
        for (id, payload) in sections {
            out.extend_from_slice(&id.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            out.extend_from_slice(&payload);
        }
        out
    }

    #[test]
    fn test_zkey_round_trip() {
        let key = build_test_key();
        let parsed = ProvingKey::read(&encode_zkey(&key)).unwrap();
        assert_eq!(parsed.n_vars, key.n_vars);
        assert_eq!(parsed.rand_index, key.rand_index);
        assert_eq!(parsed.coefs, key.coefs);
        assert_eq!(parsed.ic, key.ic);
        assert_eq!(parsed.points_h, key.points_h);
        assert_eq!(parsed.verification_key(), key.verification_key());
    }

    #[test]
    fn test_zkey_rejects_bad_protocol_id() {
        let key = build_test_key();
        let mut bytes = encode_zkey(&key);
        // section 1 payload sits right after the 12-byte file header and
        // the 12-byte section header
        bytes[24] = 0;
        assert!(matches!(
            ProvingKey::read(&bytes),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_zkey_rejects_public_count_reaching_n_vars() {
        // every other section stays consistent with the inflated count, so
        // only the public-slot bound can reject this key
        let mut key = build_test_key();
        key.n_public = N_VARS;
        key.ic
            .resize(N_VARS + 1, G1Affine::identity());
        assert!(matches!(
            ProvingKey::read(&encode_zkey(&key)),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_zkey_rejects_truncation() {
        let key = build_test_key();
        let mut bytes = encode_zkey(&key);
        bytes.truncate(bytes.len() - 8);
        assert!(matches!(
            ProvingKey::read(&bytes),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_api_prove_and_verify() {
        let key = build_test_key();
        let vk_json = key.verification_key().to_json().unwrap();
        let zkey = encode_zkey(&key);
        let witness = build_test_witness(Fr::from(9), Fr::from(3));
        let wtns = encode_wtns(&witness.values, &witness.lookup);

        // sized over all public slots, the challenge slot included
        assert_eq!(
            api::public_size_for_zkey(&zkey).unwrap(),
            api::public_buffer_min_size(N_PUBLIC)
        );

        let mut proof_buffer = vec![0u8; api::proof_buffer_min_size()];
        let mut public_buffer = vec![0u8; api::public_buffer_min_size(N_PUBLIC)];
        let (proof_len, public_len) =
            api::prove(&zkey, &wtns, &mut proof_buffer, &mut public_buffer).unwrap();

        let proof_json = std::str::from_utf8(&proof_buffer[..proof_len]).unwrap();
        let public_json = std::str::from_utf8(&public_buffer[..public_len]).unwrap();
        assert_eq!(public_json, r#"["9"]"#);
        assert!(api::verify(proof_json, public_json, &vk_json).unwrap());
    }

    #[test]
    fn test_api_reports_short_buffer() {
        let key = build_test_key();
        let zkey = encode_zkey(&key);
        let witness = build_test_witness(Fr::from(9), Fr::from(3));
        let wtns = encode_wtns(&witness.values, &witness.lookup);

        let mut proof_buffer = vec![0u8; api::proof_buffer_min_size()];
        // one byte short of the requirement
        let mut public_buffer = vec![0u8; api::public_buffer_min_size(N_PUBLIC) - 1];
        let err = api::prove(&zkey, &wtns, &mut proof_buffer, &mut public_buffer).unwrap_err();
        assert_eq!(err.status(), api::STATUS_ERROR_SHORT_BUFFER);
        assert_eq!(
            err,
            api::ApiError::ShortBuffer {
                proof_required: api::proof_buffer_min_size(),
                public_required: api::public_buffer_min_size(N_PUBLIC),
            }
        );
    }

    #[test]
    fn test_api_reports_witness_length_mismatch() {
        let key = build_test_key();
        let zkey = encode_zkey(&key);
        let witness = build_test_witness(Fr::from(9), Fr::from(3));
        let mut values = witness.values.clone();
        values.push(Fr::ZERO);
        let wtns = encode_wtns(&values, &witness.lookup);

        let mut proof_buffer = vec![0u8; api::proof_buffer_min_size()];
        let mut public_buffer = vec![0u8; api::public_buffer_min_size(N_PUBLIC)];
        let err = api::prove(&zkey, &wtns, &mut proof_buffer, &mut public_buffer).unwrap_err();
        assert_eq!(err.status(), api::STATUS_INVALID_WITNESS_LENGTH);
        assert_eq!(
            err,
            api::ApiError::InvalidWitnessLength {
                expected: N_VARS,
                actual: N_VARS + 1,
            }
        );
    }
}
