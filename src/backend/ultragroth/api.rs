//! Buffer-oriented entry points mirroring the C prover surface.

use crate::{
    backend::ultragroth::{
        key::{ProvingKey, VerificationKey, ZKEY_TAG, ZKEY_MAX_VERSION},
        prover::Prover,
        verifier,
        witness::Witness,
        Proof,
    },
    util::{
        arithmetic::{fe_from_decimal, fe_to_decimal},
        binfile::BinFile,
    },
    Error,
};
use halo2_curves::bn256::Fr;

pub const STATUS_OK: u32 = 0x0;
pub const STATUS_ERROR: u32 = 0x1;
pub const STATUS_ERROR_SHORT_BUFFER: u32 = 0x2;
pub const STATUS_INVALID_WITNESS_LENGTH: u32 = 0x3;

/// Failures of the buffer API, each mapping to one FFI status code.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiError {
    ShortBuffer {
        proof_required: usize,
        public_required: usize,
    },
    InvalidWitnessLength {
        expected: usize,
        actual: usize,
    },
    Other(Error),
}

impl ApiError {
    pub fn status(&self) -> u32 {
        match self {
            ApiError::ShortBuffer { .. } => STATUS_ERROR_SHORT_BUFFER,
            ApiError::InvalidWitnessLength { .. } => STATUS_INVALID_WITNESS_LENGTH,
            ApiError::Other(_) => STATUS_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Other(err)
    }
}

/// Upper bound on the serialized proof, independent of the key.
pub fn proof_buffer_min_size() -> usize {
    1300
}

/// Upper bound on the serialized public signals: each slot is at most 78
/// decimal digits plus JSON punctuation. Sized over every public slot of
/// the key, the challenge slot included.
pub fn public_buffer_min_size(n_public: usize) -> usize {
    n_public * 82 + 4
}

/// Public-buffer requirement for a key, from the container header alone.
pub fn public_size_for_zkey(zkey: &[u8]) -> Result<usize, Error> {
    let file = BinFile::new(zkey, ZKEY_TAG, ZKEY_MAX_VERSION)?;
    let mut header = file.reader(2)?;
    let n8q = header.read_u32_le()? as usize;
    header.read_bytes(n8q)?;
    let n8r = header.read_u32_le()? as usize;
    header.read_bytes(n8r)?;
    let _n_vars = header.read_u32_le()?;
    let n_public = header.read_u32_le()? as usize;
    if n_public == 0 {
        return Err(Error::InvalidKey(
            "key declares no public slots".to_string(),
        ));
    }
    Ok(public_buffer_min_size(n_public))
}

/// Parses both containers, proves, and writes the proof and public-signal
/// JSON strings into the buffers. Returns the written lengths.
pub fn prove(
    zkey: &[u8],
    wtns: &[u8],
    proof_buffer: &mut [u8],
    public_buffer: &mut [u8],
) -> Result<(usize, usize), ApiError> {
    let key = ProvingKey::read(zkey)?;
    let mut witness = Witness::read(wtns)?;
    if witness.values.len() != key.n_vars {
        return Err(ApiError::InvalidWitnessLength {
            expected: key.n_vars,
            actual: witness.values.len(),
        });
    }

    let proof_required = proof_buffer_min_size();
    let public_required = public_buffer_min_size(key.n_public);
    if proof_buffer.len() < proof_required || public_buffer.len() < public_required {
        return Err(ApiError::ShortBuffer {
            proof_required,
            public_required,
        });
    }

    let prover = Prover::new(key);
    let (proof, public_signals) = prover.prove(&mut witness)?;

    let proof_json = proof.to_json().map_err(ApiError::Other)?;
    let public_json = public_signals_to_json(&public_signals);
    debug_assert!(proof_json.len() <= proof_required);
    debug_assert!(public_json.len() <= public_required);

    proof_buffer[..proof_json.len()].copy_from_slice(proof_json.as_bytes());
    public_buffer[..public_json.len()].copy_from_slice(public_json.as_bytes());
    Ok((proof_json.len(), public_json.len()))
}

/// Verifies a proof from its JSON artifacts.
pub fn verify(proof_json: &str, public_json: &str, vk_json: &str) -> Result<bool, Error> {
    let proof = Proof::from_json(proof_json)?;
    let public_inputs = public_signals_from_json(public_json)?;
    let vk = VerificationKey::from_json(vk_json)?;
    verifier::verify(&vk, &proof, &public_inputs)
}

pub fn public_signals_to_json(signals: &[Fr]) -> String {
    let strings: Vec<String> = signals.iter().map(fe_to_decimal).collect();
    serde_json::to_string(&strings).unwrap()
}

pub fn public_signals_from_json(json: &str) -> Result<Vec<Fr>, Error> {
    let strings: Vec<String> =
        serde_json::from_str(json).map_err(|err| Error::Serialization(err.to_string()))?;
    strings
        .iter()
        .map(|s| {
            fe_from_decimal(s)
                .ok_or_else(|| Error::Serialization(format!("invalid public signal {s:?}")))
        })
        .collect()
}
