//! Witness (`wtns`) container with the lookup bookkeeping sections.

use crate::{
    util::{
        arithmetic::{modulus, PrimeField},
        binfile::{BinFile, SectionReader},
    },
    Error,
};
use halo2_curves::bn256::Fr;
use num_bigint::BigUint;

pub const WTNS_TAG: &str = "wtns";
pub const WTNS_MAX_VERSION: u32 = 2;

/// Lookup bookkeeping attached to a witness: which table entries each
/// looked-up chunk resolves to, how often each entry is used, and where
/// the challenge-dependent values get scattered back into the witness.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupInfo {
    pub chunks: Vec<u32>,
    pub frequencies: Vec<u32>,
    pub wtns_indexes: Vec<u32>,
    pub push_indexes: Vec<u32>,
}

#[derive(Clone, Debug)]
pub struct Witness {
    pub values: Vec<Fr>,
    pub lookup: LookupInfo,
}

impl Witness {
    pub fn read(bytes: &[u8]) -> Result<Self, Error> {
        let file = BinFile::new(bytes, WTNS_TAG, WTNS_MAX_VERSION)?;

        let mut header = file.reader(1)?;
        let n8 = header.read_u32_le()? as usize;
        if n8 != 32 {
            return Err(Error::InvalidWitness(format!("unsupported n8 {n8}")));
        }
        let r = header.read_bytes(n8)?;
        if BigUint::from_bytes_le(r) != modulus::<Fr>() {
            return Err(Error::InvalidWitness(
                "scalar field modulus mismatch".to_string(),
            ));
        }
        let n_vars = header.read_u32_le()? as usize;
        header.expect_end()?;

        let mut value_reader = file.reader(2)?;
        if value_reader.remaining() != n_vars * 32 {
            return Err(Error::InvalidWitness(format!(
                "expected {n_vars} witness values, found {} bytes",
                value_reader.remaining()
            )));
        }
        let values = (0..n_vars)
            .map(|_| {
                Option::<Fr>::from(Fr::from_repr(value_reader.read_fe_bytes()?)).ok_or_else(|| {
                    Error::InvalidWitness("non-canonical witness value".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let lookup = LookupInfo {
            chunks: read_u32_section(file.reader(3)?)?,
            frequencies: read_u32_section(file.reader(4)?)?,
            wtns_indexes: read_u32_section(file.reader(5)?)?,
            push_indexes: read_u32_section(file.reader(6)?)?,
        };

        let total_frequency: u64 = lookup.frequencies.iter().map(|&f| f as u64).sum();
        if total_frequency != lookup.chunks.len() as u64 {
            return Err(Error::InvalidWitness(format!(
                "frequencies sum to {total_frequency} but there are {} chunks",
                lookup.chunks.len()
            )));
        }
        if let Some(&chunk) = lookup
            .chunks
            .iter()
            .find(|&&chunk| chunk as usize >= lookup.frequencies.len())
        {
            return Err(Error::InvalidWitness(format!(
                "chunk value {chunk} outside the table of size {}",
                lookup.frequencies.len()
            )));
        }
        if lookup.wtns_indexes.len() != lookup.push_indexes.len() {
            return Err(Error::InvalidWitness(format!(
                "{} witness indexes but {} push indexes",
                lookup.wtns_indexes.len(),
                lookup.push_indexes.len()
            )));
        }

        Ok(Self { values, lookup })
    }
}

fn read_u32_section(mut reader: SectionReader) -> Result<Vec<u32>, Error> {
    if reader.remaining() % 4 != 0 {
        return Err(Error::InvalidWitness(
            "index section size is not a multiple of four".to_string(),
        ));
    }
    let count = reader.remaining() / 4;
    (0..count).map(|_| reader.read_u32_le()).collect()
}
