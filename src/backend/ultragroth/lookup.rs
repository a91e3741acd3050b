//! Log-derivative lookup completion: fills the witness slots that depend
//! on the Fiat-Shamir challenge.

use crate::{
    backend::ultragroth::witness::LookupInfo,
    util::{arithmetic::Field, parallel::parallelize},
    Error,
};
use halo2_curves::bn256::Fr;
use itertools::izip;
use std::iter;

/// Computes the challenge-dependent lookup columns and scatters them into
/// the witness:
///
/// - `inv2[i] = (challenge + i)^-1` for every table entry `i`,
/// - `prod[i] = frequencies[i] * inv2[i]`,
/// - `inv1[j] = inv2[chunks[j]]` for every looked-up chunk,
///
/// then `witness[wtns_indexes[k]] = scratch[push_indexes[k]]` where
/// `scratch = [challenge] ++ inv1 ++ inv2 ++ prod`.
pub fn compute_lookup(witness: &mut [Fr], info: &LookupInfo, challenge: Fr) -> Result<(), Error> {
    let table_size = info.frequencies.len();

    let mut inv2 = Vec::with_capacity(table_size);
    for i in 0..table_size {
        let inverted = (challenge + Fr::from(i as u64)).invert();
        if bool::from(inverted.is_none()) {
            return Err(Error::InvalidWitness(format!(
                "challenge collides with table entry {i}"
            )));
        }
        inv2.push(inverted.unwrap());
    }

    let mut prod = vec![Fr::ZERO; table_size];
    parallelize(&mut prod, |(chunk, start)| {
        for (i, value) in chunk.iter_mut().enumerate() {
            *value = Fr::from(info.frequencies[start + i] as u64) * inv2[start + i];
        }
    });

    if let Some(&chunk) = info
        .chunks
        .iter()
        .find(|&&chunk| chunk as usize >= table_size)
    {
        return Err(Error::InvalidWitness(format!(
            "chunk value {chunk} outside the table of size {table_size}"
        )));
    }
    let mut inv1 = vec![Fr::ZERO; info.chunks.len()];
    parallelize(&mut inv1, |(chunk, start)| {
        for (i, value) in chunk.iter_mut().enumerate() {
            *value = inv2[info.chunks[start + i] as usize];
        }
    });

    let scratch: Vec<Fr> = iter::once(challenge)
        .chain(inv1)
        .chain(inv2)
        .chain(prod)
        .collect();

    if info.wtns_indexes.len() != info.push_indexes.len() {
        return Err(Error::InvalidWitness(format!(
            "{} witness indexes but {} push indexes",
            info.wtns_indexes.len(),
            info.push_indexes.len()
        )));
    }
    for (&wtns_index, &push_index) in izip!(&info.wtns_indexes, &info.push_indexes) {
        let source = scratch.get(push_index as usize).ok_or_else(|| {
            Error::InvalidWitness(format!("push index {push_index} out of range"))
        })?;
        let slot = witness.get_mut(wtns_index as usize).ok_or_else(|| {
            Error::InvalidWitness(format!("witness index {wtns_index} out of range"))
        })?;
        *slot = *source;
    }
    Ok(())
}
