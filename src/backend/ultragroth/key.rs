//! Proving-key (`zkey`) container and the verification key derived from it.
//!
//! Section map (all integers little-endian, field elements 32-byte
//! little-endian, G1 = `x || y`, G2 = `x.c0 || x.c1 || y.c0 || y.c1`,
//! all-zero coordinates encode the identity):
//!
//! 1. protocol id (`u32`)
//! 2. header: `n8q`, `q`, `n8r`, `r`, `nVars`, `nPublic`, `domainSize`,
//!    `numRoundIndexes`, `numFinalIndexes`, `randIndex`, then
//!    `alpha1, beta1 (G1)`, `beta2, gamma2 (G2)`, `roundDelta1 (G1)`,
//!    `roundDelta2 (G2)`, `finalDelta1 (G1)`, `finalDelta2 (G2)`
//! 3. input commitment basis `IC` (`nPublic + 1` G1)
//! 4. constraint coefficients (`u32` matrix, `u32` row, `u32` signal, `Fr`)
//! 5. `pointsA` (`nVars` G1)  6. `pointsB1` (`nVars` G1)
//! 7. `pointsB2` (`nVars` G2) 8. `roundPointsC` 9. `finalPointsC`
//! 10. `roundIndexes` 11. `finalIndexes` (`u32` arrays)
//! 12. `pointsH` (`domainSize` G1) 13. contributions (opaque, ignored)

use crate::{
    backend::ultragroth::ZKEY_PROTOCOL_ID,
    util::{
        arithmetic::{fe_from_decimal, fe_to_decimal, modulus, Field, PrimeField},
        binfile::{BinFile, SectionReader},
    },
    Error,
};
use halo2_curves::bn256::{Fq, Fq2, Fr, G1Affine, G2Affine};
use halo2_curves::group::{cofactor::CofactorGroup, prime::PrimeCurveAffine};
use halo2_curves::CurveAffine;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

pub const ZKEY_TAG: &str = "zkey";
pub const ZKEY_MAX_VERSION: u32 = 1;

const COEF_SIZE: usize = 4 + 4 + 4 + 32;

/// One accumulation record of the constraint system: add
/// `witness[signal] * value` to row `row` of matrix A (`matrix == 0`) or
/// B (`matrix == 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coef {
    pub matrix: u32,
    pub row: u32,
    pub signal: u32,
    pub value: Fr,
}

#[derive(Clone, Debug)]
pub struct ProvingKey {
    pub n_vars: usize,
    pub n_public: usize,
    pub domain_size: usize,
    pub rand_index: usize,
    pub alpha1: G1Affine,
    pub beta1: G1Affine,
    pub beta2: G2Affine,
    pub gamma2: G2Affine,
    pub round_delta1: G1Affine,
    pub round_delta2: G2Affine,
    pub final_delta1: G1Affine,
    pub final_delta2: G2Affine,
    pub ic: Vec<G1Affine>,
    pub coefs: Vec<Coef>,
    pub points_a: Vec<G1Affine>,
    pub points_b1: Vec<G1Affine>,
    pub points_b2: Vec<G2Affine>,
    pub round_points_c: Vec<G1Affine>,
    pub final_points_c: Vec<G1Affine>,
    pub round_indexes: Vec<u32>,
    pub final_indexes: Vec<u32>,
    pub points_h: Vec<G1Affine>,
}

impl ProvingKey {
    pub fn read(bytes: &[u8]) -> Result<Self, Error> {
        let file = BinFile::new(bytes, ZKEY_TAG, ZKEY_MAX_VERSION)?;

        let mut protocol = file.reader(1)?;
        let protocol_id = protocol.read_u32_le()?;
        protocol.expect_end()?;
        if protocol_id != ZKEY_PROTOCOL_ID {
            return Err(Error::InvalidKey(format!(
                "unsupported protocol id {protocol_id}, expected {ZKEY_PROTOCOL_ID}"
            )));
        }

        let mut header = file.reader(2)?;
        let n8q = header.read_u32_le()? as usize;
        if n8q != 32 {
            return Err(Error::InvalidKey(format!("unsupported n8q {n8q}")));
        }
        let q = header.read_bytes(n8q)?;
        if BigUint::from_bytes_le(q) != modulus::<Fq>() {
            return Err(Error::InvalidKey("base field modulus mismatch".to_string()));
        }
        let n8r = header.read_u32_le()? as usize;
        if n8r != 32 {
            return Err(Error::InvalidKey(format!("unsupported n8r {n8r}")));
        }
        let r = header.read_bytes(n8r)?;
        if BigUint::from_bytes_le(r) != modulus::<Fr>() {
            return Err(Error::InvalidKey(
                "scalar field modulus mismatch".to_string(),
            ));
        }
        let n_vars = header.read_u32_le()? as usize;
        let n_public = header.read_u32_le()? as usize;
        let domain_size = header.read_u32_le()? as usize;
        let n_round_indexes = header.read_u32_le()? as usize;
        let n_final_indexes = header.read_u32_le()? as usize;
        let rand_index = header.read_u32_le()? as usize;
        let alpha1 = read_g1(&mut header)?;
        let beta1 = read_g1(&mut header)?;
        let beta2 = read_g2(&mut header)?;
        let gamma2 = read_g2(&mut header)?;
        let round_delta1 = read_g1(&mut header)?;
        let round_delta2 = read_g2(&mut header)?;
        let final_delta1 = read_g1(&mut header)?;
        let final_delta2 = read_g2(&mut header)?;
        header.expect_end()?;

        if !domain_size.is_power_of_two() {
            return Err(Error::InvalidKey(format!(
                "domain size {domain_size} is not a power of two"
            )));
        }
        if rand_index == 0 || rand_index > n_public {
            return Err(Error::InvalidKey(format!(
                "challenge slot {rand_index} outside the public range 1..={n_public}"
            )));
        }
        if n_public >= n_vars {
            return Err(Error::InvalidKey(format!(
                "{n_public} public slots for only {n_vars} witness variables"
            )));
        }

        let ic = read_g1_section(file.reader(3)?, n_public + 1)?;

        let mut coef_reader = file.reader(4)?;
        if coef_reader.remaining() % COEF_SIZE != 0 {
            return Err(Error::InvalidKey(
                "coefficient section size is not a multiple of the record size".to_string(),
            ));
        }
        let n_coefs = coef_reader.remaining() / COEF_SIZE;
        let mut coefs = Vec::with_capacity(n_coefs);
        for _ in 0..n_coefs {
            let matrix = coef_reader.read_u32_le()?;
            let row = coef_reader.read_u32_le()?;
            let signal = coef_reader.read_u32_le()?;
            let value = read_fr(&mut coef_reader)?;
            if matrix > 1 {
                return Err(Error::InvalidKey(format!(
                    "coefficient matrix selector {matrix} out of range"
                )));
            }
            if row as usize >= domain_size {
                return Err(Error::InvalidKey(format!(
                    "coefficient row {row} outside the domain of size {domain_size}"
                )));
            }
            if signal as usize >= n_vars {
                return Err(Error::InvalidKey(format!(
                    "coefficient signal {signal} out of range for {n_vars} variables"
                )));
            }
            coefs.push(Coef {
                matrix,
                row,
                signal,
                value,
            });
        }

        let points_a = read_g1_section(file.reader(5)?, n_vars)?;
        let points_b1 = read_g1_section(file.reader(6)?, n_vars)?;
        let points_b2 = read_g2_section(file.reader(7)?, n_vars)?;
        let round_points_c = read_g1_section(file.reader(8)?, n_round_indexes)?;
        let final_points_c = read_g1_section(file.reader(9)?, n_final_indexes)?;
        let round_indexes = read_index_section(file.reader(10)?, n_round_indexes, n_vars)?;
        let final_indexes = read_index_section(file.reader(11)?, n_final_indexes, n_vars)?;
        let points_h = read_g1_section(file.reader(12)?, domain_size)?;

        Ok(Self {
            n_vars,
            n_public,
            domain_size,
            rand_index,
            alpha1,
            beta1,
            beta2,
            gamma2,
            round_delta1,
            round_delta2,
            final_delta1,
            final_delta2,
            ic,
            coefs,
            points_a,
            points_b1,
            points_b2,
            round_points_c,
            final_points_c,
            round_indexes,
            final_indexes,
            points_h,
        })
    }

    /// Number of public signals reported to the verifier, i.e. the public
    /// witness slots minus the challenge slot.
    pub fn n_public_signals(&self) -> usize {
        self.n_public - 1
    }

    pub fn verification_key(&self) -> VerificationKey {
        let mut ic = Vec::with_capacity(self.n_public);
        let mut ic_rand = G1Affine::identity();
        for (i, point) in self.ic.iter().enumerate() {
            if i == self.rand_index {
                ic_rand = *point;
            } else {
                ic.push(*point);
            }
        }
        VerificationKey {
            alpha1: self.alpha1,
            beta2: self.beta2,
            gamma2: self.gamma2,
            round_delta2: self.round_delta2,
            final_delta2: self.final_delta2,
            ic,
            ic_rand,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VerificationKey {
    pub alpha1: G1Affine,
    pub beta2: G2Affine,
    pub gamma2: G2Affine,
    pub round_delta2: G2Affine,
    pub final_delta2: G2Affine,
    /// Basis for the input commitment: index 0 plus one column per public
    /// signal, the challenge column excluded.
    pub ic: Vec<G1Affine>,
    /// Column for the Fiat-Shamir challenge slot.
    pub ic_rand: G1Affine,
}

#[derive(Serialize, Deserialize)]
struct VerificationKeyJson {
    protocol: String,
    curve: String,
    vk_alpha_1: [String; 3],
    vk_beta_2: [[String; 2]; 3],
    vk_gamma_2: [[String; 2]; 3],
    vk_round_delta_2: [[String; 2]; 3],
    vk_final_delta_2: [[String; 2]; 3],
    #[serde(rename = "IC")]
    ic: Vec<[String; 3]>,
    ic_rand: [String; 3],
}

impl VerificationKey {
    pub fn to_json(&self) -> Result<String, Error> {
        let json = VerificationKeyJson {
            protocol: super::PROTOCOL_NAME.to_string(),
            curve: super::CURVE_NAME.to_string(),
            vk_alpha_1: g1_to_strings(&self.alpha1),
            vk_beta_2: g2_to_strings(&self.beta2),
            vk_gamma_2: g2_to_strings(&self.gamma2),
            vk_round_delta_2: g2_to_strings(&self.round_delta2),
            vk_final_delta_2: g2_to_strings(&self.final_delta2),
            ic: self.ic.iter().map(g1_to_strings).collect(),
            ic_rand: g1_to_strings(&self.ic_rand),
        };
        serde_json::to_string_pretty(&json).map_err(|err| Error::Serialization(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let json: VerificationKeyJson =
            serde_json::from_str(json).map_err(|err| Error::Serialization(err.to_string()))?;
        if json.protocol != super::PROTOCOL_NAME {
            return Err(Error::Serialization(format!(
                "unexpected protocol {:?}",
                json.protocol
            )));
        }
        Ok(Self {
            alpha1: g1_from_strings(&json.vk_alpha_1)?,
            beta2: g2_from_strings(&json.vk_beta_2)?,
            gamma2: g2_from_strings(&json.vk_gamma_2)?,
            round_delta2: g2_from_strings(&json.vk_round_delta_2)?,
            final_delta2: g2_from_strings(&json.vk_final_delta_2)?,
            ic: json
                .ic
                .iter()
                .map(|strings| g1_from_strings(strings))
                .collect::<Result<_, _>>()?,
            ic_rand: g1_from_strings(&json.ic_rand)?,
        })
    }
}

fn read_fq(reader: &mut SectionReader) -> Result<Fq, Error> {
    Option::<Fq>::from(Fq::from_repr(reader.read_fe_bytes()?))
        .ok_or_else(|| Error::InvalidKey("non-canonical base field element".to_string()))
}

fn read_fr(reader: &mut SectionReader) -> Result<Fr, Error> {
    Option::<Fr>::from(Fr::from_repr(reader.read_fe_bytes()?))
        .ok_or_else(|| Error::InvalidKey("non-canonical scalar field element".to_string()))
}

pub(super) fn read_g1(reader: &mut SectionReader) -> Result<G1Affine, Error> {
    let x = read_fq(reader)?;
    let y = read_fq(reader)?;
    let point = G1Affine { x, y };
    if bool::from(x.is_zero() & y.is_zero()) || bool::from(point.is_on_curve()) {
        Ok(point)
    } else {
        Err(Error::InvalidKey("G1 point not on the curve".to_string()))
    }
}

pub(super) fn read_g2(reader: &mut SectionReader) -> Result<G2Affine, Error> {
    let x = Fq2 {
        c0: read_fq(reader)?,
        c1: read_fq(reader)?,
    };
    let y = Fq2 {
        c0: read_fq(reader)?,
        c1: read_fq(reader)?,
    };
    let point = G2Affine { x, y };
    if bool::from(x.is_zero() & y.is_zero()) {
        return Ok(point);
    }
    if !bool::from(point.is_on_curve()) {
        return Err(Error::InvalidKey("G2 point not on the curve".to_string()));
    }
    // the twist has a large cofactor, on-curve is not enough
    if !bool::from(point.to_curve().is_torsion_free()) {
        return Err(Error::InvalidKey(
            "G2 point outside the r-order subgroup".to_string(),
        ));
    }
    Ok(point)
}

fn read_g1_section(mut reader: SectionReader, count: usize) -> Result<Vec<G1Affine>, Error> {
    if reader.remaining() != count * 64 {
        return Err(Error::InvalidKey(format!(
            "expected {count} G1 points, found {} bytes",
            reader.remaining()
        )));
    }
    (0..count).map(|_| read_g1(&mut reader)).collect()
}

fn read_g2_section(mut reader: SectionReader, count: usize) -> Result<Vec<G2Affine>, Error> {
    if reader.remaining() != count * 128 {
        return Err(Error::InvalidKey(format!(
            "expected {count} G2 points, found {} bytes",
            reader.remaining()
        )));
    }
    (0..count).map(|_| read_g2(&mut reader)).collect()
}

fn read_index_section(
    mut reader: SectionReader,
    count: usize,
    n_vars: usize,
) -> Result<Vec<u32>, Error> {
    if reader.remaining() != count * 4 {
        return Err(Error::InvalidKey(format!(
            "expected {count} indexes, found {} bytes",
            reader.remaining()
        )));
    }
    (0..count)
        .map(|_| {
            let index = reader.read_u32_le()?;
            if index as usize >= n_vars {
                return Err(Error::InvalidKey(format!(
                    "witness index {index} out of range for {n_vars} variables"
                )));
            }
            Ok(index)
        })
        .collect()
}

pub(super) fn g1_to_strings(point: &G1Affine) -> [String; 3] {
    if bool::from(point.is_identity()) {
        ["0".to_string(), "1".to_string(), "0".to_string()]
    } else {
        [
            fe_to_decimal(&point.x),
            fe_to_decimal(&point.y),
            "1".to_string(),
        ]
    }
}

pub(super) fn g1_from_strings(strings: &[String; 3]) -> Result<G1Affine, Error> {
    match strings[2].as_str() {
        "0" => Ok(G1Affine::identity()),
        "1" => {
            let x = fe_from_decimal::<Fq>(&strings[0])
                .ok_or_else(|| Error::Serialization("invalid G1 x coordinate".to_string()))?;
            let y = fe_from_decimal::<Fq>(&strings[1])
                .ok_or_else(|| Error::Serialization("invalid G1 y coordinate".to_string()))?;
            let point = G1Affine { x, y };
            if bool::from(point.is_on_curve()) {
                Ok(point)
            } else {
                Err(Error::Serialization(
                    "G1 point not on the curve".to_string(),
                ))
            }
        }
        _ => Err(Error::Serialization(
            "invalid projective G1 encoding".to_string(),
        )),
    }
}

pub(super) fn g2_to_strings(point: &G2Affine) -> [[String; 2]; 3] {
    if bool::from(point.is_identity()) {
        [
            ["0".to_string(), "0".to_string()],
            ["1".to_string(), "0".to_string()],
            ["0".to_string(), "0".to_string()],
        ]
    } else {
        [
            [fe_to_decimal(&point.x.c0), fe_to_decimal(&point.x.c1)],
            [fe_to_decimal(&point.y.c0), fe_to_decimal(&point.y.c1)],
            ["1".to_string(), "0".to_string()],
        ]
    }
}

pub(super) fn g2_from_strings(strings: &[[String; 2]; 3]) -> Result<G2Affine, Error> {
    let fq2 = |pair: &[String; 2], what: &str| -> Result<Fq2, Error> {
        Ok(Fq2 {
            c0: fe_from_decimal::<Fq>(&pair[0])
                .ok_or_else(|| Error::Serialization(format!("invalid G2 {what} coordinate")))?,
            c1: fe_from_decimal::<Fq>(&pair[1])
                .ok_or_else(|| Error::Serialization(format!("invalid G2 {what} coordinate")))?,
        })
    };
    match (strings[2][0].as_str(), strings[2][1].as_str()) {
        ("0", "0") => Ok(G2Affine::identity()),
        ("1", "0") => {
            let point = G2Affine {
                x: fq2(&strings[0], "x")?,
                y: fq2(&strings[1], "y")?,
            };
            if !bool::from(point.is_on_curve()) {
                return Err(Error::Serialization(
                    "G2 point not on the curve".to_string(),
                ));
            }
            if !bool::from(point.to_curve().is_torsion_free()) {
                return Err(Error::Serialization(
                    "G2 point outside the r-order subgroup".to_string(),
                ));
            }
            Ok(point)
        }
        _ => Err(Error::Serialization(
            "invalid projective G2 encoding".to_string(),
        )),
    }
}
