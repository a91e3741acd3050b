//! Optimal-ate pairing over BN254, specialized to the product-of-pairings
//! acceptance check. Line evaluations follow the homogeneous projective
//! coordinates of https://eprint.iacr.org/2013/722.

use crate::util::arithmetic::{Field, PrimeField};
use halo2_curves::bn256::{
    Fq, Fq12, Fq2, G1Affine, G2Affine, FROBENIUS_COEFF_FQ6_C1, XI_TO_Q_MINUS_1_OVER_2,
};
use halo2_curves::group::prime::PrimeCurveAffine;

/// BN parameter `x`; the exponentiation chain uses `f^(-x)` throughout,
/// hence the closing conjugation in `exp_by_neg_x`.
const BN_X: u64 = 4965661367192848881;

/// `6x + 2` in non-adjacent form, least significant digit first.
const SIX_X_PLUS_2_NAF: [i8; 65] = [
    0, 0, 0, 1, 0, 1, 0, -1, 0, 0, 1, -1, 0, 0, 1, 0, 0, 1, 1, 0, -1, 0, 0, 1, 0, -1, 0, 0, 0, 0,
    1, 1, 1, 0, 0, -1, 0, 0, 1, 0, 0, 0, 0, 0, -1, 0, 0, 1, 1, 0, 0, -1, 0, 0, 0, 1, 1, 0, -1, 0,
    0, 1, 0, 1, 1,
];

type EllCoeffs = (Fq2, Fq2, Fq2);

/// Precomputed line coefficients for one G2 input of the Miller loop.
#[derive(Clone, Debug)]
pub struct G2Prepared {
    ell_coeffs: Vec<EllCoeffs>,
    infinity: bool,
}

struct G2Projective {
    x: Fq2,
    y: Fq2,
    z: Fq2,
}

impl G2Projective {
    fn double_in_place(&mut self, two_inv: &Fq, twist_b: &Fq2) -> EllCoeffs {
        let mut a = self.x * self.y;
        a.c0 *= two_inv;
        a.c1 *= two_inv;
        let b = self.y.square();
        let c = self.z.square();
        let e = *twist_b * (c.double() + c);
        let f = e.double() + e;
        let mut g = b + f;
        g.c0 *= two_inv;
        g.c1 *= two_inv;
        let h = (self.y + self.z).square() - (b + c);
        let i = e - b;
        let j = self.x.square();
        let e_square = e.square();

        self.x = a * (b - f);
        self.y = g.square() - (e_square.double() + e_square);
        self.z = b * h;
        (-h, j.double() + j, i)
    }

    fn add_in_place(&mut self, q: &G2Affine) -> EllCoeffs {
        let theta = self.y - (q.y * self.z);
        let lambda = self.x - (q.x * self.z);
        let c = theta.square();
        let d = lambda.square();
        let e = lambda * d;
        let f = self.z * c;
        let g = self.x * d;
        let h = e + f - g.double();
        self.x = lambda * h;
        self.y = theta * (g - h) - (e * self.y);
        self.z *= e;
        let j = theta * q.x - (lambda * q.y);
        (lambda, -theta, j)
    }
}

impl G2Prepared {
    pub fn from_affine(q: G2Affine) -> Self {
        if bool::from(q.is_identity()) {
            return Self {
                ell_coeffs: Vec::new(),
                infinity: true,
            };
        }

        let two_inv = Fq::TWO_INV;
        // b' = b / xi for the D-twist y^2 = x^3 + b'
        let twist_b = Fq2 {
            c0: Fq::from(3),
            c1: Fq::ZERO,
        } * Fq2 {
            c0: Fq::from(9),
            c1: Fq::ONE,
        }
        .invert()
        .unwrap();

        let mut r = G2Projective {
            x: q.x,
            y: q.y,
            z: Fq2::ONE,
        };
        let neg_q = -q;
        let mut ell_coeffs = Vec::with_capacity(SIX_X_PLUS_2_NAF.len() + 24);

        for digit in SIX_X_PLUS_2_NAF.iter().rev().skip(1) {
            ell_coeffs.push(r.double_in_place(&two_inv, &twist_b));
            match digit {
                1 => ell_coeffs.push(r.add_in_place(&q)),
                -1 => ell_coeffs.push(r.add_in_place(&neg_q)),
                _ => {}
            }
        }

        // the two Frobenius-twisted additions closing the loop
        let mut q1 = q;
        q1.x.conjugate();
        q1.x *= FROBENIUS_COEFF_FQ6_C1[1];
        q1.y.conjugate();
        q1.y *= XI_TO_Q_MINUS_1_OVER_2;
        ell_coeffs.push(r.add_in_place(&q1));

        let mut minus_q2 = q;
        minus_q2.x *= FROBENIUS_COEFF_FQ6_C1[2];
        ell_coeffs.push(r.add_in_place(&minus_q2));

        Self {
            ell_coeffs,
            infinity: false,
        }
    }
}

impl From<G2Affine> for G2Prepared {
    fn from(q: G2Affine) -> Self {
        Self::from_affine(q)
    }
}

fn ell(f: &mut Fq12, coeffs: &EllCoeffs, p: &G1Affine) {
    let mut c0 = coeffs.0;
    let mut c1 = coeffs.1;
    c0.c0 *= p.y;
    c0.c1 *= p.y;
    c1.c0 *= p.x;
    c1.c1 *= p.x;
    f.mul_by_034(&c0, &c1, &coeffs.2);
}

/// Shared Miller loop over all pairs. Pairs with an identity member are
/// skipped.
pub fn multi_miller_loop(pairs: &[(G1Affine, G2Prepared)]) -> Fq12 {
    let mut pairs: Vec<_> = pairs
        .iter()
        .filter(|(p, q)| !bool::from(p.is_identity()) && !q.infinity)
        .map(|(p, q)| (p, q.ell_coeffs.iter()))
        .collect();

    let mut f = Fq12::ONE;
    for i in (1..SIX_X_PLUS_2_NAF.len()).rev() {
        if i != SIX_X_PLUS_2_NAF.len() - 1 {
            f = f.square();
        }
        for (p, coeffs) in pairs.iter_mut() {
            ell(&mut f, coeffs.next().unwrap(), *p);
        }
        let digit = SIX_X_PLUS_2_NAF[i - 1];
        if digit == 1 || digit == -1 {
            for (p, coeffs) in pairs.iter_mut() {
                ell(&mut f, coeffs.next().unwrap(), *p);
            }
        }
    }
    for _ in 0..2 {
        for (p, coeffs) in pairs.iter_mut() {
            ell(&mut f, coeffs.next().unwrap(), *p);
        }
    }
    #[cfg(feature = "sanity-check")]
    for (_, coeffs) in pairs.iter_mut() {
        assert!(coeffs.next().is_none());
    }
    f
}

fn exp_by_neg_x(f: &Fq12) -> Fq12 {
    let mut result = Fq12::ONE;
    for i in (0..64).rev() {
        result = result.square();
        if (BN_X >> i) & 1 == 1 {
            result *= f;
        }
    }
    result.conjugate();
    result
}

/// Maps the Miller loop output to the unique coset representative. `None`
/// only for a zero input, which no valid Miller loop produces.
pub fn final_exponentiation(f: &Fq12) -> Option<Fq12> {
    // easy part: f^((p^6 - 1) * (p^2 + 1))
    let mut f1 = *f;
    f1.conjugate();
    let f_inv = Option::<Fq12>::from(f.invert())?;
    let mut r = f1 * f_inv;
    let f2 = r;
    r.frobenius_map(2);
    r *= &f2;

    // hard part, Fuentes-Castaneda et al. addition chain
    let y0 = exp_by_neg_x(&r);
    let y1 = y0.square();
    let y2 = y1.square();
    let mut y3 = y2 * y1;
    let y4 = exp_by_neg_x(&y3);
    let y5 = y4.square();
    let mut y6 = exp_by_neg_x(&y5);
    y3.conjugate();
    y6.conjugate();
    let y7 = y6 * y4;
    let mut y8 = y7 * y3;
    let y9 = y8 * y1;
    let y10 = y8 * y4;
    let y11 = y10 * r;
    let mut y12 = y9;
    y12.frobenius_map(1);
    let y13 = y12 * y11;
    y8.frobenius_map(2);
    let y14 = y8 * y13;
    r.conjugate();
    let mut y15 = r * y9;
    y15.frobenius_map(3);
    Some(y15 * y14)
}

/// Product-of-pairings acceptance check:
/// `prod_i e(g1[i], g2[i]) == 1`. Mismatched lengths are a failure, pairs
/// with an identity member contribute nothing.
pub fn pairing_check(g1: &[G1Affine], g2: &[G2Affine]) -> bool {
    if g1.len() != g2.len() {
        return false;
    }
    let pairs: Vec<(G1Affine, G2Prepared)> = g1
        .iter()
        .zip(g2.iter())
        .map(|(p, q)| (*p, G2Prepared::from_affine(*q)))
        .collect();
    let f = multi_miller_loop(&pairs);
    match final_exponentiation(&f) {
        Some(e) => e == Fq12::ONE,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo2_curves::bn256::{Fr, G1, G2};
    use halo2_curves::group::{Curve, Group};
    use rand::rngs::OsRng;

    fn g1(scalar: Fr) -> G1Affine {
        (G1::generator() * scalar).to_affine()
    }

    fn g2(scalar: Fr) -> G2Affine {
        (G2::generator() * scalar).to_affine()
    }

    #[test]
    fn test_bilinearity() {
        let a = Fr::random(OsRng);
        let b = Fr::random(OsRng);
        // e(aG, bH) * e(-abG, H) == 1
        assert!(pairing_check(&[g1(a), g1(-(a * b))], &[g2(b), g2(Fr::ONE)]));
        // moving the scalar across the pairing
        assert!(pairing_check(&[g1(a), -g1(a)], &[g2(b), g2(b)]));
        assert!(!pairing_check(
            &[g1(a), g1(-(a * b) + Fr::ONE)],
            &[g2(b), g2(Fr::ONE)]
        ));
    }

    #[test]
    fn test_identity_pairs_are_skipped() {
        let a = Fr::random(OsRng);
        assert!(pairing_check(&[G1Affine::identity()], &[g2(a)]));
        assert!(pairing_check(&[g1(a)], &[G2Affine::identity()]));
        assert!(pairing_check(&[], &[]));
    }

    #[test]
    fn test_length_mismatch_fails() {
        assert!(!pairing_check(&[G1Affine::generator()], &[]));
    }

    #[test]
    fn test_single_nondegenerate_pairing_is_not_one() {
        assert!(!pairing_check(
            &[G1Affine::generator()],
            &[G2Affine::generator()]
        ));
    }

    #[test]
    fn test_miller_loop_output_has_full_coeff_count() {
        let prepared = G2Prepared::from_affine(G2Affine::generator());
        let adds = SIX_X_PLUS_2_NAF
            .iter()
            .filter(|digit| **digit != 0)
            .count();
        // one doubling per loop iteration, one addition per nonzero digit
        // (the top digit seeds the accumulator), two closing additions
        assert_eq!(
            prepared.ell_coeffs.len(),
            (SIX_X_PLUS_2_NAF.len() - 1) + (adds - 1) + 2
        );
    }
}
