use crate::util::parallel::{num_threads, parallelize_iter};
use halo2_curves::group::Group;
use num_bigint::BigUint;

pub mod fft;

pub use halo2_curves::{
    group::ff::{Field, PrimeField},
    CurveAffine,
};

/// Primitive `2^k`-th root of unity.
pub fn root_of_unity<F: PrimeField>(k: usize) -> F {
    assert!(k <= F::S as usize);
    F::ROOT_OF_UNITY.pow_vartime([1u64 << (F::S as usize - k)])
}

pub fn root_of_unity_inv<F: PrimeField>(k: usize) -> F {
    assert!(k <= F::S as usize);
    F::ROOT_OF_UNITY_INV.pow_vartime([1u64 << (F::S as usize - k)])
}

pub fn modulus<F: PrimeField>() -> BigUint {
    BigUint::parse_bytes(F::MODULUS.trim_start_matches("0x").as_bytes(), 16).unwrap()
}

/// Interprets `bytes` as a big-endian integer and reduces it into the field.
pub fn fe_from_be_bytes_mod_order<F: PrimeField<Repr = [u8; 32]>>(bytes: &[u8]) -> F {
    let value = BigUint::from_bytes_be(bytes) % modulus::<F>();
    let mut repr = [0u8; 32];
    let le = value.to_bytes_le();
    repr[..le.len()].copy_from_slice(&le);
    F::from_repr(repr).unwrap()
}

pub fn fe_to_decimal<F: PrimeField<Repr = [u8; 32]>>(fe: &F) -> String {
    BigUint::from_bytes_le(fe.to_repr().as_ref()).to_str_radix(10)
}

/// Parses a canonical decimal representation, rejecting values at or above
/// the modulus.
pub fn fe_from_decimal<F: PrimeField<Repr = [u8; 32]>>(s: &str) -> Option<F> {
    let value = BigUint::parse_bytes(s.as_bytes(), 10)?;
    if value >= modulus::<F>() {
        return None;
    }
    let mut repr = [0u8; 32];
    let le = value.to_bytes_le();
    repr[..le.len()].copy_from_slice(&le);
    F::from_repr(repr).into()
}

fn multiexp_serial<C: CurveAffine>(coeffs: &[C::Scalar], bases: &[C], acc: &mut C::Curve) {
    let coeffs: Vec<_> = coeffs.iter().map(|a| a.to_repr()).collect();

    let c = if bases.len() < 4 {
        1
    } else if bases.len() < 32 {
        3
    } else {
        f64::from(bases.len() as u32).ln().ceil() as usize
    };

    fn get_at<F: PrimeField>(segment: usize, c: usize, bytes: &F::Repr) -> usize {
        let skip_bits = segment * c;
        let skip_bytes = skip_bits / 8;

        if skip_bytes >= (F::NUM_BITS as usize + 7) / 8 {
            return 0;
        }

        let mut v = [0; 8];
        for (v, o) in v.iter_mut().zip(bytes.as_ref()[skip_bytes..].iter()) {
            *v = *o;
        }

        let mut tmp = u64::from_le_bytes(v);
        tmp >>= skip_bits - (skip_bytes * 8);
        tmp %= 1 << c;

        tmp as usize
    }

    let segments = (C::Scalar::NUM_BITS as usize / c) + 1;

    for current_segment in (0..segments).rev() {
        for _ in 0..c {
            *acc = acc.double();
        }

        #[derive(Clone, Copy)]
        enum Bucket<C: CurveAffine> {
            None,
            Affine(C),
            Projective(C::Curve),
        }

        impl<C: CurveAffine> Bucket<C> {
            fn add_assign(&mut self, other: &C) {
                *self = match *self {
                    Bucket::None => Bucket::Affine(*other),
                    Bucket::Affine(a) => Bucket::Projective(a + *other),
                    Bucket::Projective(mut a) => {
                        a += *other;
                        Bucket::Projective(a)
                    }
                }
            }

            fn add(self, mut other: C::Curve) -> C::Curve {
                match self {
                    Bucket::None => other,
                    Bucket::Affine(a) => {
                        other += a;
                        other
                    }
                    Bucket::Projective(a) => other + &a,
                }
            }
        }

        let mut buckets: Vec<Bucket<C>> = vec![Bucket::None; (1 << c) - 1];

        for (coeff, base) in coeffs.iter().zip(bases.iter()) {
            let coeff = get_at::<C::Scalar>(current_segment, c, coeff);
            if coeff != 0 {
                buckets[coeff - 1].add_assign(base);
            }
        }

        // Summation by parts: buckets walked from the top with a running sum.
        let mut running_sum = C::Curve::identity();
        for exponent in buckets.into_iter().rev() {
            running_sum = exponent.add(running_sum);
            *acc += &running_sum;
        }
    }
}

/// Multi-scalar multiplication via the Pippenger bucket method, parallel
/// over scalar chunks.
pub fn variable_base_msm<C: CurveAffine>(scalars: &[C::Scalar], bases: &[C]) -> C::Curve {
    assert_eq!(scalars.len(), bases.len());
    if scalars.is_empty() {
        return C::Curve::identity();
    }

    let num_threads = num_threads();
    if scalars.len() < num_threads * 4 {
        let mut acc = C::Curve::identity();
        multiexp_serial(scalars, bases, &mut acc);
        return acc;
    }

    let chunk_size = (scalars.len() + num_threads - 1) / num_threads;
    let num_chunks = (scalars.len() + chunk_size - 1) / chunk_size;
    let mut partials = vec![C::Curve::identity(); num_chunks];
    parallelize_iter(
        scalars
            .chunks(chunk_size)
            .zip(bases.chunks(chunk_size))
            .zip(partials.iter_mut()),
        |((scalars, bases), acc)| multiexp_serial(scalars, bases, acc),
    );
    partials
        .iter()
        .fold(C::Curve::identity(), |acc, partial| acc + partial)
}
