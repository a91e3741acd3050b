//! Quotient evaluation for the fixed R1CS→QAP instance.
//!
//! The constraint rows are accumulated in parallel under striped locks,
//! then each of A, B, C is moved to a multiplicative coset of the
//! evaluation domain (inverse FFT, shift by powers of the `2n`-th root of
//! unity, forward FFT) where `A*B - C` gives the quotient values directly.

use crate::{
    backend::ultragroth::key::Coef,
    util::{
        arithmetic::{
            fft::{radix2_fft, radix2_ifft},
            root_of_unity, root_of_unity_inv, Field,
        },
        parallel::{num_threads, parallelize, parallelize_iter},
        start_timer,
    },
    Error,
};
use halo2_curves::bn256::Fr;
use std::cell::UnsafeCell;
use std::sync::Mutex;

const LOCK_STRIPES: usize = 1024;

/// Rows shared across the accumulation workers. Every write to row `i`
/// happens under the lock stripe owning `i`.
struct SharedRows<'a>(&'a [UnsafeCell<Fr>]);

unsafe impl Sync for SharedRows<'_> {}

pub struct QapEvaluator {
    domain_size: usize,
    log2_domain: usize,
    locks: Vec<Mutex<()>>,
}

impl QapEvaluator {
    pub fn new(domain_size: usize) -> Self {
        assert!(domain_size.is_power_of_two());
        let stripes = LOCK_STRIPES.min(domain_size);
        Self {
            domain_size,
            log2_domain: domain_size.trailing_zeros() as usize,
            locks: (0..stripes).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Evaluates the quotient `(A*B - C) / Z` over the coset, returned as
    /// `domain_size` values matching the `pointsH` basis of the key.
    pub fn quotient(&self, witness: &[Fr], coefs: &[Coef]) -> Result<Vec<Fr>, Error> {
        let _timer = start_timer(|| "qap quotient");
        let n = self.domain_size;

        // a corrupted key is fatal before any worker touches the rows
        for coef in coefs {
            if coef.row as usize >= n {
                return Err(Error::InvalidKey(format!(
                    "coefficient row {} outside the domain of size {n}",
                    coef.row
                )));
            }
            if coef.signal as usize >= witness.len() {
                return Err(Error::InvalidKey(format!(
                    "coefficient signal {} out of range for {} witness values",
                    coef.signal,
                    witness.len()
                )));
            }
        }

        let a_cells: Vec<UnsafeCell<Fr>> = (0..n).map(|_| UnsafeCell::new(Fr::ZERO)).collect();
        let b_cells: Vec<UnsafeCell<Fr>> = (0..n).map(|_| UnsafeCell::new(Fr::ZERO)).collect();
        {
            let a_rows = SharedRows(&a_cells);
            let b_rows = SharedRows(&b_cells);
            let chunk_size = (coefs.len() + num_threads() - 1) / num_threads();
            if chunk_size > 0 {
                parallelize_iter(coefs.chunks(chunk_size), |coefs| {
                    for coef in coefs {
                        let rows = if coef.matrix == 0 { &a_rows } else { &b_rows };
                        let term = witness[coef.signal as usize] * coef.value;
                        let row = coef.row as usize;
                        let _guard = self.locks[row % self.locks.len()].lock().unwrap();
                        unsafe { *rows.0[row].get() += term };
                    }
                });
            }
        }
        let mut a: Vec<Fr> = a_cells.into_iter().map(UnsafeCell::into_inner).collect();
        let mut b: Vec<Fr> = b_cells.into_iter().map(UnsafeCell::into_inner).collect();

        let mut c = vec![Fr::ZERO; n];
        parallelize(&mut c, |(chunk, start)| {
            for (i, value) in chunk.iter_mut().enumerate() {
                *value = a[start + i] * b[start + i];
            }
        });

        let omega = root_of_unity::<Fr>(self.log2_domain);
        let omega_inv = root_of_unity_inv::<Fr>(self.log2_domain);
        // coset shift by powers of the 2n-th root of unity
        let shift = root_of_unity::<Fr>(self.log2_domain + 1);
        let mut shift_powers = vec![Fr::ZERO; n];
        parallelize(&mut shift_powers, |(chunk, start)| {
            let mut power = shift.pow_vartime([start as u64]);
            for value in chunk.iter_mut() {
                *value = power;
                power *= &shift;
            }
        });

        for values in [&mut a, &mut b, &mut c] {
            radix2_ifft(values, omega_inv, self.log2_domain);
            parallelize(values, |(chunk, start)| {
                for (i, value) in chunk.iter_mut().enumerate() {
                    *value *= &shift_powers[start + i];
                }
            });
            radix2_fft(values, omega, self.log2_domain);
        }

        let mut quotient = a;
        parallelize(&mut quotient, |(chunk, start)| {
            for (i, value) in chunk.iter_mut().enumerate() {
                *value = *value * b[start + i] - c[start + i];
            }
        });
        Ok(quotient)
    }
}
