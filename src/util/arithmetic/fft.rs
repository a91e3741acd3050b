//! In-place radix-2 FFT, after
//! https://github.com/privacy-scaling-explorations/halo2curves/blob/main/src/fft.rs.

use crate::util::{
    arithmetic::PrimeField,
    parallel::{join, num_threads, parallelize},
    start_timer,
};

pub fn radix2_fft<F: PrimeField>(a: &mut [F], omega: F, log2_n: usize) {
    let _timer = start_timer(|| "fft");

    fn bitreverse(mut n: usize, l: usize) -> usize {
        let mut r = 0;
        for _ in 0..l {
            r = (r << 1) | (n & 1);
            n >>= 1;
        }
        r
    }

    let log_num_threads = num_threads().ilog2() as usize;
    let n = a.len();
    assert_eq!(n, 1 << log2_n);

    for k in 0..n {
        let rk = bitreverse(k, log2_n);
        if k < rk {
            a.swap(rk, k);
        }
    }

    let twiddles: Vec<_> = (0..(n / 2))
        .scan(F::ONE, |w, _| {
            let tw = *w;
            *w *= &omega;
            Some(tw)
        })
        .collect();

    if log2_n <= log_num_threads {
        let mut chunk = 2;
        let mut twiddle_chunk = n / 2;
        for _ in 0..log2_n {
            a.chunks_mut(chunk).for_each(|coeffs| {
                let (left, right) = coeffs.split_at_mut(chunk / 2);

                let (a, left) = left.split_at_mut(1);
                let (b, right) = right.split_at_mut(1);
                let t = b[0];
                b[0] = a[0];
                a[0] += &t;
                b[0] -= &t;

                left.iter_mut()
                    .zip(right.iter_mut())
                    .enumerate()
                    .for_each(|(i, (a, b))| {
                        let mut t = *b;
                        t *= &twiddles[(i + 1) * twiddle_chunk];
                        *b = *a;
                        *a += &t;
                        *b -= &t;
                    });
            });
            chunk *= 2;
            twiddle_chunk /= 2;
        }
    } else {
        recursive_butterfly_arithmetic(a, n, 1, &twiddles)
    }
}

/// Inverse FFT: forward transform with the inverse root, scaled by `1/n`.
pub fn radix2_ifft<F: PrimeField>(a: &mut [F], omega_inv: F, log2_n: usize) {
    radix2_fft(a, omega_inv, log2_n);
    let n_inv = F::from(a.len() as u64).invert().unwrap();
    parallelize(a, |(chunk, _)| {
        for value in chunk.iter_mut() {
            *value *= &n_inv;
        }
    });
}

fn recursive_butterfly_arithmetic<F: PrimeField>(
    a: &mut [F],
    n: usize,
    twiddle_chunk: usize,
    twiddles: &[F],
) {
    if n == 2 {
        let t = a[1];
        a[1] = a[0];
        a[0] += &t;
        a[1] -= &t;
    } else {
        let (left, right) = a.split_at_mut(n / 2);
        join(
            || recursive_butterfly_arithmetic(left, n / 2, twiddle_chunk * 2, twiddles),
            || recursive_butterfly_arithmetic(right, n / 2, twiddle_chunk * 2, twiddles),
        );

        let (a, left) = left.split_at_mut(1);
        let (b, right) = right.split_at_mut(1);
        let t = b[0];
        b[0] = a[0];
        a[0] += &t;
        b[0] -= &t;

        left.iter_mut()
            .zip(right.iter_mut())
            .enumerate()
            .for_each(|(i, (a, b))| {
                let mut t = *b;
                t *= &twiddles[(i + 1) * twiddle_chunk];
                *b = *a;
                *a += &t;
                *b -= &t;
            });
    }
}
