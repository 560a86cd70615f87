//! Savitzky-Golay smoothing for feature columns.
//!
//! Window length 11, polynomial order 3, with polynomial-interpolation edge
//! handling: interior samples come from a centered fit, the first and last
//! half-windows from a fit to the first/last full window.

use ndarray::{Array1, ArrayView1};

pub(crate) const WINDOW: usize = 11;
pub(crate) const ORDER: usize = 3;
const HALF: usize = WINDOW / 2;
const NCOEFFS: usize = ORDER + 1;

/// Least-squares fit of an [`ORDER`]-degree polynomial to `window`, sampled
/// at t = 0, 1, .., window.len()-1. Coefficients lowest power first. `None`
/// when the normal equations are too ill-conditioned to solve.
fn polyfit(window: ArrayView1<'_, f64>) -> Option<[f64; NCOEFFS]> {
    let mut normal = [[0.0; NCOEFFS + 1]; NCOEFFS];

    for (i, &y) in window.iter().enumerate() {
        let t = i as f64;
        let mut powers = [1.0; 2 * NCOEFFS - 1];
        for p in 1..powers.len() {
            powers[p] = powers[p - 1] * t;
        }
        for row in 0..NCOEFFS {
            for col in 0..NCOEFFS {
                normal[row][col] += powers[row + col];
            }
            normal[row][NCOEFFS] += powers[row] * y;
        }
    }

    solve(&mut normal)
}

/// Gaussian elimination with partial pivoting on an augmented
/// [`NCOEFFS`] x ([`NCOEFFS`]+1) system.
fn solve(system: &mut [[f64; NCOEFFS + 1]; NCOEFFS]) -> Option<[f64; NCOEFFS]> {
    for col in 0..NCOEFFS {
        let pivot_row = (col..NCOEFFS)
            .max_by(|&a, &b| {
                system[a][col]
                    .abs()
                    .partial_cmp(&system[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
        if system[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        system.swap(col, pivot_row);

        for row in col + 1..NCOEFFS {
            let factor = system[row][col] / system[col][col];
            for k in col..=NCOEFFS {
                system[row][k] -= factor * system[col][k];
            }
        }
    }

    let mut coeffs = [0.0; NCOEFFS];
    for row in (0..NCOEFFS).rev() {
        let mut sum = system[row][NCOEFFS];
        for col in row + 1..NCOEFFS {
            sum -= system[row][col] * coeffs[col];
        }
        coeffs[row] = sum / system[row][row];
    }
    Some(coeffs)
}

fn eval(coeffs: &[f64; NCOEFFS], t: f64) -> f64 {
    coeffs
        .iter()
        .rev()
        .fold(0.0, |acc, &coeff| acc * t + coeff)
}

/// Smooth a column. `None` when the column has too few samples (needs more
/// than [`WINDOW`]) or a fit is ill-conditioned; the caller keeps the column
/// unsmoothed in that case.
pub(crate) fn savgol(signal: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
    let n = signal.len();
    if n <= WINDOW {
        return None;
    }

    let mut out = Array1::zeros(n);

    let head = polyfit(signal.slice(ndarray::s![..WINDOW]))?;
    for i in 0..HALF {
        out[i] = eval(&head, i as f64);
    }

    for i in HALF..n - HALF {
        let window = signal.slice(ndarray::s![i - HALF..=i + HALF]);
        let coeffs = polyfit(window)?;
        out[i] = eval(&coeffs, HALF as f64);
    }

    let tail = polyfit(signal.slice(ndarray::s![n - WINDOW..]))?;
    for i in n - HALF..n {
        out[i] = eval(&tail, (i - (n - WINDOW)) as f64);
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::Array1;

    mod savgol_tests {
        use super::*;

        #[test]
        fn short_column_is_skipped() {
            let signal = Array1::from_elem(WINDOW, 1.0);
            assert!(savgol(signal.view()).is_none());
        }

        #[test]
        fn cubic_is_reproduced_exactly() {
            // An order-3 filter passes cubics through unchanged, edges included.
            let signal = Array1::from_iter((0..30).map(|i| {
                let t = i as f64;
                0.5 * t * t * t - 2.0 * t * t + 3.0 * t - 7.0
            }));
            let smoothed = savgol(signal.view()).unwrap();
            for (raw, out) in signal.iter().zip(smoothed.iter()) {
                assert_approx_eq!(raw, out, 1e-3);
            }
        }

        #[test]
        fn constant_is_unchanged() {
            let signal = Array1::from_elem(25, 4.25);
            let smoothed = savgol(signal.view()).unwrap();
            for &v in smoothed.iter() {
                assert_approx_eq!(v, 4.25, 1e-9);
            }
        }

        #[test]
        fn noise_is_attenuated() {
            let signal = Array1::from_iter(
                (0..40).map(|i| (i as f64 / 5.0).sin() + if i % 2 == 0 { 0.2 } else { -0.2 }),
            );
            let smoothed = savgol(signal.view()).unwrap();
            let clean = Array1::from_iter((0..40).map(|i| (i as f64 / 5.0).sin()));
            let err = |a: &Array1<f64>| {
                a.iter()
                    .zip(clean.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
            };
            assert!(err(&smoothed) < err(&signal));
        }
    }
}
