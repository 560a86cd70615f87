//! Z-score normalization and dynamic time warping distance.

use ndarray::{Array1, ArrayView1};

/// Standard deviations below this are treated as zero variance.
const VARIANCE_EPSILON: f64 = 1e-8;

/// Z-score normalize a signal. Zero-variance signals are only mean-centered
/// so the division can never blow up.
pub(crate) fn z_normalize(signal: ArrayView1<'_, f64>) -> Array1<f64> {
    if signal.is_empty() {
        return Array1::zeros(0);
    }

    let n = signal.len() as f64;
    let mean = signal.sum() / n;
    let variance = signal.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = variance.sqrt();

    if std < VARIANCE_EPSILON {
        signal.mapv(|v| v - mean)
    } else {
        signal.mapv(|v| (v - mean) / std)
    }
}

/// Optimal dynamic-time-warping distance between two 1-D signals: squared
/// pointwise cost accumulated along a monotonic warping path of diagonal,
/// horizontal and vertical steps, square root of the optimal total.
///
/// Exact (no pruning); clips here are a few hundred frames, so the full
/// quadratic table is cheap enough.
pub(crate) fn distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }

    let m = b.len();
    // Two rolling rows over the (len(a)+1) x (len(b)+1) accumulated-cost table.
    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for &x in a.iter() {
        curr[0] = f64::INFINITY;
        for (j, &y) in b.iter().enumerate() {
            let cost = (x - y) * (x - y);
            curr[j + 1] = cost + prev[j].min(prev[j + 1]).min(curr[j]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m].sqrt()
}
