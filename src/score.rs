//! Relative similarity scoring.
//!
//! Distances from one comparison batch are rescaled into 0-100 similarity
//! scores: negative-exponential transform around the batch median, then a
//! min-max rescale. Scores from different batches are not comparable.

use std::collections::BTreeMap;

const DEGENERATE_EPSILON: f64 = 1e-8;

/// Score every batch member in [0, 100]; smaller distance scores higher. A
/// degenerate batch (one member, or all distances equal) scores 50 across
/// the board.
pub(crate) fn scores(distances: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    if distances.is_empty() {
        return BTreeMap::new();
    }

    let batch_median = median(&distances.values().copied().collect::<Vec<_>>());
    let transformed: Vec<f64> = distances
        .values()
        .map(|&d| {
            if d.is_finite() {
                (-d / (batch_median + DEGENERATE_EPSILON)).exp()
            } else {
                // An empty group carries +infinity; it transforms to the
                // floor of the batch instead of poisoning it with NaN.
                0.0
            }
        })
        .collect();

    let lo = transformed.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = transformed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let rescale: Box<dyn Fn(f64) -> f64> = if hi - lo > DEGENERATE_EPSILON {
        Box::new(move |t| (t - lo) / (hi - lo) * 100.0)
    } else {
        Box::new(|_| 50.0)
    };

    distances
        .keys()
        .cloned()
        .zip(transformed.into_iter().map(rescale))
        .collect()
}

/// Median with the even-length average convention.
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn batch(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs
            .iter()
            .map(|(name, d)| (name.to_string(), *d))
            .collect()
    }

    mod median_tests {
        use super::*;

        #[test]
        fn odd_length() {
            assert_approx_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        }

        #[test]
        fn even_length_averages() {
            assert_approx_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        }
    }

    mod scores_tests {
        use super::*;

        #[test]
        fn empty_batch() {
            assert!(scores(&BTreeMap::new()).is_empty());
        }

        #[test]
        fn single_member_scores_fifty() {
            let result = scores(&batch(&[("Aho", 0.0)]));
            assert_approx_eq!(result["Aho"], 50.0);
        }

        #[test]
        fn equal_distances_score_fifty() {
            let result = scores(&batch(&[("Aho", 2.5), ("Benes", 2.5)]));
            assert_approx_eq!(result["Aho"], 50.0);
            assert_approx_eq!(result["Benes"], 50.0);
        }

        #[test]
        fn two_distinct_distances_hit_the_extremes() {
            let result = scores(&batch(&[("Close", 1.0), ("Far", 9.0)]));
            assert_approx_eq!(result["Close"], 100.0);
            assert_approx_eq!(result["Far"], 0.0);
        }

        #[test]
        fn scores_stay_bounded_and_ordered() {
            let result = scores(&batch(&[
                ("A", 0.5),
                ("B", 2.0),
                ("C", 4.0),
                ("D", 11.0),
            ]));
            for &score in result.values() {
                assert!((0.0..=100.0).contains(&score));
            }
            assert!(result["A"] > result["B"]);
            assert!(result["B"] > result["C"]);
            assert!(result["C"] > result["D"]);
        }

        #[test]
        fn infinite_distance_scores_zero() {
            let result = scores(&batch(&[("Good", 1.0), ("Bad", f64::INFINITY)]));
            assert_approx_eq!(result["Bad"], 0.0);
            assert_approx_eq!(result["Good"], 100.0);
        }
    }
}
