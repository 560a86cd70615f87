//! Swing phase segmentation.
//!
//! Splits a swing into preparation, forward swing, contact, follow-through
//! and recovery using the racket-hand-height velocity as a swing-speed
//! proxy. Falls back to a quartile split when the proxy column is missing.

use crate::features::{smoothing, Channel, FeatureKind, FeatureSequence};
use serde::Serialize;

/// Velocity column used as the swing-speed proxy.
const SWING_PROXY: FeatureKind = FeatureKind::RightWristHeight;

/// Fraction of the peak proxy speed that counts as "actively swinging".
const ACTIVE_FRACTION: f64 = 0.3;

/// Frame indices of the five swing phases. Adjacent phases share their
/// boundary frame; indices never decrease across the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct PhaseBoundaries {
    pub(crate) preparation: (usize, usize),
    pub(crate) forward_swing: (usize, usize),
    pub(crate) contact: usize,
    pub(crate) follow_through: (usize, usize),
    pub(crate) recovery: (usize, usize),
}

pub(crate) fn detect_phases(sequence: &FeatureSequence) -> PhaseBoundaries {
    let n = sequence.len();

    let signal = match sequence.column(SWING_PROXY, Channel::Velocity) {
        Some(column) => column.to_owned(),
        None => return default_phases(n),
    };
    let signal = smoothing::savgol(signal.view()).unwrap_or(signal);

    let mut contact = 0;
    let mut peak = f64::NEG_INFINITY;
    for (i, value) in signal.iter().map(|v| v.abs()).enumerate() {
        if value > peak {
            peak = value;
            contact = i;
        }
    }

    let threshold = ACTIVE_FRACTION * peak;
    let mut active = signal
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() > threshold)
        .map(|(i, _)| i);

    let (swing_start, swing_end) = match active.next() {
        // The active set need not be contiguous; only its extremes matter.
        Some(first) => (first, active.last().unwrap_or(first).min(n - 1)),
        None => (0, n - 1),
    };

    let contact = contact.max(swing_start).min(swing_end);

    PhaseBoundaries {
        preparation: (0, swing_start),
        forward_swing: (swing_start, contact),
        contact,
        follow_through: (contact, swing_end),
        recovery: (swing_end, n - 1),
    }
}

/// Quartile split used when the proxy signal is unavailable.
fn default_phases(n: usize) -> PhaseBoundaries {
    let (q1, q2, q3) = (n / 4, n / 2, 3 * n / 4);
    PhaseBoundaries {
        preparation: (0, q1),
        forward_swing: (q1, q2),
        contact: q2,
        follow_through: (q2, q3),
        recovery: (q3, n - 1),
    }
}
