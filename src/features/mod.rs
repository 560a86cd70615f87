//! Biomechanical feature extraction.
//!
//! Turns detector joints into the named scalar features the rest of the
//! pipeline consumes: joint angles, torso rotation, stance/arm geometry, and
//! body lean, plus velocity and acceleration channels over a full swing.

use crate::{
    error::Error,
    landmarks::{JointKind, LandmarkFrame},
    point::Point,
};
use ndarray::{Array1, ArrayView1};
use num_traits::ToPrimitive;
use std::collections::BTreeMap;

pub(crate) mod smoothing;

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
)]
pub(crate) enum FeatureKind {
    RightElbowAngle,
    LeftElbowAngle,
    RightShoulderAngle,
    LeftShoulderAngle,
    RightKneeAngle,
    LeftKneeAngle,
    RightHipAngle,
    LeftHipAngle,
    TorsoRotation,
    StanceWidth,
    ShoulderWidth,
    RightWristHeight,
    LeftWristHeight,
    WristSeparation,
    BodyLean,
    ForwardLean,
    RightArmExtension,
    LeftArmExtension,
}

pub(crate) const NUM_FEATURES: usize = 18;

pub(crate) const ALL_FEATURES: [FeatureKind; NUM_FEATURES] = [
    FeatureKind::RightElbowAngle,
    FeatureKind::LeftElbowAngle,
    FeatureKind::RightShoulderAngle,
    FeatureKind::LeftShoulderAngle,
    FeatureKind::RightKneeAngle,
    FeatureKind::LeftKneeAngle,
    FeatureKind::RightHipAngle,
    FeatureKind::LeftHipAngle,
    FeatureKind::TorsoRotation,
    FeatureKind::StanceWidth,
    FeatureKind::ShoulderWidth,
    FeatureKind::RightWristHeight,
    FeatureKind::LeftWristHeight,
    FeatureKind::WristSeparation,
    FeatureKind::BodyLean,
    FeatureKind::ForwardLean,
    FeatureKind::RightArmExtension,
    FeatureKind::LeftArmExtension,
];

impl FeatureKind {
    pub(crate) fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::FeatureVariantToUsize(self))
    }

    /// Stable column name, shared with reference swing files and group
    /// configuration.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::RightElbowAngle => "r_elbow_angle",
            Self::LeftElbowAngle => "l_elbow_angle",
            Self::RightShoulderAngle => "r_shoulder_angle",
            Self::LeftShoulderAngle => "l_shoulder_angle",
            Self::RightKneeAngle => "r_knee_angle",
            Self::LeftKneeAngle => "l_knee_angle",
            Self::RightHipAngle => "r_hip_angle",
            Self::LeftHipAngle => "l_hip_angle",
            Self::TorsoRotation => "torso_rotation",
            Self::StanceWidth => "stance_width",
            Self::ShoulderWidth => "shoulder_width",
            Self::RightWristHeight => "r_wrist_height",
            Self::LeftWristHeight => "l_wrist_height",
            Self::WristSeparation => "wrist_separation",
            Self::BodyLean => "body_lean",
            Self::ForwardLean => "forward_lean",
            Self::RightArmExtension => "r_arm_extension",
            Self::LeftArmExtension => "l_arm_extension",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        ALL_FEATURES.iter().copied().find(|f| f.name() == name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Channel {
    Position,
    Velocity,
    Acceleration,
}

/// One frame's feature values, indexed by `FeatureKind::idx`. `None` when the
/// source frame had no detected body.
pub(crate) type FeatureFrame = Option<[f64; NUM_FEATURES]>;

const ANGLE_EPSILON: f64 = 1e-8;

/// Angle in degrees at vertex `b` between rays b->a and b->c. The epsilon in
/// the denominator and the clamp keep `acos` inside its domain under
/// floating-point drift, so the result is always finite and in [0, 180].
fn angle_deg(a: Point, b: Point, c: Point) -> f64 {
    let ba = a - b;
    let bc = c - b;
    let cos = ba.dot(bc) / (ba.norm() * bc.norm() + ANGLE_EPSILON);
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed difference in degrees between the image-plane orientations of the
/// shoulder line and the hip line. Deliberately left unwrapped, so extreme
/// poses can exceed +/-180.
fn torso_rotation(
    l_shoulder: Point,
    r_shoulder: Point,
    l_hip: Point,
    r_hip: Point,
) -> f64 {
    let shoulder = r_shoulder - l_shoulder;
    let hip = r_hip - l_hip;
    (shoulder.y().atan2(shoulder.x()) - hip.y().atan2(hip.x())).to_degrees()
}

/// Extract the feature catalogue from one frame. An absent frame yields an
/// absent feature row.
pub(crate) fn extract_frame(frame: &LandmarkFrame) -> Result<FeatureFrame, Error> {
    use JointKind::*;

    let joints = match frame {
        Some(joints) => joints,
        None => return Ok(None),
    };

    let at = |kind: JointKind| -> Result<Point, Error> { Ok(joints[kind.idx()?].point) };

    let l_shoulder = at(LeftShoulder)?;
    let r_shoulder = at(RightShoulder)?;
    let l_elbow = at(LeftElbow)?;
    let r_elbow = at(RightElbow)?;
    let l_wrist = at(LeftWrist)?;
    let r_wrist = at(RightWrist)?;
    let l_hip = at(LeftHip)?;
    let r_hip = at(RightHip)?;
    let l_knee = at(LeftKnee)?;
    let r_knee = at(RightKnee)?;
    let l_ankle = at(LeftAnkle)?;
    let r_ankle = at(RightAnkle)?;

    let shoulder_center = l_shoulder.midpoint(r_shoulder);
    let hip_center = l_hip.midpoint(r_hip);

    let mut values = [0.0; NUM_FEATURES];
    values[FeatureKind::RightElbowAngle.idx()?] = angle_deg(r_shoulder, r_elbow, r_wrist);
    values[FeatureKind::LeftElbowAngle.idx()?] = angle_deg(l_shoulder, l_elbow, l_wrist);
    values[FeatureKind::RightShoulderAngle.idx()?] = angle_deg(r_hip, r_shoulder, r_elbow);
    values[FeatureKind::LeftShoulderAngle.idx()?] = angle_deg(l_hip, l_shoulder, l_elbow);
    values[FeatureKind::RightKneeAngle.idx()?] = angle_deg(r_hip, r_knee, r_ankle);
    values[FeatureKind::LeftKneeAngle.idx()?] = angle_deg(l_hip, l_knee, l_ankle);
    values[FeatureKind::RightHipAngle.idx()?] = angle_deg(r_shoulder, r_hip, r_knee);
    values[FeatureKind::LeftHipAngle.idx()?] = angle_deg(l_shoulder, l_hip, l_knee);
    values[FeatureKind::TorsoRotation.idx()?] =
        torso_rotation(l_shoulder, r_shoulder, l_hip, r_hip);
    values[FeatureKind::StanceWidth.idx()?] = (r_ankle - l_ankle).norm_xy();
    values[FeatureKind::ShoulderWidth.idx()?] = (r_shoulder - l_shoulder).norm_xy();
    values[FeatureKind::RightWristHeight.idx()?] = r_shoulder.y() - r_wrist.y();
    values[FeatureKind::LeftWristHeight.idx()?] = l_shoulder.y() - l_wrist.y();
    values[FeatureKind::WristSeparation.idx()?] = (r_wrist - l_wrist).norm_xy();
    values[FeatureKind::BodyLean.idx()?] = shoulder_center.x() - hip_center.x();
    values[FeatureKind::ForwardLean.idx()?] = shoulder_center.y() - hip_center.y();
    values[FeatureKind::RightArmExtension.idx()?] = (r_wrist - r_shoulder).norm();
    values[FeatureKind::LeftArmExtension.idx()?] = (l_wrist - l_shoulder).norm();

    Ok(Some(values))
}

/// Immutable feature table for one swing: one column per (feature, channel)
/// pair, every column the same length.
#[derive(Debug, Clone)]
pub(crate) struct FeatureSequence {
    len: usize,
    columns: BTreeMap<(FeatureKind, Channel), Array1<f64>>,
}

impl FeatureSequence {
    /// Build a position-only table from named columns, e.g. a stored
    /// reference swing.
    pub(crate) fn from_position_columns(columns: BTreeMap<FeatureKind, Array1<f64>>) -> Self {
        let len = columns.values().map(|c| c.len()).next().unwrap_or(0);
        Self {
            len,
            columns: columns
                .into_iter()
                .map(|(feature, column)| ((feature, Channel::Position), column))
                .collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn column(
        &self,
        feature: FeatureKind,
        channel: Channel,
    ) -> Option<ArrayView1<'_, f64>> {
        self.columns.get(&(feature, channel)).map(|c| c.view())
    }

    #[cfg(test)]
    pub(crate) fn from_channel_columns(
        len: usize,
        columns: BTreeMap<(FeatureKind, Channel), Array1<f64>>,
    ) -> Self {
        Self { len, columns }
    }
}

/// First difference with the first element pinned to zero.
fn diff(column: &Array1<f64>) -> Array1<f64> {
    let mut out = Array1::zeros(column.len());
    for i in 1..column.len() {
        out[i] = column[i] - column[i - 1];
    }
    out
}

/// Extract the full feature table for a swing: per-frame features, gaps
/// filled forward then backward, columns smoothed where the filter applies,
/// and velocity/acceleration channels appended.
pub(crate) fn extract_sequence(frames: &[LandmarkFrame]) -> Result<FeatureSequence, Error> {
    if frames.is_empty() {
        return Err(Error::EmptyLandmarkSequence);
    }

    let rows = frames
        .iter()
        .map(extract_frame)
        .collect::<Result<Vec<_>, _>>()?;
    if rows.iter().all(|row| row.is_none()) {
        return Err(Error::NoDetectedFrames);
    }

    let n = rows.len();
    let mut columns = BTreeMap::new();

    for feature in ALL_FEATURES.iter().copied() {
        let idx = feature.idx()?;

        // Forward-fill frames where detection failed, then backward-fill any
        // leading gap from the first detection.
        let mut values = Array1::zeros(n);
        let mut last = None;
        for (i, row) in rows.iter().enumerate() {
            if let Some(row) = row {
                last = Some(row[idx]);
            }
            if let Some(value) = last {
                values[i] = value;
            }
        }
        if let Some(first) = rows.iter().flatten().next() {
            for (i, row) in rows.iter().enumerate() {
                if row.is_some() {
                    break;
                }
                values[i] = first[idx];
            }
        }

        if let Some(smoothed) = smoothing::savgol(values.view()) {
            values = smoothed;
        }

        let velocity = diff(&values);
        let acceleration = diff(&velocity);
        columns.insert((feature, Channel::Position), values);
        columns.insert((feature, Channel::Velocity), velocity);
        columns.insert((feature, Channel::Acceleration), acceleration);
    }

    Ok(FeatureSequence { len: n, columns })
}
