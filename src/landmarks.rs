use crate::{error::Error, point::Point};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive,
)]
pub(crate) enum JointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointKind {
    pub(crate) fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::JointVariantToUsize(self))
    }
}

pub(crate) const NUM_JOINTS: usize = 17;

#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Joint {
    pub(crate) point: Point,
    pub(crate) visibility: f64,
}

pub(crate) type Joints = [Joint; NUM_JOINTS];

/// One frame of detector output: a full set of joints, or nothing when the
/// detector found no body in the frame.
pub(crate) type LandmarkFrame = Option<Joints>;

/// Minimum frame count the caller must supply before analysis.
pub(crate) const MIN_FRAMES: usize = 10;

/// Raw per-joint record as emitted by the upstream detector dump.
#[derive(Debug, Copy, Clone, Deserialize, Serialize)]
pub(crate) struct JointRecord {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) z: f64,
    pub(crate) visibility: f64,
}

/// Parse a detector dump: a JSON array with one entry per frame, each entry
/// either `null` or an array of exactly [`NUM_JOINTS`] joint records.
pub(crate) fn parse_dump(contents: &str) -> Result<Vec<LandmarkFrame>, Error> {
    let raw: Vec<Option<Vec<JointRecord>>> =
        serde_json::from_str(contents).map_err(Error::ParseLandmarkDump)?;

    raw.into_iter()
        .enumerate()
        .map(|(frame_idx, frame)| {
            frame
                .map(|records| {
                    if records.len() != NUM_JOINTS {
                        return Err(Error::JointCount(NUM_JOINTS, records.len(), frame_idx));
                    }
                    let mut joints = [Joint::default(); NUM_JOINTS];
                    for (joint, record) in joints.iter_mut().zip(records) {
                        *joint = Joint {
                            point: Point::new(record.x, record.y, record.z)?,
                            visibility: record.visibility,
                        };
                    }
                    Ok(joints)
                })
                .transpose()
        })
        .collect()
}

pub(crate) fn read_dump(path: &Path) -> Result<Vec<LandmarkFrame>, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::ReadLandmarkDump(e, path.to_path_buf()))?;
    parse_dump(&contents)
}

/// Enforce the input contract: at least [`MIN_FRAMES`] frames, and a body
/// detected in at least half of them. The analysis pipeline assumes both.
pub(crate) fn validate(frames: &[LandmarkFrame]) -> Result<(), Error> {
    if frames.len() < MIN_FRAMES {
        return Err(Error::TooFewFrames(MIN_FRAMES, frames.len()));
    }

    let detected = frames.iter().filter(|frame| frame.is_some()).count();
    if detected * 2 < frames.len() {
        return Err(Error::TooFewDetections(frames.len(), detected));
    }

    Ok(())
}

/// Re-encode frames for pass-through in the analysis report.
pub(crate) fn to_records(frames: &[LandmarkFrame]) -> Vec<Option<Vec<JointRecord>>> {
    frames
        .iter()
        .map(|frame| {
            frame.map(|joints| {
                joints
                    .iter()
                    .map(|joint| JointRecord {
                        x: joint.point.x(),
                        y: joint.point.y(),
                        z: joint.point.z(),
                        visibility: joint.visibility,
                    })
                    .collect()
            })
        })
        .collect()
}
