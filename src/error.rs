#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to construct NotNan from f64: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f64),

    #[error("failed to convert joint variant to usize: {0:?}")]
    JointVariantToUsize(crate::landmarks::JointKind),

    #[error("failed to convert feature variant to usize: {0:?}")]
    FeatureVariantToUsize(crate::features::FeatureKind),

    #[error("failed to read landmark dump: {1:?}")]
    ReadLandmarkDump(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to parse landmark dump")]
    ParseLandmarkDump(#[source] serde_json::Error),

    #[error("expected {0} joints in frame {2}, got {1}")]
    JointCount(usize, usize, usize),

    #[error("need at least {0} frames, got {1}")]
    TooFewFrames(usize, usize),

    #[error("pose detected in {1} of {0} frames, need at least half")]
    TooFewDetections(usize, usize),

    #[error("cannot extract features from an empty landmark sequence")]
    EmptyLandmarkSequence,

    #[error("every frame in the landmark sequence is absent")]
    NoDetectedFrames,

    #[error("failed to read references directory: {1:?}")]
    ReadReferencesDir(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to read reference swing: {1:?}")]
    ReadReferenceSwing(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to parse reference swing: {1:?}")]
    ParseReferenceSwing(#[source] serde_json::Error, std::path::PathBuf),

    #[error("unknown feature name: {0}")]
    UnknownFeatureName(String),

    #[error("column {1} in reference swing {0:?} has {2} frames, expected {3}")]
    RaggedReferenceColumns(std::path::PathBuf, String, usize, usize),

    #[error("failed to read feature group config: {1:?}")]
    ReadGroupConfig(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to parse feature group config")]
    ParseGroupConfig(#[source] serde_json::Error),

    #[error("a comparison worker thread panicked")]
    JoinCompareWorkers,

    #[error("failed to serialize analysis report")]
    SerializeReport(#[source] serde_json::Error),
}
