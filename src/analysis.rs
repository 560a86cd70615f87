//! The analysis pipeline.
//!
//! Wires the stages together for one swing: feature extraction, phase
//! segmentation, multi-reference comparison, similarity scoring, and
//! feedback generation, assembled into a single serializable report.

use crate::{
    compare::{self, FeatureGroups},
    error::Error,
    features,
    feedback::{self, CoachingTip},
    landmarks::{self, JointRecord, LandmarkFrame},
    library::ReferenceLibrary,
    phases::{self, PhaseBoundaries},
    score,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PlayerSimilarity {
    pub(crate) player: String,
    pub(crate) overall_similarity: f64,
    pub(crate) body_groups: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalysisReport {
    pub(crate) most_similar_player: Option<String>,
    /// Ranked by overall similarity, best first; name breaks ties.
    pub(crate) similarities: Vec<PlayerSimilarity>,
    pub(crate) phases: PhaseBoundaries,
    pub(crate) coaching: Vec<CoachingTip>,
    /// Raw detector frames for downstream skeleton drawing; passed through
    /// untouched when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) landmarks: Option<Vec<Option<Vec<JointRecord>>>>,
}

impl AnalysisReport {
    pub(crate) fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(Error::SerializeReport)
    }
}

pub(crate) struct Analyzer {
    library: ReferenceLibrary,
    taxonomy: FeatureGroups,
    workers: usize,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl Analyzer {
    pub(crate) fn new(library: ReferenceLibrary, taxonomy: FeatureGroups, workers: usize) -> Self {
        Self {
            library,
            taxonomy,
            workers,
        }
    }

    /// Run the full pipeline on a validated landmark sequence.
    pub(crate) fn analyze(
        &self,
        frames: &[LandmarkFrame],
        include_landmarks: bool,
    ) -> Result<AnalysisReport, Error> {
        let user = features::extract_sequence(frames)?;
        debug!(message = "extracted feature table", frames = user.len());

        let phase_boundaries = phases::detect_phases(&user);

        let comparison = compare::compare(&user, &self.library, &self.taxonomy, self.workers)?;

        // Players whose overall distance never resolved drop out of the
        // ranking entirely; one competitor's bad data never fails the request.
        let overall_distances: BTreeMap<String, f64> = comparison
            .iter()
            .filter(|(_, distances)| distances.overall.is_finite())
            .map(|(player, distances)| (player.clone(), distances.overall))
            .collect();
        let overall_similarity = score::scores(&overall_distances);

        // Group batches span every compared player, not just the ranked
        // ones; a player covering only some groups still competes inside
        // each batch, with their empty groups carrying the +infinity that
        // the scorer floors to 0.
        let mut group_similarity: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for group in self.taxonomy.iter() {
            let batch: BTreeMap<String, f64> = comparison
                .iter()
                .filter_map(|(player, distances)| {
                    distances
                        .groups
                        .get(&group.name)
                        .map(|g| (player.clone(), g.distance))
                })
                .collect();
            group_similarity.insert(group.name.clone(), score::scores(&batch));
        }

        let coaching = feedback::generate(&self.taxonomy, &comparison, &overall_similarity, &user);

        let mut similarities: Vec<PlayerSimilarity> = overall_similarity
            .iter()
            .map(|(player, &similarity)| PlayerSimilarity {
                player: player.clone(),
                overall_similarity: round1(similarity),
                body_groups: group_similarity
                    .iter()
                    .filter_map(|(group, scores)| {
                        scores.get(player).map(|&s| (group.clone(), round1(s)))
                    })
                    .collect(),
            })
            .collect();
        similarities.sort_by(|a, b| {
            b.overall_similarity
                .partial_cmp(&a.overall_similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.player.cmp(&b.player))
        });

        let most_similar_player =
            feedback::best_player(&overall_similarity).map(|player| player.to_string());

        info!(
            message = "analysis complete",
            players = similarities.len(),
            tips = coaching.len(),
        );

        Ok(AnalysisReport {
            most_similar_player,
            similarities,
            phases: phase_boundaries,
            coaching,
            landmarks: include_landmarks.then(|| landmarks::to_records(frames)),
        })
    }
}
