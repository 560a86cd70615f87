//! Multi-reference swing comparison.
//!
//! For every player with stored reference swings, computes a DTW distance
//! per feature (best match across that player's references), averages into
//! per-group and overall distances. The per-feature computations are
//! independent, so they fan out across a bounded pool of scoped worker
//! threads; results are keyed by task index, so worker count and scheduling
//! never change the output.

use crate::{
    error::Error,
    features::{Channel, FeatureKind, FeatureSequence},
    library::ReferenceLibrary,
};
use ndarray::Array1;
use serde::Deserialize;
use std::collections::BTreeMap;

pub(crate) mod dtw;

/// A named, ordered subset of the feature catalogue.
#[derive(Debug, Clone)]
pub(crate) struct FeatureGroup {
    pub(crate) name: String,
    pub(crate) features: Vec<FeatureKind>,
}

/// The versioned feature-group taxonomy. Group order and the feature order
/// inside each group are fixed by the configuration and drive both scoring
/// batches and feedback order.
#[derive(Debug, Clone)]
pub(crate) struct FeatureGroups {
    pub(crate) version: u32,
    groups: Vec<FeatureGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroupConfig {
    version: u32,
    groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    name: String,
    features: Vec<String>,
}

impl FeatureGroups {
    pub(crate) fn from_path(path: &std::path::Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ReadGroupConfig(e, path.to_path_buf()))?;
        let raw: RawGroupConfig =
            serde_json::from_str(&contents).map_err(Error::ParseGroupConfig)?;

        let groups = raw
            .groups
            .into_iter()
            .map(|group| {
                let features = group
                    .features
                    .iter()
                    .map(|name| {
                        FeatureKind::from_name(name)
                            .ok_or_else(|| Error::UnknownFeatureName(name.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FeatureGroup {
                    name: group.name,
                    features,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self {
            version: raw.version,
            groups,
        })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &FeatureGroup> + '_ {
        self.groups.iter()
    }
}

impl Default for FeatureGroups {
    fn default() -> Self {
        use FeatureKind::*;
        let group = |name: &str, features: &[FeatureKind]| FeatureGroup {
            name: name.to_string(),
            features: features.to_vec(),
        };
        Self {
            version: 1,
            groups: vec![
                group(
                    "Racket Arm",
                    &[
                        RightElbowAngle,
                        RightShoulderAngle,
                        RightWristHeight,
                        RightArmExtension,
                    ],
                ),
                group(
                    "Non-Racket Arm",
                    &[
                        LeftElbowAngle,
                        LeftShoulderAngle,
                        LeftWristHeight,
                        LeftArmExtension,
                    ],
                ),
                group(
                    "Torso & Rotation",
                    &[TorsoRotation, BodyLean, ForwardLean, ShoulderWidth],
                ),
                group(
                    "Lower Body",
                    &[
                        RightKneeAngle,
                        LeftKneeAngle,
                        RightHipAngle,
                        LeftHipAngle,
                        StanceWidth,
                    ],
                ),
            ],
        }
    }
}

/// Raw distances for one group: the per-feature distances that survived on
/// both sides, and their mean (+infinity when none did).
#[derive(Debug, Clone)]
pub(crate) struct GroupDistances {
    pub(crate) distance: f64,
    pub(crate) per_feature: BTreeMap<FeatureKind, f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct PlayerDistances {
    pub(crate) overall: f64,
    pub(crate) groups: BTreeMap<String, GroupDistances>,
}

/// Smallest DTW distance between the normalized user signal and any of the
/// player's reference swings for one feature. `None` when no reference
/// carries the column.
fn feature_distance(
    user_normed: &Array1<f64>,
    swings: &[FeatureSequence],
    feature: FeatureKind,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    for swing in swings {
        if let Some(column) = swing.column(feature, Channel::Position) {
            let d = dtw::distance(user_normed.view(), dtw::z_normalize(column).view());
            best = Some(best.map_or(d, |b| b.min(d)));
        }
    }
    best
}

/// Compare the user swing against every player with at least one stored
/// reference. Distances only; converting to similarities is the scorer's
/// job.
pub(crate) fn compare(
    user: &FeatureSequence,
    library: &ReferenceLibrary,
    taxonomy: &FeatureGroups,
    workers: usize,
) -> Result<BTreeMap<String, PlayerDistances>, Error> {
    let players: Vec<(&String, &Vec<FeatureSequence>)> = library
        .players()
        .filter(|(_, swings)| !swings.is_empty())
        .collect();

    // Normalize each user column once; every task reads it immutably.
    let user_normed: BTreeMap<FeatureKind, Array1<f64>> = taxonomy
        .iter()
        .flat_map(|group| group.features.iter().copied())
        .filter_map(|feature| {
            user.column(feature, Channel::Position)
                .map(|column| (feature, dtw::z_normalize(column)))
        })
        .collect();

    let tasks: Vec<(usize, FeatureKind)> = (0..players.len())
        .flat_map(|player_idx| {
            user_normed
                .keys()
                .map(move |&feature| (player_idx, feature))
        })
        .collect();

    let mut results: Vec<Option<f64>> = vec![None; tasks.len()];
    if !tasks.is_empty() {
        let n_workers = workers.max(1).min(tasks.len());
        let chunk_size = (tasks.len() + n_workers - 1) / n_workers;

        crossbeam::thread::scope(|scope| {
            let (tx, rx) = std::sync::mpsc::channel();
            for (w, chunk) in tasks.chunks(chunk_size).enumerate() {
                let tx = tx.clone();
                let players = &players;
                let user_normed = &user_normed;
                scope.spawn(move |_| {
                    for (offset, &(player_idx, feature)) in chunk.iter().enumerate() {
                        let distance =
                            feature_distance(&user_normed[&feature], players[player_idx].1, feature);
                        // The receiver outlives every sender inside this scope.
                        let _ = tx.send((w * chunk_size + offset, distance));
                    }
                });
            }
            drop(tx);
            for (index, distance) in rx {
                results[index] = distance;
            }
        })
        .map_err(|_| Error::JoinCompareWorkers)?;
    }

    let by_task: BTreeMap<(usize, FeatureKind), f64> = tasks
        .iter()
        .zip(results)
        .filter_map(|(&task, distance)| distance.map(|d| (task, d)))
        .collect();

    let mut out = BTreeMap::new();
    for (player_idx, (player, _)) in players.iter().enumerate() {
        let mut groups = BTreeMap::new();
        for group in taxonomy.iter() {
            let per_feature: BTreeMap<FeatureKind, f64> = group
                .features
                .iter()
                .filter_map(|&feature| {
                    by_task
                        .get(&(player_idx, feature))
                        .map(|&d| (feature, d))
                })
                .collect();
            let distance = if per_feature.is_empty() {
                f64::INFINITY
            } else {
                per_feature.values().sum::<f64>() / per_feature.len() as f64
            };
            groups.insert(
                group.name.clone(),
                GroupDistances {
                    distance,
                    per_feature,
                },
            );
        }

        let overall = if groups.is_empty() {
            f64::INFINITY
        } else {
            groups.values().map(|g| g.distance).sum::<f64>() / groups.len() as f64
        };
        out.insert(
            (*player).clone(),
            PlayerDistances { overall, groups },
        );
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::Array1;

    fn ramp(n: usize, slope: f64) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| slope * i as f64))
    }

    fn wave(n: usize) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| (i as f64 / 3.0).sin()))
    }

    fn position_table(columns: Vec<(FeatureKind, Array1<f64>)>) -> FeatureSequence {
        FeatureSequence::from_position_columns(columns.into_iter().collect())
    }

    fn two_feature_taxonomy() -> FeatureGroups {
        FeatureGroups {
            version: 1,
            groups: vec![FeatureGroup {
                name: "Racket Arm".to_string(),
                features: vec![FeatureKind::RightElbowAngle, FeatureKind::RightWristHeight],
            }],
        }
    }

    mod compare_tests {
        use super::*;
        use crate::library::ReferenceLibrary;

        #[test]
        fn identical_reference_has_zero_distance() {
            let user = position_table(vec![
                (FeatureKind::RightElbowAngle, wave(50)),
                (FeatureKind::RightWristHeight, ramp(50, 0.1)),
            ]);
            let library = ReferenceLibrary::from_swings(
                vec![(
                    "Aho".to_string(),
                    vec![position_table(vec![
                        (FeatureKind::RightElbowAngle, wave(50)),
                        (FeatureKind::RightWristHeight, ramp(50, 0.1)),
                    ])],
                )]
                .into_iter()
                .collect(),
            );

            let distances = compare(&user, &library, &two_feature_taxonomy(), 2).unwrap();
            assert_approx_eq!(distances["Aho"].overall, 0.0, 1e-9);
        }

        #[test]
        fn best_of_multiple_references_wins() {
            let user = position_table(vec![(FeatureKind::RightElbowAngle, wave(40))]);
            // One bad reference, one exact one.
            let library = ReferenceLibrary::from_swings(
                vec![(
                    "Aho".to_string(),
                    vec![
                        position_table(vec![(FeatureKind::RightElbowAngle, ramp(40, 1.0))]),
                        position_table(vec![(FeatureKind::RightElbowAngle, wave(40))]),
                    ],
                )]
                .into_iter()
                .collect(),
            );
            let taxonomy = FeatureGroups {
                version: 1,
                groups: vec![FeatureGroup {
                    name: "Racket Arm".to_string(),
                    features: vec![FeatureKind::RightElbowAngle],
                }],
            };

            let distances = compare(&user, &library, &taxonomy, 1).unwrap();
            assert_approx_eq!(distances["Aho"].overall, 0.0, 1e-9);
        }

        #[test]
        fn player_without_swings_is_excluded() {
            let user = position_table(vec![(FeatureKind::RightElbowAngle, wave(30))]);
            let library = ReferenceLibrary::from_swings(
                vec![
                    ("Empty".to_string(), vec![]),
                    (
                        "Full".to_string(),
                        vec![position_table(vec![(
                            FeatureKind::RightElbowAngle,
                            wave(30),
                        )])],
                    ),
                ]
                .into_iter()
                .collect(),
            );

            let distances = compare(&user, &library, &two_feature_taxonomy(), 2).unwrap();
            assert!(!distances.contains_key("Empty"));
            assert!(distances.contains_key("Full"));
        }

        #[test]
        fn missing_feature_on_both_sides_gives_infinite_group() {
            // Reference only stores the elbow column; the taxonomy group that
            // needs the wrist column alone ends up empty.
            let user = position_table(vec![
                (FeatureKind::RightElbowAngle, wave(30)),
                (FeatureKind::RightWristHeight, ramp(30, 0.2)),
            ]);
            let library = ReferenceLibrary::from_swings(
                vec![(
                    "Aho".to_string(),
                    vec![position_table(vec![(
                        FeatureKind::RightElbowAngle,
                        wave(30),
                    )])],
                )]
                .into_iter()
                .collect(),
            );
            let taxonomy = FeatureGroups {
                version: 1,
                groups: vec![
                    FeatureGroup {
                        name: "Arm".to_string(),
                        features: vec![FeatureKind::RightElbowAngle],
                    },
                    FeatureGroup {
                        name: "Wrist".to_string(),
                        features: vec![FeatureKind::LeftWristHeight],
                    },
                ],
            };

            let distances = compare(&user, &library, &taxonomy, 2).unwrap();
            let player = &distances["Aho"];
            assert!(player.groups["Wrist"].distance.is_infinite());
            assert!(player.groups["Wrist"].per_feature.is_empty());
            assert_approx_eq!(player.groups["Arm"].distance, 0.0, 1e-9);
            assert!(player.overall.is_infinite());
        }

        #[test]
        fn worker_count_does_not_change_results() {
            let user = position_table(vec![
                (FeatureKind::RightElbowAngle, wave(40)),
                (FeatureKind::RightWristHeight, ramp(40, 0.3)),
            ]);
            let library = ReferenceLibrary::from_swings(
                vec![
                    (
                        "Aho".to_string(),
                        vec![position_table(vec![
                            (FeatureKind::RightElbowAngle, ramp(35, 0.5)),
                            (FeatureKind::RightWristHeight, wave(35)),
                        ])],
                    ),
                    (
                        "Benes".to_string(),
                        vec![position_table(vec![
                            (FeatureKind::RightElbowAngle, wave(45)),
                            (FeatureKind::RightWristHeight, ramp(45, 0.3)),
                        ])],
                    ),
                ]
                .into_iter()
                .collect(),
            );
            let taxonomy = two_feature_taxonomy();

            let serial = compare(&user, &library, &taxonomy, 1).unwrap();
            let parallel = compare(&user, &library, &taxonomy, 8).unwrap();
            for (player, distances) in &serial {
                assert_approx_eq!(distances.overall, parallel[player].overall, 1e-12);
            }
        }
    }

    mod group_config_tests {
        use super::*;

        #[test]
        fn default_taxonomy_covers_four_groups() {
            let taxonomy = FeatureGroups::default();
            let names: Vec<_> = taxonomy.iter().map(|g| g.name.as_str()).collect();
            assert_eq!(
                names,
                vec!["Racket Arm", "Non-Racket Arm", "Torso & Rotation", "Lower Body"]
            );
            // Groups partition disjoint subsets of the catalogue.
            let mut seen = std::collections::BTreeSet::new();
            for group in taxonomy.iter() {
                for feature in &group.features {
                    assert!(seen.insert(*feature));
                }
            }
        }

        #[test]
        fn config_with_unknown_feature_fails() {
            let dir = std::env::temp_dir();
            let path = dir.join(format!("swing-coach-groups-{}.json", std::process::id()));
            std::fs::write(
                &path,
                r#"{"version":2,"groups":[{"name":"Arm","features":["r_elbow_angle","warp_factor"]}]}"#,
            )
            .unwrap();
            let result = FeatureGroups::from_path(&path);
            assert!(matches!(result, Err(Error::UnknownFeatureName(_))));
            std::fs::remove_file(&path).unwrap();
        }

        #[test]
        fn config_round_trip() {
            let dir = std::env::temp_dir();
            let path = dir.join(format!("swing-coach-groups-ok-{}.json", std::process::id()));
            std::fs::write(
                &path,
                r#"{"version":3,"groups":[{"name":"Arm","features":["r_elbow_angle","r_wrist_height"]}]}"#,
            )
            .unwrap();
            let taxonomy = FeatureGroups::from_path(&path).unwrap();
            assert_eq!(taxonomy.version, 3);
            let groups: Vec<_> = taxonomy.iter().collect();
            assert_eq!(groups[0].name, "Arm");
            assert_eq!(
                groups[0].features,
                vec![FeatureKind::RightElbowAngle, FeatureKind::RightWristHeight]
            );
            std::fs::remove_file(&path).unwrap();
        }
    }
}
