//! Rule-based coaching feedback.
//!
//! Consumes the scored comparison and the user's feature table, and emits
//! coaching tips from a fixed rule table against the most similar player's
//! per-feature distances.

use crate::{
    compare::{FeatureGroups, PlayerDistances},
    features::{Channel, FeatureKind, FeatureSequence},
    score,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-feature distance below which the user matches the pro.
const STRENGTH_BELOW: f64 = 3.0;

/// Per-feature distance above which an improvement tip fires. Distances in
/// [STRENGTH_BELOW, IMPROVEMENT_ABOVE] produce no tip.
const IMPROVEMENT_ABOVE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TipKind {
    Strength,
    Improvement,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CoachingTip {
    pub(crate) kind: TipKind,
    pub(crate) body_part: &'static str,
    pub(crate) message: String,
}

struct CoachingRule {
    feature: FeatureKind,
    body_part: &'static str,
    /// Strength text; `{player}` is replaced with the best player's name.
    strength: &'static str,
    tip_high: &'static str,
    /// Improvement text when the user's value runs low. Falls back to
    /// `tip_high` when not authored.
    tip_low: Option<&'static str>,
}

const COACHING_RULES: [CoachingRule; 10] = [
    CoachingRule {
        feature: FeatureKind::RightElbowAngle,
        body_part: "Hitting arm elbow angle",
        strength: "Your hitting arm elbow angle is very close to {player}'s technique.",
        tip_high: "Your hitting arm is quite straight at contact. A slight bend (120-140\u{b0}) allows more wrist snap and spin potential.",
        tip_low: Some("Your elbow is more bent than the pros. Try extending more through the contact zone for better power transfer."),
    },
    CoachingRule {
        feature: FeatureKind::LeftElbowAngle,
        body_part: "Non-racket arm elbow angle",
        strength: "Your non-racket arm mirrors {player}'s form well.",
        tip_high: "Try pulling your non-racket arm across your body more during the swing \u{2014} this helps with torso rotation and balance.",
        tip_low: Some("Your non-racket arm is tucked in tight. Using it for balance by extending outward can improve stability."),
    },
    CoachingRule {
        feature: FeatureKind::RightShoulderAngle,
        body_part: "Racket arm shoulder rotation",
        strength: "Your shoulder rotation on the racket side is on point \u{2014} similar to {player}.",
        tip_high: "Your racket arm shoulder opens up wide. This can reduce control \u{2014} try keeping the arm closer to your body during the backswing.",
        tip_low: Some("Your shoulder rotation is limited. A bigger shoulder turn during preparation creates more elastic energy for power."),
    },
    CoachingRule {
        feature: FeatureKind::RightKneeAngle,
        body_part: "Dominant side knee bend",
        strength: "Great knee bend \u{2014} your leg drive is similar to {player}'s.",
        tip_high: "Your knees are quite straight. Bending your knees 10-15\u{b0} more during preparation gives you a lower center of gravity and more upward force for topspin.",
        tip_low: Some("Very deep knee bend! This is powerful but make sure you're not losing balance during the follow-through."),
    },
    CoachingRule {
        feature: FeatureKind::LeftKneeAngle,
        body_part: "Support leg knee bend",
        strength: "Your support leg positioning is solid.",
        tip_high: "Your support leg could use more bend \u{2014} this improves weight transfer from back foot to front foot.",
        tip_low: Some("Good support leg bend for stability."),
    },
    CoachingRule {
        feature: FeatureKind::TorsoRotation,
        body_part: "Torso rotation",
        strength: "Excellent torso rotation \u{2014} very similar to {player}'s coiling action.",
        tip_high: "You're over-rotating your shoulders relative to your hips. This can cause timing issues \u{2014} try syncing the shoulder turn with the backswing.",
        tip_low: Some("Your shoulder turn is limited compared to the pros. A bigger separation between hip and shoulder lines during preparation creates more rotational energy."),
    },
    CoachingRule {
        feature: FeatureKind::StanceWidth,
        body_part: "Stance width",
        strength: "Your stance width is well-balanced, similar to {player}.",
        tip_high: "Your stance is quite wide \u{2014} make sure this isn't limiting your ability to transfer weight forward.",
        tip_low: Some("A wider stance (shoulder-width or more) improves your base stability and helps with weight transfer."),
    },
    CoachingRule {
        feature: FeatureKind::RightWristHeight,
        body_part: "Racket hand height",
        strength: "Your racket hand path looks great \u{2014} tracking {player}'s pattern.",
        tip_high: "Your racket hand goes quite high in the backswing. A more compact takeback can improve consistency.",
        tip_low: Some("Your racket hand could reach higher during the backswing \u{2014} this creates a longer swing path for more racket head speed."),
    },
    CoachingRule {
        feature: FeatureKind::BodyLean,
        body_part: "Body lean",
        strength: "Your body balance is stable and similar to {player}.",
        tip_high: "You're leaning too far to one side during the swing. Try to stay more centered for better recovery.",
        tip_low: Some("Good lateral balance throughout the swing."),
    },
    CoachingRule {
        feature: FeatureKind::RightArmExtension,
        body_part: "Hitting arm extension",
        strength: "Great arm extension \u{2014} you're reaching out like {player}.",
        tip_high: "You're reaching very far from your body at contact. Make sure you're hitting in your optimal contact zone.",
        tip_low: Some("Try extending your arm more at contact \u{2014} hitting too close to your body limits power."),
    },
];

fn rule_for(feature: FeatureKind) -> Option<&'static CoachingRule> {
    COACHING_RULES.iter().find(|rule| rule.feature == feature)
}

/// The most similar player; equal similarities break toward the
/// lexicographically smallest name so the choice is deterministic.
pub(crate) fn best_player<'a>(overall_similarity: &'a BTreeMap<String, f64>) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for (player, &similarity) in overall_similarity {
        match best {
            Some((_, best_similarity)) if similarity <= best_similarity => {}
            _ => best = Some((player, similarity)),
        }
    }
    best.map(|(player, _)| player)
}

/// Whether the user's own values for a feature trend high or low, judged by
/// comparing their mean against their median over the swing.
fn runs_high(user: &FeatureSequence, feature: FeatureKind) -> bool {
    match user.column(feature, Channel::Position) {
        Some(column) if !column.is_empty() => {
            let mean = column.sum() / column.len() as f64;
            let values: Vec<f64> = column.iter().copied().collect();
            mean > score::median(&values)
        }
        _ => true,
    }
}

/// Generate coaching tips: walk the taxonomy in its fixed order, fire the
/// rule table against the best player's per-feature distances, then partition
/// improvements ahead of strengths (stable, preserving emission order).
pub(crate) fn generate(
    taxonomy: &FeatureGroups,
    comparison: &BTreeMap<String, PlayerDistances>,
    overall_similarity: &BTreeMap<String, f64>,
    user: &FeatureSequence,
) -> Vec<CoachingTip> {
    let best = match best_player(overall_similarity) {
        Some(best) => best,
        None => return Vec::new(),
    };
    let best_groups = match comparison.get(best) {
        Some(distances) => &distances.groups,
        None => return Vec::new(),
    };

    let mut tips = Vec::new();
    for group in taxonomy.iter() {
        let group_distances = match best_groups.get(&group.name) {
            Some(group_distances) => group_distances,
            None => continue,
        };

        for &feature in &group.features {
            let rule = match rule_for(feature) {
                Some(rule) => rule,
                None => continue,
            };
            let distance = match group_distances.per_feature.get(&feature) {
                Some(&distance) => distance,
                None => continue,
            };

            if distance < STRENGTH_BELOW {
                tips.push(CoachingTip {
                    kind: TipKind::Strength,
                    body_part: rule.body_part,
                    message: rule.strength.replace("{player}", best),
                });
            } else if distance > IMPROVEMENT_ABOVE {
                let message = if runs_high(user, feature) {
                    rule.tip_high
                } else {
                    rule.tip_low.unwrap_or(rule.tip_high)
                };
                tips.push(CoachingTip {
                    kind: TipKind::Improvement,
                    body_part: rule.body_part,
                    message: message.to_string(),
                });
            }
        }
    }

    // Stable partition: improvements first, both sides in emission order.
    tips.sort_by_key(|tip| tip.kind == TipKind::Strength);
    tips
}
