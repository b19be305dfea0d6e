//! The decision record produced by the three-stage classifier.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::round_to;

/// Headline confidence, as a percentage rounded to one decimal place.
///
/// Serializes as a string such as `"60.0%"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence(f64);

impl Confidence {
    /// Build from a raw probability in [0, 1].
    pub fn from_probability(p: f32) -> Self {
        Self(round_to(p as f64 * 100.0, 1))
    }

    /// The rounded percentage (e.g. `60.0`).
    pub fn percent(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Per-label percentage for one main label, rounded to two decimal places.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub percent: f64,
}

/// Main-label percentages in label order.
///
/// Serializes as a JSON object from label to percentage, keeping label order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predictions(Vec<LabelScore>);

impl Predictions {
    /// Percentages from a Stage 3 probability vector.
    pub fn from_probabilities(labels: &[String], probs: &[f32]) -> Self {
        Self(
            labels
                .iter()
                .zip(probs)
                .map(|(label, &p)| LabelScore {
                    label: label.clone(),
                    percent: round_to(p as f64 * 100.0, 2),
                })
                .collect(),
        )
    }

    /// Every label at 0.0, reported when an image is rejected as unrelated.
    pub fn zeroed(labels: &[String]) -> Self {
        Self(
            labels
                .iter()
                .map(|label| LabelScore {
                    label: label.clone(),
                    percent: 0.0,
                })
                .collect(),
        )
    }

    /// Look up the percentage for a label.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|s| s.label == label).map(|s| s.percent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelScore> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Predictions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for score in &self.0 {
            map.serialize_entry(&score.label, &score.percent)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Predictions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PredictionsVisitor)
    }
}

struct PredictionsVisitor;

impl<'de> Visitor<'de> for PredictionsVisitor {
    type Value = Predictions;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from label to percentage")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut scores = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((label, percent)) = access.next_entry::<String, f64>()? {
            scores.push(LabelScore { label, percent });
        }
        Ok(Predictions(scores))
    }
}

/// Why an infrastructure image was not given a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowConfidenceReason {
    /// The best main label scored below the acceptance threshold.
    LowConfidence,
}

impl fmt::Display for LowConfidenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowConfidenceReason::LowConfidence => write!(f, "low confidence"),
        }
    }
}

/// Outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// Stage 2 confirmed the image shows something unrelated.
    NonInfrastructure {
        /// All main labels at 0.0, kept so every outcome has the same keys.
        predictions: Predictions,
        best_match_label: String,
        confidence: Confidence,
    },
    /// Scored against the main labels, but no label was convincing.
    LowConfidence {
        predictions: Predictions,
        confidence: Confidence,
        reason: LowConfidenceReason,
    },
    /// A main label was accepted.
    Classified {
        predictions: Predictions,
        predicted_label: String,
        confidence: Confidence,
    },
}

impl Decision {
    /// Headline confidence of the decision.
    pub fn confidence(&self) -> Confidence {
        match self {
            Decision::NonInfrastructure { confidence, .. }
            | Decision::LowConfidence { confidence, .. }
            | Decision::Classified { confidence, .. } => *confidence,
        }
    }

    /// Main-label percentages.
    pub fn predictions(&self) -> &Predictions {
        match self {
            Decision::NonInfrastructure { predictions, .. }
            | Decision::LowConfidence { predictions, .. }
            | Decision::Classified { predictions, .. } => predictions,
        }
    }

    /// The accepted main label, if any.
    pub fn predicted_label(&self) -> Option<&str> {
        match self {
            Decision::Classified {
                predicted_label, ..
            } => Some(predicted_label),
            _ => None,
        }
    }

    /// Short outcome name, matching the serialized tag.
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::NonInfrastructure { .. } => "non_infrastructure",
            Decision::LowConfidence { .. } => "low_confidence",
            Decision::Classified { .. } => "classified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_confidence_display_one_decimal() {
        assert_eq!(Confidence::from_probability(0.6).to_string(), "60.0%");
        assert_eq!(Confidence::from_probability(0.123456).to_string(), "12.3%");
    }

    #[test]
    fn test_predictions_two_decimals() {
        let preds = Predictions::from_probabilities(&labels(), &[0.123456, 0.876544]);
        assert_eq!(preds.get("a"), Some(12.35));
        assert_eq!(preds.get("b"), Some(87.65));
        assert_eq!(preds.get("missing"), None);
    }

    #[test]
    fn test_zeroed_predictions() {
        let preds = Predictions::zeroed(&labels());
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|s| s.percent == 0.0));
    }

    #[test]
    fn test_decision_serializes_with_outcome_tag() {
        let decision = Decision::Classified {
            predictions: Predictions::from_probabilities(&labels(), &[0.6, 0.4]),
            predicted_label: "a".to_string(),
            confidence: Confidence::from_probability(0.6),
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["outcome"], "classified");
        assert_eq!(json["predicted_label"], "a");
        assert_eq!(json["confidence"], "60.0%");
        assert!(json["predictions"].is_object());
        assert_eq!(json["predictions"]["a"], 60.0);
        assert_eq!(json["predictions"]["b"], 40.0);
    }

    #[test]
    fn test_predictions_serialize_as_ordered_object() {
        let labels = vec![
            "A leaking pipe or plumbing issue".to_string(),
            "A crack in a wall or ceiling".to_string(),
        ];
        let preds = Predictions::from_probabilities(&labels, &[0.6, 0.4]);

        let json = serde_json::to_string(&preds).unwrap();
        assert_eq!(
            json,
            r#"{"A leaking pipe or plumbing issue":60.0,"A crack in a wall or ceiling":40.0}"#
        );

        let back: Predictions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, preds);
        assert_eq!(back.iter().next().unwrap().label, labels[0]);
    }

    #[test]
    fn test_decision_json_roundtrip_keeps_confidence() {
        let decision = Decision::LowConfidence {
            predictions: Predictions::from_probabilities(&labels(), &[0.3, 0.7]),
            confidence: Confidence::from_probability(0.3),
            reason: LowConfidenceReason::LowConfidence,
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"reason\":\"low_confidence\""));
        let back: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, decision);
    }
}
