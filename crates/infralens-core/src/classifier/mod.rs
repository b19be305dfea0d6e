//! Three-stage zero-shot decision policy.
//!
//! A general-purpose vision-language model has never seen the maintenance
//! taxonomy, so its raw label probabilities are calibrated in three steps:
//!
//! ```text
//! Stage 1  gate          keywords ++ sentinels   -> maybe unrelated?
//! Stage 2  confirmation  everyday subjects       -> NonInfrastructure
//! Stage 3  main labels   issue categories        -> LowConfidence | Classified
//! ```
//!
//! Stage 2 only runs when the gate fires, and only short-circuits on a strong
//! match. A weak confirmation falls through to Stage 3.

pub mod decision;
pub mod labels;
pub mod oracle;

use std::sync::Arc;

use image::DynamicImage;

use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::math::{argmax, max_or_zero};

pub use decision::{Confidence, Decision, LabelScore, LowConfidenceReason, Predictions};
pub use labels::LabelSets;
pub use oracle::SimilarityOracle;

/// Stage 1 scores: best keyword match against best sentinel match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateScores {
    pub infra: f32,
    pub non_infra: f32,
}

impl GateScores {
    /// Whether the image needs the non-infrastructure confirmation stage.
    ///
    /// Either a sentinel win or a weak keyword win is enough.
    pub fn needs_confirmation(&self, gate_threshold: f32) -> bool {
        self.non_infra > self.infra || self.infra < gate_threshold
    }
}

/// Classifies images with the three-stage policy on top of a similarity oracle.
pub struct TriageClassifier<O> {
    oracle: O,
    labels: Arc<LabelSets>,
    config: ClassifierConfig,
}

impl<O: SimilarityOracle> TriageClassifier<O> {
    /// Create a classifier from an oracle, shared label sets and thresholds.
    pub fn new(oracle: O, labels: Arc<LabelSets>, config: ClassifierConfig) -> Self {
        Self {
            oracle,
            labels,
            config,
        }
    }

    /// Create a classifier with the built-in label sets and default thresholds.
    pub fn with_defaults(oracle: O) -> Self {
        Self::new(
            oracle,
            Arc::new(LabelSets::default()),
            ClassifierConfig::default(),
        )
    }

    pub fn labels(&self) -> &LabelSets {
        &self.labels
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Classify one decoded image.
    ///
    /// Returns `OracleUnavailable` before any stage runs if the oracle is not
    /// ready. Never returns a partial decision.
    pub fn classify(&self, image: &DynamicImage) -> Result<Decision, ClassifyError> {
        if !self.oracle.is_available() {
            return Err(ClassifyError::OracleUnavailable(
                "embedding model is not loaded".to_string(),
            ));
        }

        let gate = self.gate_scores(image)?;
        tracing::debug!(
            infra = gate.infra,
            non_infra = gate.non_infra,
            "Stage 1 gate scores"
        );

        if gate.needs_confirmation(self.config.gate_threshold) {
            if let Some(decision) = self.confirm_unrelated(image)? {
                return Ok(decision);
            }
        }

        self.classify_main(image)
    }

    /// Stage 1: score the keyword + sentinel working set.
    pub fn gate_scores(&self, image: &DynamicImage) -> Result<GateScores, ClassifyError> {
        let probs = self.score(image, self.labels.gate())?;
        let (keywords, sentinels) = probs.split_at(self.labels.keyword_count());
        Ok(GateScores {
            infra: max_or_zero(keywords),
            non_infra: max_or_zero(sentinels),
        })
    }

    /// Stage 2: a strong match to an everyday subject ends classification.
    fn confirm_unrelated(&self, image: &DynamicImage) -> Result<Option<Decision>, ClassifyError> {
        let labels = self.labels.non_infrastructure();
        let probs = self.score(image, labels)?;
        let Some((idx, max_prob)) = argmax(&probs) else {
            return Ok(None);
        };
        tracing::debug!(
            best = %labels[idx],
            probability = max_prob,
            "Stage 2 confirmation"
        );

        if max_prob > self.config.confirm_threshold {
            return Ok(Some(Decision::NonInfrastructure {
                predictions: Predictions::zeroed(self.labels.main()),
                best_match_label: labels[idx].clone(),
                confidence: Confidence::from_probability(max_prob),
            }));
        }
        Ok(None)
    }

    /// Stage 3: score the issue categories and apply the acceptance threshold.
    fn classify_main(&self, image: &DynamicImage) -> Result<Decision, ClassifyError> {
        let labels = self.labels.main();
        let probs = self.score(image, labels)?;
        let (idx, max_prob) = argmax(&probs).ok_or(ClassifyError::ScoreShape {
            expected: labels.len(),
            actual: 0,
        })?;
        let predictions = Predictions::from_probabilities(labels, &probs);
        let confidence = Confidence::from_probability(max_prob);
        tracing::debug!(
            best = %labels[idx],
            probability = max_prob,
            "Stage 3 classification"
        );

        if max_prob < self.config.accept_threshold {
            Ok(Decision::LowConfidence {
                predictions,
                confidence,
                reason: LowConfidenceReason::LowConfidence,
            })
        } else {
            Ok(Decision::Classified {
                predictions,
                predicted_label: labels[idx].clone(),
                confidence,
            })
        }
    }

    /// One oracle call, with the length post-condition checked.
    fn score(&self, image: &DynamicImage, labels: &[String]) -> Result<Vec<f32>, ClassifyError> {
        let probs = self.oracle.probabilities(image, labels)?;
        if probs.len() != labels.len() {
            return Err(ClassifyError::ScoreShape {
                expected: labels.len(),
                actual: probs.len(),
            });
        }
        Ok(probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns scripted probabilities per label set and records the call order.
    struct ScriptedOracle {
        available: bool,
        gate: Vec<f32>,
        confirm: Vec<f32>,
        main: Vec<f32>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedOracle {
        fn new(gate: Vec<f32>, confirm: Vec<f32>, main: Vec<f32>) -> Self {
            Self {
                available: true,
                gate,
                confirm,
                main,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SimilarityOracle for ScriptedOracle {
        fn is_available(&self) -> bool {
            self.available
        }

        fn probabilities(
            &self,
            _image: &DynamicImage,
            labels: &[String],
        ) -> Result<Vec<f32>, ClassifyError> {
            let (stage, probs) = match labels.len() {
                12 => ("gate", &self.gate),
                8 => ("confirm", &self.confirm),
                5 => ("main", &self.main),
                n => panic!("unexpected label set of {n}"),
            };
            self.calls.lock().unwrap().push(stage);
            Ok(probs.clone())
        }
    }

    /// 12-entry gate vector with the given keyword and sentinel maxima.
    fn gate(infra: f32, non_infra: f32) -> Vec<f32> {
        let mut probs = vec![0.0; 12];
        probs[3] = infra;
        probs[11] = non_infra;
        probs
    }

    fn confirm(idx: usize, p: f32) -> Vec<f32> {
        let mut probs = vec![0.0; 8];
        probs[idx] = p;
        probs
    }

    fn image() -> DynamicImage {
        DynamicImage::new_rgb8(8, 8)
    }

    #[test]
    fn test_gate_needs_confirmation_rules() {
        let t = 0.40;
        assert!(GateScores { infra: 0.3, non_infra: 0.5 }.needs_confirmation(t));
        assert!(GateScores { infra: 0.39, non_infra: 0.1 }.needs_confirmation(t));
        assert!(!GateScores { infra: 0.40, non_infra: 0.40 }.needs_confirmation(t));
        assert!(!GateScores { infra: 0.8, non_infra: 0.1 }.needs_confirmation(t));
    }

    #[test]
    fn test_gate_threshold_is_strict() {
        let oracle = ScriptedOracle::new(
            gate(0.40, 0.1),
            confirm(0, 0.9),
            vec![0.6, 0.1, 0.1, 0.1, 0.1],
        );
        let classifier = TriageClassifier::with_defaults(&oracle);
        let decision = classifier.classify(&image()).unwrap();
        assert_eq!(oracle.calls(), vec!["gate", "main"]);
        assert!(matches!(decision, Decision::Classified { .. }));

        let oracle = ScriptedOracle::new(
            gate(0.40 - 1e-6, 0.1),
            confirm(0, 0.9),
            vec![0.6, 0.1, 0.1, 0.1, 0.1],
        );
        let classifier = TriageClassifier::with_defaults(&oracle);
        let decision = classifier.classify(&image()).unwrap();
        assert_eq!(oracle.calls(), vec!["gate", "confirm"]);
        assert!(matches!(decision, Decision::NonInfrastructure { .. }));
    }

    #[test]
    fn test_confirmation_threshold_is_strict() {
        let main = vec![0.6, 0.1, 0.1, 0.1, 0.1];

        let oracle = ScriptedOracle::new(gate(0.1, 0.5), confirm(2, 0.30), main.clone());
        let classifier = TriageClassifier::with_defaults(&oracle);
        let decision = classifier.classify(&image()).unwrap();
        assert_eq!(oracle.calls(), vec!["gate", "confirm", "main"]);
        assert!(matches!(decision, Decision::Classified { .. }));

        let oracle = ScriptedOracle::new(gate(0.1, 0.5), confirm(2, 0.3000001), main);
        let classifier = TriageClassifier::with_defaults(&oracle);
        let decision = classifier.classify(&image()).unwrap();
        assert_eq!(oracle.calls(), vec!["gate", "confirm"]);
        match decision {
            Decision::NonInfrastructure {
                best_match_label, ..
            } => assert_eq!(best_match_label, "food or cooking"),
            other => panic!("expected non-infrastructure, got {other:?}"),
        }
    }

    #[test]
    fn test_accept_threshold_is_inclusive() {
        let oracle = ScriptedOracle::new(
            gate(0.8, 0.1),
            confirm(0, 0.0),
            vec![0.35, 0.20, 0.15, 0.15, 0.15],
        );
        let classifier = TriageClassifier::with_defaults(&oracle);
        let decision = classifier.classify(&image()).unwrap();
        assert_eq!(
            decision.predicted_label(),
            Some("A broken electrical wire or fuse box")
        );
        assert_eq!(decision.confidence().to_string(), "35.0%");
    }

    #[test]
    fn test_first_maximum_wins_ties() {
        let oracle = ScriptedOracle::new(
            gate(0.8, 0.1),
            confirm(0, 0.0),
            vec![0.1, 0.4, 0.4, 0.05, 0.05],
        );
        let classifier = TriageClassifier::with_defaults(&oracle);
        let decision = classifier.classify(&image()).unwrap();
        assert_eq!(
            decision.predicted_label(),
            Some("A leaking pipe or plumbing issue")
        );
    }

    #[test]
    fn test_stage2_ties_pick_first_label() {
        let mut probs = vec![0.0; 8];
        probs[1] = 0.45;
        probs[4] = 0.45;
        let oracle = ScriptedOracle::new(gate(0.1, 0.9), probs, vec![0.2; 5]);
        let classifier = TriageClassifier::with_defaults(&oracle);
        match classifier.classify(&image()).unwrap() {
            Decision::NonInfrastructure {
                best_match_label, ..
            } => assert_eq!(best_match_label, "an animal or pet"),
            other => panic!("expected non-infrastructure, got {other:?}"),
        }
    }

    #[test]
    fn test_unavailable_oracle_makes_no_calls() {
        let mut oracle = ScriptedOracle::new(gate(0.8, 0.1), confirm(0, 0.0), vec![0.2; 5]);
        oracle.available = false;
        let classifier = TriageClassifier::with_defaults(&oracle);
        let err = classifier.classify(&image()).unwrap_err();
        assert!(matches!(err, ClassifyError::OracleUnavailable(_)));
        assert!(oracle.calls().is_empty());
    }

    #[test]
    fn test_wrong_length_is_reported() {
        let oracle = ScriptedOracle::new(vec![0.5, 0.5], confirm(0, 0.0), vec![0.2; 5]);
        let classifier = TriageClassifier::with_defaults(&oracle);
        let err = classifier.classify(&image()).unwrap_err();
        assert_eq!(
            err,
            ClassifyError::ScoreShape {
                expected: 12,
                actual: 2
            }
        );
    }

    #[test]
    fn test_custom_thresholds_are_used() {
        let config = ClassifierConfig {
            gate_threshold: 0.40,
            confirm_threshold: 0.30,
            accept_threshold: 0.70,
        };
        let oracle = ScriptedOracle::new(
            gate(0.8, 0.1),
            confirm(0, 0.0),
            vec![0.6, 0.1, 0.1, 0.1, 0.1],
        );
        let classifier =
            TriageClassifier::new(&oracle, Arc::new(LabelSets::default()), config);
        let decision = classifier.classify(&image()).unwrap();
        assert_eq!(decision.outcome(), "low_confidence");
    }
}
