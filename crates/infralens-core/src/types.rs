//! Output records produced by the classification pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classifier::Decision;

/// The complete output for one classified image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedImage {
    /// Path to the source file as given or discovered
    pub file_path: PathBuf,

    /// Just the filename portion
    pub file_name: String,

    /// BLAKE3 hash of the file bytes, used to skip already-classified images
    pub content_hash: String,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Detected format ("jpeg", "png", "webp", etc.)
    pub format: String,

    /// File size in bytes
    pub file_size: u64,

    /// What the three-stage policy decided
    pub decision: Decision,

    /// Wall-clock time spent on this image
    pub elapsed_ms: u64,
}

/// Statistics for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProcessingStats {
    /// Images classified without error
    pub succeeded: usize,

    /// Images that failed at any stage
    pub failed: usize,

    /// Images skipped because their content hash was already in the output
    pub skipped: usize,

    /// Succeeded images rejected as unrelated to infrastructure
    pub non_infrastructure: usize,

    /// Succeeded images with no convincing main label
    pub low_confidence: usize,

    /// Succeeded images with an accepted main label
    pub classified: usize,

    /// Processing rate in images per second
    pub images_per_second: f64,

    /// Total processing time in seconds
    pub total_seconds: f64,
}

impl ProcessingStats {
    /// Count a successful decision under its outcome.
    pub fn record(&mut self, decision: &Decision) {
        self.succeeded += 1;
        match decision {
            Decision::NonInfrastructure { .. } => self.non_infrastructure += 1,
            Decision::LowConfidence { .. } => self.low_confidence += 1,
            Decision::Classified { .. } => self.classified += 1,
        }
    }

    /// Set the timing fields from the elapsed run time.
    pub fn finish(&mut self, elapsed: std::time::Duration) {
        self.total_seconds = elapsed.as_secs_f64();
        self.images_per_second = if self.total_seconds > 0.0 {
            self.succeeded as f64 / self.total_seconds
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Confidence, Predictions};

    fn classified(label: &str) -> Decision {
        let labels = vec![label.to_string(), "other".to_string()];
        Decision::Classified {
            predictions: Predictions::from_probabilities(&labels, &[0.8, 0.2]),
            predicted_label: label.to_string(),
            confidence: Confidence::from_probability(0.8),
        }
    }

    #[test]
    fn test_classified_image_json_shape() {
        let record = ClassifiedImage {
            file_path: PathBuf::from("/site/leak.jpg"),
            file_name: "leak.jpg".to_string(),
            content_hash: "abc123".to_string(),
            width: 640,
            height: 480,
            format: "jpeg".to_string(),
            file_size: 1024,
            decision: classified("Water leakage or dampness"),
            elapsed_ms: 12,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["file_name"], "leak.jpg");
        assert_eq!(json["decision"]["outcome"], "classified");
        assert_eq!(
            json["decision"]["predicted_label"],
            "Water leakage or dampness"
        );
        assert_eq!(json["decision"]["confidence"], "80.0%");

        let back: ClassifiedImage = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_stats_record_and_finish() {
        let mut stats = ProcessingStats::default();
        stats.record(&classified("a"));
        stats.record(&Decision::LowConfidence {
            predictions: Predictions::zeroed(&["a".to_string()]),
            confidence: Confidence::from_probability(0.2),
            reason: crate::classifier::LowConfidenceReason::LowConfidence,
        });
        stats.failed += 1;
        stats.finish(std::time::Duration::from_secs(2));

        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.classified, 1);
        assert_eq!(stats.low_confidence, 1);
        assert_eq!(stats.non_infrastructure, 0);
        assert!((stats.images_per_second - 1.0).abs() < 1e-9);
    }
}
