//! End-to-end tests of the public API with a scripted oracle and synthetic images.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat};
use infralens_core::output::existing_hashes;
use infralens_core::{
    ClassifyError, Config, Decision, ImageProcessor, LabelSets, OutputFormat, OutputWriter,
    ProcessingStats, SimilarityOracle, TriageClassifier,
};

/// Answers each stage with a scripted vector, recognising the stage by its label set.
struct ScriptedOracle {
    labels: LabelSets,
    gate: Vec<f32>,
    confirm: Vec<f32>,
    main: Vec<f32>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedOracle {
    fn new(gate: Vec<f32>, confirm: Vec<f32>, main: Vec<f32>) -> Self {
        Self {
            labels: LabelSets::default(),
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
        true
    }

    fn probabilities(
        &self,
        _image: &DynamicImage,
        labels: &[String],
    ) -> Result<Vec<f32>, ClassifyError> {
        let (stage, probs) = if labels == self.labels.gate() {
            ("gate", &self.gate)
        } else if labels == self.labels.non_infrastructure() {
            ("confirm", &self.confirm)
        } else if labels == self.labels.main() {
            ("main", &self.main)
        } else {
            return Err(ClassifyError::Oracle("unknown label set".to_string()));
        };
        self.calls.lock().unwrap().push(stage);
        Ok(probs.clone())
    }
}

/// Gate vector with `infra` on a keyword and `non_infra` on a sentinel.
fn gate(infra: f32, non_infra: f32) -> Vec<f32> {
    let mut probs = vec![0.0; 12];
    probs[5] = infra;
    probs[10] = non_infra;
    probs
}

fn peaked(len: usize, idx: usize, p: f32) -> Vec<f32> {
    let rest = (1.0 - p) / (len - 1) as f32;
    let mut probs = vec![rest; len];
    probs[idx] = p;
    probs
}

fn image() -> DynamicImage {
    DynamicImage::new_rgb8(32, 24)
}

fn write_png(dir: &Path, name: &str, shade: u8) -> PathBuf {
    let mut img = image::RgbImage::new(32, 24);
    for pixel in img.pixels_mut() {
        *pixel = image::Rgb([shade, shade / 2, 255 - shade]);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn infra_dominant_image_is_classified_without_confirmation() {
    let oracle = ScriptedOracle::new(gate(0.8, 0.1), vec![], peaked(5, 1, 0.6));
    let classifier = TriageClassifier::with_defaults(&oracle);

    let decision = classifier.classify(&image()).unwrap();

    assert_eq!(oracle.calls(), vec!["gate", "main"]);
    assert_eq!(
        decision.predicted_label(),
        Some("A leaking pipe or plumbing issue")
    );
    assert_eq!(decision.confidence().to_string(), "60.0%");
    assert_eq!(decision.predictions().len(), 5);
    assert_eq!(
        decision.predictions().get("A leaking pipe or plumbing issue"),
        Some(60.0)
    );

    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["predictions"]["A leaking pipe or plumbing issue"], 60.0);
    assert_eq!(json["confidence"], "60.0%");
}

#[test]
fn confirmed_unrelated_image_stops_after_stage_two() {
    let oracle = ScriptedOracle::new(gate(0.2, 0.5), peaked(8, 1, 0.6), vec![]);
    let classifier = TriageClassifier::with_defaults(&oracle);

    let decision = classifier.classify(&image()).unwrap();

    assert_eq!(oracle.calls(), vec!["gate", "confirm"]);
    match &decision {
        Decision::NonInfrastructure {
            predictions,
            best_match_label,
            confidence,
        } => {
            assert_eq!(best_match_label, "an animal or pet");
            assert_eq!(confidence.to_string(), "60.0%");
            assert_eq!(predictions.len(), 5);
            assert!(predictions.iter().all(|s| s.percent == 0.0));
        }
        other => panic!("expected NonInfrastructure, got {other:?}"),
    }
    assert_eq!(decision.predicted_label(), None);
}

#[test]
fn weak_gate_and_weak_confirmation_fall_through_to_low_confidence() {
    let oracle = ScriptedOracle::new(gate(0.35, 0.1), peaked(8, 2, 0.2), peaked(5, 3, 0.30));
    let classifier = TriageClassifier::with_defaults(&oracle);

    let decision = classifier.classify(&image()).unwrap();

    assert_eq!(oracle.calls(), vec!["gate", "confirm", "main"]);
    assert!(matches!(decision, Decision::LowConfidence { .. }));
    assert_eq!(decision.confidence().to_string(), "30.0%");
    assert_eq!(decision.predicted_label(), None);
}

#[test]
fn rounding_of_predictions_and_confidence() {
    let main = vec![0.123456, 0.1, 0.1, 0.1, 0.1];
    let oracle = ScriptedOracle::new(gate(0.9, 0.0), vec![], main);
    let classifier = TriageClassifier::with_defaults(&oracle);

    let decision = classifier.classify(&image()).unwrap();

    let percent = decision
        .predictions()
        .get("A broken electrical wire or fuse box")
        .unwrap();
    assert!((percent - 12.35).abs() < 1e-9);
    assert_eq!(decision.confidence().to_string(), "12.3%");
}

#[test]
fn repeated_classification_is_identical() {
    let oracle = ScriptedOracle::new(gate(0.3, 0.4), peaked(8, 4, 0.25), peaked(5, 2, 0.7));
    let classifier = TriageClassifier::with_defaults(&oracle);

    let first = classifier.classify(&image()).unwrap();
    let second = classifier.classify(&image()).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn batch_run_writes_records_and_supports_skipping() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).unwrap();
    write_png(&photos, "a.png", 10);
    write_png(&photos, "b.png", 200);
    std::fs::write(photos.join("readme.txt"), "not an image").unwrap();

    let oracle = ScriptedOracle::new(gate(0.8, 0.1), vec![], peaked(5, 2, 0.9));
    let processor = ImageProcessor::with_oracle(&Config::default(), oracle);
    assert!(processor.has_classifier());

    let files = processor.discover(&photos);
    assert_eq!(files.len(), 2);

    let output = dir.path().join("results.jsonl");
    let mut writer = OutputWriter::new(
        std::fs::File::create(&output).unwrap(),
        OutputFormat::JsonLines,
        false,
    );
    let mut stats = ProcessingStats::default();
    for file in &files {
        let record = processor.process(&file.path).await.unwrap();
        assert_eq!(
            record.decision.predicted_label(),
            Some("Cracks in walls or structural damage")
        );
        stats.record(&record.decision);
        writer.write(&record).unwrap();
    }
    writer.flush().unwrap();
    drop(writer);

    assert_eq!(stats.classified, 2);

    let hashes = existing_hashes(&output).unwrap();
    assert_eq!(hashes.len(), 2);
    for file in &files {
        let hash = infralens_core::pipeline::content_hash(&file.path).unwrap();
        assert!(hashes.contains(&hash));
    }
}

#[tokio::test]
async fn corrupt_image_fails_before_classification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 32]);
    std::fs::write(&path, bytes).unwrap();

    let oracle = Arc::new(ScriptedOracle::new(gate(0.8, 0.1), vec![], peaked(5, 0, 0.9)));
    let processor = ImageProcessor::with_oracle(&Config::default(), Arc::clone(&oracle));

    assert!(processor.process(&path).await.is_err());
    assert!(oracle.calls().is_empty());
}
