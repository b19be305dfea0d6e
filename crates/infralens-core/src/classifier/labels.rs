//! The three fixed label sets the decision policy scores images against.

/// Infrastructure issue categories. The only labels ever reported as a prediction.
pub const MAIN_LABELS: [&str; 5] = [
    "A broken electrical wire or fuse box",
    "A leaking pipe or plumbing issue",
    "Cracks in walls or structural damage",
    "Dirty washroom or unclean area (sanitation issue)",
    "Lights not working or dark room",
];

/// Infrastructure-context phrasings used by the Stage 1 gate.
pub const INFRASTRUCTURE_KEYWORDS: [&str; 10] = [
    "building repair work",
    "maintenance issue in university or hostel",
    "infrastructure damage in housing society",
    "facility issue in apartment or office",
    "campus maintenance fault",
    "broken infrastructure needing repair",
    "technical issue in large community",
    "structural fault or utility damage",
    "damaged facility in residential area",
    "faulty wiring or pipe leakage in building",
];

/// Sentinel phrasings appended after the keywords in the Stage 1 working set.
pub const GATE_SENTINELS: [&str; 2] = ["unrelated content", "not infrastructure"];

/// Everyday subjects used to confirm an image is unrelated (Stage 2).
pub const NON_INFRASTRUCTURE_LABELS: [&str; 8] = [
    "a person or human face",
    "an animal or pet",
    "food or cooking",
    "sports or games",
    "nature or landscape",
    "vehicle or transportation",
    "celebrity or famous person",
    "random object or unrelated item",
];

/// Immutable label configuration shared by every classification.
///
/// Built once at startup; the classifier holds it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSets {
    main: Vec<String>,
    gate: Vec<String>,
    keyword_count: usize,
    non_infrastructure: Vec<String>,
}

impl Default for LabelSets {
    fn default() -> Self {
        Self::new(
            MAIN_LABELS.iter().map(|s| s.to_string()).collect(),
            INFRASTRUCTURE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            NON_INFRASTRUCTURE_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl LabelSets {
    /// Build label sets from custom lists. The gate sentinels are always appended.
    pub fn new(
        main: Vec<String>,
        infrastructure_keywords: Vec<String>,
        non_infrastructure: Vec<String>,
    ) -> Self {
        let keyword_count = infrastructure_keywords.len();
        let mut gate = infrastructure_keywords;
        gate.extend(GATE_SENTINELS.iter().map(|s| s.to_string()));
        Self {
            main,
            gate,
            keyword_count,
            non_infrastructure,
        }
    }

    /// Stage 3 labels.
    pub fn main(&self) -> &[String] {
        &self.main
    }

    /// Stage 1 working set: keywords followed by the sentinels.
    pub fn gate(&self) -> &[String] {
        &self.gate
    }

    /// Number of leading infrastructure keywords in [`gate`](Self::gate).
    pub fn keyword_count(&self) -> usize {
        self.keyword_count
    }

    /// Stage 2 labels.
    pub fn non_infrastructure(&self) -> &[String] {
        &self.non_infrastructure
    }

    /// All three working sets in stage order, for pre-encoding.
    pub fn all(&self) -> [&[String]; 3] {
        [self.gate(), self.non_infrastructure(), self.main()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label_set_sizes() {
        let labels = LabelSets::default();
        assert_eq!(labels.main().len(), 5);
        assert_eq!(labels.gate().len(), 12);
        assert_eq!(labels.keyword_count(), 10);
        assert_eq!(labels.non_infrastructure().len(), 8);
    }

    #[test]
    fn test_gate_sentinels_follow_keywords() {
        let labels = LabelSets::default();
        assert_eq!(labels.gate()[0], "building repair work");
        assert_eq!(labels.gate()[10], "unrelated content");
        assert_eq!(labels.gate()[11], "not infrastructure");
    }

    #[test]
    fn test_custom_keywords_keep_sentinels() {
        let labels = LabelSets::new(
            vec!["a".into()],
            vec!["k1".into(), "k2".into()],
            vec!["n".into()],
        );
        assert_eq!(labels.keyword_count(), 2);
        assert_eq!(
            labels.gate(),
            &["k1", "k2", "unrelated content", "not infrastructure"]
        );
    }
}
