//! Post-inference decision policy.
//!
//! Turns the model's probability vector into either a specific flower class or
//! an "unknown / not a flower" verdict. Two independent rules reject a
//! prediction: the top probability is below [`CONFIDENCE_THRESHOLD`], or the gap
//! between the two highest probabilities is below [`MARGIN_THRESHOLD`].

use crate::error::{FlowerError, Result};
use serde::{Deserialize, Serialize};

/// Class labels in the order of the model's output vector.
pub const CLASS_NAMES: [&str; 5] = ["Lily", "Lotus", "Anggrek", "Bunga Matahari", "Tulip"];

/// Minimum top-class probability for a specific verdict.
pub const CONFIDENCE_THRESHOLD: f32 = 0.70;

/// Minimum gap between the two highest probabilities for a specific verdict.
pub const MARGIN_THRESHOLD: f32 = 0.20;

/// Label shown for a rejected prediction.
pub const UNKNOWN_LABEL: &str = "Bukan bunga";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub confidence: f32,
    pub margin: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: CONFIDENCE_THRESHOLD,
            margin: MARGIN_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(confidence: f32, margin: f32) -> Result<Self> {
        let t = Self { confidence, margin };
        t.validate()?;
        Ok(t)
    }

    /// Both thresholds must lie in [0, 1].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("confidence", self.confidence), ("margin", self.margin)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FlowerError::InvalidInput(format!(
                    "{name} threshold {value} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Final classification decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    /// Not similar enough to any known class.
    Unknown,
    Known { label: String, confidence: f32 },
}

impl Verdict {
    pub fn display_label(&self) -> &str {
        match self {
            Verdict::Unknown => UNKNOWN_LABEL,
            Verdict::Known { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub label: String,
    pub probability: f32,
}

/// Per-class probabilities in class-list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(pub Vec<ClassProbability>);

impl Distribution {
    fn from_parts(probabilities: &[f32], class_names: &[impl AsRef<str>]) -> Self {
        Self(
            class_names
                .iter()
                .zip(probabilities)
                .map(|(name, &p)| ClassProbability {
                    label: name.as_ref().to_string(),
                    probability: p,
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassProbability> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.0
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.probability)
    }

    /// `{label: probability}` object, keys in class order.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|c| (c.label.clone(), serde_json::Value::from(c.probability as f64)))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Verdict plus the distribution, which is only exposed for a known class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub verdict: Verdict,
    pub distribution: Option<Distribution>,
}

impl Prediction {
    pub fn is_known(&self) -> bool {
        matches!(self.verdict, Verdict::Known { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Known { label, .. } => Some(label),
            Verdict::Unknown => None,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self.verdict {
            Verdict::Known { confidence, .. } => Some(confidence),
            Verdict::Unknown => None,
        }
    }
}

/// Summary statistics of a probability vector.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TopTwo {
    /// First index holding the maximum.
    index: usize,
    top1: f32,
    top2: f32,
}

fn top_two(probabilities: &[f32]) -> Result<TopTwo> {
    if probabilities.len() < 2 {
        return Err(FlowerError::InvalidInput(format!(
            "need at least 2 classes to compute a margin, got {}",
            probabilities.len()
        )));
    }
    if let Some(pos) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(FlowerError::InvalidInput(format!(
            "probability at index {pos} is not finite: {}",
            probabilities[pos]
        )));
    }

    // strict comparison keeps the first occurrence on ties
    let mut index = 0;
    for (i, &p) in probabilities.iter().enumerate().skip(1) {
        if p > probabilities[index] {
            index = i;
        }
    }

    let mut sorted = probabilities.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    Ok(TopTwo {
        index,
        top1: sorted[0],
        top2: sorted[1],
    })
}

/// Gap between the highest and second-highest probability.
pub fn margin(probabilities: &[f32]) -> Result<f32> {
    let t = top_two(probabilities)?;
    Ok(t.top1 - t.top2)
}

/// Apply the two-threshold rule to one probability vector.
pub fn decide(
    probabilities: &[f32],
    class_names: &[impl AsRef<str>],
    thresholds: &Thresholds,
) -> Result<Prediction> {
    if probabilities.len() != class_names.len() {
        return Err(FlowerError::InvalidInput(format!(
            "{} probabilities for {} class names",
            probabilities.len(),
            class_names.len()
        )));
    }
    let t = top_two(probabilities)?;
    let max_prob = t.top1;
    let margin = t.top1 - t.top2;

    let rejected = max_prob < thresholds.confidence || margin < thresholds.margin;
    tracing::debug!(max_prob, margin, rejected, "decision");

    if rejected {
        return Ok(Prediction {
            verdict: Verdict::Unknown,
            distribution: None,
        });
    }

    Ok(Prediction {
        verdict: Verdict::Known {
            label: class_names[t.index].as_ref().to_string(),
            confidence: max_prob,
        },
        distribution: Some(Distribution::from_parts(probabilities, class_names)),
    })
}

/// [`decide`] with [`CLASS_NAMES`] and the default thresholds.
pub fn decide_default(probabilities: &[f32]) -> Result<Prediction> {
    decide(probabilities, &CLASS_NAMES[..], &Thresholds::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn known(p: &Prediction) -> (&str, f32) {
        match &p.verdict {
            Verdict::Known { label, confidence } => (label.as_str(), *confidence),
            Verdict::Unknown => panic!("expected a known verdict, got {p:?}"),
        }
    }

    #[rstest]
    #[case([0.85, 0.05, 0.03, 0.02, 0.05], "Lily", 0.85)]
    #[case([0.80, 0.15, 0.03, 0.01, 0.01], "Lily", 0.80)]
    #[case([0.02, 0.03, 0.05, 0.90, 0.00], "Bunga Matahari", 0.90)]
    #[case([0.01, 0.01, 0.01, 0.01, 0.96], "Tulip", 0.96)]
    fn confident_predictions_are_known(
        #[case] probs: [f32; 5],
        #[case] label: &str,
        #[case] confidence: f32,
    ) {
        let p = decide_default(&probs).unwrap();
        let (got_label, got_conf) = known(&p);
        assert_eq!(got_label, label);
        assert_relative_eq!(got_conf, confidence);
    }

    #[rstest]
    #[case::low_confidence([0.55, 0.40, 0.05, 0.0, 0.0])]
    #[case::near_tie([0.72, 0.60, 0.05, 0.02, 0.01])]
    #[case::tie_at_half([0.55, 0.45, 0.0, 0.0, 0.0])]
    #[case::all_equal([0.2, 0.2, 0.2, 0.2, 0.2])]
    #[case::all_zero([0.0, 0.0, 0.0, 0.0, 0.0])]
    fn ambiguous_or_weak_predictions_are_unknown(#[case] probs: [f32; 5]) {
        let p = decide_default(&probs).unwrap();
        assert_eq!(p.verdict, Verdict::Unknown);
        assert!(p.distribution.is_none());
        assert_eq!(p.label(), None);
        assert_eq!(p.verdict.display_label(), UNKNOWN_LABEL);
    }

    #[test]
    fn confidence_exactly_at_threshold_is_accepted() {
        let p = decide_default(&[0.70, 0.10, 0.10, 0.05, 0.05]).unwrap();
        assert_eq!(known(&p).0, "Lily");
    }

    #[test]
    fn large_margin_does_not_rescue_low_confidence() {
        // margin 0.59 but max below 0.70
        let p = decide_default(&[0.0, 0.69, 0.10, 0.10, 0.10]).unwrap();
        assert_eq!(p.verdict, Verdict::Unknown);
    }

    #[test]
    fn known_verdict_exposes_full_distribution_in_class_order() {
        let probs = [0.05, 0.85, 0.03, 0.02, 0.05];
        let p = decide_default(&probs).unwrap();
        let dist = p.distribution.expect("distribution for known verdict");
        let labels: Vec<&str> = dist.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, CLASS_NAMES.to_vec());
        assert_relative_eq!(dist.get("Lotus").unwrap(), 0.85);
        assert_relative_eq!(dist.get("Tulip").unwrap(), 0.05);
        assert_eq!(dist.get("Rose"), None);
    }

    #[test]
    fn distribution_json_keeps_class_order() {
        let p = decide_default(&[0.85, 0.05, 0.03, 0.02, 0.05]).unwrap();
        let json = p.distribution.unwrap().to_json();
        let obj = json.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys, CLASS_NAMES.to_vec());
        let lily = obj["Lily"].as_f64().unwrap();
        assert_relative_eq!(lily, 0.85, epsilon = 1e-6);
    }

    #[test]
    fn tie_for_max_resolves_to_first_class() {
        let names = ["a", "b", "c"];
        let probs = [0.1, 0.45, 0.45];
        let loose = Thresholds::new(0.0, 0.0).unwrap();
        let p = decide(&probs, &names[..], &loose).unwrap();
        assert_eq!(p.label(), Some("b"));
    }

    #[test]
    fn custom_thresholds_change_the_outcome() {
        let probs = [0.72, 0.60, 0.05, 0.02, 0.01];
        let relaxed = Thresholds::new(0.70, 0.10).unwrap();
        let p = decide(&probs, &CLASS_NAMES[..], &relaxed).unwrap();
        assert_eq!(p.label(), Some("Lily"));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = decide_default(&[0.9, 0.1, 0.0]).unwrap_err();
        assert!(matches!(err, FlowerError::InvalidInput(_)));
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::single(&[1.0])]
    fn fewer_than_two_classes_is_rejected(#[case] probs: &[f32]) {
        let names: Vec<String> = probs.iter().map(|_| "only".to_string()).collect();
        let err = decide(probs, names.as_slice(), &Thresholds::default()).unwrap_err();
        assert!(matches!(err, FlowerError::InvalidInput(_)));
        assert!(matches!(margin(probs), Err(FlowerError::InvalidInput(_))));
    }

    #[test]
    fn nan_probability_is_rejected() {
        let err = decide_default(&[0.9, f32::NAN, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, FlowerError::InvalidInput(_)));
    }

    #[test]
    fn margin_uses_top_two_regardless_of_position() {
        let m = margin(&[0.1, 0.3, 0.6]).unwrap();
        assert_relative_eq!(m, 0.3, epsilon = 1e-6);
    }

    #[rstest]
    #[case(1.2, 0.2)]
    #[case(0.7, -0.1)]
    #[case(f32::NAN, 0.2)]
    fn out_of_range_thresholds_are_rejected(#[case] confidence: f32, #[case] margin: f32) {
        assert!(Thresholds::new(confidence, margin).is_err());
    }

    #[test]
    fn deciding_twice_gives_identical_results() {
        let probs = [0.85, 0.05, 0.03, 0.02, 0.05];
        assert_eq!(decide_default(&probs).unwrap(), decide_default(&probs).unwrap());
        let probs = [0.72, 0.60, 0.05, 0.02, 0.01];
        assert_eq!(decide_default(&probs).unwrap(), decide_default(&probs).unwrap());
    }
}
