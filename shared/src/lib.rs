use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The two output classes of the binary classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Label {
    Cat,
    Dog,
}

/// Round `value` to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub cat: f64,
    pub dog: f64,
}

/// A formatted prediction derived from the model's single sigmoid output.
///
/// `probabilities.cat` and `probabilities.dog` are rounded independently, so
/// the pair may not sum to exactly 100.00. That approximation is part of the
/// contract, not something callers should correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,
    pub confidence_percentage: f64,
    pub raw_score: f64,
    pub probabilities: Probabilities,
}

impl PredictionResult {
    /// Map a raw sigmoid score (probability of `Dog`) to a labelled result.
    /// The 0.5 boundary itself classifies as `Cat`.
    pub fn from_score(score: f64) -> Self {
        let label = if score > 0.5 { Label::Dog } else { Label::Cat };
        let confidence = if label == Label::Dog {
            score
        } else {
            1.0 - score
        };

        Self {
            label,
            confidence_percentage: round_to(confidence * 100.0, 2),
            raw_score: round_to(score, 4),
            probabilities: Probabilities {
                cat: round_to((1.0 - score) * 100.0, 2),
                dog: round_to(score * 100.0, 2),
            },
        }
    }
}

/// Body of a successful `POST /predict` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub filename: String,
    pub prediction: Label,
    pub confidence_percentage: f64,
    pub raw_score: f64,
    pub probabilities: Probabilities,
    pub metadata: PredictMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictMetadata {
    pub image_size: (u32, u32),
    pub image_mode: String,
    pub model_input_size: (u32, u32),
}

/// One entry of a `POST /predict/batch` response. A failed item carries only
/// `filename`, `success: false` and `error`; the other items are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Probabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn succeeded(filename: String, result: &PredictionResult) -> Self {
        Self {
            filename,
            success: true,
            prediction: Some(result.label),
            confidence_percentage: Some(result.confidence_percentage),
            probabilities: Some(result.probabilities),
            error: None,
        }
    }

    pub fn failed(filename: String, error: String) -> Self {
        Self {
            filename,
            success: false,
            prediction: None,
            confidence_percentage: None,
            probabilities: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub total_images: usize,
    pub results: Vec<BatchItemResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_path: String,
    pub model_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub model_name: String,
    pub model_type: String,
    pub input_shape: (u32, u32, u32),
    pub output_classes: Vec<Label>,
    pub model_size_mb: f64,
    pub framework: String,
    pub training_accuracy: String,
    pub supported_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfoResponse {
    pub message: String,
    pub version: String,
    pub status: String,
    pub endpoints: BTreeMap<String, String>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dog_strictly_above_half() {
        for i in 0..=100 {
            let score = i as f64 / 100.0;
            let result = PredictionResult::from_score(score);
            if score > 0.5 {
                assert_eq!(result.label, Label::Dog, "score {score}");
            } else {
                assert_eq!(result.label, Label::Cat, "score {score}");
            }
            assert_eq!(
                result.confidence_percentage,
                round_to(score.max(1.0 - score) * 100.0, 2),
                "score {score}"
            );
        }
    }

    #[test]
    fn boundary_score_is_cat() {
        let result = PredictionResult::from_score(0.5);
        assert_eq!(result.label, Label::Cat);
        assert_eq!(result.confidence_percentage, 50.0);
    }

    #[test]
    fn formats_known_score() {
        let result = PredictionResult::from_score(0.923);
        assert_eq!(result.label, Label::Dog);
        assert_eq!(result.confidence_percentage, 92.3);
        assert_eq!(result.raw_score, 0.923);
        assert_eq!(result.probabilities.cat, 7.7);
        assert_eq!(result.probabilities.dog, 92.3);
    }

    #[test]
    fn dog_probability_round_trips_within_tolerance() {
        for i in 0..=1000 {
            let score = i as f64 / 1000.0;
            let result = PredictionResult::from_score(score);
            assert!(
                (result.probabilities.dog / 100.0 - score).abs() <= 0.01,
                "score {score}"
            );
        }
    }

    #[test]
    fn confidence_stays_in_upper_half() {
        for i in 0..=1000 {
            let result = PredictionResult::from_score(i as f64 / 1000.0);
            assert!(result.confidence_percentage >= 50.0);
            assert!(result.confidence_percentage <= 100.0);
        }
    }

    #[test]
    fn label_displays_as_class_name() {
        assert_eq!(Label::Cat.to_string(), "Cat");
        assert_eq!(Label::Dog.to_string(), "Dog");
    }
}
