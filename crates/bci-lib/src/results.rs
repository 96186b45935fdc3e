//! Validated outcomes of load, predict and batch requests.

use crate::api::{ApiError, BatchResponse, LoadModelResponse, PredictResponse};
use serde::Serialize;

const MODEL_SELECTED_PREFIX: &str = "Model selected: ";
/// Label the backend writes into a batch row whose inference failed.
pub const ERROR_LABEL: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedModel {
    pub name: String,
    pub data_load_time_s: f64,
}

impl LoadedModel {
    pub fn from_response(response: LoadModelResponse) -> Self {
        let name = response
            .message
            .strip_prefix(MODEL_SELECTED_PREFIX)
            .unwrap_or(&response.message)
            .to_string();
        Self {
            name,
            data_load_time_s: response.data_load_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_label: String,
    /// Fraction in `[0, 1]`.
    pub confidence: f64,
    pub inference_time_ms: f64,
    pub correct: bool,
    /// Trial the prediction was requested for.
    pub trial_index: usize,
}

impl PredictionResult {
    pub fn from_response(response: PredictResponse, trial_index: usize) -> Result<Self, ApiError> {
        if !response.confidence.is_finite() || !(0.0..=1.0).contains(&response.confidence) {
            return Err(ApiError::Malformed(format!(
                "confidence {} outside [0, 1]",
                response.confidence
            )));
        }
        if !response.inference_time_ms.is_finite() {
            return Err(ApiError::Malformed("inference time is not a number".into()));
        }
        Ok(Self {
            predicted_label: response.predicted_label,
            confidence: response.confidence,
            inference_time_ms: response.inference_time_ms,
            correct: response.correct,
            trial_index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    pub id: usize,
    pub true_label: String,
    pub pred_label: String,
    pub correct: bool,
    pub time_ms: f64,
}

impl BatchRow {
    pub fn failed(&self) -> bool {
        self.pred_label == ERROR_LABEL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// Percent, 0-100.
    pub accuracy_pct: f64,
    pub avg_time_ms: f64,
    pub total_trials: usize,
    pub rows: Vec<BatchRow>,
}

impl BatchResult {
    pub fn from_response(response: BatchResponse) -> Result<Self, ApiError> {
        if !response.accuracy.is_finite() || !(0.0..=100.0).contains(&response.accuracy) {
            return Err(ApiError::Malformed(format!(
                "accuracy {} outside [0, 100]",
                response.accuracy
            )));
        }
        let rows: Vec<BatchRow> = response
            .results
            .into_iter()
            .map(|row| {
                let failed = row.pred_label == ERROR_LABEL;
                BatchRow {
                    id: row.id,
                    true_label: row.true_label,
                    pred_label: row.pred_label,
                    correct: row.correct && !failed,
                    time_ms: row.time_ms,
                }
            })
            .collect();
        Ok(Self {
            accuracy_pct: response.accuracy,
            avg_time_ms: response.avg_time_ms,
            total_trials: response.total_trials.unwrap_or(rows.len()),
            rows,
        })
    }

    pub fn correct_count(&self) -> usize {
        self.rows.iter().filter(|row| row.correct).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BatchRowWire;

    fn predict(confidence: f64) -> PredictResponse {
        PredictResponse {
            predicted_label: "Left hand".into(),
            confidence,
            inference_time_ms: 12.34,
            correct: false,
            predicted_class: Some(0),
            true_class: Some(1),
            true_label: Some("Right hand".into()),
        }
    }

    #[test]
    fn model_name_drops_prefix() {
        let loaded = LoadedModel::from_response(LoadModelResponse {
            message: "Model selected: Float16 (TFLite)".into(),
            data_load_time: 1.234,
        });
        assert_eq!(loaded.name, "Float16 (TFLite)");
        let loaded = LoadedModel::from_response(LoadModelResponse {
            message: "custom".into(),
            data_load_time: 0.0,
        });
        assert_eq!(loaded.name, "custom");
    }

    #[test]
    fn confidence_must_be_a_fraction() {
        assert!(PredictionResult::from_response(predict(0.873), 4).is_ok());
        assert!(matches!(
            PredictionResult::from_response(predict(87.3), 4),
            Err(ApiError::Malformed(_))
        ));
        assert!(PredictionResult::from_response(predict(f64::NAN), 4).is_err());
    }

    #[test]
    fn failed_rows_are_never_correct() {
        let result = BatchResult::from_response(BatchResponse {
            accuracy: 50.0,
            avg_time_ms: 2.0,
            results: vec![
                BatchRowWire {
                    id: 0,
                    true_label: "Foot".into(),
                    pred_label: "Foot".into(),
                    correct: true,
                    time_ms: 2.0,
                },
                BatchRowWire {
                    id: 1,
                    true_label: "Tongue".into(),
                    pred_label: ERROR_LABEL.into(),
                    correct: true,
                    time_ms: 0.0,
                },
            ],
            total_trials: None,
        })
        .unwrap();
        assert_eq!(result.total_trials, 2);
        assert_eq!(result.correct_count(), 1);
        assert!(result.rows[1].failed());
        assert!(!result.rows[1].correct);
    }
}
