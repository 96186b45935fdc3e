//! Text the panels show, derived from results and view state.

use crate::controller::ModelStatus;
use crate::results::{BatchResult, BatchRow, LoadedModel, PredictionResult};
use crate::signal::TrialSample;
use crate::state::ViewState;
use serde::Serialize;

pub const PLACEHOLDER: &str = "--";
pub const PLACEHOLDER_MS: &str = "-- ms";
pub const BATCH_RUNNING: &str = "Processing... this may take a while";
pub const BATCH_FAILED: &str = "Error running batch";

/// `0.873` -> `"87.3%"`.
pub fn confidence(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// `76.0` -> `"76.00%"`.
pub fn accuracy(percent: f64) -> String {
    format!("{percent:.2}%")
}

pub fn inference_time(ms: f64) -> String {
    format!("{ms:.1} ms")
}

pub fn average_time(ms: f64) -> String {
    format!("{ms:.2} ms")
}

pub fn load_time(seconds: f64) -> String {
    format!("{seconds:.2}s")
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pending,
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn symbol(self) -> &'static str {
        match self {
            Verdict::Pending => "",
            Verdict::Correct => "✓",
            Verdict::Incorrect => "✗",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub label: String,
    pub confidence: String,
    pub time: String,
    pub verdict: Verdict,
}

impl PredictionView {
    pub fn placeholder() -> Self {
        Self {
            label: PLACEHOLDER.to_string(),
            confidence: PLACEHOLDER.to_string(),
            time: PLACEHOLDER_MS.to_string(),
            verdict: Verdict::Pending,
        }
    }

    pub fn from_result(result: Option<&PredictionResult>) -> Self {
        match result {
            None => Self::placeholder(),
            Some(result) => Self {
                label: result.predicted_label.clone(),
                confidence: confidence(result.confidence),
                time: inference_time(result.inference_time_ms),
                verdict: if result.correct {
                    Verdict::Correct
                } else {
                    Verdict::Incorrect
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRowView {
    pub id: String,
    pub true_label: String,
    pub pred_label: String,
    pub result: &'static str,
    pub time_ms: String,
    pub correct: bool,
}

impl From<&BatchRow> for BatchRowView {
    fn from(row: &BatchRow) -> Self {
        Self {
            id: row.id.to_string(),
            true_label: row.true_label.clone(),
            pred_label: row.pred_label.clone(),
            result: if row.correct { "Correct" } else { "Wrong" },
            time_ms: format!("{:.1}", row.time_ms),
            correct: row.correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummaryView {
    pub accuracy: String,
    pub avg_time: String,
    pub rows: Vec<BatchRowView>,
    /// Shown in place of the table while running or after a failure.
    pub message: Option<String>,
}

impl BatchSummaryView {
    pub fn placeholder() -> Self {
        Self {
            accuracy: PLACEHOLDER.to_string(),
            avg_time: PLACEHOLDER_MS.to_string(),
            rows: Vec::new(),
            message: None,
        }
    }

    pub fn build(result: Option<&BatchResult>, running: bool, failed: bool) -> Self {
        if running {
            return Self {
                message: Some(BATCH_RUNNING.to_string()),
                ..Self::placeholder()
            };
        }
        match result {
            Some(result) if !failed => Self {
                accuracy: accuracy(result.accuracy_pct),
                avg_time: average_time(result.avg_time_ms),
                rows: result.rows.iter().map(BatchRowView::from).collect(),
                message: None,
            },
            _ if failed => Self {
                message: Some(BATCH_FAILED.to_string()),
                ..Self::placeholder()
            },
            _ => Self::placeholder(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialView {
    pub index_input: String,
    /// `"Trial 6 / 50"`, one-based for people.
    pub position: String,
    pub true_label: String,
    pub channels: usize,
    pub timesteps: usize,
}

impl TrialView {
    pub fn build(state: &ViewState, sample: Option<&TrialSample>) -> Self {
        match sample {
            None => Self {
                index_input: state.current_trial_index().to_string(),
                position: PLACEHOLDER.to_string(),
                true_label: PLACEHOLDER.to_string(),
                channels: 0,
                timesteps: 0,
            },
            Some(sample) => Self {
                index_input: sample.trial_index.to_string(),
                position: format!("Trial {} / {}", sample.trial_index + 1, sample.total_trials),
                true_label: sample.true_label_name.clone(),
                channels: sample.signal.channel_count(),
                timesteps: sample.signal.timestep_count(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatusView {
    pub status: &'static str,
    pub model_name: String,
    pub load_time: String,
}

impl ModelStatusView {
    pub fn build(status: ModelStatus, loaded: Option<&LoadedModel>, load_failed: bool) -> Self {
        let label = match status {
            ModelStatus::NoModelLoaded if load_failed => "Error",
            ModelStatus::NoModelLoaded => "Not loaded",
            ModelStatus::ModelLoading => "Loading...",
            ModelStatus::ModelReady if load_failed => "Error",
            ModelStatus::ModelReady => "Ready",
        };
        match loaded {
            Some(model) => Self {
                status: label,
                model_name: model.name.clone(),
                load_time: load_time(model.data_load_time_s),
            },
            None => Self {
                status: label,
                model_name: PLACEHOLDER.to_string(),
                load_time: PLACEHOLDER.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalMatrix;

    fn prediction(confidence: f64, correct: bool) -> PredictionResult {
        PredictionResult {
            predicted_label: "Foot".into(),
            confidence,
            inference_time_ms: 4.26,
            correct,
            trial_index: 0,
        }
    }

    #[test]
    fn prediction_formatting() {
        let view = PredictionView::from_result(Some(&prediction(0.873, false)));
        assert_eq!(view.confidence, "87.3%");
        assert_eq!(view.time, "4.3 ms");
        assert_eq!(view.verdict, Verdict::Incorrect);
        assert_eq!(view.verdict.symbol(), "✗");
    }

    #[test]
    fn empty_prediction_shows_placeholders() {
        let view = PredictionView::from_result(None);
        assert_eq!(view.label, "--");
        assert_eq!(view.confidence, "--");
        assert_eq!(view.time, "-- ms");
        assert_eq!(view.verdict, Verdict::Pending);
    }

    #[test]
    fn batch_summary_lists_every_row() {
        let result = BatchResult {
            accuracy_pct: 76.0,
            avg_time_ms: 3.256,
            total_trials: 2,
            rows: vec![
                BatchRow {
                    id: 0,
                    true_label: "Foot".into(),
                    pred_label: "Foot".into(),
                    correct: true,
                    time_ms: 3.14,
                },
                BatchRow {
                    id: 1,
                    true_label: "Tongue".into(),
                    pred_label: "Foot".into(),
                    correct: false,
                    time_ms: 3.37,
                },
            ],
        };
        let view = BatchSummaryView::build(Some(&result), false, false);
        assert_eq!(view.accuracy, "76.00%");
        assert_eq!(view.avg_time, "3.26 ms");
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].result, "Correct");
        assert_eq!(view.rows[1].result, "Wrong");
        assert_eq!(view.rows[1].time_ms, "3.4");
    }

    #[test]
    fn batch_messages() {
        let running = BatchSummaryView::build(None, true, false);
        assert_eq!(running.message.as_deref(), Some(BATCH_RUNNING));
        let failed = BatchSummaryView::build(None, false, true);
        assert_eq!(failed.message.as_deref(), Some(BATCH_FAILED));
        assert!(failed.rows.is_empty());
    }

    #[test]
    fn trial_view_tracks_sample() {
        let state = ViewState::default();
        assert_eq!(TrialView::build(&state, None).index_input, "0");
        let sample = TrialSample {
            trial_index: 5,
            total_trials: 50,
            true_label_name: "Tongue".into(),
            true_label: Some(3),
            signal: SignalMatrix::new(vec![vec![0.0; 10]; 22]),
        };
        let view = TrialView::build(&state, Some(&sample));
        assert_eq!(view.index_input, "5");
        assert_eq!(view.position, "Trial 6 / 50");
        assert_eq!((view.channels, view.timesteps), (22, 10));
    }

    #[test]
    fn model_status_labels() {
        let model = LoadedModel {
            name: "Original (Keras)".into(),
            data_load_time_s: 1.5,
        };
        let ready = ModelStatusView::build(ModelStatus::ModelReady, Some(&model), false);
        assert_eq!(ready.status, "Ready");
        assert_eq!(ready.load_time, "1.50s");
        let loading = ModelStatusView::build(ModelStatus::ModelLoading, None, false);
        assert_eq!(loading.status, "Loading...");
        let failed = ModelStatusView::build(ModelStatus::NoModelLoaded, None, true);
        assert_eq!(failed.status, "Error");
    }
}
