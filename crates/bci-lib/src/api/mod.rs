//! Request/response contract of the inference backend.

mod http;

pub use http::HttpGateway;

use crate::catalog::ModelVariant;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CONNECTIVITY_MESSAGE: &str = "Failed to connect to server";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InitResponse {
    pub model_types: Vec<ModelVariant>,
    #[serde(default)]
    pub subjects: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadModelRequest {
    pub subject: u8,
    pub loso: bool,
    pub model_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadModelResponse {
    pub message: String,
    /// Seconds.
    pub data_load_time: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialMode {
    Random,
    Next,
    Prev,
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialRequest {
    pub mode: TrialMode,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrialResponse {
    pub trial_index: usize,
    pub total_trials: usize,
    pub true_label_name: String,
    pub eeg_data: Vec<Vec<f64>>,
    #[serde(default)]
    pub true_label: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictRequest {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictResponse {
    pub predicted_label: String,
    pub confidence: f64,
    pub inference_time_ms: f64,
    pub correct: bool,
    #[serde(default)]
    pub predicted_class: Option<usize>,
    #[serde(default)]
    pub true_class: Option<usize>,
    #[serde(default)]
    pub true_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchRowWire {
    pub id: usize,
    #[serde(rename = "true")]
    pub true_label: String,
    #[serde(rename = "pred")]
    pub pred_label: String,
    pub correct: bool,
    pub time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchResponse {
    /// Percent, 0-100.
    pub accuracy: f64,
    pub avg_time_ms: f64,
    pub results: Vec<BatchRowWire>,
    #[serde(default)]
    pub total_trials: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("failed to connect to server: {0}")]
    Transport(String),
    /// Non-2xx answer; `message` is the backend's `error` field.
    #[error("{message}")]
    Backend { status: u16, message: String },
    /// The body could not be decoded or failed validation.
    #[error("unexpected response from server: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => CONNECTIVITY_MESSAGE.to_string(),
            ApiError::Backend { message, .. } => message.clone(),
            ApiError::Malformed(_) => "Unexpected response from server".to_string(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Malformed(_))
    }

    pub(crate) fn from_error_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => ApiError::Backend {
                status,
                message: parsed.error,
            },
            Err(_) => ApiError::Backend {
                status,
                message: format!("HTTP {status}"),
            },
        }
    }
}

/// The backend endpoints the panel consumes.
pub trait ApiGateway {
    fn init(&self) -> Result<InitResponse, ApiError>;
    fn load_model(&self, request: &LoadModelRequest) -> Result<LoadModelResponse, ApiError>;
    fn get_trial(&self, request: &TrialRequest) -> Result<TrialResponse, ApiError>;
    fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, ApiError>;
    fn predict_all(&self) -> Result<BatchResponse, ApiError>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Init,
    LoadModel,
    Trial,
    Predict,
    Batch,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Init => "init",
            RequestKind::LoadModel => "load model",
            RequestKind::Trial => "trial",
            RequestKind::Predict => "predict",
            RequestKind::Batch => "batch",
        };
        f.write_str(name)
    }
}

/// One backend call, detached from the gateway that will run it.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Init,
    LoadModel(LoadModelRequest),
    GetTrial(TrialRequest),
    Predict(PredictRequest),
    PredictAll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Init(InitResponse),
    LoadModel(LoadModelResponse),
    GetTrial(TrialResponse),
    Predict(PredictResponse),
    PredictAll(BatchResponse),
}

impl ApiRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ApiRequest::Init => RequestKind::Init,
            ApiRequest::LoadModel(_) => RequestKind::LoadModel,
            ApiRequest::GetTrial(_) => RequestKind::Trial,
            ApiRequest::Predict(_) => RequestKind::Predict,
            ApiRequest::PredictAll => RequestKind::Batch,
        }
    }

    pub fn execute<G: ApiGateway + ?Sized>(&self, gateway: &G) -> Result<ApiResponse, ApiError> {
        match self {
            ApiRequest::Init => gateway.init().map(ApiResponse::Init),
            ApiRequest::LoadModel(request) => {
                gateway.load_model(request).map(ApiResponse::LoadModel)
            }
            ApiRequest::GetTrial(request) => gateway.get_trial(request).map(ApiResponse::GetTrial),
            ApiRequest::Predict(request) => gateway.predict(request).map(ApiResponse::Predict),
            ApiRequest::PredictAll => gateway.predict_all().map(ApiResponse::PredictAll),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_request_wire_shape() {
        let request = TrialRequest {
            mode: TrialMode::Prev,
            index: 3,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"mode":"prev","index":3}"#
        );
    }

    #[test]
    fn load_request_wire_shape() {
        let request = LoadModelRequest {
            subject: 1,
            loso: false,
            model_type: "original".into(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"subject":1,"loso":false,"model_type":"original"}"#
        );
    }

    #[test]
    fn batch_rows_use_short_field_names() {
        let json = r#"{
            "accuracy": 76.0,
            "avg_time_ms": 3.25,
            "total_trials": 2,
            "results": [
                {"id": 0, "true": "Foot", "pred": "Foot", "correct": true, "time_ms": 3.1},
                {"id": 1, "true": "Tongue", "pred": "ERROR", "correct": false, "time_ms": 0}
            ]
        }"#;
        let parsed: BatchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[1].pred_label, "ERROR");
        assert_eq!(parsed.total_trials, Some(2));
    }

    #[test]
    fn error_body_is_surfaced_verbatim() {
        let err = ApiError::from_error_body(404, r#"{"error": "Model file not found: x.keras"}"#);
        assert_eq!(err.user_message(), "Model file not found: x.keras");
        let err = ApiError::from_error_body(502, "<html>bad gateway</html>");
        assert_eq!(err.user_message(), "HTTP 502");
        assert!(!err.is_connectivity());
        assert_eq!(
            ApiError::Transport("refused".into()).user_message(),
            CONNECTIVITY_MESSAGE
        );
    }
}
