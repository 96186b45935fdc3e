//! Blocking HTTP implementation of [`ApiGateway`].

use super::{
    ApiError, ApiGateway, BatchResponse, InitResponse, LoadModelRequest, LoadModelResponse,
    PredictRequest, PredictResponse, TrialRequest, TrialResponse,
};
use crate::config::PanelConfig;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpGateway {
    agent: ureq::Agent,
    base_url: String,
    request_timeout: Duration,
    batch_timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = PanelConfig {
            backend_url: base_url.into(),
            ..PanelConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout())
            .build();
        Self {
            agent,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
            batch_timeout: config.batch_timeout(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!("GET {url}");
        let result = self
            .agent
            .get(&url)
            .timeout(self.request_timeout)
            .set("Accept", "application/json")
            .call();
        decode(result)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!("POST {url}");
        let result = self
            .agent
            .post(&url)
            .timeout(self.request_timeout)
            .set("Accept", "application/json")
            .send_json(body);
        decode(result)
    }
}

fn decode<T: DeserializeOwned>(result: Result<ureq::Response, ureq::Error>) -> Result<T, ApiError> {
    match result {
        Ok(response) => {
            let body = response
                .into_string()
                .map_err(|err| ApiError::Malformed(err.to_string()))?;
            serde_json::from_str(&body).map_err(|err| ApiError::Malformed(err.to_string()))
        }
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(ApiError::from_error_body(code, &body))
        }
        Err(ureq::Error::Transport(err)) => Err(ApiError::Transport(err.to_string())),
    }
}

impl ApiGateway for HttpGateway {
    fn init(&self) -> Result<InitResponse, ApiError> {
        self.get_json("/api/init")
    }

    fn load_model(&self, request: &LoadModelRequest) -> Result<LoadModelResponse, ApiError> {
        self.post_json("/api/load_model", request)
    }

    fn get_trial(&self, request: &TrialRequest) -> Result<TrialResponse, ApiError> {
        self.post_json("/api/get_trial", request)
    }

    fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, ApiError> {
        self.post_json("/api/predict", request)
    }

    fn predict_all(&self) -> Result<BatchResponse, ApiError> {
        // Runs inference over the whole test split; can take minutes.
        let url = self.url("/api/predict_all");
        debug!("POST {url}");
        let result = self
            .agent
            .post(&url)
            .timeout(self.batch_timeout)
            .set("Accept", "application/json")
            .call();
        decode(result)
    }
}
