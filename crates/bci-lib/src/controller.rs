//! Panel state machine.
//!
//! Every request-bearing command runs in two phases. [`Controller::begin`] validates the
//! command against the current state and hands back a [`PendingRequest`];
//! [`Controller::complete`] applies the response once it arrives. Front ends that block can use
//! [`Controller::dispatch`], which runs both phases (and any chained follow-up) in place.

use crate::api::{
    ApiError, ApiGateway, ApiRequest, ApiResponse, LoadModelRequest, PredictRequest, RequestKind,
};
use crate::catalog::ModelVariantCatalog;
use crate::chart::{ChartError, ChartRenderer};
use crate::config::PanelConfig;
use crate::display::{BatchSummaryView, ModelStatusView, PredictionView, TrialView};
use crate::navigator::{self, TrialCommand};
use crate::plot::ChartSurface;
use crate::policy::StrategyPolicy;
use crate::results::{BatchResult, LoadedModel, PredictionResult};
use crate::signal::TrialSample;
use crate::state::{StateError, Strategy, ViewState};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    NoModelLoaded,
    ModelLoading,
    ModelReady,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    SingleTrial,
    Batch,
}

impl Tab {
    pub fn label(self) -> &'static str {
        match self {
            Tab::SingleTrial => "Single Trial",
            Tab::Batch => "Batch",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectStrategy(Strategy),
    SelectSubject(u8),
    AdjustSubject(i32),
    SelectModelVariant(String),
    RefreshCatalog,
    LoadModel,
    FetchTrial(TrialCommand),
    Predict,
    RunBatch,
    SwitchTab(Tab),
}

/// What happens to a response that is no longer the latest of its kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Last write wins.
    #[default]
    Apply,
    Discard,
}

impl StalePolicy {
    pub fn from_discard(discard: bool) -> Self {
        if discard {
            StalePolicy::Discard
        } else {
            StalePolicy::Apply
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("no model is loaded")]
    ModelNotReady,
    #[error("a model is already loading")]
    ModelLoading,
    #[error("a {0} request is already in flight")]
    Busy(RequestKind),
    #[error("no trial is loaded")]
    NoTrial,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("cannot draw trial: {0}")]
    Chart(#[from] ChartError),
}

impl ControllerError {
    pub fn user_message(&self) -> String {
        match self {
            ControllerError::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// A request that has been validated and registered but not yet sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Monotonic across all requests; the latest per kind is the one that counts.
    pub seq: u64,
    /// Model generation the request was issued against.
    pub epoch: u64,
    /// Trial a prediction was requested for.
    pub trial_index: Option<usize>,
    pub request: ApiRequest,
}

impl PendingRequest {
    pub fn kind(&self) -> RequestKind {
        self.request.kind()
    }

    pub fn execute<G: ApiGateway + ?Sized>(self, gateway: &G) -> Completion {
        let result = self.request.execute(gateway);
        Completion {
            pending: self,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub pending: PendingRequest,
    pub result: Result<ApiResponse, ApiError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub load_enabled: bool,
    /// Subject stepping; off under subject-independent evaluation.
    pub navigation_enabled: bool,
    pub subject_selector_enabled: bool,
    pub trial_enabled: bool,
    pub predict_enabled: bool,
    pub batch_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    /// Request whose success clears the notice; `None` for rejected commands.
    pub kind: Option<RequestKind>,
    pub message: String,
}

/// Everything the panels display, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub state: ViewState,
    pub tab: Tab,
    pub model: ModelStatusView,
    pub trial: TrialView,
    pub prediction: PredictionView,
    pub batch: BatchSummaryView,
    pub controls: Controls,
    pub error: Option<String>,
}

pub struct Controller<S: ChartSurface> {
    state: ViewState,
    catalog: ModelVariantCatalog,
    status: ModelStatus,
    status_before_load: ModelStatus,
    load_failed: bool,
    tab: Tab,
    loaded_model: Option<LoadedModel>,
    trial: Option<TrialSample>,
    prediction: Option<PredictionResult>,
    batch: Option<BatchResult>,
    batch_failed: bool,
    chart: ChartRenderer<S>,
    stale_policy: StalePolicy,
    next_seq: u64,
    epoch: u64,
    in_flight: HashMap<RequestKind, u64>,
    notice: Option<Notice>,
}

impl<S: ChartSurface> Controller<S> {
    pub fn new(surface: S) -> Self {
        Self::with_renderer(ChartRenderer::new(surface), StalePolicy::default())
    }

    pub fn from_config(config: &PanelConfig, surface: S) -> Self {
        let renderer = ChartRenderer::new(surface)
            .with_selection(config.channel_selection())
            .with_max_points(config.max_chart_points);
        Self::with_renderer(
            renderer,
            StalePolicy::from_discard(config.discard_stale_responses),
        )
    }

    pub fn with_renderer(chart: ChartRenderer<S>, stale_policy: StalePolicy) -> Self {
        Self {
            state: ViewState::default(),
            catalog: ModelVariantCatalog::builtin(),
            status: ModelStatus::NoModelLoaded,
            status_before_load: ModelStatus::NoModelLoaded,
            load_failed: false,
            tab: Tab::default(),
            loaded_model: None,
            trial: None,
            prediction: None,
            batch: None,
            batch_failed: false,
            chart,
            stale_policy,
            next_seq: 0,
            epoch: 0,
            in_flight: HashMap::new(),
            notice: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn policy(&self) -> StrategyPolicy<'_> {
        StrategyPolicy::of(&self.state)
    }

    pub fn catalog(&self) -> &ModelVariantCatalog {
        &self.catalog
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn loaded_model(&self) -> Option<&LoadedModel> {
        self.loaded_model.as_ref()
    }

    pub fn trial(&self) -> Option<&TrialSample> {
        self.trial.as_ref()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn batch(&self) -> Option<&BatchResult> {
        self.batch.as_ref()
    }

    pub fn chart(&self) -> &ChartRenderer<S> {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut ChartRenderer<S> {
        &mut self.chart
    }

    pub fn is_busy(&self, kind: RequestKind) -> bool {
        self.in_flight.contains_key(&kind)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.notice.as_ref().map(|notice| notice.message.as_str())
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.notice = None;
    }

    pub fn controls(&self) -> Controls {
        let ready = self.status == ModelStatus::ModelReady;
        let loading = self.status == ModelStatus::ModelLoading;
        let navigation = self.policy().is_navigation_enabled();
        Controls {
            load_enabled: !loading,
            navigation_enabled: navigation,
            subject_selector_enabled: navigation && !loading,
            trial_enabled: ready && !self.is_busy(RequestKind::Trial),
            predict_enabled: ready && self.trial.is_some() && !self.is_busy(RequestKind::Predict),
            batch_enabled: ready && !self.is_busy(RequestKind::Batch),
        }
    }

    pub fn prediction_view(&self) -> PredictionView {
        PredictionView::from_result(self.prediction.as_ref())
    }

    pub fn batch_view(&self) -> BatchSummaryView {
        BatchSummaryView::build(
            self.batch.as_ref(),
            self.is_busy(RequestKind::Batch),
            self.batch_failed,
        )
    }

    pub fn trial_view(&self) -> TrialView {
        TrialView::build(&self.state, self.trial.as_ref())
    }

    pub fn model_status_view(&self) -> ModelStatusView {
        ModelStatusView::build(self.status, self.loaded_model.as_ref(), self.load_failed)
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            state: self.state.clone(),
            tab: self.tab,
            model: self.model_status_view(),
            trial: self.trial_view(),
            prediction: self.prediction_view(),
            batch: self.batch_view(),
            controls: self.controls(),
            error: self.last_error().map(str::to_string),
        }
    }

    /// Validates `command` and applies its local effects. Returns the request to send, if any.
    pub fn begin(&mut self, command: Command) -> Result<Option<PendingRequest>, ControllerError> {
        debug!("command {command:?}");
        let outcome = self.begin_inner(command);
        if let Err(err) = &outcome {
            warn!("command rejected: {err}");
            self.notice = Some(Notice {
                kind: None,
                message: err.user_message(),
            });
        }
        outcome
    }

    fn begin_inner(&mut self, command: Command) -> Result<Option<PendingRequest>, ControllerError> {
        match command {
            Command::SelectStrategy(strategy) => {
                self.state.set_strategy(strategy);
                Ok(None)
            }
            Command::SelectSubject(subject) => {
                self.state.select_subject(subject)?;
                Ok(None)
            }
            Command::AdjustSubject(delta) => {
                if !self.state.adjust_subject(delta) {
                    debug!("subject locked under {}", self.state.strategy().label());
                }
                Ok(None)
            }
            Command::SelectModelVariant(variant) => {
                self.state.select_model_variant(&variant, &self.catalog)?;
                Ok(None)
            }
            Command::SwitchTab(tab) => {
                self.tab = tab;
                Ok(None)
            }
            Command::RefreshCatalog => self.issue(ApiRequest::Init, None).map(Some),
            Command::LoadModel => {
                if self.status == ModelStatus::ModelLoading {
                    return Err(ControllerError::ModelLoading);
                }
                let request = ApiRequest::LoadModel(LoadModelRequest {
                    subject: self.state.subject_id(),
                    loso: self.state.is_independent(),
                    model_type: self.state.model_variant().to_string(),
                });
                let pending = self.issue(request, None)?;
                self.status_before_load = self.status;
                self.status = ModelStatus::ModelLoading;
                self.load_failed = false;
                Ok(Some(pending))
            }
            Command::FetchTrial(trial_command) => {
                self.require_ready()?;
                let request = navigator::resolve(trial_command, &self.state);
                self.issue(ApiRequest::GetTrial(request), None).map(Some)
            }
            Command::Predict => {
                self.require_ready()?;
                if self.trial.is_none() {
                    return Err(ControllerError::NoTrial);
                }
                let index = self.state.current_trial_index();
                self.issue(ApiRequest::Predict(PredictRequest { index }), Some(index))
                    .map(Some)
            }
            Command::RunBatch => {
                self.require_ready()?;
                let pending = self.issue(ApiRequest::PredictAll, None)?;
                self.batch_failed = false;
                Ok(Some(pending))
            }
        }
    }

    fn require_ready(&self) -> Result<(), ControllerError> {
        match self.status {
            ModelStatus::ModelReady => Ok(()),
            ModelStatus::ModelLoading => Err(ControllerError::ModelLoading),
            ModelStatus::NoModelLoaded => Err(ControllerError::ModelNotReady),
        }
    }

    fn issue(
        &mut self,
        request: ApiRequest,
        trial_index: Option<usize>,
    ) -> Result<PendingRequest, ControllerError> {
        let kind = request.kind();
        if self.is_busy(kind) {
            return Err(ControllerError::Busy(kind));
        }
        Ok(self.register(request, trial_index))
    }

    /// Registers a request as the latest of its kind, superseding any in flight.
    fn register(&mut self, request: ApiRequest, trial_index: Option<usize>) -> PendingRequest {
        self.next_seq += 1;
        let pending = PendingRequest {
            seq: self.next_seq,
            epoch: self.epoch,
            trial_index,
            request,
        };
        self.in_flight.insert(pending.kind(), pending.seq);
        debug!("{} request #{} issued", pending.kind(), pending.seq);
        pending
    }

    /// Applies a finished request. May return a follow-up request to send.
    pub fn complete(
        &mut self,
        completion: Completion,
    ) -> Result<Option<PendingRequest>, ControllerError> {
        let Completion { pending, result } = completion;
        let kind = pending.kind();
        let latest = self.in_flight.get(&kind) == Some(&pending.seq);
        if latest {
            self.in_flight.remove(&kind);
        }
        let stale = !latest || pending.epoch != self.epoch;
        if stale && self.stale_policy == StalePolicy::Discard {
            warn!("discarding stale {kind} response #{}", pending.seq);
            return Ok(None);
        }

        let outcome = match result {
            Ok(response) => {
                let applied = self.apply(&pending, response);
                if applied.is_err() {
                    self.on_failure(kind, latest);
                }
                applied
            }
            Err(err) => {
                self.on_failure(kind, latest);
                Err(ControllerError::Api(err))
            }
        };
        match &outcome {
            Ok(_) => {
                if self
                    .notice
                    .as_ref()
                    .is_some_and(|notice| notice.kind.is_none() || notice.kind == Some(kind))
                {
                    self.notice = None;
                }
            }
            Err(err) => {
                warn!("{kind} request #{} failed: {err}", pending.seq);
                self.notice = Some(Notice {
                    kind: Some(kind),
                    message: err.user_message(),
                });
            }
        }
        outcome
    }

    fn on_failure(&mut self, kind: RequestKind, latest: bool) {
        match kind {
            RequestKind::LoadModel if latest => {
                self.status = self.status_before_load;
                self.load_failed = true;
            }
            RequestKind::Batch if latest => self.batch_failed = true,
            _ => {}
        }
    }

    fn apply(
        &mut self,
        pending: &PendingRequest,
        response: ApiResponse,
    ) -> Result<Option<PendingRequest>, ControllerError> {
        match response {
            ApiResponse::Init(init) => {
                if init.model_types.is_empty() {
                    warn!("backend reported no model variants, keeping the built-in list");
                } else {
                    self.catalog = ModelVariantCatalog::new(init.model_types);
                    self.state.reconcile_variant(&self.catalog);
                }
                Ok(None)
            }
            ApiResponse::LoadModel(load) => {
                let model = LoadedModel::from_response(load);
                info!(
                    "model ready: {} (data loaded in {:.2}s)",
                    model.name, model.data_load_time_s
                );
                self.loaded_model = Some(model);
                self.status = ModelStatus::ModelReady;
                self.load_failed = false;
                self.epoch += 1;
                self.trial = None;
                self.chart.clear();
                self.prediction = None;
                self.batch = None;
                self.batch_failed = false;
                let request = navigator::resolve(TrialCommand::Random, &self.state);
                Ok(Some(self.register(ApiRequest::GetTrial(request), None)))
            }
            ApiResponse::GetTrial(response) => {
                let sample = TrialSample::from_response(response)?;
                let figure = self.chart.build(&sample.signal, None)?;
                self.state
                    .apply_trial_position(sample.trial_index, sample.total_trials)?;
                self.prediction = None;
                info!(
                    "trial {} / {} ({})",
                    sample.trial_index + 1,
                    sample.total_trials,
                    sample.true_label_name
                );
                self.trial = Some(sample);
                self.chart.present(&figure);
                Ok(None)
            }
            ApiResponse::Predict(response) => {
                let trial_index = pending
                    .trial_index
                    .unwrap_or_else(|| self.state.current_trial_index());
                if self.stale_policy == StalePolicy::Discard
                    && trial_index != self.state.current_trial_index()
                {
                    warn!("discarding prediction for trial {trial_index}, no longer shown");
                    return Ok(None);
                }
                self.prediction = Some(PredictionResult::from_response(response, trial_index)?);
                Ok(None)
            }
            ApiResponse::PredictAll(response) => {
                let result = BatchResult::from_response(response)?;
                info!(
                    "batch finished: {:.2}% over {} trials",
                    result.accuracy_pct, result.total_trials
                );
                self.batch = Some(result);
                self.batch_failed = false;
                Ok(None)
            }
        }
    }

    /// Runs `command` to completion through `gateway`, following chained requests.
    pub fn dispatch<G: ApiGateway + ?Sized>(
        &mut self,
        gateway: &G,
        command: Command,
    ) -> Result<(), ControllerError> {
        let mut next = self.begin(command)?;
        while let Some(pending) = next {
            let completion = pending.execute(gateway);
            next = self.complete(completion)?;
        }
        Ok(())
    }
}
