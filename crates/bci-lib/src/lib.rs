pub mod api;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod controller;
pub mod display;
pub mod navigator;
pub mod plot;
pub mod policy;
pub mod results;
pub mod signal;
pub mod state;

pub use api::{ApiError, ApiGateway, HttpGateway};
pub use catalog::{ModelVariant, ModelVariantCatalog};
pub use chart::{ChannelSelection, ChartError, ChartRenderer};
pub use config::PanelConfig;
pub use controller::{
    Command, Completion, Controller, ControllerError, Controls, ModelStatus, PanelSnapshot,
    PendingRequest, StalePolicy, Tab,
};
pub use navigator::TrialCommand;
pub use plot::{ChartHandle, ChartSurface, Figure, FigureSlot};
pub use results::{BatchResult, LoadedModel, PredictionResult};
pub use signal::{SignalMatrix, TrialSample};
pub use state::{Strategy, ViewState};
