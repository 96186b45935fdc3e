use crate::store::Store;
use bci_lib::api::{ApiError, ApiGateway, RequestKind};
use bci_lib::{Command, Completion, Controller, PendingRequest};
use crossbeam_channel::{bounded, Receiver, Sender};
use eframe::egui;
use log::{debug, warn};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::JoinHandle;

enum WorkerCommand {
    Execute(PendingRequest),
    Shutdown,
}

/// Owns the controller and moves its requests off the UI thread.
///
/// Completions come back on a channel and are applied by [`RequestRouter::pump`] once per frame.
pub struct RequestRouter {
    controller: Controller<Store>,
    command_tx: Sender<WorkerCommand>,
    completion_rx: Receiver<Completion>,
    worker: Option<JoinHandle<()>>,
    trials_landed: u64,
}

impl RequestRouter {
    pub fn new<G>(controller: Controller<Store>, gateway: G, repaint: Option<egui::Context>) -> Self
    where
        G: ApiGateway + Send + Sync + 'static,
    {
        let (command_tx, command_rx) = bounded(32);
        let (completion_tx, completion_rx) = bounded(32);
        let gateway = Arc::new(gateway);
        let worker = std::thread::spawn(move || {
            RouterWorker {
                command_rx,
                completion_tx,
                gateway,
                repaint,
            }
            .run()
        });
        Self {
            controller,
            command_tx,
            completion_rx,
            worker: Some(worker),
            trials_landed: 0,
        }
    }

    /// Starts `command`. Rejections are kept on the controller as the current notice.
    pub fn submit(&mut self, command: Command) {
        match self.controller.begin(command) {
            Ok(Some(pending)) => self.send(pending),
            Ok(None) => {}
            Err(err) => debug!("command not started: {err}"),
        }
    }

    /// Applies every completion that has arrived since the last frame.
    pub fn pump(&mut self) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            let kind = completion.pending.kind();
            match self.controller.complete(completion) {
                Ok(Some(follow_up)) => self.send(follow_up),
                Ok(None) => {}
                Err(err) => debug!("request finished with error: {err}"),
            }
            if kind == RequestKind::Trial {
                self.trials_landed += 1;
            }
        }
        self.controller.chart_mut().surface_mut().prepare();
    }

    fn send(&mut self, pending: PendingRequest) {
        if let Err(err) = self.command_tx.send(WorkerCommand::Execute(pending)) {
            warn!("request worker is gone");
            let WorkerCommand::Execute(pending) = err.into_inner() else {
                return;
            };
            let completion = Completion {
                pending,
                result: Err(ApiError::Transport("request worker stopped".into())),
            };
            match self.controller.complete(completion) {
                Ok(Some(follow_up)) => debug!(
                    "dropping follow-up {} request #{}, worker stopped",
                    follow_up.kind(),
                    follow_up.seq
                ),
                Ok(None) => {}
                Err(err) => debug!("request finished with error: {err}"),
            }
        }
    }

    /// Number of trial fetches that have come back, successful or not.
    pub fn trials_landed(&self) -> u64 {
        self.trials_landed
    }
}

struct RouterWorker<G> {
    command_rx: Receiver<WorkerCommand>,
    completion_tx: Sender<Completion>,
    gateway: Arc<G>,
    repaint: Option<egui::Context>,
}

impl<G> RouterWorker<G>
where
    G: ApiGateway + Send + Sync + 'static,
{
    fn run(self) {
        while let Ok(command) = self.command_rx.recv() {
            match command {
                WorkerCommand::Execute(pending) => self.execute(pending),
                WorkerCommand::Shutdown => break,
            }
        }
    }

    // A batch run can take minutes; each request gets its own thread so trial navigation
    // stays responsive meanwhile.
    fn execute(&self, pending: PendingRequest) {
        let gateway = Arc::clone(&self.gateway);
        let completion_tx = self.completion_tx.clone();
        let repaint = self.repaint.clone();
        std::thread::spawn(move || {
            debug!("executing {} request #{}", pending.kind(), pending.seq);
            let completion = pending.execute(gateway.as_ref());
            if completion_tx.send(completion).is_ok() {
                if let Some(ctx) = repaint {
                    ctx.request_repaint();
                }
            }
        });
    }
}

impl Deref for RequestRouter {
    type Target = Controller<Store>;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl DerefMut for RequestRouter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.controller
    }
}

impl Drop for RequestRouter {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bci_lib::api::{
        BatchResponse, InitResponse, LoadModelRequest, LoadModelResponse, PredictRequest,
        PredictResponse, TrialRequest, TrialResponse,
    };
    use bci_lib::{ModelStatus, TrialCommand};
    use std::time::{Duration, Instant};

    struct InstantBackend;

    impl ApiGateway for InstantBackend {
        fn init(&self) -> Result<InitResponse, ApiError> {
            Err(ApiError::Transport("offline".into()))
        }

        fn load_model(&self, _request: &LoadModelRequest) -> Result<LoadModelResponse, ApiError> {
            Ok(LoadModelResponse {
                message: "Model selected: Original (Keras)".into(),
                data_load_time: 0.5,
            })
        }

        fn get_trial(&self, request: &TrialRequest) -> Result<TrialResponse, ApiError> {
            Ok(TrialResponse {
                trial_index: request.index.min(9),
                total_trials: 10,
                true_label_name: "Left hand".into(),
                eeg_data: vec![vec![0.0, 1.0, 0.0]; 22],
                true_label: Some(0),
            })
        }

        fn predict(&self, _request: &PredictRequest) -> Result<PredictResponse, ApiError> {
            Err(ApiError::Backend {
                status: 400,
                message: "No model loaded".into(),
            })
        }

        fn predict_all(&self) -> Result<BatchResponse, ApiError> {
            Err(ApiError::Backend {
                status: 400,
                message: "No model loaded".into(),
            })
        }
    }

    fn pump_until(router: &mut RequestRouter, done: impl Fn(&RequestRouter) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(router) {
            assert!(Instant::now() < deadline, "router did not settle");
            router.pump();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn load_then_auto_fetch_through_worker() {
        let mut router = RequestRouter::new(Controller::new(Store::new()), InstantBackend, None);
        router.submit(Command::LoadModel);
        assert_eq!(router.status(), ModelStatus::ModelLoading);
        pump_until(&mut router, |r| r.trial().is_some());
        assert_eq!(router.status(), ModelStatus::ModelReady);
        assert!(router.chart().surface().figure().is_some());

        router.submit(Command::FetchTrial(TrialCommand::GoToIndex(4)));
        assert!(!router.controls().trial_enabled);
        pump_until(&mut router, |r| r.controls().trial_enabled);
        assert_eq!(router.state().current_trial_index(), 4);
    }

    #[test]
    fn clamped_fetch_of_the_same_trial_still_counts() {
        let mut router = RequestRouter::new(Controller::new(Store::new()), InstantBackend, None);
        router.submit(Command::LoadModel);
        pump_until(&mut router, |r| r.trials_landed() == 1);

        router.submit(Command::FetchTrial(TrialCommand::GoToIndex(9)));
        pump_until(&mut router, |r| r.trials_landed() == 2);
        assert_eq!(router.trial_view().index_input, "9");

        router.submit(Command::FetchTrial(TrialCommand::GoToIndex(500)));
        pump_until(&mut router, |r| r.trials_landed() == 3);
        assert_eq!(router.state().current_trial_index(), 9);
        assert_eq!(router.trial_view().index_input, "9");
    }

    #[test]
    fn errors_surface_as_notices() {
        let mut router = RequestRouter::new(Controller::new(Store::new()), InstantBackend, None);
        router.submit(Command::Predict);
        assert_eq!(router.last_error(), Some("no model is loaded"));

        router.submit(Command::RefreshCatalog);
        pump_until(&mut router, |r| r.last_error() == Some("Failed to connect to server"));
        assert_eq!(router.catalog().len(), 5);
    }
}
