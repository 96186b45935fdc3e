use bci_lib::display::{BatchSummaryView, PredictionView, Verdict};
use bci_lib::plot::{Figure, LegendPosition, Series, Style};
use bci_lib::{
    Command, Controller, HttpGateway, ModelStatus, PanelConfig, Strategy, Tab, TrialCommand,
};
use eframe::{egui, egui::ViewportBuilder};
use egui_plot::{Corner, Legend, Line, Plot};
use log::{error, info};

mod router;
mod store;

use router::RequestRouter;
use store::Store;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = PanelConfig::load(None).unwrap_or_else(|err| {
        error!("{err}; falling back to defaults");
        PanelConfig::default()
    });
    info!("backend at {}", config.backend_url);
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_inner_size([1200.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "BCI EEG Classifier",
        native_options,
        Box::new(move |cc| Ok(Box::new(PanelApp::new(&config, cc.egui_ctx.clone())))),
    )
}

struct PanelApp {
    router: RequestRouter,
    index_input: String,
    synced_trials: u64,
}

impl PanelApp {
    fn new(config: &PanelConfig, ctx: egui::Context) -> Self {
        let controller = Controller::from_config(config, Store::new());
        let gateway = HttpGateway::from_config(config);
        let mut router = RequestRouter::new(controller, gateway, Some(ctx));
        router.submit(Command::RefreshCatalog);
        Self {
            router,
            index_input: "0".to_string(),
            synced_trials: 0,
        }
    }

    /// Mirrors the served trial into the index field after every trial fetch, so an index
    /// the backend clamped shows up as the index actually served.
    fn sync_index_input(&mut self) {
        let landed = self.router.trials_landed();
        if landed != self.synced_trials {
            self.synced_trials = landed;
            if self.router.trial().is_some() {
                self.index_input = self.router.trial_view().index_input;
            }
        }
    }

    fn show_controls(&self, ctx: &egui::Context, commands: &mut Vec<Command>) {
        let router = &self.router;
        egui::SidePanel::left("controls")
            .min_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Model");
                let controls = router.controls();

                ui.label("Evaluation");
                let current = router.state().strategy();
                for strategy in Strategy::all() {
                    if ui
                        .radio(current == strategy, strategy.label())
                        .clicked()
                        && current != strategy
                    {
                        commands.push(Command::SelectStrategy(strategy));
                    }
                }

                ui.separator();
                ui.horizontal(|ui| {
                    let enabled = controls.subject_selector_enabled;
                    if ui.add_enabled(enabled, egui::Button::new("◀")).clicked() {
                        commands.push(Command::AdjustSubject(-1));
                    }
                    ui.label(format!("Subject {}", router.state().subject_id()));
                    if ui.add_enabled(enabled, egui::Button::new("▶")).clicked() {
                        commands.push(Command::AdjustSubject(1));
                    }
                });

                let catalog = router.catalog();
                let selected = router.state().model_variant();
                egui::ComboBox::from_id_salt("model_variant")
                    .selected_text(catalog.display_name(selected))
                    .show_ui(ui, |ui| {
                        for variant in router.policy().allowed_model_variants(catalog) {
                            if ui
                                .selectable_label(variant.id == selected, &variant.display_name)
                                .clicked()
                            {
                                commands.push(Command::SelectModelVariant(variant.id.clone()));
                            }
                        }
                    });

                if ui
                    .add_enabled(controls.load_enabled, egui::Button::new("Load model"))
                    .clicked()
                {
                    commands.push(Command::LoadModel);
                }

                ui.separator();
                let status = router.model_status_view();
                let color = match (router.status(), status.status) {
                    (_, "Error") => egui::Color32::LIGHT_RED,
                    (ModelStatus::ModelReady, _) => egui::Color32::LIGHT_GREEN,
                    _ => ui.visuals().text_color(),
                };
                ui.colored_label(color, format!("Status: {}", status.status));
                ui.label(format!("Model: {}", status.model_name));
                ui.label(format!("Data load time: {}", status.load_time));
            });
    }

    fn show_single_trial(&mut self, ctx: &egui::Context, commands: &mut Vec<Command>) {
        let router = &self.router;
        let index_input = &mut self.index_input;
        egui::CentralPanel::default().show(ctx, |ui| {
            let controls = router.controls();
            ui.horizontal(|ui| {
                let enabled = controls.trial_enabled;
                if ui.add_enabled(enabled, egui::Button::new("Prev")).clicked() {
                    commands.push(Command::FetchTrial(TrialCommand::Prev));
                }
                if ui.add_enabled(enabled, egui::Button::new("Next")).clicked() {
                    commands.push(Command::FetchTrial(TrialCommand::Next));
                }
                if ui.add_enabled(enabled, egui::Button::new("Random")).clicked() {
                    commands.push(Command::FetchTrial(TrialCommand::Random));
                }
                ui.separator();
                ui.add(egui::TextEdit::singleline(index_input).desired_width(60.0));
                if ui.add_enabled(enabled, egui::Button::new("Go")).clicked() {
                    match index_input.trim().parse::<usize>() {
                        Ok(index) => commands.push(Command::FetchTrial(TrialCommand::GoToIndex(index))),
                        Err(_) => *index_input = router.trial_view().index_input,
                    }
                }
            });

            let trial = router.trial_view();
            ui.horizontal(|ui| {
                ui.label(trial.position);
                ui.separator();
                ui.label(format!("True label: {}", trial.true_label));
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(controls.predict_enabled, egui::Button::new("Predict"))
                    .clicked()
                {
                    commands.push(Command::Predict);
                }
                show_prediction(ui, &router.prediction_view());
            });

            ui.separator();
            let surface = router.chart().surface();
            match (surface.figure(), surface.plot_id()) {
                (Some(figure), Some(id)) => {
                    let mut plot = Plot::new(id).show_axes([figure.x.visible, figure.y.visible]);
                    if figure.legend.visible {
                        let corner = match figure.legend.position {
                            LegendPosition::Right => Corner::RightTop,
                            LegendPosition::Top => Corner::LeftTop,
                        };
                        plot = plot.legend(Legend::default().position(corner));
                    }
                    if let Some((x, _)) = surface.bounds() {
                        plot = plot.include_x(x[0]).include_x(x[1]);
                    }
                    plot.show(ui, |plot_ui| plot_plot_figure(plot_ui, figure));
                }
                _ => {
                    ui.centered_and_justified(|ui| {
                        ui.label("Load a model to see a trial.");
                    });
                }
            }
        });
    }

    fn show_batch(&self, ctx: &egui::Context, commands: &mut Vec<Command>) {
        let router = &self.router;
        egui::CentralPanel::default().show(ctx, |ui| {
            if ui
                .add_enabled(router.controls().batch_enabled, egui::Button::new("Run all trials"))
                .clicked()
            {
                commands.push(Command::RunBatch);
            }
            ui.separator();
            show_batch_summary(ui, &router.batch_view());
        });
    }
}

fn show_prediction(ui: &mut egui::Ui, view: &PredictionView) {
    ui.label(format!("Prediction: {}", view.label));
    ui.label(format!("Confidence: {}", view.confidence));
    ui.label(format!("Time: {}", view.time));
    match view.verdict {
        Verdict::Pending => {}
        Verdict::Correct => {
            ui.colored_label(egui::Color32::LIGHT_GREEN, view.verdict.symbol());
        }
        Verdict::Incorrect => {
            ui.colored_label(egui::Color32::LIGHT_RED, view.verdict.symbol());
        }
    }
}

fn show_batch_summary(ui: &mut egui::Ui, view: &BatchSummaryView) {
    if let Some(message) = &view.message {
        ui.label(message);
        return;
    }
    ui.horizontal(|ui| {
        ui.label(format!("Accuracy: {}", view.accuracy));
        ui.separator();
        ui.label(format!("Average time: {}", view.avg_time));
    });
    egui::ScrollArea::vertical().show(ui, |ui| {
        egui::Grid::new("batch_rows").striped(true).show(ui, |ui| {
            for heading in ["Trial", "True", "Predicted", "Result", "Time (ms)"] {
                ui.strong(heading);
            }
            ui.end_row();
            for row in &view.rows {
                ui.label(&row.id);
                ui.label(&row.true_label);
                ui.label(&row.pred_label);
                let color = if row.correct {
                    egui::Color32::LIGHT_GREEN
                } else {
                    egui::Color32::LIGHT_RED
                };
                ui.colored_label(color, row.result);
                ui.label(&row.time_ms);
                ui.end_row();
            }
        });
    });
}

impl eframe::App for PanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.router.pump();
        self.sync_index_input();

        let mut commands = Vec::new();
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.heading("BCI EEG Classifier");
            ui.horizontal(|ui| {
                for tab in [Tab::SingleTrial, Tab::Batch] {
                    if ui
                        .selectable_label(self.router.tab() == tab, tab.label())
                        .clicked()
                    {
                        commands.push(Command::SwitchTab(tab));
                    }
                }
            });
        });

        let mut dismiss = false;
        egui::TopBottomPanel::bottom("bottom").show(ctx, |ui| {
            ui.horizontal(|ui| match self.router.last_error() {
                Some(message) => {
                    ui.colored_label(egui::Color32::LIGHT_RED, message);
                    if ui.small_button("Dismiss").clicked() {
                        dismiss = true;
                    }
                }
                None => {
                    ui.label(self.router.model_status_view().status);
                }
            });
        });

        self.show_controls(ctx, &mut commands);
        match self.router.tab() {
            Tab::SingleTrial => self.show_single_trial(ctx, &mut commands),
            Tab::Batch => self.show_batch(ctx, &mut commands),
        }

        if dismiss {
            self.router.dismiss_error();
        }
        for command in commands {
            self.router.submit(command);
        }
    }
}

fn plot_plot_figure(plot_ui: &mut egui_plot::PlotUi, figure: &Figure) {
    for series in &figure.series {
        match series {
            Series::Line(line) => {
                plot_ui.line(
                    Line::new(line.points.clone())
                        .stroke(stroke_from_style(&line.style))
                        .name(line.name.clone()),
                );
            }
        }
    }
}

fn stroke_from_style(style: &Style) -> egui::Stroke {
    let (r, g, b) = style.color.rgb();
    egui::Stroke::new(style.width, egui::Color32::from_rgb(r, g, b))
}
