mod export;
mod plot;

use anyhow::{bail, Context, Result};
use bci_lib::policy::StrategyPolicy;
use bci_lib::{
    ApiGateway, ChannelSelection, ChartRenderer, Command, Controller, HttpGateway,
    ModelVariantCatalog, PanelConfig, SignalMatrix, Strategy, TrialCommand, ViewState,
};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use crate::plot::PngSurface;

#[derive(Parser)]
#[command(
    name = "bci",
    version,
    about = "Control panel for the BCI EEG motor-imagery classifier backend"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Config file (defaults to $BCI_PANEL_CONFIG or the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TrialMode {
    Random,
    Next,
    Prev,
    Index,
}

#[derive(Subcommand)]
enum Commands {
    /// List the model variants available for an evaluation strategy
    Models {
        /// Subject-independent (leave-one-subject-out) evaluation
        #[arg(long)]
        loso: bool,
    },
    /// Load a model, walk trials and print what the panel would show as JSON
    Session {
        #[arg(long, default_value_t = 1)]
        subject: u8,
        #[arg(long)]
        loso: bool,
        /// Model variant id (see `bci models`)
        #[arg(long)]
        model: Option<String>,
        /// Trial to fetch after the automatic random trial
        #[arg(long, value_enum)]
        trial: Option<TrialMode>,
        /// Target index for `--trial index`
        #[arg(long)]
        index: Option<usize>,
        /// Repeat the trial command this many times
        #[arg(long, default_value_t = 1)]
        steps: usize,
        #[arg(long)]
        predict: bool,
        #[arg(long)]
        batch: bool,
        /// Write the final trial chart to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
        /// Write the batch rows to this CSV
        #[arg(long)]
        batch_csv: Option<PathBuf>,
        /// Draw axis labels and the channel legend (needs system fonts)
        #[arg(long)]
        labels: bool,
    },
    /// Draw a channel-major JSON matrix (or a saved trial response) to PNG
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// `all` or a comma separated list such as `C3,Cz,C4`
        #[arg(long)]
        channels: Option<String>,
        #[arg(long)]
        labels: bool,
        #[arg(long, default_value_t = plot::DEFAULT_SIZE.0)]
        width: u32,
        #[arg(long, default_value_t = plot::DEFAULT_SIZE.1)]
        height: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let mut config = PanelConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend_url = backend;
        config.validate()?;
    }

    match cli.command {
        Commands::Models { loso } => cmd_models(&config, loso),
        Commands::Session {
            subject,
            loso,
            model,
            trial,
            index,
            steps,
            predict,
            batch,
            plot,
            batch_csv,
            labels,
        } => {
            let trial = match (trial, index) {
                (Some(TrialMode::Index), Some(index)) => Some(TrialCommand::GoToIndex(index)),
                (Some(TrialMode::Index), None) => bail!("--trial index requires --index"),
                (Some(TrialMode::Random), _) => Some(TrialCommand::Random),
                (Some(TrialMode::Next), _) => Some(TrialCommand::Next),
                (Some(TrialMode::Prev), _) => Some(TrialCommand::Prev),
                (None, Some(index)) => Some(TrialCommand::GoToIndex(index)),
                (None, None) => None,
            };
            let plan = SessionPlan {
                subject,
                strategy: Strategy::from_loso(loso),
                model,
                trial,
                steps: steps.max(1),
                predict,
                batch,
            };
            let surface = PngSurface::new(plot).with_text(labels);
            cmd_session(&config, plan, surface, batch_csv.as_deref())
        }
        Commands::Render {
            input,
            out,
            channels,
            labels,
            width,
            height,
        } => cmd_render(&config, &input, out, channels, labels, (width, height)),
    }
}

fn cmd_models(config: &PanelConfig, loso: bool) -> Result<()> {
    let gateway = HttpGateway::from_config(config);
    let init = gateway
        .init()
        .map_err(|err| anyhow::anyhow!(err.user_message()))
        .context("fetching model catalog")?;
    let catalog = ModelVariantCatalog::new(init.model_types);
    let mut state = ViewState::default();
    state.set_strategy(Strategy::from_loso(loso));
    let policy = StrategyPolicy::of(&state);
    let subjects: Vec<u8> = policy.allowed_subjects().collect();
    let output = json!({
        "strategy": state.strategy(),
        "subjects": subjects,
        "models": policy.allowed_model_variants(&catalog),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

struct SessionPlan {
    subject: u8,
    strategy: Strategy,
    model: Option<String>,
    trial: Option<TrialCommand>,
    steps: usize,
    predict: bool,
    batch: bool,
}

fn cmd_session(
    config: &PanelConfig,
    plan: SessionPlan,
    surface: PngSurface,
    batch_csv: Option<&Path>,
) -> Result<()> {
    let gateway = HttpGateway::from_config(config);
    let mut controller = Controller::from_config(config, surface);

    if let Err(err) = controller.dispatch(&gateway, Command::RefreshCatalog) {
        warn!("using built-in model list: {}", err.user_message());
    }

    let mut commands = vec![
        Command::SelectStrategy(plan.strategy),
        Command::SelectSubject(plan.subject),
    ];
    if let Some(model) = plan.model {
        commands.push(Command::SelectModelVariant(model));
    }
    commands.push(Command::LoadModel);
    if let Some(trial) = plan.trial {
        commands.extend(std::iter::repeat(Command::FetchTrial(trial)).take(plan.steps));
    }
    if plan.predict {
        commands.push(Command::Predict);
    }
    if plan.batch {
        commands.push(Command::RunBatch);
    }

    for command in commands {
        let label = format!("{command:?}");
        controller
            .dispatch(&gateway, command)
            .map_err(|err| anyhow::anyhow!(err.user_message()))
            .with_context(|| format!("running {label}"))?;
    }

    let surface = controller.chart_mut().surface_mut();
    if let Some(err) = surface.take_error() {
        bail!("writing chart: {err}");
    }
    if let Some(path) = surface.target() {
        info!("trial chart written to {}", path.display());
    }

    if let (Some(path), Some(batch)) = (batch_csv, controller.batch()) {
        export::write_batch_csv(path, batch)?;
        info!("batch results written to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
    Ok(())
}

/// Either a bare `[[f64]]` matrix or a saved `/api/get_trial` response.
#[derive(Deserialize)]
#[serde(untagged)]
enum RenderInput {
    Matrix(SignalMatrix),
    Trial { eeg_data: SignalMatrix },
}

fn cmd_render(
    config: &PanelConfig,
    input: &Path,
    out: PathBuf,
    channels: Option<String>,
    labels: bool,
    size: (u32, u32),
) -> Result<()> {
    let contents =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let matrix = match serde_json::from_str::<RenderInput>(&contents)
        .with_context(|| format!("parsing {}", input.display()))?
    {
        RenderInput::Matrix(matrix) => matrix,
        RenderInput::Trial { eeg_data } => eeg_data,
    };
    let selection = match channels {
        Some(channels) => ChannelSelection::parse(&channels),
        None => config.channel_selection(),
    };
    let surface = PngSurface::new(Some(out.clone()))
        .with_text(labels)
        .with_size(size.0, size.1);
    let mut renderer = ChartRenderer::new(surface)
        .with_selection(selection)
        .with_max_points(config.max_chart_points);
    let figure = renderer.build(&matrix, None)?;
    renderer.present(&figure);
    if let Some(err) = renderer.surface_mut().take_error() {
        bail!("writing {}: {err}", out.display());
    }

    let channel_names: Vec<&str> = figure.lines().map(|line| line.name.as_str()).collect();
    let output = json!({
        "out": out,
        "channels": channel_names,
        "timesteps": matrix.timestep_count(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
