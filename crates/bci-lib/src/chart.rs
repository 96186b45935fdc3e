//! Multi-channel trial chart.

use crate::plot::{
    decimate_points, Axis, ChartHandle, ChartSurface, Color, Figure, Legend, LegendPosition,
    LineSeries, Series, Style,
};
use crate::signal::{MatrixShapeError, SignalMatrix};

/// BCI Competition IV 2a electrode order.
pub const CANONICAL_CHANNELS: [&str; 22] = [
    "Fz", "FC3", "FC1", "FCz", "FC2", "FC4", "C5", "C3", "C1", "Cz", "C2", "C4", "C6", "CP3",
    "CP1", "CPz", "CP2", "CP4", "P1", "Pz", "P2", "POz",
];

/// Channels over the motor strip, the compact view of a trial.
pub const MOTOR_CHANNELS: [&str; 3] = ["C3", "Cz", "C4"];

pub const DEFAULT_MAX_POINTS: usize = 2048;

const SATURATION: f64 = 0.70;
const LIGHTNESS: f64 = 0.50;
const LINE_WIDTH: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartError {
    #[error(transparent)]
    Shape(#[from] MatrixShapeError),
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
    #[error("channel '{name}' is not present in a {channels}-channel trial")]
    MissingChannel { name: String, channels: usize },
    #[error("expected {expected} channel names, got {found}")]
    NameCount { expected: usize, found: usize },
}

/// Which rows of the matrix end up on the chart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelSelection {
    #[default]
    All,
    Named(Vec<String>),
}

impl ChannelSelection {
    pub fn from_names(names: Option<Vec<String>>) -> Self {
        match names {
            Some(names) if !names.is_empty() => ChannelSelection::Named(names),
            _ => ChannelSelection::All,
        }
    }

    pub fn motor_strip() -> Self {
        ChannelSelection::Named(MOTOR_CHANNELS.iter().map(|name| name.to_string()).collect())
    }

    /// `"all"` or a comma separated list such as `"C3,Cz,C4"`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return ChannelSelection::All;
        }
        let names = trimmed
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        ChannelSelection::from_names(Some(names))
    }
}

/// Evenly spaced hue over the full circle; the same index and count always give the same color.
pub fn channel_color(index: usize, channel_count: usize) -> Color {
    let hue = (index as f64 * 360.0 / channel_count.max(1) as f64) % 360.0;
    Color::from_hsl(hue, SATURATION, LIGHTNESS)
}

/// Canonical electrode names when the matrix follows the 22-channel layout, `Ch n` otherwise.
pub fn default_channel_names(channel_count: usize) -> Vec<String> {
    (0..channel_count)
        .map(|index| {
            if channel_count >= CANONICAL_CHANNELS.len() && index < CANONICAL_CHANNELS.len() {
                CANONICAL_CHANNELS[index].to_string()
            } else {
                format!("Ch {}", index + 1)
            }
        })
        .collect()
}

fn select_rows(
    selection: &ChannelSelection,
    names: &[String],
) -> Result<Vec<usize>, ChartError> {
    match selection {
        ChannelSelection::All => Ok((0..names.len()).collect()),
        ChannelSelection::Named(wanted) => wanted
            .iter()
            .map(|name| {
                names
                    .iter()
                    .position(|candidate| candidate.eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        if CANONICAL_CHANNELS
                            .iter()
                            .any(|known| known.eq_ignore_ascii_case(name))
                        {
                            ChartError::MissingChannel {
                                name: name.clone(),
                                channels: names.len(),
                            }
                        } else {
                            ChartError::UnknownChannel(name.clone())
                        }
                    })
            })
            .collect(),
    }
}

/// Builds the line chart for one trial without touching any surface.
pub fn build_figure(
    matrix: &SignalMatrix,
    channel_names: Option<&[String]>,
    selection: &ChannelSelection,
    max_points: usize,
) -> Result<Figure, ChartError> {
    let (channels, timesteps) = matrix.shape()?;
    let names = match channel_names {
        Some(names) if names.len() != channels => {
            return Err(ChartError::NameCount {
                expected: channels,
                found: names.len(),
            })
        }
        Some(names) => names.to_vec(),
        None => default_channel_names(channels),
    };
    let rows = select_rows(selection, &names)?;

    let mut fig = Figure::new(None);
    fig.x = Axis::hidden(Some("sample".into()));
    fig.y = Axis::visible(None);
    fig.legend = Legend {
        visible: true,
        position: LegendPosition::Right,
    };
    let shown = rows.len();
    for (slot, &row) in rows.iter().enumerate() {
        let points: Vec<[f64; 2]> = matrix.rows[row]
            .iter()
            .take(timesteps)
            .enumerate()
            .map(|(i, value)| [i as f64, *value])
            .collect();
        fig.add_series(Series::Line(LineSeries {
            name: names[row].clone(),
            points: decimate_points(&points, max_points),
            style: Style {
                width: LINE_WIDTH,
                dash: None,
                color: channel_color(slot, shown),
            },
        }));
    }
    Ok(fig)
}

/// Owns the single chart attached to a surface.
pub struct ChartRenderer<S: ChartSurface> {
    surface: S,
    selection: ChannelSelection,
    max_points: usize,
    live: Option<ChartHandle>,
}

impl<S: ChartSurface> ChartRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            selection: ChannelSelection::All,
            max_points: DEFAULT_MAX_POINTS,
            live: None,
        }
    }

    pub fn with_selection(mut self, selection: ChannelSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points.max(2);
        self
    }

    pub fn selection(&self) -> &ChannelSelection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: ChannelSelection) {
        self.selection = selection;
    }

    pub fn build(
        &self,
        matrix: &SignalMatrix,
        channel_names: Option<&[String]>,
    ) -> Result<Figure, ChartError> {
        build_figure(matrix, channel_names, &self.selection, self.max_points)
    }

    /// Destroys the live chart, then mounts `figure` in its place.
    pub fn present(&mut self, figure: &Figure) -> ChartHandle {
        if let Some(previous) = self.live.take() {
            self.surface.destroy(previous);
        }
        let handle = self.surface.mount(figure);
        self.live = Some(handle);
        handle
    }

    /// A rejected matrix leaves the current chart in place.
    pub fn render(
        &mut self,
        matrix: &SignalMatrix,
        channel_names: Option<&[String]>,
    ) -> Result<ChartHandle, ChartError> {
        let figure = self.build(matrix, channel_names)?;
        Ok(self.present(&figure))
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.live.take() {
            self.surface.destroy(previous);
        }
    }

    pub fn live(&self) -> Option<ChartHandle> {
        self.live
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
