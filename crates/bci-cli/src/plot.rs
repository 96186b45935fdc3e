use anyhow::{Context, Result};
use bci_lib::plot::{ChartHandle, ChartSurface, Figure, Series};
use log::{debug, warn};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIZE: (u32, u32) = (1200, 600);

/// Renders mounted charts to a PNG file with plotters.
///
/// Each mount overwrites the target file, so the file always holds the live chart. Text (axis
/// labels and legend) is opt-in because it needs system fonts.
pub struct PngSurface {
    target: Option<PathBuf>,
    size: (u32, u32),
    with_text: bool,
    next_handle: u64,
    live: Option<ChartHandle>,
    written: usize,
    error: Option<String>,
}

impl PngSurface {
    pub fn new(target: Option<PathBuf>) -> Self {
        Self {
            target,
            size: DEFAULT_SIZE,
            with_text: false,
            next_handle: 0,
            live: None,
            written: 0,
            error: None,
        }
    }

    pub fn with_text(mut self, with_text: bool) -> Self {
        self.with_text = with_text;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width.max(16), height.max(16));
        self
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Number of charts written to the target so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Error from the most recent mount, if drawing failed.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }
}

impl ChartSurface for PngSurface {
    fn mount(&mut self, figure: &Figure) -> ChartHandle {
        self.next_handle += 1;
        let handle = ChartHandle(self.next_handle);
        self.live = Some(handle);
        if let Some(path) = &self.target {
            match draw_plotters_figure(path, figure, self.size, self.with_text) {
                Ok(()) => {
                    self.written += 1;
                    self.error = None;
                    debug!("chart written to {}", path.display());
                }
                Err(err) => {
                    warn!("failed to draw chart: {err:#}");
                    self.error = Some(format!("{err:#}"));
                }
            }
        }
        handle
    }

    fn destroy(&mut self, handle: ChartHandle) {
        if self.live == Some(handle) {
            self.live = None;
        }
    }
}

pub fn draw_plotters_figure(
    path: &Path,
    fig: &Figure,
    size: (u32, u32),
    with_text: bool,
) -> Result<()> {
    let ([x_min, x_max], [y_min, y_max]) = fig.bounds().unwrap_or(([0.0, 1.0], [0.0, 1.0]));
    let (x_max, y_max) = (widen(x_min, x_max), widen(y_min, y_max));

    let backend = BitMapBackend::new(path, size);
    let root = backend.into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("drawing {}", path.display()))?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(10);
    if with_text {
        if let Some(title) = &fig.title {
            builder.caption(title, ("sans-serif", 24));
        }
        builder
            .x_label_area_size(if fig.x.visible { 30 } else { 0 })
            .y_label_area_size(if fig.y.visible { 50 } else { 0 });
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    if with_text {
        let mut mesh = chart.configure_mesh();
        if !fig.x.visible {
            mesh.disable_x_axis();
        }
        if !fig.y.visible {
            mesh.disable_y_axis();
        }
        mesh.disable_mesh().draw()?;
    }

    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                let color = RGBColor(r, g, b);
                let width = line.style.width.round().max(1.0) as u32;
                let drawn = chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    color.stroke_width(width),
                ))?;
                if with_text && fig.legend.visible {
                    let name = line.name.clone();
                    drawn.label(name).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                    });
                }
            }
        }
    }

    if with_text && fig.legend.visible {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn widen(min: f64, max: f64) -> f64 {
    if max > min {
        max
    } else {
        min + 1.0
    }
}
