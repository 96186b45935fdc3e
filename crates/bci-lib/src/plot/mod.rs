use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
    pub visible: bool,
}

impl Axis {
    pub fn visible(label: Option<String>) -> Self {
        Self {
            label,
            visible: true,
        }
    }

    pub fn hidden(label: Option<String>) -> Self {
        Self {
            label,
            visible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }

    /// `hue` in degrees, `saturation` and `lightness` in `[0, 1]`.
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let hue = hue.rem_euclid(360.0);
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);
        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let sector = hue / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = l - chroma / 2.0;
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u32;
        Color((channel(r) << 16) | (channel(g) << 8) | channel(b))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegendPosition {
    Right,
    Top,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub visible: bool,
    pub position: LegendPosition,
}

impl Default for Legend {
    fn default() -> Self {
        Self {
            visible: true,
            position: LegendPosition::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub legend: Legend,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis::visible(None),
            y: Axis::visible(None),
            legend: Legend::default(),
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineSeries> {
        self.series.iter().map(|series| match series {
            Series::Line(line) => line,
        })
    }

    /// `([x_min, x_max], [y_min, y_max])` over every finite point.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let mut bounds: Option<([f64; 2], [f64; 2])> = None;
        for point in self.lines().flat_map(|line| line.points.iter()) {
            if !point[0].is_finite() || !point[1].is_finite() {
                continue;
            }
            let entry = bounds.get_or_insert(([point[0]; 2], [point[1]; 2]));
            entry.0[0] = entry.0[0].min(point[0]);
            entry.0[1] = entry.0[1].max(point[0]);
            entry.1[0] = entry.1[0].min(point[1]);
            entry.1[1] = entry.1[1].max(point[1]);
        }
        bounds
    }
}

/// Identifies one mounted chart instance on a surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChartHandle(pub u64);

/// Display surface a chart is attached to (an egui plot, a PNG canvas, ...).
pub trait ChartSurface {
    fn mount(&mut self, figure: &Figure) -> ChartHandle;
    fn destroy(&mut self, handle: ChartHandle);
}

/// Surface that keeps the mounted figure in memory.
#[derive(Debug, Default)]
pub struct FigureSlot {
    next_handle: u64,
    live: Option<(ChartHandle, Figure)>,
}

impl FigureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn figure(&self) -> Option<&Figure> {
        self.live.as_ref().map(|(_, figure)| figure)
    }

    pub fn handle(&self) -> Option<ChartHandle> {
        self.live.as_ref().map(|(handle, _)| *handle)
    }
}

impl ChartSurface for FigureSlot {
    fn mount(&mut self, figure: &Figure) -> ChartHandle {
        self.next_handle += 1;
        let handle = ChartHandle(self.next_handle);
        self.live = Some((handle, figure.clone()));
        handle
    }

    fn destroy(&mut self, handle: ChartHandle) {
        if self.handle() == Some(handle) {
            self.live = None;
        }
    }
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        let sample = points[start];
        result.push(sample);
    }
    result
}
