use bci_lib::plot::{ChartHandle, ChartSurface, Figure};

struct MountedChart {
    handle: ChartHandle,
    figure: Figure,
}

/// Chart surface backing the trial plot.
///
/// egui keeps plot bounds and legend state per widget id, so each mounted chart gets its own id;
/// destroying a chart drops the figure and the id with it.
#[derive(Default)]
pub struct Store {
    next_handle: u64,
    mounted: Option<MountedChart>,
    bounds: Option<([f64; 2], [f64; 2])>,
    dirty: bool,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes cached values before the frame draws.
    pub fn prepare(&mut self) {
        if !self.dirty {
            return;
        }
        self.bounds = self.mounted.as_ref().and_then(|chart| chart.figure.bounds());
        self.dirty = false;
    }

    pub fn figure(&self) -> Option<&Figure> {
        self.mounted.as_ref().map(|chart| &chart.figure)
    }

    pub fn plot_id(&self) -> Option<String> {
        self.mounted
            .as_ref()
            .map(|chart| format!("trial_chart_{}", chart.handle.0))
    }

    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        self.bounds
    }
}

impl ChartSurface for Store {
    fn mount(&mut self, figure: &Figure) -> ChartHandle {
        self.next_handle += 1;
        let handle = ChartHandle(self.next_handle);
        self.mounted = Some(MountedChart {
            handle,
            figure: figure.clone(),
        });
        self.dirty = true;
        handle
    }

    fn destroy(&mut self, handle: ChartHandle) {
        if self.mounted.as_ref().map(|chart| chart.handle) == Some(handle) {
            self.mounted = None;
            self.bounds = None;
            self.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bci_lib::{ChartRenderer, SignalMatrix};

    #[test]
    fn each_render_gets_a_fresh_plot_id() {
        let mut renderer = ChartRenderer::new(Store::new());
        let matrix = SignalMatrix::new(vec![vec![0.0, 1.0, -2.0], vec![3.0, 0.5, 0.0]]);
        renderer.render(&matrix, None).unwrap();
        let first = renderer.surface().plot_id();
        renderer.render(&matrix, None).unwrap();
        let second = renderer.surface().plot_id();
        assert!(first.is_some());
        assert_ne!(first, second);

        renderer.surface_mut().prepare();
        assert_eq!(
            renderer.surface().bounds(),
            Some(([0.0, 2.0], [-2.0, 3.0]))
        );

        renderer.clear();
        assert!(renderer.surface().figure().is_none());
        assert!(renderer.surface().bounds().is_none());
    }
}
