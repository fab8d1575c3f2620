//! The overlay controller: ties data, options and viewport events to the
//! grid/range/mesh pipeline and decides when to draw.
//!
//! The controller does not schedule itself. The host calls
//! [`OverlayController::tick`] once per display frame and forwards map events
//! (`on_move`, `on_move_end`, `on_resize`). All timestamps are milliseconds on
//! the same clock.

use bevy_math::{DVec2, UVec2, Vec2};
use tracing::{debug, trace, warn};

use crate::Result;
use crate::animation::AnimatedScalar;
use crate::grid::{Grid, Sample, aggregate};
use crate::host::{BufferId, GpuBackend, IdleScheduler, MapView, PollIdle};
use crate::ingest::GeoSample;
use crate::mesh::build;
use crate::options::{HeatmapOptions, OptionsPatch};
use crate::range::find_range;
use crate::uniforms::Uniforms;

/// Duration of the value-range transition.
pub const RANGE_TRANSITION_MS: u32 = 300;

pub struct OverlayController<M: MapView, G: GpuBackend, I: IdleScheduler = PollIdle> {
    map: M,
    gpu: G,
    idle: I,
    options: HeatmapOptions,
    /// `None` until the first `set_data`.
    samples: Option<Vec<GeoSample>>,
    grid: Option<Grid>,
    buffer: Option<BufferId>,
    vertex_count: usize,
    min_value: AnimatedScalar,
    max_value: AnimatedScalar,
    needs_rerender: bool,
    idle_pending: bool,
    viewport: UVec2,
}

impl<M: MapView, G: GpuBackend> OverlayController<M, G, PollIdle> {
    /// Controller whose deferred work runs on the next `run_idle` call.
    pub fn new(map: M, gpu: G, options: HeatmapOptions) -> Result<Self> {
        Self::with_scheduler(map, gpu, PollIdle, options)
    }
}

impl<M: MapView, G: GpuBackend, I: IdleScheduler> OverlayController<M, G, I> {
    pub fn with_scheduler(map: M, gpu: G, idle: I, options: HeatmapOptions) -> Result<Self> {
        options.validate()?;
        let viewport = map.size();
        Ok(Self {
            map,
            gpu,
            idle,
            options,
            samples: None,
            grid: None,
            buffer: None,
            vertex_count: 0,
            min_value: AnimatedScalar::default(),
            max_value: AnimatedScalar::default(),
            needs_rerender: false,
            idle_pending: false,
            viewport,
        })
    }

    pub fn options(&self) -> &HeatmapOptions {
        &self.options
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.samples.is_some()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Current (possibly mid-transition) value range used for coloring.
    pub fn value_range(&self) -> Vec2 {
        Vec2::new(self.min_value.value() as f32, self.max_value.value() as f32)
    }

    pub fn viewport_size(&self) -> UVec2 {
        self.viewport
    }

    pub fn needs_rerender(&self) -> bool {
        self.needs_rerender
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    /// Replace the data set and rebuild everything derived from it.
    ///
    /// Samples are expected to be finite; NaN samples end up in empty cells.
    pub fn set_data(&mut self, samples: Vec<GeoSample>, now_ms: f64) {
        self.samples = Some(samples);
        self.rebuild(now_ms);
    }

    /// Merge `patch` into the current options.
    ///
    /// Invalid options are rejected and leave the controller untouched.
    pub fn set_options(&mut self, patch: impl Into<OptionsPatch>, now_ms: f64) -> Result<()> {
        let next = self.options.merged(&patch.into());
        if let Err(report) = next.validate() {
            warn!("rejected heatmap options: {:?}", report);
            return Err(report);
        }

        let change = self.options.diff(&next);
        self.options = next;

        if change.rebuild && self.samples.is_some() {
            self.rebuild(now_ms);
        } else if change.range {
            self.update_range(now_ms);
        }

        self.needs_rerender = true;
        Ok(())
    }

    /// The map is moving; redraw on the next tick.
    pub fn on_move(&mut self) {
        self.needs_rerender = true;
    }

    /// The map settled. In adaptive mode the value range is recomputed for the
    /// new viewport once the host is idle.
    pub fn on_move_end(&mut self) {
        if !self.options.adaptive_viewport_pallete || self.idle_pending {
            return;
        }
        self.idle_pending = true;
        self.idle.request_idle();
    }

    pub fn on_resize(&mut self, size: UVec2) {
        self.viewport = size;
        self.needs_rerender = true;
    }

    /// Run deferred work. Returns whether anything was pending.
    pub fn run_idle(&mut self, now_ms: f64) -> bool {
        if !self.idle_pending {
            return false;
        }
        self.idle_pending = false;
        self.update_range(now_ms);
        true
    }

    /// Advance animations and draw if anything changed. Returns whether a
    /// draw call was issued.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.samples.is_none() {
            return false;
        }

        let min_changed = self.min_value.poll(now_ms);
        let max_changed = self.max_value.poll(now_ms);

        if !self.needs_rerender && !min_changed && !max_changed {
            return false;
        }
        self.needs_rerender = false;

        let (Some(buffer), Some(grid)) = (self.buffer, self.grid.as_ref()) else {
            return false;
        };

        let uniforms = Uniforms::for_grid(
            &self.options,
            self.map.projection_matrix(),
            grid,
            self.value_range(),
        );
        self.gpu.draw(buffer, &uniforms, self.vertex_count);
        true
    }

    /// Release GPU resources. The controller keeps its data and re-uploads on
    /// the next `set_data` or rebuilding option change.
    pub fn dispose(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.gpu.release(buffer);
        }
        self.vertex_count = 0;
    }

    fn rebuild(&mut self, now_ms: f64) {
        let Some(samples) = self.samples.as_ref() else {
            return;
        };

        let sample_count = samples.len();
        let planar: Vec<Sample> = samples.iter().map(GeoSample::project).collect();
        let grid = aggregate(
            &planar,
            DVec2::splat(self.options.grid_step_size),
            None,
        );
        let mesh = build(&grid, self.options.mesh_options());
        let (width, height) = (grid.width, grid.height);

        self.grid = Some(grid);
        self.update_range(now_ms);

        if let Some(old) = self.buffer.take() {
            self.gpu.release(old);
        }
        self.vertex_count = mesh.vertex_count();
        if !mesh.is_empty() {
            self.buffer = Some(self.gpu.upload(&mesh));
        }

        debug!(
            samples = sample_count,
            width,
            height,
            vertices = self.vertex_count,
            "rebuilt heatmap mesh"
        );
        self.needs_rerender = true;
    }

    fn update_range(&mut self, now_ms: f64) {
        let Some(grid) = self.grid.as_ref() else {
            return;
        };

        let bounds = self
            .options
            .adaptive_viewport_pallete
            .then(|| grid.cell_bounds_of(&self.map.bounds().to_planar()));

        let Some(range) = find_range(
            grid,
            bounds,
            self.options.grid_min_percentile,
            self.options.grid_max_percentile,
        ) else {
            trace!(?bounds, "no visible cells, keeping value range");
            return;
        };

        trace!(min = range.min, max = range.max, ?bounds, "value range updated");
        self.min_value.start(range.min, RANGE_TRANSITION_MS, now_ms);
        self.max_value.start(range.max, RANGE_TRANSITION_MS, now_ms);
    }
}

impl<M: MapView, G: GpuBackend, I: IdleScheduler> Drop for OverlayController<M, G, I> {
    fn drop(&mut self) {
        self.dispose();
    }
}
