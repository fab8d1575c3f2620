//! WASM API exports for JavaScript interop
//!
//! JavaScript owns the WebGL context and the map. It hands the overlay three
//! callbacks for GPU work plus one for idle scheduling, pushes the map view
//! state with `set_view`, and calls `tick` from `requestAnimationFrame`.
//! It is only compiled when targeting wasm32.

#![cfg(target_arch = "wasm32")]

use bevy_math::{Mat4, UVec2};
use js_sys::{Float32Array, Function};
use parking_lot::Mutex;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

use crate::host::{BufferId, GpuBackend, IdleScheduler, MapView};
use crate::ingest::samples_from_flat;
use crate::mesh::PrismMesh;
use crate::options::{HeatmapOptions, OptionsPatch};
use crate::overlay::OverlayController;
use crate::projection::GeoBounds;
use crate::uniforms::Uniforms;

#[derive(Clone, Copy)]
struct ViewState {
    size: UVec2,
    projection: Mat4,
    bounds: GeoBounds,
}

/// Map view mirrored from JS, updated between frames.
struct SharedView(Arc<Mutex<ViewState>>);

impl MapView for SharedView {
    fn size(&self) -> UVec2 {
        self.0.lock().size
    }

    fn projection_matrix(&self) -> Mat4 {
        self.0.lock().projection
    }

    fn bounds(&self) -> GeoBounds {
        self.0.lock().bounds
    }
}

fn report_call(what: &str, result: Result<JsValue, JsValue>) {
    if let Err(e) = result {
        web_sys::console::warn_2(&format!("heatmap {} callback failed", what).into(), &e);
    }
}

/// GPU backend forwarding to JS callbacks:
/// `upload(id, Float32Array)`, `release(id)`, `draw(id, Float32Array uniforms, count)`.
struct JsGpu {
    upload: Function,
    release: Function,
    draw: Function,
    next_id: u64,
}

impl GpuBackend for JsGpu {
    fn upload(&mut self, mesh: &PrismMesh) -> BufferId {
        self.next_id += 1;
        let id = BufferId(self.next_id);
        let data = Float32Array::from(mesh.to_floats().as_slice());
        report_call(
            "upload",
            self.upload
                .call2(&JsValue::NULL, &JsValue::from_f64(id.0 as f64), &data),
        );
        id
    }

    fn release(&mut self, buffer: BufferId) {
        report_call(
            "release",
            self.release
                .call1(&JsValue::NULL, &JsValue::from_f64(buffer.0 as f64)),
        );
    }

    fn draw(&mut self, buffer: BufferId, uniforms: &Uniforms, vertex_count: usize) {
        let packed = Float32Array::from(&uniforms.to_std140_floats()[..]);
        report_call(
            "draw",
            self.draw.call3(
                &JsValue::NULL,
                &JsValue::from_f64(buffer.0 as f64),
                &packed,
                &JsValue::from_f64(vertex_count as f64),
            ),
        );
    }
}

/// Idle scheduling through a JS function (typically wrapping `requestIdleCallback`).
struct JsIdle(Function);

impl IdleScheduler for JsIdle {
    fn request_idle(&mut self) {
        report_call("requestIdle", self.0.call0(&JsValue::NULL));
    }
}

fn to_js(report: error_stack::Report<crate::HeatmapError>) -> JsValue {
    JsValue::from_str(&format!("{}", report))
}

/// JavaScript-accessible heatmap overlay
#[wasm_bindgen]
pub struct JsHeatmap {
    view: Arc<Mutex<ViewState>>,
    controller: OverlayController<SharedView, JsGpu, JsIdle>,
}

#[wasm_bindgen]
impl JsHeatmap {
    /// Create an overlay.
    ///
    /// # Arguments
    /// * `options_json` - camelCase options, missing keys take their defaults
    /// * `upload`, `release`, `draw` - GPU callbacks
    /// * `request_idle` - asks JS to call `run_idle` when idle
    #[wasm_bindgen(constructor)]
    pub fn new(
        options_json: &str,
        upload: Function,
        release: Function,
        draw: Function,
        request_idle: Function,
    ) -> Result<JsHeatmap, JsValue> {
        let options = if options_json.trim().is_empty() {
            HeatmapOptions::default()
        } else {
            HeatmapOptions::from_json(options_json).map_err(to_js)?
        };

        let view = Arc::new(Mutex::new(ViewState {
            size: UVec2::ZERO,
            projection: Mat4::IDENTITY,
            bounds: GeoBounds::new((0.0, 0.0), (0.0, 0.0)),
        }));
        let gpu = JsGpu {
            upload,
            release,
            draw,
            next_id: 0,
        };

        let controller = OverlayController::with_scheduler(
            SharedView(view.clone()),
            gpu,
            JsIdle(request_idle),
            options,
        )
        .map_err(to_js)?;

        Ok(JsHeatmap { view, controller })
    }

    /// Merge a partial options object (JSON).
    #[wasm_bindgen]
    pub fn set_options(&mut self, json: &str, now: f64) -> Result<(), JsValue> {
        let patch = OptionsPatch::from_json(json).map_err(to_js)?;
        self.controller.set_options(patch, now).map_err(to_js)
    }

    /// Replace the data with a flat `[lon, lat, value, ...]` array.
    #[wasm_bindgen]
    pub fn set_data(&mut self, points: &[f64], now: f64) -> Result<(), JsValue> {
        let samples = samples_from_flat(points).map_err(to_js)?;
        self.controller.set_data(samples, now);
        Ok(())
    }

    /// Mirror the map camera: column-major projection matrix and visible box.
    #[wasm_bindgen]
    pub fn set_view(
        &mut self,
        projection: &[f32],
        ne_lon: f64,
        ne_lat: f64,
        sw_lon: f64,
        sw_lat: f64,
    ) -> Result<(), JsValue> {
        if projection.len() != 16 {
            return Err(JsValue::from_str(&format!(
                "projection matrix needs 16 floats, got {}",
                projection.len()
            )));
        }
        let mut view = self.view.lock();
        view.projection = Mat4::from_cols_slice(projection);
        view.bounds = GeoBounds::new((ne_lon, ne_lat), (sw_lon, sw_lat));
        Ok(())
    }

    #[wasm_bindgen]
    pub fn on_move(&mut self) {
        self.controller.on_move();
    }

    #[wasm_bindgen]
    pub fn on_move_end(&mut self) {
        self.controller.on_move_end();
    }

    #[wasm_bindgen]
    pub fn on_resize(&mut self, width: u32, height: u32) {
        let size = UVec2::new(width, height);
        self.view.lock().size = size;
        self.controller.on_resize(size);
    }

    #[wasm_bindgen]
    pub fn run_idle(&mut self, now: f64) -> bool {
        self.controller.run_idle(now)
    }

    /// Call once per animation frame. Returns whether a draw was issued.
    #[wasm_bindgen]
    pub fn tick(&mut self, now: f64) -> bool {
        self.controller.tick(now)
    }

    #[wasm_bindgen]
    pub fn vertex_count(&self) -> usize {
        self.controller.vertex_count()
    }
}
