pub mod animation;
pub mod grid;
pub mod host;
pub mod ingest;
pub mod mesh;
pub mod options;
pub mod overlay;
pub mod projection;
pub mod range;
pub mod shading;
pub mod uniforms;

#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum HeatmapError {
    /// An option is out of its accepted range or the options document is malformed.
    InvalidOptions(String),
    /// Sample input could not be turned into samples.
    InvalidData(String),
}

impl fmt::Display for HeatmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatmapError::InvalidOptions(msg) => write!(f, "invalid heatmap options: {}", msg),
            HeatmapError::InvalidData(msg) => write!(f, "invalid heatmap data: {}", msg),
        }
    }
}

impl std::error::Error for HeatmapError {}

pub type Result<T> = std::result::Result<T, error_stack::Report<HeatmapError>>;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

pub mod prelude {
    pub use crate::animation::{AnimatedScalar, Tween};
    pub use crate::grid::{CellBounds, EMPTY_CELL, Grid, PlanarBounds, Sample, aggregate};
    pub use crate::host::{BufferId, GpuBackend, IdleScheduler, MapView};
    pub use crate::ingest::GeoSample;
    pub use crate::mesh::{MeshOptions, PrismMesh, PrismVertex, build};
    pub use crate::options::{HeatmapOptions, OptionsPatch};
    pub use crate::overlay::OverlayController;
    pub use crate::projection::{GeoBounds, project, unproject};
    pub use crate::range::{ValueRange, find_range};
    pub use crate::uniforms::Uniforms;
    pub use crate::{HeatmapError, Result};
}
