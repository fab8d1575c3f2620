//! Overlay configuration.

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::mesh::MeshOptions;
use crate::{HeatmapError, Result};

/// Everything that controls how the heatmap looks.
///
/// Serialized with camelCase keys, so a JS options object can be passed
/// through `serde_json` unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeatmapOptions {
    /// Horizontal scale of the column cross-section (1.0 = one cell wide)
    pub size: f64,
    /// Extrusion of the tallest column, in planar units
    pub height: f64,
    /// Sides per column
    pub faces: u32,
    pub opacity: f64,
    pub hue_of_min_value: f64,
    pub saturation_of_min_value: f64,
    pub light_of_min_value: f64,
    pub hue_of_max_value: f64,
    pub saturation_of_max_value: f64,
    pub light_of_max_value: f64,
    /// Direction the light comes from, degrees clockwise from north
    pub light_angle: f64,
    /// 0 disables directional shading, 1 fully darkens faces parallel to the light
    pub light_influence: f64,
    /// Cell size in planar units
    pub grid_step_size: f64,
    pub grid_min_percentile: f64,
    pub grid_max_percentile: f64,
    /// Compute the value range from visible cells only
    pub adaptive_viewport_pallete: bool,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            size: 1.4,
            height: 500_000.0,
            faces: 4,
            opacity: 0.9,
            hue_of_min_value: 240.0,
            saturation_of_min_value: 0.5,
            light_of_min_value: 0.5,
            hue_of_max_value: 0.0,
            saturation_of_max_value: 0.5,
            light_of_max_value: 0.5,
            light_angle: 30.0,
            light_influence: 0.5,
            grid_step_size: 50_000.0,
            grid_min_percentile: 0.01,
            grid_max_percentile: 0.95,
            adaptive_viewport_pallete: false,
        }
    }
}

/// What a change of options invalidates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptionsChange {
    /// Grid and mesh must be rebuilt from the cached samples.
    pub rebuild: bool,
    /// Only the value range must be recomputed.
    pub range: bool,
}

impl HeatmapOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .change_context(HeatmapError::InvalidOptions("malformed options JSON".into()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .change_context(HeatmapError::InvalidOptions("unserializable options".into()))
    }

    pub fn mesh_options(&self) -> MeshOptions {
        MeshOptions {
            faces_per_column: self.faces,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Report::new(HeatmapError::InvalidOptions(msg)));

        if self.faces < 2 {
            return fail(format!("faces must be at least 2, got {}", self.faces));
        }
        if !(self.grid_step_size.is_finite() && self.grid_step_size > 0.0) {
            return fail(format!(
                "gridStepSize must be a positive number, got {}",
                self.grid_step_size
            ));
        }
        for (name, v) in [
            ("gridMinPercentile", self.grid_min_percentile),
            ("gridMaxPercentile", self.grid_max_percentile),
            ("opacity", self.opacity),
            ("lightInfluence", self.light_influence),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return fail(format!("{} must be within [0, 1], got {}", name, v));
            }
        }
        Ok(())
    }

    /// Classify the difference between `self` (current) and `next`.
    pub fn diff(&self, next: &HeatmapOptions) -> OptionsChange {
        let rebuild = self.faces != next.faces || self.grid_step_size != next.grid_step_size;
        let range = self.adaptive_viewport_pallete != next.adaptive_viewport_pallete
            || self.grid_min_percentile != next.grid_min_percentile
            || self.grid_max_percentile != next.grid_max_percentile;
        OptionsChange { rebuild, range }
    }

    /// Copy of `self` with every field set in `patch` overridden.
    pub fn merged(&self, patch: &OptionsPatch) -> HeatmapOptions {
        let mut o = self.clone();
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field { o.$field = v; })*
            };
        }
        take!(
            size,
            height,
            faces,
            opacity,
            hue_of_min_value,
            saturation_of_min_value,
            light_of_min_value,
            hue_of_max_value,
            saturation_of_max_value,
            light_of_max_value,
            light_angle,
            light_influence,
            grid_step_size,
            grid_min_percentile,
            grid_max_percentile,
            adaptive_viewport_pallete,
        );
        o
    }

    pub const fn with_faces(mut self, faces: u32) -> Self {
        self.faces = faces;
        self
    }

    pub const fn with_grid_step_size(mut self, step: f64) -> Self {
        self.grid_step_size = step;
        self
    }

    pub const fn with_percentiles(mut self, min: f64, max: f64) -> Self {
        self.grid_min_percentile = min;
        self.grid_max_percentile = max;
        self
    }

    pub const fn with_adaptive_viewport(mut self, on: bool) -> Self {
        self.adaptive_viewport_pallete = on;
        self
    }

    pub const fn with_hue_range(mut self, min: f64, max: f64) -> Self {
        self.hue_of_min_value = min;
        self.hue_of_max_value = max;
        self
    }

    pub const fn with_light(mut self, angle: f64, influence: f64) -> Self {
        self.light_angle = angle;
        self.light_influence = influence;
        self
    }
}

/// Partial update for [`HeatmapOptions`]; unset fields keep their value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsPatch {
    pub size: Option<f64>,
    pub height: Option<f64>,
    pub faces: Option<u32>,
    pub opacity: Option<f64>,
    pub hue_of_min_value: Option<f64>,
    pub saturation_of_min_value: Option<f64>,
    pub light_of_min_value: Option<f64>,
    pub hue_of_max_value: Option<f64>,
    pub saturation_of_max_value: Option<f64>,
    pub light_of_max_value: Option<f64>,
    pub light_angle: Option<f64>,
    pub light_influence: Option<f64>,
    pub grid_step_size: Option<f64>,
    pub grid_min_percentile: Option<f64>,
    pub grid_max_percentile: Option<f64>,
    pub adaptive_viewport_pallete: Option<bool>,
}

impl OptionsPatch {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .change_context(HeatmapError::InvalidOptions("malformed options JSON".into()))
    }
}

impl From<HeatmapOptions> for OptionsPatch {
    fn from(o: HeatmapOptions) -> Self {
        Self {
            size: Some(o.size),
            height: Some(o.height),
            faces: Some(o.faces),
            opacity: Some(o.opacity),
            hue_of_min_value: Some(o.hue_of_min_value),
            saturation_of_min_value: Some(o.saturation_of_min_value),
            light_of_min_value: Some(o.light_of_min_value),
            hue_of_max_value: Some(o.hue_of_max_value),
            saturation_of_max_value: Some(o.saturation_of_max_value),
            light_of_max_value: Some(o.light_of_max_value),
            light_angle: Some(o.light_angle),
            light_influence: Some(o.light_influence),
            grid_step_size: Some(o.grid_step_size),
            grid_min_percentile: Some(o.grid_min_percentile),
            grid_max_percentile: Some(o.grid_max_percentile),
            adaptive_viewport_pallete: Some(o.adaptive_viewport_pallete),
        }
    }
}
