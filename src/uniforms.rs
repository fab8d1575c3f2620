//! Per-draw shader parameters.

use bevy_math::{DVec2, Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::options::HeatmapOptions;
use crate::shading::light_direction;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Uniforms {
    /// Map projection composed with the grid's cell-to-planar transform.
    pub model: Mat4,
    pub size_scale: f32,
    pub height_scale: f32,
    pub hue_range: Vec2,
    pub saturation_range: Vec2,
    pub light_range: Vec2,
    pub alpha: f32,
    pub light_direction: Vec2,
    pub light_influence: f32,
    pub value_range: Vec2,
}

impl Default for Uniforms {
    fn default() -> Self {
        Self::from_options(&HeatmapOptions::default(), Mat4::IDENTITY, Vec2::new(0.0, 1.0))
    }
}

/// Transform from cell units to planar world units.
pub fn grid_matrix(origin: DVec2, step: DVec2) -> Mat4 {
    Mat4::from_translation(Vec3::new(origin.x as f32, origin.y as f32, 0.0))
        * Mat4::from_scale(Vec3::new(step.x as f32, step.y as f32, 1.0))
}

impl Uniforms {
    /// Uniforms with `model` taken as-is.
    pub fn from_options(options: &HeatmapOptions, model: Mat4, value_range: Vec2) -> Self {
        Self {
            model,
            size_scale: options.size as f32,
            height_scale: options.height as f32,
            hue_range: Vec2::new(
                options.hue_of_min_value as f32,
                options.hue_of_max_value as f32,
            ),
            saturation_range: Vec2::new(
                options.saturation_of_min_value as f32,
                options.saturation_of_max_value as f32,
            ),
            light_range: Vec2::new(
                options.light_of_min_value as f32,
                options.light_of_max_value as f32,
            ),
            alpha: options.opacity as f32,
            light_direction: light_direction(options.light_angle),
            light_influence: options.light_influence as f32,
            value_range,
        }
    }

    /// Uniforms for drawing `grid` under the host map's `projection`.
    pub fn for_grid(
        options: &HeatmapOptions,
        projection: Mat4,
        grid: &Grid,
        value_range: Vec2,
    ) -> Self {
        let model = projection * grid_matrix(grid.origin, grid.step);
        Self::from_options(options, model, value_range)
    }

    /// Flat floats laid out like the `HeatmapUniforms` WGSL block (128 bytes).
    pub fn to_std140_floats(&self) -> [f32; 32] {
        let mut out = [0.0; 32];
        out[..16].copy_from_slice(&self.model.to_cols_array());
        out[16..18].copy_from_slice(&self.hue_range.to_array());
        out[18..20].copy_from_slice(&self.saturation_range.to_array());
        out[20..22].copy_from_slice(&self.light_range.to_array());
        out[22..24].copy_from_slice(&self.light_direction.to_array());
        out[24..26].copy_from_slice(&self.value_range.to_array());
        out[26] = self.size_scale;
        out[27] = self.height_scale;
        out[28] = self.alpha;
        out[29] = self.light_influence;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Vec4;

    #[test]
    fn grid_matrix_maps_cells_to_planar() {
        let m = grid_matrix(DVec2::new(100.0, -50.0), DVec2::new(10.0, 20.0));
        let p = m * Vec4::new(2.0, 3.0, 0.5, 1.0);
        assert_eq!(p, Vec4::new(120.0, 10.0, 0.5, 1.0));
    }

    #[test]
    fn takes_color_ramp_from_options() {
        let options = HeatmapOptions::default();
        let u = Uniforms::from_options(&options, Mat4::IDENTITY, Vec2::new(1.0, 2.0));
        assert_eq!(u.hue_range, Vec2::new(240.0, 0.0));
        assert_eq!(u.alpha, 0.9);
        assert_eq!(u.value_range, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn packed_layout() {
        let u = Uniforms::default();
        let f = u.to_std140_floats();
        assert_eq!(f[0], 1.0);
        assert_eq!(f[5], 1.0);
        assert_eq!(&f[16..18], &[240.0, 0.0]);
        assert_eq!(f[26], u.size_scale);
        assert_eq!(&f[30..], &[0.0, 0.0]);
    }
}
