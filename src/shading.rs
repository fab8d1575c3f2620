//! Color ramp and directional shading of prism vertices.
//!
//! [`shade_vertex`] is the CPU twin of [`PRISM_SHADER_WGSL`]; hosts without a
//! programmable pipeline (or tests) can use it to get the exact color and
//! extruded position a vertex would receive on the GPU.

use bevy_math::{Vec2, Vec3, Vec4};

use crate::mesh::PrismVertex;
use crate::uniforms::Uniforms;

/// Convert hue (degrees), saturation and lightness in `[0, 1]` to linear RGB.
pub fn hsl_to_rgb(hue: f32, saturation: f32, light: f32) -> Vec3 {
    if saturation == 0.0 {
        return Vec3::splat(light);
    }
    let h = hue / 360.0;

    let q = if light < 0.5 {
        light * (1.0 + saturation)
    } else {
        light + saturation - light * saturation
    };
    let p = 2.0 * light - q;

    Vec3::new(
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Unit light direction for a light coming from `angle_deg`, clockwise from north.
pub fn light_direction(angle_deg: f64) -> Vec2 {
    let a = angle_deg.to_radians();
    Vec2::new(-a.sin() as f32, -a.cos() as f32)
}

/// Brightness multiplier of a face with 2D `normal`. Roofs (zero normal) are
/// always fully lit.
pub fn light_weight(direction: Vec2, normal: Vec2, influence: f32) -> f32 {
    if normal == Vec2::ZERO {
        return 1.0;
    }
    1.0 + influence * (direction.dot(normal).abs() - 1.0)
}

/// Position of `value` inside `range`, clamped to `[0, 1]`.
///
/// A collapsed range maps everything to 0 so columns stay flat instead of
/// producing NaN geometry.
pub fn normalize_value(value: f32, range: Vec2) -> f32 {
    let span = range.y - range.x;
    if span <= 0.0 || !span.is_finite() {
        return 0.0;
    }
    ((value.clamp(range.x, range.y) - range.x) / span).clamp(0.0, 1.0)
}

/// Color and model-space position of a vertex under `uniforms`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadedVertex {
    /// Pre-projection position, in cell units horizontally.
    pub local: Vec3,
    /// Clip-space position.
    pub clip: Vec4,
    pub color: Vec4,
}

pub fn shade_vertex(vertex: &PrismVertex, uniforms: &Uniforms) -> ShadedVertex {
    let t = normalize_value(vertex.value, uniforms.value_range);

    let hue = lerp(uniforms.hue_range, t);
    let saturation = lerp(uniforms.saturation_range, t);
    let light = lerp(uniforms.light_range, t);
    let weight = light_weight(
        uniforms.light_direction,
        vertex.normal(),
        uniforms.light_influence,
    );
    let rgb = hsl_to_rgb(hue, saturation, light) * weight;

    let xy = Vec2::new(vertex.position[0], vertex.position[1]) + vertex.offset() * uniforms.size_scale;
    let local = xy.extend(vertex.position[2] * uniforms.height_scale * t);

    ShadedVertex {
        local,
        clip: uniforms.model * local.extend(1.0),
        color: rgb.extend(uniforms.alpha),
    }
}

#[inline]
fn lerp(range: Vec2, t: f32) -> f32 {
    range.x + (range.y - range.x) * t
}

/// WGSL program matching [`shade_vertex`]. Vertex inputs follow
/// [`crate::mesh::vertex_attributes`]; the uniform block follows
/// [`Uniforms::to_std140_floats`].
pub const PRISM_SHADER_WGSL: &str = r#"
struct HeatmapUniforms {
    model: mat4x4<f32>,
    hue_range: vec2<f32>,
    saturation_range: vec2<f32>,
    light_range: vec2<f32>,
    light_direction: vec2<f32>,
    value_range: vec2<f32>,
    size_scale: f32,
    height_scale: f32,
    alpha: f32,
    light_influence: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> u: HeatmapUniforms;

struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) offset: vec2<f32>,
    @location(2) normal: vec2<f32>,
    @location(3) value: f32,
};

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

fn hue_to_rgb(p: f32, q: f32, t_in: f32) -> f32 {
    var t = t_in;
    if (t < 0.0) { t += 1.0; }
    if (t > 1.0) { t -= 1.0; }
    if (t < 1.0 / 6.0) { return p + (q - p) * 6.0 * t; }
    if (t < 0.5) { return q; }
    if (t < 2.0 / 3.0) { return p + (q - p) * (2.0 / 3.0 - t) * 6.0; }
    return p;
}

fn hsl_to_rgb(hue: f32, s: f32, l: f32) -> vec3<f32> {
    if (s == 0.0) { return vec3<f32>(l, l, l); }
    let h = hue / 360.0;
    let q = select(l + s - l * s, l * (1.0 + s), l < 0.5);
    let p = 2.0 * l - q;
    return vec3<f32>(
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    );
}

@vertex
fn vs_main(in: VertexIn) -> VertexOut {
    let span = u.value_range.y - u.value_range.x;
    var t = 0.0;
    if (span > 0.0) {
        t = clamp((clamp(in.value, u.value_range.x, u.value_range.y) - u.value_range.x) / span, 0.0, 1.0);
    }

    var weight = 1.0 + u.light_influence * (abs(dot(u.light_direction, in.normal)) - 1.0);
    if (in.normal.x == 0.0 && in.normal.y == 0.0) {
        weight = 1.0;
    }

    let rgb = hsl_to_rgb(
        mix(u.hue_range.x, u.hue_range.y, t),
        mix(u.saturation_range.x, u.saturation_range.y, t),
        mix(u.light_range.x, u.light_range.y, t),
    );

    var out: VertexOut;
    out.color = vec4<f32>(rgb * weight, u.alpha);
    out.clip = u.model * vec4<f32>(
        in.position.xy + in.offset * u.size_scale,
        in.position.z * u.height_scale * t,
        1.0,
    );
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;
