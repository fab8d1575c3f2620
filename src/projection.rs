//! Geographic to planar (Web-Mercator style) coordinate transform.

use bevy_math::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::grid::PlanarBounds;

/// Side of the planar world square.
pub const WORLD_SIZE: f64 = 4_294_967_296.0; // 2^32

/// Mean earth radius used by [`geo_distance`], in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Project `(lon, lat)` in degrees to planar world coordinates.
///
/// The output is clamped to `[-WORLD_SIZE / 2, WORLD_SIZE / 2]`, so the poles
/// (where the raw transform is infinite) map onto the world edge. NaN input
/// yields NaN output.
pub fn project(lon: f64, lat: f64) -> DVec2 {
    let half = WORLD_SIZE / 2.0;
    let sin = lat.to_radians().sin();

    let x = lon * WORLD_SIZE / 360.0;
    let y = ((1.0 + sin) / (1.0 - sin)).ln() * WORLD_SIZE / (4.0 * PI);

    DVec2::new(x.clamp(-half, half), y.clamp(-half, half))
}

/// Inverse of [`project`] for points inside the world square.
pub fn unproject(point: DVec2) -> (f64, f64) {
    let lon = point.x * 360.0 / WORLD_SIZE;
    let lat = (2.0 * (point.y * 2.0 * PI / WORLD_SIZE).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Great-circle distance between two `(lon, lat)` points, rounded to whole metres.
pub fn geo_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let lat1 = a.1.to_radians();
    let lat2 = b.1.to_radians();
    let sin_dlat = ((b.1 - a.1).to_radians() / 2.0).sin();
    let sin_dlon = ((b.0 - a.0).to_radians() / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    (EARTH_RADIUS_M * c).round()
}

/// Visible geographic box reported by the host map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// `(lon, lat)` of the north-east corner
    pub north_east: (f64, f64),
    /// `(lon, lat)` of the south-west corner
    pub south_west: (f64, f64),
}

impl GeoBounds {
    pub const fn new(north_east: (f64, f64), south_west: (f64, f64)) -> Self {
        Self {
            north_east,
            south_west,
        }
    }

    /// Project both corners and return the axis-aligned planar box they span.
    ///
    /// Corners are ordered with min/max, so a rotated map reporting swapped
    /// corners still produces a valid box.
    pub fn to_planar(&self) -> PlanarBounds {
        let ne = project(self.north_east.0, self.north_east.1);
        let sw = project(self.south_west.0, self.south_west.1);
        let min = ne.min(sw);
        let max = ne.max(sw);
        PlanarBounds::new(min, max)
    }
}
