//! Turning raw input into geographic samples.

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::grid::Sample;
use crate::projection::{geo_distance, project};
use crate::{HeatmapError, Result};

/// A geo-tagged scalar, `(longitude, latitude, value)` in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
}

impl GeoSample {
    pub const fn new(lon: f64, lat: f64, value: f64) -> Self {
        Self { lon, lat, value }
    }

    pub fn project(&self) -> Sample {
        let p = project(self.lon, self.lat);
        Sample::new(p.x, p.y, self.value)
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.value.is_finite()
    }
}

impl From<(f64, f64, f64)> for GeoSample {
    fn from((lon, lat, value): (f64, f64, f64)) -> Self {
        Self::new(lon, lat, value)
    }
}

/// Samples from a flat `[lon0, lat0, v0, lon1, lat1, v1, ...]` array.
pub fn samples_from_flat(flat: &[f64]) -> Result<Vec<GeoSample>> {
    if flat.len() % 3 != 0 {
        return Err(Report::new(HeatmapError::InvalidData(format!(
            "expected (lon, lat, value) triples, got {} numbers",
            flat.len()
        ))));
    }
    Ok(flat
        .chunks_exact(3)
        .map(|c| GeoSample::new(c[0], c[1], c[2]))
        .collect())
}

/// Parse `lon,lat,value` CSV text with a header line.
///
/// Rows with a missing, non-numeric or non-finite field are skipped, so the
/// result is always safe to feed to the overlay.
pub fn parse_csv(text: &str) -> Vec<GeoSample> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split(',').map(|f| f.trim().parse::<f64>().ok());
            let lon = fields.next()??;
            let lat = fields.next()??;
            let value = fields.next()??;
            if fields.next().is_some() {
                return None;
            }
            Some(GeoSample::new(lon, lat, value))
        })
        .filter(GeoSample::is_finite)
        .collect()
}

/// Keep the samples within `radius_m` metres of `center` (`(lon, lat)`).
pub fn within_radius(samples: &[GeoSample], center: (f64, f64), radius_m: f64) -> Vec<GeoSample> {
    samples
        .iter()
        .filter(|s| geo_distance(center, (s.lon, s.lat)) < radius_m)
        .copied()
        .collect()
}
