//! Uniform grid aggregation of planar samples.

use bevy_math::DVec2;
use error_stack::Report;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::HeatmapError;

/// Value stored in cells that received no sample.
pub const EMPTY_CELL: f64 = f64::NAN;

/// Largest grid `aggregate` will allocate.
pub const MAX_CELLS: usize = 1 << 24;

/// A planar sample ready for gridding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl Sample {
    pub const fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }
}

/// Axis-aligned box in planar coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanarBounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl PlanarBounds {
    pub const fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Tight bounds of all sample positions, `None` for an empty slice.
    pub fn of_samples(samples: &[Sample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        for s in samples {
            min.x = min.x.min(s.x);
            min.y = min.y.min(s.y);
            max.x = max.x.max(s.x);
            max.y = max.y.max(s.y);
        }
        Some(Self { min, max })
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }
}

/// Half-open rectangle of cell indices, `min..max` on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl CellBounds {
    pub const fn new(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }
}

/// Aggregated raster of averaged sample values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    /// Row-major, indexed by `x + y * width`. Empty cells hold [`EMPTY_CELL`].
    pub cells: Vec<f64>,
    /// Planar coordinates of the grid's minimum corner.
    pub origin: DVec2,
    /// Cell size in planar units.
    pub step: DVec2,
}

impl Grid {
    pub fn empty(step: DVec2) -> Self {
        Self {
            width: 0,
            height: 0,
            cells: Vec::new(),
            origin: DVec2::ZERO,
            step,
        }
    }

    /// Build a grid from precomputed cell values. NaN marks an empty cell.
    pub fn from_cells(
        width: usize,
        height: usize,
        cells: Vec<f64>,
        origin: DVec2,
        step: DVec2,
    ) -> crate::Result<Self> {
        if cells.len() != width * height {
            return Err(Report::new(HeatmapError::InvalidData(format!(
                "grid of {}x{} needs {} cells, got {}",
                width,
                height,
                width * height,
                cells.len()
            ))));
        }
        Ok(Self {
            width,
            height,
            cells,
            origin,
            step,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value of cell `(x, y)`, `None` when out of range or empty.
    pub fn cell(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let v = self.cells[x + y * self.width];
        (!v.is_nan()).then_some(v)
    }

    pub fn non_empty_count(&self) -> usize {
        self.cells.iter().filter(|v| !v.is_nan()).count()
    }

    /// Non-empty cells as `(x, y, value)`, x outer and y inner.
    pub fn iter_non_empty(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.width).flat_map(move |x| {
            (0..self.height).filter_map(move |y| self.cell(x, y).map(|v| (x, y, v)))
        })
    }

    /// The whole grid as a cell rectangle.
    pub fn full_bounds(&self) -> CellBounds {
        CellBounds::new(0, 0, self.width, self.height)
    }

    /// Map a planar box onto cell indices, flooring both corners and clamping
    /// to `[0, width] x [0, height]`.
    pub fn cell_bounds_of(&self, bounds: &PlanarBounds) -> CellBounds {
        let to_cell = |v: f64, origin: f64, step: f64, limit: usize| -> usize {
            let c = ((v - origin) / step).floor();
            if c.is_nan() || c <= 0.0 {
                0
            } else if c >= limit as f64 {
                limit
            } else {
                c as usize
            }
        };

        CellBounds::new(
            to_cell(bounds.min.x, self.origin.x, self.step.x, self.width),
            to_cell(bounds.min.y, self.origin.y, self.step.y, self.height),
            to_cell(bounds.max.x, self.origin.x, self.step.x, self.width),
            to_cell(bounds.max.y, self.origin.y, self.step.y, self.height),
        )
    }
}

/// Number of cells needed to cover `span` with cells of `step`; at least one.
fn cell_count(span: f64, step: f64) -> usize {
    let n = (span / step).ceil();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// Cell index of `coord`, clamped into `[0, count - 1]`.
fn cell_index(coord: f64, min: f64, step: f64, count: usize) -> usize {
    let i = ((coord - min) / step).floor();
    if i.is_finite() && i > 0.0 {
        (i as usize).min(count - 1)
    } else {
        0
    }
}

/// Average `samples` into a uniform grid with cells of size `step`.
///
/// Without `bounds` the grid covers the tight box of the samples. Samples are
/// accumulated in the order given so the output is reproducible bit for bit.
pub fn aggregate(samples: &[Sample], step: DVec2, bounds: Option<PlanarBounds>) -> Grid {
    let Some(bounds) = bounds.or_else(|| PlanarBounds::of_samples(samples)) else {
        return Grid::empty(step);
    };
    if samples.is_empty() {
        return Grid::empty(step);
    }

    let span = bounds.size();
    let width = cell_count(span.x, step.x);
    let height = cell_count(span.y, step.y);

    let total = match width.checked_mul(height) {
        Some(total) if total <= MAX_CELLS => total,
        _ => {
            warn!(width, height, "grid too large for step, skipping aggregation");
            return Grid::empty(step);
        }
    };

    let mut sums = vec![0.0; total];
    let mut counts = vec![0u32; total];

    for s in samples {
        let cx = cell_index(s.x, bounds.min.x, step.x, width);
        let cy = cell_index(s.y, bounds.min.y, step.y, height);
        let idx = cx + cy * width;
        sums[idx] += s.value;
        counts[idx] += 1;
    }

    let cells = sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            if count > 0 {
                sum / count as f64
            } else {
                EMPTY_CELL
            }
        })
        .collect();

    Grid {
        width,
        height,
        cells,
        origin: bounds.min,
        step,
    }
}
