//! Percentile based value range of a grid, optionally limited to a viewport.

use serde::{Deserialize, Serialize};

use crate::grid::{CellBounds, Grid};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Value at fractional rank `p` of an ascending slice, never past the end.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let idx = (n as f64 * p.clamp(0.0, 1.0)).floor() as usize;
    sorted[idx.min(n - 1)]
}

/// Robust min/max over the non-empty cells inside `bounds`.
///
/// `bounds` defaults to the whole grid and is clipped to it. Returns `None`
/// when no non-empty cell falls inside, in which case the caller keeps its
/// previous range.
pub fn find_range(
    grid: &Grid,
    bounds: Option<CellBounds>,
    min_percentile: f64,
    max_percentile: f64,
) -> Option<ValueRange> {
    let b = bounds.unwrap_or_else(|| grid.full_bounds());
    let max_x = b.max_x.min(grid.width);
    let max_y = b.max_y.min(grid.height);

    let mut values = Vec::new();
    for x in b.min_x..max_x {
        for y in b.min_y..max_y {
            if let Some(v) = grid.cell(x, y) {
                values.push(v);
            }
        }
    }

    if values.is_empty() {
        return None;
    }

    values.sort_by(f64::total_cmp);

    Some(ValueRange {
        min: percentile(&values, min_percentile),
        max: percentile(&values, max_percentile),
    })
}
