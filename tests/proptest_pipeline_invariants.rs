//! Property-based invariant tests for the grid → range → mesh pipeline.
//!
//! 1. Every cell holds the mean of exactly the samples inside it
//! 2. Empty cells are reported as empty, never as zero
//! 3. Grid width/height follow ceil(span / step)
//! 4. min <= max whenever the min percentile <= the max percentile
//! 5. An animation lands exactly on its target and then stays put
//! 6. Mesh vertex count is non_empty * faces * 9
//! 7. Scenario: two identical samples average into one cell
//! 8. Scenario: percentile range over a sparse row

use bevy_math::DVec2;
use prism_heatmap::animation::AnimatedScalar;
use prism_heatmap::grid::{Grid, PlanarBounds, Sample, aggregate};
use prism_heatmap::ingest::GeoSample;
use prism_heatmap::mesh::{MeshOptions, VERTICES_PER_FACE, build};
use prism_heatmap::range::{ValueRange, find_range};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────

const CELLS: usize = 8;
const STEP: f64 = 10.0;

/// A sample strictly inside cell `(cx, cy)` of an 8x8 grid of 10-unit cells,
/// so floating point never puts it on a cell boundary.
fn arb_cell_sample() -> impl Strategy<Value = (usize, usize, Sample)> {
    (
        0..CELLS,
        0..CELLS,
        0.05f64..0.95,
        0.05f64..0.95,
        -1000.0f64..1000.0,
    )
        .prop_map(|(cx, cy, fx, fy, value)| {
            let s = Sample::new((cx as f64 + fx) * STEP, (cy as f64 + fy) * STEP, value);
            (cx, cy, s)
        })
}

fn arb_grid() -> impl Strategy<Value = Grid> {
    (1usize..12, 1usize..12).prop_flat_map(|(w, h)| {
        prop::collection::vec(
            prop_oneof![
                1 => Just(f64::NAN),
                3 => -500.0f64..500.0,
            ],
            w * h,
        )
        .prop_map(move |cells| Grid::from_cells(w, h, cells, DVec2::ZERO, DVec2::ONE).unwrap())
    })
}

// ═════════════════════════════════════════════════════════════════════
// 1 + 2. Aggregation correctness
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn cells_hold_the_mean_of_their_samples(
        placed in prop::collection::vec(arb_cell_sample(), 1..64),
    ) {
        let bounds = PlanarBounds::new(
            DVec2::ZERO,
            DVec2::splat(CELLS as f64 * STEP),
        );
        let samples: Vec<Sample> = placed.iter().map(|(_, _, s)| *s).collect();
        let grid = aggregate(&samples, DVec2::splat(STEP), Some(bounds));

        prop_assert_eq!((grid.width, grid.height), (CELLS, CELLS));

        for cx in 0..CELLS {
            for cy in 0..CELLS {
                let mut sum = 0.0;
                let mut count = 0usize;
                for (x, y, s) in &placed {
                    if (*x, *y) == (cx, cy) {
                        sum += s.value;
                        count += 1;
                    }
                }
                let expected = (count > 0).then(|| sum / count as f64);
                prop_assert_eq!(grid.cell(cx, cy), expected, "cell ({}, {})", cx, cy);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════
// 3. Grid sizing
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn grid_size_follows_span(
        points in prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 2..40),
        step in 1.0f64..5e5,
    ) {
        let samples: Vec<Sample> = points.iter().map(|&(x, y)| Sample::new(x, y, 1.0)).collect();
        let grid = aggregate(&samples, DVec2::splat(step), None);
        let b = PlanarBounds::of_samples(&samples).unwrap();

        let expect = |span: f64| ((span / step).ceil() as usize).max(1);
        prop_assert_eq!(grid.width, expect(b.size().x));
        prop_assert_eq!(grid.height, expect(b.size().y));
        prop_assert_eq!(grid.cells.len(), grid.width * grid.height);

        let total: usize = grid.non_empty_count();
        prop_assert!(total >= 1 && total <= samples.len());
    }

    #[test]
    fn single_sample_is_a_unit_grid(x in -1e9f64..1e9, y in -1e9f64..1e9, v in -1e3f64..1e3) {
        let grid = aggregate(&[Sample::new(x, y, v)], DVec2::splat(50_000.0), None);
        prop_assert_eq!((grid.width, grid.height), (1, 1));
        prop_assert_eq!(grid.cell(0, 0), Some(v));
    }
}

// ═════════════════════════════════════════════════════════════════════
// 4. Percentile monotonicity
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn percentile_range_is_ordered(
        grid in arb_grid(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        match find_range(&grid, None, lo, hi) {
            Some(r) => {
                prop_assert!(r.min <= r.max, "{:?} for p=({}, {})", r, lo, hi);
                prop_assert!(grid.non_empty_count() > 0);
            }
            None => prop_assert_eq!(grid.non_empty_count(), 0),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════
// 5. Animation convergence
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn animation_lands_on_target(
        from in -1e6f64..1e6,
        to in -1e6f64..1e6,
        start in 0.0f64..1e9,
        duration in 0u32..10_000,
        extra in 0.0f64..1e4,
    ) {
        let mut a = AnimatedScalar::new(from);
        a.start(to, duration, start);
        a.poll(start + duration as f64);
        prop_assert_eq!(a.value(), to);

        prop_assert!(!a.poll(start + duration as f64 + extra));
        prop_assert!(!a.poll(start + duration as f64 + extra + 1.0));
        prop_assert_eq!(a.value(), to);
    }

    #[test]
    fn animation_stays_between_endpoints(
        from in -1e3f64..1e3,
        to in -1e3f64..1e3,
        duration in 1u32..1000,
        at in 0.0f64..2000.0,
    ) {
        let mut a = AnimatedScalar::new(from);
        a.start(to, duration, 0.0);
        a.poll(at);
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        prop_assert!(a.value() >= lo - 1e-9 && a.value() <= hi + 1e-9);
    }
}

// ═════════════════════════════════════════════════════════════════════
// 6. Mesh vertex count
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mesh_vertex_count(grid in arb_grid(), faces in 2u32..=16) {
        let mesh = build(&grid, MeshOptions { faces_per_column: faces });
        prop_assert_eq!(
            mesh.vertex_count(),
            grid.non_empty_count() * faces as usize * VERTICES_PER_FACE
        );
    }
}

// ═════════════════════════════════════════════════════════════════════
// 7 + 8. Scenarios
// ═════════════════════════════════════════════════════════════════════

#[test]
fn identical_geo_samples_share_one_cell() {
    let samples: Vec<Sample> = [
        GeoSample::new(37.0, 55.0, 10.0),
        GeoSample::new(37.0, 55.0, 20.0),
    ]
    .iter()
    .map(GeoSample::project)
    .collect();

    let span = PlanarBounds::of_samples(&samples).unwrap().size();
    let grid = aggregate(&samples, span, None);
    assert_eq!((grid.width, grid.height), (1, 1));
    assert_eq!(grid.cell(0, 0), Some(15.0));

    let grid = aggregate(&samples, DVec2::splat(50_000.0), None);
    assert_eq!(grid.cells, vec![15.0]);
}

#[test]
fn sparse_row_percentiles() {
    let cells = vec![f64::NAN, 1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN];
    let grid = Grid::from_cells(7, 1, cells, DVec2::ZERO, DVec2::ONE).unwrap();
    assert_eq!(
        find_range(&grid, None, 0.0, 1.0),
        Some(ValueRange { min: 1.0, max: 5.0 })
    );
}

#[test]
fn degenerate_animation() {
    let mut a = AnimatedScalar::new(2.0);
    a.start(8.0, 300, 1_000.0);
    a.poll(1_000.0);
    assert_eq!(a.value(), 2.0);

    let mut a = AnimatedScalar::new(2.0);
    a.start(8.0, 0, 1_000.0);
    a.poll(1_000.0);
    assert_eq!(a.value(), 8.0);
}
