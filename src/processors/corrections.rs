//! Geometric corrections for height fields.
//!
//! The standard SPM pre-processing primitives: row-wise leveling,
//! least-squares plane removal, and scar filtering. Every function returns a
//! new field and leaves its input untouched; the batch pipeline applies them
//! through [`apply_chain`] with the pinned [`DEFAULT_CHAIN`] order.

use ndarray::Array2;

use crate::core::loaders::HeightField;

/// One correction primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStep {
    /// Subtract each scan line's mean from that line.
    LineLevel,
    /// Fit and subtract a global tilt plane.
    PlaneFit,
    /// Replace scar pixels with the average of their vertical neighbors.
    ScarFilter,
}

/// The production correction sequence.
///
/// Each step conditions on the residual left by the previous one, so the
/// order is load-bearing: leveling and plane removal are repeated because a
/// single pass of either exposes residual artifacts that the other, or the
/// scar filter, then reveals.
pub const DEFAULT_CHAIN: [CorrectionStep; 6] = [
    CorrectionStep::LineLevel,
    CorrectionStep::PlaneFit,
    CorrectionStep::ScarFilter,
    CorrectionStep::PlaneFit,
    CorrectionStep::LineLevel,
    CorrectionStep::PlaneFit,
];

/// Remove per-scan-line offset drift by subtracting each row's mean.
pub fn correct_lines(field: &HeightField) -> HeightField {
    if field.is_empty() {
        return field.clone();
    }
    let mut out = field.data().clone();
    for mut row in out.rows_mut() {
        let mean = row.sum() / row.len() as f64;
        row.mapv_inplace(|v| v - mean);
    }
    HeightField::new(out)
}

/// Fit `z = a + b*col + c*row` by least squares over all pixels and subtract
/// the fitted plane.
///
/// On a full rectangular grid the column and row indices are uncorrelated,
/// so the two slope estimates separate into independent 1D fits.
pub fn correct_plane(field: &HeightField) -> HeightField {
    let rows = field.rows();
    let cols = field.cols();
    if rows == 0 || cols == 0 {
        return field.clone();
    }

    let data = field.data();
    let col_center = (cols as f64 - 1.0) / 2.0;
    let row_center = (rows as f64 - 1.0) / 2.0;
    let mean = data.sum() / field.len() as f64;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxz = 0.0;
    let mut syz = 0.0;
    for ((r, c), &z) in data.indexed_iter() {
        let dx = c as f64 - col_center;
        let dy = r as f64 - row_center;
        sxx += dx * dx;
        syy += dy * dy;
        sxz += dx * z;
        syz += dy * z;
    }

    // Single-row or single-column fields leave a slope underdetermined;
    // treat it as zero.
    let col_slope = if sxx > 0.0 { sxz / sxx } else { 0.0 };
    let row_slope = if syy > 0.0 { syz / syy } else { 0.0 };

    let out = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let plane = mean
            + col_slope * (c as f64 - col_center)
            + row_slope * (r as f64 - row_center);
        data[[r, c]] - plane
    });
    HeightField::new(out)
}

/// Remove linear scan artifacts (probe skips) from interior rows.
///
/// A pixel is a scar candidate when the rows above and below agree with each
/// other but disagree with the current row:
/// `|below - above| < threshold * 0.5 * (|cur - above| + |cur - below|)`.
/// Candidates are replaced by the average of their vertical neighbors, read
/// from the input field. Fields with fewer than three rows pass through
/// unchanged.
pub fn filter_scars(field: &HeightField, threshold: f64) -> HeightField {
    let rows = field.rows();
    let cols = field.cols();
    if rows < 3 {
        return field.clone();
    }

    let data = field.data();
    let mut out = data.clone();
    for r in 1..rows - 1 {
        for c in 0..cols {
            let above = data[[r - 1, c]];
            let cur = data[[r, c]];
            let below = data[[r + 1, c]];
            let neighbor_gap = (below - above).abs();
            let deviation = (cur - above).abs() + (cur - below).abs();
            if neighbor_gap < threshold * 0.5 * deviation {
                out[[r, c]] = 0.5 * (above + below);
            }
        }
    }
    HeightField::new(out)
}

/// Apply one correction step.
pub fn apply_step(field: &HeightField, step: CorrectionStep, scar_threshold: f64) -> HeightField {
    match step {
        CorrectionStep::LineLevel => correct_lines(field),
        CorrectionStep::PlaneFit => correct_plane(field),
        CorrectionStep::ScarFilter => filter_scars(field, scar_threshold),
    }
}

/// Apply a correction sequence in order, keeping only the latest result.
pub fn apply_chain(
    field: &HeightField,
    chain: &[CorrectionStep],
    scar_threshold: f64,
) -> HeightField {
    let mut current = field.clone();
    for step in chain {
        current = apply_step(&current, *step, scar_threshold);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAR_THRESHOLD: f64 = 0.7;

    fn field_from(rows: usize, cols: usize, values: Vec<f64>) -> HeightField {
        HeightField::from_rows(rows, cols, values).unwrap()
    }

    fn assert_fields_close(a: &HeightField, b: &HeightField, tol: f64) {
        assert_eq!(a.rows(), b.rows());
        assert_eq!(a.cols(), b.cols());
        for ((r, c), &v) in a.data().indexed_iter() {
            assert!(
                (v - b.get(r, c)).abs() < tol,
                "mismatch at ({r}, {c}): {v} vs {}",
                b.get(r, c)
            );
        }
    }

    #[test]
    fn test_line_leveling_removes_row_offsets() {
        // Constant offset per row, no in-row structure.
        let field = field_from(3, 2, vec![5.0, 5.0, -2.0, -2.0, 9.0, 9.0]);
        let leveled = correct_lines(&field);
        for &v in leveled.data() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_line_leveling_keeps_in_row_structure() {
        let field = field_from(1, 4, vec![1.0, 2.0, 3.0, 4.0]);
        let leveled = correct_lines(&field);
        assert_eq!(
            leveled,
            field_from(1, 4, vec![-1.5, -0.5, 0.5, 1.5])
        );
    }

    #[test]
    fn test_plane_fit_flattens_tilted_plane() {
        // z = 2 + 3*col + 4*row, an exact plane.
        let rows = 4;
        let cols = 5;
        let values: Vec<f64> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| 2.0 + 3.0 * c as f64 + 4.0 * r as f64))
            .collect();
        let field = field_from(rows, cols, values);

        let flattened = correct_plane(&field);
        for &v in flattened.data() {
            assert!(v.abs() < 1e-9, "residual {v} after plane removal");
        }
    }

    #[test]
    fn test_plane_fit_preserves_non_planar_residual() {
        // A pure checker residual has no plane component to remove.
        let field = field_from(2, 2, vec![1.0, -1.0, -1.0, 1.0]);
        let flattened = correct_plane(&field);
        assert_fields_close(&flattened, &field, 1e-12);
    }

    #[test]
    fn test_scar_filter_repairs_corrupted_row() {
        // Smooth vertical ramp with row 2 knocked far out of line.
        let rows = 5;
        let cols = 4;
        let mut values: Vec<f64> = (0..rows)
            .flat_map(|r| (0..cols).map(move |_| r as f64))
            .collect();
        for c in 0..cols {
            values[2 * cols + c] += 10.0;
        }
        let field = field_from(rows, cols, values);

        let repaired = filter_scars(&field, SCAR_THRESHOLD);
        for c in 0..cols {
            assert_eq!(repaired.get(2, c), 2.0, "scar row not repaired");
        }
        // Neighboring rows read the original values and stay put.
        for c in 0..cols {
            assert_eq!(repaired.get(1, c), 1.0);
            assert_eq!(repaired.get(3, c), 3.0);
        }
    }

    #[test]
    fn test_scar_filter_leaves_smooth_field_alone() {
        let rows = 6;
        let cols = 3;
        let values: Vec<f64> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| r as f64 * 2.0 + c as f64))
            .collect();
        let field = field_from(rows, cols, values);

        let filtered = filter_scars(&field, SCAR_THRESHOLD);
        assert_eq!(filtered, field);
    }

    #[test]
    fn test_scar_filter_needs_three_rows() {
        let field = field_from(2, 2, vec![0.0, 100.0, -100.0, 0.0]);
        assert_eq!(filter_scars(&field, SCAR_THRESHOLD), field);
    }

    #[test]
    fn test_default_chain_is_pinned() {
        use CorrectionStep::*;
        assert_eq!(
            DEFAULT_CHAIN,
            [LineLevel, PlaneFit, ScarFilter, PlaneFit, LineLevel, PlaneFit]
        );
    }

    #[test]
    fn test_chain_matches_manual_application() {
        let rows = 4;
        let cols = 4;
        let values: Vec<f64> = (0..rows * cols).map(|i| ((i * 7) % 5) as f64).collect();
        let field = field_from(rows, cols, values);

        let chained = apply_chain(&field, &DEFAULT_CHAIN, SCAR_THRESHOLD);

        let mut manual = field.clone();
        manual = correct_lines(&manual);
        manual = correct_plane(&manual);
        manual = filter_scars(&manual, SCAR_THRESHOLD);
        manual = correct_plane(&manual);
        manual = correct_lines(&manual);
        manual = correct_plane(&manual);

        assert_eq!(chained, manual);
    }

    #[test]
    fn test_chain_leaves_flat_field_unchanged() {
        let field = field_from(4, 4, vec![0.0; 16]);
        let corrected = apply_chain(&field, &DEFAULT_CHAIN, SCAR_THRESHOLD);
        assert_eq!(corrected, field);
    }

    #[test]
    fn test_chain_flattens_tilt_and_offsets() {
        // Row offsets plus a tilt plane: everything the chain exists to remove.
        let rows = 5;
        let cols = 5;
        let offsets = [3.0, -1.0, 0.5, 2.0, -4.0];
        let values: Vec<f64> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| offsets[r] + 0.25 * c as f64 + 1.5 * r as f64))
            .collect();
        let field = field_from(rows, cols, values);

        let corrected = apply_chain(&field, &DEFAULT_CHAIN, SCAR_THRESHOLD);
        for &v in corrected.data() {
            assert!(v.abs() < 1e-9, "residual {v} after full chain");
        }
    }

    #[test]
    fn test_corrections_do_not_mutate_input() {
        let field = field_from(3, 3, vec![4.0, 1.0, 7.0, 2.0, 9.0, 0.0, 5.0, 3.0, 8.0]);
        let snapshot = field.clone();

        let _ = correct_lines(&field);
        let _ = correct_plane(&field);
        let _ = filter_scars(&field, SCAR_THRESHOLD);
        let _ = apply_chain(&field, &DEFAULT_CHAIN, SCAR_THRESHOLD);

        assert_eq!(field, snapshot);
    }
}
