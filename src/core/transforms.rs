//! Field normalization and pixel-to-physical coordinate mapping.

use crate::core::loaders::{EmptyFieldError, HeightField};

/// Shift a field so its minimum sits at exactly 0.0.
///
/// The RMS roughness statistic is unaffected by this shift; it exists so the
/// rendered surface rests on the z-axis floor.
///
/// # Errors
///
/// Returns [`EmptyFieldError`] for a zero-sized field, where no minimum
/// exists.
pub fn normalize_to_zero(field: &HeightField) -> Result<HeightField, EmptyFieldError> {
    if field.is_empty() {
        return Err(EmptyFieldError {
            operation: "normalization",
        });
    }
    let min = field.min();
    Ok(HeightField::new(field.data().mapv(|v| v - min)))
}

/// Physical coordinates for one axis: `index * nm_per_pixel`.
///
/// Row and column indices map to the two lateral axes with the same run-wide
/// scale factor.
pub fn physical_axis(len: usize, nm_per_pixel: f64) -> Vec<f64> {
    (0..len).map(|i| i as f64 * nm_per_pixel).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_minimum_is_zero() {
        let field = HeightField::from_rows(2, 2, vec![3.0, 5.0, 7.0, 9.0]).unwrap();
        let normalized = normalize_to_zero(&field).unwrap();
        assert_eq!(normalized.min(), 0.0);
        assert_eq!(normalized.get(0, 0), 0.0);
        assert_eq!(normalized.get(1, 1), 6.0);
    }

    #[test]
    fn test_normalize_zero_based_field_unchanged() {
        let field = HeightField::from_rows(2, 2, vec![0.0, 2.0, 4.0, 6.0]).unwrap();
        let normalized = normalize_to_zero(&field).unwrap();
        assert_eq!(normalized, field);
    }

    #[test]
    fn test_normalize_handles_negative_fields() {
        let field = HeightField::from_rows(1, 3, vec![-4.0, -2.0, -1.0]).unwrap();
        let normalized = normalize_to_zero(&field).unwrap();
        assert_eq!(normalized.min(), 0.0);
        assert_eq!(normalized.get(0, 2), 3.0);
    }

    #[test]
    fn test_normalize_empty_field_errors() {
        let field = HeightField::from_rows(0, 0, Vec::new()).unwrap();
        assert!(normalize_to_zero(&field).is_err());
    }

    #[test]
    fn test_physical_axis_spacing() {
        let axis = physical_axis(4, 1.5);
        assert_eq!(axis, vec![0.0, 1.5, 3.0, 4.5]);
    }

    #[test]
    fn test_physical_axis_maximum_extent() {
        // For an n-point axis the farthest coordinate is (n-1) * scale,
        // independent of any height values.
        let n = 2;
        let axis = physical_axis(n, 2.0);
        assert_eq!(axis.last().copied(), Some((n as f64 - 1.0) * 2.0));

        let axis = physical_axis(512, 2000.0 / 1024.0);
        let expected = 511.0 * 2000.0 / 1024.0;
        assert!((axis.last().copied().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_physical_axis_empty() {
        assert!(physical_axis(0, 1.0).is_empty());
    }
}
