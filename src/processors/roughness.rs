//! RMS roughness statistic.

use crate::core::loaders::{EmptyFieldError, HeightField};

/// Root-mean-square deviation of the samples from their mean, i.e. the
/// population standard deviation of the flattened field.
///
/// The statistic is computed over the whole field as one population, never
/// per row or per column, and is invariant under adding a constant to every
/// sample.
///
/// # Errors
///
/// Returns [`EmptyFieldError`] for a zero-sized field.
pub fn rms_roughness(field: &HeightField) -> Result<f64, EmptyFieldError> {
    if field.is_empty() {
        return Err(EmptyFieldError {
            operation: "RMS roughness",
        });
    }
    let n = field.len() as f64;
    let mean = field.data().sum() / n;
    let variance = field
        .data()
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Ok(variance.sqrt())
}
