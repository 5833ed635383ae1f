use super::summary::col_sds;
use crate::error::Result;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::debug;

/// Keep only the columns whose standard deviation is above `min_sd`.
/// Returns the reduced matrix and the indices of the kept columns.
/// The result stays two-dimensional even when a single column survives.
pub fn select_columns_by_sd(x: &ArrayView2<f64>, min_sd: f64) -> Result<(Array2<f64>, Vec<usize>)> {
    let sds = col_sds(x)?;
    let kept: Vec<usize> = sds
        .iter()
        .enumerate()
        .filter(|(_, &sd)| sd > min_sd)
        .map(|(i, _)| i)
        .collect();

    debug!(kept = kept.len(), total = x.ncols(), min_sd, "filtered columns by sd");

    Ok((x.select(Axis(1), &kept), kept))
}

/// Set every value strictly below `threshold` to zero
pub fn zero_below(x: &ArrayView2<f64>, threshold: f64) -> Array2<f64> {
    x.mapv(|v| if v < threshold { 0f64 } else { v })
}

/// Set every value strictly between `low` and `high` to zero
pub fn zero_between(x: &ArrayView2<f64>, low: f64, high: f64) -> Array2<f64> {
    x.mapv(|v| if v > low && v < high { 0f64 } else { v })
}

/// 1 where the value is above `threshold`, 0 elsewhere
pub fn binarize(x: &ArrayView2<f64>, threshold: f64) -> Array2<f64> {
    x.mapv(|v| if v > threshold { 1f64 } else { 0f64 })
}

pub fn count_nonzero_by_column(x: &ArrayView2<f64>) -> Array1<usize> {
    x.map_axis(Axis(0), |col| col.iter().filter(|&&v| v != 0f64).count())
}
