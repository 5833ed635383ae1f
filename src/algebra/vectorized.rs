use super::summary::{col_means, col_sds, row_means, row_sds};
use crate::error::{MatrixError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Elementwise operation applied between a matrix and a vector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOp {
    Subtract,
    Add,
    Multiply,
    Divide,
}

impl SweepOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            SweepOp::Subtract => a - b,
            SweepOp::Add => a + b,
            SweepOp::Multiply => a * b,
            SweepOp::Divide => a / b,
        }
    }
}

fn sweep(x: &ArrayView2<f64>, v: &ArrayView1<f64>, axis: Axis, op: SweepOp) -> Result<Array2<f64>> {
    let expected = x.len_of(axis);
    if v.len() != expected {
        return Err(MatrixError::DimensionMismatch {
            left: x.dim(),
            right: (v.len(), 1),
        });
    }

    let mut out = x.to_owned();
    for (mut lane, &b) in out.axis_iter_mut(axis).zip(v.iter()) {
        lane.mapv_inplace(|a| op.apply(a, b));
    }

    Ok(out)
}

/// Apply `op` between row `i` of `x` and `v[i]`
pub fn sweep_rows(x: &ArrayView2<f64>, v: &ArrayView1<f64>, op: SweepOp) -> Result<Array2<f64>> {
    sweep(x, v, Axis(0), op)
}

/// Apply `op` between column `j` of `x` and `v[j]`
pub fn sweep_cols(x: &ArrayView2<f64>, v: &ArrayView1<f64>, op: SweepOp) -> Result<Array2<f64>> {
    sweep(x, v, Axis(1), op)
}

pub fn center_columns(x: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let means = col_means(x)?;
    sweep_cols(x, &means.view(), SweepOp::Subtract)
}

/// Center every column and divide by its standard deviation.
/// Constant columns (sd of zero) map to zero.
pub fn standardize_columns(x: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let centered = center_columns(x)?;
    let sds = col_sds(x)?.mapv(|sd| if sd > 0f64 { sd } else { f64::INFINITY });

    sweep_cols(&centered.view(), &sds.view(), SweepOp::Divide)
}

/// `(x - row_means) / row_sds`
pub fn standardize_rows(x: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let centered = sweep_rows(x, &row_means(x)?.view(), SweepOp::Subtract)?;
    let sds = row_sds(x)?.mapv(|sd| if sd > 0f64 { sd } else { f64::INFINITY });

    sweep_rows(&centered.view(), &sds.view(), SweepOp::Divide)
}
