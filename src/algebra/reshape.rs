use crate::error::{MatrixError, Result};
use crate::parsing::mnist::{IMAGE_SIDE, NUM_FEATURES};
use ndarray::{Array2, ArrayView1, ShapeBuilder};
use tracing::warn;

/// How a flat vector fills the cells of a matrix
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Fill the first column top to bottom, then the second, ...
    ColumnMajor,
    RowMajor,
}

fn from_order(values: Vec<f64>, nrows: usize, ncols: usize, order: Order) -> Result<Array2<f64>> {
    let actual = values.len();
    let shape = match order {
        Order::ColumnMajor => (nrows, ncols).f(),
        Order::RowMajor => (nrows, ncols).into_shape(),
    };

    Array2::from_shape_vec(shape, values)
        .map(|m| m.as_standard_layout().to_owned())
        .map_err(|_| MatrixError::LengthMismatch {
            expected: nrows * ncols,
            actual,
        })
}

/// Fill an `nrows x ncols` matrix from `values`, which must have exactly one value per cell
pub fn reshape(values: &[f64], nrows: usize, ncols: usize, order: Order) -> Result<Array2<f64>> {
    if values.len() != nrows * ncols {
        return Err(MatrixError::LengthMismatch {
            expected: nrows * ncols,
            actual: values.len(),
        });
    }

    from_order(values.to_vec(), nrows, ncols, order)
}

/// True when `len` values tile `cells` cells exactly, either by repeating or by truncating
fn recycles_evenly(len: usize, cells: usize) -> bool {
    len > 0 && (cells % len == 0 || len % cells.max(1) == 0)
}

/// Fill a matrix like `reshape`, but reuse values from the start when there are too few
/// and drop the surplus when there are too many.
///
/// A warning is logged when the cell count is not a multiple of the vector length,
/// since the result then silently mixes partial copies of the input.
pub fn reshape_recycled(
    values: &[f64],
    nrows: usize,
    ncols: usize,
    order: Order,
) -> Result<Array2<f64>> {
    if values.is_empty() {
        return Err(MatrixError::Empty);
    }

    let cells = nrows * ncols;
    if !recycles_evenly(values.len(), cells) {
        warn!(
            len = values.len(),
            nrows, ncols, "vector length is not a sub-multiple or multiple of the cell count"
        );
    }

    let recycled: Vec<f64> = values.iter().copied().cycle().take(cells).collect();

    from_order(recycled, nrows, ncols, order)
}

/// Lay out one image as its 28x28 pixel grid (column-major fill)
pub fn digit_grid(image: ArrayView1<f64>) -> Result<Array2<f64>> {
    if image.len() != NUM_FEATURES {
        return Err(MatrixError::LengthMismatch {
            expected: NUM_FEATURES,
            actual: image.len(),
        });
    }

    from_order(image.to_vec(), IMAGE_SIDE, IMAGE_SIDE, Order::ColumnMajor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s, Array1};

    fn seq(n: usize) -> Vec<f64> {
        (1..=n).map(|x| x as f64).collect()
    }

    #[test]
    fn column_major_fills_down_columns() {
        let m = reshape(&seq(15), 5, 3, Order::ColumnMajor).unwrap();
        assert_eq!(m.row(0).to_vec(), vec![1., 6., 11.]);
        assert_eq!(m.column(2).to_vec(), vec![11., 12., 13., 14., 15.]);
    }

    #[test]
    fn row_major_is_transpose_of_column_major() {
        let by_col = reshape(&seq(15), 5, 3, Order::ColumnMajor).unwrap();
        let by_row = reshape(&seq(15), 3, 5, Order::RowMajor).unwrap();
        assert_eq!(by_col, by_row.t());
        assert_eq!(by_row.row(0).to_vec(), vec![1., 2., 3., 4., 5.]);
    }

    #[test]
    fn strict_reshape_rejects_wrong_length() {
        let err = reshape(&seq(12), 5, 3, Order::ColumnMajor).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::LengthMismatch {
                expected: 15,
                actual: 12
            }
        ));
    }

    #[test]
    fn recycling_reuses_values() {
        let m = reshape_recycled(&seq(12), 5, 3, Order::ColumnMajor).unwrap();
        assert_eq!(m.column(2).to_vec(), vec![11., 12., 1., 2., 3.]);

        let truncated = reshape_recycled(&seq(6), 2, 2, Order::RowMajor).unwrap();
        assert_eq!(truncated, array![[1., 2.], [3., 4.]]);

        assert!(reshape_recycled(&[], 2, 2, Order::RowMajor).is_err());
    }

    #[test]
    fn uneven_recycling_is_detected() {
        assert!(recycles_evenly(5, 15));
        assert!(recycles_evenly(30, 15));
        assert!(recycles_evenly(15, 15));
        assert!(!recycles_evenly(12, 15));
        assert!(!recycles_evenly(0, 15));

        // The uneven case still produces a full matrix
        let m = reshape_recycled(&seq(4), 3, 2, Order::RowMajor).unwrap();
        assert_eq!(m, array![[1., 2.], [3., 4.], [1., 2.]]);
    }

    #[test]
    fn digit_grid_places_pixels_column_major() {
        let image = Array1::from(seq(NUM_FEATURES));
        let grid = digit_grid(image.view()).unwrap();
        assert_eq!(grid.dim(), (28, 28));
        assert_eq!(grid[[1, 0]], 2.);
        assert_eq!(grid[[0, 1]], 29.);
        // transposing gives the image row by row
        assert_eq!(grid.t().row(0).to_vec(), seq(28));
        assert!(digit_grid(image.slice(s![..10])).is_err());
    }
}
