use crate::error::{MatrixError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array, Array1, Array2, ArrayView1, ArrayView2};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

/// LU pivots at or below this times the largest absolute entry count as zero
const SINGULAR_EPS: f64 = 1e-12;
/// Tolerance used to decide the rank from the diagonal of R
const RANK_TOL: f64 = 1e-7;

pub fn transpose(x: &ArrayView2<f64>) -> Array2<f64> {
    x.t().to_owned()
}

/// Matrix product, checking that the inner dimensions agree
pub fn matmul(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> Result<Array2<f64>> {
    if a.ncols() != b.nrows() {
        return Err(MatrixError::DimensionMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }
    Ok(a.dot(b))
}

/// `x^T x`
pub fn crossprod(x: &ArrayView2<f64>) -> Array2<f64> {
    x.t().dot(x)
}

pub fn is_symmetric(x: &ArrayView2<f64>, tol: f64) -> bool {
    x.is_square()
        && x
            .indexed_iter()
            .all(|((i, j), &v)| (v - x[[j, i]]).abs() <= tol)
}

fn largest_abs(x: &ArrayView2<f64>) -> f64 {
    x.iter().fold(0f64, |acc, v| acc.max(v.abs()))
}

fn to_dmatrix(x: &ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[[i, j]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Inverse through an LU factorization with partial pivoting
pub fn inverse(a: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let (nrows, ncols) = a.dim();
    if nrows != ncols {
        return Err(MatrixError::NotSquare { nrows, ncols });
    }
    if nrows == 0 {
        return Err(MatrixError::Empty);
    }

    let lu = to_dmatrix(a).lu();
    let tol = SINGULAR_EPS * largest_abs(a);
    let smallest_pivot = lu
        .u()
        .diagonal()
        .iter()
        .fold(f64::INFINITY, |acc, v| acc.min(v.abs()));

    if smallest_pivot <= tol {
        debug!(smallest_pivot, tol, "pivot below tolerance");
        return Err(MatrixError::Singular);
    }

    lu.try_inverse()
        .map(|inv| from_dmatrix(&inv))
        .ok_or(MatrixError::Singular)
}

/// QR factorization with column pivoting: `a[:, pivot] = q r`.
/// `q` is m x k with orthonormal columns and `r` is k x n upper triangular, where k = min(m, n).
#[derive(Debug, Clone)]
pub struct Qr {
    pub q: Array2<f64>,
    pub r: Array2<f64>,
    /// Column `j` of `q r` is column `pivot[j]` of the input
    pub pivot: Vec<usize>,
}

pub fn qr(a: &ArrayView2<f64>) -> Result<Qr> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err(MatrixError::Empty);
    }

    let decomposition = to_dmatrix(a).col_piv_qr();

    // Replay the column swaps on the column indices to recover where each column went
    let mut order = DMatrix::from_fn(1, n, |_, j| j as f64);
    decomposition.p().permute_columns(&mut order);
    let pivot = order.iter().map(|&j| j as usize).collect();

    Ok(Qr {
        q: from_dmatrix(&decomposition.q()),
        r: from_dmatrix(&decomposition.r()),
        pivot,
    })
}

impl Qr {
    /// Number of diagonal entries of `r` that are not negligible next to the largest one
    pub fn rank(&self) -> usize {
        let diag = self.r.diag();
        let largest = diag.iter().fold(0f64, |acc, v| acc.max(v.abs()));

        diag.iter()
            .filter(|v| v.abs() > RANK_TOL * largest)
            .count()
    }

    /// Least-squares coefficients `b` minimizing `|a b - y|`
    pub fn solve_least_squares(&self, y: &ArrayView1<f64>) -> Result<Array1<f64>> {
        let (m, k) = self.q.dim();
        let n = self.r.ncols();

        if y.len() != m {
            return Err(MatrixError::DimensionMismatch {
                left: (m, n),
                right: (y.len(), 1),
            });
        }
        if m < n {
            return Err(MatrixError::Underdetermined { nrows: m, ncols: n });
        }
        if self.rank() < n {
            return Err(MatrixError::Singular);
        }

        let qty = self.q.t().dot(y);
        let r = DMatrix::from_fn(k, n, |i, j| self.r[[i, j]]);
        let rhs = DVector::from_iterator(k, qty.iter().copied());
        let z = r
            .solve_upper_triangular(&rhs)
            .ok_or(MatrixError::Singular)?;

        let mut b = Array1::<f64>::zeros(n);
        for (j, &col) in self.pivot.iter().enumerate() {
            b[col] = z[j];
        }

        Ok(b)
    }
}

/// Matrix of uniform values in [-1, 1), reproducible from `seed`
pub fn random_matrix(nrows: usize, ncols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let distribution = Uniform::new(-1f64, 1f64);

    Array::zeros((nrows, ncols)).map(|_: &f64| distribution.sample(&mut rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "{} vs {}", x, y);
        }
    }

    #[test]
    fn matmul_checks_inner_dimension() {
        let a = array![[1., 2.], [3., 4.], [5., 6.]];
        let b = array![[1., 0., 2.], [0., 1., 1.]];
        assert_eq!(
            matmul(&a.view(), &b.view()).unwrap(),
            array![[1., 2., 4.], [3., 4., 10.], [5., 6., 16.]]
        );
        assert!(matches!(
            matmul(&a.view(), &a.view()),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn crossprod_is_symmetric_and_matches_transpose_product() {
        let x = random_matrix(100, 10, 1);
        let cp = crossprod(&x.view());
        assert!(is_symmetric(&cp.view(), 1e-12));
        assert_close(&cp, &transpose(&x.view()).dot(&x), 1e-12);
        assert!(!is_symmetric(&x.view(), 1e-12));
    }

    #[test]
    fn inverse_of_crossprod() {
        let x = random_matrix(100, 10, 7);
        let cp = crossprod(&x.view());
        let inv = inverse(&cp.view()).unwrap();
        assert_close(&inv.dot(&cp), &Array2::eye(10), 1e-9);
    }

    #[test]
    fn inverse_needs_pivoting() {
        let a = array![[0., 1.], [2., 0.]];
        let inv = inverse(&a.view()).unwrap();
        assert_close(&inv, &array![[0., 0.5], [1., 0.]], 1e-12);
    }

    #[test]
    fn inverse_rejects_singular_and_rectangular() {
        let singular = array![[1., 2.], [2., 4.]];
        assert!(matches!(inverse(&singular.view()), Err(MatrixError::Singular)));

        let rect = array![[1., 2., 3.]];
        assert!(matches!(
            inverse(&rect.view()),
            Err(MatrixError::NotSquare { nrows: 1, ncols: 3 })
        ));
    }

    fn reassembled(fit: &Qr, x: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        (fit.q.dot(&fit.r), x.select(Axis(1), &fit.pivot))
    }

    #[test]
    fn inverse_rejects_nearly_singular_with_small_entries() {
        let tiny = array![[1e-3, 2e-3], [2e-3, 4e-3 + 1e-18]];
        assert!(matches!(inverse(&tiny.view()), Err(MatrixError::Singular)));

        // Small but well conditioned is fine
        let small = array![[1e-3, 0.], [0., 2e-3]];
        let inv = inverse(&small.view()).unwrap();
        assert_close(&inv, &array![[1e3, 0.], [0., 5e2]], 1e-9);
    }

    #[test]
    fn qr_reconstructs_input() {
        let x = random_matrix(20, 5, 3);
        let fit = qr(&x.view()).unwrap();

        assert_eq!(fit.q.dim(), (20, 5));
        assert_eq!(fit.r.dim(), (5, 5));
        let mut seen = fit.pivot.clone();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        let (qr_product, permuted) = reassembled(&fit, &x);
        assert_close(&qr_product, &permuted, 1e-10);
        assert_close(&fit.q.t().dot(&fit.q), &Array2::eye(5), 1e-10);
        for ((i, j), v) in fit.r.indexed_iter() {
            if i > j {
                assert!(v.abs() < 1e-12);
            }
        }
    }

    #[test]
    fn qr_least_squares_recovers_coefficients() {
        let x = random_matrix(50, 3, 11);
        let beta = array![2., -1., 0.5];
        let y = x.dot(&beta);

        let fit = qr(&x.view()).unwrap();
        assert_eq!(fit.rank(), 3);
        let b = fit.solve_least_squares(&y.view()).unwrap();
        for (got, want) in b.iter().zip(beta.iter()) {
            assert!((got - want).abs() < 1e-10);
        }
    }

    #[test]
    fn qr_detects_rank_deficiency() {
        let x = array![[1., 2.], [2., 4.], [3., 6.]];
        let fit = qr(&x.view()).unwrap();
        assert_eq!(fit.rank(), 1);
        assert!(matches!(
            fit.solve_least_squares(&array![1., 2., 3.].view()),
            Err(MatrixError::Singular)
        ));
    }

    #[test]
    fn rank_ignores_leading_zero_columns() {
        // Blank border pixels give all-zero leading columns
        let x = array![[0., 1., 0.], [0., 0., 1.], [0., 0., 0.], [0., 0., 0.]];
        let fit = qr(&x.view()).unwrap();
        assert_eq!(fit.rank(), 2);
        let (qr_product, permuted) = reassembled(&fit, &x);
        assert_close(&qr_product, &permuted, 1e-12);

        let single = array![[0., 1.], [0., 0.], [0., 0.]];
        assert_eq!(qr(&single.view()).unwrap().rank(), 1);
    }

    #[test]
    fn least_squares_with_zero_column_first() {
        let x = array![[0., 1., 2.], [1., 0., 1.], [2., 1., 0.], [1., 1., 1.]];
        let beta = array![3., -2., 1.];
        let y = x.dot(&beta);

        let fit = qr(&x.view()).unwrap();
        assert_eq!(fit.rank(), 3);
        let b = fit.solve_least_squares(&y.view()).unwrap();
        for (got, want) in b.iter().zip(beta.iter()) {
            assert!((got - want).abs() < 1e-10);
        }
    }

    #[test]
    fn wide_matrices_factor_but_cannot_be_solved() {
        let wide = array![[1., 0., 2.], [0., 1., 3.]];
        let fit = qr(&wide.view()).unwrap();
        assert_eq!(fit.q.dim(), (2, 2));
        assert_eq!(fit.r.dim(), (2, 3));
        assert_eq!(fit.rank(), 2);
        assert!(matches!(
            fit.solve_least_squares(&array![1., 1.].view()),
            Err(MatrixError::Underdetermined { nrows: 2, ncols: 3 })
        ));
    }
}
