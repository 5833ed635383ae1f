use crate::error::{MatrixError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use std::collections::BTreeMap;

pub fn row_sums(x: &ArrayView2<f64>) -> Array1<f64> {
    x.sum_axis(Axis(1))
}

pub fn col_sums(x: &ArrayView2<f64>) -> Array1<f64> {
    x.sum_axis(Axis(0))
}

pub fn row_means(x: &ArrayView2<f64>) -> Result<Array1<f64>> {
    x.mean_axis(Axis(1)).ok_or(MatrixError::Empty)
}

pub fn col_means(x: &ArrayView2<f64>) -> Result<Array1<f64>> {
    x.mean_axis(Axis(0)).ok_or(MatrixError::Empty)
}

/// Sample standard deviation of every row (n - 1 in the denominator)
pub fn row_sds(x: &ArrayView2<f64>) -> Result<Array1<f64>> {
    if x.ncols() == 0 {
        return Err(MatrixError::Empty);
    }
    Ok(x.std_axis(Axis(1), 1f64))
}

/// Sample standard deviation of every column (n - 1 in the denominator)
pub fn col_sds(x: &ArrayView2<f64>) -> Result<Array1<f64>> {
    if x.nrows() == 0 {
        return Err(MatrixError::Empty);
    }
    Ok(x.std_axis(Axis(0), 1f64))
}

/// Reduce every row to one value with `f`
pub fn apply_rows<F>(x: &ArrayView2<f64>, f: F) -> Array1<f64>
where
    F: FnMut(ArrayView1<f64>) -> f64,
{
    x.map_axis(Axis(1), f)
}

/// Reduce every column to one value with `f`
pub fn apply_cols<F>(x: &ArrayView2<f64>, f: F) -> Array1<f64>
where
    F: FnMut(ArrayView1<f64>) -> f64,
{
    x.map_axis(Axis(0), f)
}

/// Minimum, quartiles and maximum of a sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiveNumber {
    pub min: f64,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
    pub max: f64,
}

/// Quantile of an already sorted sample, interpolating linearly between order statistics
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;

    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

impl FiveNumber {
    pub fn from_values(values: ArrayView1<f64>) -> Result<FiveNumber> {
        if values.is_empty() {
            return Err(MatrixError::Empty);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Ok(FiveNumber {
            min: sorted[0],
            lower_quartile: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            upper_quartile: quantile_sorted(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

fn group_by_label(values: ArrayView1<f64>, labels: ArrayView1<usize>) -> BTreeMap<usize, Vec<f64>> {
    let mut groups: BTreeMap<usize, Vec<f64>> = BTreeMap::new();

    for (&v, &l) in values.iter().zip(labels.iter()) {
        groups.entry(l).or_default().push(v);
    }

    groups
}

/// Five-number summary of `values` for every label present
pub fn summary_by_label(
    values: ArrayView1<f64>,
    labels: ArrayView1<usize>,
) -> Result<BTreeMap<usize, FiveNumber>> {
    if values.len() != labels.len() {
        return Err(MatrixError::LengthMismatch {
            expected: labels.len(),
            actual: values.len(),
        });
    }

    group_by_label(values, labels)
        .into_iter()
        .map(|(label, group)| Ok((label, FiveNumber::from_values(Array1::from(group).view())?)))
        .collect()
}

/// Share of pixels strictly between two intensities, per digit and overall
#[derive(Clone, Debug, PartialEq)]
pub struct RangeProportion {
    pub overall: f64,
    pub by_label: BTreeMap<usize, f64>,
}

pub fn proportion_in_range(
    x: &ArrayView2<f64>,
    labels: ArrayView1<usize>,
    low: f64,
    high: f64,
) -> Result<RangeProportion> {
    if x.nrows() != labels.len() {
        return Err(MatrixError::LengthMismatch {
            expected: x.nrows(),
            actual: labels.len(),
        });
    }
    if x.is_empty() {
        return Err(MatrixError::Empty);
    }

    let per_row = apply_rows(x, |row| {
        row.iter().filter(|&&v| v > low && v < high).count() as f64
    });
    let ncols = x.ncols() as f64;

    let by_label = group_by_label(per_row.view(), labels)
        .into_iter()
        .map(|(label, counts)| {
            let pixels = counts.len() as f64 * ncols;
            (label, counts.iter().sum::<f64>() / pixels)
        })
        .collect();

    Ok(RangeProportion {
        overall: per_row.sum() / x.len() as f64,
        by_label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sums_and_means() {
        let x = array![[1., 2., 3.], [4., 5., 6.]];
        assert_eq!(row_sums(&x.view()), array![6., 15.]);
        assert_eq!(col_sums(&x.view()), array![5., 7., 9.]);
        assert_eq!(row_means(&x.view()).unwrap(), array![2., 5.]);
        assert_eq!(col_means(&x.view()).unwrap(), array![2.5, 3.5, 4.5]);
    }

    #[test]
    fn sds_use_sample_denominator() {
        let x = array![[2., 4., 4., 4., 5., 5., 7., 9.]];
        // population sd is 2, sample sd is sqrt(32 / 7)
        assert!(close(row_sds(&x.view()).unwrap()[0], (32f64 / 7f64).sqrt()));
        assert!(close(col_sds(&x.t()).unwrap()[0], (32f64 / 7f64).sqrt()));
    }

    #[test]
    fn sds_of_empty_matrix_error() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(matches!(col_sds(&x.view()), Err(MatrixError::Empty)));
        assert!(col_means(&x.view()).is_err());
    }

    #[test]
    fn apply_matches_builtin_reductions() {
        let x = array![[1., 9.], [3., 3.], [0., 2.]];
        let maxes = apply_rows(&x.view(), |r| r.fold(f64::MIN, |a, &b| a.max(b)));
        assert_eq!(maxes, array![9., 3., 2.]);
        let sums = apply_cols(&x.view(), |c| c.sum());
        assert_eq!(sums, col_sums(&x.view()));
    }

    #[test]
    fn five_number_interpolates_quartiles() {
        let s = FiveNumber::from_values(array![7., 1., 3., 5.].view()).unwrap();
        assert_eq!(s.min, 1.);
        assert!(close(s.lower_quartile, 2.5));
        assert!(close(s.median, 4.));
        assert!(close(s.upper_quartile, 5.5));
        assert_eq!(s.max, 7.);

        let single = FiveNumber::from_values(array![3.].view()).unwrap();
        assert_eq!(single.median, 3.);
    }

    #[test]
    fn summary_groups_by_label() {
        let values = array![1., 10., 3., 20.];
        let labels = array![0, 1, 0, 1];
        let s = summary_by_label(values.view(), labels.view()).unwrap();
        assert_eq!(s.len(), 2);
        assert!(close(s[&0].median, 2.));
        assert!(close(s[&1].max, 20.));

        assert!(summary_by_label(values.view(), array![0].view()).is_err());
    }

    #[test]
    fn proportion_in_grey_range() {
        let x = array![[0., 100., 255., 60.], [0., 0., 0., 204.]];
        let labels = array![3, 8];
        let p = proportion_in_range(&x.view(), labels.view(), 50., 205.).unwrap();
        assert!(close(p.overall, 3. / 8.));
        assert!(close(p.by_label[&3], 0.5));
        assert!(close(p.by_label[&8], 0.25));
    }
}
