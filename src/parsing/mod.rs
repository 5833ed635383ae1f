use ndarray::{Array1, Array2, ArrayView1, Axis};

pub mod mnist;

/// The digits table: one image per row, one label per image
#[derive(Debug, Clone)]
pub struct Dataset {
    pub pixels: Array2<f64>,
    pub labels: Array1<usize>,
}

impl Dataset {
    pub fn nrows(&self) -> usize {
        self.pixels.nrows()
    }

    /// Pixels of image `i` as a flat vector
    pub fn image(&self, i: usize) -> Option<ArrayView1<f64>> {
        (i < self.nrows()).then(|| self.pixels.row(i))
    }

    /// All images labelled with `digit`
    pub fn rows_with_label(&self, digit: usize) -> Array2<f64> {
        let idx: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == digit)
            .map(|(i, _)| i)
            .collect();

        self.pixels.select(Axis(0), &idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tiny() -> Dataset {
        Dataset {
            pixels: array![[0., 1.], [2., 3.], [4., 5.]],
            labels: array![7, 1, 7],
        }
    }

    #[test]
    fn rows_with_label_keeps_matching_images() {
        let sevens = tiny().rows_with_label(7);
        assert_eq!(sevens, array![[0., 1.], [4., 5.]]);
        assert_eq!(tiny().rows_with_label(3).nrows(), 0);
    }

    #[test]
    fn debug_output_shows_labels() {
        let shown = format!("{:?}", tiny());
        assert!(shown.contains("labels"));
        assert!(shown.contains("pixels"));
    }

    #[test]
    fn image_out_of_range_is_none() {
        let d = tiny();
        assert_eq!(d.image(1).unwrap(), array![2., 3.]);
        assert!(d.image(3).is_none());
    }
}
