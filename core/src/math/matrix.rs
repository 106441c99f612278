use ndarray::{Array2, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Multiply two 2D arrays.
    pub fn multiply(lhs: ArrayView2<f64>, rhs: ArrayView2<f64>) -> Array2<f64> {
        lhs.dot(&rhs)
    }

    pub fn from_rows3(rows: &[[f64; 3]; 3]) -> Array2<f64> {
        Array2::from_shape_fn((3, 3), |(r, c)| rows[r][c])
    }

    /// `(I + D)(I + M) G`, the channel-to-body mapping with both corrections applied.
    pub fn corrected_mapping(
        dmat: ArrayView2<f64>,
        mmat: ArrayView2<f64>,
        gmat: ArrayView2<f64>,
    ) -> Array2<f64> {
        let eye = Array2::<f64>::eye(3);
        let left = &eye + &dmat;
        let right = &eye + &mmat;
        left.dot(&right).dot(&gmat)
    }

    pub fn norm3(v: &[f64; 3]) -> f64 {
        Self::dot3(v, v).sqrt()
    }

    pub fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn corrected_mapping_without_corrections_is_g() {
        let g = array![[1.0, 0.0, 0.0, 0.5], [0.0, 1.0, 0.0, 0.5], [0.0, 0.0, 1.0, 0.5]];
        let zero = Array2::<f64>::zeros((3, 3));
        let product = MatrixHelper::corrected_mapping(zero.view(), zero.view(), g.view());
        assert_eq!(product, g);
    }

    #[test]
    fn corrected_mapping_applies_d_before_m() {
        let g = Array2::<f64>::eye(3);
        let d = array![[0.0, 0.1, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let m = array![[0.0, 0.0, 0.0], [0.0, 0.0, 0.2], [0.0, 0.0, 0.0]];
        let product = MatrixHelper::corrected_mapping(d.view(), m.view(), g.view());
        // (I + D)(I + M) picks up the D*M cross term in row 0
        assert!((product[[0, 2]] - 0.02).abs() < 1e-15);
        assert!((product[[1, 2]] - 0.2).abs() < 1e-15);
    }

    #[test]
    fn cross_product_is_right_handed() {
        assert_eq!(
            MatrixHelper::cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]),
            [0.0, 0.0, 1.0]
        );
    }
}
