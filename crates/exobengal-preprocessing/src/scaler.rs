use exobengal_core::{Tensor, TensorError, TensorResult};

/// Unsupervised column-wise transform learned from training rows.
pub trait Transformer {
    fn fit(&mut self, x: &Tensor<f64>) -> TensorResult<()>;
    fn transform(&self, x: &Tensor<f64>) -> TensorResult<Tensor<f64>>;

    fn fit_transform(&mut self, x: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Replaces NaN cells with the column mean of the fitted data.
#[derive(Debug, Clone, Default)]
pub struct SimpleImputer {
    pub means: Option<Vec<f64>>,
}

impl SimpleImputer {
    pub fn new() -> Self {
        SimpleImputer { means: None }
    }

    pub fn from_means(means: Vec<f64>) -> Self {
        SimpleImputer { means: Some(means) }
    }
}

impl Transformer for SimpleImputer {
    /// A column with no observed values imputes to 0.
    fn fit(&mut self, x: &Tensor<f64>) -> TensorResult<()> {
        let (rows, cols) = (x.nrows()?, x.ncols()?);
        if rows == 0 {
            return Err(TensorError::EmptyTensor);
        }
        let mut sums = vec![0.0; cols];
        let mut counts = vec![0usize; cols];
        for i in 0..rows {
            for (j, &v) in x.row_slice(i)?.iter().enumerate() {
                if !v.is_nan() {
                    sums[j] += v;
                    counts[j] += 1;
                }
            }
        }
        let means = sums
            .iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
            .collect();
        self.means = Some(means);
        Ok(())
    }

    fn transform(&self, x: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let means = self.means.as_ref().ok_or(TensorError::NotFitted("SimpleImputer"))?;
        check_width(x, means.len())?;
        let cols = means.len();
        let filled: Vec<f64> = x
            .data()
            .iter()
            .enumerate()
            .map(|(k, &v)| if v.is_nan() { means[k % cols] } else { v })
            .collect();
        Tensor::new(filled, x.shape_vec())
    }
}

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Uses the population standard deviation; constant columns get a scale
/// of 1 so they map to 0 instead of NaN.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    pub mean: Option<Vec<f64>>,
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler {
            mean: None,
            scale: None,
        }
    }

    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        StandardScaler {
            mean: Some(mean),
            scale: Some(scale),
        }
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Tensor<f64>) -> TensorResult<()> {
        let mean = x.mean_axis(0)?;
        let std = x.std_axis0()?;
        self.scale = Some(
            std.data()
                .iter()
                .map(|&s| if s.abs() < f64::EPSILON { 1.0 } else { s })
                .collect(),
        );
        self.mean = Some(mean.into_data());
        Ok(())
    }

    fn transform(&self, x: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(TensorError::NotFitted("StandardScaler")),
        };
        check_width(x, mean.len())?;
        let centered = x.sub(&Tensor::new(mean.clone(), vec![1, mean.len()])?)?;
        centered.div(&Tensor::new(scale.clone(), vec![1, scale.len()])?)
    }
}

fn check_width(x: &Tensor<f64>, expected: usize) -> TensorResult<()> {
    let cols = x.ncols()?;
    if cols != expected {
        return Err(TensorError::DimensionMismatch(format!(
            "fitted on {expected} columns, got {cols}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standard_scaler() {
        let x = Tensor::from_vec2d(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();

        let mut scaler = StandardScaler::new();
        let transformed = scaler.fit_transform(&x).unwrap();

        let mean = transformed.mean_axis(0).unwrap();
        assert_abs_diff_eq!(mean.data()[0], 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(mean.data()[1], 0.0, epsilon = 1e-10);
        // population std of {1,3,5} is sqrt(8/3)
        assert_abs_diff_eq!(scaler.scale.unwrap()[0], (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = Tensor::from_vec2d(&[vec![7.0, 1.0], vec![7.0, 2.0]]).unwrap();
        let mut scaler = StandardScaler::new();
        let t = scaler.fit_transform(&x).unwrap();
        assert_eq!(scaler.scale.as_ref().unwrap()[0], 1.0);
        assert_eq!(t.get(&[0, 0]).unwrap(), 0.0);
        assert_eq!(t.get(&[1, 0]).unwrap(), 0.0);
    }

    #[test]
    fn test_unfitted_transform_errors() {
        let x = Tensor::<f64>::zeros(vec![1, 2]);
        assert_eq!(
            StandardScaler::new().transform(&x),
            Err(TensorError::NotFitted("StandardScaler"))
        );
        assert!(SimpleImputer::new().transform(&x).is_err());
    }

    #[test]
    fn test_imputer_fills_column_means() {
        let x = Tensor::from_vec2d(&[
            vec![1.0, f64::NAN],
            vec![f64::NAN, 4.0],
            vec![3.0, 8.0],
        ])
        .unwrap();
        let mut imputer = SimpleImputer::new();
        let t = imputer.fit_transform(&x).unwrap();
        assert_eq!(t.get(&[1, 0]).unwrap(), 2.0);
        assert_eq!(t.get(&[0, 1]).unwrap(), 6.0);
        assert_eq!(t.get(&[2, 1]).unwrap(), 8.0);
    }

    #[test]
    fn test_imputer_all_missing_column() {
        let x = Tensor::from_vec2d(&[vec![f64::NAN, 1.0], vec![f64::NAN, 3.0]]).unwrap();
        let mut imputer = SimpleImputer::new();
        imputer.fit(&x).unwrap();
        assert_eq!(imputer.means.unwrap(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&Tensor::from_vec2d(&[vec![1.0, 2.0], vec![2.0, 3.0]]).unwrap()).unwrap();
        assert!(scaler.transform(&Tensor::zeros(vec![1, 3])).is_err());
    }
}
