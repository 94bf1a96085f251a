use crate::dtype::Float;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// N-dimensional tensor stored as a flat row-major `Vec<T>`.
///
/// Feature matrices are `[n_samples, n_features]`; label vectors are
/// `[n_samples]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> TensorResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: s.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape: s })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ZERO)
    }

    pub fn ones(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ONE)
    }

    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![value; s.numel()],
            shape: s,
        }
    }

    /// 0-d tensor holding a single value.
    pub fn scalar(value: T) -> Self {
        Tensor {
            data: vec![value],
            shape: Shape::scalar(),
        }
    }

    /// 1-D tensor copied from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// 2-D tensor from equally sized rows.
    pub fn from_vec2d(data: &[Vec<T>]) -> TensorResult<Self> {
        if data.is_empty() {
            return Ok(Tensor::zeros(vec![0, 0]));
        }
        let cols = data[0].len();
        if data.iter().any(|row| row.len() != cols) {
            return Err(TensorError::InvalidOperation(
                "All rows must have the same number of columns".to_string(),
            ));
        }
        let flat: Vec<T> = data.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::new(flat, vec![data.len(), cols])
    }

    /// Uniform samples in [0, 1) drawn from a caller-owned generator.
    pub fn rand_with<R: Rng>(shape: Vec<usize>, rng: &mut R) -> Self {
        let s = Shape::new(shape);
        let data: Vec<T> = (0..s.numel()).map(|_| T::from_f64(rng.gen::<f64>())).collect();
        Tensor { data, shape: s }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Number of rows of a 2-D tensor.
    pub fn nrows(&self) -> TensorResult<usize> {
        self.require_2d("nrows")?;
        self.shape.dim(0)
    }

    /// Number of columns of a 2-D tensor.
    pub fn ncols(&self) -> TensorResult<usize> {
        self.require_2d("ncols")?;
        self.shape.dim(1)
    }

    /// The single element of a one-element tensor.
    pub fn item(&self) -> TensorResult<T> {
        if self.data.len() != 1 {
            return Err(TensorError::InvalidOperation(format!(
                "item() requires exactly 1 element, got {}",
                self.data.len()
            )));
        }
        Ok(self.data[0])
    }

    /// Multi-dimensional indexing.
    pub fn get(&self, indices: &[usize]) -> TensorResult<T> {
        if indices.len() != self.ndim() {
            return Err(TensorError::DimensionMismatch(format!(
                "Expected {} indices, got {}",
                self.ndim(),
                indices.len()
            )));
        }
        let strides = self.shape.strides();
        let mut offset = 0;
        for (axis, &idx) in indices.iter().enumerate() {
            let size = self.shape.dim(axis)?;
            if idx >= size {
                return Err(TensorError::IndexOutOfBounds { index: idx, axis, size });
            }
            offset += idx * strides[axis];
        }
        Ok(self.data[offset])
    }

    /// Borrow row `i` of a 2-D tensor.
    pub fn row_slice(&self, i: usize) -> TensorResult<&[T]> {
        let rows = self.nrows()?;
        let cols = self.ncols()?;
        if i >= rows {
            return Err(TensorError::IndexOutOfBounds { index: i, axis: 0, size: rows });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Gather the given rows (in order, repeats allowed) of a 2-D tensor.
    pub fn select_rows(&self, indices: &[usize]) -> TensorResult<Tensor<T>> {
        let cols = self.ncols()?;
        let mut data = Vec::with_capacity(indices.len() * cols);
        for &i in indices {
            data.extend_from_slice(self.row_slice(i)?);
        }
        Tensor::new(data, vec![indices.len(), cols])
    }

    /// Gather elements of a 1-D tensor.
    pub fn select(&self, indices: &[usize]) -> TensorResult<Tensor<T>> {
        if self.ndim() != 1 {
            return Err(TensorError::InvalidOperation(
                "select requires a 1D tensor".to_string(),
            ));
        }
        let size = self.data.len();
        let mut data = Vec::with_capacity(indices.len());
        for &i in indices {
            if i >= size {
                return Err(TensorError::IndexOutOfBounds { index: i, axis: 0, size });
            }
            data.push(self.data[i]);
        }
        Ok(Tensor::from_slice(&data))
    }

    fn require_2d(&self, op: &str) -> TensorResult<()> {
        if self.ndim() != 2 {
            return Err(TensorError::InvalidOperation(format!(
                "{op}() requires a 2D tensor, got shape {}",
                self.shape
            )));
        }
        Ok(())
    }

    pub fn reshape(&self, new_shape: Vec<usize>) -> TensorResult<Tensor<T>> {
        let ns = Shape::new(new_shape);
        if self.numel() != ns.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: ns.to_vec(),
                got: self.shape_vec(),
            });
        }
        Ok(Tensor {
            data: self.data.clone(),
            shape: ns,
        })
    }

    /// Transpose a 2-D tensor.
    pub fn t(&self) -> TensorResult<Tensor<T>> {
        let shape = self.shape.transposed()?;
        let rows = self.shape.dim(0)?;
        let cols = self.shape.dim(1)?;
        let mut data = vec![T::ZERO; self.numel()];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data[i * cols + j];
            }
        }
        Ok(Tensor { data, shape })
    }

    /// Insert a dimension of size 1 at `axis`.
    pub fn unsqueeze(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let mut dims = self.shape.to_vec();
        if axis > dims.len() {
            return Err(TensorError::InvalidAxis {
                axis,
                ndim: self.ndim(),
            });
        }
        dims.insert(axis, 1);
        Ok(Tensor {
            data: self.data.clone(),
            shape: Shape::new(dims),
        })
    }

    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    pub fn ln(&self) -> Tensor<T> {
        self.apply(T::ln)
    }

    pub fn sqrt(&self) -> Tensor<T> {
        self.apply(T::sqrt)
    }

    pub fn relu(&self) -> Tensor<T> {
        self.apply(|x| if x > T::ZERO { x } else { T::ZERO })
    }

    /// Logistic sigmoid, evaluated without overflow for large |x|.
    pub fn sigmoid(&self) -> Tensor<T> {
        self.apply(|x| {
            if x >= T::ZERO {
                T::ONE / (T::ONE + (-x).exp())
            } else {
                let e = x.exp();
                e / (T::ONE + e)
            }
        })
    }

    pub fn add_scalar(&self, s: T) -> Tensor<T> {
        self.apply(|x| x + s)
    }

    pub fn mul_scalar(&self, s: T) -> Tensor<T> {
        self.apply(|x| x * s)
    }

    pub fn div_scalar(&self, s: T) -> Tensor<T> {
        self.apply(|x| x / s)
    }

    fn broadcast_binary_op<F: Fn(T, T) -> T>(
        &self,
        other: &Tensor<T>,
        op: F,
    ) -> TensorResult<Tensor<T>> {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| op(a, b))
                .collect();
            return Ok(Tensor {
                data,
                shape: self.shape.clone(),
            });
        }

        let out_shape = Shape::broadcast_shape(&self.shape, &other.shape)?;
        let out_dims = out_shape.dims();
        let out_strides = out_shape.strides();
        let ndim = out_dims.len();
        let a_index = BroadcastIndex::new(&self.shape, ndim);
        let b_index = BroadcastIndex::new(&other.shape, ndim);

        let mut data = Vec::with_capacity(out_shape.numel());
        for flat in 0..out_shape.numel() {
            let mut remaining = flat;
            let mut a_offset = 0usize;
            let mut b_offset = 0usize;
            for d in 0..ndim {
                let idx = remaining / out_strides[d];
                remaining %= out_strides[d];
                a_offset += a_index.offset(d, idx);
                b_offset += b_index.offset(d, idx);
            }
            data.push(op(self.data[a_offset], other.data[b_offset]));
        }

        Ok(Tensor {
            data,
            shape: out_shape,
        })
    }

    pub fn add(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a / b)
    }

    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    pub fn mean_all(&self) -> T {
        self.sum_all() / T::from_usize(self.numel())
    }

    /// Sum along `axis`, removing that dimension.
    pub fn sum_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let dims = self.shape.dims();
        if axis >= dims.len() {
            return Err(TensorError::InvalidAxis {
                axis,
                ndim: self.ndim(),
            });
        }

        let outer: usize = dims[..axis].iter().product();
        let axis_size = dims[axis];
        let inner: usize = dims[axis + 1..].iter().product();

        let mut new_dims = dims.to_vec();
        new_dims.remove(axis);
        if new_dims.is_empty() {
            new_dims.push(1);
        }

        let mut result = vec![T::ZERO; outer * inner];
        for o in 0..outer {
            for a in 0..axis_size {
                for i in 0..inner {
                    result[o * inner + i] += self.data[o * axis_size * inner + a * inner + i];
                }
            }
        }

        Tensor::new(result, new_dims)
    }

    pub fn mean_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let axis_size = self.shape.dim(axis)?;
        if axis_size == 0 {
            return Err(TensorError::EmptyTensor);
        }
        Ok(self.sum_axis(axis)?.div_scalar(T::from_usize(axis_size)))
    }

    /// Population variance of each column of a 2-D tensor.
    pub fn var_axis0(&self) -> TensorResult<Tensor<T>> {
        let rows = self.nrows()?;
        let cols = self.ncols()?;
        let mean = self.mean_axis(0)?;
        let mut result = vec![T::ZERO; cols];
        for i in 0..rows {
            for j in 0..cols {
                let diff = self.data[i * cols + j] - mean.data[j];
                result[j] += diff * diff;
            }
        }
        Tensor::new(
            result.into_iter().map(|v| v / T::from_usize(rows)).collect(),
            vec![cols],
        )
    }

    pub fn std_axis0(&self) -> TensorResult<Tensor<T>> {
        Ok(self.var_axis0()?.sqrt())
    }

    /// 2-D matrix product.
    pub fn matmul(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.require_2d("matmul")?;
        other.require_2d("matmul")?;
        let (m, k) = (self.shape.dim(0)?, self.shape.dim(1)?);
        let (k2, n) = (other.shape.dim(0)?, other.shape.dim(1)?);
        if k != k2 {
            return Err(TensorError::DimensionMismatch(format!(
                "matmul: inner dimensions must match, got {} and {}",
                k, k2
            )));
        }

        // i-p-j loop order keeps the inner loop on contiguous memory.
        let mut data = vec![T::ZERO; m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                let b_row = &other.data[p * n..(p + 1) * n];
                let out = &mut data[i * n..(i + 1) * n];
                for (o, &b) in out.iter_mut().zip(b_row) {
                    *o += a * b;
                }
            }
        }
        Tensor::new(data, vec![m, n])
    }
}

/// Maps an output coordinate back into a (possibly broadcast) operand.
struct BroadcastIndex {
    lead: usize,
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl BroadcastIndex {
    fn new(shape: &Shape, out_ndim: usize) -> Self {
        BroadcastIndex {
            lead: out_ndim - shape.ndim(),
            dims: shape.to_vec(),
            strides: shape.strides(),
        }
    }

    fn offset(&self, out_axis: usize, idx: usize) -> usize {
        if out_axis < self.lead {
            return 0;
        }
        let d = out_axis - self.lead;
        if self.dims[d] > 1 {
            idx * self.strides[d]
        } else {
            0
        }
    }
}

impl<T: Float> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_creation() {
        let t: Tensor<f64> = Tensor::zeros(vec![3, 4]);
        assert_eq!(t.shape_vec(), vec![3, 4]);
        assert_eq!(t.numel(), 12);

        let t: Tensor<f64> = Tensor::ones(vec![2, 3]);
        assert_eq!(t.sum_all(), 6.0);
        assert!(Tensor::<f64>::new(vec![1.0, 2.0], vec![3]).is_err());
    }

    #[test]
    fn test_from_vec2d() {
        let t: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
        ])
        .unwrap();
        assert_eq!(t.shape_vec(), vec![2, 3]);
        assert_eq!(t.get(&[1, 2]).unwrap(), 6.0);
        assert!(Tensor::<f64>::from_vec2d(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_select_rows() {
        let t: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
        ])
        .unwrap();
        let picked = t.select_rows(&[2, 0, 2]).unwrap();
        assert_eq!(picked.shape_vec(), vec![3, 2]);
        assert_eq!(picked.data(), &[5.0, 6.0, 1.0, 2.0, 5.0, 6.0]);
        assert!(t.select_rows(&[3]).is_err());
    }

    #[test]
    fn test_broadcasting() {
        let a: Tensor<f64> = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let b: Tensor<f64> = Tensor::new(vec![10.0, 20.0, 30.0], vec![1, 3]).unwrap();
        let c = a.add(&b).unwrap();
        assert_eq!(c.data(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        let s = Tensor::scalar(1.0);
        let d = s.sub(&a).unwrap();
        assert_eq!(d.shape_vec(), vec![2, 3]);
        assert_eq!(d.data()[5], -5.0);
    }

    #[test]
    fn test_matmul() {
        let a: Tensor<f64> = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let b: Tensor<f64> =
            Tensor::new(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], vec![3, 2]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape_vec(), vec![2, 2]);
        assert_eq!(c.data(), &[58.0, 64.0, 139.0, 154.0]);
        assert!(a.matmul(&a).is_err());
    }

    #[test]
    fn test_transpose() {
        let a: Tensor<f64> = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let t = a.t().unwrap();
        assert_eq!(t.shape_vec(), vec![3, 2]);
        assert_eq!(t.get(&[1, 0]).unwrap(), 2.0);
        assert_eq!(t.get(&[2, 1]).unwrap(), 6.0);
    }

    #[test]
    fn test_column_statistics() {
        let a: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 10.0],
            vec![3.0, 10.0],
            vec![5.0, 10.0],
        ])
        .unwrap();
        let mean = a.mean_axis(0).unwrap();
        assert_eq!(mean.data(), &[3.0, 10.0]);
        let std = a.std_axis0().unwrap();
        assert_abs_diff_eq!(std.data()[0], (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!(std.data()[1], 0.0);
    }

    #[test]
    fn test_sigmoid_is_stable() {
        let a: Tensor<f64> = Tensor::from_slice(&[0.0, 800.0, -800.0]);
        let s = a.sigmoid();
        assert_abs_diff_eq!(s.data()[0], 0.5, epsilon = 1e-12);
        assert_eq!(s.data()[1], 1.0);
        assert_eq!(s.data()[2], 0.0);
    }

    #[test]
    fn test_seeded_rand_is_reproducible() {
        let a: Tensor<f64> = Tensor::rand_with(vec![16], &mut StdRng::seed_from_u64(42));
        let b: Tensor<f64> = Tensor::rand_with(vec![16], &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(a.data().iter().all(|&v| (0.0..1.0).contains(&v)));
    }
}
