use crate::dataset::Dataset;
use exobengal_core::{Tensor, TensorResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Iterates a dataset in mini-batches, optionally in a seeded shuffled order.
pub struct DataLoader<'a, D: Dataset> {
    dataset: &'a D,
    batch_size: usize,
    indices: Vec<usize>,
    current: usize,
}

impl<'a, D: Dataset> DataLoader<'a, D> {
    /// `shuffle_seed = None` keeps dataset order.
    pub fn new(dataset: &'a D, batch_size: usize, shuffle_seed: Option<u64>) -> Self {
        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        if let Some(seed) = shuffle_seed {
            indices.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        DataLoader {
            dataset,
            batch_size: batch_size.max(1),
            indices,
            current: 0,
        }
    }
}

impl<'a, D: Dataset> Iterator for DataLoader<'a, D> {
    type Item = TensorResult<(Tensor<f64>, Tensor<f64>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.indices.len() {
            return None;
        }
        let end = (self.current + self.batch_size).min(self.indices.len());
        let batch = self.dataset.batch(&self.indices[self.current..end]);
        self.current = end;
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TensorDataset;

    fn toy() -> TensorDataset {
        let x = Tensor::new((0..10).map(|v| v as f64).collect(), vec![5, 2]).unwrap();
        let y = Tensor::from_slice(&[0.0, 1.0, 0.0, 1.0, 1.0]);
        TensorDataset::new(x, y).unwrap()
    }

    #[test]
    fn test_batches_cover_dataset_once() {
        let ds = toy();
        let loader = DataLoader::new(&ds, 2, Some(7));

        let mut seen = Vec::new();
        let mut batches = 0;
        for batch in loader {
            batches += 1;
            let (x, y) = batch.unwrap();
            assert_eq!(x.nrows().unwrap(), y.numel());
            for r in 0..x.nrows().unwrap() {
                seen.push(x.row_slice(r).unwrap()[0] as usize / 2);
            }
        }
        seen.sort_unstable();
        assert_eq!(batches, 3);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_unshuffled_keeps_order() {
        let ds = toy();
        let (x, y) = DataLoader::new(&ds, 5, None).next().unwrap().unwrap();
        assert_eq!(x, ds.features);
        assert_eq!(y, ds.labels);
    }

    #[test]
    fn test_rejects_misaligned_labels() {
        let x = Tensor::<f64>::zeros(vec![3, 2]);
        assert!(TensorDataset::new(x, Tensor::from_slice(&[1.0])).is_err());
    }
}
