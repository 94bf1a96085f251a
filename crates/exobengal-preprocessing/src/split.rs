use std::collections::BTreeMap;

use exobengal_core::{TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffled split holding out `round(n * test_ratio)` rows.
pub fn split_indices(n: usize, test_ratio: f64, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_size = ((n as f64 * test_ratio).round() as usize).min(n);
    let test = indices.split_off(n - test_size);
    SplitIndices {
        train: indices,
        test,
    }
}

/// Split that holds out `round(n_c * test_ratio)` rows of every class `c`,
/// keeping class proportions close to the full set.
pub fn stratified_split_indices(labels: &[f64], test_ratio: f64, seed: u64) -> SplitIndices {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for mut members in group_by_class(labels).into_values() {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_ratio).round() as usize).min(members.len());
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    SplitIndices { train, test }
}

/// Stratified k-fold partition: every row lands in exactly one validation fold.
///
/// Fails when some class has fewer than `k` members.
pub fn stratified_k_fold(labels: &[f64], k: usize, seed: u64) -> TensorResult<Vec<SplitIndices>> {
    if k < 2 {
        return Err(TensorError::InvalidOperation(format!(
            "k-fold needs at least 2 folds, got {k}"
        )));
    }

    let classes = group_by_class(labels);
    if let Some(smallest) = classes.values().map(Vec::len).min() {
        if smallest < k {
            return Err(TensorError::InvalidOperation(format!(
                "smallest class has {smallest} rows, fewer than {k} folds"
            )));
        }
    } else {
        return Err(TensorError::EmptyTensor);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0usize; labels.len()];
    let mut next_fold = 0usize;
    for mut members in classes.into_values() {
        members.shuffle(&mut rng);
        for idx in members {
            fold_of[idx] = next_fold;
            next_fold = (next_fold + 1) % k;
        }
    }

    Ok((0..k)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&i| fold_of[i] == fold);
            SplitIndices { train, test }
        })
        .collect())
}

fn group_by_class(labels: &[f64]) -> BTreeMap<i64, Vec<usize>> {
    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        classes.entry(label.round() as i64).or_default().push(i);
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(split_indices(50, 0.2, 42), split_indices(50, 0.2, 42));
        assert_eq!(split_indices(50, 0.2, 42).test.len(), 10);
    }

    #[test]
    fn test_two_rows_leave_empty_test_set() {
        let split = split_indices(2, 0.2, 42);
        assert_eq!(split.train.len(), 2);
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_stratified_split_keeps_proportions() {
        let labels: Vec<f64> = (0..100).map(|i| if i < 30 { 1.0 } else { 0.0 }).collect();
        let split = stratified_split_indices(&labels, 0.2, 42);
        assert_eq!(split.test.len(), 20);
        let positives = split.test.iter().filter(|&&i| labels[i] == 1.0).count();
        assert_eq!(positives, 6);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_k_fold_partitions_rows() {
        let labels: Vec<f64> = (0..30).map(|i| (i % 3 == 0) as u8 as f64).collect();
        let folds = stratified_k_fold(&labels, 3, 7).unwrap();
        assert_eq!(folds.len(), 3);

        let mut seen = vec![0usize; 30];
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 30);
            let positives = fold.test.iter().filter(|&&i| labels[i] == 1.0).count();
            assert!(positives >= 3);
            for &i in &fold.test {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_k_fold_rejects_tiny_class() {
        assert!(stratified_k_fold(&[0.0, 0.0, 0.0, 1.0], 3, 0).is_err());
        assert!(stratified_k_fold(&[], 3, 0).is_err());
    }
}
