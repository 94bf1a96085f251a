use exobengal_core::{Tensor, TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Arena node. Children are indices into the owning tree's node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class frequencies of the training rows that reached this leaf.
    Leaf { proba: Vec<f64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features drawn per split; `None` considers all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// CART classifier with Gini impurity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub params: TreeParams,
    pub n_classes: usize,
    n_features: usize,
    nodes: Vec<Node>,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeClassifier {
            params,
            n_classes: 0,
            n_features: 0,
            nodes: Vec::new(),
        }
    }

    /// Fit on every row of `x`. `y` holds class indices `0, 1, ...`.
    pub fn fit(&mut self, x: &Tensor<f64>, y: &[f64], seed: u64) -> TensorResult<()> {
        let labels = class_labels(y)?;
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let rows: Vec<usize> = (0..labels.len()).collect();
        self.fit_rows(x, &labels, n_classes, rows, &mut StdRng::seed_from_u64(seed))
    }

    /// Fit on the given rows of `x`; repeats are allowed (bootstrap samples).
    pub(crate) fn fit_rows<R: Rng>(
        &mut self,
        x: &Tensor<f64>,
        labels: &[usize],
        n_classes: usize,
        rows: Vec<usize>,
        rng: &mut R,
    ) -> TensorResult<()> {
        let n = x.nrows()?;
        if n != labels.len() {
            return Err(TensorError::DimensionMismatch(format!(
                "{} rows but {} labels",
                n,
                labels.len()
            )));
        }
        if rows.is_empty() {
            return Err(TensorError::EmptyTensor);
        }

        self.n_features = x.ncols()?;
        self.n_classes = n_classes;
        self.nodes.clear();
        let data = Rows {
            values: x.data(),
            width: self.n_features,
        };
        self.grow(&data, labels, rows, 0, rng);
        Ok(())
    }

    fn grow<R: Rng>(
        &mut self,
        data: &Rows<'_>,
        labels: &[usize],
        rows: Vec<usize>,
        depth: usize,
        rng: &mut R,
    ) -> usize {
        let counts = class_counts(labels, &rows, self.n_classes);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_left = self.params.max_depth.map_or(true, |d| depth < d);
        let splittable = rows.len() >= self.params.min_samples_split.max(2);

        if !pure && depth_left && splittable {
            if let Some(best) = self.best_split(data, labels, &rows, &counts, rng) {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .into_iter()
                    .partition(|&i| data.get(i, best.feature) <= best.threshold);

                let id = self.nodes.len();
                self.nodes.push(Node::Leaf { proba: Vec::new() });
                let left = self.grow(data, labels, left_rows, depth + 1, rng);
                let right = self.grow(data, labels, right_rows, depth + 1, rng);
                self.nodes[id] = Node::Split {
                    feature: best.feature,
                    threshold: best.threshold,
                    left,
                    right,
                };
                return id;
            }
        }

        let total = rows.len() as f64;
        self.nodes.push(Node::Leaf {
            proba: counts.iter().map(|&c| c as f64 / total).collect(),
        });
        self.nodes.len() - 1
    }

    /// Lowest weighted child Gini over `max_features` randomly ordered
    /// features. Constant features do not count towards that budget. Each
    /// feature is sorted once and swept with running class counts.
    fn best_split<R: Rng>(
        &self,
        data: &Rows<'_>,
        labels: &[usize],
        rows: &[usize],
        counts: &[usize],
        rng: &mut R,
    ) -> Option<Candidate> {
        let p = self.n_features;
        if p == 0 {
            return None;
        }
        let m = self.params.max_features.unwrap_or(p).clamp(1, p);
        let n = rows.len();

        let mut best: Option<Candidate> = None;
        let mut order = rows.to_vec();
        let mut left = vec![0usize; self.n_classes];

        let mut features: Vec<usize> = (0..p).collect();
        features.shuffle(rng);
        let mut visited = 0;

        for feature in features {
            if visited == m {
                break;
            }
            order.sort_by(|&a, &b| data.get(a, feature).total_cmp(&data.get(b, feature)));
            if data.get(order[0], feature) >= data.get(order[n - 1], feature) {
                continue;
            }
            visited += 1;
            left.iter_mut().for_each(|c| *c = 0);

            for k in 0..n - 1 {
                left[labels[order[k]]] += 1;
                let lo = data.get(order[k], feature);
                let hi = data.get(order[k + 1], feature);
                if lo >= hi {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                let gini_left = gini(left.iter().copied(), n_left);
                let gini_right = gini(counts.iter().zip(&left).map(|(&c, &l)| c - l), n_right);
                let impurity = (n_left as f64 * gini_left + n_right as f64 * gini_right) / n as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }

    /// Leaf class distribution for one observation.
    pub fn predict_proba_row(&self, row: &[f64]) -> TensorResult<&[f64]> {
        if self.nodes.is_empty() {
            return Err(TensorError::NotFitted("DecisionTreeClassifier"));
        }
        if row.len() != self.n_features {
            return Err(TensorError::DimensionMismatch(format!(
                "tree expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }

        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { proba } => return Ok(proba),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Row-major view used during growth.
struct Rows<'a> {
    values: &'a [f64],
    width: usize,
}

impl Rows<'_> {
    #[inline]
    fn get(&self, row: usize, feature: usize) -> f64 {
        self.values[row * self.width + feature]
    }
}

fn gini(counts: impl Iterator<Item = usize>, total: usize) -> f64 {
    let total = total as f64;
    1.0 - counts.map(|c| (c as f64 / total).powi(2)).sum::<f64>()
}

fn class_counts(labels: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in rows {
        counts[labels[i]] += 1;
    }
    counts
}

/// Validate float labels as non-negative class indices.
pub(crate) fn class_labels(y: &[f64]) -> TensorResult<Vec<usize>> {
    y.iter()
        .map(|&v| {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(TensorError::InvalidOperation(format!(
                    "class labels must be non-negative integers, got {v}"
                )))
            }
        })
        .collect()
}
