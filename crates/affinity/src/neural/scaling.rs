//! Target scaling, the train/validation split, and one-hot input encoding.

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Affine min-max scaling onto [0, 1]. A constant sample is shifted to 0
/// and scaled by 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Option<Self> {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        Some(Self { min, max })
    }

    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    pub fn inverse(&self, value: f64) -> f64 {
        value * self.range() + self.min
    }
}

/// Shuffle `0..n` with a seeded stream and cut off the validation share
/// (rounded up). The training side always keeps at least one index.
pub fn train_validation_split(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let wanted = (n as f64 * fraction).ceil() as usize;
    let validation_len = wanted.min(n.saturating_sub(1));
    let train = indices.split_off(validation_len);
    (train, indices)
}

/// Stack a user one-hot block over an item one-hot block, one column per
/// (user, item) pair: shape `(num_users + num_items, pairs)`.
pub fn one_hot_pairs(
    users: &[usize],
    items: &[usize],
    num_users: usize,
    num_items: usize,
) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros((num_users + num_items, users.len()));
    for (col, (&user, &item)) in users.iter().zip(items).enumerate() {
        x[[user, col]] = 1.0;
        x[[num_users + item, col]] = 1.0;
    }
    x
}
