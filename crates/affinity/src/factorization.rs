//! Low-rank matrix factorization trained by per-cell SGD with L2
//! regularization. Only observed cells (strength > 0) drive the updates;
//! the reconstruction U·Vᵗ then fills in every unobserved cell.

use ndarray::Array2;
use poppy_core::{PoppyError, PoppyResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Fixed hyperparameters of the factorization path.
#[derive(Debug, Clone)]
pub struct FactorizationParams {
    /// Latent dimension K.
    pub rank: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    /// Full passes over the observed cells. No early stopping.
    pub iterations: usize,
    pub seed: u64,
}

impl Default for FactorizationParams {
    fn default() -> Self {
        Self {
            rank: 3,
            learning_rate: 0.01,
            regularization: 0.02,
            iterations: 500,
            seed: 42,
        }
    }
}

/// User factors U (users × K) and item factors V (items × K) of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentFactors {
    pub users: Array2<f64>,
    pub items: Array2<f64>,
}

impl LatentFactors {
    /// Uniform [0, 1) draws from a seeded ChaCha8 stream, U filled row-major
    /// first, then V.
    pub fn initialize(num_users: usize, num_items: usize, rank: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let users = Array2::from_shape_fn((num_users, rank), |_| rng.gen::<f64>());
        let items = Array2::from_shape_fn((num_items, rank), |_| rng.gen::<f64>());
        Self { users, items }
    }

    pub fn rank(&self) -> usize {
        self.users.ncols()
    }

    /// One pass over the observed cells in row-major order. Each update is
    /// applied immediately, and the item update sees the freshly updated
    /// user row.
    pub fn sgd_pass(&mut self, ratings: &Array2<f64>, learning_rate: f64, regularization: f64) {
        let rank = self.rank();
        for ((i, j), &rating) in ratings.indexed_iter() {
            if rating <= 0.0 {
                continue;
            }
            let prediction = self.users.row(i).dot(&self.items.row(j));
            let error = rating - prediction;

            for k in 0..rank {
                let u = self.users[[i, k]];
                let v = self.items[[j, k]];
                self.users[[i, k]] = u + learning_rate * (2.0 * error * v - regularization * u);
            }
            for k in 0..rank {
                let u = self.users[[i, k]];
                let v = self.items[[j, k]];
                self.items[[j, k]] = v + learning_rate * (2.0 * error * u - regularization * v);
            }
        }
    }

    /// Dense U·Vᵗ over every (user, item) pair.
    pub fn reconstruct(&self) -> Array2<f64> {
        self.users.dot(&self.items.t())
    }

    /// Sum of squared errors over the observed cells only.
    pub fn observed_error(&self, ratings: &Array2<f64>) -> f64 {
        ratings
            .indexed_iter()
            .filter(|(_, &r)| r > 0.0)
            .map(|((i, j), &r)| {
                let e = r - self.users.row(i).dot(&self.items.row(j));
                e * e
            })
            .sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatrixFactorizer {
    params: FactorizationParams,
}

impl MatrixFactorizer {
    pub fn new(params: FactorizationParams) -> Self {
        Self { params }
    }

    pub fn fit(&self, ratings: &Array2<f64>) -> PoppyResult<LatentFactors> {
        let (num_users, num_items) = ratings.dim();
        if num_users == 0 || num_items == 0 {
            return Err(PoppyError::Shape(format!(
                "cannot factorize a {}x{} matrix",
                num_users, num_items
            )));
        }
        if !ratings.iter().any(|&r| r > 0.0) {
            return Err(PoppyError::NoObservedCells);
        }

        let mut factors =
            LatentFactors::initialize(num_users, num_items, self.params.rank, self.params.seed);
        let initial_error = factors.observed_error(ratings);

        for _ in 0..self.params.iterations {
            factors.sgd_pass(
                ratings,
                self.params.learning_rate,
                self.params.regularization,
            );
        }

        debug!(
            users = num_users,
            items = num_items,
            iterations = self.params.iterations,
            initial_error = initial_error,
            final_error = factors.observed_error(ratings),
            "Matrix factorization finished"
        );

        Ok(factors)
    }
}
