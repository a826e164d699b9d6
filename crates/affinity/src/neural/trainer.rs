use super::activation::Activation;
use super::network::{mean_squared_error, FeedForwardNetwork};
use super::scaling::{one_hot_pairs, train_validation_split, MinMaxScaler};
use crate::encoder::EncodedCategory;
use ndarray::Array2;
use poppy_core::{PoppyError, PoppyResult};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Fixed architecture and schedule of the neural path.
#[derive(Debug, Clone)]
pub struct NetworkParams {
    pub hidden_layers: Vec<usize>,
    pub hidden_activation: Activation,
    pub learning_rate: f64,
    pub epochs: usize,
    pub validation_fraction: f64,
    pub seed: u64,
    /// Valid rating range predictions are clipped to.
    pub rating_range: (f64, f64),
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 32, 16],
            hidden_activation: Activation::Relu,
            learning_rate: 0.01,
            epochs: 500,
            validation_fraction: 0.2,
            seed: 42,
            rating_range: (1.0, 5.0),
        }
    }
}

impl NetworkParams {
    /// `[users + items, hidden.., 1]`
    pub fn layer_dims(&self, num_users: usize, num_items: usize) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.hidden_layers.len() + 2);
        dims.push(num_users + num_items);
        dims.extend_from_slice(&self.hidden_layers);
        dims.push(1);
        dims
    }
}

/// A trained network plus what is needed to map its output back to ratings.
#[derive(Debug, Clone)]
pub struct NeuralModel {
    pub network: FeedForwardNetwork,
    pub scaler: MinMaxScaler,
    pub num_users: usize,
    pub num_items: usize,
    pub rating_range: (f64, f64),
}

impl NeuralModel {
    /// Predict every (user, item) pair, user-major. Output is on the
    /// strength scale, clipped to the rating range.
    pub fn predict_dense(&self) -> Array2<f64> {
        let (users, items): (Vec<usize>, Vec<usize>) = (0..self.num_users)
            .flat_map(|u| (0..self.num_items).map(move |i| (u, i)))
            .unzip();
        let x = one_hot_pairs(&users, &items, self.num_users, self.num_items);
        let normalized = self.network.infer(&x);

        let (low, high) = self.rating_range;
        let mut dense = Array2::<f64>::zeros((self.num_users, self.num_items));
        for ((&u, &i), &p) in users.iter().zip(&items).zip(normalized.iter()) {
            dense[[u, i]] = self.scaler.inverse(p).clamp(low, high);
        }
        dense
    }
}

#[derive(Debug, Clone, Default)]
pub struct NeuralTrainer {
    params: NetworkParams,
}

impl NeuralTrainer {
    pub fn new(params: NetworkParams) -> Self {
        Self { params }
    }

    /// Full-batch gradient descent on the category's individual interactions.
    pub fn fit(&self, encoded: &EncodedCategory) -> PoppyResult<NeuralModel> {
        let observations = &encoded.observations;
        let strengths: Vec<f64> = observations.iter().map(|o| o.strength).collect();
        let scaler = MinMaxScaler::fit(&strengths).ok_or(PoppyError::EmptyCategory(encoded.category))?;

        let (train, validation) = train_validation_split(
            observations.len(),
            self.params.validation_fraction,
            self.params.seed,
        );

        let batch = |indices: &[usize]| -> (Array2<f64>, Array2<f64>) {
            let users: Vec<usize> = indices.iter().map(|&k| observations[k].user).collect();
            let items: Vec<usize> = indices.iter().map(|&k| observations[k].item).collect();
            let targets = indices
                .iter()
                .map(|&k| scaler.transform(observations[k].strength))
                .collect::<Vec<_>>();
            let x = one_hot_pairs(&users, &items, encoded.num_users(), encoded.num_items());
            let y = Array2::from_shape_vec((1, indices.len()), targets)
                .unwrap_or_else(|_| Array2::zeros((1, 0)));
            (x, y)
        };
        let (x_train, y_train) = batch(&train);
        let (x_val, y_val) = batch(&validation);

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let dims = self
            .params
            .layer_dims(encoded.num_users(), encoded.num_items());
        let mut network =
            FeedForwardNetwork::he_initialized(&dims, self.params.hidden_activation, &mut rng)?;

        for _ in 0..self.params.epochs {
            let (output, caches) = network.forward(&x_train);
            let gradients = network.backward(&output, &y_train, &caches);
            network.apply_gradients(&gradients, self.params.learning_rate);
        }

        let train_loss = mean_squared_error(&y_train, &network.infer(&x_train));
        let validation_loss =
            (!validation.is_empty()).then(|| mean_squared_error(&y_val, &network.infer(&x_val)));
        debug!(
            category = %encoded.category,
            layers = ?dims,
            train_examples = train.len(),
            validation_examples = validation.len(),
            train_loss = train_loss,
            validation_loss = ?validation_loss,
            "Neural affinity training finished"
        );

        Ok(NeuralModel {
            network,
            scaler,
            num_users: encoded.num_users(),
            num_items: encoded.num_items(),
            rating_range: self.params.rating_range,
        })
    }
}
