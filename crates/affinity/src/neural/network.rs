//! Fully connected feed-forward network with hand-written forward and
//! backward passes. Examples are stored as columns: an input batch has shape
//! `(features, examples)` and layer `l` maps `(in, m)` to `(out, m)`.

use super::activation::{sigmoid, Activation};
use ndarray::{Array1, Array2, Axis};
use poppy_core::{PoppyError, PoppyResult};
use rand::Rng;
use rand_distr::StandardNormal;

#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// `(out, in)`
    pub weights: Array2<f64>,
    /// `(out,)`
    pub bias: Array1<f64>,
}

/// Gradient of one layer, same shapes as the `DenseLayer` it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradient {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Values saved by the forward pass for backpropagation.
#[derive(Debug, Clone)]
pub struct LayerCache {
    pub pre_activation: Array2<f64>,
    pub input: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedForwardNetwork {
    layers: Vec<DenseLayer>,
    hidden_activation: Activation,
}

impl FeedForwardNetwork {
    /// He initialization: weights ~ N(0, 1) · sqrt(2 / fan_in), zero bias.
    /// Layers are drawn in order, each weight matrix row-major.
    pub fn he_initialized<R: Rng>(
        dims: &[usize],
        hidden_activation: Activation,
        rng: &mut R,
    ) -> PoppyResult<Self> {
        if dims.len() < 2 || dims.iter().any(|&d| d == 0) {
            return Err(PoppyError::Shape(format!(
                "invalid layer dimensions {:?}",
                dims
            )));
        }

        let layers = dims
            .windows(2)
            .map(|pair| {
                let (fan_in, fan_out) = (pair[0], pair[1]);
                let scale = (2.0 / fan_in as f64).sqrt();
                let weights = Array2::from_shape_fn((fan_out, fan_in), |_| {
                    rng.sample::<f64, _>(StandardNormal) * scale
                });
                DenseLayer {
                    weights,
                    bias: Array1::zeros(fan_out),
                }
            })
            .collect();

        Ok(Self {
            layers,
            hidden_activation,
        })
    }

    pub fn from_layers(layers: Vec<DenseLayer>, hidden_activation: Activation) -> Self {
        Self {
            layers,
            hidden_activation,
        }
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weights.ncols())
    }

    fn affine(layer: &DenseLayer, input: &Array2<f64>) -> Array2<f64> {
        let mut z = layer.weights.dot(input);
        z += &layer.bias.view().insert_axis(Axis(1));
        z
    }

    fn activate(&self, index: usize, z: &Array2<f64>) -> Array2<f64> {
        if index + 1 == self.layers.len() {
            z.mapv(sigmoid)
        } else {
            let activation = self.hidden_activation;
            z.mapv(|v| activation.apply(v))
        }
    }

    /// Forward pass keeping a cache per layer. Returns the sigmoid output of
    /// shape `(1, m)` for a single-output network.
    pub fn forward(&self, input: &Array2<f64>) -> (Array2<f64>, Vec<LayerCache>) {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut activations = input.clone();
        for (index, layer) in self.layers.iter().enumerate() {
            let z = Self::affine(layer, &activations);
            let next = self.activate(index, &z);
            caches.push(LayerCache {
                pre_activation: z,
                input: std::mem::replace(&mut activations, next),
            });
        }
        (activations, caches)
    }

    /// Forward pass without caches.
    pub fn infer(&self, input: &Array2<f64>) -> Array2<f64> {
        self.layers
            .iter()
            .enumerate()
            .fold(input.clone(), |activations, (index, layer)| {
                let z = Self::affine(layer, &activations);
                self.activate(index, &z)
            })
    }

    /// Backpropagation averaged over the full batch. The output error is
    /// `prediction - target`, the gradient of a sigmoid output under the
    /// cross-entropy objective.
    pub fn backward(
        &self,
        output: &Array2<f64>,
        targets: &Array2<f64>,
        caches: &[LayerCache],
    ) -> Vec<LayerGradient> {
        let m = output.ncols().max(1) as f64;
        let mut delta = output - targets;
        let mut gradients = Vec::with_capacity(self.layers.len());

        for index in (0..self.layers.len()).rev() {
            let cache = &caches[index];
            gradients.push(LayerGradient {
                weights: delta.dot(&cache.input.t()) / m,
                bias: delta.sum_axis(Axis(1)) / m,
            });

            if index > 0 {
                let upstream = self.layers[index].weights.t().dot(&delta);
                let activation = self.hidden_activation;
                let local = caches[index - 1]
                    .pre_activation
                    .mapv(|z| activation.derivative(z));
                delta = upstream * &local;
            }
        }

        gradients.reverse();
        gradients
    }

    /// Plain gradient descent on every weight and bias.
    pub fn apply_gradients(&mut self, gradients: &[LayerGradient], learning_rate: f64) {
        for (layer, gradient) in self.layers.iter_mut().zip(gradients) {
            layer.weights.scaled_add(-learning_rate, &gradient.weights);
            layer.bias.scaled_add(-learning_rate, &gradient.bias);
        }
    }
}

pub fn mean_squared_error(targets: &Array2<f64>, predictions: &Array2<f64>) -> f64 {
    (targets - predictions).mapv(|d| d * d).mean().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn tiny_network() -> FeedForwardNetwork {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        FeedForwardNetwork::he_initialized(&[3, 4, 2, 1], Activation::Relu, &mut rng).unwrap()
    }

    fn cross_entropy(network: &FeedForwardNetwork, x: &Array2<f64>, y: &Array2<f64>) -> f64 {
        let a = network.infer(x);
        let m = a.ncols() as f64;
        a.iter()
            .zip(y.iter())
            .map(|(&p, &t)| -(t * p.ln() + (1.0 - t) * (1.0 - p).ln()))
            .sum::<f64>()
            / m
    }

    #[test]
    fn test_shapes() {
        let network = tiny_network();
        assert_eq!(network.layers().len(), 3);
        assert_eq!(network.input_dim(), 3);
        assert_eq!(network.layers()[0].weights.dim(), (4, 3));
        assert_eq!(network.layers()[2].bias.len(), 1);
        assert!(network.layers().iter().all(|l| l.bias.iter().all(|&b| b == 0.0)));

        let x = Array2::<f64>::ones((3, 5));
        let (out, caches) = network.forward(&x);
        assert_eq!(out.dim(), (1, 5));
        assert_eq!(caches.len(), 3);
        assert_eq!(caches[1].input.dim(), (4, 5));
        assert_eq!(out, network.infer(&x));
    }

    #[test]
    fn test_he_initialization_is_seeded() {
        assert_eq!(tiny_network(), tiny_network());
    }

    #[test]
    fn test_rejects_bad_dims() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(FeedForwardNetwork::he_initialized(&[4], Activation::Relu, &mut rng).is_err());
        assert!(FeedForwardNetwork::he_initialized(&[4, 0, 1], Activation::Relu, &mut rng).is_err());
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let network = tiny_network();
        let x = array![[1.0, 0.2, 0.7], [0.5, 1.0, 0.1], [0.3, 0.8, 1.0]];
        let y = array![[0.9, 0.1, 0.4]];

        let (out, caches) = network.forward(&x);
        let gradients = network.backward(&out, &y, &caches);

        let eps = 1e-6;
        for layer_index in 0..network.layers().len() {
            let (rows, cols) = network.layers()[layer_index].weights.dim();
            for r in 0..rows {
                for c in 0..cols {
                    let mut plus = network.clone();
                    plus.layers[layer_index].weights[[r, c]] += eps;
                    let mut minus = network.clone();
                    minus.layers[layer_index].weights[[r, c]] -= eps;
                    let numeric =
                        (cross_entropy(&plus, &x, &y) - cross_entropy(&minus, &x, &y)) / (2.0 * eps);
                    let analytic = gradients[layer_index].weights[[r, c]];
                    assert!(
                        (numeric - analytic).abs() < 1e-5,
                        "layer {} weight ({}, {}): numeric {} analytic {}",
                        layer_index,
                        r,
                        c,
                        numeric,
                        analytic
                    );
                }
            }
            for r in 0..rows {
                let mut plus = network.clone();
                plus.layers[layer_index].bias[r] += eps;
                let mut minus = network.clone();
                minus.layers[layer_index].bias[r] -= eps;
                let numeric =
                    (cross_entropy(&plus, &x, &y) - cross_entropy(&minus, &x, &y)) / (2.0 * eps);
                assert!((numeric - gradients[layer_index].bias[r]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_gradient_step_reduces_loss() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut network =
            FeedForwardNetwork::he_initialized(&[3, 8, 8, 1], Activation::Relu, &mut rng).unwrap();
        let x = array![[1.0, 0.0, 1.0, 0.0], [0.0, 1.0, 0.0, 1.0], [1.0, 1.0, 0.0, 0.0]];
        let y = array![[1.0, 0.1, 0.9, 0.8]];

        let before = cross_entropy(&network, &x, &y);
        for _ in 0..200 {
            let (out, caches) = network.forward(&x);
            let gradients = network.backward(&out, &y, &caches);
            network.apply_gradients(&gradients, 0.1);
        }
        let after = cross_entropy(&network, &x, &y);
        assert!(after < before, "{} !< {}", after, before);
        assert!(mean_squared_error(&y, &network.infer(&x)).is_finite());
    }

    #[test]
    fn test_apply_gradients_moves_bias() {
        let mut network = FeedForwardNetwork::from_layers(
            vec![DenseLayer {
                weights: array![[0.0]],
                bias: array![0.0],
            }],
            Activation::Relu,
        );
        let gradients = vec![LayerGradient {
            weights: array![[1.0]],
            bias: array![2.0],
        }];
        network.apply_gradients(&gradients, 0.5);
        assert_eq!(network.layers()[0].weights[[0, 0]], -0.5);
        assert_eq!(network.layers()[0].bias[0], -1.0);
    }
}
