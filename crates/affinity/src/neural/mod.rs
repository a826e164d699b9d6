//! Feed-forward affinity regressor over one-hot (user, item) inputs.

pub mod activation;
pub mod network;
pub mod scaling;
pub mod trainer;

pub use activation::Activation;
pub use network::FeedForwardNetwork;
pub use trainer::{NetworkParams, NeuralModel, NeuralTrainer};
