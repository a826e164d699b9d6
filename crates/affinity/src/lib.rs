//! Per-category affinity models: interaction encoding, SGD matrix
//! factorization, a hand-rolled feed-forward network, dense prediction,
//! and the merge of the Star/Planet/Moon tables into one user-keyed table.

pub mod codec;
pub mod encoder;
pub mod factorization;
pub mod merge;
pub mod neural;
pub mod pipeline;
pub mod predictor;
pub mod trainer;

pub use codec::IdentityCodec;
pub use encoder::{fallback_users, EncodedCategory, InteractionEncoder, Observation};
pub use factorization::{FactorizationParams, LatentFactors, MatrixFactorizer};
pub use merge::{join, merge_categories, JoinPolicy};
pub use neural::{NeuralModel, NeuralTrainer, NetworkParams};
pub use pipeline::AffinityPipeline;
pub use predictor::DensePredictor;
pub use trainer::{CategoryTrainer, ModelKind};
