//! Time-decayed popularity ranking of catalog objects.

pub mod aggregator;
pub mod scoring;

pub use aggregator::{TrendAggregator, TrendFeature};
pub use scoring::{decay_weights, trending_score};
