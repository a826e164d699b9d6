use crate::error::{PoppyError, PoppyResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Root application configuration. Loaded from an optional
/// `poppy-universe.toml` and environment variables with the prefix
/// `POPPY_UNIVERSE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data_source: DataSource,
    /// Minimum number of live interactions before live data is trusted.
    #[serde(default = "default_live_threshold")]
    pub live_threshold: usize,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub trending: TrendingConfig,
}

/// Where a run reads its interactions from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Records handed over by the caller (the backend's database extract).
    Live,
    /// The simulated dataset configured under `fallback`.
    #[default]
    Fallback,
}

/// Paths of the simulated datasets read in fallback mode, relative to the
/// working directory.
///
/// The datasets are not shipped with the crate. Point each path at a JSON
/// array of backend-shaped records, either in `poppy-universe.toml` under
/// `[fallback]` or with `POPPY_UNIVERSE__FALLBACK__TREND_DATASET`,
/// `POPPY_UNIVERSE__FALLBACK__FACTORIZATION_DATASET` and
/// `POPPY_UNIVERSE__FALLBACK__NEURAL_DATASET`.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_trend_dataset")]
    pub trend_dataset: String,
    #[serde(default = "default_factorization_dataset")]
    pub factorization_dataset: String,
    #[serde(default = "default_neural_dataset")]
    pub neural_dataset: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendingConfig {
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_live_threshold() -> usize {
    300
}
fn default_trend_dataset() -> String {
    "Input_Data/Simulated_User_Interactions.json".to_string()
}
fn default_factorization_dataset() -> String {
    "Input_Data/MF_Semantic_Type_Interactions.json".to_string()
}
fn default_neural_dataset() -> String {
    "Input_Data/NN_Semantic_Interactions.json".to_string()
}
fn default_window_days() -> i64 {
    14
}
fn default_top_n() -> usize {
    100
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            trend_dataset: default_trend_dataset(),
            factorization_dataset: default_factorization_dataset(),
            neural_dataset: default_neural_dataset(),
        }
    }
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            top_n: default_top_n(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::default(),
            live_threshold: default_live_threshold(),
            fallback: FallbackConfig::default(),
            trending: TrendingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> PoppyResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("poppy-universe").required(false))
            .add_source(
                config::Environment::with_prefix("POPPY_UNIVERSE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| PoppyError::Config(e.to_string()))
    }

    /// Decide the effective source for a run that received `record_count`
    /// live records. Too little live data drops back to the fallback dataset.
    pub fn resolve_source(&self, record_count: usize) -> DataSource {
        match self.data_source {
            DataSource::Live if record_count < self.live_threshold => {
                warn!(
                    records = record_count,
                    threshold = self.live_threshold,
                    "Not enough live interactions, using fallback dataset"
                );
                DataSource::Fallback
            }
            source => source,
        }
    }
}
