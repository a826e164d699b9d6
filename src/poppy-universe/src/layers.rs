//! One run of a signal layer: load interactions, rank or train, and wrap the
//! result in the envelope the backend consumes.

use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use poppy_affinity::{AffinityPipeline, ModelKind};
use poppy_core::config::DataSource;
use poppy_core::{
    AffinityRecord, AppConfig, Category, InteractionRecord, PoppyError, PoppyResult,
    PredictionTable,
};
use poppy_trending::TrendAggregator;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Trend,
    Factorization,
    Neural,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Trend => "trend",
            Layer::Factorization => "factorization",
            Layer::Neural => "neural",
        }
    }

    /// Key of this layer's dataset path under `fallback`.
    fn fallback_key(&self) -> &'static str {
        match self {
            Layer::Trend => "trend_dataset",
            Layer::Factorization => "factorization_dataset",
            Layer::Neural => "neural_dataset",
        }
    }

    fn fallback_dataset<'a>(&self, config: &'a AppConfig) -> &'a str {
        match self {
            Layer::Trend => &config.fallback.trend_dataset,
            Layer::Factorization => &config.fallback.factorization_dataset,
            Layer::Neural => &config.fallback.neural_dataset,
        }
    }
}

/// Where live interactions are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
    Absent,
}

impl InputSource {
    /// `-` means stdin, like an omitted path.
    pub fn from_arg(arg: Option<PathBuf>) -> Self {
        match arg {
            Some(path) if path != Path::new("-") => InputSource::File(path),
            _ => InputSource::Stdin,
        }
    }

    /// Like `from_arg`, but an omitted path means there is no live input.
    pub fn optional(arg: Option<PathBuf>) -> Self {
        match arg {
            None => InputSource::Absent,
            some => Self::from_arg(some),
        }
    }

    pub async fn read(&self) -> anyhow::Result<Option<String>> {
        match self {
            InputSource::Stdin => {
                let mut raw = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut raw)
                    .await
                    .context("failed to read interactions from stdin")?;
                Ok(Some(raw))
            }
            InputSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map(Some)
                .with_context(|| format!("failed to read interactions from {}", path.display())),
            InputSource::Absent => Ok(None),
        }
    }
}

/// Either a bare JSON array or the backend's `{"success": .., "data": [..]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordPayload<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

pub fn parse_records<T: DeserializeOwned>(raw: &str) -> serde_json::Result<Vec<T>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(match serde_json::from_str(raw)? {
        RecordPayload::Bare(records) | RecordPayload::Wrapped { data: records } => records,
    })
}

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: &'static str,
    pub layer: Layer,
    pub data_source: DataSource,
    pub total_rows: usize,
    pub records_processed: usize,
    pub data: Value,
}

impl Envelope {
    fn new<T: Serialize>(
        layer: Layer,
        data_source: DataSource,
        records_processed: usize,
        total_rows: usize,
        data: &T,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            status: "success",
            layer,
            data_source,
            total_rows,
            records_processed,
            data: serde_json::to_value(data)?,
        })
    }
}

/// Live records when the source is live and there are enough of them,
/// otherwise the layer's fallback dataset.
async fn load_records<T: DeserializeOwned>(
    config: &AppConfig,
    layer: Layer,
    live: Option<&str>,
) -> anyhow::Result<(Vec<T>, DataSource)> {
    if config.data_source == DataSource::Live {
        let records: Vec<T> = parse_records(live.unwrap_or_default())
            .with_context(|| format!("failed to parse live {} interactions", layer.name()))?;
        if config.resolve_source(records.len()) == DataSource::Live {
            return Ok((records, DataSource::Live));
        }
    }

    let path = layer.fallback_dataset(config);
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| {
            let key = layer.fallback_key();
            format!(
                "failed to read fallback dataset {} (set fallback.{} or POPPY_UNIVERSE__FALLBACK__{})",
                path,
                key,
                key.to_uppercase()
            )
        })?;
    let records = parse_records(&raw)
        .with_context(|| format!("failed to parse fallback dataset {}", path))?;
    Ok((records, DataSource::Fallback))
}

/// Train the three categories on the blocking pool and merge them.
pub async fn train_categories(
    kind: ModelKind,
    records: Arc<Vec<AffinityRecord>>,
) -> PoppyResult<PredictionTable> {
    let pipeline = AffinityPipeline::new(kind);
    let handles: Vec<_> = Category::ALL
        .iter()
        .map(|&category| {
            let trainer = pipeline.trainer(category);
            let records = Arc::clone(&records);
            (
                category,
                tokio::task::spawn_blocking(move || trainer.train(&records)),
            )
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (category, handle) in handles {
        let result = handle.await.unwrap_or_else(|e| {
            Err(PoppyError::Internal(anyhow!(
                "training task for {} did not complete: {}",
                category,
                e
            )))
        });
        results.push((category, result));
    }
    pipeline.merge(results)
}

pub async fn run_layer(
    config: &AppConfig,
    layer: Layer,
    live: Option<&str>,
    now: NaiveDateTime,
) -> anyhow::Result<Envelope> {
    let envelope = match layer {
        Layer::Trend => {
            let (records, source) = load_records::<InteractionRecord>(config, layer, live).await?;
            let processed = records.len();
            let aggregator = TrendAggregator::new(&config.trending);
            let ranked =
                tokio::task::spawn_blocking(move || aggregator.rank(&records, now)).await?;
            Envelope::new(layer, source, processed, ranked.len(), &ranked)?
        }
        Layer::Factorization | Layer::Neural => {
            let kind = match layer {
                Layer::Neural => ModelKind::Neural,
                _ => ModelKind::Factorization,
            };
            let (records, source) = load_records::<AffinityRecord>(config, layer, live).await?;
            let processed = records.len();
            let table = train_categories(kind, Arc::new(records))
                .await
                .with_context(|| format!("{} layer failed", layer.name()))?;
            Envelope::new(layer, source, processed, table.len(), &table)?
        }
    };

    info!(
        layer = layer.name(),
        data_source = ?envelope.data_source,
        records = envelope.records_processed,
        rows = envelope.total_rows,
        "Layer finished"
    );
    Ok(envelope)
}
