//! POPPY Universe signals: trending ranking and per-category affinity models
//! for the recommendation engine.
//!
//! Each subcommand runs one signal layer and prints a JSON envelope.

mod layers;

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use layers::{InputSource, Layer};
use poppy_core::config::DataSource;
use poppy_core::types::parse_timestamp;
use poppy_core::AppConfig;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "poppy-universe")]
#[command(about = "Trending and affinity signals for the POPPY Universe recommendation engine")]
#[command(version)]
struct Cli {
    /// Interaction source (overrides config)
    #[arg(long, value_enum, global = true, env = "POPPY_UNIVERSE__DATA_SOURCE")]
    data_source: Option<SourceArg>,

    /// Write the result here instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Reference time for the trend window (defaults to now, UTC)
    #[arg(long, global = true, value_parser = parse_as_of)]
    as_of: Option<NaiveDateTime>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank trending objects per object type
    Trend {
        /// Live interactions as JSON (`-` or omitted reads stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Matrix-factorization affinity per category, inner-joined
    Factorization {
        /// Live semantic interactions as JSON (`-` or omitted reads stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Neural affinity per category, outer-joined with zero fill
    Neural {
        /// Live semantic interactions as JSON (`-` or omitted reads stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run every layer concurrently
    All {
        /// Live interactions for the trend layer
        #[arg(long)]
        trend_input: Option<PathBuf>,
        /// Live semantic interactions for both affinity layers
        #[arg(long)]
        affinity_input: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Live,
    Fallback,
}

impl From<SourceArg> for DataSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Live => DataSource::Live,
            SourceArg::Fallback => DataSource::Fallback,
        }
    }
}

fn parse_as_of(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| format!("unrecognised timestamp: {}", raw))
}

/// Live input is only read when the run actually uses live data.
async fn read_live(config: &AppConfig, source: InputSource) -> anyhow::Result<Option<String>> {
    if config.data_source == DataSource::Live {
        source.read().await
    } else {
        Ok(None)
    }
}

async fn write_output(path: Option<PathBuf>, value: &serde_json::Value) -> anyhow::Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    match path {
        Some(path) => tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&bytes).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the result.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "poppy_universe=info,poppy_affinity=info,poppy_trending=info".into()
            }),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(source) = cli.data_source {
        config.data_source = source.into();
    }
    let now = cli.as_of.unwrap_or_else(|| chrono::Utc::now().naive_utc());

    info!(
        data_source = ?config.data_source,
        live_threshold = config.live_threshold,
        as_of = %now,
        "Configuration loaded"
    );

    let output = match cli.command {
        Command::Trend { input } => {
            let live = read_live(&config, InputSource::from_arg(input)).await?;
            let envelope = layers::run_layer(&config, Layer::Trend, live.as_deref(), now).await?;
            serde_json::to_value(envelope)?
        }
        Command::Factorization { input } => {
            let live = read_live(&config, InputSource::from_arg(input)).await?;
            let envelope =
                layers::run_layer(&config, Layer::Factorization, live.as_deref(), now).await?;
            serde_json::to_value(envelope)?
        }
        Command::Neural { input } => {
            let live = read_live(&config, InputSource::from_arg(input)).await?;
            let envelope = layers::run_layer(&config, Layer::Neural, live.as_deref(), now).await?;
            serde_json::to_value(envelope)?
        }
        Command::All {
            trend_input,
            affinity_input,
        } => {
            let trend_source = InputSource::optional(trend_input);
            let affinity_source = InputSource::optional(affinity_input);
            if trend_source == InputSource::Stdin && affinity_source == InputSource::Stdin {
                anyhow::bail!("only one of --trend-input and --affinity-input can read stdin");
            }
            let trend_live = read_live(&config, trend_source).await?;
            let affinity_live = read_live(&config, affinity_source).await?;

            let (trend, factorization, neural) = tokio::try_join!(
                layers::run_layer(&config, Layer::Trend, trend_live.as_deref(), now),
                layers::run_layer(&config, Layer::Factorization, affinity_live.as_deref(), now),
                layers::run_layer(&config, Layer::Neural, affinity_live.as_deref(), now),
            )?;
            serde_json::to_value([trend, factorization, neural])?
        }
    };

    write_output(cli.output, &output).await?;
    info!("POPPY Universe signals run complete");
    Ok(())
}
