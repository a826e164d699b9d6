//! Trailing-window aggregation of interactions into per-object trend
//! features, and the top-N ranking per object type.

use crate::scoring::{decay_weights, trending_score};
use chrono::{Duration, NaiveDateTime};
use poppy_core::config::TrendingConfig;
use poppy_core::{IdentifierKey, InteractionRecord, InteractionType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendFeature {
    #[serde(rename = "Object_Type")]
    pub object_type: String,
    #[serde(rename = "Object_ID")]
    pub object_id: String,
    pub total_interactions: usize,
    pub num_views: f64,
    pub num_likes: f64,
    pub num_rates: f64,
    pub trending_score: f64,
}

#[derive(Default)]
struct Accumulator {
    total: usize,
    views: f64,
    likes: f64,
    rates: f64,
}

pub struct TrendAggregator {
    window: Duration,
    top_n: usize,
}

impl TrendAggregator {
    pub fn new(config: &TrendingConfig) -> Self {
        Self {
            window: Duration::days(config.window_days),
            top_n: config.top_n,
        }
    }

    /// Trend features per (object type, object id), in sorted key order.
    ///
    /// Rows without a parsable timestamp are dropped. Only rows at or after
    /// `now - window` are used, unless that leaves nothing, in which case
    /// every parsed row is used. Rows without an object type or id still
    /// shape the decay range but belong to no group.
    pub fn aggregate(&self, records: &[InteractionRecord], now: NaiveDateTime) -> Vec<TrendFeature> {
        let parsed: Vec<(&InteractionRecord, NaiveDateTime)> = records
            .iter()
            .filter_map(|r| r.parsed_timestamp().map(|t| (r, t)))
            .collect();
        if parsed.len() < records.len() {
            debug!(
                dropped = records.len() - parsed.len(),
                "Dropped interactions with malformed timestamps"
            );
        }

        let cutoff = now - self.window;
        let recent: Vec<(&InteractionRecord, NaiveDateTime)> =
            parsed.iter().copied().filter(|(_, t)| *t >= cutoff).collect();
        let rows = if recent.is_empty() {
            info!(
                window_days = self.window.num_days(),
                rows = parsed.len(),
                "No interactions inside the trend window, using the full history"
            );
            parsed
        } else {
            recent
        };

        let timestamps: Vec<NaiveDateTime> = rows.iter().map(|(_, t)| *t).collect();
        let weights = decay_weights(&timestamps);

        let mut groups: BTreeMap<(&str, IdentifierKey), Accumulator> = BTreeMap::new();
        for ((record, _), weight) in rows.iter().zip(weights) {
            if record.object_type.is_empty() || record.object_id.is_empty() {
                continue;
            }
            let acc = groups
                .entry((
                    record.object_type.as_str(),
                    IdentifierKey::new(&record.object_id),
                ))
                .or_default();
            acc.total += 1;
            match record.kind() {
                Some(InteractionType::View) => acc.views += weight,
                Some(InteractionType::Like) => acc.likes += weight,
                Some(InteractionType::Rate) => acc.rates += weight,
                None => {}
            }
        }

        let features: Vec<TrendFeature> = groups
            .into_iter()
            .map(|((object_type, object_id), acc)| TrendFeature {
                object_type: object_type.to_string(),
                object_id: object_id.as_str().to_string(),
                total_interactions: acc.total,
                num_views: acc.views,
                num_likes: acc.likes,
                num_rates: acc.rates,
                trending_score: trending_score(acc.views, acc.likes, acc.rates),
            })
            .collect();

        debug!(
            rows = rows.len(),
            objects = features.len(),
            "Aggregated trend features"
        );
        features
    }

    /// Features ordered by descending score, keeping the first `top_n` of
    /// each object type. Equal scores keep their aggregation order.
    pub fn rank(&self, records: &[InteractionRecord], now: NaiveDateTime) -> Vec<TrendFeature> {
        let mut features = self.aggregate(records, now);
        features.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score));

        let mut kept_per_type: HashMap<String, usize> = HashMap::new();
        features.retain(|f| {
            let kept = kept_per_type.entry(f.object_type.clone()).or_insert(0);
            *kept += 1;
            *kept <= self.top_n
        });

        info!(
            objects = features.len(),
            object_types = kept_per_type.len(),
            "Trend ranking complete"
        );
        features
    }
}
