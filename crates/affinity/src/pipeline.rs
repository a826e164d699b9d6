use crate::merge::{merge_categories, JoinPolicy};
use crate::trainer::{CategoryTrainer, ModelKind};
use poppy_core::{AffinityRecord, Category, PoppyResult, PredictionTable};
use std::collections::BTreeMap;
use tracing::{error, info};

/// Trains Star, Planet and Moon with one model family and merges the
/// results into a single user-keyed table.
#[derive(Debug, Clone)]
pub struct AffinityPipeline {
    kind: ModelKind,
}

impl AffinityPipeline {
    pub fn new(kind: ModelKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn policy(&self) -> JoinPolicy {
        JoinPolicy::for_model(self.kind)
    }

    pub fn trainer(&self, category: Category) -> CategoryTrainer {
        CategoryTrainer::new(category, self.kind)
    }

    /// Sequential run over the three categories.
    pub fn run(&self, records: &[AffinityRecord]) -> PoppyResult<PredictionTable> {
        info!(model = %self.kind, records = records.len(), "Starting affinity run");
        let results = Category::ALL
            .iter()
            .map(|&category| (category, self.trainer(category).train(records)));
        self.merge(results)
    }

    /// Merge per-category results. A failed category is logged and left
    /// out, which makes the merge itself fail on the missing table.
    pub fn merge<I>(&self, results: I) -> PoppyResult<PredictionTable>
    where
        I: IntoIterator<Item = (Category, PoppyResult<PredictionTable>)>,
    {
        let mut tables = BTreeMap::new();
        for (category, result) in results {
            match result {
                Ok(table) => {
                    tables.insert(category, table);
                }
                Err(e) => {
                    error!(category = %category, model = %self.kind, error = %e, "Category training failed");
                }
            }
        }

        let merged = merge_categories(&tables, self.policy())?;
        info!(
            model = %self.kind,
            users = merged.len(),
            columns = merged.columns().len(),
            "Affinity run complete"
        );
        Ok(merged)
    }
}
