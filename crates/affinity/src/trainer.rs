use crate::encoder::{fallback_users, InteractionEncoder};
use crate::factorization::MatrixFactorizer;
use crate::neural::NeuralTrainer;
use crate::predictor::DensePredictor;
use poppy_core::{AffinityRecord, Category, PoppyError, PoppyResult, PredictionTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Factorization,
    Neural,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Factorization => write!(f, "factorization"),
            ModelKind::Neural => write!(f, "neural"),
        }
    }
}

/// Trains one category with one model family and returns its dense
/// prediction table.
#[derive(Debug, Clone)]
pub struct CategoryTrainer {
    category: Category,
    kind: ModelKind,
}

impl CategoryTrainer {
    pub fn new(category: Category, kind: ModelKind) -> Self {
        Self { category, kind }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// A category with nothing to learn from yields a table of every user in
    /// `records` and no prediction columns.
    pub fn train(&self, records: &[AffinityRecord]) -> PoppyResult<PredictionTable> {
        match self.train_dense(records) {
            Err(PoppyError::EmptyCategory(_)) | Err(PoppyError::NoObservedCells) => {
                let users = fallback_users(records);
                info!(
                    category = %self.category,
                    model = %self.kind,
                    users = users.len(),
                    "No usable interactions, emitting user-only table"
                );
                Ok(PredictionTable::user_only(users))
            }
            other => other,
        }
    }

    fn train_dense(&self, records: &[AffinityRecord]) -> PoppyResult<PredictionTable> {
        let encoded = InteractionEncoder::new(self.category).encode(records)?;

        let dense = match self.kind {
            ModelKind::Factorization => MatrixFactorizer::default()
                .fit(&encoded.affinity)?
                .reconstruct(),
            ModelKind::Neural => NeuralTrainer::default()
                .fit(&encoded)?
                .predict_dense(),
        };

        let table = DensePredictor::table(&encoded.users, &encoded.items, &dense)?;
        info!(
            category = %self.category,
            model = %self.kind,
            users = table.len(),
            items = table.columns().len(),
            "Category trained"
        );
        Ok(table)
    }
}
