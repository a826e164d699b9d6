//! User-keyed prediction table: the structural contract shared by the
//! per-category trainers, the merge stage, and whatever persists the output.
//!
//! Column 0 is always the user id; the remaining columns are decoded item
//! labels, one predicted affinity per cell.

use crate::error::{PoppyError, PoppyResult};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub user_id: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictionTable {
    columns: Vec<String>,
    rows: Vec<PredictionRow>,
}

impl PredictionTable {
    pub const KEY_COLUMN: &'static str = "user_id";

    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Table with the key column only, used when a category could not be trained.
    pub fn user_only<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Vec::new(),
            rows: user_ids
                .into_iter()
                .map(|user_id| PredictionRow {
                    user_id: user_id.into(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn push_row(&mut self, user_id: impl Into<String>, values: Vec<f64>) -> PoppyResult<()> {
        let user_id = user_id.into();
        if values.len() != self.columns.len() {
            return Err(PoppyError::Shape(format!(
                "row for user {} has {} values, table has {} item columns",
                user_id,
                values.len(),
                self.columns.len()
            )));
        }
        self.rows.push(PredictionRow { user_id, values });
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.user_id.as_str())
    }

    pub fn row(&self, user_id: &str) -> Option<&PredictionRow> {
        self.rows.iter().find(|row| row.user_id == user_id)
    }

    pub fn value(&self, user_id: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(user_id).map(|row| row.values[col])
    }
}

/// Serializes one row in column order, `user_id` first.
struct RowRecord<'a> {
    columns: &'a [String],
    row: &'a PredictionRow,
}

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + 1))?;
        map.serialize_entry(PredictionTable::KEY_COLUMN, &self.row.user_id)?;
        for (column, value) in self.columns.iter().zip(&self.row.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl Serialize for PredictionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.iter().map(|row| RowRecord {
            columns: &self.columns,
            row,
        }))
    }
}
