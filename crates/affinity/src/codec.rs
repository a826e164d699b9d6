//! Reversible mapping between opaque identifiers and dense indices.

use poppy_core::{IdentifierKey, PoppyError, PoppyResult};
use std::collections::{HashMap, HashSet};

/// Bijection between identifiers and `0..n`. Indices follow the sorted order
/// of the distinct identifiers (integer ids numerically, then text), so the
/// encoding does not depend on input order.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityCodec {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl IdentityCodec {
    pub fn fit<I, S>(values: I) -> PoppyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: HashSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();
        if distinct.is_empty() {
            return Err(PoppyError::EmptyIdentitySet(
                "no identifiers to encode".to_string(),
            ));
        }

        let mut labels: Vec<String> = distinct.into_iter().collect();
        labels.sort_by(|a, b| IdentifierKey::new(a).cmp(&IdentifierKey::new(b)));
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        Ok(Self { labels, index })
    }

    pub fn encode(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Decoded identifiers in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
