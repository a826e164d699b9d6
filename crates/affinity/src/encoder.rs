//! Encode one category's interactions into a dense user × item matrix.

use crate::codec::IdentityCodec;
use ndarray::Array2;
use poppy_core::{AffinityRecord, Category, PoppyError, PoppyResult};
use std::collections::HashSet;
use tracing::debug;

/// A single usable interaction, already index-encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub user: usize,
    pub item: usize,
    pub strength: f64,
}

#[derive(Debug, Clone)]
pub struct EncodedCategory {
    pub category: Category,
    pub users: IdentityCodec,
    pub items: IdentityCodec,
    /// Max observed strength per (user, item); 0 marks an unobserved cell.
    pub affinity: Array2<f64>,
    /// Every usable row in input order. Duplicates are kept.
    pub observations: Vec<Observation>,
}

impl EncodedCategory {
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn observed_cells(&self) -> usize {
        self.affinity.iter().filter(|&&v| v > 0.0).count()
    }
}

pub struct InteractionEncoder {
    category: Category,
}

impl InteractionEncoder {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    /// Filter `records` to this category and encode them.
    ///
    /// Rows with an unparsable timestamp, no user, no item label, or no
    /// finite strength are dropped. Repeated (user, item) pairs collapse to their
    /// maximum strength in the affinity matrix.
    pub fn encode(&self, records: &[AffinityRecord]) -> PoppyResult<EncodedCategory> {
        let usable: Vec<(&str, &str, f64)> = records
            .iter()
            .filter(|r| self.category.matches(&r.category_type))
            .filter_map(|r| {
                r.parsed_timestamp()?;
                if r.user_id.is_empty() {
                    return None;
                }
                let label = r.category_value.as_deref().filter(|l| !l.is_empty())?;
                let strength = r.strength.filter(|s| s.is_finite())?;
                Some((r.user_id.as_str(), label, strength))
            })
            .collect();

        let in_category = records
            .iter()
            .filter(|r| self.category.matches(&r.category_type))
            .count();
        if usable.len() < in_category {
            debug!(
                category = %self.category,
                dropped = in_category - usable.len(),
                "Dropped unusable interactions"
            );
        }

        if usable.is_empty() {
            return Err(PoppyError::EmptyCategory(self.category));
        }

        let users = IdentityCodec::fit(usable.iter().map(|(u, _, _)| *u))?;
        let items = IdentityCodec::fit(usable.iter().map(|(_, i, _)| *i))?;

        let mut affinity = Array2::<f64>::zeros((users.len(), items.len()));
        let mut observations = Vec::with_capacity(usable.len());
        for (user_id, label, strength) in usable {
            let (user, item) = match (users.encode(user_id), items.encode(label)) {
                (Some(u), Some(i)) => (u, i),
                _ => {
                    return Err(PoppyError::EmptyIdentitySet(format!(
                        "identifier ({}, {}) missing from fitted codec",
                        user_id, label
                    )))
                }
            };
            let cell = &mut affinity[[user, item]];
            *cell = cell.max(strength);
            observations.push(Observation {
                user,
                item,
                strength,
            });
        }

        debug!(
            category = %self.category,
            users = users.len(),
            items = items.len(),
            rows = observations.len(),
            "Encoded category interactions"
        );

        Ok(EncodedCategory {
            category: self.category,
            users,
            items,
            affinity,
            observations,
        })
    }
}

/// Unique user ids of the unfiltered record set, in first-appearance order.
pub fn fallback_users(records: &[AffinityRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| !r.user_id.is_empty() && seen.insert(r.user_id.as_str()))
        .map(|r| r.user_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2025-02-01 10:00:00";

    #[test]
    fn test_duplicates_collapse_to_max() {
        let records = vec![
            AffinityRecord::new("u1", Category::Star, "G2V", 2.0, TS),
            AffinityRecord::new("u1", Category::Star, "G2V", 5.0, TS),
            AffinityRecord::new("u1", Category::Star, "G2V", 3.0, TS),
        ];
        let encoded = InteractionEncoder::new(Category::Star)
            .encode(&records)
            .unwrap();
        assert_eq!(encoded.affinity[[0, 0]], 5.0);
        assert_eq!(encoded.observations.len(), 3);
    }

    #[test]
    fn test_filters_category_and_fills_zero() {
        let records = vec![
            AffinityRecord::new("u2", Category::Planet, "Gas Giant", 4.0, TS),
            AffinityRecord::new("u1", Category::Planet, "Terrestrial", 1.0, TS),
            AffinityRecord::new("u3", Category::Moon, "Saturn", 5.0, TS),
        ];
        let encoded = InteractionEncoder::new(Category::Planet)
            .encode(&records)
            .unwrap();
        assert_eq!(encoded.num_users(), 2);
        assert_eq!(encoded.num_items(), 2);
        assert_eq!(encoded.users.labels(), &["u1", "u2"]);

        let u2 = encoded.users.encode("u2").unwrap();
        let gas = encoded.items.encode("Gas Giant").unwrap();
        let rocky = encoded.items.encode("Terrestrial").unwrap();
        assert_eq!(encoded.affinity[[u2, gas]], 4.0);
        assert_eq!(encoded.affinity[[u2, rocky]], 0.0);
        assert_eq!(encoded.observed_cells(), 2);
    }

    #[test]
    fn test_drops_malformed_rows() {
        let bad_ts = AffinityRecord::new("u9", Category::Moon, "Mars", 3.0, "yesterday-ish");
        let mut no_label = AffinityRecord::new("u8", Category::Moon, "Mars", 3.0, TS);
        no_label.category_value = None;
        let mut no_strength = AffinityRecord::new("u7", Category::Moon, "Mars", 3.0, TS);
        no_strength.strength = None;
        let good = AffinityRecord::new("u1", Category::Moon, "Jupiter", 2.0, TS);

        let encoded = InteractionEncoder::new(Category::Moon)
            .encode(&[bad_ts, no_label, no_strength, good])
            .unwrap();
        assert_eq!(encoded.users.labels(), &["u1"]);
        assert_eq!(encoded.items.labels(), &["Jupiter"]);
    }

    #[test]
    fn test_empty_category() {
        let records = vec![AffinityRecord::new("u1", Category::Star, "G2V", 2.0, TS)];
        let err = InteractionEncoder::new(Category::Moon)
            .encode(&records)
            .unwrap_err();
        assert!(matches!(err, PoppyError::EmptyCategory(Category::Moon)));
    }

    #[test]
    fn test_fallback_users_first_appearance() {
        let records = vec![
            AffinityRecord::new("u3", Category::Star, "G2V", 2.0, TS),
            AffinityRecord::new("u1", Category::Planet, "Ice Giant", 2.0, TS),
            AffinityRecord::new("u3", Category::Moon, "Mars", 2.0, TS),
        ];
        assert_eq!(fallback_users(&records), vec!["u3", "u1"]);
    }

    #[test]
    fn test_backend_rows_with_odd_cells_are_dropped() {
        let records: Vec<AffinityRecord> = serde_json::from_str(
            r#"[
                {"User_ID": 1, "Category_Type": "Planet", "Category_Value": "Gas Giant", "Strength": 4, "Timestamp": "2025-02-01 10:00:00"},
                {"User_ID": 2, "Category_Type": "Planet", "Category_Value": "Terrestrial", "Strength": 5, "Timestamp": 1738404000},
                {"User_ID": null, "Category_Type": "Planet", "Category_Value": "Ice Giant", "Strength": 2, "Timestamp": "2025-02-01 10:00:00"},
                {"User_ID": 3, "Category_Type": null, "Category_Value": "Ice Giant", "Strength": 2, "Timestamp": "2025-02-01 10:00:00"}
            ]"#,
        )
        .unwrap();

        let encoded = InteractionEncoder::new(Category::Planet)
            .encode(&records)
            .unwrap();
        assert_eq!(encoded.users.labels(), &["1"]);
        assert_eq!(encoded.items.labels(), &["Gas Giant"]);
        assert_eq!(fallback_users(&records), vec!["1", "2", "3"]);
    }
}
