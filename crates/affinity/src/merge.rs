//! Joins the per-category prediction tables on `user_id`.
//!
//! The factorization layer keeps only users present in every category
//! (inner join). The neural layer keeps every user and fills missing cells
//! with 0 (outer join).

use crate::trainer::ModelKind;
use poppy_core::{Category, IdentifierKey, PoppyError, PoppyResult, PredictionTable};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Users present on both sides, in left-table order.
    Inner,
    /// Users present on either side, integer ids numerically then text;
    /// absent cells become 0.
    OuterZeroFill,
}

impl JoinPolicy {
    pub fn for_model(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Factorization => JoinPolicy::Inner,
            ModelKind::Neural => JoinPolicy::OuterZeroFill,
        }
    }
}

fn joined_columns(left: &[String], right: &[String]) -> Vec<String> {
    let left_set: HashSet<&str> = left.iter().map(String::as_str).collect();
    let right_set: HashSet<&str> = right.iter().map(String::as_str).collect();

    let left_cols = left.iter().map(|c| {
        if right_set.contains(c.as_str()) {
            format!("{}{}", c, LEFT_SUFFIX)
        } else {
            c.clone()
        }
    });
    let right_cols = right.iter().map(|c| {
        if left_set.contains(c.as_str()) {
            format!("{}{}", c, RIGHT_SUFFIX)
        } else {
            c.clone()
        }
    });
    left_cols.chain(right_cols).collect()
}

/// Join two tables on the user id. Item columns that appear on both sides
/// are suffixed `_x` (left) and `_y` (right).
pub fn join(
    left: &PredictionTable,
    right: &PredictionTable,
    policy: JoinPolicy,
) -> PoppyResult<PredictionTable> {
    let columns = joined_columns(left.columns(), right.columns());
    let left_width = left.columns().len();
    let right_width = right.columns().len();

    let left_rows: HashMap<&str, &[f64]> = left
        .rows()
        .iter()
        .rev()
        .map(|r| (r.user_id.as_str(), r.values.as_slice()))
        .collect();
    let right_rows: HashMap<&str, &[f64]> = right
        .rows()
        .iter()
        .rev()
        .map(|r| (r.user_id.as_str(), r.values.as_slice()))
        .collect();

    let mut table = PredictionTable::new(columns);
    match policy {
        JoinPolicy::Inner => {
            let mut emitted = HashSet::new();
            for user_id in left.user_ids() {
                if !emitted.insert(user_id) {
                    continue;
                }
                if let (Some(l), Some(r)) = (left_rows.get(user_id), right_rows.get(user_id)) {
                    let values = l.iter().chain(r.iter()).copied().collect();
                    table.push_row(user_id, values)?;
                }
            }
        }
        JoinPolicy::OuterZeroFill => {
            let mut users: Vec<IdentifierKey> = left
                .user_ids()
                .chain(right.user_ids())
                .map(IdentifierKey::new)
                .collect();
            users.sort();
            users.dedup();
            for user_id in users.iter().map(IdentifierKey::as_str) {
                let mut values = Vec::with_capacity(left_width + right_width);
                match left_rows.get(user_id) {
                    Some(l) => values.extend_from_slice(l),
                    None => values.resize(left_width, 0.0),
                }
                match right_rows.get(user_id) {
                    Some(r) => values.extend_from_slice(r),
                    None => values.resize(left_width + right_width, 0.0),
                }
                table.push_row(user_id, values)?;
            }
        }
    }

    Ok(table)
}

/// Merge the Star, Planet and Moon tables, in that order.
///
/// A category without a table is an error; a category whose table has no
/// rows simply empties an inner join.
pub fn merge_categories(
    tables: &BTreeMap<Category, PredictionTable>,
    policy: JoinPolicy,
) -> PoppyResult<PredictionTable> {
    let mut ordered = Category::ALL.iter().map(|category| {
        tables
            .get(category)
            .ok_or(PoppyError::MissingCategoryTable(*category))
    });

    let first = match ordered.next() {
        Some(table) => table?.clone(),
        None => return Ok(PredictionTable::default()),
    };
    let merged = ordered.try_fold(first, |acc, next| join(&acc, next?, policy))?;

    debug!(
        policy = ?policy,
        users = merged.len(),
        columns = merged.columns().len(),
        "Merged category tables"
    );
    Ok(merged)
}
