use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One of the three disjoint item taxonomies trained independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Star,
    Planet,
    Moon,
}

impl Category {
    /// Merge order of the per-category prediction tables.
    pub const ALL: [Category; 3] = [Category::Star, Category::Planet, Category::Moon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Star => "Star",
            Category::Planet => "Planet",
            Category::Moon => "Moon",
        }
    }

    pub fn matches(&self, raw: &str) -> bool {
        raw == self.as_str()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InteractionType {
    View,
    Like,
    Rate,
}

impl InteractionType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "View" => Some(InteractionType::View),
            "Like" => Some(InteractionType::Like),
            "Rate" => Some(InteractionType::Rate),
            _ => None,
        }
    }
}

/// Raw interaction as recorded by the backend. Feeds the trend ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    #[serde(
        rename = "User_ID",
        alias = "user_id",
        default,
        deserialize_with = "identifier"
    )]
    pub user_id: String,
    #[serde(
        rename = "Object_Type",
        alias = "object_type",
        default,
        deserialize_with = "identifier"
    )]
    pub object_type: String,
    #[serde(
        rename = "Object_ID",
        alias = "object_id",
        default,
        deserialize_with = "identifier"
    )]
    pub object_id: String,
    #[serde(
        rename = "Interaction_Type",
        alias = "interaction_type",
        default,
        deserialize_with = "identifier"
    )]
    pub interaction_type: String,
    #[serde(
        rename = "Interaction_Rating",
        alias = "rating",
        default,
        deserialize_with = "optional_number"
    )]
    pub rating: Option<f64>,
    #[serde(
        rename = "Timestamp",
        alias = "timestamp",
        default,
        deserialize_with = "optional_text"
    )]
    pub timestamp: Option<String>,
}

impl InteractionRecord {
    pub fn kind(&self) -> Option<InteractionType> {
        InteractionType::parse(&self.interaction_type)
    }

    /// Affinity strength carried by this interaction: a like counts 1, a
    /// rating counts its value, everything else counts 0.
    pub fn strength(&self) -> f64 {
        match self.kind() {
            Some(InteractionType::Like) => 1.0,
            Some(InteractionType::Rate) => self.rating.unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Interaction projected onto a category and an item label, with its strength.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffinityRecord {
    #[serde(
        rename = "User_ID",
        alias = "user_id",
        default,
        deserialize_with = "identifier"
    )]
    pub user_id: String,
    #[serde(
        rename = "Category_Type",
        alias = "category_type",
        default,
        deserialize_with = "identifier"
    )]
    pub category_type: String,
    #[serde(
        rename = "Category_Value",
        alias = "category_value",
        default,
        deserialize_with = "optional_identifier"
    )]
    pub category_value: Option<String>,
    #[serde(
        rename = "Strength",
        alias = "strength",
        default,
        deserialize_with = "optional_number"
    )]
    pub strength: Option<f64>,
    #[serde(
        rename = "Timestamp",
        alias = "timestamp",
        default,
        deserialize_with = "optional_text"
    )]
    pub timestamp: Option<String>,
}

impl AffinityRecord {
    pub fn new(
        user_id: impl Into<String>,
        category: Category,
        label: impl Into<String>,
        strength: f64,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category_type: category.as_str().to_string(),
            category_value: Some(label.into()),
            strength: Some(strength),
            timestamp: Some(timestamp.into()),
        }
    }

    /// Project a raw interaction onto a category item label.
    pub fn from_interaction(record: &InteractionRecord, label: impl Into<String>) -> Self {
        Self {
            user_id: record.user_id.clone(),
            category_type: record.object_type.clone(),
            category_value: Some(label.into()),
            strength: Some(record.strength()),
            timestamp: record.timestamp.clone(),
        }
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a backend timestamp. Offsets are normalized to UTC; naive values
/// are taken as UTC. Returns `None` for anything unparsable.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Sort key for opaque identifiers: integer ids first in numeric order, then
/// everything else lexicographically. The raw text is part of the key, so
/// "1" and "01" stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IdentifierKey<'a> {
    rank: IdentifierRank,
    raw: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IdentifierRank {
    Numeric(i64),
    Text,
}

impl<'a> IdentifierKey<'a> {
    pub fn new(raw: &'a str) -> Self {
        let rank = raw
            .parse()
            .map(IdentifierRank::Numeric)
            .unwrap_or(IdentifierRank::Text);
        Self { rank, raw }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }
}

/// Scalar as the backend serializes it: database integers, floats, or text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawScalar {
    fn into_identifier(self) -> String {
        match self {
            RawScalar::Int(v) => v.to_string(),
            RawScalar::Float(v) => v.to_string(),
            RawScalar::Text(v) => v,
        }
    }

    fn into_number(self) -> Option<f64> {
        match self {
            RawScalar::Int(v) => Some(v as f64),
            RawScalar::Float(v) => Some(v),
            RawScalar::Text(v) => v.trim().parse().ok(),
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            RawScalar::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Any JSON value. Nulls, booleans, arrays and objects decode to `Other`, so
/// one odd cell never rejects the whole payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Scalar(RawScalar),
    Other(IgnoredAny),
}

impl Cell {
    fn scalar(self) -> Option<RawScalar> {
        match self {
            Cell::Scalar(v) => Some(v),
            Cell::Other(_) => None,
        }
    }
}

/// Unusable values become an empty identifier, which no filter accepts.
fn identifier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Cell::deserialize(deserializer)?
        .scalar()
        .map(RawScalar::into_identifier)
        .unwrap_or_default())
}

fn optional_identifier<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Cell::deserialize(deserializer)?
        .scalar()
        .map(RawScalar::into_identifier))
}

fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Cell::deserialize(deserializer)?
        .scalar()
        .and_then(RawScalar::into_number))
}

/// Only strings can hold a timestamp; anything else is treated as missing.
fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Cell::deserialize(deserializer)?
        .scalar()
        .and_then(RawScalar::into_text))
}
