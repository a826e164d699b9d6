use poppy_core::config::TrendingConfig;
use poppy_core::types::parse_timestamp;
use poppy_core::InteractionRecord;
use poppy_trending::TrendAggregator;
use serde_json::json;

#[test]
fn test_rank_backend_rows() {
    let records: Vec<InteractionRecord> = serde_json::from_value(json!([
        {"User_ID": 1, "Object_Type": "Star", "Object_ID": 11, "Interaction_Type": "View", "Interaction_Rating": null, "Timestamp": "2025-06-01T08:00:00Z"},
        {"User_ID": 2, "Object_Type": "Star", "Object_ID": 11, "Interaction_Type": "Rate", "Interaction_Rating": 4, "Timestamp": "2025-06-03T08:00:00Z"},
        {"User_ID": 2, "Object_Type": "Star", "Object_ID": 12, "Interaction_Type": "Like", "Interaction_Rating": null, "Timestamp": "2025-06-02T08:00:00Z"},
        {"User_ID": 3, "Object_Type": "Planet", "Object_ID": 4, "Interaction_Type": "Like", "Interaction_Rating": null, "Timestamp": "2025-06-03T08:00:00Z"},
        {"User_ID": 3, "Object_Type": "Planet", "Object_ID": 5, "Interaction_Type": "View", "Interaction_Rating": null, "Timestamp": null}
    ]))
    .unwrap();

    let now = parse_timestamp("2025-06-05 00:00:00").unwrap();
    let ranked = TrendAggregator::new(&TrendingConfig::default()).rank(&records, now);

    let scores: Vec<(&str, &str, f64)> = ranked
        .iter()
        .map(|f| (f.object_type.as_str(), f.object_id.as_str(), f.trending_score))
        .collect();
    // Star 11: view at weight 0, rate at weight 1. Star 12 like at 0.5.
    assert_eq!(
        scores,
        vec![("Star", "11", 3.0), ("Planet", "4", 2.0), ("Star", "12", 1.0)]
    );
    assert_eq!(ranked[0].total_interactions, 2);
}

#[test]
fn test_numeric_timestamp_drops_only_its_row() {
    let records: Vec<InteractionRecord> = serde_json::from_value(json!([
        {"User_ID": 1, "Object_Type": "Moon", "Object_ID": 2, "Interaction_Type": "Like", "Timestamp": "2025-06-01 08:00:00"},
        {"User_ID": 2, "Object_Type": "Moon", "Object_ID": 3, "Interaction_Type": "Rate", "Interaction_Rating": 5, "Timestamp": 1748764800},
        {"User_ID": 3, "Object_Type": null, "Object_ID": 4, "Interaction_Type": "View", "Timestamp": "2025-06-01 08:00:00"}
    ]))
    .unwrap();

    let now = parse_timestamp("2025-06-05 00:00:00").unwrap();
    let ranked = TrendAggregator::new(&TrendingConfig::default()).rank(&records, now);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].object_id, "2");
    assert_eq!(ranked[0].trending_score, 2.0);
}
