use poppy_affinity::{AffinityPipeline, CategoryTrainer, ModelKind};
use poppy_core::{AffinityRecord, Category, PoppyError};
use serde_json::json;

fn records(value: serde_json::Value) -> Vec<AffinityRecord> {
    serde_json::from_value(value).unwrap()
}

fn semantic_interactions() -> Vec<AffinityRecord> {
    records(json!([
        {"User_ID": 1, "Category_Type": "Star", "Category_Value": "G2V", "Strength": 5, "Timestamp": "2025-02-01 10:00:00"},
        {"User_ID": 1, "Category_Type": "Star", "Category_Value": "M1V", "Strength": 2, "Timestamp": "2025-02-01 10:05:00"},
        {"User_ID": 2, "Category_Type": "Star", "Category_Value": "G2V", "Strength": 4, "Timestamp": "2025-02-02 11:00:00"},
        {"User_ID": 3, "Category_Type": "Star", "Category_Value": "M1V", "Strength": 1, "Timestamp": "2025-02-03 09:00:00"},
        {"User_ID": 1, "Category_Type": "Planet", "Category_Value": "Gas Giant", "Strength": 3, "Timestamp": "2025-02-01 12:00:00"},
        {"User_ID": 2, "Category_Type": "Planet", "Category_Value": "Terrestrial", "Strength": 5, "Timestamp": "2025-02-02 12:00:00"},
        {"User_ID": 3, "Category_Type": "Planet", "Category_Value": "Gas Giant", "Strength": 4, "Timestamp": "2025-02-03 12:00:00"},
        {"User_ID": 1, "Category_Type": "Moon", "Category_Value": "Saturn", "Strength": 5, "Timestamp": "2025-02-01 13:00:00"},
        {"User_ID": 2, "Category_Type": "Moon", "Category_Value": "Jupiter", "Strength": 2, "Timestamp": "2025-02-02 13:00:00"},
        {"User_ID": 2, "Category_Type": "Moon", "Category_Value": "Saturn", "Strength": 1, "Timestamp": "not a time"}
    ]))
}

#[test]
fn test_factorization_run_inner_joins_categories() {
    let merged = AffinityPipeline::new(ModelKind::Factorization)
        .run(&semantic_interactions())
        .unwrap();

    // User 3 never touched a moon.
    assert_eq!(merged.user_ids().collect::<Vec<_>>(), vec!["1", "2"]);
    assert_eq!(
        merged.columns(),
        &["G2V", "M1V", "Gas Giant", "Terrestrial", "Jupiter", "Saturn"]
    );
    assert!(merged
        .rows()
        .iter()
        .flat_map(|r| &r.values)
        .all(|v| v.is_finite()));
}

#[test]
fn test_neural_run_outer_joins_and_zero_fills() {
    let merged = AffinityPipeline::new(ModelKind::Neural)
        .run(&semantic_interactions())
        .unwrap();

    assert_eq!(merged.user_ids().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    assert_eq!(merged.value("3", "Saturn"), Some(0.0));
    assert_eq!(merged.value("3", "Jupiter"), Some(0.0));
    let g2v = merged.value("3", "G2V").unwrap();
    assert!((1.0..=5.0).contains(&g2v));
}

#[test]
fn test_neural_run_is_reproducible() {
    let data = semantic_interactions();
    let pipeline = AffinityPipeline::new(ModelKind::Neural);
    assert_eq!(pipeline.run(&data).unwrap(), pipeline.run(&data).unwrap());
}

#[test]
fn test_category_without_rows_yields_user_only_table() {
    let data: Vec<AffinityRecord> = semantic_interactions()
        .into_iter()
        .filter(|r| r.category_type != "Moon")
        .collect();

    let moon = CategoryTrainer::new(Category::Moon, ModelKind::Factorization)
        .train(&data)
        .unwrap();
    assert!(moon.columns().is_empty());
    assert_eq!(moon.user_ids().collect::<Vec<_>>(), vec!["1", "2", "3"]);

    let merged = AffinityPipeline::new(ModelKind::Factorization)
        .run(&data)
        .unwrap();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.columns(), &["G2V", "M1V", "Gas Giant", "Terrestrial"]);
}

#[test]
fn test_failed_category_fails_the_merge() {
    let pipeline = AffinityPipeline::new(ModelKind::Neural);
    let data = semantic_interactions();
    let results = vec![
        (Category::Star, pipeline.trainer(Category::Star).train(&data)),
        (Category::Planet, pipeline.trainer(Category::Planet).train(&data)),
        (Category::Moon, Err(PoppyError::Shape("worker panicked".to_string()))),
    ];
    let err = pipeline.merge(results).unwrap_err();
    assert!(matches!(err, PoppyError::MissingCategoryTable(Category::Moon)));
}

#[test]
fn test_serialized_table_keeps_column_order() {
    let merged = AffinityPipeline::new(ModelKind::Factorization)
        .run(&semantic_interactions())
        .unwrap();
    let text = serde_json::to_string(&merged).unwrap();
    let user = text.find("\"user_id\"").unwrap();
    let g2v = text.find("\"G2V\"").unwrap();
    let saturn = text.find("\"Saturn\"").unwrap();
    assert!(user < g2v && g2v < saturn);
}
