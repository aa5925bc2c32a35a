use super::*;
use serde_json::json;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, value: serde_json::Value) {
    std::fs::write(dir.path().join(name), value.to_string()).unwrap();
}

fn sample_catalog() -> Catalog {
    Catalog {
        personas: serde_json::from_value(json!([
            {"name": "Luxury_Lover", "skin_type": "건조"},
            {"name": "Sensitive_Skin", "skin_type": "민감"}
        ]))
        .unwrap(),
        products: serde_json::from_value(json!([
            {"brand_name": "설화수", "name": "자음생크림 리치 단품세트"},
            {"brand_name": "Laneige", "name": "Water Bank Blue Hyaluronic Cream"},
            {"brand_name": "Laneige Homme", "name": "Blue Energy"}
        ]))
        .unwrap(),
        brand_stories: serde_json::from_value(json!({
            "라네즈": {"name_en": "Laneige", "story": "water science", "tone_keywords": ["맑은"]}
        }))
        .unwrap(),
        ..Default::default()
    }
}

#[test]
fn test_load_requires_personas_and_products_only() {
    let dir = TempDir::new().unwrap();
    write(&dir, PERSONAS_FILE, json!([{"name": "A"}]));
    write(&dir, PRODUCTS_FILE, json!([{"brand_name": "B", "name": "P"}]));

    let catalog = Catalog::load(dir.path()).unwrap();
    assert_eq!(catalog.personas.len(), 1);
    assert!(catalog.brand_stories.is_empty());
    assert!(catalog.crm_buckets.is_empty());
    assert!(catalog.templates.is_null());
}

#[test]
fn test_load_missing_products_is_io_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, PERSONAS_FILE, json!([]));
    assert!(matches!(
        Catalog::load(dir.path()),
        Err(CatalogError::Io { .. })
    ));
}

#[test]
fn test_load_malformed_optional_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, PERSONAS_FILE, json!([]));
    write(&dir, PRODUCTS_FILE, json!([]));
    std::fs::write(dir.path().join(CRM_GOALS_FILE), "{not json").unwrap();
    assert!(matches!(
        Catalog::load(dir.path()),
        Err(CatalogError::Parse { .. })
    ));
}

#[test]
fn test_find_persona_by_index_and_name() {
    let catalog = sample_catalog();
    assert_eq!(
        catalog.find_persona(&PersonaRef::Index(1)).unwrap().name,
        "Sensitive_Skin"
    );
    assert_eq!(
        catalog
            .find_persona(&PersonaRef::Name("luxury_lover".into()))
            .unwrap()
            .name,
        "Luxury_Lover"
    );
    assert_eq!(
        catalog
            .find_persona(&PersonaRef::Name("0".into()))
            .unwrap()
            .name,
        "Luxury_Lover"
    );
    assert!(matches!(
        catalog.find_persona(&PersonaRef::Index(9)),
        Err(CatalogError::PersonaNotFound { .. })
    ));
}

#[test]
fn test_find_product_prefers_exact_brand() {
    let catalog = sample_catalog();
    let product = catalog.find_product(" laneige ", "blue").unwrap();
    assert_eq!(product.name, "Water Bank Blue Hyaluronic Cream");
}

#[test]
fn test_find_product_partial_fallback() {
    let catalog = sample_catalog();
    let product = catalog.find_product("Homme", "nothing matches").unwrap();
    assert_eq!(product.name, "Blue Energy");

    assert!(matches!(
        catalog.find_product("Unknown", "zzz"),
        Err(CatalogError::ProductNotFound { .. })
    ));
}

#[test]
fn test_pick_brand_story_by_key_then_name_en() {
    let catalog = sample_catalog();
    assert_eq!(catalog.pick_brand_story("라네즈").story, "water science");
    assert_eq!(catalog.pick_brand_story("LANEIGE").story, "water science");
    assert_eq!(catalog.pick_brand_story("Sulwhasoo"), BrandStory::default());
}

#[test]
fn test_stage_lookups() {
    let catalog = Catalog {
        crm_goals: serde_json::from_value(json!({
            "Retention": {"objective": "bring back", "allowed_context": ["재방문"]}
        }))
        .unwrap(),
        crm_buckets: serde_json::from_value(json!([
            {"stage_index": 2, "items": [{"description": "d", "extracted_text": "t"}]}
        ]))
        .unwrap(),
        ..Default::default()
    };

    assert_eq!(catalog.crm_goal(Stage::Retention).objective, "bring back");
    assert_eq!(catalog.crm_goal(Stage::Revenue), CrmGoal::default());
    let bucket = catalog.stage_bucket(Stage::Retention).unwrap();
    assert_eq!(bucket.items[0].document(), "d t");
    assert!(catalog.stage_bucket(Stage::Acquisition).is_none());
}
