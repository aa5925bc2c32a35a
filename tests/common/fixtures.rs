//! On-disk catalog fixtures.

use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;

use crmforge::config::Config;

fn write_json(dir: &Path, name: &str, value: &Value) {
    let body = serde_json::to_vec_pretty(value).expect("fixture serializes");
    std::fs::write(dir.join(name), body).expect("fixture written");
}

/// Writes a complete catalog (all six files) into a fresh temp dir.
pub fn catalog_dir() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();

    write_json(
        root,
        "personas.json",
        &json!([
            {
                "name": "꼼꼼한 성분파",
                "skin_type": "건성",
                "value_focus": "성분 신뢰",
                "shopping_style": "리뷰 정독",
                "growth_point": "탄력",
                "traits": ["분석적", "신중함"]
            },
            {
                "name": "트렌드 세터",
                "skin_type": "복합성",
                "value_focus": "새로움",
                "traits": "얼리어답터"
            }
        ]),
    );

    write_json(
        root,
        "products.json",
        &json!([
            {
                "product_id": 100,
                "brand_name": "Laneige",
                "name": "Water Bank Blue Hyaluronic Cream",
                "price": "38000",
                "reviews": [
                    {"text": "보습 효과가 오래가서 재구매했어요. 아침까지 촉촉합니다.", "rating": 5},
                    {"text": "흡수가 빨라서 만족스러워요. 끈적임도 거의 없어요.", "rating": "4"},
                    {"text": "향이 조금 강한 편이라 호불호가 있을 것 같아요.", "rating": 3},
                    {"text": "별로", "rating": 1}
                ]
            },
            {
                "product_id": "S-1",
                "brand_name": "Sulwhasoo",
                "name": "First Care Activating Serum",
                "price": 120000,
                "reviews": [
                    {"text": "광채가 돌고 피부결이 정돈되는 느낌이라 계속 쓰고 있어요.", "rating": 5}
                ]
            }
        ]),
    );

    write_json(
        root,
        "brand_stories.json",
        &json!({
            "라네즈": {
                "name_en": "Laneige",
                "story": "물의 과학으로 피부 본연의 수분을 지킵니다.",
                "tone_keywords": ["청량", "산뜻"]
            }
        }),
    );

    write_json(
        root,
        "crm_goals.json",
        &json!({
            "Retention": {
                "stage_kr": "유지",
                "objective": "재구매 유도",
                "target_state": "정기 구매 고객",
                "allowed_context": ["사용 주기"],
                "forbidden_context": ["과장 광고"],
                "cta_style": "부드러운 리마인드"
            }
        }),
    );

    write_json(
        root,
        "crm_analysis_results_categorized.json",
        &json!([
            {
                "stage_index": 2,
                "items": [
                    {
                        "description": "재구매 리마인드",
                        "extracted_text": "다 쓰셨나요? 지금 다시 채워보세요",
                        "source_index": 7,
                        "filename": "crm_007.png"
                    },
                    {
                        "description": "멤버십 혜택",
                        "extracted_text": "회원님만을 위한 적립 혜택"
                    }
                ]
            }
        ]),
    );

    write_json(
        root,
        "integrated_crm_templates.json",
        &json!({
            "Brand_Story_Style": {
                "content": {
                    "3_Retention_Loyalty": [
                        "retention template one",
                        {"style": "warm", "title": "다시 만나요", "content": "지난번 그 촉촉함, 기억하시나요?"}
                    ],
                    "0": ["acquisition template"]
                }
            },
            "Promotion_Style": [
                {"stage": 2, "data": ["promo retention"]}
            ]
        }),
    );

    dir
}

/// Config pointing at `data_dir`, with stub generators and the stub embedder.
pub fn test_config(data_dir: &Path, output_dir: &Path) -> Config {
    Config {
        data_dir: data_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        embedding_model_path: None,
        drafter_model: "drafter-it".to_string(),
        corrector_model: "corrector-it".to_string(),
        top_k: 2,
        cache_enabled: true,
        seed: Some(11),
        mock_generators: true,
        ..Default::default()
    }
}
