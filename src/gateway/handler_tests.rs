use std::sync::Arc;

use axum::{Router, body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::create_router_with_state;
use super::error::GatewayError;
use super::handler::GenerateRequest;
use super::state::HandlerState;
use crate::cache::{CachePolicy, CacheRegistry, EchoGeneratorFactory};
use crate::catalog::Catalog;
use crate::constants::MAX_REPEAT;
use crate::domain::{Persona, PersonaRef, Product, Review};
use crate::embedding::{EmbedderConfig, LazyEmbedder};
use crate::pipeline::{MarketingPipeline, PipelineDefaults};
use crate::retrieval::VectorRanker;
use crate::templates::{TemplateIndex, TemplateSampler};

fn test_pipeline() -> Arc<MarketingPipeline> {
    let catalog = Catalog {
        personas: vec![Persona {
            name: "트렌드 세터".to_string(),
            value_focus: "새로움".to_string(),
            ..Default::default()
        }],
        products: vec![Product {
            product_id: Some("S-1".to_string()),
            brand_name: "Sulwhasoo".to_string(),
            name: "First Care Activating Serum".to_string(),
            reviews: vec![Review {
                text: "흡수가 빠르고 광채가 돌아서 매일 아침 쓰고 있어요.".to_string(),
                rating: Some(5.0),
            }],
            ..Default::default()
        }],
        ..Default::default()
    };
    let templates = TemplateIndex::from_value(&catalog.templates);

    Arc::new(MarketingPipeline::new(
        Arc::new(catalog),
        Arc::new(CacheRegistry::new(Arc::new(EchoGeneratorFactory), templates)),
        VectorRanker::new(Arc::new(LazyEmbedder::new(EmbedderConfig::stub()))),
        TemplateSampler::new(Some(1)),
        PipelineDefaults {
            drafter_model: "drafter-test".to_string(),
            corrector_model: "corrector-test".to_string(),
            top_k: 3,
            cache: CachePolicy::Enabled,
        },
    ))
}

fn router_with(pipeline: Arc<MarketingPipeline>) -> Router {
    create_router_with_state(HandlerState::new(pipeline))
}

async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn generate_body() -> Value {
    json!({
        "persona": 0,
        "brand": "Sulwhasoo",
        "product": "First Care",
        "stage_index": 1
    })
}

#[tokio::test]
async fn test_healthz() {
    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = router_with(test_pipeline())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_generate_single_returns_result() {
    let (status, body) = post_json(router_with(test_pipeline()), "/generate", generate_body()).await;

    assert_eq!(status, StatusCode::OK);
    let result = &body["result"];
    assert_eq!(result["stage_name"], "Activation");
    assert_eq!(result["brand"], "Sulwhasoo");
    assert!(result["crm_message"].as_str().unwrap().contains("corrector-test"));
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn test_generate_repeated_returns_results() {
    let mut body = generate_body();
    body["n"] = json!(3);
    body["is_event"] = json!("yes");

    let (status, body) = post_json(router_with(test_pipeline()), "/generate", body).await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r["is_event"] == json!(true)));
}

#[tokio::test]
async fn test_generate_model_aliases() {
    let mut body = generate_body();
    body["qwen_model"] = json!("draft-alias");
    body["exa_model"] = json!("correct-alias");

    let (status, body) = post_json(router_with(test_pipeline()), "/generate", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["drafter"]["model"], "draft-alias");
    assert_eq!(body["result"]["corrector"]["model"], "correct-alias");
}

#[tokio::test]
async fn test_generate_unknown_persona_is_bad_request() {
    let mut body = generate_body();
    body["persona"] = json!("nobody");

    let (status, body) = post_json(router_with(test_pipeline()), "/generate", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("nobody"));
}

#[tokio::test]
async fn test_generate_stage_out_of_range_is_bad_request() {
    let mut body = generate_body();
    body["stage_index"] = json!(9);

    let (status, _) = post_json(router_with(test_pipeline()), "/generate", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_zero_top_k_is_bad_request() {
    let mut body = generate_body();
    body["top_k"] = json!(0);

    let (status, body) = post_json(router_with(test_pipeline()), "/generate", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_generate_oversized_n_is_bad_request() {
    let pipeline = test_pipeline();
    for n in [json!(MAX_REPEAT + 1), json!(u64::MAX)] {
        let mut body = generate_body();
        body["n"] = n;

        let (status, body) = post_json(router_with(pipeline.clone()), "/generate", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }
    assert_eq!(pipeline.registry().generators().builds(), 0);
}

#[tokio::test]
async fn test_generate_max_n_runs() {
    let mut body = generate_body();
    body["n"] = json!(MAX_REPEAT);

    let (status, body) = post_json(router_with(test_pipeline()), "/generate", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), MAX_REPEAT);
}

#[tokio::test]
async fn test_generate_disable_cache_clears_pool() {
    let pipeline = test_pipeline();

    let (status, _) = post_json(router_with(pipeline.clone()), "/generate", generate_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pipeline.registry().generators().len(), 2);

    let mut body = generate_body();
    body["disable_cache"] = json!(true);
    let (status, _) = post_json(router_with(pipeline.clone()), "/generate", body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pipeline.registry().generators().is_empty());
}

#[tokio::test]
async fn test_generate_batch_skips_failed_items() {
    let mut bad = generate_body();
    bad["brand"] = json!("Unknown");
    bad["product"] = json!("Nothing");

    let body = json!({"items": [generate_body(), bad, generate_body()]});
    let (status, body) = post_json(router_with(test_pipeline()), "/generate_batch", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["index"], 1);
}

#[tokio::test]
async fn test_generate_batch_disable_cache_applies_to_every_item() {
    let pipeline = test_pipeline();
    let body = json!({"items": [generate_body(), generate_body()], "disable_cache": true});

    let (status, body) = post_json(router_with(pipeline.clone()), "/generate_batch", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert!(body.get("failures").is_none());
    assert!(pipeline.registry().generators().is_empty());
}

#[test]
fn test_request_defaults() {
    let request: GenerateRequest = serde_json::from_value(json!({
        "persona": "트렌드 세터",
        "brand": "Sulwhasoo",
        "product": "Serum",
        "stage_index": 0
    }))
    .unwrap();

    assert_eq!(request.persona, PersonaRef::Name("트렌드 세터".to_string()));
    assert_eq!(request.style_index, 0);
    assert!(!request.is_event);
    assert_eq!(request.top_k, 3);
    assert_eq!(request.n, 1);
    assert!(!request.disable_cache);

    let run = request.to_run_request();
    assert_eq!(run.top_k, Some(3));
    assert!(run.cache.is_none());
}

#[test]
fn test_request_integer_event_flag() {
    let request: GenerateRequest = serde_json::from_value(json!({
        "persona": 0,
        "brand": "b",
        "product": "p",
        "stage_index": 0,
        "is_event": 1,
        "disable_cache": true
    }))
    .unwrap();

    assert!(request.is_event);
    assert_eq!(request.to_run_request().cache, Some(CachePolicy::Bypass));
}

#[test]
fn test_gateway_error_status() {
    use axum::response::IntoResponse;

    let response = GatewayError::InvalidRequest("x".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = GatewayError::PipelineFailed("x".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
