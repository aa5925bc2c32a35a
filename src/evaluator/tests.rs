use super::protocol::{build_request, user_prompt};
use super::*;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use serial_test::serial;

use crate::candidates::Candidate;

fn batch() -> Vec<Candidate> {
    vec![
        Candidate::new(0, "msg A"),
        Candidate::new(1, "msg B"),
        Candidate::new(3, "msg C"),
    ]
}

#[test]
fn test_user_prompt_tags_response_ids() {
    let prompt = user_prompt("ctx", &batch());
    assert!(prompt.starts_with("요약:\nctx\n\n후보:\n"));
    assert!(prompt.contains("[0] msg A\n\n[1] msg B\n\n[3] msg C"));
    assert!(prompt.ends_with("정수로 반환하라."));
}

#[test]
fn test_request_body_shape() {
    let body = serde_json::to_value(build_request("judge-1", "pick one")).unwrap();
    assert_eq!(body["model"], "judge-1");
    assert_eq!(body["input"][0]["role"], "system");
    assert_eq!(body["input"][0]["content"][0]["type"], "input_text");
    assert_eq!(body["input"][1]["content"][0]["text"], "pick one");
}

#[test]
fn test_extract_response_text_shapes() {
    assert_eq!(
        extract_response_text(&json!({"output_text": "  2 \n"})).unwrap(),
        "2"
    );

    let nested = json!({
        "output_text": "   ",
        "output": [
            {"type": "reasoning"},
            {"content": [{"type": "output_text", "text": "후보 "}, "1"]},
            {"content": " 번"}
        ]
    });
    assert_eq!(extract_response_text(&nested).unwrap(), "후보 1 번");

    assert!(matches!(
        extract_response_text(&json!({"choices": []})),
        Err(EvaluatorError::InvalidResponse(_))
    ));
    assert!(matches!(
        extract_response_text(&json!({"output": [{"content": []}]})),
        Err(EvaluatorError::InvalidResponse(_))
    ));
}

#[test]
fn test_parse_choice_takes_first_integer() {
    assert_eq!(parse_choice("답은 2번, 그 다음 0").unwrap(), 2);
    assert_eq!(parse_choice("-1").unwrap(), -1);
    assert!(matches!(
        parse_choice("둘 다 좋다"),
        Err(EvaluatorError::NoInteger(_))
    ));
}

#[test]
fn test_resolve_choice_prefers_ids_then_index() {
    let candidates = batch();
    assert_eq!(resolve_choice(3, &candidates).unwrap(), 2);
    assert_eq!(resolve_choice(1, &candidates).unwrap(), 1);
    // no id 2, falls back to list position
    assert_eq!(resolve_choice(2, &candidates).unwrap(), 2);
    assert!(matches!(
        resolve_choice(9, &candidates),
        Err(EvaluatorError::UnresolvedChoice { choice: 9, count: 3 })
    ));
    assert!(resolve_choice(-1, &candidates).is_err());
}

#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Option<String>>>,
    body: Arc<Mutex<Option<Value>>>,
}

async fn spawn_judge(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1/responses")
}

fn config_for(endpoint: String, key_var: &str) -> EvaluatorConfig {
    EvaluatorConfig {
        endpoint,
        model: "judge-test".to_string(),
        timeout: Duration::from_millis(500),
        api_key_var: key_var.to_string(),
    }
}

fn set_key(var: &str, value: &str) {
    // SAFETY: Test code only, serialized with #[serial].
    unsafe { std::env::set_var(var, value) };
}

fn clear_key(var: &str) {
    // SAFETY: Test code only, serialized with #[serial].
    unsafe { std::env::remove_var(var) };
}

#[tokio::test]
#[serial]
async fn test_client_posts_and_resolves_choice() {
    let seen = Seen::default();
    let router = Router::new()
        .route(
            "/v1/responses",
            post(
                |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    *seen.auth.lock() = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    *seen.body.lock() = Some(body);
                    Json(json!({"output": [{"content": [{"type": "output_text", "text": "3"}]}]}))
                },
            ),
        )
        .with_state(seen.clone());
    let endpoint = spawn_judge(router).await;

    let var = "CRMFORGE_TEST_JUDGE_KEY";
    set_key(var, "sk-test");
    let client = EvaluatorClient::new(config_for(endpoint, var)).unwrap();
    let chosen = client.pick_best("ctx", &batch()).await;
    clear_key(var);

    assert_eq!(chosen.unwrap(), 3);
    assert_eq!(seen.auth.lock().as_deref(), Some("Bearer sk-test"));
    let body = seen.body.lock().clone().unwrap();
    assert_eq!(body["model"], "judge-test");
    assert!(
        body["input"][1]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("[3] msg C")
    );
}

#[tokio::test]
#[serial]
async fn test_client_missing_credential_fails_before_sending() {
    let var = "CRMFORGE_TEST_JUDGE_KEY_UNSET";
    clear_key(var);
    let client =
        EvaluatorClient::new(config_for("http://127.0.0.1:9/unused".to_string(), var)).unwrap();

    let err = client.pick_best("ctx", &batch()).await.unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, EvaluatorError::MissingCredential { .. }));
}

#[tokio::test]
#[serial]
async fn test_client_surfaces_http_status() {
    let router = Router::new().route(
        "/v1/responses",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let endpoint = spawn_judge(router).await;

    let var = "CRMFORGE_TEST_JUDGE_KEY";
    set_key(var, "sk-test");
    let client = EvaluatorClient::new(config_for(endpoint, var)).unwrap();
    let err = client.pick_best("ctx", &batch()).await.unwrap_err();
    clear_key(var);

    assert!(err.is_transport());
    match err {
        EvaluatorError::Http { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn test_client_times_out() {
    let router = Router::new().route(
        "/v1/responses",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"output_text": "0"}))
        }),
    );
    let endpoint = spawn_judge(router).await;

    let var = "CRMFORGE_TEST_JUDGE_KEY";
    set_key(var, "sk-test");
    let client = EvaluatorClient::new(config_for(endpoint, var)).unwrap();
    let err = client.pick_best("ctx", &batch()).await.unwrap_err();
    clear_key(var);

    assert!(matches!(err, EvaluatorError::Timeout { .. }));
}

#[tokio::test]
#[serial]
async fn test_client_out_of_range_choice_is_an_error() {
    let router = Router::new().route(
        "/v1/responses",
        post(|| async { Json(json!({"output_text": "9"})) }),
    );
    let endpoint = spawn_judge(router).await;

    let var = "CRMFORGE_TEST_JUDGE_KEY";
    set_key(var, "sk-test");
    let client = EvaluatorClient::new(config_for(endpoint, var)).unwrap();
    let err = client.pick_best("ctx", &batch()).await.unwrap_err();
    clear_key(var);

    assert!(matches!(err, EvaluatorError::UnresolvedChoice { choice: 9, .. }));
}

#[test]
#[serial]
fn test_config_from_env() {
    // SAFETY: Test code only, serialized with #[serial].
    unsafe {
        std::env::set_var("CRMFORGE_EVALUATOR_MODEL", " judge-x ");
        std::env::set_var("CRMFORGE_EVALUATOR_TIMEOUT_SECS", "5");
        std::env::remove_var("CRMFORGE_EVALUATOR_URL");
    }
    let config = EvaluatorConfig::from_env().unwrap();
    assert_eq!(config.model, "judge-x");
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.endpoint, DEFAULT_EVALUATOR_URL);
    assert_eq!(config.api_key_var, API_KEY_VAR);

    // SAFETY: Test code only, serialized with #[serial].
    unsafe { std::env::set_var("CRMFORGE_EVALUATOR_TIMEOUT_SECS", "soon") };
    assert!(EvaluatorConfig::from_env().is_err());

    // SAFETY: Test code only, serialized with #[serial].
    unsafe {
        std::env::remove_var("CRMFORGE_EVALUATOR_MODEL");
        std::env::remove_var("CRMFORGE_EVALUATOR_TIMEOUT_SECS");
    }
}
