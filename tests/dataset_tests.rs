//! Preference dataset runs over the real pipeline and an HTTP judge.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{Value, json};
use serial_test::serial;
use tempfile::TempDir;

use crmforge::evaluator::{EvaluatorClient, EvaluatorConfig, Judge};
use crmforge::invoker::{PipelineCallable, Typed};
use crmforge::pipeline::{MarketingPipeline, PreferenceDatasetBuilder, load_rows};
use crmforge::preference::PreferenceStore;

use common::fixtures::{catalog_dir, test_config};
use common::harness::{JudgeScript, spawn_judge};

const KEY_VAR: &str = "CRMFORGE_IT_JUDGE_KEY";

fn set_key() {
    // SAFETY: Test code only, serialized with #[serial].
    unsafe { std::env::set_var(KEY_VAR, "sk-integration") };
}

fn clear_key() {
    // SAFETY: Test code only, serialized with #[serial].
    unsafe { std::env::remove_var(KEY_VAR) };
}

fn judge_for(endpoint: &str) -> Arc<dyn Judge> {
    let config = EvaluatorConfig {
        endpoint: endpoint.to_string(),
        model: "judge-it".to_string(),
        timeout: Duration::from_secs(5),
        api_key_var: KEY_VAR.to_string(),
    };
    Arc::new(EvaluatorClient::new(config).expect("client builds"))
}

fn pipeline_target(data_dir: &TempDir, output_dir: &TempDir) -> Arc<dyn PipelineCallable> {
    let config = test_config(data_dir.path(), output_dir.path());
    let pipeline = MarketingPipeline::from_config(&config).expect("pipeline builds");
    Arc::new(Typed(Arc::new(pipeline)))
}

fn write_rows_csv(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("rows.csv");
    std::fs::write(
        &path,
        "persona,brand,product,stage_index,style_index,is_event\n\
         0,Laneige,Water Bank,2,0,yes\n\
         ,Laneige,Water Bank,2,0,no\n\
         트렌드 세터,Sulwhasoo,First Care,0,1,0\n",
    )
    .unwrap();
    path
}

#[tokio::test]
#[serial]
async fn test_dataset_run_end_to_end() {
    set_key();
    let data_dir = catalog_dir();
    let work = TempDir::new().unwrap();
    let judge = spawn_judge(JudgeScript::always("1")).await.unwrap();

    let rows = load_rows(&write_rows_csv(&work)).unwrap();
    assert_eq!(rows.len(), 2, "the row without a persona is skipped");
    assert_eq!(rows[1].index, 2);

    let store = PreferenceStore::new(work.path().join("out").join("dpo.json"));
    let builder = PreferenceDatasetBuilder::new(
        pipeline_target(&data_dir, &work),
        judge_for(&judge.endpoint),
    );
    let report = builder.run(&rows, &store, None).await.unwrap();

    assert_eq!(report.rows_seen, 2);
    assert_eq!(report.rows_succeeded, 2);
    assert_eq!(report.records_added, 6);
    assert_eq!(report.total_records, 6);
    assert!(report.failures.is_empty());
    assert_eq!(judge.script.call_count(), 2);

    let saved = store.load().await.unwrap();
    assert_eq!(saved.len(), 6);
    for record in &saved {
        let prompt = record["prompt"].as_str().unwrap();
        assert!(prompt.contains("\"highlights\""));
        assert_ne!(record["chosen"], record["rejected"]);
    }
    assert!(saved[0]["chosen"].as_str().unwrap().contains("#2"));

    let bodies = judge.script.bodies.lock();
    assert_eq!(bodies[0]["model"], "judge-it");
    let user_text = bodies[0]["input"][1]["content"][0]["text"].as_str().unwrap();
    assert!(user_text.contains("[0]"));
    assert!(user_text.contains("[3]"));
    drop(bodies);

    clear_key();
}

#[tokio::test]
#[serial]
async fn test_dataset_run_skips_rows_the_judge_fails() {
    set_key();
    let data_dir = catalog_dir();
    let work = TempDir::new().unwrap();
    let judge = spawn_judge(JudgeScript::new(vec![
        (StatusCode::TOO_MANY_REQUESTS, json!({"error": "slow down"})),
        (StatusCode::OK, json!({"output": [{"content": [{"type": "output_text", "text": "선택: 0"}]}]})),
    ]))
    .await
    .unwrap();

    let rows = load_rows(&write_rows_csv(&work)).unwrap();
    let store = PreferenceStore::new(work.path().join("dpo.json"));
    let builder = PreferenceDatasetBuilder::new(
        pipeline_target(&data_dir, &work),
        judge_for(&judge.endpoint),
    )
    .with_num_candidates(3);
    let report = builder.run(&rows, &store, None).await.unwrap();

    assert_eq!(report.rows_seen, 2);
    assert_eq!(report.rows_succeeded, 1);
    assert_eq!(report.records_added, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 0);
    assert_eq!(report.failures[0].stage, "evaluator");

    clear_key();
}

#[tokio::test]
#[serial]
async fn test_dataset_run_without_credential_fails_rows_not_run() {
    clear_key();
    let data_dir = catalog_dir();
    let work = TempDir::new().unwrap();
    let judge = spawn_judge(JudgeScript::always("0")).await.unwrap();

    let rows = load_rows(&write_rows_csv(&work)).unwrap();
    let store = PreferenceStore::new(work.path().join("dpo.json"));
    let builder = PreferenceDatasetBuilder::new(
        pipeline_target(&data_dir, &work),
        judge_for(&judge.endpoint),
    );
    let report = builder.run(&rows, &store, Some(1)).await.unwrap();

    assert_eq!(report.rows_seen, 1);
    assert_eq!(report.rows_succeeded, 0);
    assert_eq!(report.failures[0].stage, "evaluator");
    assert_eq!(judge.script.call_count(), 0);
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_dataset_run_appends_to_existing_store() {
    set_key();
    let data_dir = catalog_dir();
    let work = TempDir::new().unwrap();
    let judge = spawn_judge(JudgeScript::always("0")).await.unwrap();

    let out = work.path().join("dpo.json");
    let existing = json!([{"prompt": "p", "chosen": "a", "rejected": "b"}]);
    std::fs::write(&out, serde_json::to_vec(&existing).unwrap()).unwrap();

    let rows = load_rows(&write_rows_csv(&work)).unwrap();
    let store = PreferenceStore::new(&out);
    let builder = PreferenceDatasetBuilder::new(
        pipeline_target(&data_dir, &work),
        judge_for(&judge.endpoint),
    )
    .with_num_candidates(2);
    let report = builder.run(&rows, &store, Some(1)).await.unwrap();

    assert_eq!(report.records_added, 1);
    assert_eq!(report.total_records, 2);

    let saved: Value = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(saved[0]["prompt"], "p");
    assert_eq!(saved.as_array().unwrap().len(), 2);

    clear_key();
}
