//! Test server harness: the generation gateway and a stand-in judge endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crmforge::gateway::{HandlerState, create_router_with_state};
use crmforge::pipeline::MarketingPipeline;

use super::fixtures::{catalog_dir, test_config};

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub struct TestServer {
    pub addr: SocketAddr,
    pub pipeline: Arc<MarketingPipeline>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _data_dir: TempDir,
    _output_dir: TempDir,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

pub async fn wait_for_server_ready(addr: SocketAddr) -> Result<(), ServerStartupError> {
    let timeout = Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS);
    let interval = Duration::from_millis(STARTUP_POLL_INTERVAL_MS);
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => tokio::time::sleep(interval).await,
        }
    }
}

type Running = (SocketAddr, JoinHandle<()>, oneshot::Sender<()>);

async fn serve(router: Router) -> Result<Running, ServerStartupError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    wait_for_server_ready(addr).await?;
    Ok((addr, handle, shutdown_tx))
}

/// Spawns the gateway over a fixture catalog with stub generators and embedder.
pub async fn spawn_test_server() -> Result<TestServer, ServerStartupError> {
    let data_dir = catalog_dir();
    let output_dir =
        TempDir::new().map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
    let config = test_config(data_dir.path(), output_dir.path());

    let pipeline = Arc::new(
        MarketingPipeline::from_config(&config)
            .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?,
    );
    let app = create_router_with_state(HandlerState::new(Arc::clone(&pipeline)));
    let (addr, handle, shutdown_tx) = serve(app).await?;

    Ok(TestServer {
        addr,
        pipeline,
        _server_handle: handle,
        shutdown_tx: Some(shutdown_tx),
        _data_dir: data_dir,
        _output_dir: output_dir,
    })
}

/// Judge replies, one per request; the last one repeats once the script runs out.
#[derive(Clone)]
pub struct JudgeScript {
    replies: Arc<Vec<(StatusCode, Value)>>,
    pub calls: Arc<AtomicUsize>,
    pub bodies: Arc<parking_lot::Mutex<Vec<Value>>>,
}

impl JudgeScript {
    pub fn new(replies: Vec<(StatusCode, Value)>) -> Self {
        Self {
            replies: Arc::new(replies),
            calls: Arc::new(AtomicUsize::new(0)),
            bodies: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    /// Always answers with `choice` as plain output text.
    pub fn always(choice: &str) -> Self {
        Self::new(vec![(StatusCode::OK, json!({"output_text": choice}))])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn judge_handler(
    State(script): State<JudgeScript>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let n = script.calls.fetch_add(1, Ordering::SeqCst);
    script.bodies.lock().push(body);
    let (status, reply) = script
        .replies
        .get(n)
        .or_else(|| script.replies.last())
        .cloned()
        .unwrap_or((StatusCode::OK, json!({"output_text": "0"})));
    (status, Json(reply))
}

pub struct JudgeServer {
    pub endpoint: String,
    pub script: JudgeScript,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Drop for JudgeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawns a responses-style judge endpoint on an ephemeral port.
pub async fn spawn_judge(script: JudgeScript) -> Result<JudgeServer, ServerStartupError> {
    let router = Router::new()
        .route("/v1/responses", post(judge_handler))
        .with_state(script.clone());
    let (addr, handle, shutdown_tx) = serve(router).await?;

    Ok(JudgeServer {
        endpoint: format!("http://{addr}/v1/responses"),
        script,
        _server_handle: handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
