//! Integration tests for the local model backend and the summarization
//! workflow running on top of it.
//!
//! A real axum server on a random port stands in for an Ollama-compatible
//! model server.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shipnote::ai::local::LocalModel;
use shipnote::ai::{
    AvailabilityProber, AvailabilityStatus, ConfirmationStatus, SessionConfig,
    SummarizationResult, SummarizationWorkflow, SummarizerCapability, SummaryKey,
};
use shipnote::store::{FileStore, KvStore};

const MODEL: &str = "tiny:1b";

#[derive(Default)]
struct FakeModelServer {
    installed: Vec<String>,
    fail_pull: bool,
    pulls: usize,
    /// Bodies of `/api/generate` requests that carried a prompt.
    generations: Vec<Value>,
    unloads: usize,
}

type Shared = Arc<Mutex<FakeModelServer>>;

async fn list_tags(State(state): State<Shared>) -> Json<Value> {
    let models: Vec<Value> = state
        .lock()
        .unwrap()
        .installed
        .iter()
        .map(|name| json!({"name": name, "model": name, "size": 1}))
        .collect();
    Json(json!({ "models": models }))
}

async fn pull(State(state): State<Shared>, Json(body): Json<Value>) -> String {
    let mut server = state.lock().unwrap();
    server.pulls += 1;
    if server.fail_pull {
        return "{\"status\":\"pulling manifest\"}\n{\"error\":\"pull model manifest: file does not exist\"}\n"
            .to_string();
    }
    let name = body["model"].as_str().unwrap_or_default().to_string();
    server.installed.push(name);
    [
        r#"{"status":"pulling manifest"}"#,
        r#"{"status":"pulling 1a2b","digest":"sha256:1a2b","total":1000,"completed":0}"#,
        r#"{"status":"pulling 1a2b","digest":"sha256:1a2b","total":1000,"completed":550}"#,
        r#"{"status":"pulling 1a2b","digest":"sha256:1a2b","total":1000,"completed":1000}"#,
        r#"{"status":"verifying sha256 digest"}"#,
        r#"{"status":"success"}"#,
    ]
    .join("\n")
}

async fn generate(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut server = state.lock().unwrap();
    if body.get("prompt").is_none() && body["keep_alive"] == json!(0) {
        server.unloads += 1;
        return Json(json!({"model": body["model"], "done": true, "done_reason": "unload"}));
    }
    server.generations.push(body);
    let n = server.generations.len();
    Json(json!({
        "model": MODEL,
        "response": format!("  Summary number {n}.\n"),
        "done": true
    }))
}

/// Helper: spawn the fake model server on port 0 (random available port).
async fn spawn_fake_model_server(installed: &[&str]) -> (Shared, String) {
    let state: Shared = Arc::new(Mutex::new(FakeModelServer {
        installed: installed.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }));
    let app = Router::new()
        .route("/api/tags", get(list_tags))
        .route("/api/pull", post(pull))
        .route("/api/generate", post(generate))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("http://{addr}"))
}

fn commits(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("feat: change number {i}")).collect()
}

// ── Capability ───────────────────────────────────────────────────────

#[tokio::test]
async fn availability_reflects_installed_models() {
    let (state, base) = spawn_fake_model_server(&[]).await;
    let model = Arc::new(LocalModel::new(&base, MODEL).unwrap());
    assert_eq!(model.availability().await.unwrap(), "downloadable");

    state.lock().unwrap().installed.push(MODEL.to_string());
    assert_eq!(model.availability().await.unwrap(), "available");

    let prober = AvailabilityProber::new(Some(model));
    assert_eq!(prober.probe().await, AvailabilityStatus::Ready);
}

#[tokio::test]
async fn untagged_model_name_matches_latest() {
    let (_state, base) = spawn_fake_model_server(&["llama3:latest"]).await;
    let model = LocalModel::new(&base, "llama3").unwrap();
    assert_eq!(model.availability().await.unwrap(), "available");
}

#[tokio::test]
async fn unreachable_server_is_unsupported() {
    // Bind and drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let model = Arc::new(LocalModel::new(format!("http://{addr}"), MODEL).unwrap());
    let prober = AvailabilityProber::new(Some(model));
    match prober.probe().await {
        AvailabilityStatus::Unsupported(reason) => {
            assert!(reason.contains("unreachable"), "{reason}")
        }
        other => panic!("expected unsupported, got {other:?}"),
    }
}

#[tokio::test]
async fn session_creation_pulls_missing_model() {
    let (state, base) = spawn_fake_model_server(&[]).await;
    let model = LocalModel::new(&base, MODEL).unwrap();

    let config = SessionConfig::default();
    let session = model.create_session(&config).await.unwrap();
    assert_eq!(state.lock().unwrap().pulls, 1);
    assert_eq!(model.availability().await.unwrap(), "available");

    let text = session
        .summarize("feat: one\nfix: two", Some("This is project repository for acme/app."))
        .await
        .unwrap();
    assert_eq!(text, "Summary number 1.");

    {
        let server = state.lock().unwrap();
        let body = &server.generations[0];
        assert_eq!(body["model"], MODEL);
        assert_eq!(body["prompt"], "feat: one\nfix: two");
        assert_eq!(body["stream"], false);
        let system = body["system"].as_str().unwrap();
        assert!(system.contains("acme/app"));
        assert!(system.contains("TL;DR"));
    }

    session.destroy().await.unwrap();
    assert_eq!(state.lock().unwrap().unloads, 1);
}

#[tokio::test]
async fn installed_model_is_not_pulled_again() {
    let (state, base) = spawn_fake_model_server(&[MODEL]).await;
    let model = LocalModel::new(&base, MODEL).unwrap();
    model
        .create_session(&SessionConfig::default())
        .await
        .unwrap();
    assert_eq!(state.lock().unwrap().pulls, 0);
}

#[tokio::test]
async fn pull_error_fails_session_creation() {
    let (state, base) = spawn_fake_model_server(&[]).await;
    state.lock().unwrap().fail_pull = true;
    let model = LocalModel::new(&base, MODEL).unwrap();

    let err = model
        .create_session(&SessionConfig::default())
        .await
        .err()
        .unwrap();
    assert!(err.contains("file does not exist"), "{err}");
    // The pull is over, so the model is reported as downloadable again.
    assert_eq!(model.availability().await.unwrap(), "downloadable");
}

// ── Workflow end to end ──────────────────────────────────────────────

#[tokio::test]
async fn workflow_asks_downloads_summarizes_and_caches() {
    let (state, base) = spawn_fake_model_server(&[]).await;
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open_in(dir.path()).unwrap());
    let model = Arc::new(LocalModel::new(&base, MODEL).unwrap());
    let workflow = SummarizationWorkflow::with_capability(store.clone(), model);
    let key = SummaryKey::new("acme/app", "v1.1.0", "v1.2.0");

    let first = workflow.summarize(&commits(3), &key, false).await.unwrap();
    assert_eq!(
        first,
        SummarizationResult::NeedsConfirmation(ConfirmationStatus::BeforeDownload)
    );
    assert_eq!(state.lock().unwrap().pulls, 0);

    let second = workflow.summarize(&commits(3), &key, true).await.unwrap();
    assert_eq!(
        second,
        SummarizationResult::Success {
            text: "Summary number 1.".into(),
            from_cache: false
        }
    );
    assert_eq!(state.lock().unwrap().pulls, 1);

    let third = workflow.summarize(&commits(3), &key, false).await.unwrap();
    assert_eq!(
        third,
        SummarizationResult::Success {
            text: "Summary number 1.".into(),
            from_cache: true
        }
    );
    assert_eq!(state.lock().unwrap().generations.len(), 1);

    // The cache survives a restart through the file store.
    let reopened: Arc<dyn KvStore> = Arc::new(FileStore::open_in(dir.path()).unwrap());
    let cache = shipnote::ai::SummaryCache::new(reopened);
    assert_eq!(
        cache.get("acme/app", "v1.1.0", "v1.2.0").as_deref(),
        Some("Summary number 1.")
    );

    workflow.cleanup().await;
    assert_eq!(state.lock().unwrap().unloads, 1);
}

#[tokio::test]
async fn workflow_chunks_long_ranges() {
    let (state, base) = spawn_fake_model_server(&[MODEL]).await;
    let model = Arc::new(LocalModel::new(&base, MODEL).unwrap());
    let workflow = SummarizationWorkflow::with_capability(
        Arc::new(shipnote::store::MemoryStore::new()),
        model,
    );

    let result = workflow
        .summarize(&commits(25), &SummaryKey::uncached(), false)
        .await
        .unwrap();
    // Two chunk passes, then one combining pass.
    assert_eq!(
        result,
        SummarizationResult::Success {
            text: "Summary number 3.".into(),
            from_cache: false
        }
    );

    let server = state.lock().unwrap();
    assert_eq!(server.generations.len(), 3);
    assert_eq!(
        server.generations[2]["prompt"],
        "Summary number 1. Summary number 2."
    );
    assert!(
        server.generations[2]["system"]
            .as_str()
            .unwrap()
            .contains("multiple commit summaries")
    );
}
