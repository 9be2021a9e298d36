//! Shared helpers for integration tests: logging, a fake Jenkins server and
//! an API server on ephemeral ports

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use buildlink_core::api;
use buildlink_core::catalog::Registry;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

#[derive(Default)]
struct FakeJobs {
    /// job -> (build numbers, last completed)
    jobs: HashMap<String, (Vec<u64>, Option<u64>)>,
    /// (job, number) -> artifact relative paths
    artifacts: HashMap<(String, u64), Vec<String>>,
    failing: HashSet<String>,
}

#[derive(Clone)]
struct FakeState {
    base: String,
    jobs: Arc<Mutex<FakeJobs>>,
}

/// Minimal Jenkins JSON API serving canned jobs
pub struct FakeJenkins {
    pub base_url: String,
    state: FakeState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeJenkins {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{port}");
        let state = FakeState {
            base: base_url.clone(),
            jobs: Arc::new(Mutex::new(FakeJobs::default())),
        };

        let app = Router::new()
            .route("/job/:job/api/json", get(job_json))
            .route("/job/:job/:number/api/json", get(build_json))
            .with_state(state.clone());

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base_url,
            state,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn set_job(&self, job: &str, numbers: &[u64], last: Option<u64>) {
        self.state
            .jobs
            .lock()
            .unwrap()
            .jobs
            .insert(job.to_string(), (numbers.to_vec(), last));
    }

    pub fn set_artifacts(&self, job: &str, number: u64, paths: &[&str]) {
        self.state.jobs.lock().unwrap().artifacts.insert(
            (job.to_string(), number),
            paths.iter().map(|p| p.to_string()).collect(),
        );
    }

    pub fn fail_job(&self, job: &str) {
        self.state
            .jobs
            .lock()
            .unwrap()
            .failing
            .insert(job.to_string());
    }

    /// Download URL the client derives for an artifact
    pub fn artifact_url(&self, job: &str, number: u64, path: &str) -> String {
        format!("{}/job/{job}/{number}/artifact/{path}", self.base_url)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn job_json(State(state): State<FakeState>, Path(job): Path<String>) -> Response {
    let jobs = state.jobs.lock().unwrap();
    if jobs.failing.contains(&job) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let Some((numbers, last)) = jobs.jobs.get(&job) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let builds: Vec<_> = numbers
        .iter()
        .map(|n| json!({"number": n, "url": format!("{}/job/{job}/{n}/", state.base)}))
        .collect();
    let last = last.map(|n| json!({"number": n}));
    Json(json!({"builds": builds, "lastCompletedBuild": last})).into_response()
}

async fn build_json(
    State(state): State<FakeState>,
    Path((job, number)): Path<(String, u64)>,
) -> Response {
    let jobs = state.jobs.lock().unwrap();
    let artifacts: Vec<_> = jobs
        .artifacts
        .get(&(job, number))
        .map(|paths| {
            paths
                .iter()
                .map(|p| {
                    let file_name = p.rsplit('/').next().unwrap_or(p);
                    json!({"fileName": file_name, "relativePath": p})
                })
                .collect()
        })
        .unwrap_or_default();
    Json(json!({"artifacts": artifacts})).into_response()
}

/// The HTTP API over `registry`, listening on an ephemeral port
pub struct ApiServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub async fn start(registry: Arc<Registry>, prefix: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let router = api::router(registry, prefix);

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            api::serve(listener, router, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// HTTP client that reports redirects instead of following them
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Project schema with one target and two types
pub fn demo_schema(jenkins_base: &str) -> String {
    json!({
        "jenkins_base": jenkins_base,
        "display_name": "Demo",
        "targets": [{
            "identifier": "linux",
            "types": [
                {
                    "identifier": "release",
                    "job_name": "demo-job",
                    "description": "Stable builds",
                    "versions": [
                        {"identifier": "jar", "artifact_pattern": "demo-[0-9.]+\\.jar"},
                        {"identifier": "sources", "artifact_pattern": "demo-.*-sources\\.jar"}
                    ]
                },
                {
                    "identifier": "nightly",
                    "job_name": "demo-nightly",
                    "versions": [
                        {"identifier": "jar", "artifact_pattern": "demo-.*\\.jar"}
                    ]
                }
            ]
        }]
    })
    .to_string()
}
