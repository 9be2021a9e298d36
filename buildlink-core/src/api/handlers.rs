use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use super::AppState;
use crate::catalog::{CatalogNode, Envelope, Registry, Resolution, Status, UnknownValue};

/// Trailing segment that turns a version lookup into a redirect
pub const DOWNLOAD_SEGMENT: &str = "download";

/// Path length of `{project}/{target}/{type}/{build}/{version}/download`
const DOWNLOAD_DEPTH: usize = 6;

#[derive(Serialize)]
struct NotFound {
    status: Status,
}

pub(super) async fn health() -> &'static str {
    "ok"
}

pub(super) async fn catalog_root(State(state): State<AppState>) -> Response {
    respond::<&str>(&state.registry, &[])
}

pub(super) async fn catalog_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    respond(&state.registry, &segments)
}

/// Answer a catalog request for already-split path segments
pub fn respond<S: AsRef<str>>(registry: &Registry, segments: &[S]) -> Response {
    debug!(
        path = %segments.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join("/"),
        "Catalog request"
    );

    if segments.len() == DOWNLOAD_DEPTH
        && segments[DOWNLOAD_DEPTH - 1].as_ref() == DOWNLOAD_SEGMENT
    {
        return download(registry, &segments[..DOWNLOAD_DEPTH - 1]);
    }

    match registry.resolve(segments) {
        Resolution::Found(node) => Json(Envelope::success(node.summary())).into_response(),
        Resolution::NotFound { kind, value } => {
            Json(UnknownValue::new(kind, value)).into_response()
        }
        Resolution::TooDeep => not_found(),
    }
}

fn download<S: AsRef<str>>(registry: &Registry, segments: &[S]) -> Response {
    match registry.resolve(segments) {
        Resolution::Found(CatalogNode::Version(version)) => {
            debug!(file = %version.file_name, "Redirecting to {}", version.download_url);
            Redirect::temporary(&version.download_url).into_response()
        }
        Resolution::NotFound { kind, value } => {
            (StatusCode::NOT_FOUND, Json(UnknownValue::new(kind, value))).into_response()
        }
        _ => not_found(),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(NotFound {
            status: Status::NotFound,
        }),
    )
        .into_response()
}
