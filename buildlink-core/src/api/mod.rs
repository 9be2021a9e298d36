//! REST API over the catalog
//!
//! ```text
//! {prefix}                                              registry summary
//! {prefix}/{project}[/{target}[/{type}[/{build}[/{version}]]]]
//! {prefix}/{project}/{target}/{type}/{build}/{version}/download   307
//! ```
//!
//! Every route answers any HTTP method the same way.

mod handlers;

use axum::routing::{any, get};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::catalog::Registry;

pub use handlers::{respond, DOWNLOAD_SEGMENT};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

/// Build the router with the catalog mounted under `prefix`
///
/// `prefix` is `/` or a path without a trailing slash, e.g. `/api`.
pub fn router(registry: Arc<Registry>, prefix: &str) -> Router {
    let state = AppState { registry };
    let (root, nested) = if prefix == "/" {
        ("/".to_string(), "/*path".to_string())
    } else {
        (prefix.to_string(), format!("{prefix}/*path"))
    };

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(&root, any(handlers::catalog_root))
        .route(&nested, any(handlers::catalog_path));
    if root != "/" {
        // `{prefix}/` has an empty wildcard, which `/*path` does not match
        router = router.route(&format!("{root}/"), any(handlers::catalog_root));
    }
    router.with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves
///
/// Requests in flight when `shutdown` fires are completed before returning.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("API listening on http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
