//! HTTP surface for the published dataset
//!
//! Serves the published pages as static files under `/shows` and, when
//! enabled, exposes `GET /scrape` to run one crawl cycle on demand. Missing
//! files and unknown routes share the same JSON 404. The
//! trigger always answers with the cursor position, whether the cycle
//! succeeded or not.

use crate::catalog::CatalogSource;
use crate::crawler::Harvester;
use axum::extract::{OriginalUri, State};
use axum::handler::HandlerWithoutStateExt;
use axum::http::{Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Builds the router
///
/// # Arguments
///
/// * `harvester` - The harvester the manual trigger runs cycles on
/// * `serve_root` - Directory served under `/shows`
/// * `debug_trigger` - Whether to mount `GET /scrape`
pub fn router<C>(harvester: Arc<Harvester<C>>, serve_root: &Path, debug_trigger: bool) -> Router
where
    C: CatalogSource + 'static,
{
    let files = ServeDir::new(serve_root).not_found_service(not_found.into_service());
    let mut router = Router::new().nest_service("/shows", files);

    if debug_trigger {
        router = router.route("/scrape", get(scrape::<C>));
    }

    router
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(harvester)
}

/// Serves `router` on `listener` until `shutdown` resolves
pub async fn serve<S>(listener: TcpListener, router: Router, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Server is running on http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn scrape<C>(State(harvester): State<Arc<Harvester<C>>>) -> (StatusCode, Json<Value>)
where
    C: CatalogSource + 'static,
{
    match harvester.run_cycle().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "message": "Scrape successful",
                "status": 200,
                "lastScrapedPage": outcome.last_scraped_page(),
            })),
        ),
        Err(e) => {
            tracing::error!("Manual scrape failed: {}", e);
            let cursor = harvester.checkpoint().await.last_scraped_page;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Scrape failed",
                    "status": 500,
                    "error": e.to_string(),
                    "lastScrapedPage": cursor,
                })),
            )
        }
    }
}

async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "message": format!("Cannot {} {}", method.as_str().to_uppercase(), uri.path()),
            "status": 404,
        })),
    )
}
