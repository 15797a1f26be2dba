//! Interface web: uma página HTML e uma API JSON sobre as operações de `Lottery`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sorteio_db::LotteryError;
use sorteio_db::models::Variant;

use crate::lottery::Lottery;

const INDEX_HTML: &str = include_str!("../assets/index.html");
const DEFAULT_TOP: usize = 10;
const DEFAULT_LAST: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Lottery(#[from] LotteryError),

    #[error("erro interno: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Lottery(LotteryError::InvalidParameter(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_PARAMETER")
            }
            ApiError::Lottery(LotteryError::SourceUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SOURCE_UNAVAILABLE")
            }
            ApiError::Lottery(LotteryError::GenerationFailed(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "GENERATION_FAILED")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            warn!(code, error = %self, "requisição falhou");
        }

        let body = serde_json::json!({
            "success": false,
            "error": ErrorBody {
                code,
                message: self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Uma loteria por variante; cada uma atende uma requisição por vez.
#[derive(Clone)]
pub struct AppState {
    lotteries: Arc<HashMap<Variant, Arc<Mutex<Lottery>>>>,
}

impl AppState {
    pub fn new(lotteries: Vec<Lottery>) -> Self {
        let map = lotteries
            .into_iter()
            .map(|lottery| (lottery.variant(), Arc::new(Mutex::new(lottery))))
            .collect();
        Self {
            lotteries: Arc::new(map),
        }
    }

    fn lottery(&self, slug: &str) -> Result<Arc<Mutex<Lottery>>, ApiError> {
        let variant: Variant = slug.parse()?;
        self.lotteries.get(&variant).cloned().ok_or_else(|| {
            ApiError::Lottery(LotteryError::InvalidParameter(format!(
                "{} não está habilitada neste servidor",
                variant
            )))
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateQuery {
    count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TopQuery {
    top: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LastQuery {
    last: Option<usize>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/:variant/generate", get(generate))
        .route("/api/:variant/suggest", get(suggest))
        .route("/api/:variant/frequent", get(frequent))
        .route("/api/:variant/month", get(frequent_this_month))
        .route("/api/:variant/recent", get(recent))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("servidor disponível em http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

/// Executa a operação fora do executor assíncrono: carregar histórico faz I/O bloqueante.
async fn run<T, F>(state: &AppState, slug: &str, op: F) -> Result<Json<serde_json::Value>, ApiError>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&mut Lottery) -> Result<T, LotteryError> + Send + 'static,
{
    let lottery = state.lottery(slug)?;
    let data = tokio::task::spawn_blocking(move || {
        let mut guard = lottery
            .lock()
            .map_err(|_| ApiError::Internal("estado da loteria corrompido".to_string()))?;
        op(&mut guard).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": data,
    })))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sorteio",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn generate(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run(&state, &slug, move |lottery| {
        let count = query
            .count
            .unwrap_or_else(|| *lottery.variant().pick_range().start());
        lottery.generate(count)
    })
    .await
}

async fn suggest(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run(&state, &slug, |lottery| lottery.suggest()).await
}

async fn frequent(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<TopQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let top = query.top.unwrap_or(DEFAULT_TOP);
    run(&state, &slug, move |lottery| lottery.most_frequent(top)).await
}

async fn frequent_this_month(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<TopQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let top = query.top.unwrap_or(DEFAULT_TOP);
    run(&state, &slug, move |lottery| lottery.most_frequent_this_month(top)).await
}

async fn recent(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LastQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let last = query.last.unwrap_or(DEFAULT_LAST);
    run(&state, &slug, move |lottery| lottery.most_recent(last)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::lottery::tests::{mega_draws, offline_lottery};

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn router(dir: &std::path::Path) -> Router {
        let lottery = offline_lottery(dir, Variant::MegaSena, &mega_draws());
        build_router(AppState::new(vec![lottery]))
    }

    #[tokio::test]
    async fn test_generate_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(router(dir.path()), "/api/mega-sena/generate?count=8").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["numbers"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_generate_invalid_count() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(router(dir.path()), "/api/mega-sena/generate?count=20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_unknown_and_disabled_variants() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get_json(router(dir.path()), "/api/quina/frequent").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_json(router(dir.path()), "/api/lotofacil/frequent").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rankings_and_recent() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(router(dir.path()), "/api/mega-sena/frequent?top=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["number"], 1);
        assert_eq!(body["data"][0]["rank"], 1);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let (_, body) = get_json(router(dir.path()), "/api/mega-sena/recent?last=1").await;
        assert_eq!(body["data"][0]["draw_id"], 4);
        assert_eq!(body["data"][0]["date"], "2024-04-06");
    }

    #[tokio::test]
    async fn test_empty_history_is_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let lottery = offline_lottery(dir.path(), Variant::MegaSena, &[]);
        let router = build_router(AppState::new(vec![lottery]));
        let (status, body) = get_json(router, "/api/mega-sena/generate").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "GENERATION_FAILED");
    }

    #[test]
    fn test_error_into_response() {
        let err = ApiError::Lottery(LotteryError::InvalidParameter("x".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        let err = ApiError::Internal("x".to_string());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
