/// HTTP routes over a shared `MatchStream`.
///
/// The server keeps no per-match state: everything a minute needs arrives
/// in the query string, so any instance can answer any request.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use markov_match::core::pipeline::{MatchStream, StreamError};
use markov_match::core::request::MinuteRequest;
use markov_match::schema::summary::MinuteResponse;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),
}

#[derive(Clone)]
struct AppState {
    stream: Arc<MatchStream>,
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl From<StreamError> for HttpApiError {
    fn from(err: StreamError) -> Self {
        let status = match &err {
            StreamError::RegulationEnded { .. } => StatusCode::CONFLICT,
            other if other.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(%err, "minute.failed");
        } else {
            tracing::debug!(code = err.code(), %err, "minute.rejected");
        }
        Self {
            status,
            error: ApiError {
                error: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

pub async fn serve(addr: SocketAddr, stream: MatchStream) -> Result<(), ServerError> {
    let app = router(AppState {
        stream: Arc::new(stream),
    });

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/match/minute", get(next_minute))
        .route("/healthz", get(health))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET,OPTIONS"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("*"),
    );
}

async fn next_minute(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<MinuteResponse>, HttpApiError> {
    let request = MinuteRequest::from_query(&params)?;
    let response = state.stream.next_minute(&request)?;
    tracing::debug!(
        seed = request.seed,
        minute = response.minute_summary.minute,
        events = response.minute_summary.events.len(),
        "minute.served"
    );
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    model_version: u8,
    regulation_minutes: u16,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_version: state.stream.model_version(),
        regulation_minutes: state.stream.regulation_minutes(),
    })
}
