//! HTTP API for ingestion, querying and the question-answering proxy.
//!
//! Endpoints:
//! - `POST /argo/ingest-url` — ingest a profile file or archive directory URL
//! - `POST /argo/ingest-file` — ingest an uploaded profile file (multipart)
//! - `GET|POST /sql-query` — per-profile mean temperature/salinity/pressure
//! - `POST /ask` — pass-through to the external question-answering service
//! - `GET /health`

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Multipart, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use argo_common::ArgoError;
use ingestion::Ingester;
use storage::{ArgoStore, ProfileFilter, ProfileSummary};

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IngestUrlRequest {
    pub argo_url: String,
}

#[derive(Debug, Serialize)]
pub struct IngestUrlResponse {
    pub message: String,
    pub url_processed: String,
    pub total_records_saved: u64,
}

#[derive(Debug, Serialize)]
pub struct IngestFileResponse {
    pub message: String,
    pub filename: String,
    pub total_records_saved: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub ocean_name: Option<String>,
    /// YYYY-MM-DD
    pub start_date: Option<String>,
    /// YYYY-MM-DD
    pub end_date: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub count: usize,
    pub results: Vec<ProfileSummary>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

// ============================================================================
// Shared State
// ============================================================================

pub struct AppState {
    pub ingester: Arc<Ingester>,
    pub store: Arc<ArgoStore>,
    pub rag_url: String,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(ingester: Arc<Ingester>, store: Arc<ArgoStore>, rag_url: String) -> Self {
        Self {
            ingester,
            store,
            rag_url,
            client: reqwest::Client::new(),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/argo/ingest-url", post(ingest_url_handler))
        .route("/argo/ingest-file", post(ingest_file_handler))
        .route("/sql-query", get(query_get_handler).post(query_post_handler))
        .route("/ask", post(ask_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(Extension(state))
}

/// Bind and serve until shutdown.
pub async fn run_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /argo/ingest-url - ingest a profile file or directory URL.
async fn ingest_url_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<IngestUrlRequest>,
) -> Response {
    let url = request.argo_url.trim().to_string();
    if url.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "The 'argo_url' field is required.");
    }
    if !is_valid_http_url(&url) {
        return error_json(StatusCode::BAD_REQUEST, "The provided URL is not valid.");
    }

    match state.ingester.ingest_from_url(&url, None).await {
        Ok(total_records_saved) => Json(IngestUrlResponse {
            message: "Data ingestion completed. Ocean names have been stored.".to_string(),
            url_processed: url,
            total_records_saved,
        })
        .into_response(),
        Err(e) => argo_error_response(e),
    }
}

/// POST /argo/ingest-file - ingest an uploaded profile file.
async fn ingest_file_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.nc")
                    .to_string();
                let data = match field.bytes().await {
                    Ok(data) => data,
                    Err(e) => {
                        return error_json(
                            StatusCode::BAD_REQUEST,
                            &format!("Failed to read uploaded file: {}", e),
                        );
                    }
                };

                info!(filename = %filename, size = data.len(), "Received file upload");

                return match state.ingester.ingest_from_upload(data, &filename).await {
                    Ok(total_records_saved) => Json(IngestFileResponse {
                        message: "File ingestion completed. Ocean names have been stored."
                            .to_string(),
                        filename,
                        total_records_saved,
                    })
                    .into_response(),
                    Err(e) => argo_error_response(e),
                };
            }
            Ok(Some(_)) => continue,
            Ok(None) => {
                return error_json(StatusCode::BAD_REQUEST, "No file provided in request.");
            }
            Err(e) => {
                return error_json(
                    StatusCode::BAD_REQUEST,
                    &format!("Malformed multipart request: {}", e),
                );
            }
        }
    }
}

/// GET /sql-query - query profile summaries via query parameters.
async fn query_get_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SummaryQuery>,
) -> Response {
    run_summary_query(&state, params).await
}

/// POST /sql-query - query profile summaries via JSON body.
async fn query_post_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(params): Json<SummaryQuery>,
) -> Response {
    run_summary_query(&state, params).await
}

async fn run_summary_query(state: &AppState, params: SummaryQuery) -> Response {
    let filter = match build_filter(&params) {
        Ok(filter) => filter,
        Err(message) => return error_json(StatusCode::BAD_REQUEST, &message),
    };

    match state.store.profile_summaries(&filter).await {
        Ok(results) => Json(SummaryResponse {
            count: results.len(),
            results,
        })
        .into_response(),
        Err(e) => argo_error_response(e),
    }
}

/// POST /ask - forward a question to the external answering service.
async fn ask_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Response {
    let result = state
        .client
        .post(&state.rag_url)
        .timeout(Duration::from_secs(30))
        .json(&serde_json::json!({ "query": request.query }))
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            error!(url = %state.rag_url, "Question-answering request timed out");
            return error_json(
                StatusCode::BAD_GATEWAY,
                "Request to the answering service timed out.",
            );
        }
        Err(e) => {
            error!(url = %state.rag_url, error = %e, "Question-answering request failed");
            return error_json(
                StatusCode::BAD_GATEWAY,
                &format!("Request to the answering service failed: {}", e),
            );
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        error!(status = %status, "Answering service returned an error status");
        return error_json(
            StatusCode::BAD_GATEWAY,
            &format!("Answering service returned status {}", status),
        );
    }

    match response.json::<serde_json::Value>().await {
        Ok(body) => match body.get("answer") {
            Some(answer) => Json(serde_json::json!({ "answer": answer })).into_response(),
            None => {
                error!("Answering service response had no 'answer' field");
                error_json(
                    StatusCode::BAD_GATEWAY,
                    "Answering service returned JSON without an 'answer' field.",
                )
            }
        },
        Err(e) => {
            error!(error = %e, "Answering service returned invalid JSON");
            error_json(StatusCode::BAD_GATEWAY, "Answering service returned invalid JSON.")
        }
    }
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Helpers
// ============================================================================

fn is_valid_http_url(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Translate API parameters into a store filter. Dates are `YYYY-MM-DD`;
/// a `year` constraint intersects with any explicit date bounds.
fn build_filter(params: &SummaryQuery) -> Result<ProfileFilter, String> {
    let mut start = match &params.start_date {
        Some(s) => Some(parse_day_start(s).ok_or_else(|| {
            format!("Invalid start_date format, expected YYYY-MM-DD: {}", s)
        })?),
        None => None,
    };
    let mut end = match &params.end_date {
        Some(s) => Some(parse_day_end(s).ok_or_else(|| {
            format!("Invalid end_date format, expected YYYY-MM-DD: {}", s)
        })?),
        None => None,
    };

    if let Some(year) = params.year {
        let year_start = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| format!("Invalid year: {}", year))?;
        let year_end = Utc
            .with_ymd_and_hms(year, 12, 31, 23, 59, 59)
            .single()
            .ok_or_else(|| format!("Invalid year: {}", year))?;
        start = Some(start.map_or(year_start, |s| s.max(year_start)));
        end = Some(end.map_or(year_end, |e| e.min(year_end)));
    }

    Ok(ProfileFilter {
        min_lat: params.min_lat.unwrap_or(-90.0),
        max_lat: params.max_lat.unwrap_or(90.0),
        ocean_name: params.ocean_name.clone().filter(|s| !s.is_empty()),
        start_date: start,
        end_date: end,
    })
}

fn parse_day_start(s: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn parse_day_end(s: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59)?))
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn argo_error_response(e: ArgoError) -> Response {
    let status =
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error!(error = %e, "Request failed");
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(is_valid_http_url("https://data.example.org/dac/"));
        assert!(is_valid_http_url("http://data.example.org/file.nc"));
        assert!(!is_valid_http_url("ftp://data.example.org/"));
        assert!(!is_valid_http_url("not a url"));
        assert!(!is_valid_http_url(""));
    }

    #[test]
    fn test_build_filter_defaults() {
        let filter = build_filter(&SummaryQuery::default()).unwrap();
        assert_eq!(filter.min_lat, -90.0);
        assert_eq!(filter.max_lat, 90.0);
        assert!(filter.start_date.is_none());
        assert!(filter.end_date.is_none());
    }

    #[test]
    fn test_build_filter_dates() {
        let params = SummaryQuery {
            start_date: Some("2023-01-15".to_string()),
            end_date: Some("2023-06-30".to_string()),
            ..Default::default()
        };
        let filter = build_filter(&params).unwrap();
        assert_eq!(
            filter.start_date.unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            filter.end_date.unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 30, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn test_build_filter_rejects_bad_dates() {
        let params = SummaryQuery {
            start_date: Some("15/01/2023".to_string()),
            ..Default::default()
        };
        assert!(build_filter(&params).is_err());
    }

    #[test]
    fn test_build_filter_year_intersects_dates() {
        let params = SummaryQuery {
            start_date: Some("2023-06-01".to_string()),
            year: Some(2023),
            ..Default::default()
        };
        let filter = build_filter(&params).unwrap();
        // Explicit start is later than the year start, so it wins.
        assert_eq!(
            filter.start_date.unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            filter.end_date.unwrap(),
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap()
        );
    }
}
