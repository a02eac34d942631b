// 🌐 REST API - JSON surface over QuoteService (feature "server")

use crate::library::{ImportMode, LibraryError};
use crate::quote::Quote;
use crate::sync::{QuoteService, ServiceError};
use crate::transfer::{export, parse_import, ExportFormat};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: QuoteService,
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }

    /// Failure that still carries a payload
    fn failed(data: T, message: String) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message),
        }
    }
}

/// Quote with its position in the library
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QuoteView {
    pub index: usize,
    pub text: String,
    pub category: String,
}

impl QuoteView {
    fn new(index: usize, quote: Quote) -> Self {
        Self {
            index,
            text: quote.text,
            category: quote.category,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewQuote {
    pub text: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryFilter {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub mode: Option<ImportMode>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub format: Option<ExportFormat>,
}

// ============================================================================
// Errors
// ============================================================================

pub struct ApiError(StatusCode, String);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Library(LibraryError::EmptyText) => StatusCode::BAD_REQUEST,
            ServiceError::Library(LibraryError::DuplicateText(_)) => StatusCode::CONFLICT,
            ServiceError::Library(LibraryError::IndexOutOfRange { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Storage(e) => {
                error!(error = %e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ApiResponse::<()>::err(self.1))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/quotes?category= - List quotes, optionally by category
async fn list_quotes(
    State(state): State<AppState>,
    Query(filter): Query<CategoryFilter>,
) -> ApiResult<Vec<QuoteView>> {
    let quotes = state
        .service
        .filter_by_category(filter.category.as_deref())
        .await
        .into_iter()
        .map(|(i, q)| QuoteView::new(i, q))
        .collect();
    Ok(Json(ApiResponse::ok(quotes)))
}

/// POST /api/quotes - Add a quote
async fn add_quote(
    State(state): State<AppState>,
    Json(new_quote): Json<NewQuote>,
) -> Result<(StatusCode, Json<ApiResponse<Quote>>), ApiError> {
    let quote = state.service.add(&new_quote.text, &new_quote.category).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(quote))))
}

/// DELETE /api/quotes - Clear all quotes
async fn clear_quotes(State(state): State<AppState>) -> ApiResult<usize> {
    let removed = state.service.clear().await?;
    Ok(Json(ApiResponse::ok(removed)))
}

/// GET /api/quotes/random - Show a random quote
async fn random_quote(State(state): State<AppState>) -> ApiResult<Option<QuoteView>> {
    let picked = state.service.random().await?;
    Ok(Json(ApiResponse::ok(picked.map(|(i, q)| QuoteView::new(i, q)))))
}

/// GET /api/quotes/last - Last viewed quote
async fn last_quote(State(state): State<AppState>) -> ApiResult<Option<QuoteView>> {
    let last = state.service.last_viewed().await;
    Ok(Json(ApiResponse::ok(last.map(|(i, q)| QuoteView::new(i, q)))))
}

/// GET /api/quotes/:index - Show a specific quote
async fn show_quote(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<QuoteView> {
    let quote = state.service.show(index).await?;
    Ok(Json(ApiResponse::ok(QuoteView::new(index, quote))))
}

/// DELETE /api/quotes/:index - Delete a quote
async fn delete_quote(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Quote> {
    let removed = state.service.remove(index).await?;
    Ok(Json(ApiResponse::ok(removed)))
}

/// GET /api/categories - Distinct categories
async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(ApiResponse::ok(state.service.categories().await)))
}

/// POST /api/sync - Sync with the server now
async fn sync_now(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.service.sync_once().await;
    match outcome.error.clone() {
        Some(message) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::failed(outcome, message)),
        ),
        None => (StatusCode::OK, Json(ApiResponse::ok(outcome))),
    }
}

/// GET /api/syncs - Recent sync history
async fn recent_syncs(State(state): State<AppState>) -> Response {
    match state.service.recent_syncs(20) {
        Ok(entries) => Json(ApiResponse::ok(entries)).into_response(),
        Err(e) => ApiError::from(ServiceError::Storage(e)).into_response(),
    }
}

/// POST /api/import?mode=replace|append - Import a JSON array of quotes
async fn import_quotes(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Response {
    let records = match parse_import(&body) {
        Ok(records) => records,
        Err(e) => {
            return ApiError(StatusCode::BAD_REQUEST, format!("{:#}", e)).into_response();
        }
    };

    let mode = params.mode.unwrap_or(ImportMode::Append);
    match state.service.import(&records, mode).await {
        Ok(summary) => Json(ApiResponse::ok(summary)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /api/export?format=json|csv - Download all quotes
async fn export_quotes(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Response {
    let format = params.format.unwrap_or_default();
    let quotes = state.service.quotes().await;

    match export(&quotes, format) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, format.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", format.file_name()),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => ApiError(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response(),
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(service: QuoteService) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/quotes",
            get(list_quotes).post(add_quote).delete(clear_quotes),
        )
        .route("/quotes/random", get(random_quote))
        .route("/quotes/last", get(last_quote))
        .route("/quotes/:index", get(show_quote).delete(delete_quote))
        .route("/categories", get(list_categories))
        .route("/sync", post(sync_now))
        .route("/syncs", get(recent_syncs))
        .route("/import", post(import_quotes))
        .route("/export", get(export_quotes))
        .with_state(AppState { service });

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
