//! API middleware and shared HTTP plumbing
//!
//! Contains:
//! - `AppState`, the shared service container
//! - `ApiError`, the JSON error envelope every endpoint speaks
//! - Request statistics middleware (atomic counters)
//! - ETag and Cache-Control helpers for the public rendering path

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::cache::Cache;
use crate::config::UploadConfig;
use crate::db::DynDatabasePool;
use crate::services::{
    CategoryService, CategoryServiceError, CommentRateLimiter, CommentService,
    CommentServiceError, MediaService, MediaServiceError, MenuService, MenuServiceError,
    PageService, PageServiceError, PostService, PostServiceError, SettingsService,
    SettingsServiceError, TagService, TagServiceError, WidgetService, WidgetServiceError,
};
use crate::theme::ThemeEngine;

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    /// Total number of requests processed
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    /// Application start time
    start_time: Instant,
}

impl RequestStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Get total request count
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Get average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub post_service: Arc<PostService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub comment_service: Arc<CommentService>,
    pub media_service: Arc<MediaService>,
    pub menu_service: Arc<MenuService>,
    pub widget_service: Arc<WidgetService>,
    pub page_service: Arc<PageService>,
    pub settings_service: Arc<SettingsService>,
    pub theme_engine: Arc<RwLock<ThemeEngine>>,
    pub cache: Arc<Cache>,
    pub upload_config: Arc<UploadConfig>,
    pub request_stats: Arc<RequestStats>,
    pub comment_limiter: Arc<CommentRateLimiter>,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Map a service error onto the API envelope without leaking internals
macro_rules! impl_from_service_error {
    ($error:ident) => {
        impl From<$error> for ApiError {
            fn from(e: $error) -> Self {
                match &e {
                    $error::NotFound(msg) => ApiError::not_found(msg.clone()),
                    $error::ValidationError(msg) => ApiError::validation_error(msg.clone()),
                    $error::InternalError(_) => {
                        tracing::error!("{}", e);
                        ApiError::internal_error("Internal server error")
                    }
                }
            }
        }
    };
}

impl_from_service_error!(PostServiceError);
impl_from_service_error!(TagServiceError);
impl_from_service_error!(CategoryServiceError);
impl_from_service_error!(CommentServiceError);
impl_from_service_error!(MediaServiceError);
impl_from_service_error!(MenuServiceError);
impl_from_service_error!(PageServiceError);
impl_from_service_error!(WidgetServiceError);

impl From<SettingsServiceError> for ApiError {
    fn from(e: SettingsServiceError) -> Self {
        match &e {
            SettingsServiceError::InvalidValue(msg) => ApiError::validation_error(msg.clone()),
            _ => {
                tracing::error!("{}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Request statistics middleware
///
/// Records request count and response time for the dashboard. Uses
/// atomic operations for minimal overhead.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_us = start.elapsed().as_micros() as u64;
    state.request_stats.record(duration_us);

    response
}

/// Extract the client IP from proxy headers
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}

// ============================================================================
// HTTP Cache Headers
// ============================================================================

/// Generate ETag from content
pub fn generate_etag(content: &[u8]) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{}\"", hasher.finish())
}

/// Check if ETags match
pub fn etag_matches(request_etag: Option<&str>, response_etag: &str) -> bool {
    match request_etag {
        Some(etag) => {
            let normalized_request = etag.trim_start_matches("W/");
            let normalized_response = response_etag.trim_start_matches("W/");
            normalized_request == normalized_response
        }
        None => false,
    }
}

/// Build Cache-Control header for static assets
pub fn cache_control_static(max_age: u32, immutable: bool) -> String {
    if immutable {
        format!("public, max-age={}, immutable", max_age)
    } else {
        format!("public, max-age={}", max_age)
    }
}

/// Middleware to add long-lived cache headers to uploaded assets
/// (UUID filenames never change content)
pub async fn add_static_cache_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if response.status().is_success() {
        if let Ok(value) = cache_control_static(31536000, true).parse() {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
    }
    response
}

/// Build Cache-Control header for rendered HTML
pub fn cache_control_html(max_age: u32, stale_while_revalidate: Option<u32>) -> String {
    match stale_while_revalidate {
        Some(swr) => format!(
            "public, max-age={}, stale-while-revalidate={}",
            max_age, swr
        ),
        None => format!("public, max-age={}", max_age),
    }
}

/// Answer 304 when the client's If-None-Match matches, otherwise serve
/// the HTML with ETag and cache headers
pub fn html_response_with_etag(headers: &HeaderMap, html: String) -> Response {
    let etag = generate_etag(html.as_bytes());

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH) {
        if let Ok(if_none_match_str) = if_none_match.to_str() {
            if etag_matches(Some(if_none_match_str), &etag) {
                return Response::builder()
                    .status(StatusCode::NOT_MODIFIED)
                    .header(header::ETAG, &etag)
                    .body(axum::body::Body::empty())
                    .unwrap_or_else(|_| StatusCode::NOT_MODIFIED.into_response());
            }
        }
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::ETAG, &etag)
        .header(header::CACHE_CONTROL, cache_control_html(60, Some(300)))
        .body(axum::body::Body::from(html))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_not_found() {
        let error = ApiError::not_found("missing");
        assert_eq!(error.error.code, "NOT_FOUND");
    }

    #[test]
    fn test_api_error_validation() {
        let error = ApiError::validation_error("bad input");
        assert_eq!(error.error.code, "VALIDATION_ERROR");
        assert_eq!(error.error.message, "bad input");
    }

    #[test]
    fn test_service_error_mapping_hides_internals() {
        let internal = PostServiceError::InternalError(anyhow::anyhow!("db exploded at 0x1234"));
        let api: ApiError = internal.into();
        assert_eq!(api.error.code, "INTERNAL_ERROR");
        assert!(!api.error.message.contains("0x1234"));
    }

    #[test]
    fn test_service_error_mapping_keeps_validation_message() {
        let validation = PostServiceError::ValidationError("Title cannot be empty".to_string());
        let api: ApiError = validation.into();
        assert_eq!(api.error.code, "VALIDATION_ERROR");
        assert_eq!(api.error.message, "Title cannot be empty");
    }

    #[test]
    fn test_request_stats() {
        let stats = RequestStats::new();
        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.avg_response_time_us(), 0.0);

        stats.record(100);
        stats.record(300);

        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.avg_response_time_us(), 200.0);
    }

    #[test]
    fn test_extract_client_ip_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4, 5.6.7.8".parse().unwrap());
        assert_eq!(extract_client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_extract_client_ip_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "9.9.9.9".parse().unwrap());
        assert_eq!(extract_client_ip(&headers), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn test_extract_client_ip_none() {
        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_generate_etag_deterministic() {
        let content = b"Hello, World!";
        assert_eq!(generate_etag(content), generate_etag(content));
    }

    #[test]
    fn test_generate_etag_different_content() {
        assert_ne!(generate_etag(b"Hello"), generate_etag(b"World"));
    }

    #[test]
    fn test_etag_matches_exact() {
        assert!(etag_matches(Some("\"12345\""), "\"12345\""));
        assert!(!etag_matches(Some("\"54321\""), "\"12345\""));
    }

    #[test]
    fn test_etag_matches_weak() {
        assert!(etag_matches(Some("W/\"12345\""), "W/\"12345\""));
        assert!(etag_matches(Some("\"12345\""), "W/\"12345\""));
    }

    #[test]
    fn test_etag_matches_none() {
        assert!(!etag_matches(None, "\"12345\""));
    }

    #[test]
    fn test_cache_control_static_immutable() {
        let header = cache_control_static(31536000, true);
        assert!(header.contains("public") && header.contains("immutable"));
    }

    #[test]
    fn test_cache_control_html_with_swr() {
        let header = cache_control_html(60, Some(300));
        assert!(header.contains("stale-while-revalidate=300"));
    }

    #[test]
    fn test_cache_control_html_without_swr() {
        let header = cache_control_html(60, None);
        assert!(!header.contains("stale-while-revalidate"));
    }
}

#[cfg(test)]
mod cache_header_property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn etag_determinism(content in prop::collection::vec(any::<u8>(), 0..100)) {
            prop_assert_eq!(generate_etag(&content), generate_etag(&content));
        }

        #[test]
        fn etag_format(content in prop::collection::vec(any::<u8>(), 0..100)) {
            let etag = generate_etag(&content);
            prop_assert!(etag.starts_with('"') && etag.ends_with('"') && etag.len() > 2);
        }

        #[test]
        fn etag_always_matches_itself(hash in "[0-9a-f]{8,16}") {
            let etag = format!("\"{}\"", hash);
            prop_assert!(etag_matches(Some(&etag), &etag));
            prop_assert!(!etag_matches(None, &etag));
        }

        #[test]
        fn cache_control_carries_max_age(max_age in 0u32..=31536000u32) {
            let header = cache_control_static(max_age, false);
            let expected = format!("max-age={}", max_age);
            prop_assert!(header.contains(&expected));
        }
    }
}
