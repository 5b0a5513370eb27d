//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints for Pressroom:
//! - Post API endpoints (public listing/detail, admin CRUD)
//! - Category, tag (including duplicate detection/merge), comment,
//!   media, menu, widget and page endpoints
//! - Site settings and appearance endpoints
//! - Admin dashboard endpoints
//! - The server-rendered public site (see [`web`])
//! - Upload serving with long-lived cache headers

pub mod admin;
pub mod categories;
pub mod comments;
pub mod media;
pub mod menus;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod responses;
pub mod site;
pub mod tags;
pub mod web;
pub mod widgets;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::path::Path;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub use middleware::{
    add_static_cache_headers, cache_control_html, cache_control_static, etag_matches,
    extract_client_ip, generate_etag, html_response_with_etag, ApiError, AppState, RequestStats,
};

/// Build the JSON API router mounted under /api/v1
pub fn build_api_router() -> Router<AppState> {
    let admin_routes = Router::new()
        .merge(admin::router())
        .merge(site::admin_router())
        .nest("/posts", posts::admin_router())
        .nest("/tags", tags::admin_router())
        .nest("/categories", categories::admin_router())
        .nest("/comments", comments::admin_router())
        .nest("/media", media::admin_router())
        .nest("/menu", menus::admin_router())
        .nest("/widgets", widgets::admin_router())
        .nest("/pages", pages::admin_router());

    Router::new()
        .nest("/posts", posts::public_router())
        .nest("/tags", tags::public_router())
        .nest("/categories", categories::public_router())
        .nest("/comments", comments::public_router())
        .nest("/pages", pages::public_router())
        .nest("/menu", menus::public_router())
        .nest("/site", site::public_router())
        .nest("/admin", admin_routes)
}

/// Build the complete router with middleware
///
/// Admin endpoints live under /api/v1/admin and carry no application
/// level authentication; access control is a deployment concern (reverse
/// proxy or network boundary).
pub fn build_router(state: AppState, cors_origin: &str, upload_dir: &Path) -> Router {
    let origin = cors_origin.parse::<HeaderValue>().unwrap_or_else(|_| {
        tracing::warn!("Invalid cors_origin '{}', using default", cors_origin);
        HeaderValue::from_static("http://localhost:3000")
    });

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    // Uploaded files get long-lived cache headers; UUID filenames never
    // change content
    let uploads = Router::new()
        .fallback_service(ServeDir::new(upload_dir).append_index_html_on_directories(false))
        .layer(axum_middleware::from_fn(add_static_cache_headers));

    Router::new()
        .merge(web::router())
        .nest("/api/v1", build_api_router())
        .nest("/uploads", uploads)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, UploadConfig};
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxCommentRepository, SqlxMediaRepository, SqlxMenuRepository,
        SqlxPageRepository, SqlxPostRepository, SqlxSettingsRepository, SqlxTagRepository,
        SqlxWidgetRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::services::{
        CategoryService, CommentRateLimiter, CommentService, MarkdownRenderer, MediaService,
        MenuService, PageService, PostService, SettingsService, TagService, WidgetService,
    };
    use crate::theme::ThemeEngine;
    use axum_test::TestServer;
    use std::sync::{Arc, RwLock};

    /// Everything a router test needs; temp dirs live as long as this
    struct TestApp {
        server: TestServer,
        _theme_dir: tempfile::TempDir,
        _upload_dir: tempfile::TempDir,
    }

    async fn spawn_app() -> TestApp {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let theme_dir = tempfile::tempdir().expect("Failed to create theme dir");
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

        let cache = create_cache(&CacheConfig::default());
        let renderer = MarkdownRenderer::new();
        let upload_config = Arc::new(UploadConfig {
            path: upload_dir.path().to_path_buf(),
            ..UploadConfig::default()
        });

        let tag_service = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let category_service = Arc::new(CategoryService::new(
            SqlxCategoryRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let post_service = Arc::new(PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            tag_service.clone(),
            cache.clone(),
            renderer.clone(),
        ));
        let comment_service = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let media_service = Arc::new(MediaService::new(
            SqlxMediaRepository::boxed(pool.clone()),
            upload_config.clone(),
        ));
        let menu_service = Arc::new(MenuService::new(
            SqlxMenuRepository::boxed(pool.clone()),
            SqlxPageRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let widget_service = Arc::new(WidgetService::new(
            SqlxWidgetRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let page_service = Arc::new(PageService::new(
            SqlxPageRepository::boxed(pool.clone()),
            cache.clone(),
            renderer,
        ));
        let settings_service = Arc::new(SettingsService::new(SqlxSettingsRepository::boxed(
            pool.clone(),
        )));

        menu_service
            .init_defaults()
            .await
            .expect("Failed to seed menu");

        let theme_engine =
            ThemeEngine::new(theme_dir.path(), "default").expect("Failed to create theme engine");

        let state = AppState {
            pool,
            post_service,
            category_service,
            tag_service,
            comment_service,
            media_service,
            menu_service,
            widget_service,
            page_service,
            settings_service,
            theme_engine: Arc::new(RwLock::new(theme_engine)),
            cache,
            upload_config: upload_config.clone(),
            request_stats: Arc::new(RequestStats::new()),
            comment_limiter: Arc::new(CommentRateLimiter::new()),
        };

        let router = build_router(state, "http://localhost:3000", &upload_config.path);
        let server = TestServer::new(router).expect("Failed to start test server");

        TestApp {
            server,
            _theme_dir: theme_dir,
            _upload_dir: upload_dir,
        }
    }

    #[tokio::test]
    async fn test_site_info() {
        let app = spawn_app().await;

        let response = app.server.get("/api/v1/site/info").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["site_name"], "Pressroom");
        assert_eq!(body["active_theme"], "default");
    }

    #[tokio::test]
    async fn test_create_and_fetch_post() {
        let app = spawn_app().await;

        let create = app
            .server
            .post("/api/v1/admin/posts")
            .json(&serde_json::json!({
                "title": "Hello World",
                "content": "# Heading\n\nFirst post, **bold** claim.",
                "status": "published",
                "tags": ["intro", "meta"]
            }))
            .await;
        create.assert_status(axum::http::StatusCode::CREATED);

        let created: serde_json::Value = create.json();
        assert_eq!(created["slug"], "hello-world");
        assert_eq!(created["tags"].as_array().unwrap().len(), 2);

        let fetched = app.server.get("/api/v1/posts/hello-world").await;
        fetched.assert_status_ok();
        let body: serde_json::Value = fetched.json();
        assert_eq!(body["title"], "Hello World");
        assert!(body["content_html"].as_str().unwrap().contains("<strong>"));
        assert_eq!(body["toc"][0]["text"], "Heading");
        assert_eq!(body["category"]["slug"], "uncategorized");
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public_listing() {
        let app = spawn_app().await;

        app.server
            .post("/api/v1/admin/posts")
            .json(&serde_json::json!({
                "title": "Secret Draft",
                "content": "hidden"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let public = app.server.get("/api/v1/posts").await;
        let body: serde_json::Value = public.json();
        assert_eq!(body["total"], 0);

        let missing = app.server.get("/api/v1/posts/secret-draft").await;
        missing.assert_status(axum::http::StatusCode::NOT_FOUND);

        // Admin still sees it
        let admin = app.server.get("/api/v1/admin/posts").await;
        let body: serde_json::Value = admin.json();
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn test_tag_duplicates_endpoint() {
        let app = spawn_app().await;

        app.server
            .post("/api/v1/admin/tags")
            .json(&serde_json::json!({"name": "database"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
        app.server
            .post("/api/v1/admin/tags")
            .json(&serde_json::json!({"name": "databases"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
        app.server
            .post("/api/v1/admin/tags")
            .json(&serde_json::json!({"name": "cooking"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = app.server.get("/api/v1/admin/tags/duplicates").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        let duplicates = body["duplicates"].as_array().unwrap();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0]["score"].as_f64().unwrap() >= 0.9);
    }

    #[tokio::test]
    async fn test_tag_merge_endpoint() {
        let app = spawn_app().await;

        let source: serde_json::Value = app
            .server
            .post("/api/v1/admin/tags")
            .json(&serde_json::json!({"name": "rustlang"}))
            .await
            .json();
        let target: serde_json::Value = app
            .server
            .post("/api/v1/admin/tags")
            .json(&serde_json::json!({"name": "rust"}))
            .await
            .json();

        let merge = app
            .server
            .post("/api/v1/admin/tags/merge")
            .json(&serde_json::json!({
                "source_id": source["id"],
                "target_id": target["id"],
            }))
            .await;
        merge.assert_status_ok();

        let tags: serde_json::Value = app.server.get("/api/v1/tags").await.json();
        let names: Vec<&str> = tags["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"rust"));
        assert!(!names.contains(&"rustlang"));
    }

    #[tokio::test]
    async fn test_comment_flow() {
        let app = spawn_app().await;

        let post: serde_json::Value = app
            .server
            .post("/api/v1/admin/posts")
            .json(&serde_json::json!({
                "title": "Discussable",
                "content": "talk to me",
                "status": "published"
            }))
            .await
            .json();
        let post_id = post["id"].as_i64().unwrap();

        let comment = app
            .server
            .post("/api/v1/comments")
            .json(&serde_json::json!({
                "post_id": post_id,
                "author_name": "Alice",
                "author_email": "alice@example.com",
                "content": "First!"
            }))
            .await;
        comment.assert_status(axum::http::StatusCode::CREATED);

        let body: serde_json::Value = comment.json();
        // Raw email never leaves the server, only the avatar hash
        assert!(body.get("author_email").is_none());
        assert!(body["avatar_hash"].is_string());

        let listing: serde_json::Value =
            app.server.get(&format!("/api/v1/comments/{}", post_id)).await.json();
        assert_eq!(listing["comments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let app = spawn_app().await;

        let response = app
            .server
            .post("/api/v1/comments")
            .json(&serde_json::json!({
                "post_id": 12345,
                "author_name": "Ghost",
                "content": "On a missing post"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_category_crud() {
        let app = spawn_app().await;

        let created = app
            .server
            .post("/api/v1/admin/categories")
            .json(&serde_json::json!({"name": "Technology"}))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);
        let category: serde_json::Value = created.json();

        let tree: serde_json::Value = app.server.get("/api/v1/categories").await.json();
        let slugs: Vec<&str> = tree["categories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["slug"].as_str().unwrap())
            .collect();
        assert!(slugs.contains(&"technology"));
        assert!(slugs.contains(&"uncategorized"));

        let deleted = app
            .server
            .delete(&format!("/api/v1/admin/categories/{}", category["id"]))
            .await;
        deleted.assert_status(axum::http::StatusCode::NO_CONTENT);

        // The default category refuses deletion
        let refused = app.server.delete("/api/v1/admin/categories/1").await;
        refused.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_menu_seeded_and_public() {
        let app = spawn_app().await;

        let menu: serde_json::Value = app.server.get("/api/v1/menu").await.json();
        let titles: Vec<&str> = menu["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Home", "Archive", "Categories", "Tags"]);
    }

    #[tokio::test]
    async fn test_widget_crud_and_validation() {
        let app = spawn_app().await;

        let created = app
            .server
            .post("/api/v1/admin/widgets")
            .json(&serde_json::json!({
                "area": "sidebar",
                "kind": "recent_posts",
                "title": "Recent",
                "config": {"count": 3}
            }))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);

        let invalid = app
            .server
            .post("/api/v1/admin/widgets")
            .json(&serde_json::json!({
                "area": "sidebar",
                "kind": "recent_posts",
                "config": {"count": 500}
            }))
            .await;
        invalid.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_page_crud_and_public_visibility() {
        let app = spawn_app().await;

        let created: serde_json::Value = app
            .server
            .post("/api/v1/admin/pages")
            .json(&serde_json::json!({
                "title": "About",
                "content": "Who we are",
                "status": "published"
            }))
            .await
            .json();
        assert_eq!(created["slug"], "about");

        let public = app.server.get("/api/v1/pages/about").await;
        public.assert_status_ok();
    }

    #[tokio::test]
    async fn test_settings_update() {
        let app = spawn_app().await;

        let update = app
            .server
            .put("/api/v1/admin/settings")
            .json(&serde_json::json!({
                "site_name": "Renamed",
                "site_description": "new",
                "site_subtitle": "",
                "site_footer": "",
                "posts_per_page": 5
            }))
            .await;
        update.assert_status_ok();

        let info: serde_json::Value = app.server.get("/api/v1/site/info").await.json();
        assert_eq!(info["site_name"], "Renamed");
        assert_eq!(info["posts_per_page"], 5);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let app = spawn_app().await;

        app.server
            .post("/api/v1/admin/posts")
            .json(&serde_json::json!({"title": "One", "content": "x", "status": "published"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let dashboard: serde_json::Value = app.server.get("/api/v1/admin/dashboard").await.json();
        assert_eq!(dashboard["posts"]["total"], 1);
        assert_eq!(dashboard["posts"]["published"], 1);
        assert_eq!(dashboard["categories"], 1);
        assert!(dashboard["server"]["total_requests"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_public_site_renders() {
        let app = spawn_app().await;

        app.server
            .post("/api/v1/admin/posts")
            .json(&serde_json::json!({
                "title": "Front Page Post",
                "content": "Visible on the index",
                "status": "published"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let index = app.server.get("/").await;
        index.assert_status_ok();
        let html = index.text();
        assert!(html.contains("Front Page Post"));
        assert!(html.contains("Pressroom"));

        let detail = app.server.get("/posts/front-page-post").await;
        detail.assert_status_ok();
        assert!(detail.text().contains("Visible on the index"));

        let missing = app.server.get("/posts/nope").await;
        missing.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_media_upload_and_delete() {
        let app = spawn_app().await;

        // Hand-built multipart body with a single "file" part
        let boundary = "pressroom-test-boundary";
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             fake image\r\n\
             --{b}--\r\n",
            b = boundary
        );

        let uploaded = app
            .server
            .post("/api/v1/admin/media")
            .bytes(body.into_bytes().into())
            .content_type(&format!("multipart/form-data; boundary={}", boundary))
            .await;
        uploaded.assert_status(axum::http::StatusCode::CREATED);
        let item: serde_json::Value = uploaded.json();
        assert_eq!(item["original_name"], "photo.png");
        assert_eq!(item["mime_type"], "image/png");

        let listing: serde_json::Value = app.server.get("/api/v1/admin/media").await.json();
        assert_eq!(listing["total"], 1);

        let deleted = app
            .server
            .delete(&format!("/api/v1/admin/media/{}", item["id"]))
            .await;
        deleted.assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_themes_listing() {
        let app = spawn_app().await;

        let themes: serde_json::Value = app.server.get("/api/v1/admin/themes").await.json();
        assert_eq!(themes["active"], "default");
        assert!(themes["themes"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["name"] == "default"));
    }
}
