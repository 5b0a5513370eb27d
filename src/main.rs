//! Pressroom - A self-hosted blog and content management engine

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pressroom::{
    api::{self, AppState, RequestStats},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxCommentRepository, SqlxMediaRepository,
            SqlxMenuRepository, SqlxPageRepository, SqlxPostRepository, SqlxSettingsRepository,
            SqlxTagRepository, SqlxWidgetRepository,
        },
    },
    services::{
        settings::keys, CategoryService, CommentRateLimiter, CommentService, MarkdownRenderer,
        MediaService, MenuService, PageService, PostService, SettingsService, TagService,
        WidgetService,
    },
    theme::ThemeEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pressroom=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pressroom...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize cache
    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized");

    // Create the shared markdown renderer
    let markdown_renderer = MarkdownRenderer::new();

    // Create services
    let settings_service = Arc::new(SettingsService::new(SqlxSettingsRepository::boxed(
        pool.clone(),
    )));
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
        markdown_renderer.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(
        SqlxCommentRepository::boxed(pool.clone()),
        SqlxPostRepository::boxed(pool.clone()),
        cache.clone(),
    ));
    let upload_config = Arc::new(config.upload.clone());
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
        markdown_renderer,
    ));

    // Initialize default navigation
    menu_service.init_defaults().await?;
    tracing::info!("Navigation initialized");

    // The stored appearance setting wins over the config file
    let active_theme = settings_service
        .get(keys::ACTIVE_THEME)
        .await
        .ok()
        .flatten()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| config.theme.active.clone());

    // Initialize theme engine (falls back to the default theme when the
    // requested one fails to load)
    let theme_engine = ThemeEngine::new(&config.theme.path, &active_theme)?;
    tracing::info!("Theme engine initialized: {}", theme_engine.current_theme());

    // Build application state
    let request_stats = Arc::new(RequestStats::new());
    let comment_limiter = Arc::new(CommentRateLimiter::new());

    let state = AppState {
        pool: pool.clone(),
        post_service,
        category_service,
        tag_service,
        comment_service,
        media_service,
        menu_service,
        widget_service,
        page_service,
        settings_service,
        theme_engine: Arc::new(std::sync::RwLock::new(theme_engine)),
        cache,
        upload_config: upload_config.clone(),
        request_stats,
        comment_limiter: comment_limiter.clone(),
    };

    // Rate limiter cleanup task (runs every 5 minutes)
    {
        let limiter = comment_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin, &upload_config.path);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
