//! Public rendering path
//!
//! Server-rendered HTML routes for the blog itself, driven by the theme
//! engine:
//! - GET / - Published posts, paginated
//! - GET /archive - All published posts
//! - GET /posts/{slug} - Post detail with comments
//! - GET /page/{slug} - Standalone page
//! - GET /tags - Tag listing
//! - GET /tags/{slug} - Tag archive
//! - GET /categories - Category listing
//! - GET /categories/{slug} - Category archive
//!
//! Every route renders with the shared site context (settings, menu,
//! widgets, appearance) and answers 304 on matching ETags.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{html_response_with_etag, AppState};
use crate::models::{
    Category, Comment, CommentThread, ListParams, MenuItemType, MenuTree, PagedResult, Post, Tag,
    WidgetArea,
};
use crate::services::markdown::TocEntry;

/// Pagination query for listing routes
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

/// Build the public HTML router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/archive", get(archive))
        .route("/posts/{slug}", get(post_detail))
        .route("/page/{slug}", get(page_detail))
        .route("/tags", get(tag_listing))
        .route("/tags/{slug}", get(tag_archive))
        .route("/categories", get(category_listing))
        .route("/categories/{slug}", get(category_archive))
}

/// GET / - Published posts, newest first
async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    let settings = state
        .settings_service
        .get_site_settings()
        .await
        .unwrap_or_default();
    let params = ListParams::new(query.page, settings.posts_per_page);

    let posts = match state
        .post_service
        .list(&crate::models::PostFilter::published(), &params)
        .await
    {
        Ok(posts) => posts,
        Err(e) => return render_error(e.to_string()),
    };

    let mut context = match base_context(&state).await {
        Ok(context) => context,
        Err(e) => return render_error(e),
    };
    insert_post_list(&mut context, &state, &posts).await;
    context.insert("page_num", &posts.page);
    context.insert("total_pages", &posts.total_pages());

    render(&state, "index.html", &context, &headers)
}

/// GET /archive - Every published post
async fn archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    render_archive_page(
        &state,
        &headers,
        query.page,
        crate::models::PostFilter::published(),
        "Archive".to_string(),
        None,
        "/archive",
    )
    .await
}

/// GET /posts/{slug} - Post detail with comments
async fn post_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let post = match state.post_service.get_published_by_slug(&slug).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found(),
        Err(e) => return render_error(e.to_string()),
    };

    let category = state
        .category_service
        .get_by_id(post.category_id)
        .await
        .ok()
        .flatten();
    let tags = state.post_service.get_tags(post.id).await.unwrap_or_default();
    let toc = state.post_service.table_of_contents(&post);
    let comments = state
        .comment_service
        .get_threads(post.id)
        .await
        .unwrap_or_default();

    let mut context = match base_context(&state).await {
        Ok(context) => context,
        Err(e) => return render_error(e),
    };
    context.insert("post", &post_to_template(&post, category.as_ref(), &tags));
    context.insert("toc", &toc_to_template(&toc));
    context.insert(
        "comments",
        &comments
            .iter()
            .map(thread_to_template)
            .collect::<Vec<_>>(),
    );

    render(&state, "post.html", &context, &headers)
}

/// GET /page/{slug} - Standalone page
async fn page_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let page = match state.page_service.get_published_by_slug(&slug).await {
        Ok(Some(page)) => page,
        Ok(None) => return render_not_found(),
        Err(e) => return render_error(e.to_string()),
    };

    let mut context = match base_context(&state).await {
        Ok(context) => context,
        Err(e) => return render_error(e),
    };
    context.insert(
        "page",
        &serde_json::json!({
            "title": page.title,
            "slug": page.slug,
            "content_html": page.content_html,
        }),
    );

    render(&state, "page.html", &context, &headers)
}

/// GET /tags - Tag listing with post counts
async fn tag_listing(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let tags = match state.tag_service.get_tag_cloud(0).await {
        Ok(tags) => tags,
        Err(e) => return render_error(e.to_string()),
    };

    let terms: Vec<serde_json::Value> = tags
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t.tag.name,
                "href": format!("/tags/{}", t.tag.slug),
                "count": t.post_count,
            })
        })
        .collect();

    let mut context = match base_context(&state).await {
        Ok(context) => context,
        Err(e) => return render_error(e),
    };
    context.insert("listing_title", "Tags");
    context.insert("terms", &terms);

    render(&state, "terms.html", &context, &headers)
}

/// GET /tags/{slug} - Published posts carrying a tag
async fn tag_archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let tag = match state.tag_service.get_by_slug(&slug).await {
        Ok(Some(tag)) => tag,
        Ok(None) => return render_not_found(),
        Err(e) => return render_error(e.to_string()),
    };

    let filter = crate::models::PostFilter {
        tag_id: Some(tag.id),
        ..crate::models::PostFilter::published()
    };
    let base_url = format!("/tags/{}", tag.slug);
    render_archive_page(
        &state,
        &headers,
        query.page,
        filter,
        format!("Tagged: {}", tag.name),
        None,
        &base_url,
    )
    .await
}

/// GET /categories - Category listing with post counts
async fn category_listing(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let tree = match state.category_service.tree().await {
        Ok(tree) => tree,
        Err(e) => return render_error(e.to_string()),
    };

    let mut terms = Vec::new();
    for node in &tree {
        terms.push(serde_json::json!({
            "name": node.category.name,
            "href": format!("/categories/{}", node.category.slug),
            "count": node.post_count,
        }));
        for child in &node.children {
            terms.push(serde_json::json!({
                "name": format!("{} / {}", node.category.name, child.category.name),
                "href": format!("/categories/{}", child.category.slug),
                "count": child.post_count,
            }));
        }
    }

    let mut context = match base_context(&state).await {
        Ok(context) => context,
        Err(e) => return render_error(e),
    };
    context.insert("listing_title", "Categories");
    context.insert("terms", &terms);

    render(&state, "terms.html", &context, &headers)
}

/// GET /categories/{slug} - Published posts in a category
async fn category_archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let category = match state.category_service.get_by_slug(&slug).await {
        Ok(Some(category)) => category,
        Ok(None) => return render_not_found(),
        Err(e) => return render_error(e.to_string()),
    };

    let filter = crate::models::PostFilter {
        category_id: Some(category.id),
        ..crate::models::PostFilter::published()
    };
    let base_url = format!("/categories/{}", category.slug);
    render_archive_page(
        &state,
        &headers,
        query.page,
        filter,
        category.name.clone(),
        category.description.clone(),
        &base_url,
    )
    .await
}

// ============================================================================
// Shared rendering helpers
// ============================================================================

/// Render an archive-style page for a filter
async fn render_archive_page(
    state: &AppState,
    headers: &HeaderMap,
    page: u32,
    filter: crate::models::PostFilter,
    title: String,
    description: Option<String>,
    base_url: &str,
) -> Response {
    let settings = state
        .settings_service
        .get_site_settings()
        .await
        .unwrap_or_default();
    let params = ListParams::new(page, settings.posts_per_page);

    let posts = match state.post_service.list(&filter, &params).await {
        Ok(posts) => posts,
        Err(e) => return render_error(e.to_string()),
    };

    let mut context = match base_context(state).await {
        Ok(context) => context,
        Err(e) => return render_error(e),
    };
    insert_post_list(&mut context, state, &posts).await;
    context.insert("archive_title", &title);
    context.insert("archive_description", &description);
    context.insert("page_num", &posts.page);
    context.insert("total_pages", &posts.total_pages());
    context.insert("base_url", base_url);

    render(state, "archive.html", &context, headers)
}

/// Build the context every template receives: site settings, resolved
/// menu, widgets, and appearance values.
async fn base_context(state: &AppState) -> Result<TeraContext, String> {
    let settings = state
        .settings_service
        .get_site_settings()
        .await
        .unwrap_or_default();
    let appearance = state
        .settings_service
        .get_appearance()
        .await
        .unwrap_or_default();
    let menu = state.menu_service.tree(true).await.map_err(|e| e.to_string())?;
    let sidebar = state
        .widget_service
        .resolve_area(WidgetArea::Sidebar)
        .await
        .map_err(|e| e.to_string())?;
    let footer = state
        .widget_service
        .resolve_area(WidgetArea::Footer)
        .await
        .map_err(|e| e.to_string())?;

    let mut context = TeraContext::new();
    context.insert("site", &settings);
    context.insert("appearance", &appearance);
    context.insert(
        "menu",
        &menu.iter().map(menu_to_template).collect::<Vec<_>>(),
    );
    context.insert("sidebar_widgets", &sidebar);
    context.insert("footer_widgets", &footer);
    Ok(context)
}

/// Render a template of the active theme with ETag handling
fn render(
    state: &AppState,
    template: &str,
    context: &TeraContext,
    headers: &HeaderMap,
) -> Response {
    let engine = match state.theme_engine.read() {
        Ok(engine) => engine,
        Err(_) => return render_error("Theme engine lock poisoned".to_string()),
    };

    match engine.render(template, context) {
        Ok(html) => html_response_with_etag(headers, html),
        Err(e) => {
            tracing::error!("Template '{}' failed to render: {}", template, e);
            render_error("Template rendering failed".to_string())
        }
    }
}

fn render_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html("<!DOCTYPE html><html><body><h1>404</h1><p>Not found.</p></body></html>".to_string()),
    )
        .into_response()
}

fn render_error(message: String) -> Response {
    tracing::error!("Public rendering failed: {}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html("<!DOCTYPE html><html><body><h1>500</h1><p>Something broke.</p></body></html>".to_string()),
    )
        .into_response()
}

/// Add the template representation of a post page to the context
async fn insert_post_list(context: &mut TeraContext, state: &AppState, posts: &PagedResult<Post>) {
    let mut rendered = Vec::with_capacity(posts.items.len());
    for post in &posts.items {
        let category = state
            .category_service
            .get_by_id(post.category_id)
            .await
            .ok()
            .flatten();
        rendered.push(post_to_template(post, category.as_ref(), &[]));
    }
    context.insert("posts", &rendered);
}

/// Resolve a menu node into {title, href, open_new_tab, children}
fn menu_to_template(node: &MenuTree) -> serde_json::Value {
    serde_json::json!({
        "title": node.item.title,
        "href": resolve_menu_href(&node.item.item_type, &node.item.target),
        "open_new_tab": node.item.open_new_tab,
        "children": node.children.iter().map(menu_to_template).collect::<Vec<_>>(),
    })
}

/// Map a menu target onto a public URL
fn resolve_menu_href(item_type: &MenuItemType, target: &str) -> String {
    match item_type {
        MenuItemType::Builtin => match target {
            "home" => "/".to_string(),
            "archive" => "/archive".to_string(),
            "categories" => "/categories".to_string(),
            "tags" => "/tags".to_string(),
            other => format!("/{}", other),
        },
        MenuItemType::Page => format!("/page/{}", target),
        MenuItemType::External => target.to_string(),
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn post_to_template(post: &Post, category: Option<&Category>, tags: &[Tag]) -> serde_json::Value {
    serde_json::json!({
        "title": post.title,
        "slug": post.slug,
        "excerpt": post.excerpt,
        "content_html": post.content_html,
        "published_at": post.published_at.as_ref().map(format_date),
        "view_count": post.view_count,
        "comment_count": post.comment_count,
        "thumbnail": post.thumbnail,
        "category": category.map(|c| serde_json::json!({"name": c.name, "slug": c.slug})),
        "tags": tags.iter().map(|t| serde_json::json!({"name": t.name, "slug": t.slug})).collect::<Vec<_>>(),
    })
}

fn toc_to_template(toc: &[TocEntry]) -> Vec<serde_json::Value> {
    toc.iter()
        .map(|entry| {
            serde_json::json!({
                "level": entry.level,
                "id": entry.id,
                "text": entry.text,
            })
        })
        .collect()
}

fn comment_to_template(comment: &Comment) -> serde_json::Value {
    serde_json::json!({
        "author_name": comment.author_name,
        "avatar_hash": comment.avatar_hash,
        "content": comment.content,
        "created_at": format_date(&comment.created_at),
    })
}

fn thread_to_template(thread: &CommentThread) -> serde_json::Value {
    let mut value = comment_to_template(&thread.comment);
    value["replies"] = serde_json::Value::Array(
        thread.replies.iter().map(comment_to_template).collect(),
    );
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_menu_href_builtin() {
        assert_eq!(resolve_menu_href(&MenuItemType::Builtin, "home"), "/");
        assert_eq!(
            resolve_menu_href(&MenuItemType::Builtin, "archive"),
            "/archive"
        );
        assert_eq!(resolve_menu_href(&MenuItemType::Builtin, "tags"), "/tags");
    }

    #[test]
    fn test_resolve_menu_href_page_and_external() {
        assert_eq!(
            resolve_menu_href(&MenuItemType::Page, "about"),
            "/page/about"
        );
        assert_eq!(
            resolve_menu_href(&MenuItemType::External, "https://example.com"),
            "https://example.com"
        );
    }

    #[test]
    fn test_post_to_template_shape() {
        let post = Post::new(
            "s".into(),
            "T".into(),
            "c".into(),
            "<p>c</p>".into(),
            "c".into(),
            1,
            crate::models::PostStatus::Published,
        );
        let value = post_to_template(&post, None, &[]);
        assert_eq!(value["title"], "T");
        assert!(value["published_at"].is_string());
        assert!(value["category"].is_null());
    }
}
