//! Repository layer
//!
//! Each entity gets a repository trait describing its data access, plus a
//! SQLx implementation that dispatches to SQLite or PostgreSQL depending
//! on the pool driver. Services depend on the traits, never on SQLx.

mod category;
mod comment;
mod media;
mod menu;
mod page;
mod post;
mod settings;
mod tag;
mod widget;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use media::{MediaRepository, SqlxMediaRepository};
pub use menu::{MenuRepository, SqlxMenuRepository};
pub use page::{PageRepository, SqlxPageRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use widget::{SqlxWidgetRepository, WidgetRepository};
