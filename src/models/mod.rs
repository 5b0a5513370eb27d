//! Data models
//!
//! This module contains all data structures used throughout Pressroom.
//! Models represent:
//! - Database entities (Post, Category, Tag, Comment, MediaItem, MenuItem, Widget, Page)
//! - API request/response input types
//! - Pagination containers

mod category;
mod comment;
mod media;
mod menu;
mod page;
mod post;
mod tag;
mod widget;

pub use category::{
    Category, CategoryTree, CreateCategoryInput, UpdateCategoryInput, DEFAULT_CATEGORY_ID,
};
pub use comment::{Comment, CommentThread, CreateCommentInput};
pub use media::MediaItem;
pub use menu::{
    CreateMenuItemInput, MenuItem, MenuItemType, MenuOrderItem, MenuTree, UpdateMenuItemInput,
    UpdateMenuOrderInput,
};
pub use page::{CreatePageInput, Page, PageStatus, UpdatePageInput};
pub use post::{
    CreatePostInput, ListParams, PagedResult, Post, PostFilter, PostStatus, UpdatePostInput,
};
pub use tag::{Tag, TagDuplicate, TagWithCount};
pub use widget::{
    CreateWidgetInput, ResolvedWidget, UpdateWidgetInput, UpdateWidgetOrderInput, Widget,
    WidgetArea, WidgetKind, WidgetOrderItem,
};
