//! Pressroom - A self-hosted blog and content management engine
//!
//! This library provides the core functionality for the Pressroom CMS.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
