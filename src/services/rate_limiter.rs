//! Rate limiter for comment submission
//!
//! Protects the open comment endpoint from floods by limiting how many
//! comments a single IP may post per sliding window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Comments allowed per IP per window
const MAX_COMMENTS_PER_WINDOW: usize = 5;

/// Window length in seconds
const WINDOW_SECONDS: i64 = 60;

/// Comment rate limiter keyed by client IP
pub struct CommentRateLimiter {
    attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl CommentRateLimiter {
    /// Create a new rate limiter
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if an IP is currently rate limited
    pub async fn is_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.attempts.write().await;
        let now = Utc::now();
        let cutoff = now - Duration::seconds(WINDOW_SECONDS);

        let ip_attempts = attempts.entry(ip).or_insert_with(Vec::new);
        ip_attempts.retain(|time| *time > cutoff);

        ip_attempts.len() >= MAX_COMMENTS_PER_WINDOW
    }

    /// Record a comment submission from an IP
    pub async fn record(&self, ip: IpAddr) {
        let mut attempts = self.attempts.write().await;
        attempts.entry(ip).or_insert_with(Vec::new).push(Utc::now());
    }

    /// Clean up expired entries (called periodically)
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - Duration::seconds(WINDOW_SECONDS);

        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }
}

impl Default for CommentRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
