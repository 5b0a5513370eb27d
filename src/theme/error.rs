//! Theme engine error types

use thiserror::Error;

/// Errors raised by the theme engine
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Theme directory does not exist
    #[error("Theme not found: {0}")]
    NotFound(String),

    /// Template loading or rendering failed
    #[error("Template error: {0}")]
    TemplateError(String),

    /// theme.json / theme.toml could not be parsed
    #[error("Invalid theme metadata: {0}")]
    InvalidMetadata(String),
}
