// src/error.rs

//! Unified error handling for the scraper.

use std::fmt;

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The page could not be retrieved or rendered
    #[error("Render failed for {url}: {message}")]
    Render { url: String, message: String },

    /// The page did not settle within the allowed time
    #[error("Render timed out for {url} after {secs}s")]
    RenderTimeout { url: String, secs: u64 },

    /// A single candidate could not be turned into a job record
    #[error("Extraction error for {context}: {message}")]
    Extraction { context: String, message: String },

    /// A previously written feed could not be read back
    #[error("Feed parse error: {0}")]
    FeedParse(String),

    /// The feed document could not be produced
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a render error for a URL.
    pub fn render(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error with context.
    pub fn extraction(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a feed parse error.
    pub fn feed_parse(message: impl fmt::Display) -> Self {
        Self::FeedParse(message.to_string())
    }

    /// Create a serialization error.
    pub fn serialization(message: impl fmt::Display) -> Self {
        Self::Serialization(message.to_string())
    }
}
