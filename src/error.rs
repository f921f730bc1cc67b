// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for edgetune
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for edgetune operations
#[derive(Error, Debug)]
pub enum EdgeTuneError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hardware probing errors
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Frame source errors
    #[error("Source error: {0}")]
    Source(String),

    /// Inference / detector errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// LLM analyst errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors (settings file)
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenience Result type
pub type Result<T> = std::result::Result<T, EdgeTuneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = EdgeTuneError::Config("missing settings file".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: missing settings file"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error: EdgeTuneError = io_error.into();
        match error {
            EdgeTuneError::Io(_) => {}
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_inference_error_display() {
        let error = EdgeTuneError::Inference("unknown model variant".to_string());
        assert_eq!(error.to_string(), "Inference error: unknown model variant");
    }
}
