// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Local Ollama model discovery
//!
//! Used at startup when the configured model is `"auto"`: list the
//! models the local Ollama daemon serves and pick the best fit for
//! short explanation prompts.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Preference ladder, ordered by quality/speed balance on edge
/// hardware.
const PREFERENCES: [&str; 11] = [
    "llama3.2", "llama3.1", "llama3", "mistral", "mixtral", "gemma2", "gemma", "phi3", "phi-3",
    "tinyllama", "llama2",
];

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

/// Query the Ollama API for available model names.
///
/// Tries `127.0.0.1` as a fallback when the endpoint uses `localhost`.
/// Failures are logged and yield an empty list.
pub async fn available_ollama_models(base_url: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let mut urls = vec![base.to_string()];
    if base.contains("localhost") {
        urls.push(base.replace("localhost", "127.0.0.1"));
    }

    let client = Client::new();
    for url in urls {
        info!("Querying Ollama at {url} ...");
        match client
            .get(format!("{url}/api/tags"))
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                match response.json::<TagsResponse>().await {
                    Ok(tags) => {
                        info!("Found {} models at {url}", tags.models.len());
                        return tags.models.into_iter().map(|m| m.name).collect();
                    }
                    Err(e) => warn!("Malformed Ollama tags response at {url}: {e}"),
                }
            }
            Ok(response) => {
                warn!("Ollama returned status {} at {url}", response.status());
            }
            Err(e) => {
                warn!("Failed to discover Ollama models at {url}: {e}");
            }
        }
    }

    Vec::new()
}

/// Pick the best model from the available list, or the first one when
/// no preference matches.
pub fn select_best_model(models: &[String]) -> Option<String> {
    if models.is_empty() {
        return None;
    }

    for preference in PREFERENCES {
        for model in models {
            if model.to_lowercase().contains(preference) {
                return Some(model.clone());
            }
        }
    }

    models.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_prefers_llama3_over_phi() {
        let models = names(&["phi3:mini", "llama3.2:3b", "llama2:7b"]);
        assert_eq!(select_best_model(&models).unwrap(), "llama3.2:3b");
    }

    #[test]
    fn test_select_is_case_insensitive() {
        let models = names(&["Mistral:latest"]);
        assert_eq!(select_best_model(&models).unwrap(), "Mistral:latest");
    }

    #[test]
    fn test_select_falls_back_to_first_unknown() {
        let models = names(&["qwen2.5:7b", "deepseek-r1:8b"]);
        assert_eq!(select_best_model(&models).unwrap(), "qwen2.5:7b");
    }

    #[test]
    fn test_select_empty_list() {
        assert_eq!(select_best_model(&[]), None);
    }

    #[tokio::test]
    async fn test_discovery_failure_yields_empty_list() {
        let models = available_ollama_models("http://127.0.0.1:9").await;
        assert!(models.is_empty());
    }
}
