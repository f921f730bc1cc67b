// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Decision explanation backend calls

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::autopilot::OptimizationDecision;
use crate::error::{EdgeTuneError, Result};
use crate::hardware::HardwareProfile;

const SYSTEM_PROMPT: &str = "You are an edge-AI performance analyst embedded in a local GPU \
monitoring tool. The user runs YOLO inference on their own hardware. Your job is to explain \
optimisation decisions in 1-3 concise sentences. Mention the GPU capability, the telemetry \
trigger, and why the chosen action helps. Never suggest actions yourself; only explain what \
was already done.";

/// Which backend generates explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    #[default]
    Ollama,
    Gemini,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

/// Generates human-readable explanations for autopilot decisions.
///
/// `explain` never fails: any backend error falls back to a canned
/// sentence derived from the decision itself.
pub struct LlmAnalyst {
    provider: LlmProviderKind,
    client: Client,
    ollama_endpoint: String,
    ollama_model: String,
    timeout: Duration,
    gemini_api_key: String,
    gemini_model: String,
    enabled: bool,
}

impl LlmAnalyst {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: LlmProviderKind,
        ollama_endpoint: impl Into<String>,
        ollama_model: impl Into<String>,
        timeout_seconds: f64,
        gemini_api_key: impl Into<String>,
        gemini_model: impl Into<String>,
        enabled: bool,
    ) -> Self {
        let endpoint: String = ollama_endpoint.into();
        LlmAnalyst {
            provider,
            client: Client::new(),
            ollama_endpoint: endpoint.trim_end_matches('/').to_string(),
            ollama_model: ollama_model.into(),
            timeout: Duration::from_secs_f64(timeout_seconds),
            gemini_api_key: gemini_api_key.into(),
            gemini_model: gemini_model.into(),
            enabled,
        }
    }

    /// Ollama-only analyst, the default local setup.
    pub fn with_ollama(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_seconds: f64,
    ) -> Self {
        Self::new(
            LlmProviderKind::Ollama,
            endpoint,
            model,
            timeout_seconds,
            "",
            "",
            true,
        )
    }

    /// Disabled analyst: always answers with the canned explanation.
    pub fn disabled() -> Self {
        Self::new(LlmProviderKind::Ollama, "", "", 1.0, "", "", false)
    }

    pub fn ollama_endpoint(&self) -> &str {
        &self.ollama_endpoint
    }

    /// Generate a plain-language explanation for a decision.
    pub async fn explain(
        &self,
        decision: &OptimizationDecision,
        hardware: &HardwareProfile,
    ) -> String {
        if !self.enabled {
            return canned_explanation(decision);
        }

        let prompt = build_prompt(decision, hardware);
        let result = match self.provider {
            LlmProviderKind::Ollama => self.call_ollama(&prompt).await,
            LlmProviderKind::Gemini => self.call_gemini(&prompt).await,
        };

        match result {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => canned_explanation(decision),
            Err(e) => {
                warn!("LLM call failed, returning canned explanation: {e}");
                canned_explanation(decision)
            }
        }
    }

    /// Whether the configured backend is reachable. Cloud backends are
    /// presumed reachable.
    pub async fn health_check(&self) -> bool {
        match self.provider {
            LlmProviderKind::Ollama => {
                let url = format!("{}/api/version", self.ollama_endpoint);
                match self.client.get(&url).timeout(self.timeout).send().await {
                    Ok(response) => response.status().is_success(),
                    Err(_) => false,
                }
            }
            LlmProviderKind::Gemini => true,
        }
    }

    async fn call_ollama(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.ollama_endpoint);
        let payload = OllamaGenerateRequest {
            model: &self.ollama_model,
            system: SYSTEM_PROMPT,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: OllamaGenerateResponse = response.json().await?;
        Ok(body.response.trim().to_string())
    }

    async fn call_gemini(&self, prompt: &str) -> Result<String> {
        if self.gemini_api_key.is_empty() {
            return Err(EdgeTuneError::Llm("no Gemini API key configured".into()));
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.gemini_model, self.gemini_api_key
        );
        let payload = serde_json::json!({
            "contents": [
                { "parts": [ { "text": format!("{SYSTEM_PROMPT}\n\n{prompt}") } ] }
            ]
        });

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: GeminiResponse = response.json().await?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();
        Ok(text)
    }
}

fn build_prompt(decision: &OptimizationDecision, hardware: &HardwareProfile) -> String {
    let t = &decision.telemetry_summary;
    format!(
        "Hardware: {} ({:.1} GB VRAM, tier={}).\n\
         Telemetry: GPU utilisation {:.0}%, FPS {:.1}, VRAM used {:.1}/{:.1} GB.\n\
         Decision: transitioned from {} -> {}.\n\
         Action taken: {}.\n\
         Params applied: {:?}.\n\n\
         Explain this decision.",
        hardware.gpu_name,
        hardware.vram_total_gb,
        hardware.tier,
        t.gpu_util,
        t.fps,
        t.vram_used,
        hardware.vram_total_gb,
        decision.previous_state,
        decision.new_state,
        decision.action,
        decision.params_applied,
    )
}

/// Locally-constructed fallback sentence, built from the decision's
/// action and new-state fields.
pub fn canned_explanation(decision: &OptimizationDecision) -> String {
    format!(
        "The autopilot performed a {} and transitioned to {} state to maintain stable \
         inference performance within the detected hardware constraints.",
        decision.action, decision.new_state
    )
}
