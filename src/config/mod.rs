// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management
//!
//! Loads `config/settings.yaml`; a missing file or missing sections
//! fall back to the shipped defaults, so a bare checkout runs without
//! any configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::autopilot::{AutopilotMode, ControllerConfig};
use crate::error::Result;
use crate::inference::InferenceParams;
use crate::llm::LlmProviderKind;

/// Main settings structure, stored in config/settings.yaml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub autopilot: AutopilotConfig,

    #[serde(default)]
    pub advisor: AdvisorConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub sampling_interval_ms: u64,
    pub history_size: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            sampling_interval_ms: 500,
            history_size: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    pub mode: AutopilotMode,
    pub cooldown_seconds: f64,
    pub escalate_ticks: u32,
    pub deescalate_ticks: u32,
    pub warmup_ticks: u32,
    pub decision_log_size: usize,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        AutopilotConfig {
            mode: AutopilotMode::Balanced,
            cooldown_seconds: 5.0,
            escalate_ticks: 3,
            deescalate_ticks: 5,
            warmup_ticks: 5,
            decision_log_size: 50,
        }
    }
}

impl AutopilotConfig {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            mode: self.mode,
            cooldown_seconds: self.cooldown_seconds,
            escalate_ticks: self.escalate_ticks,
            deescalate_ticks: self.deescalate_ticks,
            warmup_ticks: self.warmup_ticks,
            decision_log_size: self.decision_log_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub cooldown_seconds: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        AdvisorConfig {
            cooldown_seconds: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub model_variant: String,
    pub input_size: (u32, u32),
    pub confidence_threshold: f64,
    pub iou_threshold: f64,
    pub half_precision: bool,
    pub backend: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        let params = InferenceParams::default();
        InferenceConfig {
            model_variant: params.model_variant,
            input_size: params.input_size,
            confidence_threshold: params.confidence_threshold,
            iou_threshold: params.iou_threshold,
            half_precision: params.half_precision,
            backend: params.backend,
        }
    }
}

impl InferenceConfig {
    /// Initial execution parameters applied at startup.
    pub fn initial_params(&self) -> InferenceParams {
        InferenceParams {
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            half_precision: self.half_precision,
            backend: self.backend.clone(),
            process_every_n_frames: 1,
            model_variant: self.model_variant.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub stream_video: bool,
    pub channel_capacity: usize,
    pub broadcast_interval_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        EventsConfig {
            stream_video: true,
            channel_capacity: 256,
            broadcast_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProviderKind,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            enabled: true,
            provider: LlmProviderKind::Ollama,
            ollama: OllamaConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub endpoint: String,
    /// "auto" selects the best locally available model at startup
    pub model: String,
    pub timeout_seconds: f64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            endpoint: "http://localhost:11434".to_string(),
            model: "auto".to_string(),
            timeout_seconds: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

/// Synthetic demo source defaults for the CLI `run` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub frames: u64,
    pub native_fps: f64,
    pub resolution: (u32, u32),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            frames: 300,
            native_fps: 30.0,
            resolution: (1280, 720),
        }
    }
}

impl Settings {
    /// Default settings file location, relative to the working
    /// directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("config").join("settings.yaml")
    }

    /// Load settings from the default path; missing file yields
    /// defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "settings file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }
}
