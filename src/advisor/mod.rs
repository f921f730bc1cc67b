// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Advisor: always-on insight engine
//!
//! Periodically evaluates telemetry, hardware profile and autopilot
//! state to produce contextual, read-only suggestions. Unlike the
//! controller the advisor never modifies inference parameters; it only
//! generates human-readable text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::autopilot::{AutopilotState, ControllerStatus};
use crate::hardware::HardwareProfile;
use crate::inference::next_heavier_variant;
use crate::telemetry::TelemetrySnapshot;
use crate::utils::unix_now;

/// Default seconds between emissions.
pub const DEFAULT_COOLDOWN_SECONDS: f64 = 30.0;

/// VRAM pressure warning threshold, fraction of total.
const VRAM_PRESSURE_THRESHOLD: f64 = 0.85;

/// Suggestion category for dashboard styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Tip,
    Status,
    Warning,
    Info,
}

/// A single read-only suggestion emitted by the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorSuggestion {
    pub text: String,
    pub category: SuggestionCategory,
    pub timestamp: f64,
}

impl AdvisorSuggestion {
    fn new(text: String, category: SuggestionCategory) -> Self {
        AdvisorSuggestion {
            text,
            category,
            timestamp: unix_now(),
        }
    }
}

/// Lower-priority rules tried in round-robin order so the feed stays
/// varied. The rotation index persists across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotatingRule {
    Headroom,
    SweetSpot,
    BaselineReport,
    HardwareCapability,
}

const ROTATION: [RotatingRule; 4] = [
    RotatingRule::Headroom,
    RotatingRule::SweetSpot,
    RotatingRule::BaselineReport,
    RotatingRule::HardwareCapability,
];

/// Rule-based suggestion engine emitting at most one suggestion per
/// cooldown window.
pub struct Advisor {
    hardware: Arc<HardwareProfile>,
    cooldown: Duration,
    last_emit: Option<Instant>,
    last_state: Option<AutopilotState>,
    rotation_index: usize,
}

impl Advisor {
    pub fn new(hardware: Arc<HardwareProfile>, cooldown_seconds: f64) -> Self {
        Advisor {
            hardware,
            cooldown: Duration::from_secs_f64(cooldown_seconds),
            last_emit: None,
            last_state: None,
            rotation_index: 0,
        }
    }

    /// Evaluate current system state; returns a suggestion only when
    /// the cooldown window has elapsed and a rule matched. A miss does
    /// not consume the cooldown.
    pub fn evaluate(
        &mut self,
        snapshot: &TelemetrySnapshot,
        status: &ControllerStatus,
    ) -> Option<AdvisorSuggestion> {
        if let Some(last) = self.last_emit {
            if last.elapsed() < self.cooldown {
                return None;
            }
        }

        let suggestion = self.generate(snapshot, status);
        if suggestion.is_some() {
            self.last_emit = Some(Instant::now());
        }
        suggestion
    }

    fn generate(
        &mut self,
        snap: &TelemetrySnapshot,
        status: &ControllerStatus,
    ) -> Option<AdvisorSuggestion> {
        // Priority 1: VRAM pressure. Bypasses rotation entirely.
        if snap.vram_total_gb > 0.0 {
            let vram_pct = snap.vram_used_gb / snap.vram_total_gb * 100.0;
            if vram_pct > VRAM_PRESSURE_THRESHOLD * 100.0 {
                return Some(AdvisorSuggestion::new(
                    format!(
                        "VRAM usage is high at {:.1}/{:.1} GB ({vram_pct:.0}%). Consider \
                         switching to a lighter model or enabling FP16 to reduce memory pressure.",
                        snap.vram_used_gb, snap.vram_total_gb
                    ),
                    SuggestionCategory::Warning,
                ));
            }
        }

        // Priority 2: narrate state changes. The first observation
        // primes the tracker without emitting.
        if self.last_state != Some(status.state) {
            let previous = self.last_state.replace(status.state);
            if previous.is_some() {
                return Some(AdvisorSuggestion::new(
                    format!(
                        "Autopilot transitioned to {}. {}",
                        status.state.label(),
                        state_impact(status.state)
                    ),
                    SuggestionCategory::Info,
                ));
            }
        }

        // Rotating rules, starting from where the last emission left
        // off; the first match wins and the index advances past it.
        for offset in 0..ROTATION.len() {
            let idx = (self.rotation_index + offset) % ROTATION.len();
            if let Some(suggestion) = self.try_rule(ROTATION[idx], snap, status) {
                self.rotation_index = (idx + 1) % ROTATION.len();
                return Some(suggestion);
            }
        }

        None
    }

    fn try_rule(
        &self,
        rule: RotatingRule,
        snap: &TelemetrySnapshot,
        status: &ControllerStatus,
    ) -> Option<AdvisorSuggestion> {
        match rule {
            RotatingRule::Headroom => self.rule_headroom(snap, status),
            RotatingRule::SweetSpot => self.rule_sweet_spot(snap, status),
            RotatingRule::BaselineReport => self.rule_baseline_report(snap, status),
            RotatingRule::HardwareCapability => self.rule_hardware_capability(snap, status),
        }
    }

    /// GPU well under capacity: suggest a heavier model.
    fn rule_headroom(
        &self,
        snap: &TelemetrySnapshot,
        status: &ControllerStatus,
    ) -> Option<AdvisorSuggestion> {
        if snap.gpu_utilization_pct >= 50.0 {
            return None;
        }

        let model = &status.current_params.model_variant;
        if let Some(next_model) = next_heavier_variant(model) {
            return Some(AdvisorSuggestion::new(
                format!(
                    "GPU at only {:.0}% — plenty of headroom. Consider upgrading from {model} \
                     to {next_model} for higher detection accuracy.",
                    snap.gpu_utilization_pct
                ),
                SuggestionCategory::Tip,
            ));
        }

        Some(AdvisorSuggestion::new(
            format!(
                "GPU at {:.0}% with {model} — your hardware has significant spare capacity. \
                 The system is running at optimal accuracy.",
                snap.gpu_utilization_pct
            ),
            SuggestionCategory::Status,
        ))
    }

    /// System running smoothly in the sweet spot.
    fn rule_sweet_spot(
        &self,
        snap: &TelemetrySnapshot,
        status: &ControllerStatus,
    ) -> Option<AdvisorSuggestion> {
        let baseline = status.baseline_fps.filter(|b| *b > 0.0)?;
        let in_band = (50.0..=70.0).contains(&snap.gpu_utilization_pct);
        if in_band && (1.0 - snap.fps / baseline).abs() < 0.10 {
            return Some(AdvisorSuggestion::new(
                format!(
                    "System is well-optimised — GPU at {:.0}%, FPS steady at {:.1}. \
                     No adjustments needed.",
                    snap.gpu_utilization_pct, snap.fps
                ),
                SuggestionCategory::Status,
            ));
        }
        None
    }

    /// Report baseline FPS and current deviation.
    fn rule_baseline_report(
        &self,
        snap: &TelemetrySnapshot,
        status: &ControllerStatus,
    ) -> Option<AdvisorSuggestion> {
        let baseline = status.baseline_fps.filter(|b| *b > 0.0)?;
        let deviation_pct = (1.0 - snap.fps / baseline).abs() * 100.0;

        if deviation_pct < 5.0 {
            return Some(AdvisorSuggestion::new(
                format!(
                    "FPS baseline: {baseline:.1} | Current: {:.1} — rock-steady performance \
                     with less than 5% deviation.",
                    snap.fps
                ),
                SuggestionCategory::Status,
            ));
        }

        let direction = if snap.fps > baseline { "above" } else { "below" };
        Some(AdvisorSuggestion::new(
            format!(
                "FPS baseline: {baseline:.1} | Current: {:.1} — running {deviation_pct:.0}% \
                 {direction} baseline.",
                snap.fps
            ),
            SuggestionCategory::Info,
        ))
    }

    /// Mention hardware features not currently in use.
    fn rule_hardware_capability(
        &self,
        snap: &TelemetrySnapshot,
        status: &ControllerStatus,
    ) -> Option<AdvisorSuggestion> {
        let half_active = status.current_params.half_precision;

        if self.hardware.fp16_supported && !half_active {
            return Some(AdvisorSuggestion::new(
                format!(
                    "Your {} supports FP16 precision, which is not currently active. \
                     The autopilot will enable it automatically if GPU load increases.",
                    self.hardware.gpu_name
                ),
                SuggestionCategory::Tip,
            ));
        }

        if self.hardware.tensor_cores && half_active {
            return Some(AdvisorSuggestion::new(
                format!(
                    "FP16 is active and your GPU has Tensor Cores — inference is accelerated. \
                     Current latency: {:.0}ms per frame.",
                    snap.latency_ms
                ),
                SuggestionCategory::Info,
            ));
        }

        None
    }
}

/// Qualitative trade-off text for each state, used by the
/// state-change narration.
fn state_impact(state: AutopilotState) -> &'static str {
    match state {
        AutopilotState::Stable => {
            "All optimisations removed — running at full quality with default parameters."
        }
        AutopilotState::SoftTuning => {
            "Enabled FP16 precision — minimal accuracy impact (~0.1% mAP), noticeable speed gain."
        }
        AutopilotState::BalancedTuning => {
            "Reduced input resolution — some small-object accuracy loss, significant FPS improvement."
        }
        AutopilotState::AggressiveTuning => {
            "Frame skipping active + reduced resolution — fastest mode, but may miss fast-moving objects."
        }
    }
}
