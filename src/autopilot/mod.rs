// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Autopilot: finite-state optimization engine
//!
//! Evaluates telemetry snapshots, decides whether to escalate or
//! de-escalate the optimization level, and applies parameter changes
//! through the detector's configuration surface. Hysteresis streaks
//! and a cooldown timer prevent oscillation.

mod controller;

pub use controller::{AutopilotController, ControllerConfig, ControllerStatus};

use serde::{Deserialize, Serialize};

use crate::inference::InferenceParams;

/// FSM states, ordered from least to most aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutopilotState {
    Stable,
    SoftTuning,
    BalancedTuning,
    AggressiveTuning,
}

/// Transition order; state changes move one step at a time.
pub const STATE_ORDER: [AutopilotState; 4] = [
    AutopilotState::Stable,
    AutopilotState::SoftTuning,
    AutopilotState::BalancedTuning,
    AutopilotState::AggressiveTuning,
];

impl AutopilotState {
    /// Position in the aggressiveness order.
    pub fn index(&self) -> usize {
        STATE_ORDER.iter().position(|s| s == self).unwrap()
    }

    /// Next more aggressive state, if any.
    pub fn escalated(&self) -> Option<AutopilotState> {
        STATE_ORDER.get(self.index() + 1).copied()
    }

    /// Next less aggressive state, if any.
    pub fn deescalated(&self) -> Option<AutopilotState> {
        self.index().checked_sub(1).map(|i| STATE_ORDER[i])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AutopilotState::Stable => "stable",
            AutopilotState::SoftTuning => "soft_tuning",
            AutopilotState::BalancedTuning => "balanced_tuning",
            AutopilotState::AggressiveTuning => "aggressive_tuning",
        }
    }

    /// Display label for user-facing text.
    pub fn label(&self) -> &'static str {
        match self {
            AutopilotState::Stable => "Stable",
            AutopilotState::SoftTuning => "Soft Tuning",
            AutopilotState::BalancedTuning => "Balanced Tuning",
            AutopilotState::AggressiveTuning => "Aggressive Tuning",
        }
    }
}

impl std::fmt::Display for AutopilotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing preset that shifts escalation sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutopilotMode {
    Speed,
    #[default]
    Balanced,
    Accuracy,
}

/// Threshold preset for one mode, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeThresholds {
    pub escalate_gpu: f64,
    pub deescalate_gpu: f64,
    pub escalate_fps_drop_pct: f64,
    pub deescalate_fps_recovery_pct: f64,
}

impl AutopilotMode {
    /// Threshold table keyed by mode.
    pub fn thresholds(&self) -> ModeThresholds {
        match self {
            AutopilotMode::Speed => ModeThresholds {
                escalate_gpu: 80.0,
                deescalate_gpu: 60.0,
                escalate_fps_drop_pct: 15.0,
                deescalate_fps_recovery_pct: 10.0,
            },
            AutopilotMode::Balanced => ModeThresholds {
                escalate_gpu: 90.0,
                deescalate_gpu: 70.0,
                escalate_fps_drop_pct: 25.0,
                deescalate_fps_recovery_pct: 15.0,
            },
            AutopilotMode::Accuracy => ModeThresholds {
                escalate_gpu: 95.0,
                deescalate_gpu: 80.0,
                escalate_fps_drop_pct: 35.0,
                deescalate_fps_recovery_pct: 25.0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AutopilotMode::Speed => "speed",
            AutopilotMode::Balanced => "balanced",
            AutopilotMode::Accuracy => "accuracy",
        }
    }
}

impl std::fmt::Display for AutopilotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AutopilotMode {
    type Err = crate::error::EdgeTuneError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "speed" => Ok(AutopilotMode::Speed),
            "balanced" => Ok(AutopilotMode::Balanced),
            "accuracy" => Ok(AutopilotMode::Accuracy),
            other => Err(crate::error::EdgeTuneError::InvalidInput(format!(
                "unknown autopilot mode: {other}"
            ))),
        }
    }
}

/// Telemetry excerpt captured at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTelemetry {
    pub gpu_util: f64,
    pub fps: f64,
    pub vram_used: f64,
}

/// Immutable record of one optimization transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationDecision {
    /// Unix seconds; also the key used for explanation requests
    pub timestamp: f64,
    pub previous_state: AutopilotState,
    pub new_state: AutopilotState,
    pub action: String,
    pub reason: String,
    pub params_applied: InferenceParams,
    pub telemetry_summary: DecisionTelemetry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order_and_adjacency() {
        assert_eq!(AutopilotState::Stable.index(), 0);
        assert_eq!(AutopilotState::AggressiveTuning.index(), 3);
        assert_eq!(
            AutopilotState::Stable.escalated(),
            Some(AutopilotState::SoftTuning)
        );
        assert_eq!(AutopilotState::AggressiveTuning.escalated(), None);
        assert_eq!(AutopilotState::Stable.deescalated(), None);
        assert_eq!(
            AutopilotState::BalancedTuning.deescalated(),
            Some(AutopilotState::SoftTuning)
        );
        assert!(AutopilotState::Stable < AutopilotState::AggressiveTuning);
    }

    #[test]
    fn test_mode_threshold_table() {
        let speed = AutopilotMode::Speed.thresholds();
        assert_eq!(speed.escalate_gpu, 80.0);
        assert_eq!(speed.deescalate_fps_recovery_pct, 10.0);

        let balanced = AutopilotMode::Balanced.thresholds();
        assert_eq!(balanced.escalate_gpu, 90.0);
        assert_eq!(balanced.deescalate_gpu, 70.0);
        assert_eq!(balanced.escalate_fps_drop_pct, 25.0);

        let accuracy = AutopilotMode::Accuracy.thresholds();
        assert_eq!(accuracy.escalate_gpu, 95.0);
        assert_eq!(accuracy.deescalate_fps_recovery_pct, 25.0);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("speed".parse::<AutopilotMode>().unwrap(), AutopilotMode::Speed);
        assert!("turbo".parse::<AutopilotMode>().is_err());
    }

    #[test]
    fn test_state_serde_wire_names() {
        let json = serde_json::to_string(&AutopilotState::SoftTuning).unwrap();
        assert_eq!(json, "\"soft_tuning\"");
        let parsed: AutopilotState = serde_json::from_str("\"aggressive_tuning\"").unwrap();
        assert_eq!(parsed, AutopilotState::AggressiveTuning);
    }

    #[test]
    fn test_decision_serialization_roundtrip() {
        let decision = OptimizationDecision {
            timestamp: 1723000000.123,
            previous_state: AutopilotState::Stable,
            new_state: AutopilotState::SoftTuning,
            action: "enable_fp16".into(),
            reason: "Escalate triggered: GPU 95%, FPS 30.0, VRAM 5.0/8.0 GB".into(),
            params_applied: InferenceParams::default(),
            telemetry_summary: DecisionTelemetry {
                gpu_util: 95.0,
                fps: 30.0,
                vram_used: 5.0,
            },
        };
        let json = serde_json::to_string(&decision).unwrap();
        let parsed: OptimizationDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, decision);
    }
}
