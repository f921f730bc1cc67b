// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Hysteresis FSM controller
//!
//! The controller never sets FPS directly. It adjusts execution
//! parameters one aggressiveness step at a time; throughput changes
//! are a side-effect.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use super::{
    AutopilotMode, AutopilotState, DecisionTelemetry, ModeThresholds, OptimizationDecision,
};
use crate::hardware::{HardwareProfile, PerformanceTier};
use crate::inference::{InferenceParams, ParameterSink, LIGHTEST_VARIANT};
use crate::telemetry::TelemetrySnapshot;
use crate::utils::unix_now;

/// Controller tunables. Defaults mirror the shipped configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub mode: AutopilotMode,
    pub cooldown_seconds: f64,
    pub escalate_ticks: u32,
    pub deescalate_ticks: u32,
    pub warmup_ticks: u32,
    pub decision_log_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            mode: AutopilotMode::Balanced,
            cooldown_seconds: 5.0,
            escalate_ticks: 3,
            deescalate_ticks: 5,
            warmup_ticks: 5,
            decision_log_size: 50,
        }
    }
}

/// Public introspection snapshot of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub state: AutopilotState,
    pub mode: AutopilotMode,
    pub baseline_fps: Option<f64>,
    pub is_benchmark: bool,
    pub tier: PerformanceTier,
    pub current_params: InferenceParams,
}

enum Direction {
    Escalate,
    Deescalate,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Escalate => "Escalate",
            Direction::Deescalate => "Deescalate",
        }
    }
}

/// Finite-state machine that evaluates telemetry and tunes inference
/// parameters across the soft → balanced → aggressive hierarchy.
pub struct AutopilotController {
    hardware: Arc<HardwareProfile>,
    sink: Arc<dyn ParameterSink>,
    mode: AutopilotMode,
    cooldown: Duration,
    escalate_ticks_needed: u32,
    deescalate_ticks_needed: u32,
    is_benchmark: bool,

    state: AutopilotState,
    last_transition: Option<Instant>,
    escalate_streak: u32,
    deescalate_streak: u32,

    // Baseline FPS, set once after warm-up and never recomputed.
    baseline_fps: Option<f64>,
    warmup_seen: u32,
    warmup_target: u32,

    decisions: VecDeque<OptimizationDecision>,
    decision_log_size: usize,
}

impl AutopilotController {
    pub fn new(
        hardware: Arc<HardwareProfile>,
        sink: Arc<dyn ParameterSink>,
        config: ControllerConfig,
    ) -> Self {
        AutopilotController {
            hardware,
            sink,
            mode: config.mode,
            cooldown: Duration::from_secs_f64(config.cooldown_seconds),
            escalate_ticks_needed: config.escalate_ticks,
            deescalate_ticks_needed: config.deescalate_ticks,
            is_benchmark: false,
            state: AutopilotState::Stable,
            last_transition: None,
            escalate_streak: 0,
            deescalate_streak: 0,
            baseline_fps: None,
            warmup_seen: 0,
            warmup_target: config.warmup_ticks,
            decisions: VecDeque::new(),
            decision_log_size: config.decision_log_size.max(1),
        }
    }

    /// Evaluate a telemetry snapshot and possibly transition state.
    ///
    /// Returns a decision only when a transition was actually applied.
    pub fn evaluate(&mut self, snapshot: &TelemetrySnapshot) -> Option<OptimizationDecision> {
        // Warm-up: consume snapshots until throughput stabilises, then
        // freeze the baseline. Without a baseline the controller is
        // inert.
        if self.baseline_fps.is_none() {
            self.warmup_seen += 1;
            if self.warmup_seen >= self.warmup_target && snapshot.fps > 0.0 {
                self.baseline_fps = Some(snapshot.fps);
                info!("Autopilot baseline FPS set to {:.1}", snapshot.fps);
            }
            return None;
        }

        let thresholds = self.mode.thresholds();
        let should_escalate = self.should_escalate(snapshot, &thresholds);
        let should_deescalate = self.should_deescalate(snapshot, &thresholds);

        // Hysteresis streaks
        if should_escalate {
            self.escalate_streak += 1;
            self.deescalate_streak = 0;
        } else if should_deescalate {
            self.deescalate_streak += 1;
            self.escalate_streak = 0;
        } else {
            self.escalate_streak = 0;
            self.deescalate_streak = 0;
        }

        // Cooldown gate: streaks keep accumulating across gated ticks.
        if let Some(last) = self.last_transition {
            if last.elapsed() < self.cooldown {
                return None;
            }
        }

        let decision = if self.escalate_streak >= self.escalate_ticks_needed {
            self.step(Direction::Escalate, snapshot)
        } else if self.deescalate_streak >= self.deescalate_ticks_needed {
            self.step(Direction::Deescalate, snapshot)
        } else {
            None
        };

        if let Some(decision) = decision {
            self.last_transition = Some(Instant::now());
            self.escalate_streak = 0;
            self.deescalate_streak = 0;
            if self.decisions.len() == self.decision_log_size {
                self.decisions.pop_front();
            }
            self.decisions.push_back(decision.clone());
            return Some(decision);
        }
        None
    }

    /// Swap the active threshold preset. FSM state and streaks are
    /// untouched.
    pub fn set_mode(&mut self, mode: AutopilotMode) {
        self.mode = mode;
        info!("Autopilot mode changed to: {mode}");
    }

    /// Record whether the pipeline runs in maximum-throughput mode.
    /// Exposed for introspection and explanations only.
    pub fn set_benchmark(&mut self, enabled: bool) {
        self.is_benchmark = enabled;
    }

    pub fn state(&self) -> AutopilotState {
        self.state
    }

    pub fn mode(&self) -> AutopilotMode {
        self.mode
    }

    pub fn baseline_fps(&self) -> Option<f64> {
        self.baseline_fps
    }

    /// Most recent `n` decisions, oldest first.
    pub fn recent_decisions(&self, n: usize) -> Vec<OptimizationDecision> {
        let skip = self.decisions.len().saturating_sub(n);
        self.decisions.iter().skip(skip).cloned().collect()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            state: self.state,
            mode: self.mode,
            baseline_fps: self.baseline_fps,
            is_benchmark: self.is_benchmark,
            tier: self.hardware.tier,
            current_params: self.sink.current_params(),
        }
    }

    fn should_escalate(&self, snap: &TelemetrySnapshot, t: &ModeThresholds) -> bool {
        let gpu_hot = snap.gpu_utilization_pct > t.escalate_gpu;

        let fps_dropped = match self.baseline_fps {
            Some(baseline) if baseline > 0.0 => {
                let drop_pct = (1.0 - snap.fps / baseline) * 100.0;
                drop_pct > t.escalate_fps_drop_pct
            }
            _ => false,
        };

        gpu_hot || fps_dropped
    }

    fn should_deescalate(&self, snap: &TelemetrySnapshot, t: &ModeThresholds) -> bool {
        if self.state == AutopilotState::Stable {
            return false; // already at minimum
        }

        let gpu_cool = snap.gpu_utilization_pct < t.deescalate_gpu;

        let fps_recovered = match self.baseline_fps {
            Some(baseline) if baseline > 0.0 => {
                let drop_pct = (1.0 - snap.fps / baseline) * 100.0;
                drop_pct < t.deescalate_fps_recovery_pct
            }
            _ => false,
        };

        gpu_cool && fps_recovered
    }

    /// Move one state in the given direction and apply the target
    /// state's parameter template.
    ///
    /// If the sink rejects the parameters the FSM stays at its current
    /// state, no decision is emitted, and the cooldown timer restarts
    /// so the retry is paced.
    fn step(
        &mut self,
        direction: Direction,
        snap: &TelemetrySnapshot,
    ) -> Option<OptimizationDecision> {
        let target = match direction {
            Direction::Escalate => self.state.escalated(),
            Direction::Deescalate => self.state.deescalated(),
        }?;

        let (action, params) = self.template_for(target);
        if let Err(e) = self.sink.configure(&params) {
            warn!(
                "Parameter apply failed moving {} -> {}: {e}; keeping {}",
                self.state, target, self.state
            );
            self.last_transition = Some(Instant::now());
            self.escalate_streak = 0;
            self.deescalate_streak = 0;
            return None;
        }

        let previous = self.state;
        self.state = target;

        Some(OptimizationDecision {
            timestamp: unix_now(),
            previous_state: previous,
            new_state: target,
            action,
            reason: build_reason(snap, direction.as_str()),
            params_applied: params,
            telemetry_summary: DecisionTelemetry {
                gpu_util: snap.gpu_utilization_pct,
                fps: snap.fps,
                vram_used: snap.vram_used_gb,
            },
        })
    }

    /// Map an FSM state to its fixed parameter template. The model
    /// variant is preserved from the current configuration unless the
    /// state overrides it.
    fn template_for(&self, state: AutopilotState) -> (String, InferenceParams) {
        let current_variant = self.sink.current_params().model_variant;
        let fp16 = self.hardware.fp16_supported;
        let low_tier = self.hardware.tier == PerformanceTier::Low;

        match state {
            AutopilotState::Stable => (
                "restore_defaults".to_string(),
                InferenceParams {
                    input_size: (640, 640),
                    half_precision: false,
                    process_every_n_frames: 1,
                    model_variant: current_variant,
                    ..Default::default()
                },
            ),
            AutopilotState::SoftTuning => (
                if fp16 { "enable_fp16" } else { "soft_tuning" }.to_string(),
                InferenceParams {
                    input_size: (640, 640),
                    half_precision: fp16,
                    process_every_n_frames: 1,
                    model_variant: current_variant,
                    ..Default::default()
                },
            ),
            AutopilotState::BalancedTuning => {
                let size = if low_tier { (480, 480) } else { (544, 544) };
                (
                    format!("reduce_resolution_{}", size.0),
                    InferenceParams {
                        input_size: size,
                        half_precision: fp16,
                        process_every_n_frames: 1,
                        model_variant: current_variant,
                        ..Default::default()
                    },
                )
            }
            AutopilotState::AggressiveTuning => {
                let size = if low_tier { (416, 416) } else { (480, 480) };
                (
                    "aggressive_skip_frames_and_downscale".to_string(),
                    InferenceParams {
                        input_size: size,
                        half_precision: fp16,
                        process_every_n_frames: 2,
                        // Always fall back to the lightest variant.
                        model_variant: LIGHTEST_VARIANT.to_string(),
                        ..Default::default()
                    },
                )
            }
        }
    }
}

fn build_reason(snap: &TelemetrySnapshot, direction: &str) -> String {
    format!(
        "{direction} triggered: GPU {:.0}%, FPS {:.1}, VRAM {:.1}/{:.1} GB",
        snap.gpu_utilization_pct, snap.fps, snap.vram_used_gb, snap.vram_total_gb
    )
}
