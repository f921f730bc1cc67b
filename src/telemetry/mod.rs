// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Telemetry sampling: periodic GPU / system metrics collection
//!
//! A background task samples hardware sensors at a fixed interval and
//! appends snapshots to a bounded rolling history. Inference metrics
//! (FPS, latency) are injected externally by the pipeline so the
//! per-frame compute path never blocks on the sampling cadence.

mod monitor;
mod sensor;

pub use monitor::{TelemetryMonitor, DEFAULT_HISTORY_SIZE, DEFAULT_SAMPLING_INTERVAL_MS};
pub use sensor::{GpuReading, GpuSensor, NullSensor, NvidiaSmiSensor};

use serde::{Deserialize, Serialize};

/// Single point-in-time telemetry reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Unix seconds
    pub timestamp: f64,
    /// 0–100
    pub gpu_utilization_pct: f64,
    pub vram_used_gb: f64,
    pub vram_total_gb: f64,
    /// 0–100
    pub cpu_utilization_pct: f64,
    pub ram_used_gb: f64,
    /// Inference FPS, injected externally
    pub fps: f64,
    /// Per-frame latency in ms, injected externally
    pub latency_ms: f64,
}

/// Average metrics over the current history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub avg_fps: f64,
    pub avg_gpu_util: f64,
    pub avg_vram_used_gb: f64,
    pub avg_cpu_util: f64,
    pub duration_sec: f64,
}
