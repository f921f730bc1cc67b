// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Background telemetry monitor
//!
//! Owns the rolling snapshot history and the periodic sampling task.
//! The history mutex is scoped to the read/append operation only and
//! is never held across a sensor read or an await point.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysinfo::System;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::sensor::{GpuReading, GpuSensor};
use super::{TelemetrySnapshot, TelemetrySummary};
use crate::utils::{bytes_to_gb, unix_now};

/// Default sampling interval.
pub const DEFAULT_SAMPLING_INTERVAL_MS: u64 = 500;
/// Default rolling history capacity.
pub const DEFAULT_HISTORY_SIZE: usize = 3600;

#[derive(Debug, Clone, Copy, Default)]
struct InferenceMetrics {
    fps: f64,
    latency_ms: f64,
}

struct MonitorShared {
    history: Mutex<VecDeque<TelemetrySnapshot>>,
    history_size: usize,
    metrics: Mutex<InferenceMetrics>,
    sensor: Box<dyn GpuSensor>,
    system: Mutex<System>,
}

/// Async background service sampling hardware metrics into a rolling
/// window of [`TelemetrySnapshot`]s.
pub struct TelemetryMonitor {
    shared: Arc<MonitorShared>,
    interval: Duration,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TelemetryMonitor {
    pub fn new(sampling_interval_ms: u64, history_size: usize, sensor: Box<dyn GpuSensor>) -> Self {
        TelemetryMonitor {
            shared: Arc::new(MonitorShared {
                history: Mutex::new(VecDeque::with_capacity(history_size.min(4096))),
                history_size,
                metrics: Mutex::new(InferenceMetrics::default()),
                sensor,
                system: Mutex::new(System::new()),
            }),
            interval: Duration::from_millis(sampling_interval_ms),
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Launch the background sampling loop. No-op if already running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.running);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                Self::sample_into(&shared);
            }
        });

        *self.task.lock().unwrap() = Some(handle);
        info!(
            "Telemetry monitor started (interval={} ms)",
            self.interval.as_millis()
        );
    }

    /// Signal the sampling loop to halt and cancel in-flight work.
    /// Safe to call multiple times.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
        info!("Telemetry monitor stopped.");
    }

    /// Inject the most recent inference throughput numbers. Called by
    /// the pipeline after each frame; merged into subsequent samples.
    pub fn update_inference_metrics(&self, fps: f64, latency_ms: f64) {
        let mut metrics = self.shared.metrics.lock().unwrap();
        metrics.fps = fps;
        metrics.latency_ms = latency_ms;
    }

    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.shared.history.lock().unwrap().back().cloned()
    }

    /// Most recent `n` snapshots, oldest first.
    pub fn history(&self, n: usize) -> Vec<TelemetrySnapshot> {
        let history = self.shared.history.lock().unwrap();
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }

    /// Arithmetic means over the current history. `None` when empty.
    pub fn summary(&self) -> Option<TelemetrySummary> {
        let snaps: Vec<TelemetrySnapshot> = {
            let history = self.shared.history.lock().unwrap();
            history.iter().cloned().collect()
        };
        if snaps.is_empty() {
            return None;
        }

        let count = snaps.len() as f64;
        Some(TelemetrySummary {
            avg_fps: snaps.iter().map(|s| s.fps).sum::<f64>() / count,
            avg_gpu_util: snaps.iter().map(|s| s.gpu_utilization_pct).sum::<f64>() / count,
            avg_vram_used_gb: snaps.iter().map(|s| s.vram_used_gb).sum::<f64>() / count,
            avg_cpu_util: snaps.iter().map(|s| s.cpu_utilization_pct).sum::<f64>() / count,
            duration_sec: snaps.last().unwrap().timestamp - snaps.first().unwrap().timestamp,
        })
    }

    /// Take one sample immediately and append it to the history.
    ///
    /// The periodic task calls this on every tick; tests call it
    /// directly to avoid real timers.
    pub fn sample_once(&self) {
        Self::sample_into(&self.shared);
    }

    fn sample_into(shared: &MonitorShared) {
        // Sensor failure degrades to zeroed GPU fields; telemetry
        // degradation must not crash the pipeline.
        let gpu = match shared.sensor.sample() {
            Ok(reading) => reading,
            Err(e) => {
                debug!("GPU telemetry read failed, reporting zeros: {e}");
                GpuReading::default()
            }
        };

        let (cpu_pct, ram_used_gb) = {
            let mut sys = shared.system.lock().unwrap();
            sys.refresh_cpu_usage();
            sys.refresh_memory();
            (sys.global_cpu_usage() as f64, bytes_to_gb(sys.used_memory()))
        };

        let metrics = *shared.metrics.lock().unwrap();

        let snapshot = TelemetrySnapshot {
            timestamp: unix_now(),
            gpu_utilization_pct: gpu.utilization_pct,
            vram_used_gb: gpu.vram_used_gb,
            vram_total_gb: gpu.vram_total_gb,
            cpu_utilization_pct: cpu_pct,
            ram_used_gb,
            fps: metrics.fps,
            latency_ms: metrics.latency_ms,
        };

        let mut history = shared.history.lock().unwrap();
        if history.len() == shared.history_size {
            history.pop_front();
        }
        history.push_back(snapshot);
    }
}

impl Drop for TelemetryMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EdgeTuneError;
    use crate::telemetry::NullSensor;

    struct FixedSensor(GpuReading);

    impl GpuSensor for FixedSensor {
        fn sample(&self) -> crate::error::Result<GpuReading> {
            Ok(self.0)
        }
    }

    struct FailingSensor;

    impl GpuSensor for FailingSensor {
        fn sample(&self) -> crate::error::Result<GpuReading> {
            Err(EdgeTuneError::Hardware("sensor gone".into()))
        }
    }

    fn fixed_monitor(history_size: usize, util: f64) -> TelemetryMonitor {
        TelemetryMonitor::new(
            DEFAULT_SAMPLING_INTERVAL_MS,
            history_size,
            Box::new(FixedSensor(GpuReading {
                utilization_pct: util,
                vram_used_gb: 3.0,
                vram_total_gb: 8.0,
            })),
        )
    }

    #[test]
    fn test_empty_history() {
        let monitor = fixed_monitor(16, 50.0);
        assert!(monitor.latest().is_none());
        assert!(monitor.history(10).is_empty());
        assert!(monitor.summary().is_none());
    }

    #[test]
    fn test_sample_appends_and_merges_metrics() {
        let monitor = fixed_monitor(16, 42.0);
        monitor.update_inference_metrics(27.5, 36.0);
        monitor.sample_once();

        let snap = monitor.latest().unwrap();
        assert!((snap.gpu_utilization_pct - 42.0).abs() < f64::EPSILON);
        assert!((snap.fps - 27.5).abs() < f64::EPSILON);
        assert!((snap.latency_ms - 36.0).abs() < f64::EPSILON);
        assert!(snap.timestamp > 0.0);
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let monitor = fixed_monitor(3, 10.0);
        for i in 0..5 {
            monitor.update_inference_metrics(i as f64, 0.0);
            monitor.sample_once();
        }

        let history = monitor.history(10);
        assert_eq!(history.len(), 3);
        // Oldest two (fps 0 and 1) evicted.
        assert!((history[0].fps - 2.0).abs() < f64::EPSILON);
        assert!((history[2].fps - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_history_n_returns_most_recent() {
        let monitor = fixed_monitor(8, 10.0);
        for i in 0..5 {
            monitor.update_inference_metrics(i as f64, 0.0);
            monitor.sample_once();
        }
        let last_two = monitor.history(2);
        assert_eq!(last_two.len(), 2);
        assert!((last_two[0].fps - 3.0).abs() < f64::EPSILON);
        assert!((last_two[1].fps - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_averages() {
        let monitor = fixed_monitor(8, 60.0);
        monitor.update_inference_metrics(20.0, 10.0);
        monitor.sample_once();
        monitor.update_inference_metrics(30.0, 10.0);
        monitor.sample_once();

        let summary = monitor.summary().unwrap();
        assert!((summary.avg_fps - 25.0).abs() < f64::EPSILON);
        assert!((summary.avg_gpu_util - 60.0).abs() < f64::EPSILON);
        assert!((summary.avg_vram_used_gb - 3.0).abs() < f64::EPSILON);
        assert!(summary.duration_sec >= 0.0);
    }

    #[test]
    fn test_failed_sensor_reports_zeros() {
        let monitor = TelemetryMonitor::new(500, 4, Box::new(FailingSensor));
        monitor.update_inference_metrics(15.0, 5.0);
        monitor.sample_once();

        let snap = monitor.latest().unwrap();
        assert_eq!(snap.gpu_utilization_pct, 0.0);
        assert_eq!(snap.vram_used_gb, 0.0);
        assert_eq!(snap.vram_total_gb, 0.0);
        // Injected metrics survive sensor failure.
        assert!((snap.fps - 15.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_is_safe() {
        let monitor = TelemetryMonitor::new(10, 4, Box::new(NullSensor));
        monitor.start();
        monitor.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.stop();
        monitor.stop();
        assert!(monitor.latest().is_some());
    }
}
