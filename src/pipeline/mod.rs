// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Pipeline orchestrator
//!
//! Drives the frame loop and ties the subsystems together on two
//! cadences: per-frame (as fast as the detector allows) and periodic
//! (default 500 ms) for telemetry, autopilot evaluation and event
//! publication. The loop yields between iterations so the sampler
//! task never starves, and the explanation request is fire-and-forget
//! so its latency never delays the next frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::advisor::Advisor;
use crate::autopilot::{AutopilotController, AutopilotMode, ControllerStatus, OptimizationDecision};
use crate::events::{EventBus, PipelineEvent};
use crate::hardware::HardwareProfile;
use crate::inference::InferenceEngine;
use crate::llm::LlmAnalyst;
use crate::source::{FrameSource, ProcessingMode, SourceType};
use crate::telemetry::TelemetryMonitor;
use crate::utils::unix_now;

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval between telemetry/decision/suggestion publications
    pub broadcast_interval_ms: u64,
    /// Publish annotated frames when subscribers are present
    pub stream_video: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            broadcast_interval_ms: 500,
            stream_video: true,
        }
    }
}

struct PipelineShared {
    engine: Arc<InferenceEngine>,
    telemetry: Arc<TelemetryMonitor>,
    controller: Mutex<AutopilotController>,
    advisor: Mutex<Advisor>,
    analyst: Arc<LlmAnalyst>,
    hardware: Arc<HardwareProfile>,
    bus: EventBus,
    config: PipelineConfig,
    running: AtomicBool,
}

/// Orchestrates source → engine → telemetry → autopilot → publication.
pub struct InferencePipeline {
    shared: Arc<PipelineShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl InferencePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Arc<InferenceEngine>,
        telemetry: Arc<TelemetryMonitor>,
        controller: AutopilotController,
        advisor: Advisor,
        analyst: Arc<LlmAnalyst>,
        hardware: Arc<HardwareProfile>,
        bus: EventBus,
        config: PipelineConfig,
    ) -> Self {
        InferencePipeline {
            shared: Arc::new(PipelineShared {
                engine,
                telemetry,
                controller: Mutex::new(controller),
                advisor: Mutex::new(advisor),
                analyst,
                hardware,
                bus,
                config,
                running: AtomicBool::new(false),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start the loop on the given source. An already-running pipeline
    /// is stopped first.
    pub fn start(&self, source: Box<dyn FrameSource>, processing_mode: ProcessingMode) {
        if self.shared.running.load(Ordering::SeqCst) {
            self.stop();
        }

        self.shared
            .controller
            .lock()
            .unwrap()
            .set_benchmark(processing_mode == ProcessingMode::Benchmark);

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            run_loop(shared, source).await;
        });
        *self.task.lock().unwrap() = Some(handle);
        info!("Pipeline started (mode={processing_mode:?})");
    }

    /// Stop the loop. Safe to call from outside the loop's own task
    /// and safe to repeat.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
        info!("Pipeline stopped.");
    }

    /// Wait for the loop task to finish (end-of-stream or stop).
    pub async fn wait(&self) {
        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Swap the autopilot threshold preset.
    pub fn set_mode(&self, mode: AutopilotMode) {
        self.shared.controller.lock().unwrap().set_mode(mode);
    }

    /// Introspection snapshot of the controller.
    pub fn status(&self) -> ControllerStatus {
        self.shared.controller.lock().unwrap().status()
    }

    /// Recent optimization decisions, oldest first.
    pub fn recent_decisions(&self, n: usize) -> Vec<OptimizationDecision> {
        self.shared.controller.lock().unwrap().recent_decisions(n)
    }

    /// Register an event listener.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.shared.bus.subscribe()
    }
}

impl Drop for InferencePipeline {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

async fn run_loop(shared: Arc<PipelineShared>, mut source: Box<dyn FrameSource>) {
    let broadcast_interval = Duration::from_millis(shared.config.broadcast_interval_ms);
    let mut last_broadcast: Option<Instant> = None;

    while shared.running.load(Ordering::SeqCst) {
        match source.read().await {
            Some(frame) => match shared.engine.run_frame(&frame) {
                Ok(result) => {
                    let stats = shared.engine.stats();
                    shared
                        .telemetry
                        .update_inference_metrics(stats.fps, stats.avg_latency_ms);

                    // Skip the frame event entirely when nobody is
                    // listening; encoding is the expensive part.
                    if shared.config.stream_video && shared.bus.subscriber_count() > 0 {
                        if let Some(annotated) = result.annotated {
                            shared.bus.publish(PipelineEvent::VideoFrame {
                                data: annotated,
                                timestamp: unix_now(),
                            });
                        }
                    }
                }
                Err(e) => warn!("Inference failed on frame {}: {e}", frame.index),
            },
            None => {
                if source.is_paused() {
                    // Paused: wait briefly and retry, never terminate.
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }

                if source.metadata().source_type == SourceType::File {
                    info!("End of video stream reached.");
                    publish_completed(&shared);
                    shared.running.store(false, Ordering::SeqCst);
                    break;
                }

                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }
        }

        let due = last_broadcast.map_or(true, |t| t.elapsed() >= broadcast_interval);
        if due {
            last_broadcast = Some(Instant::now());
            periodic_tick(&shared, source.as_ref());
        }

        // Yield so the sampler and subscribers get scheduled.
        tokio::task::yield_now().await;
    }
}

/// One periodic cadence tick: publish telemetry, evaluate the
/// controller and advisor, publish progress.
fn periodic_tick(shared: &Arc<PipelineShared>, source: &dyn FrameSource) {
    if let Some(snapshot) = shared.telemetry.latest() {
        shared
            .bus
            .publish(PipelineEvent::Telemetry(snapshot.clone()));

        // The periodic tick is the controller's only writer.
        let decision = shared.controller.lock().unwrap().evaluate(&snapshot);
        if let Some(decision) = decision {
            shared
                .bus
                .publish(PipelineEvent::AutopilotDecision(decision.clone()));
            spawn_explanation(shared, decision);
        }

        let status = shared.controller.lock().unwrap().status();
        let suggestion = shared.advisor.lock().unwrap().evaluate(&snapshot, &status);
        if let Some(suggestion) = suggestion {
            shared
                .bus
                .publish(PipelineEvent::AdvisorSuggestion(suggestion));
        }
    }

    let metadata = source.metadata();
    if metadata.total_frames.is_some() {
        shared.bus.publish(PipelineEvent::SourceProgress {
            progress: source.progress(),
            frame: source.frame_number(),
            total: metadata.total_frames,
            paused: source.is_paused(),
        });
    }
}

/// Dispatch the explanation request without awaiting it; the loop must
/// never block on the LLM. Failures inside degrade to the canned text,
/// and an abandoned task is simply dropped at shutdown.
fn spawn_explanation(shared: &Arc<PipelineShared>, decision: OptimizationDecision) {
    let analyst = Arc::clone(&shared.analyst);
    let hardware = Arc::clone(&shared.hardware);
    let bus = shared.bus.clone();
    tokio::spawn(async move {
        let text = analyst.explain(&decision, &hardware).await;
        bus.publish(PipelineEvent::LlmExplanation {
            text,
            decision_id: format!("{:.3}", decision.timestamp),
            timestamp: unix_now(),
        });
    });
}

fn publish_completed(shared: &Arc<PipelineShared>) {
    let summary = shared.telemetry.summary();
    let mut message = "Video analysis finished.".to_string();
    if let Some(summary) = &summary {
        message.push_str(&format!(
            " Avg FPS: {:.1} | GPU: {:.1}%",
            summary.avg_fps, summary.avg_gpu_util
        ));
    }
    shared.bus.publish(PipelineEvent::Status {
        status: "completed".to_string(),
        message,
        summary,
    });
}
