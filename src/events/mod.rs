// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Event publication: best-effort fan-out to external listeners
//!
//! The pipeline publishes typed events onto a broadcast channel; the
//! transport layer (REST/WebSocket, out of scope here) subscribes and
//! forwards them. Publication never blocks the loop: with no
//! subscribers a publish is dropped, and a lagged subscriber loses old
//! events instead of stalling everyone else.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::advisor::AdvisorSuggestion;
use crate::autopilot::OptimizationDecision;
use crate::telemetry::{TelemetrySnapshot, TelemetrySummary};

/// Default broadcast channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Everything the pipeline publishes, in its wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PipelineEvent {
    Telemetry(TelemetrySnapshot),
    AutopilotDecision(OptimizationDecision),
    AdvisorSuggestion(AdvisorSuggestion),
    SourceProgress {
        /// 0.0 – 1.0
        progress: f64,
        frame: u64,
        total: Option<u64>,
        paused: bool,
    },
    LlmExplanation {
        text: String,
        /// The decision's timestamp, stringified
        decision_id: String,
        timestamp: f64,
    },
    Status {
        status: String,
        message: String,
        summary: Option<TelemetrySummary>,
    },
    VideoFrame {
        data: Vec<u8>,
        timestamp: f64,
    },
}

/// Fan-out handle shared by the pipeline and its listeners.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus { sender }
    }

    /// Register a new listener.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Publish best-effort; a send with no subscribers is simply
    /// dropped.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers. The pipeline uses this to skip
    /// expensive frame encoding when nobody is listening.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::SuggestionCategory;
    use crate::autopilot::{AutopilotState, DecisionTelemetry};
    use crate::inference::InferenceParams;
    use crate::utils::unix_now;

    fn sample_snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            timestamp: 1723000000.25,
            gpu_utilization_pct: 87.5,
            vram_used_gb: 5.25,
            vram_total_gb: 12.0,
            cpu_utilization_pct: 33.0,
            ram_used_gb: 9.5,
            fps: 28.4,
            latency_ms: 35.2,
        }
    }

    #[test]
    fn test_telemetry_event_roundtrip() {
        let event = PipelineEvent::Telemetry(sample_snapshot());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"telemetry\""));
        let parsed: PipelineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_decision_event_roundtrip() {
        let event = PipelineEvent::AutopilotDecision(OptimizationDecision {
            timestamp: unix_now(),
            previous_state: AutopilotState::SoftTuning,
            new_state: AutopilotState::BalancedTuning,
            action: "reduce_resolution_544".into(),
            reason: "Escalate triggered: GPU 96%, FPS 21.0, VRAM 6.1/12.0 GB".into(),
            params_applied: InferenceParams {
                input_size: (544, 544),
                half_precision: true,
                ..Default::default()
            },
            telemetry_summary: DecisionTelemetry {
                gpu_util: 96.0,
                fps: 21.0,
                vram_used: 6.1,
            },
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"autopilot_decision\""));
        let parsed: PipelineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_suggestion_and_progress_roundtrip() {
        for event in [
            PipelineEvent::AdvisorSuggestion(AdvisorSuggestion {
                text: "System is well-optimised".into(),
                category: SuggestionCategory::Status,
                timestamp: 1723000001.5,
            }),
            PipelineEvent::SourceProgress {
                progress: 0.42,
                frame: 126,
                total: Some(300),
                paused: false,
            },
            PipelineEvent::Status {
                status: "completed".into(),
                message: "Video analysis finished.".into(),
                summary: None,
            },
        ] {
            let json = serde_json::to_string(&event).unwrap();
            let parsed: PipelineEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, event);
        }
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(PipelineEvent::Telemetry(sample_snapshot()));
        let received = rx.recv().await.unwrap();
        assert_eq!(received, PipelineEvent::Telemetry(sample_snapshot()));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        // Must not panic or block.
        bus.publish(PipelineEvent::Status {
            status: "running".into(),
            message: "no one listening".into(),
            summary: None,
        });
    }

    #[tokio::test]
    async fn test_subscriber_count_tracks_drops() {
        let bus = EventBus::new(8);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
