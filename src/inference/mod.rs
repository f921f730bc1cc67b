// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Inference execution surface
//!
//! Hot-reconfigurable execution parameters, the external [`Detector`]
//! capability boundary, and the [`InferenceEngine`] wrapper that owns
//! frame-skip gating and throughput accounting. The model itself is
//! arbitrary heavy compute behind the trait; this crate never touches
//! weights.

mod engine;
mod simulated;

pub use engine::{EngineStats, InferenceEngine, ParameterSink};
pub use simulated::SimulatedDetector;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The lightest known model variant; the aggressive tuning state
/// always falls back to it.
pub const LIGHTEST_VARIANT: &str = "yolov8n";

/// Known model variants, lightest first.
pub const VARIANT_LADDER: [&str; 3] = ["yolov8n", "yolov8s", "yolov8m"];

/// Next heavier variant on the ladder, if any.
pub fn next_heavier_variant(variant: &str) -> Option<&'static str> {
    match variant {
        "yolov8n" => Some("yolov8s"),
        "yolov8s" => Some("yolov8m"),
        _ => None,
    }
}

/// Hot-reconfigurable inference parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    /// Input resolution (width, height)
    pub input_size: (u32, u32),
    pub confidence_threshold: f64,
    pub iou_threshold: f64,
    pub half_precision: bool,
    /// "pytorch" | "onnx" | "tensorrt"
    pub backend: String,
    /// Frame-skip stride: process every Nth frame
    pub process_every_n_frames: u32,
    pub model_variant: String,
}

impl Default for InferenceParams {
    fn default() -> Self {
        InferenceParams {
            input_size: (640, 640),
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            half_precision: false,
            backend: "pytorch".to_string(),
            process_every_n_frames: 1,
            model_variant: LIGHTEST_VARIANT.to_string(),
        }
    }
}

/// A raw frame handed to the detector.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Single detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// x1, y1, x2, y2
    pub bbox: (i32, i32, i32, i32),
    pub confidence: f64,
    pub class_id: u32,
    pub class_name: String,
}

/// What the detector returns for one processed frame.
#[derive(Debug, Clone, Default)]
pub struct InferenceOutput {
    pub detections: Vec<Detection>,
    /// Annotated frame bytes, if the detector rendered one
    pub annotated: Option<Vec<u8>>,
}

/// Result of a single frame inference, including skip replays.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    pub annotated: Option<Vec<u8>>,
    pub latency_ms: f64,
    pub frame_number: u64,
    /// True when this frame was skipped and the previous result replayed
    pub skipped: bool,
}

/// The external heavy-compute capability.
///
/// `load_variant` may be slow (model reload); a failure there is the
/// configuration-failure case the controller must handle.
pub trait Detector: Send {
    fn load_variant(&mut self, variant: &str) -> Result<()>;
    fn infer(&mut self, frame: &Frame, params: &InferenceParams) -> Result<InferenceOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = InferenceParams::default();
        assert_eq!(params.input_size, (640, 640));
        assert!(!params.half_precision);
        assert_eq!(params.process_every_n_frames, 1);
        assert_eq!(params.model_variant, "yolov8n");
        assert_eq!(params.backend, "pytorch");
    }

    #[test]
    fn test_variant_ladder() {
        assert_eq!(next_heavier_variant("yolov8n"), Some("yolov8s"));
        assert_eq!(next_heavier_variant("yolov8s"), Some("yolov8m"));
        assert_eq!(next_heavier_variant("yolov8m"), None);
        assert_eq!(next_heavier_variant("unknown"), None);
        assert_eq!(VARIANT_LADDER[0], LIGHTEST_VARIANT);
    }

    #[test]
    fn test_params_serialization_roundtrip() {
        let params = InferenceParams {
            input_size: (544, 544),
            half_precision: true,
            process_every_n_frames: 2,
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let parsed: InferenceParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, params);
    }
}
