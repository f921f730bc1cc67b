// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Inference engine wrapper
//!
//! Wraps a [`Detector`] with lifecycle management: atomic parameter
//! swaps, frame-skip gating, and rolling FPS / latency accounting.
//! One mutex guards the whole engine state, so a `configure` call
//! always takes effect before the next `run_frame` and never exposes
//! partially-applied parameters.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use tracing::info;

use super::{DetectionResult, Detector, Frame, InferenceParams};
use crate::error::Result;

/// Rolling window length for FPS / latency calculation.
const FPS_WINDOW: usize = 30;

/// Current throughput numbers derived from the rolling windows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineStats {
    pub fps: f64,
    pub avg_latency_ms: f64,
}

/// The detector's configuration surface, as seen by the controller.
pub trait ParameterSink: Send + Sync {
    /// Apply new execution parameters, effective from the next frame.
    fn configure(&self, params: &InferenceParams) -> Result<()>;

    /// Snapshot of the parameters currently in effect.
    fn current_params(&self) -> InferenceParams;
}

struct EngineState {
    detector: Box<dyn Detector>,
    params: InferenceParams,
    frame_counter: u64,
    last_result: Option<DetectionResult>,
    frame_times: VecDeque<Instant>,
    latencies: VecDeque<f64>,
}

/// Production lifecycle wrapper around a [`Detector`].
pub struct InferenceEngine {
    state: Mutex<EngineState>,
}

impl InferenceEngine {
    pub fn new(detector: Box<dyn Detector>) -> Self {
        InferenceEngine {
            state: Mutex::new(EngineState {
                detector,
                params: InferenceParams::default(),
                frame_counter: 0,
                last_result: None,
                frame_times: VecDeque::with_capacity(FPS_WINDOW),
                latencies: VecDeque::with_capacity(FPS_WINDOW),
            }),
        }
    }

    /// Run inference on a single frame.
    ///
    /// Respects `process_every_n_frames`: a skipped frame replays the
    /// previous result with `skipped = true` and zero latency. The
    /// first frame is always processed.
    pub fn run_frame(&self, frame: &Frame) -> Result<DetectionResult> {
        let mut state = self.state.lock().unwrap();
        state.frame_counter += 1;
        let frame_number = state.frame_counter;

        let stride = state.params.process_every_n_frames;
        if stride > 1 && frame_number % u64::from(stride) != 0 {
            if let Some(previous) = state.last_result.clone() {
                return Ok(DetectionResult {
                    detections: previous.detections,
                    annotated: previous.annotated,
                    latency_ms: 0.0,
                    frame_number,
                    skipped: true,
                });
            }
            // No previous result yet; process this frame anyway.
        }

        let params = state.params.clone();
        let started = Instant::now();
        let output = state.detector.infer(frame, &params)?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        if state.frame_times.len() == FPS_WINDOW {
            state.frame_times.pop_front();
        }
        state.frame_times.push_back(Instant::now());
        if state.latencies.len() == FPS_WINDOW {
            state.latencies.pop_front();
        }
        state.latencies.push_back(latency_ms);

        let result = DetectionResult {
            detections: output.detections,
            annotated: output.annotated,
            latency_ms,
            frame_number,
            skipped: false,
        };
        state.last_result = Some(result.clone());
        Ok(result)
    }

    /// Current FPS and average latency over the rolling windows.
    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock().unwrap();

        let fps = if state.frame_times.len() >= 2 {
            let elapsed = state
                .frame_times
                .back()
                .unwrap()
                .duration_since(*state.frame_times.front().unwrap())
                .as_secs_f64();
            if elapsed > 0.0 {
                (state.frame_times.len() - 1) as f64 / elapsed
            } else {
                0.0
            }
        } else {
            0.0
        };

        let avg_latency_ms = if state.latencies.is_empty() {
            0.0
        } else {
            state.latencies.iter().sum::<f64>() / state.latencies.len() as f64
        };

        EngineStats { fps, avg_latency_ms }
    }

    /// Total frames seen, including skipped ones.
    pub fn frame_count(&self) -> u64 {
        self.state.lock().unwrap().frame_counter
    }
}

impl ParameterSink for InferenceEngine {
    fn configure(&self, params: &InferenceParams) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        // Swap the model only when the variant actually changed; a
        // failed reload leaves the previous parameters in effect.
        if params.model_variant != state.params.model_variant {
            state.detector.load_variant(&params.model_variant)?;
        }

        state.params = params.clone();
        info!(
            "Inference params updated: size={}x{} half={} skip={} backend={}",
            params.input_size.0,
            params.input_size.1,
            params.half_precision,
            params.process_every_n_frames,
            params.backend,
        );
        Ok(())
    }

    fn current_params(&self) -> InferenceParams {
        self.state.lock().unwrap().params.clone()
    }
}
