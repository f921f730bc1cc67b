// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Simulated detector
//!
//! Stand-in for the real model used by the CLI demo path and the
//! integration tests. Models per-frame cost from resolution, precision
//! and variant so the autopilot has a realistic signal to react to,
//! and burns that cost with a blocking sleep, the same structural
//! blocking the real detector exhibits.

use std::time::Duration;

use rand::Rng;
use tracing::info;

use super::{Detection, Detector, Frame, InferenceOutput, InferenceParams, VARIANT_LADDER};
use crate::error::{EdgeTuneError, Result};

/// Base per-frame cost in ms at 640x640 full precision, by variant.
fn variant_base_cost_ms(variant: &str) -> f64 {
    match variant {
        "yolov8n" => 12.0,
        "yolov8s" => 22.0,
        "yolov8m" => 38.0,
        _ => 12.0,
    }
}

/// Detector stand-in with a load-time variant check and synthetic
/// detections.
pub struct SimulatedDetector {
    variant: String,
    /// Multiplies the modelled cost; 0.0 disables the sleep for tests.
    time_scale: f64,
}

impl SimulatedDetector {
    pub fn new() -> Self {
        SimulatedDetector {
            variant: VARIANT_LADDER[0].to_string(),
            time_scale: 1.0,
        }
    }

    /// Build a detector whose modelled cost is scaled, e.g. `0.0` for
    /// tests that should not sleep.
    pub fn with_time_scale(time_scale: f64) -> Self {
        SimulatedDetector {
            variant: VARIANT_LADDER[0].to_string(),
            time_scale,
        }
    }

    fn modelled_cost_ms(&self, params: &InferenceParams) -> f64 {
        let base = variant_base_cost_ms(&params.model_variant);
        let (w, h) = params.input_size;
        let pixel_scale = f64::from(w * h) / f64::from(640u32 * 640u32);
        let precision_scale = if params.half_precision { 0.6 } else { 1.0 };
        base * pixel_scale * precision_scale
    }
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SimulatedDetector {
    fn load_variant(&mut self, variant: &str) -> Result<()> {
        if !VARIANT_LADDER.contains(&variant) {
            return Err(EdgeTuneError::Inference(format!(
                "unknown model variant: {variant}"
            )));
        }
        info!("Simulated model swap: {} -> {}", self.variant, variant);
        self.variant = variant.to_string();
        Ok(())
    }

    fn infer(&mut self, frame: &Frame, params: &InferenceParams) -> Result<InferenceOutput> {
        let mut rng = rand::rng();
        let cost_ms = self.modelled_cost_ms(params) * self.time_scale;
        if cost_ms > 0.0 {
            let jitter = rng.random_range(0.9..1.1);
            std::thread::sleep(Duration::from_secs_f64(cost_ms * jitter / 1000.0));
        }

        let count = rng.random_range(0..4);
        let detections = (0..count)
            .map(|i| {
                let x1 = rng.random_range(0..frame.width.saturating_sub(32).max(1)) as i32;
                let y1 = rng.random_range(0..frame.height.saturating_sub(32).max(1)) as i32;
                Detection {
                    bbox: (x1, y1, x1 + 32, y1 + 32),
                    confidence: rng.random_range(0.25..0.99),
                    class_id: i,
                    class_name: "object".to_string(),
                }
            })
            .collect();

        Ok(InferenceOutput {
            detections,
            annotated: Some(frame.data.clone()),
        })
    }
}
