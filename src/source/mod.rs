// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Frame source boundary
//!
//! Unified abstraction over camera and file inputs. Playback controls
//! only take effect in file mode; camera mode silently no-ops them and
//! always runs in real time. The actual capture stack lives outside
//! this crate; [`SyntheticSource`] is the in-repo collaborator for
//! demos and tests.

mod synthetic;

pub use synthetic::SyntheticSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EdgeTuneError;
use crate::inference::Frame;

/// Minimum / maximum playback speed multiplier.
pub const SPEED_RANGE: (f64, f64) = (0.25, 4.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Camera,
    File,
}

/// How file sources deliver frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Process as fast as the detector allows
    Benchmark,
    /// Respect the native FPS (with speed multiplier)
    #[default]
    Paced,
}

impl std::str::FromStr for ProcessingMode {
    type Err = EdgeTuneError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "benchmark" => Ok(ProcessingMode::Benchmark),
            "paced" => Ok(ProcessingMode::Paced),
            other => Err(EdgeTuneError::InvalidInput(format!(
                "unknown processing mode: {other}"
            ))),
        }
    }
}

/// Read-only metadata about the current source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source_type: SourceType,
    /// None for camera
    pub total_frames: Option<u64>,
    /// None for camera
    pub native_fps: Option<f64>,
    /// None for camera
    pub duration_sec: Option<f64>,
    /// (width, height)
    pub resolution: (u32, u32),
}

/// Unified frame provider for camera or file input.
///
/// `read` paces frame delivery internally (a suspension point in paced
/// file mode) and returns `None` when the source is paused, exhausted
/// or failed; the orchestrator distinguishes those cases through
/// `is_paused` and the metadata's source type.
#[async_trait]
pub trait FrameSource: Send {
    async fn read(&mut self) -> Option<Frame>;

    fn is_paused(&self) -> bool;

    fn metadata(&self) -> &SourceMetadata;

    /// Playback progress 0.0 – 1.0; always 0 for camera.
    fn progress(&self) -> f64;

    /// Current frame position.
    fn frame_number(&self) -> u64;

    // Playback controls. File-mode semantics; camera implementations
    // keep the default no-ops.

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn seek(&mut self, _frame_number: u64) {}

    /// Seek to a fraction of the stream (0.0 – 1.0).
    fn seek_percent(&mut self, _pct: f64) {}

    fn set_speed(&mut self, _multiplier: f64) {}
}
