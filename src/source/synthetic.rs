// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Synthetic frame source
//!
//! Generates frames in-process, honouring the same pacing, pause and
//! seek semantics a real capture source exhibits. A finite source
//! behaves like a video file (end-of-stream, progress, playback
//! controls); an endless one behaves like a camera.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;

use super::{FrameSource, ProcessingMode, SourceMetadata, SourceType, SPEED_RANGE};
use crate::inference::Frame;

/// Bytes of synthetic payload per frame.
const PAYLOAD_LEN: usize = 64;

pub struct SyntheticSource {
    metadata: SourceMetadata,
    /// Pacing rate; None disables pacing (benchmark mode)
    pace_fps: Option<f64>,
    paused: bool,
    speed: f64,
    position: u64,
    last_frame_at: Option<Instant>,
}

impl SyntheticSource {
    /// Finite file-like source.
    pub fn file(
        total_frames: u64,
        native_fps: f64,
        resolution: (u32, u32),
        mode: ProcessingMode,
    ) -> Self {
        let duration = if native_fps > 0.0 {
            Some(total_frames as f64 / native_fps)
        } else {
            None
        };
        SyntheticSource {
            metadata: SourceMetadata {
                source_type: SourceType::File,
                total_frames: Some(total_frames),
                native_fps: Some(native_fps),
                duration_sec: duration,
                resolution,
            },
            pace_fps: match mode {
                ProcessingMode::Paced if native_fps > 0.0 => Some(native_fps),
                _ => None,
            },
            paused: false,
            speed: 1.0,
            position: 0,
            last_frame_at: None,
        }
    }

    /// Endless camera-like source delivering frames in real time.
    pub fn camera(capture_fps: f64, resolution: (u32, u32)) -> Self {
        SyntheticSource {
            metadata: SourceMetadata {
                source_type: SourceType::Camera,
                total_frames: None,
                native_fps: None,
                duration_sec: None,
                resolution,
            },
            pace_fps: (capture_fps > 0.0).then_some(capture_fps),
            paused: false,
            speed: 1.0,
            position: 0,
            last_frame_at: None,
        }
    }

    fn is_file(&self) -> bool {
        self.metadata.source_type == SourceType::File
    }

    async fn pace(&mut self) {
        let Some(fps) = self.pace_fps else {
            return;
        };
        let target = Duration::from_secs_f64(1.0 / (fps * self.speed));
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < target {
                tokio::time::sleep(target - elapsed).await;
            }
        }
    }

    fn generate_frame(&mut self) -> Frame {
        let mut rng = rand::rng();
        let data = (0..PAYLOAD_LEN).map(|_| rng.random::<u8>()).collect();
        let frame = Frame {
            index: self.position,
            width: self.metadata.resolution.0,
            height: self.metadata.resolution.1,
            data,
        };
        self.position += 1;
        frame
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn read(&mut self) -> Option<Frame> {
        if self.paused {
            return None; // caller should wait and retry
        }

        if let Some(total) = self.metadata.total_frames {
            if self.position >= total {
                return None; // end of stream
            }
        }

        self.pace().await;
        self.last_frame_at = Some(Instant::now());
        Some(self.generate_frame())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn progress(&self) -> f64 {
        match self.metadata.total_frames {
            Some(total) if total > 0 => self.position as f64 / total as f64,
            _ => 0.0,
        }
    }

    fn frame_number(&self) -> u64 {
        self.position
    }

    fn pause(&mut self) {
        if self.is_file() {
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        if self.is_file() {
            self.paused = false;
            self.last_frame_at = Some(Instant::now());
        }
    }

    fn seek(&mut self, frame_number: u64) {
        if self.is_file() {
            let total = self.metadata.total_frames.unwrap_or(0);
            self.position = frame_number.min(total);
        }
    }

    fn seek_percent(&mut self, pct: f64) {
        if let Some(total) = self.metadata.total_frames {
            let target = (total as f64 * pct.clamp(0.0, 1.0)) as u64;
            self.seek(target);
        }
    }

    fn set_speed(&mut self, multiplier: f64) {
        if self.is_file() {
            self.speed = multiplier.clamp(SPEED_RANGE.0, SPEED_RANGE.1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source_ends_after_total_frames() {
        let mut source = SyntheticSource::file(3, 30.0, (640, 480), ProcessingMode::Benchmark);
        assert!(source.read().await.is_some());
        assert!(source.read().await.is_some());
        assert!(source.read().await.is_some());
        assert!(source.read().await.is_none());
        assert!(!source.is_paused());
        assert_eq!(source.progress(), 1.0);
    }

    #[tokio::test]
    async fn test_frames_are_numbered_sequentially() {
        let mut source = SyntheticSource::file(2, 30.0, (320, 240), ProcessingMode::Benchmark);
        let first = source.read().await.unwrap();
        let second = source.read().await.unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(first.width, 320);
        assert_eq!(first.height, 240);
    }

    #[tokio::test]
    async fn test_pause_blocks_reads_until_resume() {
        let mut source = SyntheticSource::file(10, 30.0, (640, 480), ProcessingMode::Benchmark);
        source.pause();
        assert!(source.is_paused());
        assert!(source.read().await.is_none());
        source.resume();
        assert!(source.read().await.is_some());
    }

    #[tokio::test]
    async fn test_camera_ignores_playback_controls() {
        let mut source = SyntheticSource::camera(30.0, (640, 480));
        source.pause();
        assert!(!source.is_paused());
        source.set_speed(4.0);
        assert_eq!(source.speed, 1.0);
        assert!(source.read().await.is_some());
        assert_eq!(source.progress(), 0.0);
    }

    #[tokio::test]
    async fn test_seek_and_progress() {
        let mut source = SyntheticSource::file(100, 30.0, (640, 480), ProcessingMode::Benchmark);
        source.seek_percent(0.5);
        assert_eq!(source.frame_number(), 50);
        assert!((source.progress() - 0.5).abs() < f64::EPSILON);

        // Seeking past the end clamps.
        source.seek(500);
        assert_eq!(source.frame_number(), 100);
        assert!(source.read().await.is_none());
    }

    #[test]
    fn test_speed_clamping() {
        let mut source = SyntheticSource::file(10, 30.0, (640, 480), ProcessingMode::Paced);
        source.set_speed(10.0);
        assert_eq!(source.speed, 4.0);
        source.set_speed(0.01);
        assert_eq!(source.speed, 0.25);
    }

    #[tokio::test]
    async fn test_paced_mode_throttles_delivery() {
        let mut source = SyntheticSource::file(3, 100.0, (640, 480), ProcessingMode::Paced);
        let started = Instant::now();
        while source.read().await.is_some() {}
        // Two inter-frame gaps at 100 fps: at least ~20 ms.
        assert!(started.elapsed() >= Duration::from_millis(15));
    }
}
