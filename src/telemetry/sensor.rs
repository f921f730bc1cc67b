// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! GPU sensor abstraction
//!
//! The monitor reads GPU metrics through this trait so GPU-less hosts
//! and tests can substitute their own implementation.

use std::process::Command;

use crate::error::{EdgeTuneError, Result};

/// One GPU sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpuReading {
    /// 0–100
    pub utilization_pct: f64,
    pub vram_used_gb: f64,
    pub vram_total_gb: f64,
}

/// Source of GPU utilization and memory metrics.
pub trait GpuSensor: Send + Sync {
    fn sample(&self) -> Result<GpuReading>;
}

/// Sensor for hosts without a usable GPU; always reads zeros.
pub struct NullSensor;

impl GpuSensor for NullSensor {
    fn sample(&self) -> Result<GpuReading> {
        Ok(GpuReading::default())
    }
}

/// Reads GPU metrics by querying `nvidia-smi`.
pub struct NvidiaSmiSensor;

impl GpuSensor for NvidiaSmiSensor {
    fn sample(&self) -> Result<GpuReading> {
        let output = Command::new("nvidia-smi")
            .args([
                "--query-gpu=utilization.gpu,memory.used,memory.total",
                "--format=csv,noheader,nounits",
            ])
            .output()?;

        if !output.status.success() {
            return Err(EdgeTuneError::Hardware(format!(
                "nvidia-smi exited with status {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .next()
            .ok_or_else(|| EdgeTuneError::Hardware("nvidia-smi produced no output".into()))?;

        parse_query_line(line)
            .ok_or_else(|| EdgeTuneError::Hardware(format!("unparseable nvidia-smi line: {line:?}")))
    }
}

/// Parse one CSV line of `utilization.gpu,memory.used,memory.total`
/// (percent, MiB, MiB).
fn parse_query_line(line: &str) -> Option<GpuReading> {
    let mut fields = line.split(',').map(str::trim);
    let utilization_pct: f64 = fields.next()?.parse().ok()?;
    let used_mib: f64 = fields.next()?.parse().ok()?;
    let total_mib: f64 = fields.next()?.parse().ok()?;
    Some(GpuReading {
        utilization_pct,
        vram_used_gb: used_mib / 1024.0,
        vram_total_gb: total_mib / 1024.0,
    })
}
