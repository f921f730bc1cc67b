// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! One-shot hardware capability detection
//!
//! Queries `nvidia-smi` for GPU name, VRAM and compute capability and
//! classifies the result into a performance tier. Falls back to a
//! CPU-only profile when no NVIDIA GPU is present or the query fails;
//! detection itself never errors out.

use std::process::Command;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{info, warn};

use super::tier::PerformanceTier;
use crate::utils::bytes_to_gb;

/// Minimum compute capability for FP16 inference.
const FP16_MIN_CC: (u32, u32) = (5, 3);
/// Minimum compute capability for tensor cores.
const TENSOR_CORE_MIN_CC: (u32, u32) = (7, 0);

/// Immutable snapshot of detected hardware capabilities.
///
/// Created once at startup and shared read-only with the controller
/// and advisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub gpu_name: String,
    pub gpu_available: bool,
    pub vram_total_gb: f64,
    pub compute_capability: (u32, u32),
    pub fp16_supported: bool,
    pub tensor_cores: bool,
    pub tier: PerformanceTier,
    pub cpu_cores: usize,
    pub ram_total_gb: f64,
    /// Execution device hint for the detector: "cuda:0" or "cpu".
    pub recommended_device: String,
}

impl HardwareProfile {
    /// Build a profile from raw GPU facts, applying capability checks
    /// and tier classification.
    pub fn from_gpu_facts(gpu_name: String, vram_total_gb: f64, cc: (u32, u32)) -> Self {
        let (cpu_cores, ram_total_gb) = cpu_facts();
        HardwareProfile {
            gpu_name,
            gpu_available: true,
            vram_total_gb,
            compute_capability: cc,
            fp16_supported: cc >= FP16_MIN_CC,
            tensor_cores: cc >= TENSOR_CORE_MIN_CC,
            tier: PerformanceTier::from_vram_gb(vram_total_gb),
            cpu_cores,
            ram_total_gb,
            recommended_device: "cuda:0".to_string(),
        }
    }

    /// CPU-only fallback profile.
    pub fn cpu_fallback() -> Self {
        let (cpu_cores, ram_total_gb) = cpu_facts();
        HardwareProfile {
            gpu_name: "N/A (CPU only)".to_string(),
            gpu_available: false,
            vram_total_gb: 0.0,
            compute_capability: (0, 0),
            fp16_supported: false,
            tensor_cores: false,
            tier: PerformanceTier::CpuOnly,
            cpu_cores,
            ram_total_gb,
            recommended_device: "cpu".to_string(),
        }
    }
}

fn cpu_facts() -> (usize, f64) {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_usage();
    let cores = sys.cpus().len().max(1);
    (cores, bytes_to_gb(sys.total_memory()))
}

/// One-shot hardware probe.
pub struct HardwareProbe;

impl HardwareProbe {
    /// Run full hardware detection.
    ///
    /// Any failure along the NVIDIA path degrades to the CPU-only
    /// profile rather than surfacing an error.
    pub fn detect() -> HardwareProfile {
        let profile = match Self::detect_nvidia() {
            Ok(profile) => profile,
            Err(reason) => {
                warn!("NVIDIA GPU detection failed ({reason}). Falling back to CPU.");
                HardwareProfile::cpu_fallback()
            }
        };

        info!(
            "Hardware profile: {} | VRAM {:.1} GB | Tier {} | Device {}",
            profile.gpu_name, profile.vram_total_gb, profile.tier, profile.recommended_device
        );
        profile
    }

    fn detect_nvidia() -> std::result::Result<HardwareProfile, String> {
        let output = Command::new("nvidia-smi")
            .args([
                "--query-gpu=name,memory.total,compute_cap",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .map_err(|e| format!("nvidia-smi not runnable: {e}"))?;

        if !output.status.success() {
            return Err(format!(
                "nvidia-smi exited with status {}",
                output.status
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .next()
            .ok_or_else(|| "nvidia-smi produced no output".to_string())?;

        parse_nvidia_smi_line(line)
            .map(|(name, vram_gb, cc)| HardwareProfile::from_gpu_facts(name, vram_gb, cc))
            .ok_or_else(|| format!("unparseable nvidia-smi line: {line:?}"))
    }
}

/// Parse one CSV line of `nvidia-smi --query-gpu=name,memory.total,compute_cap`.
///
/// `memory.total` is reported in MiB with `nounits`; `compute_cap` as
/// `major.minor`.
fn parse_nvidia_smi_line(line: &str) -> Option<(String, f64, (u32, u32))> {
    let mut fields = line.split(',').map(str::trim);
    let name = fields.next()?.to_string();
    if name.is_empty() {
        return None;
    }
    let vram_mib: f64 = fields.next()?.parse().ok()?;
    let cc_raw = fields.next()?;
    let (major, minor) = cc_raw.split_once('.')?;
    let cc = (major.trim().parse().ok()?, minor.trim().parse().ok()?);
    Some((name, vram_mib / 1024.0, cc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nvidia_smi_line() {
        let (name, vram, cc) =
            parse_nvidia_smi_line("NVIDIA GeForce RTX 3060, 12288, 8.6").unwrap();
        assert_eq!(name, "NVIDIA GeForce RTX 3060");
        assert!((vram - 12.0).abs() < 1e-9);
        assert_eq!(cc, (8, 6));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_nvidia_smi_line("").is_none());
        assert!(parse_nvidia_smi_line("name only").is_none());
        assert!(parse_nvidia_smi_line("gpu, not-a-number, 8.6").is_none());
        assert!(parse_nvidia_smi_line("gpu, 8192, nodot").is_none());
    }

    #[test]
    fn test_capability_checks() {
        // Pascal without FP16 fast path
        let p = HardwareProfile::from_gpu_facts("test".into(), 4.0, (5, 2));
        assert!(!p.fp16_supported);
        assert!(!p.tensor_cores);

        // Maxwell-era FP16 boundary
        let p = HardwareProfile::from_gpu_facts("test".into(), 4.0, (5, 3));
        assert!(p.fp16_supported);
        assert!(!p.tensor_cores);

        // Volta and later have both
        let p = HardwareProfile::from_gpu_facts("test".into(), 16.0, (7, 0));
        assert!(p.fp16_supported);
        assert!(p.tensor_cores);
        assert_eq!(p.tier, PerformanceTier::Mid);
    }

    #[test]
    fn test_cpu_fallback_profile() {
        let p = HardwareProfile::cpu_fallback();
        assert!(!p.gpu_available);
        assert_eq!(p.tier, PerformanceTier::CpuOnly);
        assert_eq!(p.recommended_device, "cpu");
        assert_eq!(p.vram_total_gb, 0.0);
        assert!(p.cpu_cores >= 1);
    }

    #[test]
    fn test_profile_serialization_roundtrip() {
        let p = HardwareProfile::from_gpu_facts("NVIDIA RTX A4000".into(), 16.0, (8, 6));
        let json = serde_json::to_string(&p).unwrap();
        let parsed: HardwareProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.gpu_name, p.gpu_name);
        assert_eq!(parsed.compute_capability, (8, 6));
        assert_eq!(parsed.tier, PerformanceTier::Mid);
    }
}
