// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Performance tier classification
//!
//! Tiers are capability-based (VRAM capacity), never tied to GPU model
//! strings, so new hardware classifies correctly without a lookup table.

use serde::{Deserialize, Serialize};

/// VRAM ceiling for the low tier (GB).
const LOW_CEILING_GB: f64 = 8.0;
/// VRAM ceiling for the mid tier (GB).
const MID_CEILING_GB: f64 = 16.0;

/// Coarse hardware capability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    /// Under 8 GB VRAM: entry-level discrete GPUs
    Low,
    /// 8-16 GB VRAM: mainstream GPUs
    Mid,
    /// Above 16 GB VRAM: workstation class
    High,
    /// No usable GPU
    CpuOnly,
}

impl PerformanceTier {
    /// Classify a tier from total VRAM in GB.
    pub fn from_vram_gb(vram_gb: f64) -> Self {
        if vram_gb <= 0.0 {
            PerformanceTier::CpuOnly
        } else if vram_gb < LOW_CEILING_GB {
            PerformanceTier::Low
        } else if vram_gb <= MID_CEILING_GB {
            PerformanceTier::Mid
        } else {
            PerformanceTier::High
        }
    }

    /// Wire-format name, matching the publication format.
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "low",
            PerformanceTier::Mid => "mid",
            PerformanceTier::High => "high",
            PerformanceTier::CpuOnly => "cpu_only",
        }
    }

    /// Human-readable description for log output.
    pub fn description(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "Entry-level GPU (under 8 GB VRAM)",
            PerformanceTier::Mid => "Mainstream GPU (8-16 GB VRAM)",
            PerformanceTier::High => "Workstation GPU (over 16 GB VRAM)",
            PerformanceTier::CpuOnly => "CPU only (no usable GPU)",
        }
    }
}

impl std::fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(PerformanceTier::from_vram_gb(0.0), PerformanceTier::CpuOnly);
        assert_eq!(PerformanceTier::from_vram_gb(-1.0), PerformanceTier::CpuOnly);
        assert_eq!(PerformanceTier::from_vram_gb(4.0), PerformanceTier::Low);
        assert_eq!(PerformanceTier::from_vram_gb(7.99), PerformanceTier::Low);
        assert_eq!(PerformanceTier::from_vram_gb(8.0), PerformanceTier::Mid);
        assert_eq!(PerformanceTier::from_vram_gb(16.0), PerformanceTier::Mid);
        assert_eq!(PerformanceTier::from_vram_gb(16.01), PerformanceTier::High);
        assert_eq!(PerformanceTier::from_vram_gb(24.0), PerformanceTier::High);
    }

    #[test]
    fn test_serialization_roundtrip() {
        for tier in [
            PerformanceTier::Low,
            PerformanceTier::Mid,
            PerformanceTier::High,
            PerformanceTier::CpuOnly,
        ] {
            let json = serde_json::to_string(&tier).unwrap();
            let parsed: PerformanceTier = serde_json::from_str(&json).unwrap();
            assert_eq!(tier, parsed);
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(PerformanceTier::CpuOnly.as_str(), "cpu_only");
        assert_eq!(PerformanceTier::Low.to_string(), "low");
    }
}
