// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Hardware capability detection and performance tiering

mod probe;
mod tier;

pub use probe::{HardwareProbe, HardwareProfile};
pub use tier::PerformanceTier;
