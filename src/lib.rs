// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! edgetune - adaptive performance autopilot for edge inference.
//!
//! Continuously tunes the execution parameters of a real-time
//! inference pipeline on heterogeneous, possibly GPU-less hardware so
//! throughput stays near a measured baseline without manual
//! intervention.
//!
//! Architecture highlights:
//! - `telemetry`: periodic hardware/performance sampler with a bounded
//!   rolling history
//! - `autopilot`: hysteresis FSM that escalates/de-escalates
//!   optimization aggressiveness
//! - `advisor`: read-only rotating rule engine producing human-readable
//!   suggestions
//! - `pipeline`: orchestrator loop tying source, detector, sampler,
//!   controller and publication together
//! - `inference`, `source`: the detector and capture collaborator
//!   boundaries
//! - `llm`: the external explanation service client

pub mod advisor;
pub mod autopilot;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod hardware;
pub mod inference;
pub mod llm;
pub mod pipeline;
pub mod source;
pub mod telemetry;
pub mod utils;
