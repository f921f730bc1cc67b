// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM performance analyst
//!
//! Explains autopilot decisions in plain language via a local Ollama
//! model or a cloud backend. Strictly read-only: the analyst holds no
//! reference to the controller or engine and cannot modify system
//! behaviour.

mod analyst;
mod discovery;

pub use analyst::{LlmAnalyst, LlmProviderKind};
pub use discovery::{available_ollama_models, select_best_model};
