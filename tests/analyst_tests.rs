// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use edgetune::autopilot::{AutopilotState, DecisionTelemetry, OptimizationDecision};
use edgetune::hardware::HardwareProfile;
use edgetune::inference::InferenceParams;
use edgetune::llm::{available_ollama_models, select_best_model, LlmAnalyst};
use edgetune::utils::unix_now;

fn decision() -> OptimizationDecision {
    OptimizationDecision {
        timestamp: unix_now(),
        previous_state: AutopilotState::Stable,
        new_state: AutopilotState::SoftTuning,
        action: "enable_fp16".into(),
        reason: "Escalate triggered: GPU 95%, FPS 28.0, VRAM 5.0/12.0 GB".into(),
        params_applied: InferenceParams::default(),
        telemetry_summary: DecisionTelemetry {
            gpu_util: 95.0,
            fps: 28.0,
            vram_used: 5.0,
        },
    }
}

fn hardware() -> HardwareProfile {
    HardwareProfile::from_gpu_facts("NVIDIA GeForce RTX 3060".into(), 12.0, (8, 6))
}

#[tokio::test]
async fn test_ollama_explanation_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "phi3:mini", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "  The GPU was saturated, so FP16 precision was enabled.  "
        })))
        .mount(&server)
        .await;

    let analyst = LlmAnalyst::with_ollama(server.uri(), "phi3:mini", 2.0);
    let text = analyst.explain(&decision(), &hardware()).await;
    assert_eq!(text, "The GPU was saturated, so FP16 precision was enabled.");
}

#[tokio::test]
async fn test_ollama_server_error_falls_back_to_canned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let analyst = LlmAnalyst::with_ollama(server.uri(), "phi3:mini", 2.0);
    let text = analyst.explain(&decision(), &hardware()).await;
    assert!(text.contains("enable_fp16"));
    assert!(text.contains("soft_tuning"));
}

#[tokio::test]
async fn test_ollama_empty_response_falls_back_to_canned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "" })))
        .mount(&server)
        .await;

    let analyst = LlmAnalyst::with_ollama(server.uri(), "phi3:mini", 2.0);
    let text = analyst.explain(&decision(), &hardware()).await;
    assert!(text.contains("enable_fp16"));
}

#[tokio::test]
async fn test_health_check_reports_reachable_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "0.5.1" })))
        .mount(&server)
        .await;

    let analyst = LlmAnalyst::with_ollama(server.uri(), "phi3:mini", 2.0);
    assert!(analyst.health_check().await);
}

#[tokio::test]
async fn test_model_discovery_and_selection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "phi3:mini" },
                { "name": "llama3.2:3b" },
                { "name": "qwen2.5:7b" }
            ]
        })))
        .mount(&server)
        .await;

    let models = available_ollama_models(&server.uri()).await;
    assert_eq!(models.len(), 3);
    assert_eq!(select_best_model(&models).unwrap(), "llama3.2:3b");
}

#[tokio::test]
async fn test_discovery_against_dead_endpoint() {
    let models = available_ollama_models("http://127.0.0.1:9").await;
    assert!(models.is_empty());
    assert_eq!(select_best_model(&models), None);
}
