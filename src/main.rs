// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! edgetune - adaptive performance autopilot for edge inference
//!
//! Entry point for the edgetune CLI.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use edgetune::advisor::Advisor;
use edgetune::autopilot::AutopilotController;
use edgetune::cli::{Cli, Commands, RunArgs};
use edgetune::config::Settings;
use edgetune::error::Result;
use edgetune::events::{EventBus, PipelineEvent};
use edgetune::hardware::HardwareProbe;
use edgetune::inference::{InferenceEngine, ParameterSink, SimulatedDetector};
use edgetune::llm::{available_ollama_models, select_best_model, LlmAnalyst, LlmProviderKind};
use edgetune::pipeline::{InferencePipeline, PipelineConfig};
use edgetune::source::{FrameSource, ProcessingMode, SyntheticSource};
use edgetune::telemetry::{NullSensor, NvidiaSmiSensor, TelemetryMonitor};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Some(Commands::Hardware) => run_hardware(),
        Some(Commands::Models) => run_models(&settings).await,
        Some(Commands::Run(args)) => run_pipeline(settings, args).await,
        None => run_pipeline(settings, RunArgs::default()).await,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_hardware() -> Result<()> {
    let profile = HardwareProbe::detect();
    println!("GPU:                {}", profile.gpu_name);
    println!("GPU available:      {}", profile.gpu_available);
    println!("VRAM total:         {:.1} GB", profile.vram_total_gb);
    println!(
        "Compute capability: {}.{}",
        profile.compute_capability.0, profile.compute_capability.1
    );
    println!("FP16 supported:     {}", profile.fp16_supported);
    println!("Tensor cores:       {}", profile.tensor_cores);
    println!("Tier:               {} ({})", profile.tier, profile.tier.description());
    println!("CPU cores:          {}", profile.cpu_cores);
    println!("RAM total:          {:.1} GB", profile.ram_total_gb);
    println!("Recommended device: {}", profile.recommended_device);
    Ok(())
}

async fn run_models(settings: &Settings) -> Result<()> {
    let models = available_ollama_models(&settings.llm.ollama.endpoint).await;
    if models.is_empty() {
        println!("No Ollama models found at {}", settings.llm.ollama.endpoint);
        return Ok(());
    }
    for model in &models {
        println!("{model}");
    }
    if let Some(best) = select_best_model(&models) {
        println!("\nAuto-selection would pick: {best}");
    }
    Ok(())
}

async fn run_pipeline(settings: Settings, args: RunArgs) -> Result<()> {
    // 1. Hardware detection
    let hardware = Arc::new(HardwareProbe::detect());

    // 2. Inference engine behind the simulated detector
    let engine = Arc::new(InferenceEngine::new(Box::new(SimulatedDetector::new())));
    engine.configure(&settings.inference.initial_params())?;

    // 3. Telemetry monitor
    let sensor: Box<dyn edgetune::telemetry::GpuSensor> = if hardware.gpu_available {
        Box::new(NvidiaSmiSensor)
    } else {
        Box::new(NullSensor)
    };
    let telemetry = Arc::new(TelemetryMonitor::new(
        settings.telemetry.sampling_interval_ms,
        settings.telemetry.history_size,
        sensor,
    ));
    telemetry.start();

    // 4. Autopilot controller
    let mut controller_config = settings.autopilot.controller_config();
    if let Some(mode) = &args.mode {
        controller_config.mode = mode.parse()?;
    }
    let controller = AutopilotController::new(
        Arc::clone(&hardware),
        Arc::clone(&engine) as Arc<dyn ParameterSink>,
        controller_config.clone(),
    );

    // 5. Advisor
    let advisor = Advisor::new(Arc::clone(&hardware), settings.advisor.cooldown_seconds);

    // 6. LLM analyst
    let analyst = Arc::new(build_analyst(&settings, args.no_llm).await);

    // 7. Event bus with a console subscriber
    let bus = EventBus::new(settings.events.channel_capacity);
    spawn_console_subscriber(&bus);

    let pipeline = InferencePipeline::new(
        Arc::clone(&engine),
        Arc::clone(&telemetry),
        controller,
        advisor,
        analyst,
        Arc::clone(&hardware),
        bus,
        PipelineConfig {
            broadcast_interval_ms: settings.events.broadcast_interval_ms,
            stream_video: settings.events.stream_video,
        },
    );

    let processing_mode: ProcessingMode = args.processing_mode.parse()?;
    let source = build_source(&settings, &args, processing_mode)?;

    info!("=== edgetune ready ===");
    info!("  GPU: {} ({})", hardware.gpu_name, hardware.tier);
    info!("  Autopilot: {} mode", controller_config.mode);

    pipeline.start(source, processing_mode);

    tokio::select! {
        _ = pipeline.wait() => {
            info!("Pipeline finished.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down.");
            pipeline.stop();
        }
    }

    telemetry.stop();
    Ok(())
}

async fn build_analyst(settings: &Settings, no_llm: bool) -> LlmAnalyst {
    if no_llm || !settings.llm.enabled {
        return LlmAnalyst::disabled();
    }

    let llm = &settings.llm;
    let mut ollama_model = llm.ollama.model.clone();
    if llm.provider == LlmProviderKind::Ollama && ollama_model == "auto" {
        info!("Auto-detecting local Ollama models...");
        let models = available_ollama_models(&llm.ollama.endpoint).await;
        match select_best_model(&models) {
            Some(best) => {
                info!("Auto-selected LLM: {best}");
                ollama_model = best;
            }
            None => {
                warn!("No Ollama models found. Defaulting to 'phi3:mini'.");
                ollama_model = "phi3:mini".to_string();
            }
        }
    }

    LlmAnalyst::new(
        llm.provider,
        llm.ollama.endpoint.clone(),
        ollama_model,
        llm.ollama.timeout_seconds,
        llm.gemini.api_key.clone(),
        llm.gemini.model.clone(),
        true,
    )
}

fn build_source(
    settings: &Settings,
    args: &RunArgs,
    processing_mode: ProcessingMode,
) -> Result<Box<dyn FrameSource>> {
    let source_config = &settings.source;
    let frames = args.frames.unwrap_or(source_config.frames);

    match args.source.as_str() {
        "camera" => Ok(Box::new(SyntheticSource::camera(
            source_config.native_fps,
            source_config.resolution,
        ))),
        "synthetic" => Ok(Box::new(SyntheticSource::file(
            frames,
            source_config.native_fps,
            source_config.resolution,
            processing_mode,
        ))),
        other => Err(edgetune::error::EdgeTuneError::InvalidInput(format!(
            "unknown source: {other} (expected \"synthetic\" or \"camera\")"
        ))),
    }
}

/// Log published events to the console. This is the only in-repo
/// listener; the REST/WebSocket transport subscribes the same way.
fn spawn_console_subscriber(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(PipelineEvent::Telemetry(snap)) => {
                    info!(
                        "telemetry: gpu {:.0}% | vram {:.1}/{:.1} GB | fps {:.1} | latency {:.1} ms",
                        snap.gpu_utilization_pct,
                        snap.vram_used_gb,
                        snap.vram_total_gb,
                        snap.fps,
                        snap.latency_ms
                    );
                }
                Ok(PipelineEvent::AutopilotDecision(decision)) => {
                    info!(
                        "autopilot: {} -> {} ({}) | {}",
                        decision.previous_state,
                        decision.new_state,
                        decision.action,
                        decision.reason
                    );
                }
                Ok(PipelineEvent::AdvisorSuggestion(suggestion)) => {
                    info!("advisor: {}", suggestion.text);
                }
                Ok(PipelineEvent::LlmExplanation { text, .. }) => {
                    info!("analyst: {text}");
                }
                Ok(PipelineEvent::Status {
                    status, message, ..
                }) => {
                    info!("status [{status}]: {message}");
                }
                Ok(PipelineEvent::SourceProgress {
                    progress, paused, ..
                }) => {
                    if paused {
                        info!("source: paused at {:.0}%", progress * 100.0);
                    }
                }
                Ok(PipelineEvent::VideoFrame { .. }) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("console subscriber lagged, skipped {skipped} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgetune::hardware::HardwareProfile;

    fn assert_send_sync<T: Send + Sync>(_t: &T) {}

    #[test]
    fn test_build_source_rejects_unknown() {
        let settings = Settings::default();
        let args = RunArgs {
            source: "rtsp://camera".into(),
            ..Default::default()
        };
        assert!(build_source(&settings, &args, ProcessingMode::Paced).is_err());
    }

    #[test]
    fn test_build_source_frame_override() {
        let settings = Settings::default();
        let args = RunArgs {
            source: "synthetic".into(),
            frames: Some(42),
            ..Default::default()
        };
        let source = build_source(&settings, &args, ProcessingMode::Benchmark).unwrap();
        assert_eq!(source.metadata().total_frames, Some(42));
    }

    #[test]
    fn test_hardware_profile_is_send_sync() {
        let profile = HardwareProfile::cpu_fallback();
        assert_send_sync(&profile);
    }
}
