// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// edgetune - adaptive performance autopilot for edge inference
#[derive(Parser, Debug)]
#[command(name = "edgetune")]
#[command(version, about = "Adaptive performance autopilot for edge inference")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (default: config/settings.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the inference pipeline (default when no command given)
    Run(RunArgs),

    /// Show the detected hardware profile
    #[command(alias = "hw")]
    Hardware,

    /// List locally available Ollama models
    Models,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Frame source: "synthetic" (finite clip) or "camera" (endless)
    #[arg(long, default_value = "synthetic")]
    pub source: String,

    /// Processing mode: "paced" or "benchmark"
    #[arg(long, default_value = "paced")]
    pub processing_mode: String,

    /// Autopilot mode override: "speed" | "balanced" | "accuracy"
    #[arg(long)]
    pub mode: Option<String>,

    /// Frame budget override for the synthetic source
    #[arg(long)]
    pub frames: Option<u64>,

    /// Disable the LLM analyst (canned explanations only)
    #[arg(long)]
    pub no_llm: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        RunArgs {
            source: "synthetic".to_string(),
            processing_mode: "paced".to_string(),
            mode: None,
            frames: None,
            no_llm: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["edgetune"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_run_args_parsing() {
        let cli = Cli::parse_from([
            "edgetune",
            "run",
            "--source",
            "camera",
            "--processing-mode",
            "benchmark",
            "--mode",
            "speed",
            "--frames",
            "100",
            "--no-llm",
        ]);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.source, "camera");
                assert_eq!(args.processing_mode, "benchmark");
                assert_eq!(args.mode.as_deref(), Some("speed"));
                assert_eq!(args.frames, Some(100));
                assert!(args.no_llm);
            }
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn test_hardware_alias() {
        let cli = Cli::parse_from(["edgetune", "hw"]);
        assert!(matches!(cli.command, Some(Commands::Hardware)));
    }
}
