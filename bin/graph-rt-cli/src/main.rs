// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-rt
//!
//! Command-line interface for the graph inference runtime.
//!
//! ## Usage
//! ```bash
//! # Run inference
//! graph-rt run --model ./model.json --input ./input.json --gemm-kernel blocked
//!
//! # Inspect model structure
//! graph-rt inspect --model ./model.json
//!
//! # Compare GEMM kernels on a model
//! graph-rt benchmark --model ./model.json --input ./input.json --iterations 20
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "graph-rt",
    about = "Tensor-graph inference runtime for ONNX-shaped JSON models",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides CLI defaults).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run inference on a model.
    Run {
        /// Path to the model JSON file.
        #[arg(short, long)]
        model: std::path::PathBuf,

        /// Path to a JSON file of input bindings (name -> tensor).
        #[arg(short, long)]
        input: Option<std::path::PathBuf>,

        /// GEMM kernel: inner-product, outer-product, row-wise, col-wise,
        /// blocked, simd-256, simd-512.
        #[arg(short, long)]
        gemm_kernel: Option<String>,

        /// Print per-node timing metrics.
        #[arg(long)]
        profile: bool,
    },

    /// Inspect a model: ops, schedule layers, and initializer tensors.
    Inspect {
        /// Path to the model JSON file.
        #[arg(short, long)]
        model: std::path::PathBuf,
    },

    /// Benchmark every GEMM kernel against the same model.
    Benchmark {
        /// Path to the model JSON file.
        #[arg(short, long)]
        model: std::path::PathBuf,

        /// Path to a JSON file of input bindings (name -> tensor).
        #[arg(short, long)]
        input: Option<std::path::PathBuf>,

        /// Inference runs per kernel.
        #[arg(long, default_value_t = 10)]
        iterations: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            model,
            input,
            gemm_kernel,
            profile,
        } => commands::run::execute(model, input, gemm_kernel, profile, config),
        Commands::Inspect { model } => commands::inspect::execute(model),
        Commands::Benchmark {
            model,
            input,
            iterations,
        } => commands::benchmark::execute(model, input, iterations),
    }
}
