// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-rt benchmark`: compare GEMM kernels on the same model.

use kernels::GemmKernel;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub fn execute(
    model_path: PathBuf,
    input_path: Option<PathBuf>,
    iterations: usize,
) -> anyhow::Result<()> {
    let bindings = match &input_path {
        Some(path) => super::load_bindings(path)?,
        None => HashMap::new(),
    };

    println!(
        "Benchmarking {} ({iterations} iterations per kernel)",
        model_path.display(),
    );
    println!();
    println!("  {:<16} {:>12} {:>12}", "kernel", "avg", "best");

    for kernel in GemmKernel::all() {
        let model = model_loader::parse_file(&model_path)
            .map_err(|e| anyhow::anyhow!("failed to load '{}': {e}", model_path.display()))?
            .with_gemm_kernel(kernel);

        let mut total = Duration::ZERO;
        let mut best = Duration::MAX;
        let mut failed = None;

        for _ in 0..iterations {
            let start = Instant::now();
            match model.infer(bindings.clone()) {
                Ok(_) => {
                    let elapsed = start.elapsed();
                    total += elapsed;
                    best = best.min(elapsed);
                }
                Err(e) => {
                    failed = Some(e);
                    break;
                }
            }
        }

        match failed {
            // A kernel that rejects the model (e.g. vectorized lanes on
            // an unsupported element type) is reported, not fatal.
            Some(e) => println!("  {:<16} {e}", kernel.name()),
            None => {
                let avg = total / iterations.max(1) as u32;
                println!(
                    "  {:<16} {:>10.3}ms {:>10.3}ms",
                    kernel.name(),
                    avg.as_secs_f64() * 1000.0,
                    best.as_secs_f64() * 1000.0,
                );
            }
        }
    }

    Ok(())
}
