// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-rt run`: execute one inference call.

use runtime::RuntimeConfig;
use std::collections::HashMap;
use std::path::PathBuf;

pub fn execute(
    model_path: PathBuf,
    input_path: Option<PathBuf>,
    gemm_kernel: Option<String>,
    profile: bool,
    mut config: RuntimeConfig,
) -> anyhow::Result<()> {
    if let Some(kernel) = gemm_kernel {
        config.gemm_kernel = kernel;
    }
    if profile {
        config.enable_profiling = true;
    }
    let kernel = config
        .resolve_gemm_kernel()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let model = model_loader::parse_file(&model_path)
        .map_err(|e| anyhow::anyhow!("failed to load '{}': {e}", model_path.display()))?
        .with_gemm_kernel(kernel);

    println!("Model:  {}", model.summary());
    println!("Kernel: {}", kernel.name());

    let bindings = match &input_path {
        Some(path) => super::load_bindings(path)?,
        None => HashMap::new(),
    };
    if bindings.is_empty() && !model.input_names().is_empty() {
        tracing::warn!(
            "no input bindings provided for declared inputs {:?}",
            model.input_names(),
        );
    }
    if !bindings.is_empty() {
        println!("Inputs:");
        for (name, tensor) in &bindings {
            println!(
                "  {name}: {} {}",
                tensor.elem_type(),
                tensor.shape(),
            );
        }
    }

    if config.enable_profiling {
        let (outputs, metrics) = model.infer_profiled(bindings)?;
        print_outputs(&outputs);
        println!();
        println!("Metrics: {}", metrics.summary());
        for node in &metrics.node_metrics {
            println!(
                "  {:<12} '{}' {:.3}ms",
                node.op_type,
                node.output,
                node.duration.as_secs_f64() * 1000.0,
            );
        }
    } else {
        let outputs = model.infer(bindings)?;
        print_outputs(&outputs);
    }

    Ok(())
}

fn print_outputs(outputs: &HashMap<String, tensor_core::DynTensor>) {
    println!("Outputs:");
    let mut names: Vec<_> = outputs.keys().collect();
    names.sort();
    for name in names {
        let tensor = &outputs[name];
        println!(
            "  {name}: {} {} = {}",
            tensor.elem_type(),
            tensor.shape(),
            super::preview(tensor, 8),
        );
    }
}
