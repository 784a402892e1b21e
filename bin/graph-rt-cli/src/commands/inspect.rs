// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-rt inspect`: display model structure and schedule.

use std::path::PathBuf;

pub fn execute(model_path: PathBuf) -> anyhow::Result<()> {
    let model = model_loader::parse_file(&model_path)
        .map_err(|e| anyhow::anyhow!("failed to load '{}': {e}", model_path.display()))?;

    println!("Model:   {}", model_path.display());
    println!("Inputs:  {:?}", model.input_names());
    println!("Outputs: {:?}", model.output_names());
    println!();

    println!("Ops ({}):", model.num_nodes());
    for node in model.iter_nodes() {
        println!(
            "  {:<12} {:?} -> {:?}",
            node.op_type(),
            node.inputs(),
            node.outputs(),
        );
    }
    println!();

    println!("Initializers ({}):", model.registry().len());
    let mut names: Vec<_> = model.registry().names().collect();
    names.sort_unstable();
    for name in names {
        if let Some(tensor) = model.registry().get(name) {
            println!(
                "  {name}: {} {} ({} elements)",
                tensor.elem_type(),
                tensor.shape(),
                tensor.len(),
            );
        }
    }
    println!();

    let layers = model.topological_layers()?;
    println!("Schedule ({} layers):", layers.len());
    for (index, layer) in layers.iter().enumerate() {
        let ops: Vec<&str> = layer
            .iter()
            .filter_map(|&i| model.iter_nodes().nth(i).map(|n| n.op_type()))
            .collect();
        println!("  layer {index}: {ops:?}");
    }

    Ok(())
}
