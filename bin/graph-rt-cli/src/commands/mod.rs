// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CLI subcommand implementations and shared helpers.

pub mod benchmark;
pub mod inspect;
pub mod run;

use model_loader::TensorDoc;
use runtime::RuntimeConfig;
use std::collections::HashMap;
use std::path::Path;
use tensor_core::{with_any_tensor, DynTensor};

/// Initializes tracing based on `-v` verbosity (RUST_LOG wins if set).
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the runtime configuration, falling back to defaults when no
/// file is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(p) => RuntimeConfig::from_file(p)
            .map_err(|e| anyhow::anyhow!("failed to load config '{}': {e}", p.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

/// Reads input bindings from a JSON file mapping tensor names to
/// initializer-style tensor documents.
pub fn load_bindings(path: &Path) -> anyhow::Result<HashMap<String, DynTensor>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read input file '{}': {e}", path.display()))?;
    let docs: HashMap<String, TensorDoc> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid input JSON '{}': {e}", path.display()))?;

    let mut bindings = HashMap::new();
    for (name, doc) in docs {
        let tensor = model_loader::decode_tensor(&doc)
            .map_err(|e| anyhow::anyhow!("input tensor '{name}': {e}"))?;
        bindings.insert(name, tensor);
    }
    Ok(bindings)
}

/// Formats a short preview of a tensor's leading values.
pub fn preview(tensor: &DynTensor, max_values: usize) -> String {
    let values = with_any_tensor!(tensor, t => {
        t.data()
            .iter()
            .take(max_values)
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    });
    let suffix = if tensor.len() > max_values { ", ..." } else { "" };
    format!("[{values}{suffix}]")
}
