// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference profiling metrics.
//!
//! [`InferenceMetrics`] collects per-node and aggregate timing for one
//! inference call — the tool for spotting which operator dominates a
//! model's latency and for comparing GEMM kernel selections.

use std::time::Duration;

/// Timing for a single op's forward pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeMetrics {
    /// Operator name (e.g. `"Conv"`).
    pub op_type: &'static str,
    /// The op's first declared output, which identifies it in the graph.
    pub output: String,
    /// Wall-clock time of the forward pass.
    pub duration: Duration,
}

/// Aggregate metrics for a complete inference run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InferenceMetrics {
    /// Total wall-clock time for the run, including scheduling.
    pub total_duration: Duration,
    /// Number of topological layers executed.
    pub num_layers: usize,
    /// Per-node timings in execution order.
    pub node_metrics: Vec<NodeMetrics>,
}

impl InferenceMetrics {
    /// Creates an empty metrics container.
    pub fn new(num_layers: usize) -> Self {
        Self {
            total_duration: Duration::ZERO,
            num_layers,
            node_metrics: Vec::new(),
        }
    }

    /// Records one op's forward-pass duration.
    pub fn record_node(&mut self, op_type: &'static str, output: String, duration: Duration) {
        self.node_metrics.push(NodeMetrics {
            op_type,
            output,
            duration,
        });
    }

    /// Finalises the metrics with the run's total wall-clock time.
    pub fn finalize(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Total time spent inside op forward passes.
    pub fn compute_duration(&self) -> Duration {
        self.node_metrics.iter().map(|m| m.duration).sum()
    }

    /// The slowest single op, if any ran.
    pub fn slowest_node(&self) -> Option<&NodeMetrics> {
        self.node_metrics.iter().max_by_key(|m| m.duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let slowest = self
            .slowest_node()
            .map(|m| {
                format!(
                    ", slowest {} '{}' at {:.2}ms",
                    m.op_type,
                    m.output,
                    m.duration.as_secs_f64() * 1000.0,
                )
            })
            .unwrap_or_default();
        format!(
            "inference: {:.2}ms total, {} ops in {} layers, {:.2}ms compute{}",
            self.total_duration.as_secs_f64() * 1000.0,
            self.node_metrics.len(),
            self.num_layers,
            self.compute_duration().as_secs_f64() * 1000.0,
            slowest,
        )
    }
}
