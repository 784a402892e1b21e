// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The model executor: topological scheduling over the op list.
//!
//! Scheduling works purely from the names each op declares: map every
//! output name back to its producing op, count each op's distinct
//! producers as its in-degree, and repeatedly peel off the zero-in-degree
//! ops as one layer. Ops in the same layer share no dependency and are
//! safe to run in any order — the layering is the seam where a future
//! worker pool would slot in; the reference executor runs them
//! sequentially.

use crate::{ExecContext, GraphError, InferenceMetrics, Node, Registry};
use kernels::GemmKernel;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Instant;
use tensor_core::DynTensor;

/// A computational graph bound to its initial registry.
///
/// Built once (by the model loader or programmatically) and executed many
/// times: every [`infer`](Model::infer) call works on a fresh copy of the
/// registry, so caller bindings and pre-loaded weights are never
/// corrupted by a previous call.
pub struct Model {
    nodes: Vec<Box<dyn Node>>,
    registry: Registry,
    inputs: Vec<String>,
    outputs: Vec<String>,
    context: ExecContext,
}

impl Model {
    /// Creates a model from its op list, initial registry, and declared
    /// top-level input/output names.
    pub fn new(
        nodes: Vec<Box<dyn Node>>,
        registry: Registry,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            nodes,
            registry,
            inputs,
            outputs,
            context: ExecContext::default(),
        }
    }

    /// Selects the GEMM kernel the Gemm ops dispatch to.
    pub fn with_gemm_kernel(mut self, kernel: GemmKernel) -> Self {
        self.context.gemm = kernel;
        self
    }

    /// Number of ops in the graph.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The declared top-level input names.
    pub fn input_names(&self) -> &[String] {
        &self.inputs
    }

    /// The declared top-level output names.
    pub fn output_names(&self) -> &[String] {
        &self.outputs
    }

    /// The initial registry (weights and constants).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Iterates over the ops in declaration order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &dyn Node> {
        self.nodes.iter().map(|node| node.as_ref())
    }

    /// Computes the layered topological order of the op list.
    ///
    /// Each layer holds indices into the op list; ops within a layer have
    /// no declared dependency on each other. Inputs with no producer
    /// (model inputs, weights) contribute no edge.
    ///
    /// # Errors
    /// [`GraphError::EmptyGraph`] for an empty op list and
    /// [`GraphError::Cycle`] when scheduling cannot place every op.
    pub fn topological_layers(&self) -> Result<Vec<Vec<usize>>, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }
        let total = self.nodes.len();

        let mut producer: HashMap<&str, usize> = HashMap::new();
        for (index, node) in self.nodes.iter().enumerate() {
            for output in node.outputs() {
                producer.insert(output, index);
            }
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); total];
        let mut in_degree = vec![0usize; total];
        for (consumer, node) in self.nodes.iter().enumerate() {
            // Distinct producers only: feeding two inputs from the same
            // op still counts as one dependency.
            let mut producers = BTreeSet::new();
            for input in node.inputs() {
                if let Some(&p) = producer.get(input) {
                    if p != consumer {
                        producers.insert(p);
                    }
                }
            }
            for p in producers {
                adjacency[p].push(consumer);
                in_degree[consumer] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..total).filter(|&i| in_degree[i] == 0).collect();
        let mut layers = Vec::new();
        let mut scheduled = 0;

        while !ready.is_empty() {
            let width = ready.len();
            let mut layer = Vec::with_capacity(width);
            for _ in 0..width {
                let Some(index) = ready.pop_front() else {
                    break;
                };
                layer.push(index);
                scheduled += 1;
                for &next in &adjacency[index] {
                    in_degree[next] -= 1;
                    if in_degree[next] == 0 {
                        ready.push_back(next);
                    }
                }
            }
            layers.push(layer);
        }

        if scheduled != total {
            return Err(GraphError::Cycle { scheduled, total });
        }
        Ok(layers)
    }

    /// Runs inference against the given input bindings.
    ///
    /// The initial registry is copied, the bindings are merged in, every
    /// layer executes in topological order, and only the declared model
    /// outputs are returned. A declared output missing after the final
    /// layer is a graph error.
    pub fn infer(
        &self,
        bindings: HashMap<String, DynTensor>,
    ) -> Result<HashMap<String, DynTensor>, GraphError> {
        self.run(bindings).map(|(outputs, _)| outputs)
    }

    /// Like [`infer`](Model::infer), also returning per-node timing
    /// metrics.
    pub fn infer_profiled(
        &self,
        bindings: HashMap<String, DynTensor>,
    ) -> Result<(HashMap<String, DynTensor>, InferenceMetrics), GraphError> {
        self.run(bindings)
    }

    fn run(
        &self,
        bindings: HashMap<String, DynTensor>,
    ) -> Result<(HashMap<String, DynTensor>, InferenceMetrics), GraphError> {
        let layers = self.topological_layers()?;
        tracing::debug!(
            "scheduled {} ops into {} layers",
            self.nodes.len(),
            layers.len(),
        );

        let mut local = self.registry.clone();
        for (name, tensor) in bindings {
            local.insert(name, tensor);
        }

        let run_start = Instant::now();
        let mut metrics = InferenceMetrics::new(layers.len());

        for (layer_index, layer) in layers.iter().enumerate() {
            tracing::debug!("layer {layer_index}: {} ops", layer.len());
            for &index in layer {
                let node = &self.nodes[index];
                let node_start = Instant::now();
                node.forward(&mut local, &self.context)?;
                let first_output = node
                    .outputs()
                    .first()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                metrics.record_node(node.op_type(), first_output, node_start.elapsed());
            }
        }

        let mut outputs = HashMap::new();
        for name in &self.outputs {
            let tensor = local
                .get(name)
                .ok_or_else(|| GraphError::MissingTensor {
                    op: "Model",
                    name: name.clone(),
                })?
                .clone();
            outputs.insert(name.clone(), tensor);
        }

        metrics.finalize(run_start.elapsed());
        tracing::info!("{}", metrics.summary());
        Ok((outputs, metrics))
    }

    /// Returns a short human-readable description of the graph.
    pub fn summary(&self) -> String {
        format!(
            "{} ops, {} initial tensors, inputs {:?}, outputs {:?}",
            self.nodes.len(),
            self.registry.len(),
            self.inputs,
            self.outputs,
        )
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("nodes", &self.nodes.len())
            .field("registry_slots", &self.registry.len())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("gemm", &self.context.gemm)
            .finish()
    }
}
