// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The operator interface over the registry.

use crate::{GraphError, Registry};
use kernels::GemmKernel;

/// Per-run execution options injected into every forward pass.
///
/// Carrying the GEMM strategy here keeps algorithm selection an explicit
/// value at the call site instead of process-wide mutable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecContext {
    /// The GEMM implementation the Gemm op dispatches to.
    pub gemm: GemmKernel,
}

/// A single operator in the computational graph.
///
/// Nodes are stateless apart from their static attributes. A node
/// declares the registry keys it reads and writes; the scheduler derives
/// the execution order purely from those declarations. `forward` reads
/// its inputs from the registry, resolves element types at run time, and
/// inserts its outputs — it must write every key listed in
/// [`outputs`](Node::outputs) and no others.
pub trait Node: std::fmt::Debug + Send + Sync {
    /// The ONNX-style operator name, used in error messages and logs.
    fn op_type(&self) -> &'static str;

    /// Registry keys this op reads.
    fn inputs(&self) -> Vec<&str>;

    /// Registry keys this op writes.
    fn outputs(&self) -> Vec<&str>;

    /// Runs the op against the registry.
    fn forward(&self, io: &mut Registry, cx: &ExecContext) -> Result<(), GraphError>;
}
