// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph construction and execution.

use kernels::KernelError;
use tensor_core::{ElemType, Shape, TensorError};

/// Errors that can occur while building or executing a model graph.
///
/// Every error identifies the failing operator and, where applicable, the
/// offending tensor name, so a failing inference call points straight at
/// the broken node.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph holds no ops at all.
    #[error("graph has no nodes")]
    EmptyGraph,

    /// Topological scheduling could not place every op.
    #[error("graph contains a cycle; only {scheduled} of {total} ops could be scheduled")]
    Cycle { scheduled: usize, total: usize },

    /// A registry key referenced by an op (or a declared model output)
    /// was absent at execution time.
    #[error("{op}: tensor '{name}' not found in registry")]
    MissingTensor { op: &'static str, name: String },

    /// An op received a tensor whose element type it does not support.
    #[error("{op}: unsupported element type {elem} for tensor '{name}'")]
    UnsupportedType {
        op: &'static str,
        name: String,
        elem: ElemType,
    },

    /// Two operands of an op must share an element type but do not.
    #[error("{op}: element type mismatch between '{lhs}' ({lhs_elem}) and '{rhs}' ({rhs_elem})")]
    TypeMismatch {
        op: &'static str,
        lhs: String,
        lhs_elem: ElemType,
        rhs: String,
        rhs_elem: ElemType,
    },

    /// An input tensor has the wrong shape for the op's contract.
    #[error("{op}: input '{name}' has shape {shape}: {detail}")]
    BadInputShape {
        op: &'static str,
        name: String,
        shape: Shape,
        detail: String,
    },

    /// A static attribute is malformed or inconsistent.
    #[error("{op}: {detail}")]
    InvalidAttribute { op: &'static str, detail: String },

    /// The op does not implement the requested behavior.
    #[error("{op} does not support {feature}")]
    Unsupported {
        op: &'static str,
        feature: &'static str,
    },

    /// A tensor primitive failed inside an op.
    #[error("{op}: {source}")]
    Tensor {
        op: &'static str,
        #[source]
        source: TensorError,
    },

    /// A compute kernel failed inside an op.
    #[error("{op}: {source}")]
    Kernel {
        op: &'static str,
        #[source]
        source: KernelError,
    },

    /// Runtime configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GraphError {
    /// Wraps a tensor primitive failure with the failing op's name.
    pub fn tensor(op: &'static str, source: TensorError) -> Self {
        GraphError::Tensor { op, source }
    }

    /// Wraps a kernel failure with the failing op's name.
    pub fn kernel(op: &'static str, source: KernelError) -> Self {
        GraphError::Kernel { op, source }
    }
}
