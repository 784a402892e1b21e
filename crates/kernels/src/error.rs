// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the compute kernels.

use tensor_core::{ElemType, Shape, TensorError};

/// Errors that can occur inside the GEMM and sliding-window kernels.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A GEMM operand does not match the problem dimensions.
    #[error("gemm operand {operand} shape mismatch: expected {expected}, got {actual}")]
    GemmShapeMismatch {
        operand: char,
        expected: Shape,
        actual: Shape,
    },

    /// A leading dimension disagrees with the operand's row width.
    #[error("leading dimension for gemm operand {operand} must be {expected}, got {got}")]
    LeadingDimension {
        operand: char,
        expected: usize,
        got: usize,
    },

    /// The selected kernel variant does not implement transposed operands.
    #[error("{kernel} gemm does not support transposed operands")]
    UnsupportedTranspose { kernel: &'static str },

    /// The selected kernel variant does not support this element type.
    #[error("{kernel} gemm does not support element type {elem}")]
    UnsupportedElement {
        kernel: &'static str,
        elem: ElemType,
    },

    /// A kernel name failed to parse.
    #[error(
        "unknown gemm kernel '{0}'; expected one of inner-product, outer-product, \
         row-wise, col-wise, blocked, simd-256, simd-512"
    )]
    UnknownKernel(String),

    /// An auto-pad mode failed to parse.
    #[error("unknown auto_pad '{0}'; expected NOTSET, VALID, SAME_UPPER, or SAME_LOWER")]
    UnknownAutoPad(String),

    /// A window parameter vector does not match the spatial rank.
    #[error("{what} length {got} does not match expected length {expected}")]
    ParamLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A window parameter that must be positive is zero.
    #[error("{what} values must be positive, got 0")]
    NonPositiveParam { what: &'static str },

    /// The input rank is too small for a sliding window.
    #[error(
        "input of rank {rank} is too small for a sliding window \
         (needs batch, channel, and at least one spatial dimension)"
    )]
    WindowRank { rank: usize },

    /// The derived output extent along a spatial axis is not positive.
    #[error("window output dimension along spatial axis {axis} is non-positive ({value})")]
    InvalidOutputDim { axis: usize, value: i64 },

    /// A window contained no in-bounds input positions.
    #[error("empty sliding window at output position {position:?}")]
    EmptyWindow { position: Vec<usize> },

    /// An underlying tensor operation failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
