// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::Shape;

/// Errors that can occur during tensor construction and access.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer length does not match the shape's element count.
    #[error("buffer length mismatch for shape {shape}: expected {expected} elements, got {actual}")]
    BufferSizeMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    /// The number of indices does not match the tensor's rank.
    #[error("rank mismatch: got {got} indices for a rank-{rank} tensor")]
    RankMismatch { rank: usize, got: usize },

    /// A multi-dimensional index exceeds its dimension bound.
    #[error("index {index} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds {
        dim: usize,
        index: usize,
        size: usize,
    },

    /// A flat index exceeds the tensor's element count.
    #[error("flat index {index} out of bounds for tensor of {size} elements")]
    FlatIndexOutOfBounds { index: usize, size: usize },

    /// A reshape target does not preserve the element count.
    #[error("cannot reshape {elements} elements to shape {requested}")]
    ReshapeMismatch { elements: usize, requested: Shape },

    /// Two shapes are not broadcast-compatible.
    #[error("shapes {lhs} and {rhs} are not broadcast-compatible")]
    BroadcastMismatch { lhs: Shape, rhs: Shape },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The operation is not defined for tensors of this rank.
    #[error("{op} is not defined for rank-{rank} tensors")]
    RankUnsupported { op: &'static str, rank: usize },
}
