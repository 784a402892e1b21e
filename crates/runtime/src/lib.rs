// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The computational-graph executor and its operator set.
//!
//! A [`Model`] holds an ordered list of [`Node`]s, an initial [`Registry`]
//! of named tensors (weights and constants), and the declared top-level
//! input/output names. [`Model::infer`] topologically layers the ops,
//! merges caller bindings into a copy of the registry, runs every layer
//! in order, and extracts the declared outputs.
//!
//! Operators are stateless apart from their static attributes: each
//! forward pass reads its declared inputs from the registry, resolves the
//! element type with an exhaustive match over
//! [`tensor_core::DynTensor`], computes through the `tensor-core` and
//! `kernels` primitives, and writes its declared outputs back.
//!
//! The GEMM algorithm is injected through [`ExecContext`] rather than
//! selected through any global state; see
//! [`Model::with_gemm_kernel`].

mod config;
mod error;
mod metrics;
mod model;
mod node;
pub mod ops;
mod registry;

pub use config::RuntimeConfig;
pub use error::GraphError;
pub use metrics::{InferenceMetrics, NodeMetrics};
pub use model::Model;
pub use node::{ExecContext, Node};
pub use registry::Registry;
