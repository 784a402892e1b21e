// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Strided n-dimensional tensor types for the graph inference runtime.
//!
//! This crate provides:
//! - [`Tensor`] — an owned, n-dimensional, row-major tensor generic over its
//!   scalar element type.
//! - [`TensorView`] — a borrowed, zero-copy view over a leading-index slice.
//! - [`Shape`] — dimension descriptors with stride and broadcast arithmetic.
//! - [`ElemType`] / [`Element`] — the closed set of supported scalar types
//!   (bool, signed/unsigned 8–64-bit integers, f32, f64).
//! - [`DynTensor`] — a tagged union over `Tensor<E>` for every supported
//!   element type, used wherever the graph is untyped until execution time.
//!
//! # Design Goals
//! - Every access is bound-checked; shape violations surface as
//!   [`TensorError`], never as silent truncation.
//! - Slices are borrowed views into the owner's buffer, enforced by the
//!   borrow checker — never hidden copies.
//! - Clean error types via `thiserror`.

mod dyn_tensor;
mod element;
mod error;
mod shape;
mod tensor;

pub use dyn_tensor::DynTensor;
pub use element::{ElemType, Element, FloatElement, Numeric};
pub use error::TensorError;
pub use shape::Shape;
pub use tensor::{Tensor, TensorView};
