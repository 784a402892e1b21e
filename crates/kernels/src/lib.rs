// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # kernels
//!
//! Pure numeric routines backing the graph operators:
//!
//! - The GEMM kernel family behind [`GemmKernel`]: inner-product,
//!   outer-product, row-wise, col-wise, cache-blocked, and lane-vectorized
//!   (256-bit and 512-bit widths) implementations of
//!   `C := alpha * op(A) * op(B) + beta * C` sharing one contract.
//! - The rank-agnostic [`sliding_window`] enumerator used by pooling, plus
//!   the [`AutoPad`] output-shape and padding derivation it depends on.
//!
//! Every routine validates shapes and element types up front and fails
//! with a [`KernelError`] rather than computing a wrong result.

mod error;
mod gemm;
mod sliding;

pub use error::KernelError;
pub use gemm::{
    gemm_blocked, gemm_col_wise, gemm_inner_product, gemm_outer_product, gemm_row_wise,
    gemm_simd_256, gemm_simd_512, GemmKernel,
};
pub use sliding::{
    normalize_window_attrs, pool_output_shape, pool_pads, sliding_window, AutoPad,
};
