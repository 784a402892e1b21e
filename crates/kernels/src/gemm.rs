// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The GEMM kernel family.
//!
//! Every variant implements the same contract,
//! `C := alpha * op(A) * op(B) + beta * C`, for `op(A)` of shape `[M, K]`,
//! `op(B)` of shape `[K, N]`, and `C` of shape `[M, N]`. The variants
//! differ only in loop order and blocking; results are numerically
//! identical up to floating-point summation order.
//!
//! Transpose flags are realized by materializing the transposed operand
//! before the main loops. The blocked kernel rejects them; the vectorized
//! kernels reject element types that do not map onto a hardware vector
//! lane. Shapes and leading dimensions are validated up front so the
//! inner loops never index out of bounds.

use crate::KernelError;
use std::borrow::Cow;
use std::str::FromStr;
use tensor_core::{Numeric, Shape, Tensor};

/// Tile edge for the cache-blocked kernel.
const BLOCK: usize = 64;

/// Widest lane the vectorized kernels use (512 bits of 32-bit scalars).
const MAX_LANES: usize = 16;

/// Selects a GEMM implementation.
///
/// An explicit strategy value, injected at the call site, replaces any
/// process-wide algorithm registry. Parse one from a string the same way
/// run strategies are selected elsewhere in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GemmKernel {
    /// Dot product per output element.
    #[default]
    InnerProduct,
    /// Rank-1 update per step of `K`.
    OuterProduct,
    /// Row-at-a-time saxpy over `C`.
    RowWise,
    /// Column-at-a-time accumulation over `C`.
    ColWise,
    /// Cache-blocked tiles over `K` and `N`.
    Blocked,
    /// Lane-vectorized, 256-bit lane width.
    Simd256,
    /// Lane-vectorized, 512-bit lane width.
    Simd512,
}

impl GemmKernel {
    /// Returns the canonical kernel name.
    pub fn name(self) -> &'static str {
        match self {
            GemmKernel::InnerProduct => "inner-product",
            GemmKernel::OuterProduct => "outer-product",
            GemmKernel::RowWise => "row-wise",
            GemmKernel::ColWise => "col-wise",
            GemmKernel::Blocked => "blocked",
            GemmKernel::Simd256 => "simd-256",
            GemmKernel::Simd512 => "simd-512",
        }
    }

    /// All kernel variants, in benchmark-sweep order.
    pub fn all() -> [GemmKernel; 7] {
        [
            GemmKernel::InnerProduct,
            GemmKernel::OuterProduct,
            GemmKernel::RowWise,
            GemmKernel::ColWise,
            GemmKernel::Blocked,
            GemmKernel::Simd256,
            GemmKernel::Simd512,
        ]
    }

    /// Runs this kernel with the natural (contiguous row-major) leading
    /// dimensions `lda = K`, `ldb = N`, `ldc = N`.
    #[allow(clippy::too_many_arguments)]
    pub fn run<T: Numeric>(
        self,
        trans_a: bool,
        trans_b: bool,
        m: usize,
        n: usize,
        k: usize,
        alpha: T,
        beta: T,
        a: &Tensor<T>,
        b: &Tensor<T>,
        c: &mut Tensor<T>,
    ) -> Result<(), KernelError> {
        match self {
            GemmKernel::InnerProduct => {
                gemm_inner_product(trans_a, trans_b, m, n, k, alpha, beta, a, k, b, n, c, n)
            }
            GemmKernel::OuterProduct => {
                gemm_outer_product(trans_a, trans_b, m, n, k, alpha, beta, a, k, b, n, c, n)
            }
            GemmKernel::RowWise => {
                gemm_row_wise(trans_a, trans_b, m, n, k, alpha, beta, a, k, b, n, c, n)
            }
            GemmKernel::ColWise => {
                gemm_col_wise(trans_a, trans_b, m, n, k, alpha, beta, a, k, b, n, c, n)
            }
            GemmKernel::Blocked => {
                gemm_blocked(trans_a, trans_b, m, n, k, alpha, beta, a, k, b, n, c, n)
            }
            GemmKernel::Simd256 => {
                gemm_simd_256(trans_a, trans_b, m, n, k, alpha, beta, a, k, b, n, c, n)
            }
            GemmKernel::Simd512 => {
                gemm_simd_512(trans_a, trans_b, m, n, k, alpha, beta, a, k, b, n, c, n)
            }
        }
    }
}

impl FromStr for GemmKernel {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inner-product" | "inner" => Ok(GemmKernel::InnerProduct),
            "outer-product" | "outer" => Ok(GemmKernel::OuterProduct),
            "row-wise" | "row" => Ok(GemmKernel::RowWise),
            "col-wise" | "col" => Ok(GemmKernel::ColWise),
            "blocked" => Ok(GemmKernel::Blocked),
            "simd-256" | "simd256" => Ok(GemmKernel::Simd256),
            "simd-512" | "simd512" => Ok(GemmKernel::Simd512),
            other => Err(KernelError::UnknownKernel(other.to_string())),
        }
    }
}

impl std::fmt::Display for GemmKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Materializes `op(X)` for a transpose flag.
fn apply_transpose<T: Numeric>(
    trans: bool,
    t: &Tensor<T>,
) -> Result<Cow<'_, Tensor<T>>, KernelError> {
    if trans {
        Ok(Cow::Owned(t.transposed()?))
    } else {
        Ok(Cow::Borrowed(t))
    }
}

/// Checks one operand against its expected matrix shape and row width.
fn check_operand<T: Numeric>(
    operand: char,
    t: &Tensor<T>,
    rows: usize,
    cols: usize,
    ld: usize,
) -> Result<(), KernelError> {
    let expected = Shape::matrix(rows, cols);
    if t.shape() != &expected {
        return Err(KernelError::GemmShapeMismatch {
            operand,
            expected,
            actual: t.shape().clone(),
        });
    }
    if ld != cols {
        return Err(KernelError::LeadingDimension {
            operand,
            expected: cols,
            got: ld,
        });
    }
    Ok(())
}

/// Inner-product kernel: one dot product per output element, with the
/// prior `C` value scaled by `beta` first.
#[allow(clippy::too_many_arguments)]
pub fn gemm_inner_product<T: Numeric>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    let a = apply_transpose(trans_a, a)?;
    let b = apply_transpose(trans_b, b)?;
    check_operand('A', &a, m, k, lda)?;
    check_operand('B', &b, k, n, ldb)?;
    check_operand('C', c, m, n, ldc)?;

    let a = a.data();
    let b = b.data();
    let c = c.data_mut();

    for i in 0..m {
        for j in 0..n {
            let mut acc = T::zero();
            for p in 0..k {
                acc = acc + a[i * lda + p] * b[p * ldb + j];
            }
            c[i * ldc + j] = beta * c[i * ldc + j] + alpha * acc;
        }
    }
    Ok(())
}

/// Outer-product kernel: scales `C` by `beta`, then applies one rank-1
/// update per step of `K`.
#[allow(clippy::too_many_arguments)]
pub fn gemm_outer_product<T: Numeric>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    let a = apply_transpose(trans_a, a)?;
    let b = apply_transpose(trans_b, b)?;
    check_operand('A', &a, m, k, lda)?;
    check_operand('B', &b, k, n, ldb)?;
    check_operand('C', c, m, n, ldc)?;

    let a = a.data();
    let b = b.data();
    let c = c.data_mut();

    for i in 0..m {
        for j in 0..n {
            c[i * ldc + j] = beta * c[i * ldc + j];
        }
    }
    for p in 0..k {
        for i in 0..m {
            let a_ip = alpha * a[i * lda + p];
            let b_row = &b[p * ldb..p * ldb + n];
            let c_row = &mut c[i * ldc..i * ldc + n];
            for j in 0..n {
                c_row[j] += a_ip * b_row[j];
            }
        }
    }
    Ok(())
}

/// Row-wise kernel: for each row of `C`, a saxpy per step of `K`. The
/// inner loop streams sequentially through a row of `B` and of `C`.
#[allow(clippy::too_many_arguments)]
pub fn gemm_row_wise<T: Numeric>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    let a = apply_transpose(trans_a, a)?;
    let b = apply_transpose(trans_b, b)?;
    check_operand('A', &a, m, k, lda)?;
    check_operand('B', &b, k, n, ldb)?;
    check_operand('C', c, m, n, ldc)?;

    let a = a.data();
    let b = b.data();
    let c = c.data_mut();

    for i in 0..m {
        let c_row = &mut c[i * ldc..i * ldc + n];
        for j in 0..n {
            c_row[j] = beta * c_row[j];
        }
        for p in 0..k {
            let a_ip = alpha * a[i * lda + p];
            let b_row = &b[p * ldb..p * ldb + n];
            for j in 0..n {
                c_row[j] += a_ip * b_row[j];
            }
        }
    }
    Ok(())
}

/// Col-wise kernel: for each column of `C`, accumulate down the column.
#[allow(clippy::too_many_arguments)]
pub fn gemm_col_wise<T: Numeric>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    let a = apply_transpose(trans_a, a)?;
    let b = apply_transpose(trans_b, b)?;
    check_operand('A', &a, m, k, lda)?;
    check_operand('B', &b, k, n, ldb)?;
    check_operand('C', c, m, n, ldc)?;

    let a = a.data();
    let b = b.data();
    let c = c.data_mut();

    for j in 0..n {
        for i in 0..m {
            c[i * ldc + j] = beta * c[i * ldc + j];
        }
        for p in 0..k {
            let b_pj = alpha * b[p * ldb + j];
            for i in 0..m {
                c[i * ldc + j] += a[i * lda + p] * b_pj;
            }
        }
    }
    Ok(())
}

/// Cache-blocked kernel: tiles the `K` and `N` loops into fixed-size
/// blocks so the working set of `B` stays cache-resident for large
/// matrices. Transposed operands are rejected.
#[allow(clippy::too_many_arguments)]
pub fn gemm_blocked<T: Numeric>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    if trans_a || trans_b {
        return Err(KernelError::UnsupportedTranspose { kernel: "blocked" });
    }
    check_operand('A', a, m, k, lda)?;
    check_operand('B', b, k, n, ldb)?;
    check_operand('C', c, m, n, ldc)?;

    let a = a.data();
    let b = b.data();
    let c = c.data_mut();

    if k == 0 {
        for i in 0..m {
            for j in 0..n {
                c[i * ldc + j] = beta * c[i * ldc + j];
            }
        }
        return Ok(());
    }

    for ii in (0..m).step_by(BLOCK) {
        for pp in (0..k).step_by(BLOCK) {
            for jj in (0..n).step_by(BLOCK) {
                for i in ii..(ii + BLOCK).min(m) {
                    let i_col_a = i * lda;
                    let i_col_c = i * ldc;
                    for j in jj..(jj + BLOCK).min(n) {
                        // The beta scaling happens exactly once per output
                        // element, on the first K tile.
                        let mut acc = if pp == 0 {
                            beta * c[i_col_c + j]
                        } else {
                            c[i_col_c + j]
                        };
                        for p in pp..(pp + BLOCK).min(k) {
                            acc = acc + alpha * a[i_col_a + p] * b[p * ldb + j];
                        }
                        c[i_col_c + j] = acc;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Lane-vectorized kernel, 256-bit lane width.
///
/// See [`gemm_simd_512`] for the lane contract.
#[allow(clippy::too_many_arguments)]
pub fn gemm_simd_256<T: Numeric>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    gemm_lanes(
        "simd-256", 256, trans_a, trans_b, m, n, k, alpha, beta, a, lda, b, ldb, c, ldc,
    )
}

/// Lane-vectorized kernel, 512-bit lane width.
///
/// Processes a full lane of output columns per step — the lane holds
/// `lane_bits / (8 * size_of::<T>())` accumulators that the compiler maps
/// onto vector registers — and finishes each row with a masked partial
/// lane covering the remainder of `N`. Only element types that fit a
/// hardware vector lane are accepted (i32, i64, f32, f64); anything else
/// is an explicit [`KernelError::UnsupportedElement`], never a silent
/// scalar fallback.
#[allow(clippy::too_many_arguments)]
pub fn gemm_simd_512<T: Numeric>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    gemm_lanes(
        "simd-512", 512, trans_a, trans_b, m, n, k, alpha, beta, a, lda, b, ldb, c, ldc,
    )
}

#[allow(clippy::too_many_arguments)]
fn gemm_lanes<T: Numeric>(
    kernel: &'static str,
    lane_bits: usize,
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    a: &Tensor<T>,
    lda: usize,
    b: &Tensor<T>,
    ldb: usize,
    c: &mut Tensor<T>,
    ldc: usize,
) -> Result<(), KernelError> {
    if !T::ELEM.has_simd_lanes() {
        return Err(KernelError::UnsupportedElement {
            kernel,
            elem: T::ELEM,
        });
    }
    let width = lane_bits / (8 * T::ELEM.size_bytes());

    let a = apply_transpose(trans_a, a)?;
    let b = apply_transpose(trans_b, b)?;
    check_operand('A', &a, m, k, lda)?;
    check_operand('B', &b, k, n, ldb)?;
    check_operand('C', c, m, n, ldc)?;

    let a = a.data();
    let b = b.data();
    let c = c.data_mut();

    let mut lane = [T::zero(); MAX_LANES];

    for i in 0..m {
        let i_col_a = i * lda;
        let i_col_c = i * ldc;
        let mut j = 0;
        while j < n {
            // Final iteration handles the N remainder as a partial lane:
            // only the first `w` slots are loaded and stored back.
            let w = width.min(n - j);
            let lane = &mut lane[..w];
            for (l, slot) in lane.iter_mut().enumerate() {
                *slot = beta * c[i_col_c + j + l];
            }
            for p in 0..k {
                let a_ip = alpha * a[i_col_a + p];
                let b_row = &b[p * ldb + j..p * ldb + j + w];
                for (slot, &bv) in lane.iter_mut().zip(b_row) {
                    *slot = *slot + a_ip * bv;
                }
            }
            c[i_col_c + j..i_col_c + j + w].copy_from_slice(lane);
            j += w;
        }
    }
    Ok(())
}
