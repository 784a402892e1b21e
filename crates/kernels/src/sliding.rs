// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rank-agnostic sliding-window enumeration and the padding arithmetic
//! behind it.
//!
//! Pooling (and, conceptually, convolution's im2col step) share one
//! traversal pattern: for every output position, gather the input window
//! and reduce it. [`sliding_window`] factors that pattern out. The
//! enumeration uses explicit odometer counters over fixed coordinate
//! arrays — increment the least-significant dimension, carry into the
//! more significant ones — so arbitrarily high ranks cost no stack depth.
//!
//! Padding positions are *excluded* from the window rather than
//! zero-filled: the visitor receives exactly the in-bounds flat indices,
//! which lets max-pool track an argmax and lets average-pool choose
//! whether padding counts toward its denominator.

use crate::KernelError;
use std::str::FromStr;
use tensor_core::Shape;

/// ONNX-style automatic padding mode for windowed ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoPad {
    /// Explicit pads are given per spatial dimension.
    #[default]
    NotSet,
    /// No padding.
    Valid,
    /// Output targets `ceil(in / stride)`; odd padding goes at the end.
    SameUpper,
    /// Output targets `ceil(in / stride)`; odd padding goes at the start.
    SameLower,
}

impl AutoPad {
    /// Returns the ONNX attribute spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            AutoPad::NotSet => "NOTSET",
            AutoPad::Valid => "VALID",
            AutoPad::SameUpper => "SAME_UPPER",
            AutoPad::SameLower => "SAME_LOWER",
        }
    }
}

impl FromStr for AutoPad {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOTSET" => Ok(AutoPad::NotSet),
            "VALID" => Ok(AutoPad::Valid),
            "SAME_UPPER" => Ok(AutoPad::SameUpper),
            "SAME_LOWER" => Ok(AutoPad::SameLower),
            other => Err(KernelError::UnknownAutoPad(other.to_string())),
        }
    }
}

impl std::fmt::Display for AutoPad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fills in the defaults for omitted window attributes: strides and
/// dilations default to 1 per spatial dimension, explicit pads to 0.
pub fn normalize_window_attrs(
    spatial_rank: usize,
    strides: Vec<usize>,
    pads: Vec<usize>,
    dilations: Vec<usize>,
) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let strides = if strides.is_empty() {
        vec![1; spatial_rank]
    } else {
        strides
    };
    let pads = if pads.is_empty() {
        vec![0; spatial_rank * 2]
    } else {
        pads
    };
    let dilations = if dilations.is_empty() {
        vec![1; spatial_rank]
    } else {
        dilations
    };
    (strides, pads, dilations)
}

/// Floor division that rounds toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let d = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        d - 1
    } else {
        d
    }
}

/// Ceiling division that rounds toward positive infinity.
fn ceil_div(a: i64, b: i64) -> i64 {
    let d = a / b;
    if a % b != 0 && (a < 0) == (b < 0) {
        d + 1
    } else {
        d
    }
}

/// Validates the window parameter vectors against the input rank and
/// returns the spatial rank.
fn check_window_params(
    in_rank: usize,
    kernel: &[usize],
    strides: &[usize],
    dilations: &[usize],
    pads_len: usize,
    pads_expected_factor: usize,
) -> Result<usize, KernelError> {
    if in_rank < 3 {
        return Err(KernelError::WindowRank { rank: in_rank });
    }
    let spatial_rank = in_rank - 2;
    if kernel.len() != spatial_rank {
        return Err(KernelError::ParamLength {
            what: "kernel_shape",
            expected: spatial_rank,
            got: kernel.len(),
        });
    }
    if strides.len() != spatial_rank {
        return Err(KernelError::ParamLength {
            what: "strides",
            expected: spatial_rank,
            got: strides.len(),
        });
    }
    if dilations.len() != spatial_rank {
        return Err(KernelError::ParamLength {
            what: "dilations",
            expected: spatial_rank,
            got: dilations.len(),
        });
    }
    if pads_len != spatial_rank * pads_expected_factor {
        return Err(KernelError::ParamLength {
            what: "pads",
            expected: spatial_rank * pads_expected_factor,
            got: pads_len,
        });
    }
    if kernel.contains(&0) {
        return Err(KernelError::NonPositiveParam { what: "kernel_shape" });
    }
    if strides.contains(&0) {
        return Err(KernelError::NonPositiveParam { what: "strides" });
    }
    if dilations.contains(&0) {
        return Err(KernelError::NonPositiveParam { what: "dilations" });
    }
    Ok(spatial_rank)
}

/// Derives the output shape of a windowed op over an `[N, C, spatial...]`
/// input.
///
/// Per spatial dimension, with `effK = (kernel - 1) * dilation + 1`:
/// - `NOTSET`: `floor((in + padBegin + padEnd - effK) / stride) + 1`, or
///   the ceiling variant when `ceil_mode` is set;
/// - `VALID`: the same formulas with zero padding;
/// - `SAME_UPPER` / `SAME_LOWER`: `ceil(in / stride)` under `ceil_mode`,
///   otherwise `floor((in - 1) / stride) + 1`.
///
/// # Errors
/// Parameter vectors of the wrong length, zero-valued parameters, and
/// non-positive derived output extents are all rejected.
pub fn pool_output_shape(
    in_shape: &[usize],
    auto_pad: AutoPad,
    ceil_mode: bool,
    dilations: &[usize],
    kernel: &[usize],
    pads: &[usize],
    strides: &[usize],
) -> Result<Vec<usize>, KernelError> {
    let spatial_rank =
        check_window_params(in_shape.len(), kernel, strides, dilations, pads.len(), 2)?;

    let mut out = vec![in_shape[0], in_shape[1]];
    for i in 0..spatial_rank {
        let in_dim = in_shape[i + 2] as i64;
        let stride = strides[i] as i64;
        let eff_kernel = ((kernel[i] - 1) * dilations[i] + 1) as i64;

        let out_dim = match auto_pad {
            AutoPad::SameUpper | AutoPad::SameLower => {
                if ceil_mode {
                    ceil_div(in_dim, stride)
                } else {
                    floor_div(in_dim - 1, stride) + 1
                }
            }
            AutoPad::Valid => {
                if ceil_mode {
                    ceil_div(in_dim - eff_kernel + 1, stride)
                } else {
                    floor_div(in_dim - eff_kernel, stride) + 1
                }
            }
            AutoPad::NotSet => {
                let total_pad = (pads[i] + pads[i + spatial_rank]) as i64;
                if ceil_mode {
                    ceil_div(in_dim + total_pad - eff_kernel, stride) + 1
                } else {
                    floor_div(in_dim + total_pad - eff_kernel, stride) + 1
                }
            }
        };

        if out_dim <= 0 {
            return Err(KernelError::InvalidOutputDim {
                axis: i,
                value: out_dim,
            });
        }
        out.push(out_dim as usize);
    }
    Ok(out)
}

/// Derives the `(begin, end)` padding pair per spatial dimension.
///
/// For the `SAME_*` modes the total padding is
/// `max(0, (out - 1) * stride + effK - in)`, split so the extra odd unit
/// goes to the end for `SAME_UPPER` and to the beginning for
/// `SAME_LOWER`.
pub fn pool_pads(
    in_shape: &[usize],
    auto_pad: AutoPad,
    ceil_mode: bool,
    dilations: &[usize],
    kernel: &[usize],
    pads: &[usize],
    strides: &[usize],
) -> Result<Vec<(i64, i64)>, KernelError> {
    let spatial_rank =
        check_window_params(in_shape.len(), kernel, strides, dilations, pads.len(), 2)?;

    let mut pairs = Vec::with_capacity(spatial_rank);
    for i in 0..spatial_rank {
        let in_dim = in_shape[i + 2] as i64;
        let stride = strides[i] as i64;
        let eff_kernel = ((kernel[i] - 1) * dilations[i] + 1) as i64;

        let pair = match auto_pad {
            AutoPad::SameUpper | AutoPad::SameLower => {
                let out_dim = if ceil_mode {
                    ceil_div(in_dim, stride)
                } else {
                    floor_div(in_dim - 1, stride) + 1
                };
                let total = ((out_dim - 1) * stride + eff_kernel - in_dim).max(0);
                let begin = if auto_pad == AutoPad::SameLower {
                    (total + 1) / 2
                } else {
                    total / 2
                };
                (begin, total - begin)
            }
            AutoPad::Valid => (0, 0),
            AutoPad::NotSet => (pads[i] as i64, pads[i + spatial_rank] as i64),
        };
        pairs.push(pair);
    }
    Ok(pairs)
}

/// Enumerates every output position of a windowed op and hands the
/// visitor the valid window for it.
///
/// For each output coordinate (over the full `[N, C, spatial...]` output
/// shape), every kernel offset is scaled by its dilation and mapped back
/// to an input coordinate; offsets that land outside the input bounds —
/// padding positions — are excluded. The visitor receives the flat
/// row-major input indices of the surviving window positions together
/// with the output coordinate, and may abort the traversal by returning
/// an error.
///
/// # Errors
/// Parameter-vector length or zero-value violations, plus anything the
/// visitor itself returns.
pub fn sliding_window<F>(
    in_shape: &[usize],
    out_shape: &[usize],
    kernel: &[usize],
    strides: &[usize],
    dilations: &[usize],
    pads: &[(i64, i64)],
    mut visit: F,
) -> Result<(), KernelError>
where
    F: FnMut(&[usize], &[usize]) -> Result<(), KernelError>,
{
    let total_rank = in_shape.len();
    let spatial_rank =
        check_window_params(total_rank, kernel, strides, dilations, pads.len(), 1)?;
    if out_shape.len() != total_rank {
        return Err(KernelError::ParamLength {
            what: "output shape",
            expected: total_rank,
            got: out_shape.len(),
        });
    }
    if out_shape.contains(&0) {
        return Ok(());
    }

    let in_strides = Shape::new(in_shape.to_vec()).strides();
    let mut window = Vec::with_capacity(kernel.iter().product());
    let mut out_idx = vec![0usize; total_rank];
    let mut kernel_pos = vec![0usize; spatial_rank];

    loop {
        // Gather the window for this output position.
        window.clear();
        kernel_pos.iter_mut().for_each(|p| *p = 0);
        'offsets: loop {
            // Batch and channel pass through untouched; spatial
            // coordinates come from stride, padding, and dilation.
            let mut flat = out_idx[0] * in_strides[0] + out_idx[1] * in_strides[1];
            let mut in_bounds = true;
            for d in 0..spatial_rank {
                let pos = out_idx[d + 2] as i64 * strides[d] as i64 - pads[d].0
                    + (kernel_pos[d] * dilations[d]) as i64;
                if pos < 0 || pos >= in_shape[d + 2] as i64 {
                    in_bounds = false;
                    break;
                }
                flat += pos as usize * in_strides[d + 2];
            }
            if in_bounds {
                window.push(flat);
            }

            let mut d = spatial_rank;
            loop {
                if d == 0 {
                    break 'offsets;
                }
                d -= 1;
                kernel_pos[d] += 1;
                if kernel_pos[d] < kernel[d] {
                    break;
                }
                kernel_pos[d] = 0;
            }
        }

        visit(&window, &out_idx)?;

        let mut d = total_rank;
        loop {
            if d == 0 {
                return Ok(());
            }
            d -= 1;
            out_idx[d] += 1;
            if out_idx[d] < out_shape[d] {
                break;
            }
            out_idx[d] = 0;
        }
    }
}
