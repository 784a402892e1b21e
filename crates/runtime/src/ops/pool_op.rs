// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pooling operators, built on the sliding-window enumerator.
//!
//! Both pools derive their output shape and padding pairs from the
//! shared [`kernels::pool_output_shape`] / [`kernels::pool_pads`]
//! arithmetic and then make a single pass with
//! [`kernels::sliding_window`]. Padding positions never appear in a
//! window; max-pool therefore reduces over real input values only, and
//! average-pool chooses its denominator via `count_include_pad`.

use crate::{ExecContext, GraphError, Node, Registry};
use kernels::{normalize_window_attrs, pool_output_shape, pool_pads, sliding_window, AutoPad, KernelError};
use tensor_core::{DynTensor, Numeric, Shape, Tensor};

/// Max pooling with optional argmax-index output.
#[derive(Debug, Clone)]
pub struct MaxPoolOp {
    x: String,
    y: String,
    indices: Option<String>,
    kernel_shape: Vec<usize>,
    strides: Vec<usize>,
    dilations: Vec<usize>,
    pads: Vec<usize>,
    auto_pad: AutoPad,
    ceil_mode: bool,
    column_major_indices: bool,
}

impl MaxPoolOp {
    pub fn new(
        x: impl Into<String>,
        y: impl Into<String>,
        kernel_shape: Vec<usize>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            indices: None,
            kernel_shape,
            strides: Vec::new(),
            dilations: Vec::new(),
            pads: Vec::new(),
            auto_pad: AutoPad::NotSet,
            ceil_mode: false,
            column_major_indices: false,
        }
    }

    pub fn with_strides(mut self, strides: Vec<usize>) -> Self {
        self.strides = strides;
        self
    }

    pub fn with_dilations(mut self, dilations: Vec<usize>) -> Self {
        self.dilations = dilations;
        self
    }

    pub fn with_pads(mut self, pads: Vec<usize>) -> Self {
        self.pads = pads;
        self
    }

    pub fn with_auto_pad(mut self, auto_pad: AutoPad) -> Self {
        self.auto_pad = auto_pad;
        self
    }

    pub fn with_ceil_mode(mut self, ceil_mode: bool) -> Self {
        self.ceil_mode = ceil_mode;
        self
    }

    /// Declares the second output carrying argmax flat indices.
    pub fn with_indices(mut self, name: impl Into<String>) -> Self {
        self.indices = Some(name.into());
        self
    }

    /// Stores argmax indices in column-major instead of row-major order.
    pub fn with_column_major_indices(mut self, yes: bool) -> Self {
        self.column_major_indices = yes;
        self
    }

    fn compute<T: Numeric>(
        &self,
        x: &Tensor<T>,
    ) -> Result<(Tensor<T>, Option<Tensor<i64>>), GraphError> {
        let in_shape = x.shape().dims();
        let spatial_rank = in_shape.len().saturating_sub(2);
        let (strides, pads, dilations) = normalize_window_attrs(
            spatial_rank,
            self.strides.clone(),
            self.pads.clone(),
            self.dilations.clone(),
        );

        let out_shape = pool_output_shape(
            in_shape,
            self.auto_pad,
            self.ceil_mode,
            &dilations,
            &self.kernel_shape,
            &pads,
            &strides,
        )
        .map_err(|e| GraphError::kernel("MaxPool", e))?;
        let pad_pairs = pool_pads(
            in_shape,
            self.auto_pad,
            self.ceil_mode,
            &dilations,
            &self.kernel_shape,
            &pads,
            &strides,
        )
        .map_err(|e| GraphError::kernel("MaxPool", e))?;

        let out_strides = Shape::new(out_shape.clone()).strides();
        let mut y = Tensor::<T>::zeros(Shape::new(out_shape.clone()));
        let mut indices = self
            .indices
            .as_ref()
            .map(|_| Tensor::<i64>::zeros(Shape::new(out_shape.clone())));

        let x_data = x.data();
        sliding_window(
            in_shape,
            &out_shape,
            &self.kernel_shape,
            &strides,
            &dilations,
            &pad_pairs,
            |window, out_idx| {
                if window.is_empty() {
                    return Err(KernelError::EmptyWindow {
                        position: out_idx.to_vec(),
                    });
                }
                let mut best_flat = window[0];
                let mut best = x_data[best_flat];
                for &flat in &window[1..] {
                    let value = x_data[flat];
                    if value > best {
                        best = value;
                        best_flat = flat;
                    }
                }
                let out_flat: usize = out_idx
                    .iter()
                    .zip(&out_strides)
                    .map(|(i, s)| i * s)
                    .sum();
                y.data_mut()[out_flat] = best;
                if let Some(ind) = indices.as_mut() {
                    let stored = if self.column_major_indices {
                        column_major_flat(best_flat, in_shape)
                    } else {
                        best_flat as i64
                    };
                    ind.data_mut()[out_flat] = stored;
                }
                Ok(())
            },
        )
        .map_err(|e| GraphError::kernel("MaxPool", e))?;

        Ok((y, indices))
    }
}

/// Re-expresses a row-major flat index in column-major order.
fn column_major_flat(flat: usize, shape: &[usize]) -> i64 {
    let mut coords = vec![0usize; shape.len()];
    let mut remaining = flat;
    for d in (0..shape.len()).rev() {
        coords[d] = remaining % shape[d];
        remaining /= shape[d];
    }
    let mut out = 0i64;
    let mut stride = 1i64;
    for d in 0..shape.len() {
        out += coords[d] as i64 * stride;
        stride *= shape[d] as i64;
    }
    out
}

impl Node for MaxPoolOp {
    fn op_type(&self) -> &'static str {
        "MaxPool"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.x]
    }

    fn outputs(&self) -> Vec<&str> {
        let mut names = vec![self.y.as_str()];
        if let Some(indices) = &self.indices {
            names.push(indices);
        }
        names
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let x = io.fetch("MaxPool", &self.x)?;
        let elem = x.elem_type();

        // Pooling covers the original's element set: both floats plus the
        // 32- and 64-bit signed integers.
        let (y, indices): (DynTensor, Option<Tensor<i64>>) = match x {
            DynTensor::F32(t) => {
                let (y, i) = self.compute(t)?;
                (y.into(), i)
            }
            DynTensor::F64(t) => {
                let (y, i) = self.compute(t)?;
                (y.into(), i)
            }
            DynTensor::I32(t) => {
                let (y, i) = self.compute(t)?;
                (y.into(), i)
            }
            DynTensor::I64(t) => {
                let (y, i) = self.compute(t)?;
                (y.into(), i)
            }
            _ => {
                return Err(GraphError::UnsupportedType {
                    op: "MaxPool",
                    name: self.x.clone(),
                    elem,
                })
            }
        };

        io.insert(self.y.as_str(), y);
        if let (Some(name), Some(ind)) = (&self.indices, indices) {
            io.insert(name.as_str(), ind);
        }
        Ok(())
    }
}

/// Average pooling.
#[derive(Debug, Clone)]
pub struct AvgPoolOp {
    x: String,
    y: String,
    kernel_shape: Vec<usize>,
    strides: Vec<usize>,
    dilations: Vec<usize>,
    pads: Vec<usize>,
    auto_pad: AutoPad,
    ceil_mode: bool,
    count_include_pad: bool,
}

impl AvgPoolOp {
    pub fn new(
        x: impl Into<String>,
        y: impl Into<String>,
        kernel_shape: Vec<usize>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            kernel_shape,
            strides: Vec::new(),
            dilations: Vec::new(),
            pads: Vec::new(),
            auto_pad: AutoPad::NotSet,
            ceil_mode: false,
            count_include_pad: false,
        }
    }

    pub fn with_strides(mut self, strides: Vec<usize>) -> Self {
        self.strides = strides;
        self
    }

    pub fn with_dilations(mut self, dilations: Vec<usize>) -> Self {
        self.dilations = dilations;
        self
    }

    pub fn with_pads(mut self, pads: Vec<usize>) -> Self {
        self.pads = pads;
        self
    }

    pub fn with_auto_pad(mut self, auto_pad: AutoPad) -> Self {
        self.auto_pad = auto_pad;
        self
    }

    pub fn with_ceil_mode(mut self, ceil_mode: bool) -> Self {
        self.ceil_mode = ceil_mode;
        self
    }

    /// Counts padding positions in the averaging denominator.
    pub fn with_count_include_pad(mut self, yes: bool) -> Self {
        self.count_include_pad = yes;
        self
    }

    fn compute<T: Numeric>(&self, x: &Tensor<T>) -> Result<Tensor<T>, GraphError> {
        let in_shape = x.shape().dims();
        let spatial_rank = in_shape.len().saturating_sub(2);
        let (strides, pads, dilations) = normalize_window_attrs(
            spatial_rank,
            self.strides.clone(),
            self.pads.clone(),
            self.dilations.clone(),
        );

        let out_shape = pool_output_shape(
            in_shape,
            self.auto_pad,
            self.ceil_mode,
            &dilations,
            &self.kernel_shape,
            &pads,
            &strides,
        )
        .map_err(|e| GraphError::kernel("AveragePool", e))?;
        let pad_pairs = pool_pads(
            in_shape,
            self.auto_pad,
            self.ceil_mode,
            &dilations,
            &self.kernel_shape,
            &pads,
            &strides,
        )
        .map_err(|e| GraphError::kernel("AveragePool", e))?;

        let volume: usize = self.kernel_shape.iter().product();
        let volume_t = T::from_usize(volume).ok_or_else(|| GraphError::InvalidAttribute {
            op: "AveragePool",
            detail: format!("kernel volume {volume} is not representable as {}", T::ELEM),
        })?;

        let out_strides = Shape::new(out_shape.clone()).strides();
        let mut y = Tensor::<T>::zeros(Shape::new(out_shape.clone()));
        let x_data = x.data();

        sliding_window(
            in_shape,
            &out_shape,
            &self.kernel_shape,
            &strides,
            &dilations,
            &pad_pairs,
            |window, out_idx| {
                if window.is_empty() {
                    return Err(KernelError::EmptyWindow {
                        position: out_idx.to_vec(),
                    });
                }
                let mut sum = T::zero();
                for &flat in window {
                    sum = sum + x_data[flat];
                }
                let denominator = if self.count_include_pad {
                    volume_t
                } else {
                    // The window never exceeds the kernel volume, so this
                    // conversion cannot fail where the volume's did not.
                    T::from_usize(window.len()).unwrap_or(volume_t)
                };
                let out_flat: usize = out_idx
                    .iter()
                    .zip(&out_strides)
                    .map(|(i, s)| i * s)
                    .sum();
                y.data_mut()[out_flat] = sum / denominator;
                Ok(())
            },
        )
        .map_err(|e| GraphError::kernel("AveragePool", e))?;

        Ok(y)
    }
}

impl Node for AvgPoolOp {
    fn op_type(&self) -> &'static str {
        "AveragePool"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.x]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.y]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let x = io.fetch("AveragePool", &self.x)?;
        let elem = x.elem_type();

        let y: DynTensor = match x {
            DynTensor::F32(t) => self.compute(t)?.into(),
            DynTensor::F64(t) => self.compute(t)?.into(),
            DynTensor::I32(t) => self.compute(t)?.into(),
            DynTensor::I64(t) => self.compute(t)?.into(),
            _ => {
                return Err(GraphError::UnsupportedType {
                    op: "AveragePool",
                    name: self.x.clone(),
                    elem,
                })
            }
        };

        io.insert(self.y.as_str(), y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_input() -> Tensor<f32> {
        Tensor::from_vec(
            Shape::new(vec![1, 1, 4, 4]),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0,
                15.0, 16.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_max_pool_2x2_stride_2() {
        let mut io = Registry::new();
        io.insert("x", ramp_input());

        MaxPoolOp::new("x", "y", vec![2, 2])
            .with_strides(vec![2, 2])
            .with_pads(vec![0, 0, 0, 0])
            .with_indices("argmax")
            .forward(&mut io, &ExecContext::default())
            .unwrap();

        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert_eq!(t.shape(), &Shape::new(vec![1, 1, 2, 2]));
                assert_eq!(t.data(), &[6.0, 8.0, 14.0, 16.0]);
            }
            other => panic!("unexpected result {other:?}"),
        }
        match io.get("argmax").unwrap() {
            DynTensor::I64(t) => assert_eq!(t.data(), &[5, 7, 13, 15]),
            other => panic!("unexpected indices {other:?}"),
        }
    }

    #[test]
    fn test_max_pool_column_major_indices() {
        let mut io = Registry::new();
        io.insert("x", ramp_input());

        MaxPoolOp::new("x", "y", vec![2, 2])
            .with_strides(vec![2, 2])
            .with_indices("argmax")
            .with_column_major_indices(true)
            .forward(&mut io, &ExecContext::default())
            .unwrap();

        match io.get("argmax").unwrap() {
            // Row-major flats [5, 7, 13, 15] map to coords (1,1), (1,3),
            // (3,1), (3,3) and column-major strides [1, 1, 1, 4].
            DynTensor::I64(t) => assert_eq!(t.data(), &[5, 13, 7, 15]),
            other => panic!("unexpected indices {other:?}"),
        }
    }

    #[test]
    fn test_max_pool_integer_input() {
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(
                Shape::new(vec![1, 1, 2, 2]),
                vec![-5i32, 3, 2, -7],
            )
            .unwrap(),
        );

        MaxPoolOp::new("x", "y", vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::I32(t) => assert_eq!(t.data(), &[3]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_max_pool_rejects_unsupported_type() {
        let mut io = Registry::new();
        io.insert("x", Tensor::<u8>::zeros(Shape::new(vec![1, 1, 2, 2])));

        let err = MaxPoolOp::new("x", "y", vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedType { op: "MaxPool", .. }));
    }

    #[test]
    fn test_max_pool_same_upper() {
        // 3 wide with stride 2 under SAME_UPPER: output 2, the final
        // window hangs over the end padding.
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(Shape::new(vec![1, 1, 3]), vec![1.0f32, 9.0, 2.0]).unwrap(),
        );

        MaxPoolOp::new("x", "y", vec![2])
            .with_strides(vec![2])
            .with_auto_pad(AutoPad::SameUpper)
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert_eq!(t.shape(), &Shape::new(vec![1, 1, 2]));
                assert_eq!(t.data(), &[9.0, 2.0]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_avg_pool_basic() {
        let mut io = Registry::new();
        io.insert("x", ramp_input());

        AvgPoolOp::new("x", "y", vec![2, 2])
            .with_strides(vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[3.5, 5.5, 11.5, 13.5]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_avg_pool_count_include_pad() {
        // 2x2 input, 2x2 kernel, pad 1 all around, stride 2. Each window
        // holds exactly one real element; excluding padding divides by 1,
        // including it divides by the kernel volume 4.
        let input = Tensor::from_vec(
            Shape::new(vec![1, 1, 2, 2]),
            vec![4.0f32, 8.0, 12.0, 16.0],
        )
        .unwrap();

        let mut io = Registry::new();
        io.insert("x", input.clone());
        AvgPoolOp::new("x", "y", vec![2, 2])
            .with_strides(vec![2, 2])
            .with_pads(vec![1, 1, 1, 1])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[4.0, 8.0, 12.0, 16.0]),
            other => panic!("unexpected result {other:?}"),
        }

        let mut io = Registry::new();
        io.insert("x", input);
        AvgPoolOp::new("x", "y", vec![2, 2])
            .with_strides(vec![2, 2])
            .with_pads(vec![1, 1, 1, 1])
            .with_count_include_pad(true)
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_avg_pool_integer_division() {
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(Shape::new(vec![1, 1, 2, 2]), vec![1i64, 2, 3, 5]).unwrap(),
        );

        AvgPoolOp::new("x", "y", vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            // (1 + 2 + 3 + 5) / 4 in integer arithmetic.
            DynTensor::I64(t) => assert_eq!(t.data(), &[2]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_pool_rejects_low_rank_input() {
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(Shape::matrix(2, 2), vec![0.0f32; 4]).unwrap(),
        );

        let err = AvgPoolOp::new("x", "y", vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::Kernel { op: "AveragePool", .. }));
    }
}
