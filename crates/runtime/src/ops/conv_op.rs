// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The Conv operator: im2col-based 2-D convolution over NCHW input.
//!
//! The forward pass flips the kernel spatially (on a local clone — the
//! registry's weight slot stays untouched), unrolls the input windows
//! into a `[C*kH*kW, N*outH*outW]` column matrix, multiplies with the
//! flattened weights through the inner-product GEMM kernel, adds the
//! optional per-output-channel bias, and reshapes the result to NCHW.

use crate::{ExecContext, GraphError, Node, Registry};
use kernels::gemm_inner_product;
use tensor_core::{with_numeric_tensor, DynTensor, Numeric, Shape, Tensor};

/// 2-D convolution.
#[derive(Debug, Clone)]
pub struct ConvOp {
    x: String,
    w: String,
    b: Option<String>,
    y: String,
    dilations: Vec<usize>,
    /// Padding as `[top, bottom, left, right]`.
    pads: Vec<i64>,
    kernel_shape: Vec<usize>,
    strides: Vec<usize>,
    group: usize,
}

impl ConvOp {
    /// Creates a Conv node, validating the attribute vector lengths.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: impl Into<String>,
        w: impl Into<String>,
        b: Option<String>,
        y: impl Into<String>,
        dilations: Vec<usize>,
        pads: Vec<i64>,
        kernel_shape: Vec<usize>,
        strides: Vec<usize>,
        group: usize,
    ) -> Result<Self, GraphError> {
        if dilations.len() != 2 {
            return Err(GraphError::InvalidAttribute {
                op: "Conv",
                detail: format!("expected 2 dilation values, got {}", dilations.len()),
            });
        }
        if pads.len() != 4 {
            return Err(GraphError::InvalidAttribute {
                op: "Conv",
                detail: format!("expected 4 padding values, got {}", pads.len()),
            });
        }
        if kernel_shape.len() != 2 {
            return Err(GraphError::InvalidAttribute {
                op: "Conv",
                detail: format!("expected 2 kernel_shape values, got {}", kernel_shape.len()),
            });
        }
        if kernel_shape.contains(&0) {
            return Err(GraphError::InvalidAttribute {
                op: "Conv",
                detail: "kernel_shape values must be positive".into(),
            });
        }
        if strides.len() != 2 {
            return Err(GraphError::InvalidAttribute {
                op: "Conv",
                detail: format!("expected 2 stride values, got {}", strides.len()),
            });
        }
        if strides.contains(&0) {
            return Err(GraphError::InvalidAttribute {
                op: "Conv",
                detail: "stride values must be positive".into(),
            });
        }
        Ok(Self {
            x: x.into(),
            w: w.into(),
            b,
            y: y.into(),
            dilations,
            pads,
            kernel_shape,
            strides,
            group,
        })
    }

    fn compute<T: Numeric>(
        &self,
        io: &Registry,
        x: &Tensor<T>,
        w: &Tensor<T>,
    ) -> Result<Tensor<T>, GraphError> {
        if self.group != 1 {
            return Err(GraphError::Unsupported {
                op: "Conv",
                feature: "grouped convolution",
            });
        }
        let x_dims = x.shape().dims();
        if x_dims.len() != 4 {
            return Err(GraphError::BadInputShape {
                op: "Conv",
                name: self.x.clone(),
                shape: x.shape().clone(),
                detail: "expected 4 dimensions (batch, channels, height, width)".into(),
            });
        }
        let (batch, in_c, in_h, in_w) = (x_dims[0], x_dims[1], x_dims[2], x_dims[3]);

        let w_dims = w.shape().dims();
        let (k_h, k_w) = (self.kernel_shape[0], self.kernel_shape[1]);
        if w_dims.len() != 4 || w_dims[1] != in_c || w_dims[2] != k_h || w_dims[3] != k_w {
            return Err(GraphError::BadInputShape {
                op: "Conv",
                name: self.w.clone(),
                shape: w.shape().clone(),
                detail: format!(
                    "expected weights [out_channels, {in_c}, {k_h}, {k_w}]"
                ),
            });
        }
        let out_c = w_dims[0];

        let (s_h, s_w) = (self.strides[0], self.strides[1]);
        let (pad_top, pad_bottom, pad_left, pad_right) =
            (self.pads[0], self.pads[1], self.pads[2], self.pads[3]);

        let h_span = in_h as i64 + pad_top + pad_bottom - k_h as i64;
        let w_span = in_w as i64 + pad_left + pad_right - k_w as i64;
        if h_span < 0 || w_span < 0 {
            return Err(GraphError::BadInputShape {
                op: "Conv",
                name: self.x.clone(),
                shape: x.shape().clone(),
                detail: format!(
                    "kernel {k_h}x{k_w} does not fit the padded input"
                ),
            });
        }
        let out_h = h_span as usize / s_h + 1;
        let out_w = w_span as usize / s_w + 1;
        let spatial = out_h * out_w;

        // Flip the kernel spatially: a horizontal plus a vertical flip is
        // a reversal of each kH*kW plane. Works on a clone so the weight
        // slot in the registry stays read-only.
        let mut flipped = w.clone();
        {
            let data = flipped.data_mut();
            for plane in data.chunks_mut(k_h * k_w) {
                plane.reverse();
            }
        }

        // im2col: one column per output position, one row per
        // (channel, kernel offset). Out-of-bounds window positions stay
        // zero-filled.
        let rows = in_c * k_h * k_w;
        let cols = batch * spatial;
        let mut col = Tensor::<T>::zeros(Shape::matrix(rows, cols));
        let x_data = x.data();
        {
            let col_data = col.data_mut();
            for n in 0..batch {
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        let col_index = (n * out_h + oh) * out_w + ow;
                        for c in 0..in_c {
                            for ki in 0..k_h {
                                let in_h_pos = (oh * s_h) as i64 - pad_top + ki as i64;
                                if in_h_pos < 0 || in_h_pos >= in_h as i64 {
                                    continue;
                                }
                                for kj in 0..k_w {
                                    let in_w_pos = (ow * s_w) as i64 - pad_left + kj as i64;
                                    if in_w_pos < 0 || in_w_pos >= in_w as i64 {
                                        continue;
                                    }
                                    let row = (c * k_h + ki) * k_w + kj;
                                    let src = ((n * in_c + c) * in_h + in_h_pos as usize)
                                        * in_w
                                        + in_w_pos as usize;
                                    col_data[row * cols + col_index] = x_data[src];
                                }
                            }
                        }
                    }
                }
            }
        }

        // Flatten the flipped weights and multiply.
        let flat_w = flipped
            .reshaped(Shape::matrix(out_c, rows))
            .map_err(|e| GraphError::tensor("Conv", e))?;
        let mut product = Tensor::<T>::zeros(Shape::matrix(out_c, cols));
        gemm_inner_product(
            false,
            false,
            out_c,
            cols,
            rows,
            T::one(),
            T::zero(),
            &flat_w,
            rows,
            &col,
            cols,
            &mut product,
            cols,
        )
        .map_err(|e| GraphError::kernel("Conv", e))?;

        // Reorder [out_c, batch * spatial] into NCHW.
        let mut out = Tensor::<T>::zeros(Shape::new(vec![batch, out_c, out_h, out_w]));
        {
            let out_data = out.data_mut();
            let product_data = product.data();
            for n in 0..batch {
                for m in 0..out_c {
                    let dst = (n * out_c + m) * spatial;
                    let src = m * cols + n * spatial;
                    out_data[dst..dst + spatial]
                        .copy_from_slice(&product_data[src..src + spatial]);
                }
            }
        }

        // Per-output-channel bias.
        if let Some(b_name) = &self.b {
            let b_dyn = io.fetch("Conv", b_name)?;
            let bias: &Tensor<T> = b_dyn.downcast_ref().ok_or_else(|| GraphError::TypeMismatch {
                op: "Conv",
                lhs: self.x.clone(),
                lhs_elem: T::ELEM,
                rhs: b_name.clone(),
                rhs_elem: b_dyn.elem_type(),
            })?;
            if bias.len() != out_c {
                return Err(GraphError::BadInputShape {
                    op: "Conv",
                    name: b_name.clone(),
                    shape: bias.shape().clone(),
                    detail: format!("bias must hold one value per output channel ({out_c})"),
                });
            }
            let out_data = out.data_mut();
            let bias_data = bias.data();
            for n in 0..batch {
                for m in 0..out_c {
                    let base = (n * out_c + m) * spatial;
                    for v in &mut out_data[base..base + spatial] {
                        *v += bias_data[m];
                    }
                }
            }
        }

        Ok(out)
    }
}

impl Node for ConvOp {
    fn op_type(&self) -> &'static str {
        "Conv"
    }

    fn inputs(&self) -> Vec<&str> {
        let mut names = vec![self.x.as_str(), self.w.as_str()];
        if let Some(b) = &self.b {
            names.push(b);
        }
        names
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.y]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let x = io.fetch("Conv", &self.x)?;
        let elem = x.elem_type();

        let result: DynTensor = with_numeric_tensor!(x, x_t => {
            let w_dyn = io.fetch("Conv", &self.w)?;
            let w_t = w_dyn.downcast_ref().ok_or_else(|| GraphError::TypeMismatch {
                op: "Conv",
                lhs: self.x.clone(),
                lhs_elem: elem,
                rhs: self.w.clone(),
                rhs_elem: w_dyn.elem_type(),
            })?;
            self.compute(io, x_t, w_t)?.into()
        }, {
            return Err(GraphError::UnsupportedType {
                op: "Conv",
                name: self.x.clone(),
                elem,
            });
        });

        io.insert(self.y.as_str(), result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(
        b: Option<String>,
        pads: Vec<i64>,
        strides: Vec<usize>,
        kernel: Vec<usize>,
    ) -> ConvOp {
        ConvOp::new("x", "w", b, "y", vec![1, 1], pads, kernel, strides, 1).unwrap()
    }

    fn nchw(dims: Vec<usize>, data: Vec<f32>) -> Tensor<f32> {
        Tensor::from_vec(Shape::new(dims), data).unwrap()
    }

    #[test]
    fn test_attribute_length_validation() {
        let err = ConvOp::new(
            "x",
            "w",
            None,
            "y",
            vec![1],
            vec![0, 0, 0, 0],
            vec![2, 2],
            vec![1, 1],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidAttribute { op: "Conv", .. }));
    }

    #[test]
    fn test_identity_kernel() {
        // A 1x1 kernel of weight 1 reproduces the input.
        let mut io = Registry::new();
        io.insert("x", nchw(vec![1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]));
        io.insert("w", nchw(vec![1, 1, 1, 1], vec![1.0]));

        conv(None, vec![0, 0, 0, 0], vec![1, 1], vec![1, 1])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert_eq!(t.shape(), &Shape::new(vec![1, 1, 2, 2]));
                assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_box_sum_kernel() {
        // An all-ones 2x2 kernel (symmetric, so flipping is a no-op)
        // computes window sums: [[1+2+3+4]] etc.
        let mut io = Registry::new();
        io.insert(
            "x",
            nchw(
                vec![1, 1, 3, 3],
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
            ),
        );
        io.insert("w", nchw(vec![1, 1, 2, 2], vec![1.0; 4]));

        conv(None, vec![0, 0, 0, 0], vec![1, 1], vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert_eq!(t.shape(), &Shape::new(vec![1, 1, 2, 2]));
                assert_eq!(t.data(), &[12.0, 16.0, 24.0, 28.0]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_kernel_is_flipped() {
        // An asymmetric kernel exposes the spatial flip: with kernel
        // [[1, 0], [0, 0]] flipped to [[0, 0], [0, 1]], each output is the
        // bottom-right element of its window.
        let mut io = Registry::new();
        io.insert(
            "x",
            nchw(
                vec![1, 1, 3, 3],
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
            ),
        );
        io.insert("w", nchw(vec![1, 1, 2, 2], vec![1.0, 0.0, 0.0, 0.0]));

        conv(None, vec![0, 0, 0, 0], vec![1, 1], vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[5.0, 6.0, 8.0, 9.0]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_padding_and_stride() {
        // 2x2 input, 2x2 ones kernel, pad 1 all around, stride 2:
        // output 2x2, each position sums one corner element.
        let mut io = Registry::new();
        io.insert("x", nchw(vec![1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]));
        io.insert("w", nchw(vec![1, 1, 2, 2], vec![1.0; 4]));

        conv(None, vec![1, 1, 1, 1], vec![2, 2], vec![2, 2])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert_eq!(t.shape(), &Shape::new(vec![1, 1, 2, 2]));
                assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_bias_per_output_channel() {
        let mut io = Registry::new();
        io.insert("x", nchw(vec![1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]));
        // Two output channels, both identity 1x1 kernels.
        io.insert("w", nchw(vec![2, 1, 1, 1], vec![1.0, 1.0]));
        io.insert(
            "bias",
            Tensor::from_vec(Shape::vector(2), vec![10.0f32, 20.0]).unwrap(),
        );

        ConvOp::new(
            "x",
            "w",
            Some("bias".into()),
            "y",
            vec![1, 1],
            vec![0, 0, 0, 0],
            vec![1, 1],
            vec![1, 1],
            1,
        )
        .unwrap()
        .forward(&mut io, &ExecContext::default())
        .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert_eq!(t.shape(), &Shape::new(vec![1, 2, 2, 2]));
                assert_eq!(
                    t.data(),
                    &[11.0, 12.0, 13.0, 14.0, 21.0, 22.0, 23.0, 24.0]
                );
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_batched_input_keeps_nchw_order() {
        let mut io = Registry::new();
        io.insert(
            "x",
            nchw(
                vec![2, 1, 2, 2],
                vec![1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0],
            ),
        );
        io.insert("w", nchw(vec![1, 1, 1, 1], vec![2.0]));

        conv(None, vec![0, 0, 0, 0], vec![1, 1], vec![1, 1])
            .forward(&mut io, &ExecContext::default())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert_eq!(t.shape(), &Shape::new(vec![2, 1, 2, 2]));
                assert_eq!(
                    t.data(),
                    &[2.0, 4.0, 6.0, 8.0, 20.0, 40.0, 60.0, 80.0]
                );
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_rank4_input() {
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(Shape::matrix(2, 2), vec![0.0f32; 4]).unwrap(),
        );
        io.insert("w", nchw(vec![1, 1, 1, 1], vec![1.0]));

        let err = conv(None, vec![0, 0, 0, 0], vec![1, 1], vec![1, 1])
            .forward(&mut io, &ExecContext::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::BadInputShape { op: "Conv", .. }));
    }

    #[test]
    fn test_rejects_grouped_convolution() {
        let mut io = Registry::new();
        io.insert("x", nchw(vec![1, 1, 2, 2], vec![0.0; 4]));
        io.insert("w", nchw(vec![1, 1, 1, 1], vec![1.0]));

        let err = ConvOp::new(
            "x",
            "w",
            None,
            "y",
            vec![1, 1],
            vec![0, 0, 0, 0],
            vec![1, 1],
            vec![1, 1],
            2,
        )
        .unwrap()
        .forward(&mut io, &ExecContext::default())
        .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Unsupported { op: "Conv", feature: "grouped convolution" }
        ));
    }
}
