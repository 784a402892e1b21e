// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The Gemm operator: `Y = alpha * op(A) * op(B) + beta * C`.

use crate::{ExecContext, GraphError, Node, Registry};
use tensor_core::{with_numeric_pair, DynTensor, Numeric, Shape, Tensor};

/// General matrix multiply with optional bias operand.
///
/// `A` is `[M, K]` (`[K, M]` with `trans_a`), `B` is `[K, N]` (`[N, K]`
/// with `trans_b`). The optional `C` seeds the accumulator and may be a
/// row vector `[N]`, broadcast over the `M` rows, or a full `[M, N]`
/// matrix. The actual multiplication dispatches to the GEMM kernel
/// carried by the [`ExecContext`].
#[derive(Debug, Clone)]
pub struct GemmOp {
    a: String,
    b: String,
    c: Option<String>,
    y: String,
    alpha: f32,
    beta: f32,
    trans_a: bool,
    trans_b: bool,
}

impl GemmOp {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        c: Option<String>,
        y: impl Into<String>,
        alpha: f32,
        beta: f32,
        trans_a: bool,
        trans_b: bool,
    ) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            c,
            y: y.into(),
            alpha,
            beta,
            trans_a,
            trans_b,
        }
    }

    /// Plain `Y = A * B` with default attributes.
    pub fn simple(
        a: impl Into<String>,
        b: impl Into<String>,
        y: impl Into<String>,
    ) -> Self {
        Self::new(a, b, None, y, 1.0, 1.0, false, false)
    }

    fn compute<T: Numeric>(
        &self,
        io: &Registry,
        cx: &ExecContext,
        a: &Tensor<T>,
        b: &Tensor<T>,
    ) -> Result<Tensor<T>, GraphError> {
        if a.shape().rank() != 2 {
            return Err(GraphError::BadInputShape {
                op: "Gemm",
                name: self.a.clone(),
                shape: a.shape().clone(),
                detail: "expected a rank-2 matrix".into(),
            });
        }
        if b.shape().rank() != 2 {
            return Err(GraphError::BadInputShape {
                op: "Gemm",
                name: self.b.clone(),
                shape: b.shape().clone(),
                detail: "expected a rank-2 matrix".into(),
            });
        }

        let a_dims = a.shape().dims();
        let b_dims = b.shape().dims();
        let (m, k) = if self.trans_a {
            (a_dims[1], a_dims[0])
        } else {
            (a_dims[0], a_dims[1])
        };
        let (k_b, n) = if self.trans_b {
            (b_dims[1], b_dims[0])
        } else {
            (b_dims[0], b_dims[1])
        };
        if k != k_b {
            return Err(GraphError::BadInputShape {
                op: "Gemm",
                name: self.b.clone(),
                shape: b.shape().clone(),
                detail: format!("inner dimension {k_b} does not match A's {k}"),
            });
        }

        let mut acc = match &self.c {
            Some(c_name) => {
                let c_dyn = io.fetch("Gemm", c_name)?;
                let c: &Tensor<T> = c_dyn.downcast_ref().ok_or_else(|| GraphError::TypeMismatch {
                    op: "Gemm",
                    lhs: self.a.clone(),
                    lhs_elem: T::ELEM,
                    rhs: c_name.clone(),
                    rhs_elem: c_dyn.elem_type(),
                })?;
                seed_accumulator(c_name, c, m, n)?
            }
            None => Tensor::zeros(Shape::matrix(m, n)),
        };

        let alpha = cast_scalar::<T>("alpha", self.alpha)?;
        let beta = cast_scalar::<T>("beta", self.beta)?;

        cx.gemm
            .run(self.trans_a, self.trans_b, m, n, k, alpha, beta, a, b, &mut acc)
            .map_err(|e| GraphError::kernel("Gemm", e))?;
        Ok(acc)
    }
}

/// Converts an attribute scalar into the operand element type.
fn cast_scalar<T: Numeric>(attr: &'static str, value: f32) -> Result<T, GraphError> {
    T::from_f32(value).ok_or_else(|| GraphError::InvalidAttribute {
        op: "Gemm",
        detail: format!("{attr} value {value} is not representable as {}", T::ELEM),
    })
}

/// Builds the `[M, N]` accumulator from the optional C operand.
fn seed_accumulator<T: Numeric>(
    name: &str,
    c: &Tensor<T>,
    m: usize,
    n: usize,
) -> Result<Tensor<T>, GraphError> {
    let dims = c.shape().dims();
    if dims.len() == 1 && dims[0] == n {
        // Row vector broadcast over the M rows.
        let mut acc = Tensor::zeros(Shape::matrix(m, n));
        for row in 0..m {
            acc.data_mut()[row * n..(row + 1) * n].copy_from_slice(c.data());
        }
        Ok(acc)
    } else if dims.len() == 2 && dims[0] == m && dims[1] == n {
        Ok(c.clone())
    } else {
        Err(GraphError::BadInputShape {
            op: "Gemm",
            name: name.to_string(),
            shape: c.shape().clone(),
            detail: format!("C must be [{n}] or [{m}, {n}]"),
        })
    }
}

impl Node for GemmOp {
    fn op_type(&self) -> &'static str {
        "Gemm"
    }

    fn inputs(&self) -> Vec<&str> {
        let mut names = vec![self.a.as_str(), self.b.as_str()];
        if let Some(c) = &self.c {
            names.push(c);
        }
        names
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.y]
    }

    fn forward(&self, io: &mut Registry, cx: &ExecContext) -> Result<(), GraphError> {
        let a = io.fetch("Gemm", &self.a)?;
        let b = io.fetch("Gemm", &self.b)?;
        let (a_elem, b_elem) = (a.elem_type(), b.elem_type());

        let result: DynTensor = with_numeric_pair!((a, b), (x, y) => {
            self.compute(io, cx, x, y)?.into()
        }, {
            return Err(GraphError::TypeMismatch {
                op: "Gemm",
                lhs: self.a.clone(),
                lhs_elem: a_elem,
                rhs: self.b.clone(),
                rhs_elem: b_elem,
            });
        });

        io.insert(self.y.as_str(), result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernels::GemmKernel;

    fn ctx() -> ExecContext {
        ExecContext::default()
    }

    fn f32_matrix(rows: usize, cols: usize, data: Vec<f32>) -> Tensor<f32> {
        Tensor::from_vec(Shape::matrix(rows, cols), data).unwrap()
    }

    #[test]
    fn test_plain_matmul() {
        let mut io = Registry::new();
        io.insert("a", f32_matrix(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        io.insert("b", f32_matrix(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]));

        GemmOp::simple("a", "b", "y")
            .forward(&mut io, &ctx())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[58.0, 64.0, 139.0, 154.0]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_bias_row_vector_broadcast() {
        let mut io = Registry::new();
        io.insert("a", f32_matrix(2, 2, vec![1.0, 0.0, 0.0, 1.0]));
        io.insert("b", f32_matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]));
        io.insert(
            "bias",
            Tensor::from_vec(Shape::vector(2), vec![100.0f32, 200.0]).unwrap(),
        );

        GemmOp::new("a", "b", Some("bias".into()), "y", 1.0, 1.0, false, false)
            .forward(&mut io, &ctx())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[101.0, 202.0, 103.0, 204.0]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_transpose_attributes() {
        // op(A) = A^T: stored [3, 2] holding the transpose of [[1,2,3],[4,5,6]].
        let mut io = Registry::new();
        io.insert("a", f32_matrix(3, 2, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]));
        io.insert("b", f32_matrix(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]));

        GemmOp::new("a", "b", None, "y", 1.0, 1.0, true, false)
            .forward(&mut io, &ctx())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[58.0, 64.0, 139.0, 154.0]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_alpha_beta_scaling() {
        let mut io = Registry::new();
        io.insert("a", f32_matrix(1, 1, vec![3.0]));
        io.insert("b", f32_matrix(1, 1, vec![4.0]));
        io.insert("c", f32_matrix(1, 1, vec![10.0]));

        GemmOp::new("a", "b", Some("c".into()), "y", 2.0, 0.5, false, false)
            .forward(&mut io, &ctx())
            .unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[29.0]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_inner_dim_mismatch() {
        let mut io = Registry::new();
        io.insert("a", f32_matrix(2, 3, vec![0.0; 6]));
        io.insert("b", f32_matrix(4, 2, vec![0.0; 8]));

        let err = GemmOp::simple("a", "b", "y")
            .forward(&mut io, &ctx())
            .unwrap_err();
        assert!(matches!(err, GraphError::BadInputShape { op: "Gemm", .. }));
    }

    #[test]
    fn test_bad_bias_shape() {
        let mut io = Registry::new();
        io.insert("a", f32_matrix(2, 2, vec![0.0; 4]));
        io.insert("b", f32_matrix(2, 2, vec![0.0; 4]));
        io.insert("bias", f32_matrix(3, 3, vec![0.0; 9]));

        let err = GemmOp::new("a", "b", Some("bias".into()), "y", 1.0, 1.0, false, false)
            .forward(&mut io, &ctx())
            .unwrap_err();
        assert!(matches!(err, GraphError::BadInputShape { op: "Gemm", .. }));
    }

    #[test]
    fn test_bias_type_mismatch() {
        let mut io = Registry::new();
        io.insert("a", f32_matrix(1, 1, vec![1.0]));
        io.insert("b", f32_matrix(1, 1, vec![1.0]));
        io.insert(
            "bias",
            Tensor::from_vec(Shape::vector(1), vec![1.0f64]).unwrap(),
        );

        let err = GemmOp::new("a", "b", Some("bias".into()), "y", 1.0, 1.0, false, false)
            .forward(&mut io, &ctx())
            .unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { op: "Gemm", .. }));
    }

    #[test]
    fn test_respects_injected_kernel() {
        // The blocked kernel rejects transposes; the error must surface
        // through the op rather than silently falling back.
        let mut io = Registry::new();
        io.insert("a", f32_matrix(2, 2, vec![0.0; 4]));
        io.insert("b", f32_matrix(2, 2, vec![0.0; 4]));

        let cx = ExecContext {
            gemm: GemmKernel::Blocked,
        };
        let err = GemmOp::new("a", "b", None, "y", 1.0, 1.0, true, false)
            .forward(&mut io, &cx)
            .unwrap_err();
        assert!(matches!(err, GraphError::Kernel { op: "Gemm", .. }));
    }

    #[test]
    fn test_integer_gemm_via_simd_kernel() {
        let mut io = Registry::new();
        io.insert(
            "a",
            Tensor::from_vec(Shape::matrix(2, 2), vec![1i32, 2, 3, 4]).unwrap(),
        );
        io.insert(
            "b",
            Tensor::from_vec(Shape::matrix(2, 2), vec![5i32, 6, 7, 8]).unwrap(),
        );

        let cx = ExecContext {
            gemm: GemmKernel::Simd256,
        };
        GemmOp::simple("a", "b", "y").forward(&mut io, &cx).unwrap();
        match io.get("y").unwrap() {
            DynTensor::I32(t) => assert_eq!(t.data(), &[19, 22, 43, 50]),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
