// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise operators: Add (with broadcasting), ReLU, TanH, Swish.

use crate::{ExecContext, GraphError, Node, Registry};
use tensor_core::{
    with_float_tensor, with_numeric_pair, with_numeric_tensor, DynTensor, Element, FloatElement,
    Numeric, Tensor, TensorError,
};

/// Applies `f` to every element, producing a new tensor of the same shape.
fn map_tensor<E: Element>(t: &Tensor<E>, f: impl Fn(E) -> E) -> Tensor<E> {
    let mut out = t.clone();
    out.data_mut().iter_mut().for_each(|x| *x = f(*x));
    out
}

fn relu<T: Numeric>(t: &Tensor<T>) -> Tensor<T> {
    map_tensor(t, |x| if x > T::zero() { x } else { T::zero() })
}

fn tanh<T: FloatElement>(t: &Tensor<T>) -> Tensor<T> {
    map_tensor(t, |x| x.tanh())
}

fn swish<T: FloatElement>(t: &Tensor<T>) -> Tensor<T> {
    map_tensor(t, |x| x / (T::one() + (-x).exp()))
}

/// Adds two equal-shaped tensors element-wise.
fn add_same_shape<T: Numeric>(a: &Tensor<T>, b: &Tensor<T>) -> Tensor<T> {
    let mut out = a.clone();
    out.data_mut()
        .iter_mut()
        .zip(b.data())
        .for_each(|(x, &y)| *x = *x + y);
    out
}

/// Adds two broadcast-compatible tensors.
///
/// The output shape is the per-dimension max of the trailing-aligned
/// operand shapes; each operand coordinate wraps on its size-1 (or
/// missing) dimensions. Walks the output buffer once, deriving both
/// operand offsets from the flat index.
fn add_broadcast<T: Numeric>(a: &Tensor<T>, b: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
    let out_shape = a.shape().broadcast_with(b.shape())?;
    let out_strides = out_shape.strides();
    let rank = out_shape.rank();

    let a_dims = a.shape().dims();
    let b_dims = b.shape().dims();
    let a_strides = a.shape().strides();
    let b_strides = b.shape().strides();
    let a_rank = a_dims.len();
    let b_rank = b_dims.len();

    let mut out = Tensor::zeros(out_shape);
    let a_data = a.data();
    let b_data = b.data();

    for flat in 0..out.len() {
        let mut remaining = flat;
        let mut a_off = 0usize;
        let mut b_off = 0usize;
        for d in 0..rank {
            let coord = remaining / out_strides[d];
            remaining %= out_strides[d];
            if d + a_rank >= rank {
                let ad = d + a_rank - rank;
                if a_dims[ad] > 1 {
                    a_off += coord * a_strides[ad];
                }
            }
            if d + b_rank >= rank {
                let bd = d + b_rank - rank;
                if b_dims[bd] > 1 {
                    b_off += coord * b_strides[bd];
                }
            }
        }
        out.data_mut()[flat] = a_data[a_off] + b_data[b_off];
    }
    Ok(out)
}

fn add_tensors<T: Numeric>(a: &Tensor<T>, b: &Tensor<T>) -> Result<Tensor<T>, GraphError> {
    if a.shape() == b.shape() {
        Ok(add_same_shape(a, b))
    } else {
        add_broadcast(a, b).map_err(|e| GraphError::tensor("Add", e))
    }
}

/// Element-wise (or broadcast) addition: `C = A + B`.
#[derive(Debug, Clone)]
pub struct AddOp {
    a: String,
    b: String,
    out: String,
}

impl AddOp {
    pub fn new(a: impl Into<String>, b: impl Into<String>, out: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            out: out.into(),
        }
    }
}

impl Node for AddOp {
    fn op_type(&self) -> &'static str {
        "Add"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.a, &self.b]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.out]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let a = io.fetch("Add", &self.a)?;
        let b = io.fetch("Add", &self.b)?;
        let (a_elem, b_elem) = (a.elem_type(), b.elem_type());

        let result: DynTensor = with_numeric_pair!((a, b), (x, y) => add_tensors(x, y)?.into(), {
            return Err(GraphError::TypeMismatch {
                op: "Add",
                lhs: self.a.clone(),
                lhs_elem: a_elem,
                rhs: self.b.clone(),
                rhs_elem: b_elem,
            });
        });

        io.insert(self.out.as_str(), result);
        Ok(())
    }
}

/// Rectified linear unit: `y = max(x, 0)`, any numeric element type.
#[derive(Debug, Clone)]
pub struct ReluOp {
    input: String,
    output: String,
}

impl ReluOp {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

impl Node for ReluOp {
    fn op_type(&self) -> &'static str {
        "Relu"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.input]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.output]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let x = io.fetch("Relu", &self.input)?;
        let elem = x.elem_type();
        let result: DynTensor = with_numeric_tensor!(x, t => relu(t).into(), {
            return Err(GraphError::UnsupportedType {
                op: "Relu",
                name: self.input.clone(),
                elem,
            });
        });
        io.insert(self.output.as_str(), result);
        Ok(())
    }
}

/// Hyperbolic tangent, floating-point element types only.
#[derive(Debug, Clone)]
pub struct TanhOp {
    input: String,
    output: String,
}

impl TanhOp {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

impl Node for TanhOp {
    fn op_type(&self) -> &'static str {
        "Tanh"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.input]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.output]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let x = io.fetch("Tanh", &self.input)?;
        let elem = x.elem_type();
        let result: DynTensor = with_float_tensor!(x, t => tanh(t).into(), {
            return Err(GraphError::UnsupportedType {
                op: "Tanh",
                name: self.input.clone(),
                elem,
            });
        });
        io.insert(self.output.as_str(), result);
        Ok(())
    }
}

/// Swish activation: `y = x * sigmoid(x)`, floating-point only.
#[derive(Debug, Clone)]
pub struct SwishOp {
    input: String,
    output: String,
}

impl SwishOp {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

impl Node for SwishOp {
    fn op_type(&self) -> &'static str {
        "Swish"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.input]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.output]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let x = io.fetch("Swish", &self.input)?;
        let elem = x.elem_type();
        let result: DynTensor = with_float_tensor!(x, t => swish(t).into(), {
            return Err(GraphError::UnsupportedType {
                op: "Swish",
                name: self.input.clone(),
                elem,
            });
        });
        io.insert(self.output.as_str(), result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    fn run(op: &dyn Node, io: &mut Registry) -> Result<(), GraphError> {
        op.forward(io, &ExecContext::default())
    }

    #[test]
    fn test_add_equal_shapes() {
        let mut io = Registry::new();
        io.insert(
            "a",
            Tensor::from_vec(Shape::vector(3), vec![1.0f32, 2.0, 3.0]).unwrap(),
        );
        io.insert(
            "b",
            Tensor::from_vec(Shape::vector(3), vec![10.0f32, 20.0, 30.0]).unwrap(),
        );

        run(&AddOp::new("a", "b", "c"), &mut io).unwrap();
        match io.get("c").unwrap() {
            DynTensor::F32(t) => assert_eq!(t.data(), &[11.0, 22.0, 33.0]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_add_broadcast_row_vector() {
        // [2, 3] + [3] broadcasts the row vector over both rows.
        let mut io = Registry::new();
        io.insert(
            "a",
            Tensor::from_vec(Shape::matrix(2, 3), vec![1i32, 2, 3, 4, 5, 6]).unwrap(),
        );
        io.insert(
            "b",
            Tensor::from_vec(Shape::vector(3), vec![10i32, 20, 30]).unwrap(),
        );

        run(&AddOp::new("a", "b", "c"), &mut io).unwrap();
        match io.get("c").unwrap() {
            DynTensor::I32(t) => {
                assert_eq!(t.shape(), &Shape::matrix(2, 3));
                assert_eq!(t.data(), &[11, 22, 33, 14, 25, 36]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_add_broadcast_both_directions() {
        // [2, 1] + [1, 3] -> [2, 3].
        let mut io = Registry::new();
        io.insert(
            "a",
            Tensor::from_vec(Shape::matrix(2, 1), vec![1.0f64, 2.0]).unwrap(),
        );
        io.insert(
            "b",
            Tensor::from_vec(Shape::matrix(1, 3), vec![10.0f64, 20.0, 30.0]).unwrap(),
        );

        run(&AddOp::new("a", "b", "c"), &mut io).unwrap();
        match io.get("c").unwrap() {
            DynTensor::F64(t) => {
                assert_eq!(t.shape(), &Shape::matrix(2, 3));
                assert_eq!(t.data(), &[11.0, 21.0, 31.0, 12.0, 22.0, 32.0]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_add_incompatible_shapes() {
        let mut io = Registry::new();
        io.insert("a", Tensor::<f32>::zeros(Shape::matrix(2, 3)));
        io.insert("b", Tensor::<f32>::zeros(Shape::matrix(2, 4)));

        let err = run(&AddOp::new("a", "b", "c"), &mut io).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Tensor { op: "Add", source: TensorError::BroadcastMismatch { .. } }
        ));
    }

    #[test]
    fn test_add_type_mismatch() {
        let mut io = Registry::new();
        io.insert("a", Tensor::<f32>::zeros(Shape::vector(2)));
        io.insert("b", Tensor::<f64>::zeros(Shape::vector(2)));

        let err = run(&AddOp::new("a", "b", "c"), &mut io).unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { op: "Add", .. }));
    }

    #[test]
    fn test_add_missing_input() {
        let mut io = Registry::new();
        io.insert("a", Tensor::<f32>::zeros(Shape::vector(2)));

        let err = run(&AddOp::new("a", "b", "c"), &mut io).unwrap_err();
        assert!(matches!(
            err,
            GraphError::MissingTensor { op: "Add", ref name } if name == "b"
        ));
    }

    #[test]
    fn test_relu() {
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(Shape::vector(4), vec![-2i64, -1, 0, 5]).unwrap(),
        );

        run(&ReluOp::new("x", "y"), &mut io).unwrap();
        match io.get("y").unwrap() {
            DynTensor::I64(t) => assert_eq!(t.data(), &[0, 0, 0, 5]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_relu_rejects_bool() {
        let mut io = Registry::new();
        io.insert("x", Tensor::<bool>::zeros(Shape::vector(2)));

        let err = run(&ReluOp::new("x", "y"), &mut io).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedType { op: "Relu", .. }));
    }

    #[test]
    fn test_tanh() {
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(Shape::vector(3), vec![-1.0f32, 0.0, 1.0]).unwrap(),
        );

        run(&TanhOp::new("x", "y"), &mut io).unwrap();
        match io.get("y").unwrap() {
            DynTensor::F32(t) => {
                assert!((t.data()[0] - (-0.761_594_2)).abs() < 1e-6);
                assert_eq!(t.data()[1], 0.0);
                assert!((t.data()[2] - 0.761_594_2).abs() < 1e-6);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_tanh_rejects_integers() {
        let mut io = Registry::new();
        io.insert("x", Tensor::<i32>::zeros(Shape::vector(2)));

        let err = run(&TanhOp::new("x", "y"), &mut io).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedType { op: "Tanh", .. }));
    }

    #[test]
    fn test_swish() {
        let mut io = Registry::new();
        io.insert(
            "x",
            Tensor::from_vec(Shape::vector(2), vec![0.0f64, 1.0]).unwrap(),
        );

        run(&SwishOp::new("x", "y"), &mut io).unwrap();
        match io.get("y").unwrap() {
            DynTensor::F64(t) => {
                assert_eq!(t.data()[0], 0.0);
                // 1 / (1 + e^-1) = 0.731058...
                assert!((t.data()[1] - 0.731_058_578_630_004_9).abs() < 1e-12);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
