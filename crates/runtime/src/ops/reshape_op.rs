// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shape-manipulation operators: Reshape and Flatten.

use crate::{ExecContext, GraphError, Node, Registry};
use tensor_core::{with_any_tensor, DynTensor, Element, Shape, Tensor};

/// Reshape, with ONNX `-1` inference and `allowzero` semantics.
///
/// The target shape arrives as a second *input* (an int64 tensor), not an
/// attribute. At most one `-1` entry is inferred from the remaining
/// dimensions and the element count; a `0` entry copies the input's
/// dimension at the same position when `allowzero` is set.
#[derive(Debug, Clone)]
pub struct ReshapeOp {
    data: String,
    shape: String,
    output: String,
    allow_zero: bool,
}

impl ReshapeOp {
    pub fn new(
        data: impl Into<String>,
        shape: impl Into<String>,
        output: impl Into<String>,
        allow_zero: bool,
    ) -> Self {
        Self {
            data: data.into(),
            shape: shape.into(),
            output: output.into(),
            allow_zero,
        }
    }
}

fn reshape_with_inference<E: Element>(
    t: &Tensor<E>,
    dims: &[i64],
    allow_zero: bool,
) -> Result<Tensor<E>, GraphError> {
    let data_size = t.len();
    let mut new_shape = vec![0usize; dims.len()];
    let mut inferred: Option<usize> = None;
    let mut known_product = 1usize;

    for (i, &dim) in dims.iter().enumerate() {
        if dim == -1 {
            if inferred.is_some() {
                return Err(GraphError::InvalidAttribute {
                    op: "Reshape",
                    detail: "more than one -1 entry in the target shape".into(),
                });
            }
            inferred = Some(i);
        } else if dim == 0 && allow_zero {
            let copied = t.shape().dim(i).ok_or_else(|| GraphError::InvalidAttribute {
                op: "Reshape",
                detail: format!("no input dimension {i} to copy for a 0 entry"),
            })?;
            new_shape[i] = copied;
            known_product *= copied;
        } else if dim < 0 {
            return Err(GraphError::InvalidAttribute {
                op: "Reshape",
                detail: format!("negative dimension {dim} in the target shape"),
            });
        } else {
            new_shape[i] = dim as usize;
            known_product *= dim as usize;
        }
    }

    if let Some(slot) = inferred {
        if known_product == 0 || data_size % known_product != 0 {
            return Err(GraphError::InvalidAttribute {
                op: "Reshape",
                detail: format!(
                    "cannot infer dimension: {data_size} elements do not divide evenly \
                     across {dims:?}"
                ),
            });
        }
        new_shape[slot] = data_size / known_product;
    }

    t.clone()
        .reshaped(Shape::new(new_shape))
        .map_err(|e| GraphError::tensor("Reshape", e))
}

impl Node for ReshapeOp {
    fn op_type(&self) -> &'static str {
        "Reshape"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.data, &self.shape]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.output]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let shape_tensor = io.fetch("Reshape", &self.shape)?;
        let dims: Vec<i64> = match shape_tensor {
            DynTensor::I64(t) => t.data().to_vec(),
            other => {
                return Err(GraphError::UnsupportedType {
                    op: "Reshape",
                    name: self.shape.clone(),
                    elem: other.elem_type(),
                })
            }
        };

        let data = io.fetch("Reshape", &self.data)?;
        let result: DynTensor = with_any_tensor!(data, t => {
            reshape_with_inference(t, &dims, self.allow_zero)?.into()
        });

        io.insert(self.output.as_str(), result);
        Ok(())
    }
}

/// Flatten: collapses the input into a rank-2 matrix around `axis`.
///
/// Output is `[prod(dims[..axis]), prod(dims[axis..])]`; axis 0 produces
/// `[1, size]`.
#[derive(Debug, Clone)]
pub struct FlattenOp {
    x: String,
    y: String,
    axis: i64,
}

impl FlattenOp {
    pub fn new(x: impl Into<String>, y: impl Into<String>, axis: i64) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            axis,
        }
    }
}

fn flatten<E: Element>(t: &Tensor<E>, axis: i64, name: &str) -> Result<Tensor<E>, GraphError> {
    let rank = t.shape().rank();
    if axis < 0 || axis as usize >= rank.max(1) {
        return Err(GraphError::InvalidAttribute {
            op: "Flatten",
            detail: format!("axis {axis} out of range for rank-{rank} input '{name}'"),
        });
    }
    let axis = axis as usize;
    let dims = t.shape().dims();
    let (rows, cols) = if axis == 0 {
        (1, t.len())
    } else {
        (
            dims[..axis].iter().product(),
            dims[axis..].iter().product(),
        )
    };
    t.clone()
        .reshaped(Shape::matrix(rows, cols))
        .map_err(|e| GraphError::tensor("Flatten", e))
}

impl Node for FlattenOp {
    fn op_type(&self) -> &'static str {
        "Flatten"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.x]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.y]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        let x = io.fetch("Flatten", &self.x)?;
        let result: DynTensor = with_any_tensor!(x, t => {
            flatten(t, self.axis, &self.x)?.into()
        });
        io.insert(self.y.as_str(), result);
        Ok(())
    }
}
