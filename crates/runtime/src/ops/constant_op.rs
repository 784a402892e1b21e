// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The Constant operator.

use crate::{ExecContext, GraphError, Node, Registry};
use tensor_core::DynTensor;

/// Emits a fixed tensor under its output name. The value is baked in at
/// parse time (from the node's `value` attribute); the op has no inputs.
#[derive(Debug, Clone)]
pub struct ConstantOp {
    output: String,
    value: DynTensor,
}

impl ConstantOp {
    pub fn new(output: impl Into<String>, value: impl Into<DynTensor>) -> Self {
        Self {
            output: output.into(),
            value: value.into(),
        }
    }
}

impl Node for ConstantOp {
    fn op_type(&self) -> &'static str {
        "Constant"
    }

    fn inputs(&self) -> Vec<&str> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.output]
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        io.insert(self.output.as_str(), self.value.clone());
        Ok(())
    }
}
