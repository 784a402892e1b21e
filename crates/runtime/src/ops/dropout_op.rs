// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The Dropout operator, inference mode only.

use crate::{ExecContext, GraphError, Node, Registry};
use tensor_core::Tensor;

/// Dropout. During inference it is the identity: the input is copied to
/// the output, and the optional mask output (when declared) is all-true.
/// Training mode is not implemented and fails explicitly.
#[derive(Debug, Clone)]
pub struct DropoutOp {
    data: String,
    output: String,
    mask: Option<String>,
    #[allow(dead_code)]
    ratio: f32,
    training_mode: bool,
}

impl DropoutOp {
    pub fn new(
        data: impl Into<String>,
        output: impl Into<String>,
        mask: Option<String>,
        ratio: f32,
        training_mode: bool,
    ) -> Self {
        Self {
            data: data.into(),
            output: output.into(),
            mask,
            ratio,
            training_mode,
        }
    }

    /// Inference-mode dropout with no mask output.
    pub fn passthrough(data: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(data, output, None, 0.5, false)
    }
}

impl Node for DropoutOp {
    fn op_type(&self) -> &'static str {
        "Dropout"
    }

    fn inputs(&self) -> Vec<&str> {
        vec![&self.data]
    }

    fn outputs(&self) -> Vec<&str> {
        let mut names = vec![self.output.as_str()];
        if let Some(mask) = &self.mask {
            names.push(mask);
        }
        names
    }

    fn forward(&self, io: &mut Registry, _cx: &ExecContext) -> Result<(), GraphError> {
        if self.training_mode {
            return Err(GraphError::Unsupported {
                op: "Dropout",
                feature: "training mode",
            });
        }
        let data = io.fetch("Dropout", &self.data)?.clone();
        if let Some(mask_name) = &self.mask {
            let mask = Tensor::<bool>::filled(data.shape().clone(), true);
            io.insert(mask_name.as_str(), mask);
        }
        io.insert(self.output.as_str(), data);
        Ok(())
    }
}
