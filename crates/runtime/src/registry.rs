// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The name → tensor registry threaded through graph execution.

use crate::GraphError;
use std::collections::HashMap;
use tensor_core::DynTensor;

/// Maps tensor names to their current values during one inference call.
///
/// The registry is seeded with the model's weights and constants, merged
/// with the caller's input bindings, and then mutated by every op's
/// forward pass. Ownership of each tensor is exclusive per named slot;
/// inserting under an existing name replaces the previous value.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    slots: HashMap<String, DynTensor>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the tensor stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, tensor: impl Into<DynTensor>) {
        self.slots.insert(name.into(), tensor.into());
    }

    /// Looks up a tensor by name.
    pub fn get(&self, name: &str) -> Option<&DynTensor> {
        self.slots.get(name)
    }

    /// Looks up a tensor that an op requires, failing with a
    /// [`GraphError::MissingTensor`] naming the op when absent.
    pub fn fetch(&self, op: &'static str, name: &str) -> Result<&DynTensor, GraphError> {
        self.slots.get(name).ok_or_else(|| GraphError::MissingTensor {
            op,
            name: name.to_string(),
        })
    }

    /// Returns `true` if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Number of named slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slots are present.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over the slot names in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

impl FromIterator<(String, DynTensor)> for Registry {
    fn from_iter<I: IntoIterator<Item = (String, DynTensor)>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Shape, Tensor};

    #[test]
    fn test_insert_and_fetch() {
        let mut reg = Registry::new();
        reg.insert("x", Tensor::<f32>::zeros(Shape::vector(3)));
        assert!(reg.contains("x"));
        assert_eq!(reg.fetch("Add", "x").unwrap().len(), 3);
    }

    #[test]
    fn test_fetch_missing_names_op() {
        let reg = Registry::new();
        let err = reg.fetch("Conv", "weights").unwrap_err();
        assert!(matches!(
            err,
            GraphError::MissingTensor { op: "Conv", ref name } if name == "weights"
        ));
    }

    #[test]
    fn test_insert_replaces() {
        let mut reg = Registry::new();
        reg.insert("x", Tensor::<f32>::zeros(Shape::vector(3)));
        reg.insert("x", Tensor::<f32>::zeros(Shape::vector(7)));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("x").unwrap().len(), 7);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut reg = Registry::new();
        reg.insert("x", Tensor::<i32>::zeros(Shape::vector(2)));
        let snapshot = reg.clone();
        reg.insert("y", Tensor::<i32>::zeros(Shape::vector(2)));
        assert!(snapshot.get("y").is_none());
    }
}
