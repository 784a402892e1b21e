// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Serde document types mirroring the ONNX-shaped JSON layout.
//!
//! The format is loose in two ways this module has to absorb: 64-bit
//! integers frequently arrive as JSON strings (protobuf's JSON form),
//! and some producers spell the node arrays `inputs`/`outputs`/
//! `attributes` instead of the protobuf singulars. Numeric fields are
//! therefore kept as [`serde_json::Value`] and converted through the
//! helpers here.

use crate::ParseError;
use serde_json::Value;

/// The top-level model document.
#[derive(Debug, serde::Deserialize)]
pub struct ModelDoc {
    pub graph: GraphDoc,
}

/// The `graph` object: initializers, nodes, and the declared IO names.
#[derive(Debug, Default, serde::Deserialize)]
pub struct GraphDoc {
    #[serde(default)]
    pub initializer: Vec<TensorDoc>,
    #[serde(default)]
    pub node: Vec<NodeDoc>,
    #[serde(default)]
    pub input: Vec<ValueInfoDoc>,
    #[serde(default)]
    pub output: Vec<ValueInfoDoc>,
}

/// A named top-level input or output.
#[derive(Debug, serde::Deserialize)]
pub struct ValueInfoDoc {
    pub name: String,
}

/// An embedded tensor: either an initializer or a Constant `value`.
///
/// Exactly one data representation is expected: `rawData` (base64
/// little-endian bytes) or the inline array matching the `dataType`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TensorDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Value,
    #[serde(default)]
    pub dims: Vec<Value>,
    #[serde(default)]
    pub raw_data: Option<String>,
    #[serde(default)]
    pub float_data: Vec<Value>,
    #[serde(default)]
    pub double_data: Vec<Value>,
    #[serde(default)]
    pub int64_data: Vec<Value>,
    #[serde(default)]
    pub int32_data: Vec<Value>,
    #[serde(default)]
    pub int16_data: Vec<Value>,
    #[serde(default)]
    pub int8_data: Vec<Value>,
    #[serde(default)]
    pub uint64_data: Vec<Value>,
    #[serde(default)]
    pub uint32_data: Vec<Value>,
    #[serde(default)]
    pub uint16_data: Vec<Value>,
    #[serde(default)]
    pub uint8_data: Vec<Value>,
    #[serde(default)]
    pub bool_data: Vec<Value>,
}

impl TensorDoc {
    /// The initializer's name, or a placeholder for unnamed Constant
    /// values.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// One operator entry from `graph.node[]`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDoc {
    #[serde(default)]
    pub name: Option<String>,
    pub op_type: String,
    #[serde(default, alias = "inputs")]
    pub input: Vec<String>,
    #[serde(default, alias = "outputs")]
    pub output: Vec<String>,
    #[serde(default, alias = "attributes")]
    pub attribute: Vec<AttributeDoc>,
}

impl NodeDoc {
    /// A stable identifier for error messages: the node's name when
    /// present, otherwise its op type.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.op_type)
    }

    /// Looks up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&AttributeDoc> {
        self.attribute.iter().find(|a| a.name == name)
    }
}

/// One node attribute. Which payload field applies depends on the
/// attribute, so all are optional.
#[derive(Debug, Default, serde::Deserialize)]
pub struct AttributeDoc {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub i: Option<Value>,
    #[serde(default)]
    pub f: Option<Value>,
    #[serde(default)]
    pub s: Option<String>,
    #[serde(default)]
    pub ints: Vec<Value>,
    #[serde(default)]
    pub t: Option<TensorDoc>,
}

impl AttributeDoc {
    /// Reads the `i` payload as an integer.
    pub fn as_i64(&self) -> Result<i64, ParseError> {
        self.i
            .as_ref()
            .and_then(value_to_i64)
            .ok_or_else(|| ParseError::BadAttribute {
                name: self.name.clone(),
                detail: "expected an integer payload".into(),
            })
    }

    /// Reads the `f` payload as a float.
    pub fn as_f32(&self) -> Result<f32, ParseError> {
        self.f
            .as_ref()
            .and_then(value_to_f64)
            .map(|v| v as f32)
            .ok_or_else(|| ParseError::BadAttribute {
                name: self.name.clone(),
                detail: "expected a float payload".into(),
            })
    }

    /// Reads the `s` payload.
    pub fn as_str(&self) -> Result<&str, ParseError> {
        self.s.as_deref().ok_or_else(|| ParseError::BadAttribute {
            name: self.name.clone(),
            detail: "expected a string payload".into(),
        })
    }

    /// Reads the `ints` payload.
    pub fn as_i64_vec(&self) -> Result<Vec<i64>, ParseError> {
        self.ints
            .iter()
            .map(value_to_i64)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ParseError::BadAttribute {
                name: self.name.clone(),
                detail: "expected an integer array payload".into(),
            })
    }

    /// Reads the `ints` payload as non-negative sizes.
    pub fn as_usize_vec(&self) -> Result<Vec<usize>, ParseError> {
        self.as_i64_vec()?
            .into_iter()
            .map(|v| usize::try_from(v).ok())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ParseError::BadAttribute {
                name: self.name.clone(),
                detail: "expected non-negative integer array payload".into(),
            })
    }
}

/// Converts a JSON value holding an integer (number, protobuf-style
/// string, or bool) to `i64`.
pub(crate) fn value_to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Converts a JSON value holding a float (number or string) to `f64`.
pub(crate) fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_aliases() {
        let plural: NodeDoc = serde_json::from_str(
            r#"{"opType": "Conv", "inputs": ["x", "w"], "outputs": ["y"]}"#,
        )
        .unwrap();
        assert_eq!(plural.input, vec!["x", "w"]);
        assert_eq!(plural.output, vec!["y"]);

        let singular: NodeDoc =
            serde_json::from_str(r#"{"opType": "Relu", "input": ["x"], "output": ["y"]}"#)
                .unwrap();
        assert_eq!(singular.input, vec!["x"]);
    }

    #[test]
    fn test_attribute_payloads() {
        let attr: AttributeDoc = serde_json::from_str(
            r#"{"name": "strides", "ints": ["2", 2]}"#,
        )
        .unwrap();
        assert_eq!(attr.as_usize_vec().unwrap(), vec![2, 2]);

        let attr: AttributeDoc =
            serde_json::from_str(r#"{"name": "alpha", "f": 0.5}"#).unwrap();
        assert_eq!(attr.as_f32().unwrap(), 0.5);

        let attr: AttributeDoc =
            serde_json::from_str(r#"{"name": "transA", "i": "1"}"#).unwrap();
        assert_eq!(attr.as_i64().unwrap(), 1);
    }

    #[test]
    fn test_attribute_wrong_payload() {
        let attr: AttributeDoc =
            serde_json::from_str(r#"{"name": "auto_pad", "s": "VALID"}"#).unwrap();
        assert_eq!(attr.as_str().unwrap(), "VALID");
        assert!(attr.as_i64().is_err());
        assert!(attr.as_f32().is_err());
    }

    #[test]
    fn test_negative_size_rejected() {
        let attr: AttributeDoc =
            serde_json::from_str(r#"{"name": "kernel_shape", "ints": [-2, 2]}"#).unwrap();
        assert!(attr.as_usize_vec().is_err());
    }
}
