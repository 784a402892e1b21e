// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model parsing.

use runtime::GraphError;
use tensor_core::{ElemType, TensorError};

/// Errors that can occur while parsing a model document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The model file could not be read.
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON or misses required structure.
    #[error("failed to parse model JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An initializer uses a `dataType` code the engine does not support.
    #[error("initializer '{name}': unsupported dataType code {code}")]
    UnsupportedDataType { name: String, code: i64 },

    /// An initializer's `rawData` is not valid base64.
    #[error("initializer '{name}': invalid base64 raw data: {source}")]
    Base64 {
        name: String,
        source: base64::DecodeError,
    },

    /// Decoded raw bytes do not divide evenly into scalars.
    #[error("initializer '{name}': raw data length {len} is not a multiple of the {elem} width")]
    ByteLength {
        name: String,
        len: usize,
        elem: ElemType,
    },

    /// A numeric data entry could not be converted to the target type.
    #[error("initializer '{name}': malformed entry in {field}")]
    MalformedData { name: String, field: &'static str },

    /// An initializer declares neither inline data nor raw bytes.
    #[error("initializer '{name}': no data field present")]
    MissingData { name: String },

    /// A node is missing a required input, output, or attribute.
    #[error("node '{node}': missing required {what}")]
    MissingField { node: String, what: &'static str },

    /// An attribute value has the wrong form.
    #[error("attribute '{name}': {detail}")]
    BadAttribute { name: String, detail: String },

    /// The graph references an operation type outside the supported set.
    #[error("unsupported operation type '{0}'")]
    UnsupportedOp(String),

    /// Constructing or validating a graph op failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Materializing a tensor failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
