// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-loader
//!
//! Parses the ONNX-shaped JSON model description into a runnable
//! [`runtime::Model`].
//!
//! The document carries the graph under `graph`:
//! - `initializer[]` — embedded weight tensors, each with a `dataType`
//!   code, `dims`, and either an inline numeric array (entries may be
//!   string-encoded, as protobuf's JSON form prints 64-bit integers) or
//!   base64 raw little-endian bytes in `rawData`.
//! - `node[]` — operators with `opType`, `input`/`output` name arrays
//!   (the `inputs`/`outputs` spellings are accepted too), and an
//!   `attribute` list.
//! - `input[]` / `output[]` — the top-level tensor names.
//!
//! Parsing is strict: unknown op types, unsupported `dataType` codes,
//! and misaligned raw-byte lengths are immediate [`ParseError`]s.

mod doc;
mod error;
mod parser;
mod weights;

pub use doc::{AttributeDoc, GraphDoc, ModelDoc, NodeDoc, TensorDoc, ValueInfoDoc};
pub use error::ParseError;
pub use parser::{parse_file, parse_str};
pub use weights::decode_tensor;
