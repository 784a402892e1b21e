// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Decoding embedded weight tensors.
//!
//! Initializer data arrives either as an inline array in the field
//! matching the declared `dataType` (entries may be string-encoded) or
//! as base64 raw bytes in little-endian order. Raw byte counts must be
//! an exact multiple of the scalar width; anything else fails decoding.

use crate::doc::{value_to_f64, value_to_i64, TensorDoc};
use crate::ParseError;
use base64::Engine;
use serde_json::Value;
use tensor_core::{DynTensor, ElemType, Element, Shape, Tensor};

/// Materializes a tensor from an initializer (or Constant `value`)
/// document.
pub fn decode_tensor(doc: &TensorDoc) -> Result<DynTensor, ParseError> {
    let name = doc.display_name();
    let code = value_to_i64(&doc.data_type).ok_or_else(|| ParseError::UnsupportedDataType {
        name: name.to_string(),
        code: -1,
    })?;
    let elem = ElemType::from_onnx_code(code).ok_or_else(|| ParseError::UnsupportedDataType {
        name: name.to_string(),
        code,
    })?;

    let dims = doc
        .dims
        .iter()
        .map(|v| value_to_i64(v).and_then(|d| usize::try_from(d).ok()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ParseError::MalformedData {
            name: name.to_string(),
            field: "dims",
        })?;
    let shape = Shape::new(dims);

    match elem {
        ElemType::F32 => typed::<f32>(doc, shape, &doc.float_data, "floatData"),
        ElemType::F64 => typed::<f64>(doc, shape, &doc.double_data, "doubleData"),
        ElemType::I64 => typed::<i64>(doc, shape, &doc.int64_data, "int64Data"),
        ElemType::I32 => typed::<i32>(doc, shape, &doc.int32_data, "int32Data"),
        ElemType::I16 => typed::<i16>(doc, shape, &doc.int16_data, "int16Data"),
        ElemType::I8 => typed::<i8>(doc, shape, &doc.int8_data, "int8Data"),
        ElemType::U64 => typed::<u64>(doc, shape, &doc.uint64_data, "uint64Data"),
        ElemType::U32 => typed::<u32>(doc, shape, &doc.uint32_data, "uint32Data"),
        ElemType::U16 => typed::<u16>(doc, shape, &doc.uint16_data, "uint16Data"),
        ElemType::U8 => typed::<u8>(doc, shape, &doc.uint8_data, "uint8Data"),
        ElemType::Bool => typed::<bool>(doc, shape, &doc.bool_data, "boolData"),
    }
}

fn typed<E: Element + JsonScalar>(
    doc: &TensorDoc,
    shape: Shape,
    inline: &[Value],
    field: &'static str,
) -> Result<DynTensor, ParseError>
where
    DynTensor: From<Tensor<E>>,
{
    let name = doc.display_name();
    let data: Vec<E> = if let Some(raw) = &doc.raw_data {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|source| ParseError::Base64 {
                name: name.to_string(),
                source,
            })?;
        decode_raw(name, &bytes)?
    } else if !inline.is_empty() {
        inline
            .iter()
            .map(E::from_json)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ParseError::MalformedData {
                name: name.to_string(),
                field,
            })?
    } else {
        return Err(ParseError::MissingData {
            name: name.to_string(),
        });
    };

    Ok(Tensor::from_vec(shape, data)?.into())
}

/// Splits a little-endian byte block into scalars.
fn decode_raw<E: Element>(name: &str, bytes: &[u8]) -> Result<Vec<E>, ParseError> {
    let width = E::ELEM.size_bytes();
    if bytes.len() % width != 0 {
        return Err(ParseError::ByteLength {
            name: name.to_string(),
            len: bytes.len(),
            elem: E::ELEM,
        });
    }
    Ok(bytes.chunks_exact(width).map(E::from_le_bytes).collect())
}

/// Conversion from a loose JSON value into one scalar.
trait JsonScalar: Sized {
    fn from_json(value: &Value) -> Option<Self>;
}

macro_rules! impl_json_int {
    ($($ty:ty),*) => {
        $(
            impl JsonScalar for $ty {
                fn from_json(value: &Value) -> Option<Self> {
                    value_to_i64(value).and_then(|v| <$ty>::try_from(v).ok())
                }
            }
        )*
    };
}

impl_json_int!(i8, i16, i32, i64, u8, u16, u32);

impl JsonScalar for u64 {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl JsonScalar for f32 {
    fn from_json(value: &Value) -> Option<Self> {
        value_to_f64(value).map(|v| v as f32)
    }
}

impl JsonScalar for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        value_to_f64(value)
    }
}

impl JsonScalar for bool {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}
