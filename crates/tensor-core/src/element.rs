// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element types and the scalar trait hierarchy.

use num_traits::{Bounded, FromPrimitive, Num, NumAssignOps, NumCast};

/// Enumerates the scalar types a [`crate::Tensor`] can hold.
///
/// The runtime uses `ElemType` to decide memory layout and which compute
/// path to dispatch; the model loader maps ONNX `dataType` codes onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ElemType {
    /// Boolean.
    Bool,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 64-bit IEEE 754 floating point.
    F64,
}

impl ElemType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            ElemType::Bool | ElemType::I8 | ElemType::U8 => 1,
            ElemType::I16 | ElemType::U16 => 2,
            ElemType::I32 | ElemType::U32 | ElemType::F32 => 4,
            ElemType::I64 | ElemType::U64 | ElemType::F64 => 8,
        }
    }

    /// Returns a human-readable label for this element type.
    pub fn as_str(self) -> &'static str {
        match self {
            ElemType::Bool => "bool",
            ElemType::I8 => "i8",
            ElemType::I16 => "i16",
            ElemType::I32 => "i32",
            ElemType::I64 => "i64",
            ElemType::U8 => "u8",
            ElemType::U16 => "u16",
            ElemType::U32 => "u32",
            ElemType::U64 => "u64",
            ElemType::F32 => "f32",
            ElemType::F64 => "f64",
        }
    }

    /// Returns `true` for types that participate in arithmetic ops.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ElemType::Bool)
    }

    /// Returns `true` for the types that map onto a hardware vector
    /// register lane (the only types the vectorized GEMM kernels accept).
    pub fn has_simd_lanes(self) -> bool {
        matches!(
            self,
            ElemType::I32 | ElemType::I64 | ElemType::F32 | ElemType::F64
        )
    }

    /// Maps an ONNX `dataType` code onto an element type.
    ///
    /// Codes follow `onnx.TensorProto.DataType`: 1=f32, 2=u8, 3=i8, 4=u16,
    /// 5=i16, 6=i32, 7=i64, 9=bool, 11=f64, 12=u32, 13=u64. Unknown codes
    /// return `None`.
    pub fn from_onnx_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ElemType::F32),
            2 => Some(ElemType::U8),
            3 => Some(ElemType::I8),
            4 => Some(ElemType::U16),
            5 => Some(ElemType::I16),
            6 => Some(ElemType::I32),
            7 => Some(ElemType::I64),
            9 => Some(ElemType::Bool),
            11 => Some(ElemType::F64),
            12 => Some(ElemType::U32),
            13 => Some(ElemType::U64),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar type storable in a [`crate::Tensor`].
///
/// The set of implementors is closed: the eleven types listed in
/// [`ElemType`]. Everything a tensor needs from its scalars — copying,
/// comparison, a default fill value, and little-endian decoding for
/// embedded weight blobs — lives here.
pub trait Element:
    Copy
    + PartialEq
    + PartialOrd
    + std::fmt::Debug
    + std::fmt::Display
    + Default
    + Send
    + Sync
    + 'static
{
    /// The runtime tag for this scalar type.
    const ELEM: ElemType;

    /// Decodes one scalar from little-endian bytes.
    ///
    /// # Panics
    /// Panics if `bytes.len() != Self::ELEM.size_bytes()`. Callers decode
    /// whole buffers and are expected to validate alignment up front.
    fn from_le_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const ELEM: ElemType = ElemType::$variant;

                fn from_le_bytes(bytes: &[u8]) -> Self {
                    let arr: [u8; std::mem::size_of::<$ty>()] = bytes
                        .try_into()
                        .expect("byte width must match scalar width");
                    <$ty>::from_le_bytes(arr)
                }
            }
        )*
    };
}

impl_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl Element for bool {
    const ELEM: ElemType = ElemType::Bool;

    fn from_le_bytes(bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), 1, "byte width must match scalar width");
        bytes[0] != 0
    }
}

/// Scalars that support arithmetic — every element type except `bool`.
pub trait Numeric: Element + Num + NumAssignOps + NumCast + Bounded + FromPrimitive {}

impl<T> Numeric for T where T: Element + Num + NumAssignOps + NumCast + Bounded + FromPrimitive {}

/// Floating-point scalars (`f32`, `f64`), required by transcendental
/// activations such as TanH and Swish.
pub trait FloatElement: Numeric + num_traits::Float {}

impl FloatElement for f32 {}
impl FloatElement for f64 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        assert_eq!(ElemType::Bool.size_bytes(), 1);
        assert_eq!(ElemType::I16.size_bytes(), 2);
        assert_eq!(ElemType::F32.size_bytes(), 4);
        assert_eq!(ElemType::U64.size_bytes(), 8);
    }

    #[test]
    fn test_onnx_codes() {
        assert_eq!(ElemType::from_onnx_code(1), Some(ElemType::F32));
        assert_eq!(ElemType::from_onnx_code(7), Some(ElemType::I64));
        assert_eq!(ElemType::from_onnx_code(9), Some(ElemType::Bool));
        assert_eq!(ElemType::from_onnx_code(11), Some(ElemType::F64));
        // 8 is the ONNX string type, which the engine does not support.
        assert_eq!(ElemType::from_onnx_code(8), None);
        assert_eq!(ElemType::from_onnx_code(0), None);
    }

    #[test]
    fn test_simd_lane_eligibility() {
        assert!(ElemType::F32.has_simd_lanes());
        assert!(ElemType::I64.has_simd_lanes());
        assert!(!ElemType::I16.has_simd_lanes());
        assert!(!ElemType::Bool.has_simd_lanes());
    }

    #[test]
    fn test_from_le_bytes() {
        assert_eq!(<f32 as Element>::from_le_bytes(&1.5f32.to_le_bytes()), 1.5);
        assert_eq!(<i64 as Element>::from_le_bytes(&(-7i64).to_le_bytes()), -7);
        assert_eq!(<u16 as Element>::from_le_bytes(&[0x34, 0x12]), 0x1234);
        assert!(<bool as Element>::from_le_bytes(&[1]));
        assert!(!<bool as Element>::from_le_bytes(&[0]));
    }

    #[test]
    fn test_display() {
        assert_eq!(ElemType::F64.to_string(), "f64");
        assert_eq!(ElemType::U8.to_string(), "u8");
    }
}
