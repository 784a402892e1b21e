// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The element-type union carried through untyped graph execution.
//!
//! A graph is untyped until execution time: the registry maps names to
//! tensors whose element types are only known once the model's weights
//! have been decoded. [`DynTensor`] is the closed sum over `Tensor<E>`
//! for every supported element type; operators match on it exhaustively
//! and reject unsupported variants with an explicit type error instead
//! of casting.

use crate::{ElemType, Shape, Tensor};

macro_rules! dyn_tensor {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        /// A tensor whose element type is resolved at run time.
        ///
        /// One variant per supported [`ElemType`]. `From<Tensor<E>>` is
        /// implemented for every element type, so typed results convert
        /// back with `.into()`.
        #[derive(Debug, Clone, PartialEq)]
        pub enum DynTensor {
            $(
                #[allow(missing_docs)]
                $variant(Tensor<$ty>),
            )*
        }

        impl DynTensor {
            /// Returns the tensor's shape.
            pub fn shape(&self) -> &Shape {
                match self {
                    $(Self::$variant(t) => t.shape(),)*
                }
            }

            /// Returns the runtime element-type tag.
            pub fn elem_type(&self) -> ElemType {
                match self {
                    $(Self::$variant(_) => ElemType::$variant,)*
                }
            }

            /// Returns the total number of elements.
            pub fn len(&self) -> usize {
                match self {
                    $(Self::$variant(t) => t.len(),)*
                }
            }

            /// Returns `true` if the tensor holds no elements.
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Borrows the inner tensor if its element type is `E`.
            ///
            /// The typed counterpart of matching on a single variant; ops
            /// use it to require a secondary operand of the same element
            /// type as the one they already resolved.
            pub fn downcast_ref<E: crate::Element>(&self) -> Option<&Tensor<E>> {
                let any: &dyn std::any::Any = match self {
                    $(Self::$variant(t) => t,)*
                };
                any.downcast_ref::<Tensor<E>>()
            }
        }

        $(
            impl From<Tensor<$ty>> for DynTensor {
                fn from(t: Tensor<$ty>) -> Self {
                    Self::$variant(t)
                }
            }
        )*
    };
}

dyn_tensor! {
    Bool => bool,
    I8 => i8,
    I16 => i16,
    I32 => i32,
    I64 => i64,
    U8 => u8,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    F32 => f32,
    F64 => f64,
}

/// Runs `$body` with `$t` bound to the inner tensor of any variant.
///
/// `$body` must be valid for every element type (it typically calls a
/// function generic over [`crate::Element`]).
#[macro_export]
macro_rules! with_any_tensor {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            $crate::DynTensor::Bool($t) => $body,
            $crate::DynTensor::I8($t) => $body,
            $crate::DynTensor::I16($t) => $body,
            $crate::DynTensor::I32($t) => $body,
            $crate::DynTensor::I64($t) => $body,
            $crate::DynTensor::U8($t) => $body,
            $crate::DynTensor::U16($t) => $body,
            $crate::DynTensor::U32($t) => $body,
            $crate::DynTensor::U64($t) => $body,
            $crate::DynTensor::F32($t) => $body,
            $crate::DynTensor::F64($t) => $body,
        }
    };
}

/// Runs `$body` with `$t` bound to the inner tensor of any numeric
/// variant; evaluates `$fallback` for `bool`.
#[macro_export]
macro_rules! with_numeric_tensor {
    ($value:expr, $t:ident => $body:expr, $fallback:expr) => {
        match $value {
            $crate::DynTensor::I8($t) => $body,
            $crate::DynTensor::I16($t) => $body,
            $crate::DynTensor::I32($t) => $body,
            $crate::DynTensor::I64($t) => $body,
            $crate::DynTensor::U8($t) => $body,
            $crate::DynTensor::U16($t) => $body,
            $crate::DynTensor::U32($t) => $body,
            $crate::DynTensor::U64($t) => $body,
            $crate::DynTensor::F32($t) => $body,
            $crate::DynTensor::F64($t) => $body,
            _ => $fallback,
        }
    };
}

/// Runs `$body` with `$t` bound to the inner tensor of a floating-point
/// variant; evaluates `$fallback` otherwise.
#[macro_export]
macro_rules! with_float_tensor {
    ($value:expr, $t:ident => $body:expr, $fallback:expr) => {
        match $value {
            $crate::DynTensor::F32($t) => $body,
            $crate::DynTensor::F64($t) => $body,
            _ => $fallback,
        }
    };
}

/// Runs `$body` with `$x`/`$y` bound to the inner tensors of two numeric
/// operands of the *same* element type; evaluates `$fallback` when the
/// types differ or either operand is non-numeric.
#[macro_export]
macro_rules! with_numeric_pair {
    (($a:expr, $b:expr), ($x:ident, $y:ident) => $body:expr, $fallback:expr) => {
        match ($a, $b) {
            ($crate::DynTensor::I8($x), $crate::DynTensor::I8($y)) => $body,
            ($crate::DynTensor::I16($x), $crate::DynTensor::I16($y)) => $body,
            ($crate::DynTensor::I32($x), $crate::DynTensor::I32($y)) => $body,
            ($crate::DynTensor::I64($x), $crate::DynTensor::I64($y)) => $body,
            ($crate::DynTensor::U8($x), $crate::DynTensor::U8($y)) => $body,
            ($crate::DynTensor::U16($x), $crate::DynTensor::U16($y)) => $body,
            ($crate::DynTensor::U32($x), $crate::DynTensor::U32($y)) => $body,
            ($crate::DynTensor::U64($x), $crate::DynTensor::U64($y)) => $body,
            ($crate::DynTensor::F32($x), $crate::DynTensor::F32($y)) => $body,
            ($crate::DynTensor::F64($x), $crate::DynTensor::F64($y)) => $body,
            _ => $fallback,
        }
    };
}
