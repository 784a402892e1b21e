// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{ElemType, Element, Shape, TensorError};

/// An owned, n-dimensional tensor stored in contiguous row-major memory.
///
/// `Tensor<E>` is the primary data carrier in the inference pipeline. It
/// owns its flat element buffer and keeps the invariant that the buffer
/// length always equals the product of the shape's dimensions. Borrowed
/// sub-tensors are exposed via [`TensorView`].
///
/// `Clone` is a deep copy with an independent buffer; `PartialEq` compares
/// shape and every element.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<E> {
    shape: Shape,
    data: Vec<E>,
}

impl<E: Element> Tensor<E> {
    /// Creates a tensor filled with the element type's default value
    /// (zero for the numeric types, `false` for bool).
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Shape, Tensor};
    /// let t: Tensor<f32> = Tensor::zeros(Shape::matrix(2, 3));
    /// assert_eq!(t.len(), 6);
    /// ```
    pub fn zeros(shape: Shape) -> Self {
        let size = shape.num_elements();
        Self {
            shape,
            data: vec![E::default(); size],
        }
    }

    /// Creates a tensor with every element set to `value`.
    pub fn filled(shape: Shape, value: E) -> Self {
        let size = shape.num_elements();
        Self {
            shape,
            data: vec![value; size],
        }
    }

    /// Creates a tensor from an existing buffer.
    ///
    /// # Errors
    /// Returns [`TensorError::BufferSizeMismatch`] if `data.len()` differs
    /// from the shape's element count.
    pub fn from_vec(shape: Shape, data: Vec<E>) -> Result<Self, TensorError> {
        let expected = shape.num_elements();
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the runtime tag of the element type.
    pub fn elem_type(&self) -> ElemType {
        E::ELEM
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the flat element buffer in row-major order.
    pub fn data(&self) -> &[E] {
        &self.data
    }

    /// Returns the flat element buffer mutably.
    pub fn data_mut(&mut self) -> &mut [E] {
        &mut self.data
    }

    /// Reads the element at a multi-dimensional index.
    ///
    /// # Errors
    /// [`TensorError::RankMismatch`] if the index count differs from the
    /// rank, [`TensorError::IndexOutOfBounds`] if any coordinate exceeds
    /// its dimension bound.
    pub fn get(&self, indices: &[usize]) -> Result<E, TensorError> {
        let offset = self.offset_of(indices)?;
        Ok(self.data[offset])
    }

    /// Writes the element at a multi-dimensional index.
    pub fn set(&mut self, indices: &[usize], value: E) -> Result<(), TensorError> {
        let offset = self.offset_of(indices)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Reads the element at a flat row-major index.
    pub fn get_flat(&self, index: usize) -> Result<E, TensorError> {
        self.data
            .get(index)
            .copied()
            .ok_or(TensorError::FlatIndexOutOfBounds {
                index,
                size: self.data.len(),
            })
    }

    /// Writes the element at a flat row-major index.
    pub fn set_flat(&mut self, index: usize, value: E) -> Result<(), TensorError> {
        let size = self.data.len();
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(TensorError::FlatIndexOutOfBounds { index, size }),
        }
    }

    /// Replaces the shape without touching the buffer.
    ///
    /// # Errors
    /// Returns [`TensorError::ReshapeMismatch`] unless the new shape's
    /// element count equals the current one.
    pub fn reshape(&mut self, new_shape: Shape) -> Result<(), TensorError> {
        if new_shape.num_elements() != self.data.len() {
            return Err(TensorError::ReshapeMismatch {
                elements: self.data.len(),
                requested: new_shape,
            });
        }
        self.shape = new_shape;
        Ok(())
    }

    /// Consuming variant of [`reshape`](Tensor::reshape).
    pub fn reshaped(mut self, new_shape: Shape) -> Result<Self, TensorError> {
        self.reshape(new_shape)?;
        Ok(self)
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: E) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Returns a borrowed view over the whole tensor.
    pub fn view(&self) -> TensorView<'_, E> {
        TensorView {
            shape: self.shape.clone(),
            data: &self.data,
        }
    }

    /// Returns a view with one or more leading dimensions fixed.
    ///
    /// The view covers the contiguous region selected by `prefix` and keeps
    /// the row-major order of the remaining dimensions, so reading the view
    /// at `[i, j, ..]` equals reading the owner at `[prefix..., i, j, ..]`.
    ///
    /// # Errors
    /// [`TensorError::RankMismatch`] if `prefix` is empty or longer than
    /// the rank; [`TensorError::IndexOutOfBounds`] if any prefix index
    /// exceeds its dimension.
    pub fn slice(&self, prefix: &[usize]) -> Result<TensorView<'_, E>, TensorError> {
        let rank = self.shape.rank();
        if prefix.is_empty() || prefix.len() > rank {
            return Err(TensorError::RankMismatch {
                rank,
                got: prefix.len(),
            });
        }
        let strides = self.shape.strides();
        let mut offset = 0usize;
        for (dim, (&index, &size)) in prefix.iter().zip(self.shape.dims()).enumerate() {
            if index >= size {
                return Err(TensorError::IndexOutOfBounds { dim, index, size });
            }
            offset += index * strides[dim];
        }
        let remaining = Shape::new(self.shape.dims()[prefix.len()..].to_vec());
        let len = remaining.num_elements();
        Ok(TensorView {
            shape: remaining,
            data: &self.data[offset..offset + len],
        })
    }

    /// Returns the transpose of a rank-2 tensor as a new owned tensor.
    ///
    /// # Errors
    /// Returns [`TensorError::RankUnsupported`] for any other rank.
    pub fn transposed(&self) -> Result<Tensor<E>, TensorError> {
        if self.shape.rank() != 2 {
            return Err(TensorError::RankUnsupported {
                op: "transpose",
                rank: self.shape.rank(),
            });
        }
        let rows = self.shape.dims()[0];
        let cols = self.shape.dims()[1];
        let mut out = vec![E::default(); self.data.len()];
        for r in 0..rows {
            for c in 0..cols {
                out[c * rows + r] = self.data[r * cols + c];
            }
        }
        Ok(Tensor {
            shape: Shape::matrix(cols, rows),
            data: out,
        })
    }

    /// Maps multi-dimensional indices to a flat offset, bound-checking
    /// every coordinate.
    fn offset_of(&self, indices: &[usize]) -> Result<usize, TensorError> {
        let rank = self.shape.rank();
        if indices.len() != rank {
            return Err(TensorError::RankMismatch {
                rank,
                got: indices.len(),
            });
        }
        let strides = self.shape.strides();
        let mut offset = 0usize;
        for (dim, (&index, &size)) in indices.iter().zip(self.shape.dims()).enumerate() {
            if index >= size {
                return Err(TensorError::IndexOutOfBounds { dim, index, size });
            }
            offset += index * strides[dim];
        }
        Ok(offset)
    }
}

/// A borrowed, read-only view over part of a [`Tensor`]'s buffer.
///
/// Views are zero-copy and tied to the lifetime of the owning tensor,
/// enforced by the borrow checker. The viewed region is contiguous and
/// row-major, so flat indexing behaves exactly like an owned tensor of
/// the same shape.
#[derive(Debug, Clone)]
pub struct TensorView<'a, E> {
    shape: Shape,
    data: &'a [E],
}

impl<'a, E: Element> TensorView<'a, E> {
    /// Returns the shape of the viewed region.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of elements in the view.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the view holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the viewed elements in row-major order.
    pub fn as_slice(&self) -> &'a [E] {
        self.data
    }

    /// Reads the element at a multi-dimensional index within the view.
    pub fn get(&self, indices: &[usize]) -> Result<E, TensorError> {
        let rank = self.shape.rank();
        if indices.len() != rank {
            return Err(TensorError::RankMismatch {
                rank,
                got: indices.len(),
            });
        }
        let strides = self.shape.strides();
        let mut offset = 0usize;
        for (dim, (&index, &size)) in indices.iter().zip(self.shape.dims()).enumerate() {
            if index >= size {
                return Err(TensorError::IndexOutOfBounds { dim, index, size });
            }
            offset += index * strides[dim];
        }
        Ok(self.data[offset])
    }

    /// Reads the element at a flat index within the view.
    pub fn get_flat(&self, index: usize) -> Result<E, TensorError> {
        self.data
            .get(index)
            .copied()
            .ok_or(TensorError::FlatIndexOutOfBounds {
                index,
                size: self.data.len(),
            })
    }

    /// Copies the viewed region into an owned tensor.
    pub fn to_tensor(&self) -> Tensor<E> {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iota(shape: Shape) -> Tensor<i32> {
        let n = shape.num_elements();
        Tensor::from_vec(shape, (0..n as i32).collect()).unwrap()
    }

    #[test]
    fn test_zeros() {
        let t: Tensor<f32> = Tensor::zeros(Shape::matrix(2, 3));
        assert_eq!(t.len(), 6);
        assert_eq!(t.shape(), &Shape::matrix(2, 3));
        assert!(t.data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_vec_size_mismatch() {
        let result = Tensor::from_vec(Shape::matrix(2, 3), vec![1.0f32; 5]);
        assert!(matches!(
            result,
            Err(TensorError::BufferSizeMismatch { expected: 6, actual: 5, .. })
        ));
    }

    #[test]
    fn test_size_invariant_after_reshape() {
        let mut t = iota(Shape::new(vec![2, 3, 4]));
        t.reshape(Shape::new(vec![4, 6])).unwrap();
        assert_eq!(t.len(), t.shape().num_elements());
        t.reshape(Shape::vector(24)).unwrap();
        assert_eq!(t.len(), t.shape().num_elements());
    }

    #[test]
    fn test_reshape_identity_is_noop() {
        let mut t = iota(Shape::matrix(2, 3));
        let before = t.clone();
        t.reshape(Shape::matrix(2, 3)).unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn test_reshape_mismatch() {
        let mut t = iota(Shape::matrix(2, 3));
        let err = t.reshape(Shape::matrix(2, 4)).unwrap_err();
        assert!(matches!(err, TensorError::ReshapeMismatch { elements: 6, .. }));
    }

    #[test]
    fn test_multi_index_access() {
        let mut t = iota(Shape::new(vec![2, 3, 4]));
        assert_eq!(t.get(&[0, 0, 0]).unwrap(), 0);
        assert_eq!(t.get(&[1, 2, 3]).unwrap(), 23);
        assert_eq!(t.get(&[1, 0, 2]).unwrap(), 14);

        t.set(&[1, 0, 2], -1).unwrap();
        assert_eq!(t.get(&[1, 0, 2]).unwrap(), -1);
        assert_eq!(t.get_flat(14).unwrap(), -1);
    }

    #[test]
    fn test_index_out_of_bounds() {
        let t = iota(Shape::matrix(2, 3));
        assert!(matches!(
            t.get(&[0, 3]),
            Err(TensorError::IndexOutOfBounds { dim: 1, index: 3, size: 3 })
        ));
        assert!(matches!(
            t.get(&[2, 0]),
            Err(TensorError::IndexOutOfBounds { dim: 0, .. })
        ));
    }

    #[test]
    fn test_rank_mismatch() {
        let t = iota(Shape::matrix(2, 3));
        assert!(matches!(
            t.get(&[1]),
            Err(TensorError::RankMismatch { rank: 2, got: 1 })
        ));
        assert!(matches!(
            t.get(&[0, 0, 0]),
            Err(TensorError::RankMismatch { rank: 2, got: 3 })
        ));
    }

    #[test]
    fn test_flat_out_of_bounds() {
        let mut t = iota(Shape::vector(3));
        assert!(t.get_flat(3).is_err());
        assert!(t.set_flat(3, 0).is_err());
    }

    #[test]
    fn test_slice_matches_direct_indexing() {
        let t = iota(Shape::new(vec![2, 3, 4]));
        let s = t.slice(&[1]).unwrap();
        assert_eq!(s.shape(), &Shape::matrix(3, 4));
        for j in 0..3 {
            for k in 0..4 {
                assert_eq!(s.get(&[j, k]).unwrap(), t.get(&[1, j, k]).unwrap());
            }
        }
    }

    #[test]
    fn test_slice_down_to_rank_one() {
        // Slicing a rank-3 tensor down to rank 1 must reproduce the values
        // obtained via direct multi-index access.
        let t = iota(Shape::new(vec![2, 3, 4]));
        for i in 0..2 {
            for j in 0..3 {
                let row = t.slice(&[i, j]).unwrap();
                assert_eq!(row.shape(), &Shape::vector(4));
                for k in 0..4 {
                    assert_eq!(row.get_flat(k).unwrap(), t.get(&[i, j, k]).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_slice_invariants() {
        let t = iota(Shape::new(vec![2, 3, 4]));
        let s = t.slice(&[0]).unwrap();
        assert_eq!(s.len(), s.shape().num_elements());
        assert!(t.slice(&[]).is_err());
        assert!(t.slice(&[0, 0, 0, 0]).is_err());
        assert!(matches!(
            t.slice(&[2]),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut a = iota(Shape::vector(4));
        let b = a.clone();
        a.set_flat(0, 99).unwrap();
        assert_eq!(b.get_flat(0).unwrap(), 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_is_shape_sensitive() {
        let a = iota(Shape::matrix(2, 3));
        let b = iota(Shape::matrix(3, 2));
        // Same buffer contents, different shapes.
        assert_eq!(a.data(), b.data());
        assert_ne!(a, b);
    }

    #[test]
    fn test_transposed() {
        let t = Tensor::from_vec(Shape::matrix(2, 3), vec![1, 2, 3, 4, 5, 6]).unwrap();
        let tt = t.transposed().unwrap();
        assert_eq!(tt.shape(), &Shape::matrix(3, 2));
        assert_eq!(tt.data(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_transposed_rejects_non_matrix() {
        let t = iota(Shape::new(vec![2, 3, 4]));
        assert!(matches!(
            t.transposed(),
            Err(TensorError::RankUnsupported { op: "transpose", rank: 3 })
        ));
    }

    #[test]
    fn test_fill_and_filled() {
        let mut t: Tensor<f64> = Tensor::filled(Shape::vector(3), 2.5);
        assert!(t.data().iter().all(|&x| x == 2.5));
        t.fill(0.0);
        assert!(t.data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_view_to_tensor_roundtrip() {
        let t = iota(Shape::new(vec![2, 2, 2]));
        let owned = t.slice(&[1]).unwrap().to_tensor();
        assert_eq!(owned.shape(), &Shape::matrix(2, 2));
        assert_eq!(owned.data(), &[4, 5, 6, 7]);
    }
}
