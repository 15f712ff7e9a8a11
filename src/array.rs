//! Owned row-major host array.

use std::ops::{Index, IndexMut};
use std::ptr::NonNull;

use crate::access::{ReadOnly, ReadWrite};
use crate::auxiliary::checked_len;
use crate::storage::HostArray;
use crate::view::{Dim, Rank, ViewND};
use crate::{out_of_range, Argument, Result};

/// Owned dense multidimensional array in row-major (C) order.
///
/// Serves as a host array for views of any rank: the last index varies fastest
/// and there is no padding between rows.
pub struct DenseArray<T, const N: usize> {
    data: Vec<T>,
    dims: [usize; N],
}

impl<T: std::fmt::Debug, const N: usize> std::fmt::Debug for DenseArray<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseArray")
            .field("dims", &self.dims)
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Clone, const N: usize> Clone for DenseArray<T, N> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims,
        }
    }
}

fn element_count(dims: &[usize]) -> usize {
    match checked_len(dims) {
        Ok(total) => total,
        Err(_) => panic!("element count of dims {:?} overflows usize", dims),
    }
}

impl<T: Clone + num_traits::Zero, const N: usize> DenseArray<T, N> {
    /// Create an array filled with zeros.
    ///
    /// # Panics
    /// Panics if the product of `dims` overflows `usize`.
    pub fn zeros(dims: [usize; N]) -> Self {
        let total = element_count(&dims);
        Self {
            data: vec![T::zero(); total],
            dims,
        }
    }
}

impl<T, const N: usize> DenseArray<T, N> {
    /// Wrap a row-major buffer.
    ///
    /// Fails with [`ViewError::Overflow`] if the product of `dims` overflows
    /// `usize`, and with [`Argument::Length`] if `data.len()` is not that product.
    ///
    /// [`ViewError::Overflow`]: crate::ViewError::Overflow
    pub fn from_vec(data: Vec<T>, dims: [usize; N]) -> Result<Self> {
        let total = checked_len(&dims)?;
        if data.len() != total {
            return Err(out_of_range(Argument::Length, 0, data.len(), total));
        }
        Ok(Self { data, dims })
    }

    /// Create an array with values produced by a function.
    ///
    /// The function is called with indices in row-major iteration order.
    ///
    /// # Panics
    /// Panics if the product of `dims` overflows `usize`.
    pub fn from_fn(dims: [usize; N], mut f: impl FnMut([usize; N]) -> T) -> Self {
        let total = element_count(&dims);
        let mut data = Vec::with_capacity(total);
        let mut idx = [0usize; N];
        for _ in 0..total {
            data.push(f(idx));
            for d in (0..N).rev() {
                idx[d] += 1;
                if idx[d] < dims[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Self { data, dims }
    }

    #[inline]
    pub fn dims(&self) -> &[usize; N] {
        &self.dims
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        N
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements in memory order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Linear position of a multi-dimensional index, or `None` if out of bounds.
    fn linear_index(&self, indices: &[usize; N]) -> Option<usize> {
        let mut idx = 0usize;
        for d in 0..N {
            if indices[d] >= self.dims[d] {
                return None;
            }
            idx = idx * self.dims[d] + indices[d];
        }
        Some(idx)
    }

    /// Get a reference to an element, or `None` if out of bounds.
    pub fn get(&self, indices: [usize; N]) -> Option<&T> {
        self.linear_index(&indices).map(|idx| &self.data[idx])
    }

    /// Get a mutable reference to an element, or `None` if out of bounds.
    pub fn get_mut(&mut self, indices: [usize; N]) -> Option<&mut T> {
        self.linear_index(&indices).map(move |idx| &mut self.data[idx])
    }
}

impl<T, const N: usize> DenseArray<T, N>
where
    Dim<N>: Rank,
{
    /// Create a read-only view over the whole array.
    pub fn view(&self) -> ViewND<'_, T, N, ReadOnly> {
        ViewND::new(self)
    }

    /// Create a read-write view over the whole array.
    pub fn view_mut(&mut self) -> ViewND<'_, T, N, ReadWrite> {
        ViewND::new(self)
    }
}

impl<T, const N: usize> Index<[usize; N]> for DenseArray<T, N> {
    type Output = T;

    fn index(&self, indices: [usize; N]) -> &T {
        match self.linear_index(&indices) {
            Some(idx) => &self.data[idx],
            None => panic!("index {:?} out of bounds for dims {:?}", indices, self.dims),
        }
    }
}

impl<T, const N: usize> IndexMut<[usize; N]> for DenseArray<T, N> {
    fn index_mut(&mut self, indices: [usize; N]) -> &mut T {
        match self.linear_index(&indices) {
            Some(idx) => &mut self.data[idx],
            None => panic!("index {:?} out of bounds for dims {:?}", indices, self.dims),
        }
    }
}

unsafe impl<'a, T: 'a, const N: usize> HostArray<'a, N> for &'a DenseArray<T, N> {
    type Elem = T;
    type Access = ReadOnly;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; N]) {
        (NonNull::from(self.data.as_slice()).cast(), self.dims)
    }
}

unsafe impl<'a, T: 'a, const N: usize> HostArray<'a, N> for &'a mut DenseArray<T, N> {
    type Elem = T;
    type Access = ReadWrite;

    #[inline]
    fn into_raw_parts(self) -> (NonNull<T>, [usize; N]) {
        let dims = self.dims;
        (NonNull::from(self.data.as_mut_slice()).cast(), dims)
    }
}
